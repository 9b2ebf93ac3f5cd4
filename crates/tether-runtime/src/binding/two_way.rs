#![forbid(unsafe_code)]

//! Two-way synchronization between a host chain and a target chain.
//!
//! # Design
//!
//! Two observers, subscribed host first:
//!
//! - host → target: every host emission, including the one made on
//!   subscribe, is written into the target. The host therefore wins at bind
//!   time.
//! - target → host: the target's first emission (its pre-existing value) is
//!   dropped; later ones are written into the host.
//!
//! With the re-entrancy guard on, a session that is applying a write ignores
//! emissions raised by that write, so an update never bounces back to the
//! side it came from. With the guard off, echoes stop only where a host does
//! not re-announce an unchanged value.
//!
//! # Failure Modes
//!
//! - **Normalizing target**: the guard cannot tell an echo from a value the
//!   target's setter rewrote, and drops both. The host then keeps the value
//!   it sent. With the guard off the rewritten value flows back to the host.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tether_core::{AccessorCache, ChainError, PropertyChain, Result, TetherConfig, Value};

use super::write::TargetWriter;
use super::{BindingHandle, Converter, StatsCell, pipeline};
use crate::observer::ChainObserver;
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::subscription::CompositeSubscription;

/// Builder for a two-way binding.
pub struct TwoWayBind<'a> {
    cache: &'a AccessorCache,
    host: Value,
    host_chain: PropertyChain,
    target: Value,
    target_chain: PropertyChain,
    converters: Option<(Converter, Converter)>,
    scheduler: Rc<dyn Scheduler>,
    config: TetherConfig,
}

impl<'a> TwoWayBind<'a> {
    pub fn new(
        cache: &'a AccessorCache,
        host: Value,
        host_chain: &PropertyChain,
        target: Value,
        target_chain: &PropertyChain,
    ) -> Self {
        Self {
            cache,
            host,
            host_chain: host_chain.clone(),
            target,
            target_chain: target_chain.clone(),
            converters: None,
            scheduler: Rc::new(ImmediateScheduler),
            config: TetherConfig::default(),
        }
    }

    /// Convert host values on their way to the target, and target values on
    /// their way back.
    #[must_use]
    pub fn with_converters(mut self, host_to_target: Converter, target_to_host: Converter) -> Self {
        self.converters = Some((host_to_target, target_to_host));
        self
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: TetherConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate both chains and start the session. After this returns (with
    /// an inline scheduler) the target holds the host's value.
    pub fn bind(self) -> Result<BindingHandle> {
        if self.converters.is_none()
            && self.host_chain.leaf_type() != self.target_chain.leaf_type()
        {
            return Err(ChainError::LeafTypeMismatch {
                expected: self.host_chain.leaf_type().name(),
                actual: self.target_chain.leaf_type().name(),
            });
        }
        let (host_to_target, target_to_host) = match self.converters {
            Some((forward, backward)) => (Some(forward), Some(backward)),
            None => (None, None),
        };

        let stats = Rc::new(StatsCell::default());
        let policy = self.config.unreachable_target;
        let into_target = TargetWriter::new(
            self.cache,
            self.target.clone(),
            &self.target_chain,
            policy,
            Rc::clone(&stats),
        )?;
        let into_host = TargetWriter::new(
            self.cache,
            self.host.clone(),
            &self.host_chain,
            policy,
            Rc::clone(&stats),
        )?;
        let trace = self.config.trace_emissions;
        let host_observer =
            ChainObserver::new(self.cache, self.host, &self.host_chain)?.with_trace(trace);
        let target_observer =
            ChainObserver::new(self.cache, self.target, &self.target_chain)?.with_trace(trace);

        let label: Rc<str> = format!("{} <-> {}", self.host_chain, self.target_chain).into();
        tracing::debug!(
            binding = %label,
            scheduler = self.scheduler.name(),
            guard = self.config.reentrancy_guard,
            "two-way binding established"
        );

        let guard = self
            .config
            .reentrancy_guard
            .then(|| Rc::new(Cell::new(false)));
        let mut parts = CompositeSubscription::new();
        parts.add(
            pipeline(host_observer.stream(), host_to_target, &self.scheduler).subscribe(
                guarded(into_target, guard.clone(), Rc::clone(&stats), Rc::clone(&label)),
            ),
        );
        parts.add(
            pipeline(target_observer.stream().skip(1), target_to_host, &self.scheduler)
                .subscribe(guarded(into_host, guard, Rc::clone(&stats), Rc::clone(&label))),
        );
        Ok(BindingHandle::new(parts, stats, label))
    }
}

impl fmt::Debug for TwoWayBind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoWayBind")
            .field("host_chain", &self.host_chain.to_string())
            .field("target_chain", &self.target_chain.to_string())
            .field("converters", &self.converters.is_some())
            .field("scheduler", &self.scheduler.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Clears the session's "applying" flag on every exit path.
struct Applying<'a>(&'a Cell<bool>);

impl Drop for Applying<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn guarded(
    writer: TargetWriter,
    applying: Option<Rc<Cell<bool>>>,
    stats: Rc<StatsCell>,
    label: Rc<str>,
) -> impl Fn(Value) + 'static {
    move |value: Value| {
        let Some(flag) = applying.as_deref() else {
            writer.write(&value);
            return;
        };
        if flag.replace(true) {
            stats.record_suppressed();
            tracing::trace!(binding = %label, "echo suppressed");
            return;
        }
        let _applying = Applying(flag);
        writer.write(&value);
    }
}
