#![forbid(unsafe_code)]

//! Host-to-target push binding.

use std::fmt;
use std::rc::Rc;

use tether_core::{AccessorCache, ChainError, PropertyChain, Result, TetherConfig, Value};

use super::write::TargetWriter;
use super::{BindingHandle, Converter, StatsCell, pipeline};
use crate::observer::ChainObserver;
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::subscription::CompositeSubscription;

/// Builder for a one-way binding.
///
/// Every emission of `host_chain` on `host` is converted (identity by
/// default), marshaled through the scheduler (inline by default) and written
/// to `target_chain` on `target`.
///
/// ```ignore
/// let handle = OneWayBind::new(&cache, host, &value_path, target, &label_path)
///     .with_converter(converter(|n: i32| n.to_string()))
///     .bind()?;
/// ```
pub struct OneWayBind<'a> {
    cache: &'a AccessorCache,
    host: Value,
    host_chain: PropertyChain,
    target: Value,
    target_chain: PropertyChain,
    converter: Option<Converter>,
    scheduler: Rc<dyn Scheduler>,
    config: TetherConfig,
}

impl<'a> OneWayBind<'a> {
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
            converter: None,
            scheduler: Rc::new(ImmediateScheduler),
            config: TetherConfig::default(),
        }
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
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

    /// Validate both chains and start the session. The host's current value
    /// is written before this returns (or queued, with a deferring scheduler).
    pub fn bind(self) -> Result<BindingHandle> {
        if self.converter.is_none() && self.host_chain.leaf_type() != self.target_chain.leaf_type()
        {
            return Err(ChainError::LeafTypeMismatch {
                expected: self.target_chain.leaf_type().name(),
                actual: self.host_chain.leaf_type().name(),
            });
        }

        let stats = Rc::new(StatsCell::default());
        let writer = TargetWriter::new(
            self.cache,
            self.target,
            &self.target_chain,
            self.config.unreachable_target,
            Rc::clone(&stats),
        )?;
        let observer = ChainObserver::new(self.cache, self.host, &self.host_chain)?
            .with_trace(self.config.trace_emissions);
        let label: Rc<str> = format!("{} -> {}", self.host_chain, self.target_chain).into();
        tracing::debug!(
            binding = %label,
            scheduler = self.scheduler.name(),
            "one-way binding established"
        );

        let mut parts = CompositeSubscription::new();
        parts.add(
            pipeline(observer.stream(), self.converter, &self.scheduler)
                .subscribe(move |value| writer.write(&value)),
        );
        Ok(BindingHandle::new(parts, stats, label))
    }
}

impl fmt::Debug for OneWayBind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneWayBind")
            .field("host_chain", &self.host_chain.to_string())
            .field("target_chain", &self.target_chain.to_string())
            .field("converter", &self.converter.is_some())
            .field("scheduler", &self.scheduler.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::converter;
    use crate::scheduler::QueueScheduler;
    use tether_harness::{Node, path};

    fn bind(host: &Rc<Node>, hc: &str, target: &Rc<Node>, tc: &str) -> OneWayBind<'static> {
        // Leaked so the builder can borrow it for 'static in tests.
        let cache: &'static AccessorCache = Box::leak(Box::new(AccessorCache::new()));
        OneWayBind::new(
            cache,
            Value::node(Rc::clone(host)),
            &path(hc),
            Value::node(Rc::clone(target)),
            &path(tc),
        )
    }

    #[test]
    fn pushes_initial_and_later_values() {
        let host = Node::new(1);
        let target = Node::new(0);
        let handle = bind(&host, "value", &target, "value").bind().unwrap();
        assert_eq!(target.value(), 1);
        host.set_value(2);
        assert_eq!(target.value(), 2);
        // Target changes never flow back.
        target.set_value(9);
        assert_eq!(host.value(), 2);
        assert_eq!(handle.stats().writes_applied, 2);
    }

    #[test]
    fn leaf_types_must_match_without_converter() {
        let host = Node::new(1);
        let target = Node::new(0);
        let err = bind(&host, "value", &target, "label").bind().unwrap_err();
        assert!(matches!(err, ChainError::LeafTypeMismatch { .. }));

        let _handle = bind(&host, "value", &target, "label")
            .with_converter(converter(|n: i32| format!("n={n}")))
            .bind()
            .unwrap();
        assert_eq!(target.label(), "n=1");
    }

    #[test]
    fn queued_writes_are_discarded_after_dispose() {
        let host = Node::new(1);
        let target = Node::new(0);
        let queue = Rc::new(QueueScheduler::new());
        let mut handle = bind(&host, "value", &target, "value")
            .with_scheduler(queue.clone())
            .bind()
            .unwrap();
        assert_eq!(target.value(), 0);
        queue.run_pending();
        assert_eq!(target.value(), 1);

        host.set_value(2);
        handle.dispose();
        queue.run_pending();
        assert_eq!(target.value(), 1);
        assert_eq!(host.handler_count(), 0);
    }
}
