#![forbid(unsafe_code)]

//! One-way and two-way bindings between property chains.
//!
//! A binding session observes one chain (one-way) or both chains (two-way)
//! and writes each emission into the other side's leaf. The target's parent
//! object is re-walked on every write, so writes follow the target's own
//! link swaps. Sessions are owned by a [`BindingHandle`]; disposing or
//! dropping it cancels every direction at once.
//!
//! # Failure Modes
//!
//! - **Unreachable target**: a null link on the write side skips the write
//!   (logged at `warn`, counted in [`BindingStats::writes_skipped`]) or
//!   panics, per [`UnreachableTargetPolicy`](tether_core::UnreachableTargetPolicy).
//! - **Rejected value**: a setter that refuses the value's type counts as a
//!   skipped write.
//! - **Deferred echoes**: the re-entrancy guard only covers writes applied
//!   synchronously. With a deferring scheduler an echo is applied later and
//!   stops at the host's "unchanged value is not re-announced" convention.
//! - **Normalizing setters**: with the guard on, a target that stores a value
//!   different from the one written (a clamp, say) announces it while the
//!   write is still being applied. That emission is suppressed like any echo,
//!   so the host keeps the unnormalized value. Sessions binding such targets
//!   should run with [`TetherConfig::reentrancy_guard`](tether_core::TetherConfig::reentrancy_guard)
//!   off.

pub mod one_way;
pub mod two_way;
mod write;

pub use one_way::OneWayBind;
pub use two_way::TwoWayBind;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tether_core::{ChainValue, Value};

use crate::scheduler::Scheduler;
use crate::stream::Stream;
use crate::subscription::CompositeSubscription;

/// Value conversion applied between the two sides. Returning `None` drops
/// the value.
pub type Converter = Rc<dyn Fn(Value) -> Option<Value>>;

/// Lift a typed conversion into a [`Converter`]. Values that are not `S`
/// are dropped.
pub fn converter<S, D>(f: impl Fn(S) -> D + 'static) -> Converter
where
    S: ChainValue,
    D: ChainValue,
{
    Rc::new(move |value: Value| S::from_value(&value).map(|s| f(s).into_value()))
}

/// Counters for one binding session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingStats {
    /// Writes that reached a setter and were accepted.
    pub writes_applied: u64,
    /// Writes dropped because the target was unreachable or rejected the value.
    pub writes_skipped: u64,
    /// Emissions dropped by the re-entrancy guard.
    pub suppressed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCell {
    applied: Cell<u64>,
    skipped: Cell<u64>,
    suppressed: Cell<u64>,
}

impl StatsCell {
    pub(crate) fn record_applied(&self) {
        self.applied.set(self.applied.get() + 1);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.set(self.skipped.get() + 1);
    }

    pub(crate) fn record_suppressed(&self) {
        self.suppressed.set(self.suppressed.get() + 1);
    }

    fn snapshot(&self) -> BindingStats {
        BindingStats {
            writes_applied: self.applied.get(),
            writes_skipped: self.skipped.get(),
            suppressed: self.suppressed.get(),
        }
    }
}

/// Owner of a live binding session. Dropping it disposes the session.
pub struct BindingHandle {
    subscription: CompositeSubscription,
    stats: Rc<StatsCell>,
    label: Rc<str>,
}

impl BindingHandle {
    pub(crate) fn new(
        subscription: CompositeSubscription,
        stats: Rc<StatsCell>,
        label: Rc<str>,
    ) -> Self {
        Self {
            subscription,
            stats,
            label,
        }
    }

    /// Cancel every direction. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.subscription.is_disposed() {
            return;
        }
        tracing::debug!(binding = %self.label, "binding disposed");
        self.subscription.dispose();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.subscription.is_disposed()
    }

    #[must_use]
    pub fn stats(&self) -> BindingStats {
        self.stats.snapshot()
    }

    /// `"Host.path -> Target.path"`, as used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("label", &&*self.label)
            .field("disposed", &self.is_disposed())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Emission path shared by both directions: convert, then hop to the
/// scheduler.
pub(crate) fn pipeline(
    source: Stream<Value>,
    converter: Option<Converter>,
    scheduler: &Rc<dyn Scheduler>,
) -> Stream<Value> {
    let converted = match converter {
        Some(convert) => source.filter_map(move |value| convert(value)),
        None => source,
    };
    converted.observe_on(Rc::clone(scheduler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_converter_drops_foreign_values() {
        let to_text = converter(|n: i32| format!("#{n}"));
        let out = to_text(7i32.into_value()).unwrap();
        assert_eq!(String::from_value(&out).as_deref(), Some("#7"));
        assert!(to_text("seven".to_string().into_value()).is_none());
    }

    #[test]
    fn stats_snapshot() {
        let stats = StatsCell::default();
        stats.record_applied();
        stats.record_applied();
        stats.record_skipped();
        stats.record_suppressed();
        assert_eq!(
            stats.snapshot(),
            BindingStats {
                writes_applied: 2,
                writes_skipped: 1,
                suppressed: 1,
            }
        );
    }
}
