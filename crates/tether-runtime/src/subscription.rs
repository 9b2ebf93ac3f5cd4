#![forbid(unsafe_code)]

//! RAII subscription guards.
//!
//! A [`Subscription`] owns the teardown for one live registration; disposing it
//! (explicitly or by dropping it) runs the teardown exactly once. A
//! [`CompositeSubscription`] owns several and disposes all of them together.
//!
//! # Failure Modes
//!
//! - **Panicking teardown**: if one child's teardown panics, the composite
//!   still disposes every other child, then resumes the first panic. When the
//!   composite is dropped during an unwind the panic payload is discarded
//!   instead, so the process does not abort.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

type Teardown = Box<dyn FnOnce()>;

/// Guard for one live registration.
pub struct Subscription {
    teardown: Option<Teardown>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    #[must_use]
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Run the teardown. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.teardown.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A set of subscriptions disposed as one unit.
///
/// # Invariants
///
/// 1. After `dispose()` returns or unwinds, every child has been disposed.
/// 2. Children added after disposal are disposed immediately.
#[derive(Default)]
pub struct CompositeSubscription {
    parts: Vec<Subscription>,
    disposed: bool,
}

impl CompositeSubscription {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut part: Subscription) {
        if self.disposed {
            part.dispose();
        } else {
            self.parts.push(part);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Dispose every child, in insertion order.
    pub fn dispose(&mut self) {
        if let Some(payload) = self.dispose_all() {
            panic::resume_unwind(payload);
        }
    }

    fn dispose_all(&mut self) -> Option<Box<dyn Any + Send>> {
        self.disposed = true;
        let parts = std::mem::take(&mut self.parts);
        run_all(parts.into_iter().map(|mut part| move || part.dispose()))
    }

    /// Move everything into a single [`Subscription`].
    #[must_use]
    pub fn into_subscription(mut self) -> Subscription {
        let parts = std::mem::take(&mut self.parts);
        let mut inner = CompositeSubscription {
            parts,
            disposed: self.disposed,
        };
        Subscription::new(move || inner.dispose())
    }
}

impl Drop for CompositeSubscription {
    fn drop(&mut self) {
        if let Some(payload) = self.dispose_all() {
            if !std::thread::panicking() {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl fmt::Debug for CompositeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSubscription")
            .field("len", &self.parts.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Run every task even if some panic; return the first panic payload.
pub(crate) fn run_all<I, F>(tasks: I) -> Option<Box<dyn Any + Send>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce(),
{
    let mut first_panic = None;
    for task in tasks {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            first_panic.get_or_insert(payload);
        }
    }
    first_panic
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting(counter: &Rc<Cell<u32>>) -> Subscription {
        let c = Rc::clone(counter);
        Subscription::new(move || c.set(c.get() + 1))
    }

    #[test]
    fn dispose_runs_once() {
        let count = Rc::new(Cell::new(0));
        let mut sub = counting(&count);
        assert!(!sub.is_disposed());
        sub.dispose();
        sub.dispose();
        drop(sub);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_disposes() {
        let count = Rc::new(Cell::new(0));
        {
            let _sub = counting(&count);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn empty_is_disposed() {
        assert!(Subscription::empty().is_disposed());
    }

    #[test]
    fn composite_disposes_all() {
        let count = Rc::new(Cell::new(0));
        let mut composite = CompositeSubscription::new();
        composite.add(counting(&count));
        composite.add(counting(&count));
        assert_eq!(composite.len(), 2);

        composite.dispose();
        assert_eq!(count.get(), 2);
        assert!(composite.is_disposed());

        composite.add(counting(&count));
        assert_eq!(count.get(), 3, "late additions are disposed immediately");
        assert!(composite.is_empty());
    }

    #[test]
    fn composite_survives_panicking_child() {
        let count = Rc::new(Cell::new(0));
        let mut composite = CompositeSubscription::new();
        composite.add(counting(&count));
        composite.add(Subscription::new(|| panic!("teardown failed")));
        composite.add(counting(&count));

        let result = panic::catch_unwind(AssertUnwindSafe(|| composite.dispose()));
        assert!(result.is_err());
        assert_eq!(count.get(), 2, "siblings of the panicking child are disposed");
        assert!(composite.is_disposed());
    }

    #[test]
    fn into_subscription_keeps_children() {
        let count = Rc::new(Cell::new(0));
        let mut composite = CompositeSubscription::new();
        composite.add(counting(&count));
        composite.add(counting(&count));
        let sub = composite.into_subscription();
        assert_eq!(count.get(), 0);
        drop(sub);
        assert_eq!(count.get(), 2);
    }
}
