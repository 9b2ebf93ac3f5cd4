#![forbid(unsafe_code)]

//! Emission recorder: a clonable sink that appends every value it receives.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared log of emitted values.
///
/// Clones share the same log, so one handle can be moved into a callback
/// while the test keeps another for assertions.
pub struct Recorder<T> {
    log: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            log: Rc::clone(&self.log),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Recorder").field(&self.log.borrow()).finish()
    }
}

impl<T> Recorder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn push(&self, value: T) {
        self.log.borrow_mut().push(value);
    }

    /// A callback that records into this log.
    pub fn sink(&self) -> impl Fn(T) + 'static
    where
        T: 'static,
    {
        let log = Rc::clone(&self.log);
        move |value| log.borrow_mut().push(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

impl<T: Clone> Recorder<T> {
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.log.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.log.borrow().last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_and_handle_share_log() {
        let rec = Recorder::new();
        let sink = rec.sink();
        sink(1);
        sink(2);
        rec.push(3);
        assert_eq!(rec.values(), vec![1, 2, 3]);
        assert_eq!(rec.last(), Some(3));
        assert_eq!(rec.take(), vec![1, 2, 3]);
        assert!(rec.is_empty());
    }

    #[test]
    fn clones_share_log() {
        let rec: Recorder<&str> = Recorder::new();
        let other = rec.clone();
        other.push("a");
        assert_eq!(rec.len(), 1);
        assert_eq!(format!("{rec:?}"), "Recorder([\"a\"])");
    }
}
