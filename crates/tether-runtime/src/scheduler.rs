#![forbid(unsafe_code)]

//! Execution contexts for binding writes.
//!
//! Propagation is synchronous by default ([`ImmediateScheduler`]). A
//! [`QueueScheduler`] defers work to whoever owns the queue, typically a UI
//! loop that calls [`QueueScheduler::run_pending`] once per frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Somewhere to run a [`Task`].
pub trait Scheduler {
    fn schedule(&self, task: Task);

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Runs every task inline, before `schedule` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, task: Task) {
        task();
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

/// FIFO queue drained by its owner.
///
/// # Invariants
///
/// 1. Tasks run in the order they were scheduled.
/// 2. Tasks scheduled while draining run in the same `run_pending` call.
#[derive(Default)]
pub struct QueueScheduler {
    queue: RefCell<VecDeque<Task>>,
}

impl QueueScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run the oldest task, if any.
    pub fn run_one(&self) -> bool {
        // Pop before running so the task may schedule more work.
        let task = self.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run until the queue is empty. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    fn name(&self) -> &'static str {
        "queue"
    }
}

impl fmt::Debug for QueueScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn immediate_runs_inline() {
        let hit = Rc::new(Cell::new(false));
        let h = Rc::clone(&hit);
        ImmediateScheduler.schedule(Box::new(move || h.set(true)));
        assert!(hit.get());
        assert_eq!(ImmediateScheduler.name(), "immediate");
    }

    #[test]
    fn queue_defers_until_drained() {
        let queue = QueueScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let l = Rc::clone(&log);
            queue.schedule(Box::new(move || l.borrow_mut().push(i)));
        }
        assert!(log.borrow().is_empty());
        assert_eq!(queue.pending(), 3);

        assert_eq!(queue.run_pending(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(!queue.run_one());
    }

    #[test]
    fn tasks_scheduled_while_draining_run() {
        let queue = Rc::new(QueueScheduler::new());
        let hits = Rc::new(Cell::new(0u32));

        let q = Rc::clone(&queue);
        let h = Rc::clone(&hits);
        queue.schedule(Box::new(move || {
            h.set(h.get() + 1);
            let h2 = Rc::clone(&h);
            q.schedule(Box::new(move || h2.set(h2.get() + 1)));
        }));

        assert_eq!(queue.run_pending(), 2);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn debug_format() {
        let queue = QueueScheduler::new();
        queue.schedule(Box::new(|| {}));
        assert!(format!("{queue:?}").contains("pending: 1"));
    }
}
