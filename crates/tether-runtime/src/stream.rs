#![forbid(unsafe_code)]

//! Push streams.
//!
//! A [`Stream<T>`] is cold: it describes how to start producing values, and
//! every [`subscribe`](Stream::subscribe) starts an independent producer.
//! Operators wrap the source and are applied per subscription.
//!
//! # Invariants
//!
//! 1. Values are delivered synchronously on the producer's call stack unless
//!    the stream passes through [`observe_on`](Stream::observe_on).
//! 2. No value reaches the sink after its subscription is disposed, including
//!    work already queued on a scheduler.
//! 3. Streams are `Clone`; clones share the source description.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::scheduler::Scheduler;
use crate::subscription::Subscription;

/// Shared downstream callback.
pub type Sink<T> = Rc<dyn Fn(T)>;

/// A cold, push-based sequence of values.
pub struct Stream<T> {
    source: Rc<dyn Fn(Sink<T>) -> Subscription>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<T: 'static> Stream<T> {
    /// Create a stream from a function that starts producing into a sink.
    pub fn new(source: impl Fn(Sink<T>) -> Subscription + 'static) -> Self {
        Self {
            source: Rc::new(source),
        }
    }

    /// A stream that never emits.
    #[must_use]
    pub fn never() -> Self {
        Self::new(|_| Subscription::empty())
    }

    /// Start a producer that calls `sink` for every value.
    pub fn subscribe(&self, sink: impl Fn(T) + 'static) -> Subscription {
        (self.source)(Rc::new(sink))
    }

    /// Transform every value.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        let f = Rc::new(f);
        Stream::new(move |sink: Sink<U>| {
            let f = Rc::clone(&f);
            self.subscribe(move |value| sink(f(value)))
        })
    }

    /// Transform every value, dropping the ones mapped to `None`.
    pub fn filter_map<U: 'static>(self, f: impl Fn(T) -> Option<U> + 'static) -> Stream<U> {
        let f = Rc::new(f);
        Stream::new(move |sink: Sink<U>| {
            let f = Rc::clone(&f);
            self.subscribe(move |value| {
                if let Some(mapped) = f(value) {
                    sink(mapped);
                }
            })
        })
    }

    /// Drop the first `count` values of each subscription.
    #[must_use]
    pub fn skip(self, count: usize) -> Stream<T> {
        Stream::new(move |sink: Sink<T>| {
            let remaining = Cell::new(count);
            self.subscribe(move |value| {
                let left = remaining.get();
                if left > 0 {
                    remaining.set(left - 1);
                } else {
                    sink(value);
                }
            })
        })
    }

    /// Deliver every value through `scheduler`. Work still queued when the
    /// subscription is disposed is discarded.
    #[must_use]
    pub fn observe_on(self, scheduler: Rc<dyn Scheduler>) -> Stream<T> {
        Stream::new(move |sink: Sink<T>| {
            let alive = Rc::new(Cell::new(true));
            let scheduler = Rc::clone(&scheduler);
            let gate = Rc::clone(&alive);
            let mut upstream = self.subscribe(move |value| {
                let gate = Rc::clone(&gate);
                let sink = Rc::clone(&sink);
                scheduler.schedule(Box::new(move || {
                    if gate.get() {
                        sink(value);
                    }
                }));
            });
            Subscription::new(move || {
                alive.set(false);
                upstream.dispose();
            })
        })
    }
}
