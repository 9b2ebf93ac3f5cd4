#![forbid(unsafe_code)]

//! Combine-latest over several chains of one root.
//!
//! # Invariants
//!
//! 1. Nothing is emitted until every source has emitted at least once.
//! 2. After that, each source emission produces one projection over the
//!    latest value of every source.
//! 3. Disposing the returned subscription disposes every source observer.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tether_core::{AccessorCache, ChainError, PropertyChain, Result, Value};

use crate::observer::ChainObserver;
use crate::stream::{Sink, Stream};
use crate::subscription::{CompositeSubscription, Subscription};

type Projection<R> = Rc<dyn Fn(&[Value]) -> Option<R>>;

/// Combine-latest of 2 to 12 [`ChainObserver`]s through a projection.
///
/// The projection receives one value per chain, in chain order. Returning
/// `None` drops that combination.
pub struct CombineLatest<R> {
    observers: Vec<ChainObserver>,
    project: Projection<R>,
}

impl<R> Clone for CombineLatest<R> {
    fn clone(&self) -> Self {
        Self {
            observers: self.observers.clone(),
            project: Rc::clone(&self.project),
        }
    }
}

impl<R> fmt::Debug for CombineLatest<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombineLatest")
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl<R: 'static> CombineLatest<R> {
    pub const MIN_ARITY: usize = 2;
    pub const MAX_ARITY: usize = 12;

    pub fn new(
        cache: &AccessorCache,
        root: Value,
        chains: &[PropertyChain],
        project: impl Fn(&[Value]) -> Option<R> + 'static,
    ) -> Result<Self> {
        if !(Self::MIN_ARITY..=Self::MAX_ARITY).contains(&chains.len()) {
            return Err(ChainError::ArityOutOfRange { got: chains.len() });
        }
        let expected = chains[0].root_type();
        if let Some(other) = chains.iter().find(|c| c.root_type() != expected) {
            return Err(ChainError::RootTypeMismatch {
                expected: expected.name(),
                actual: other.root_type().name(),
            });
        }
        let observers = chains
            .iter()
            .map(|chain| ChainObserver::new(cache, root.clone(), chain))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            observers,
            project: Rc::new(project),
        })
    }

    #[must_use]
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.observers = self
            .observers
            .into_iter()
            .map(|observer| observer.with_trace(enabled))
            .collect();
        self
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.observers.len()
    }

    pub fn subscribe(&self, sink: impl Fn(R) + 'static) -> Subscription {
        let latest: Rc<RefCell<Vec<Option<Value>>>> =
            Rc::new(RefCell::new(vec![None; self.observers.len()]));
        let sink: Sink<R> = Rc::new(sink);
        tracing::debug!(arity = self.observers.len(), "combine-latest subscribed");

        let mut parts = CompositeSubscription::new();
        for (index, observer) in self.observers.iter().enumerate() {
            let latest = Rc::clone(&latest);
            let sink = Rc::clone(&sink);
            let project = Rc::clone(&self.project);
            let sub = observer.subscribe(move |value| {
                let ready: Option<Vec<Value>> = {
                    let mut slots = latest.borrow_mut();
                    slots[index] = Some(value);
                    slots.iter().cloned().collect()
                };
                if let Some(out) = ready.and_then(|values| project(&values)) {
                    sink(out);
                }
            });
            parts.add(sub.into_subscription());
        }
        parts.into_subscription()
    }

    #[must_use]
    pub fn stream(&self) -> Stream<R> {
        let combined = self.clone();
        Stream::new(move |sink: Sink<R>| combined.subscribe(move |out| sink(out)))
    }
}
