#![forbid(unsafe_code)]

//! Switch-latest observation of one property chain.
//!
//! # Design
//!
//! A [`ChainObserver`] watches `root.s0.s1 … sN-1` and emits the leaf value
//! whenever it may have changed. Each subscription owns a `ChainState`: one
//! `Level` per step holding the object the step is read from, the handler
//! token registered on it, and a generation number.
//!
//! When level `i` reports a change of its member, the observer reads the new
//! value and rebinds levels `i+1..N` against it: every stale handler is
//! unregistered first, then the remainder of the chain is walked and
//! subscribed, and exactly one leaf value is emitted. A change at the last
//! level simply emits the new leaf.
//!
//! Handlers hold a `Weak` to the state plus `(level, generation)`. A handler
//! whose generation no longer matches its level is a leftover from before a
//! swap and is ignored.
//!
//! # Invariants
//!
//! 1. Every level whose parent is a live host object has exactly one handler
//!    registered on that object. Levels below a null link have none.
//! 2. One change notification produces at most one emission.
//! 3. A value emitted after a swap is always read from the new object.
//! 4. After `dispose()` no handler registered by this subscription remains,
//!    and no parent object is retained.
//!
//! # Failure Modes
//!
//! - **Null link**: not an error. Levels below it stay unbound and nothing is
//!   emitted until the link is set again.
//! - **Panicking unsubscribe**: every stale handler is still unregistered
//!   before the first panic is resumed.
//! - **Getter re-entry**: a getter may raise a notification on an object the
//!   walk has already subscribed to (a lazily created child announcing
//!   itself). The accepted notification runs its own rebind or emission and
//!   takes over every level below it; the interrupted walk sees the notice
//!   count move and returns without touching further levels or emitting.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use smallvec::SmallVec;
use tether_core::{Accessor, AccessorCache, ChainError, HandlerToken, PropertyChain, Result, Value};

use crate::stream::{Sink, Stream};
use crate::subscription::{Subscription, run_all};

/// A cold stream of the leaf value of `root` along `chain`.
#[derive(Clone)]
pub struct ChainObserver {
    root: Value,
    chain: PropertyChain,
    accessors: Rc<[Arc<Accessor>]>,
    trace: bool,
}

impl ChainObserver {
    /// Resolve every step's accessor through `cache`.
    ///
    /// A null `root` is accepted; its subscriptions never emit.
    pub fn new(cache: &AccessorCache, root: Value, chain: &PropertyChain) -> Result<Self> {
        let expected = chain.root_type();
        if let Some(any) = root.as_any() {
            if Any::type_id(any) != expected.id() {
                return Err(ChainError::RootTypeMismatch {
                    expected: expected.name(),
                    actual: "an instance of another type",
                });
            }
        }
        let accessors = chain
            .steps()
            .iter()
            .map(|step| cache.accessor(&step.declaring_type(), step.member()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            root,
            chain: chain.clone(),
            accessors: accessors.into(),
            trace: false,
        })
    }

    /// Log every emission at `trace`.
    #[must_use]
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    #[must_use]
    pub fn chain(&self) -> &PropertyChain {
        &self.chain
    }

    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Start observing. The current leaf value is emitted before this returns
    /// unless a link is null.
    pub fn subscribe(&self, sink: impl Fn(Value) + 'static) -> ChainSubscription {
        let state = Rc::new(RefCell::new(ChainState {
            accessors: Rc::clone(&self.accessors),
            levels: (0..self.accessors.len()).map(|_| Level::unbound()).collect(),
            sink: Some(Rc::new(sink)),
            next_generation: 0,
            notices: 0,
            disposed: false,
            path: self.chain.to_string().into(),
            trace: self.trace,
        }));
        tracing::debug!(chain = %self.chain, levels = self.accessors.len(), "chain observer subscribed");

        if let Some(leaf) = rebind_from(&state, 0, self.root.clone()) {
            emit(&state, leaf);
        }
        ChainSubscription { state }
    }

    /// This observer as a [`Stream`].
    #[must_use]
    pub fn stream(&self) -> Stream<Value> {
        let observer = self.clone();
        Stream::new(move |sink: Sink<Value>| {
            observer
                .subscribe(move |value| sink(value))
                .into_subscription()
        })
    }
}

impl fmt::Debug for ChainObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainObserver")
            .field("chain", &self.chain.to_string())
            .field("root", &self.root)
            .field("trace", &self.trace)
            .finish()
    }
}

struct Level {
    parent: Value,
    token: Option<HandlerToken>,
    generation: u64,
}

impl Level {
    fn unbound() -> Self {
        Self {
            parent: Value::Null,
            token: None,
            generation: 0,
        }
    }
}

struct ChainState {
    accessors: Rc<[Arc<Accessor>]>,
    levels: SmallVec<[Level; 4]>,
    sink: Option<Sink<Value>>,
    next_generation: u64,
    // Accepted change notifications, used to detect re-entry through a getter.
    notices: u64,
    disposed: bool,
    path: Rc<str>,
    trace: bool,
}

impl ChainState {
    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Forget levels `start..`, returning the registrations to undo.
    fn detach_from(&mut self, start: usize) -> Vec<(Value, HandlerToken)> {
        let mut stale = Vec::new();
        for level in &mut self.levels[start..] {
            let parent = std::mem::take(&mut level.parent);
            if let Some(token) = level.token.take() {
                stale.push((parent, token));
            }
        }
        stale
    }

    fn is_current(&self, level: usize, generation: u64) -> bool {
        !self.disposed && self.levels[level].generation == generation
    }

    /// Whether no notification was accepted since `notices` was sampled.
    fn undisturbed(&self, notices: u64) -> bool {
        !self.disposed && self.notices == notices
    }
}

fn unregister(stale: Vec<(Value, HandlerToken)>) -> Option<Box<dyn Any + Send>> {
    run_all(stale.into_iter().map(|(parent, token)| {
        move || {
            if let Some(node) = parent.as_notifier() {
                node.unsubscribe_property_changed(token);
            }
        }
    }))
}

/// Bind levels `start..` beginning with `parent` as the object of level
/// `start`. Returns the leaf value, or `None` if a link is null or a newer
/// rebind took over.
fn rebind_from(state: &Rc<RefCell<ChainState>>, start: usize, parent: Value) -> Option<Value> {
    let (stale, accessors) = {
        let mut s = state.borrow_mut();
        if s.disposed {
            return None;
        }
        tracing::trace!(chain = %s.path, level = start, "rebinding chain");
        (s.detach_from(start), Rc::clone(&s.accessors))
    };
    // Old registrations go before any new one is made.
    if let Some(payload) = unregister(stale) {
        panic::resume_unwind(payload);
    }

    let weak = Rc::downgrade(state);
    let mut current = parent;
    let mut last = (start, 0);
    for (level, accessor) in accessors.iter().enumerate().skip(start) {
        let (generation, notices) = {
            let mut s = state.borrow_mut();
            let generation = s.bump_generation();
            let slot = &mut s.levels[level];
            slot.parent = current.clone();
            slot.generation = generation;
            (generation, s.notices)
        };
        last = (level, generation);

        match &current {
            Value::Null => return None,
            Value::Node(node) => {
                let handler = level_handler(weak.clone(), level, generation, accessor.member());
                let token = node.subscribe_property_changed(handler);
                let mut s = state.borrow_mut();
                if !s.is_current(level, generation) {
                    drop(s);
                    node.unsubscribe_property_changed(token);
                    return None;
                }
                s.levels[level].token = Some(token);
            }
            // Plain values are read through but never subscribed to.
            Value::Leaf(_) => {}
        }
        current = accessor.get(&current).unwrap_or_default();
        // A notification raised by the getter already rebound what follows.
        if !state.borrow().undisturbed(notices) {
            return None;
        }
    }

    let (level, generation) = last;
    state
        .borrow()
        .is_current(level, generation)
        .then_some(current)
}

fn level_handler(
    weak: Weak<RefCell<ChainState>>,
    level: usize,
    generation: u64,
    member: &'static str,
) -> Rc<dyn Fn(&str)> {
    Rc::new(move |changed: &str| {
        if changed == member {
            on_changed(&weak, level, generation);
        }
    })
}

fn on_changed(weak: &Weak<RefCell<ChainState>>, level: usize, generation: u64) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let (parent, accessor, is_leaf, notices) = {
        let mut s = state.borrow_mut();
        if !s.is_current(level, generation) || s.levels[level].token.is_none() {
            return;
        }
        s.notices += 1;
        (
            s.levels[level].parent.clone(),
            Arc::clone(&s.accessors[level]),
            level + 1 == s.levels.len(),
            s.notices,
        )
    };

    let value = accessor.get(&parent).unwrap_or_default();
    if !state.borrow().undisturbed(notices) {
        return;
    }
    let leaf = if is_leaf {
        Some(value)
    } else {
        rebind_from(&state, level + 1, value)
    };
    if let Some(leaf) = leaf {
        emit(&state, leaf);
    }
}

fn emit(state: &Rc<RefCell<ChainState>>, leaf: Value) {
    let sink = {
        let s = state.borrow();
        if s.disposed {
            return;
        }
        if s.trace {
            tracing::trace!(chain = %s.path, value = ?leaf, "chain emission");
        }
        s.sink.clone()
    };
    // Called without holding the borrow: the sink may dispose or write.
    if let Some(sink) = sink {
        sink(leaf);
    }
}

/// A live chain observation. Dropping it disposes.
pub struct ChainSubscription {
    state: Rc<RefCell<ChainState>>,
}

impl ChainSubscription {
    /// Number of levels that currently hold a change handler.
    #[must_use]
    pub fn bound_levels(&self) -> usize {
        self.state
            .borrow()
            .levels
            .iter()
            .filter(|level| level.token.is_some())
            .count()
    }

    /// Whether a null link currently keeps the leaf out of reach.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        let s = self.state.borrow();
        !s.disposed && s.levels.iter().any(|level| level.parent.is_null())
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    /// Unregister every handler. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some(payload) = self.teardown() {
            panic::resume_unwind(payload);
        }
    }

    fn teardown(&mut self) -> Option<Box<dyn Any + Send>> {
        let (stale, path) = {
            let mut s = self.state.borrow_mut();
            if s.disposed {
                return None;
            }
            s.disposed = true;
            s.sink = None;
            (s.detach_from(0), Rc::clone(&s.path))
        };
        tracing::debug!(chain = %path, handlers = stale.len(), "chain observer disposed");
        unregister(stale)
    }

    /// Convert into a plain [`Subscription`].
    #[must_use]
    pub fn into_subscription(self) -> Subscription {
        let mut this = self;
        Subscription::new(move || this.dispose())
    }
}

impl Drop for ChainSubscription {
    fn drop(&mut self) {
        if let Some(payload) = self.teardown() {
            if !std::thread::panicking() {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl fmt::Debug for ChainSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("ChainSubscription")
            .field("chain", &&*s.path)
            .field("bound_levels", &s.levels.iter().filter(|l| l.token.is_some()).count())
            .field("disposed", &s.disposed)
            .finish()
    }
}
