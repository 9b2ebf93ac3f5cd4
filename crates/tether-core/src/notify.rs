#![forbid(unsafe_code)]

//! Named change notification: the capability every non-leaf link in a chain
//! must expose.
//!
//! # Design
//!
//! [`NotifyPropertyChanged`] is the contract: subscribe a handler, get back a
//! [`HandlerToken`], unsubscribe by token. Handlers receive the name of the
//! member whose value was replaced.
//!
//! [`PropertyChangedEvent`] is a ready-made registry that host types embed to
//! implement the contract. Handlers are stored in registration order and
//! notified in that order.
//!
//! # Failure Modes
//!
//! - **Re-entrant raise**: a handler may raise, subscribe, or unsubscribe on
//!   the same event. `raise()` snapshots the handler list before calling out,
//!   so no borrow is held during callbacks.
//! - **Unsubscribe during raise**: a handler removed by an earlier handler in
//!   the same cycle is skipped for the rest of that cycle.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Upcast helpers for trait objects whose concrete type is recovered later.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Opaque registration id returned by [`NotifyPropertyChanged::subscribe_property_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerToken(u64);

impl HandlerToken {
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Callback invoked with the name of the member that changed.
pub type PropertyChangedHandler = Rc<dyn Fn(&str)>;

/// An object that announces, by member name, that one of its values was replaced.
pub trait NotifyPropertyChanged: AsAny {
    /// Register `handler`; it stays registered until the token is unsubscribed.
    fn subscribe_property_changed(&self, handler: PropertyChangedHandler) -> HandlerToken;

    /// Remove a registration. Returns `false` if the token was not registered.
    fn unsubscribe_property_changed(&self, token: HandlerToken) -> bool;
}

struct Entry {
    token: HandlerToken,
    handler: PropertyChangedHandler,
    // Cleared on unsubscribe so a raise already in flight skips the entry.
    live: Cell<bool>,
}

struct EventInner {
    next_token: u64,
    handlers: Vec<Rc<Entry>>,
}

/// Handler registry that host types embed to implement [`NotifyPropertyChanged`].
///
/// # Invariants
///
/// 1. Tokens are unique for the lifetime of the event.
/// 2. Handlers are notified in registration order.
/// 3. [`set_and_raise`](Self::set_and_raise) does not raise when the new value
///    equals the current one.
pub struct PropertyChangedEvent {
    inner: RefCell<EventInner>,
}

impl Default for PropertyChangedEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyChangedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChangedEvent")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

impl PropertyChangedEvent {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(EventInner {
                next_token: 0,
                handlers: Vec::new(),
            }),
        }
    }

    pub fn subscribe(&self, handler: PropertyChangedHandler) -> HandlerToken {
        let mut inner = self.inner.borrow_mut();
        let token = HandlerToken(inner.next_token);
        inner.next_token += 1;
        inner.handlers.push(Rc::new(Entry {
            token,
            handler,
            live: Cell::new(true),
        }));
        token
    }

    pub fn unsubscribe(&self, token: HandlerToken) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(index) = inner.handlers.iter().position(|e| e.token == token) else {
            return false;
        };
        let entry = inner.handlers.remove(index);
        entry.live.set(false);
        true
    }

    /// Number of currently registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    #[must_use]
    pub fn is_registered(&self, token: HandlerToken) -> bool {
        self.inner.borrow().handlers.iter().any(|e| e.token == token)
    }

    /// Notify every registered handler that `member` changed.
    pub fn raise(&self, member: &str) {
        // Collect first so handlers can touch this event without a borrow conflict.
        let snapshot: Vec<Rc<Entry>> = self.inner.borrow().handlers.clone();

        for entry in snapshot {
            if entry.live.get() {
                (entry.handler)(member);
            }
        }
    }

    /// Store `value` in `slot` and raise `member` if it differs from the
    /// current value. Returns whether a notification was raised.
    pub fn set_and_raise<T: PartialEq>(&self, slot: &RefCell<T>, value: T, member: &str) -> bool {
        self.set_and_raise_by(slot, value, member, |a, b| a == b)
    }

    /// Like [`set_and_raise`](Self::set_and_raise) with a caller-supplied
    /// equality, e.g. pointer identity for shared children.
    pub fn set_and_raise_by<T>(
        &self,
        slot: &RefCell<T>,
        value: T,
        member: &str,
        same: impl Fn(&T, &T) -> bool,
    ) -> bool {
        {
            let mut current = slot.borrow_mut();
            if same(&current, &value) {
                return false;
            }
            *current = value;
        }
        self.raise(member);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_reaches_handlers_in_order() {
        let event = PropertyChangedEvent::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = Rc::clone(&log);
        event.subscribe(Rc::new(move |m: &str| l1.borrow_mut().push(format!("a:{m}"))));
        let l2 = Rc::clone(&log);
        event.subscribe(Rc::new(move |m: &str| l2.borrow_mut().push(format!("b:{m}"))));

        event.raise("value");
        assert_eq!(*log.borrow(), vec!["a:value", "b:value"]);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let event = PropertyChangedEvent::new();
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        let token = event.subscribe(Rc::new(move |_: &str| h.set(h.get() + 1)));

        event.raise("x");
        assert!(event.unsubscribe(token));
        assert!(!event.unsubscribe(token));
        event.raise("x");

        assert_eq!(hits.get(), 1);
        assert_eq!(event.handler_count(), 0);
    }

    #[test]
    fn tokens_are_unique() {
        let event = PropertyChangedEvent::new();
        let a = event.subscribe(Rc::new(|_: &str| {}));
        let b = event.subscribe(Rc::new(|_: &str| {}));
        event.unsubscribe(a);
        let c = event.subscribe(Rc::new(|_: &str| {}));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn handler_removed_mid_cycle_is_skipped() {
        let event = Rc::new(PropertyChangedEvent::new());
        let second_hits = Rc::new(Cell::new(0u32));
        let second_token = Rc::new(Cell::new(None));

        let ev = Rc::clone(&event);
        let tok = Rc::clone(&second_token);
        event.subscribe(Rc::new(move |_: &str| {
            if let Some(t) = tok.get() {
                ev.unsubscribe(t);
            }
        }));
        let hits = Rc::clone(&second_hits);
        let t = event.subscribe(Rc::new(move |_: &str| hits.set(hits.get() + 1)));
        second_token.set(Some(t));

        event.raise("x");
        assert_eq!(second_hits.get(), 0);
    }

    #[test]
    fn reentrant_raise_does_not_panic() {
        let event = Rc::new(PropertyChangedEvent::new());
        let depth = Rc::new(Cell::new(0u32));
        let ev = Rc::clone(&event);
        let d = Rc::clone(&depth);
        event.subscribe(Rc::new(move |_: &str| {
            d.set(d.get() + 1);
            if d.get() < 3 {
                ev.raise("again");
            }
        }));
        event.raise("x");
        assert_eq!(depth.get(), 3);
    }

    #[test]
    fn set_and_raise_skips_equal_values() {
        let event = PropertyChangedEvent::new();
        let slot = RefCell::new(5);
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        event.subscribe(Rc::new(move |_: &str| h.set(h.get() + 1)));

        assert!(!event.set_and_raise(&slot, 5, "value"));
        assert!(event.set_and_raise(&slot, 6, "value"));
        assert_eq!(*slot.borrow(), 6);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn debug_format() {
        let event = PropertyChangedEvent::new();
        event.subscribe(Rc::new(|_: &str| {}));
        assert!(format!("{event:?}").contains("handler_count: 1"));
    }

    #[test]
    fn resubscribe_mid_cycle_is_not_called_twice() {
        let event = Rc::new(PropertyChangedEvent::new());
        let hits = Rc::new(Cell::new(0u32));
        let token = Rc::new(Cell::new(None));

        let ev = Rc::clone(&event);
        let h = Rc::clone(&hits);
        let tok = Rc::clone(&token);
        let handler: PropertyChangedHandler = Rc::new(move |_: &str| {
            h.set(h.get() + 1);
        });
        let again = Rc::clone(&handler);
        event.subscribe(Rc::new(move |_: &str| {
            // Replace the second registration with a fresh one.
            if let Some(t) = tok.take() {
                ev.unsubscribe(t);
                ev.subscribe(Rc::clone(&again));
            }
        }));
        token.set(Some(event.subscribe(handler)));

        event.raise("x");
        assert_eq!(hits.get(), 0, "the new registration joins the next cycle");
        event.raise("x");
        assert_eq!(hits.get(), 1);
        assert_eq!(event.handler_count(), 2);
    }
}
