#![forbid(unsafe_code)]

//! Change-notifying fixture types for tests and benches.
//!
//! [`Node`] is a self-referential host type: every node has `child` and
//! `sibling` links (both `Node`), an `i32` `value`, a `String` `label`, and a
//! read-only `parity` derived from `value`. Writes through the setters are
//! counted even when they do not change the value, so tests can assert on
//! exactly how many assignments a binding performed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tether_core::{
    Accessor, HandlerToken, NotifyPropertyChanged, PropertyChain, PropertyChangedEvent,
    PropertyChangedHandler, PropertyHost,
};

/// Host fixture with two links and two leaves.
pub struct Node {
    event: PropertyChangedEvent,
    child: RefCell<Option<Rc<Node>>>,
    sibling: RefCell<Option<Rc<Node>>>,
    value: RefCell<i32>,
    label: RefCell<String>,
    value_writes: Cell<usize>,
    label_writes: Cell<usize>,
}

impl Node {
    #[must_use]
    pub fn new(value: i32) -> Rc<Self> {
        Rc::new(Self {
            event: PropertyChangedEvent::new(),
            child: RefCell::new(None),
            sibling: RefCell::new(None),
            value: RefCell::new(value),
            label: RefCell::new(String::new()),
            value_writes: Cell::new(0),
            label_writes: Cell::new(0),
        })
    }

    #[must_use]
    pub fn with_child(value: i32, child: Rc<Node>) -> Rc<Self> {
        let node = Self::new(value);
        *node.child.borrow_mut() = Some(child);
        node
    }

    #[must_use]
    pub fn labeled(label: &str) -> Rc<Self> {
        let node = Self::new(0);
        *node.label.borrow_mut() = label.to_owned();
        node
    }

    /// A root with `depth` descendants linked through `child`; the deepest
    /// node holds `leaf`.
    #[must_use]
    pub fn nested(depth: usize, leaf: i32) -> Rc<Self> {
        let mut node = Self::new(leaf);
        for _ in 0..depth {
            node = Self::with_child(0, node);
        }
        node
    }

    #[must_use]
    pub fn child(&self) -> Option<Rc<Node>> {
        self.child.borrow().clone()
    }

    #[must_use]
    pub fn sibling(&self) -> Option<Rc<Node>> {
        self.sibling.borrow().clone()
    }

    #[must_use]
    pub fn value(&self) -> i32 {
        *self.value.borrow()
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.label.borrow().clone()
    }

    pub fn set_child(&self, child: Option<Rc<Node>>) {
        self.event
            .set_and_raise_by(&self.child, child, "child", same_link);
    }

    pub fn set_sibling(&self, sibling: Option<Rc<Node>>) {
        self.event
            .set_and_raise_by(&self.sibling, sibling, "sibling", same_link);
    }

    pub fn set_value(&self, value: i32) {
        self.value_writes.set(self.value_writes.get() + 1);
        self.event.set_and_raise(&self.value, value, "value");
    }

    pub fn set_label(&self, label: String) {
        self.label_writes.set(self.label_writes.get() + 1);
        self.event.set_and_raise(&self.label, label, "label");
    }

    /// Raise a notification without changing anything.
    pub fn raise(&self, member: &str) {
        self.event.raise(member);
    }

    /// Number of assignments to `value`, including no-op ones.
    #[must_use]
    pub fn value_writes(&self) -> usize {
        self.value_writes.get()
    }

    /// Number of assignments to `label`, including no-op ones.
    #[must_use]
    pub fn label_writes(&self) -> usize {
        self.label_writes.get()
    }

    /// Change handlers currently registered on this node.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.event.handler_count()
    }
}

fn same_link(a: &Option<Rc<Node>>, b: &Option<Rc<Node>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value())
            .field("label", &self.label())
            .field("has_child", &self.child.borrow().is_some())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl NotifyPropertyChanged for Node {
    fn subscribe_property_changed(&self, handler: PropertyChangedHandler) -> HandlerToken {
        self.event.subscribe(handler)
    }

    fn unsubscribe_property_changed(&self, token: HandlerToken) -> bool {
        self.event.unsubscribe(token)
    }
}

impl PropertyHost for Node {
    fn property(name: &str) -> Option<Accessor> {
        match name {
            "child" => Some(Accessor::read_write("child", Node::child, Node::set_child)),
            "sibling" => Some(Accessor::read_write(
                "sibling",
                Node::sibling,
                Node::set_sibling,
            )),
            "value" => Some(Accessor::read_write("value", Node::value, Node::set_value)),
            "label" => Some(Accessor::read_write("label", Node::label, Node::set_label)),
            "parity" => Some(Accessor::read_only("parity", |n: &Node| n.value() % 2 == 0)),
            _ => None,
        }
    }
}

/// Resolve a dotted path on [`Node`].
///
/// # Panics
///
/// Panics if the path does not resolve; fixture paths are fixed strings.
#[must_use]
pub fn path(path: &str) -> PropertyChain {
    PropertyChain::from_path::<Node>(path)
        .unwrap_or_else(|err| panic!("fixture path '{path}' failed to resolve: {err}"))
}

/// `"child.child.….value"` with `depth` links before the leaf.
#[must_use]
pub fn value_path(depth: usize) -> PropertyChain {
    let mut segments = vec!["child"; depth];
    segments.push("value");
    path(&segments.join("."))
}

/// Follow `child` links `depth` times.
#[must_use]
pub fn descend(root: &Rc<Node>, depth: usize) -> Option<Rc<Node>> {
    let mut node = Rc::clone(root);
    for _ in 0..depth {
        node = node.child()?;
    }
    Some(node)
}

/// Sum of handler counts over the `child` spine starting at `root`.
#[must_use]
pub fn spine_handler_count(root: &Rc<Node>) -> usize {
    let mut total = root.handler_count();
    let mut next = root.child();
    while let Some(node) = next {
        total += node.handler_count();
        next = node.child();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{ChainValue, TypeKey};

    #[test]
    fn nested_builds_spine() {
        let root = Node::nested(3, 42);
        assert_eq!(descend(&root, 3).unwrap().value(), 42);
        assert!(descend(&root, 4).is_none());
    }

    #[test]
    fn writes_are_counted_even_when_unchanged() {
        let node = Node::new(1);
        node.set_value(1);
        node.set_value(2);
        assert_eq!(node.value_writes(), 2);
        assert_eq!(node.value(), 2);
    }

    #[test]
    fn child_swap_uses_identity() {
        let node = Node::new(0);
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        node.subscribe_property_changed(Rc::new(move |_: &str| h.set(h.get() + 1)));

        let child = Node::new(5);
        node.set_child(Some(Rc::clone(&child)));
        node.set_child(Some(Rc::clone(&child)));
        // Equal value, different object: still a change.
        node.set_child(Some(Node::new(5)));
        node.set_child(None);
        node.set_child(None);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn paths_resolve() {
        let chain = value_path(2);
        assert_eq!(chain.path(), "child.child.value");
        assert_eq!(chain.leaf_type(), i32::type_key());
        assert_eq!(path("parity").leaf_type(), TypeKey::leaf::<bool>());
    }

    #[test]
    #[should_panic(expected = "failed to resolve")]
    fn bad_path_panics() {
        let _ = path("child.nope");
    }
}
