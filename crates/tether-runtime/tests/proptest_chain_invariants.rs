//! Property-based invariant tests for the chain observer.
//!
//! A depth-2 chain `child.child.value` is driven by random sequences of link
//! swaps, link clears, leaf writes and re-announcements. After every step:
//!
//! 1. A reachable leaf means the last emission equals a fresh walk.
//! 2. Each operation emits exactly the number of values it should (0 or 1).
//! 3. Handlers are registered on exactly the reachable spine, one per node.
//! 4. Objects detached from the spine hold no handlers.
//! 5. After dispose, no handler remains anywhere on the spine.

use std::rc::Rc;

use proptest::prelude::*;
use tether_core::{AccessorCache, ChainValue, Value};
use tether_harness::{Node, Recorder, descend, spine_handler_count, value_path};
use tether_runtime::ChainObserver;

const DEPTH: usize = 2;

#[derive(Debug, Clone)]
enum Op {
    /// Replace the `child` of the node at `level` with a fresh subtree, or clear it.
    Swap { level: usize, leaf: Option<i32> },
    /// Assign the leaf value.
    SetLeaf(i32),
    /// Re-announce `child` on the node at `level` without changing it.
    Raise { level: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..DEPTH, proptest::option::of(-5i32..5)).prop_map(|(level, leaf)| Op::Swap { level, leaf }),
        (-5i32..5).prop_map(Op::SetLeaf),
        (0..DEPTH).prop_map(|level| Op::Raise { level }),
    ]
}

fn leaf(root: &Rc<Node>) -> Option<i32> {
    descend(root, DEPTH).map(|node| node.value())
}

fn reachable_nodes(root: &Rc<Node>) -> usize {
    (0..=DEPTH).filter(|&d| descend(root, d).is_some()).count()
}

/// Apply `op`, returning the number of emissions it must produce and any
/// subtree it detached.
fn apply(root: &Rc<Node>, op: &Op) -> (usize, Option<Rc<Node>>) {
    match *op {
        Op::Swap { level, leaf: new_leaf } => {
            let Some(node) = descend(root, level) else {
                return (0, None);
            };
            let old = node.child();
            match new_leaf {
                Some(v) => {
                    node.set_child(Some(Node::nested(DEPTH - level - 1, v)));
                    (1, old)
                }
                None => {
                    node.set_child(None);
                    (0, old)
                }
            }
        }
        Op::SetLeaf(v) => match descend(root, DEPTH) {
            Some(node) => {
                let changed = node.value() != v;
                node.set_value(v);
                (usize::from(changed), None)
            }
            None => (0, None),
        },
        Op::Raise { level } => match descend(root, level) {
            Some(node) => {
                node.raise("child");
                (usize::from(leaf(root).is_some()), None)
            }
            None => (0, None),
        },
    }
}

proptest! {
    #[test]
    fn chain_tracks_model(start in -5i32..5, ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let cache = AccessorCache::new();
        let root = Node::nested(DEPTH, start);
        let observer = ChainObserver::new(&cache, Value::node(Rc::clone(&root)), &value_path(DEPTH)).unwrap();
        let rec = Recorder::new();
        let sink = rec.sink();
        let mut sub = observer.subscribe(move |v| sink(i32::from_value(&v)));

        prop_assert_eq!(rec.values(), vec![Some(start)]);

        for op in &ops {
            let before = rec.len();
            let (expected, detached) = apply(&root, op);
            prop_assert_eq!(rec.len() - before, expected, "op {:?}", op);

            if let Some(value) = leaf(&root) {
                if expected > 0 {
                    prop_assert_eq!(rec.values().last().copied(), Some(Some(value)));
                }
            }
            prop_assert_eq!(sub.bound_levels(), reachable_nodes(&root));
            prop_assert_eq!(spine_handler_count(&root), reachable_nodes(&root));
            prop_assert_eq!(sub.is_suspended(), leaf(&root).is_none());
            if let Some(old) = detached {
                prop_assert_eq!(spine_handler_count(&old), 0);
            }
        }

        sub.dispose();
        prop_assert_eq!(spine_handler_count(&root), 0);
    }

    #[test]
    fn subscribe_emits_exactly_current_leaf(depth in 0usize..6, value in any::<i32>()) {
        let cache = AccessorCache::new();
        let root = Node::nested(depth, value);
        let observer = ChainObserver::new(&cache, Value::node(Rc::clone(&root)), &value_path(depth)).unwrap();
        let rec = Recorder::new();
        let sink = rec.sink();
        let sub = observer.subscribe(move |v| sink(i32::from_value(&v)));
        prop_assert_eq!(rec.values(), vec![Some(value)]);
        prop_assert_eq!(sub.bound_levels(), depth + 1);
    }
}
