//! Observable behavior of the public API on the `Node` fixture.

use std::rc::Rc;

use tether::prelude::*;
use tether::{ChainError, QueueScheduler, UnreachableTargetPolicy};
use tether_harness::{Node, Recorder, path, spine_handler_count};

#[test]
fn depth_two_chain_follows_swaps_and_nulls() {
    let tether = Tether::new();
    let a1 = Node::with_child(0, Node::new(5));
    let rec = Recorder::new();
    let _sub = tether
        .when_changed::<_, i32>(&a1, &path("child.value"))
        .unwrap()
        .subscribe(rec.sink());
    assert_eq!(rec.values(), vec![5]);

    a1.child().unwrap().set_value(7);
    assert_eq!(rec.values(), vec![5, 7]);

    a1.set_child(Some(Node::new(9)));
    assert_eq!(rec.values(), vec![5, 7, 9], "one emission per swap");

    a1.set_child(None);
    assert_eq!(rec.len(), 3);

    a1.set_child(Some(Node::new(11)));
    assert_eq!(rec.values(), vec![5, 7, 9, 11]);
}

#[test]
fn bind_gives_host_precedence_then_syncs_both_ways() {
    let tether = Tether::new();
    let host = Node::new(1);
    let target = Node::new(2);
    let _handle = tether
        .bind(&host, &path("value"), &target, &path("value"))
        .bind()
        .unwrap();

    assert_eq!(target.value(), 1);
    assert_eq!(target.value_writes(), 1);
    assert_eq!(host.value_writes(), 0);

    host.set_value(3);
    assert_eq!(target.value(), 3);
    target.set_value(4);
    assert_eq!(host.value(), 4);
}

#[test]
fn combine_waits_for_both_then_uses_latest() {
    let tether = Tether::new();
    let obj = Node::new(1);
    let rec = Recorder::new();
    let _sub = tether
        .when_changed2(&obj, &path("value"), &path("child.value"), |v1: i32, v2: i32| v1 + v2)
        .unwrap()
        .subscribe(rec.sink());
    assert!(rec.is_empty(), "child.value has not emitted yet");

    obj.set_value(2);
    assert!(rec.is_empty());

    obj.set_child(Some(Node::new(10)));
    assert_eq!(rec.values(), vec![12]);
    obj.set_value(3);
    assert_eq!(rec.values(), vec![12, 13]);
    obj.child().unwrap().set_value(20);
    assert_eq!(rec.values(), vec![12, 13, 23]);
}

#[test]
fn twelve_way_combination() {
    let tether = Tether::new();
    let obj = Node::new(1);
    let v = path("value");
    let rec = Recorder::new();
    let _sub = tether
        .when_changed12(
            &obj,
            &v, &v, &v, &v, &v, &v, &v, &v, &v, &v, &v, &v,
            |a: i32, b: i32, c: i32, d: i32, e: i32, f: i32, g: i32, h: i32, i: i32, j: i32, k: i32, l: i32| {
                a + b + c + d + e + f + g + h + i + j + k + l
            },
        )
        .unwrap()
        .subscribe(rec.sink());
    assert_eq!(rec.values(), vec![12]);

    // One change is seen by all twelve sources, one after another.
    obj.set_value(2);
    assert_eq!(rec.values().last(), Some(&24));
    assert_eq!(rec.len(), 13);
}

#[test]
fn combine_latest_rejects_bad_arity() {
    let tether = Tether::new();
    let obj = Node::new(1);
    let err = tether
        .combine_latest(&obj, &[path("value")], |values| values.len())
        .err()
        .unwrap();
    assert_eq!(err, ChainError::ArityOutOfRange { got: 1 });
}

#[test]
fn disposing_halts_all_propagation() {
    let tether = Tether::new();
    let host = Node::with_child(0, Node::new(1));
    let target = Node::with_child(0, Node::new(2));
    let mut handle = tether
        .bind(&host, &path("child.value"), &target, &path("child.value"))
        .bind()
        .unwrap();
    let rec = Recorder::new();
    let mut sub = tether
        .when_changed::<_, i32>(&host, &path("child.value"))
        .unwrap()
        .subscribe(rec.sink());

    handle.dispose();
    sub.dispose();
    assert_eq!(spine_handler_count(&host), 0);
    assert_eq!(spine_handler_count(&target), 0);

    host.child().unwrap().set_value(50);
    target.child().unwrap().set_value(60);
    host.set_child(Some(Node::new(70)));
    assert_eq!(target.child().unwrap().value(), 60);
    assert_eq!(host.child().unwrap().value(), 70);
    assert_eq!(rec.values(), vec![1]);
}

#[test]
fn dropping_the_handle_disposes() {
    let tether = Tether::new();
    let host = Node::new(1);
    let target = Node::new(0);
    {
        let _handle = tether
            .one_way_bind(&host, &path("value"), &target, &path("value"))
            .bind()
            .unwrap();
        assert_eq!(host.handler_count(), 1);
    }
    assert_eq!(host.handler_count(), 0);
    host.set_value(5);
    assert_eq!(target.value(), 1);
}

#[test]
fn engine_config_reaches_bindings() {
    let tether = Tether::with_config(
        TetherConfig::default()
            .with_reentrancy_guard(false)
            .with_unreachable_target(UnreachableTargetPolicy::Skip),
    );
    let host = Node::new(1);
    let target = Node::new(0);
    let handle = tether
        .bind(&host, &path("value"), &target, &path("value"))
        .bind()
        .unwrap();
    host.set_value(2);
    // Without the guard the echo reaches the host as a no-op assignment.
    assert_eq!(host.value_writes(), 2);
    assert_eq!(handle.stats().suppressed, 0);
}

#[test]
fn deferred_one_way_with_converter() {
    let tether = Tether::new();
    let host = Node::new(3);
    let target = Node::labeled("");
    let queue = Rc::new(QueueScheduler::new());
    let handle = tether
        .one_way_bind(&host, &path("value"), &target, &path("label"))
        .with_converter(converter(|n: i32| "*".repeat(n as usize)))
        .with_scheduler(queue.clone())
        .bind()
        .unwrap();
    assert_eq!(target.label(), "");
    assert_eq!(queue.run_pending(), 1);
    assert_eq!(target.label(), "***");
    assert_eq!(handle.stats().writes_applied, 1);
}
