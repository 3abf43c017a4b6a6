//! Worker lifecycle: one lazily created worker per process

use std::thread;

use serde_json::json;
use tosync_bridge::{Module, get_or_create_worker, spawned_workers, synchronize};

use crate::common::register;

#[test]
fn repeated_lookups_return_same_worker() {
    let first = get_or_create_worker().unwrap();
    for _ in 0..100 {
        let again = get_or_create_worker().unwrap();
        assert!(std::ptr::eq(first, again));
    }
    assert_eq!(spawned_workers(), 1);
}

#[test]
fn calls_run_on_worker_thread() {
    let module = register(
        "thread-id",
        Module::builder()
            .function("current", |_| {
                Ok(json!(format!("{:?}", thread::current().id())))
            })
            .build(),
    );
    let worker = get_or_create_worker().unwrap();
    let reported = synchronize(&module, "current").call(vec![]).unwrap();
    assert_eq!(reported, json!(format!("{:?}", worker.thread_id())));
    assert_ne!(worker.thread_id(), thread::current().id());
}
