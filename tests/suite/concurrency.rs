//! Concurrent synchronized callers

use std::thread;
use std::time::Duration;

use serde_json::{Value, json};
use tosync_bridge::{CapturedError, Module, synchronize};

use crate::common::register;

fn echo_module() -> String {
    register(
        "echo",
        Module::builder()
            .async_function("echo", |args| async move {
                // Vary completion time so responses would interleave if ports were shared.
                let delay = args.first().and_then(Value::as_u64).unwrap_or_default() % 3;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, CapturedError>(Value::Array(args))
            })
            .build(),
    )
}

#[test]
fn concurrent_callers_receive_their_own_results() {
    let module = echo_module();

    thread::scope(|scope| {
        for caller in 0..8u64 {
            let module = &module;
            scope.spawn(move || {
                let echo = synchronize(module, "echo");
                for call in 0..25u64 {
                    let id = caller * 1000 + call;
                    let result = echo.call(vec![json!(id), json!(caller)]).unwrap();
                    assert_eq!(result, json!([id, caller]));
                }
            });
        }
    });
}

#[test]
fn failures_do_not_leak_into_other_callers() {
    let module = register(
        "mixed",
        Module::builder()
            .function("ok", |args| Ok(Value::Array(args)))
            .async_function("fail", |args| async move {
                Err::<Value, _>(CapturedError::new(format!("failed {}", args[0])))
            })
            .build(),
    );

    thread::scope(|scope| {
        for caller in 0..4u64 {
            let module = &module;
            scope.spawn(move || {
                for call in 0..10u64 {
                    let id = caller * 100 + call;
                    if id % 2 == 0 {
                        let result = synchronize(module, "ok").call(vec![json!(id)]).unwrap();
                        assert_eq!(result, json!([id]));
                    } else {
                        let result = synchronize(module, "fail").call(vec![json!(id)]).unwrap();
                        assert_eq!(result, json!({"error": format!("failed {id}")}));
                    }
                }
            });
        }
    });
}
