//! Shared test utilities and fixtures
//!
//! Every test registers its modules in the process-wide registry under a
//! unique specifier, so tests running in parallel never see each other's
//! fixtures.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tosync_bridge::{CapturedError, Module, Record, registry};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A fresh module specifier with a readable prefix.
pub fn unique_specifier(prefix: &str) -> String {
    format!("{prefix}-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Register `module` under a fresh specifier and return it.
pub fn register(prefix: &str, module: Module) -> String {
    let specifier = unique_specifier(prefix);
    registry().register(specifier.clone(), module);
    specifier
}

/// Side-effect counters for the `methods` fixture.
#[derive(Default)]
pub struct Counters {
    pub final_step_runs: AtomicUsize,
}

impl Counters {
    pub fn final_step_runs(&self) -> usize {
        self.final_step_runs.load(Ordering::SeqCst)
    }
}

/// The reference fixture: constants, async functions, chains and a default
/// export.
pub fn methods_module(counters: &Arc<Counters>) -> Module {
    let chained_counter = counters.clone();

    Module::builder()
        .function("constant", |_| Ok(json!(5)))
        .function("regularMethod", |args| Ok(Value::Array(args)))
        .async_function("asyncMethod", |args| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let n = args.first().and_then(Value::as_i64).unwrap_or_default();
            Ok::<_, CapturedError>(json!(n * 2))
        })
        .async_function("rejects", |_| async {
            Err::<Value, _>(CapturedError::new("boom").with_field("code", "E_BOOM"))
        })
        .function("chained", move |_| {
            let counter = chained_counter.clone();
            Ok(Record::new().with_async_method("another", move |_, _| {
                let counter = counter.clone();
                async move {
                    Ok::<_, CapturedError>(Record::new().with_method("final", move |_, _| {
                        counter.final_step_runs.fetch_add(1, Ordering::SeqCst);
                        Ok(json!("done"))
                    }))
                }
            }))
        })
        .function("chainedWithError", |_| {
            Ok(Record::new().with_async_method("another", |_, _| async {
                Err::<Value, _>(CapturedError::new("boom"))
            }))
        })
        .default_export(
            Record::new()
                .with_method("greet", |_, args| {
                    let name = args.first().and_then(Value::as_str).unwrap_or("world");
                    Ok(json!(format!("hello, {name}")))
                })
                .with_field("version", json!(3)),
        )
        .build()
}
