//! End-to-end synchronized calls through the shared worker

use std::sync::Arc;

use serde_json::{Value, json};
use tosync_bridge::{
    BridgeError, CapturedError, Module, synchronize, synchronize_chain, synchronize_default,
};
use tosync_types::SERIALIZE_FAILURE_MESSAGE;

use crate::common::{Counters, methods_module, register, unique_specifier};

fn methods() -> (String, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let specifier = register("methods", methods_module(&counters));
    (specifier, counters)
}

#[test]
fn constant_returns_five() {
    let (module, _) = methods();
    let constant = synchronize(&module, "constant");
    assert_eq!(constant.call(vec![]).unwrap(), json!(5));
}

#[test]
fn sync_function_receives_positional_args() {
    let (module, _) = methods();
    let result = synchronize(&module, "regularMethod")
        .call(vec![json!(1), json!("two"), json!(null)])
        .unwrap();
    assert_eq!(result, json!([1, "two", null]));
}

#[test]
fn async_function_matches_direct_await() {
    let (module, _) = methods();
    let result = synchronize(&module, "asyncMethod")
        .call(vec![json!(21)])
        .unwrap();
    assert_eq!(result, json!(42));
}

#[test]
fn chain_runs_every_step() {
    let (module, counters) = methods();
    let chain = synchronize_chain(&module, ["chained", "another", "final"]).unwrap();
    let result = chain.call(vec![vec![], vec![], vec![]]).unwrap();
    assert_eq!(result, json!("done"));
    assert_eq!(counters.final_step_runs(), 1);
}

#[test]
fn chain_failure_at_step_two_is_merged() {
    let (module, counters) = methods();
    let chain = synchronize_chain(&module, ["chainedWithError", "another", "final"]).unwrap();
    let result = chain.call(vec![vec![], vec![], vec![]]).unwrap();
    assert_eq!(result, json!({"error": "boom"}));
    assert_eq!(counters.final_step_runs(), 0);
}

#[test]
fn chain_failure_raw_response_keeps_error() {
    let (module, _) = methods();
    let chain = synchronize_chain(&module, ["chainedWithError", "another"]).unwrap();
    let response = chain.call_raw(vec![vec![], vec![]]).unwrap();
    assert!(response.result().is_null());
    assert_eq!(response.error().map(CapturedError::message), Some("boom"));
}

#[test]
fn rejection_with_extra_fields_is_merged_as_error_data() {
    let (module, _) = methods();
    let result = synchronize(&module, "rejects").call(vec![]).unwrap();
    assert_eq!(
        result,
        json!({"error": "boom", "errorData": {"code": "E_BOOM"}})
    );
}

#[test]
fn missing_module_reports_import_failure_and_worker_keeps_serving() {
    let missing = unique_specifier("never-registered");
    let result = synchronize(&missing, "anything").call(vec![]).unwrap();
    let message = result.as_str().unwrap();
    assert!(message.contains("Failed to import"));
    assert!(message.contains(&missing));

    let (module, _) = methods();
    assert_eq!(synchronize(&module, "constant").call(vec![]).unwrap(), json!(5));
}

#[test]
fn unknown_function_returns_null() {
    let (module, _) = methods();
    let result = synchronize(&module, "doesNotExist").call(vec![]).unwrap();
    assert_eq!(result, Value::Null);
}

#[test]
fn default_export_method_is_reachable_by_name() {
    let (module, _) = methods();
    let greet = synchronize(&module, "greet");
    assert_eq!(greet.call(vec![json!("bridge")]).unwrap(), json!("hello, bridge"));
}

#[test]
fn default_export_plain_field_is_not_callable() {
    let (module, _) = methods();
    let result = synchronize(&module, "version").call(vec![]).unwrap();
    assert_eq!(result, json!({"error": "'version' is not a function"}));
}

#[test]
fn synchronize_default_calls_default_function() {
    let module = register(
        "default-fn",
        Module::builder()
            .function("default", |args| Ok(json!({"received": args})))
            .build(),
    );
    let result = synchronize_default(&module).call(vec![json!(1)]).unwrap();
    assert_eq!(result, json!({"received": [1]}));
}

#[test]
fn live_object_result_cannot_cross_boundary() {
    let module = register(
        "live",
        Module::builder()
            .function("handle", |_| {
                Ok(tosync_bridge::Record::new().with_method("close", |_, _| Ok(Value::Null)))
            })
            .build(),
    );
    let response = synchronize(&module, "handle").call_raw(vec![]).unwrap();
    assert_eq!(
        response.error().map(CapturedError::message),
        Some(SERIALIZE_FAILURE_MESSAGE)
    );
}

#[test]
fn panicking_function_becomes_error() {
    let module = register(
        "panics",
        Module::builder()
            .function("explode", |_| -> Result<Value, CapturedError> {
                panic!("kaboom")
            })
            .build(),
    );
    let result = synchronize(&module, "explode").call(vec![]).unwrap();
    assert_eq!(result["error"], json!("function panicked: kaboom"));
    assert_eq!(result["errorData"]["panic"], json!(true));

    let (methods, _) = methods();
    assert_eq!(synchronize(&methods, "constant").call(vec![]).unwrap(), json!(5));
}

#[test]
fn synchronized_call_from_worker_is_rejected() {
    let module = register(
        "reentrant",
        Module::builder()
            .function("nested", |_| {
                synchronize("anything", "noop")
                    .call(vec![])
                    .map_err(|err| CapturedError::new(err.to_string()))
            })
            .build(),
    );
    let result = synchronize(&module, "nested").call(vec![]).unwrap();
    assert_eq!(result, json!({"error": BridgeError::Reentrant.to_string()}));
}

#[test]
fn callable_default_export_is_called_by_synchronize_default() {
    let module = register(
        "callable-default",
        Module::builder()
            .default_async_function(|args| async move {
                Ok::<_, CapturedError>(json!({"called": args}))
            })
            .build(),
    );
    let result = synchronize_default(&module).call(vec![json!("x")]).unwrap();
    assert_eq!(result, json!({"called": ["x"]}));
}

#[test]
fn chain_after_unknown_function_reports_null_property() {
    let (module, _) = methods();
    let chain = synchronize_chain(&module, ["doesNotExist", "next"]).unwrap();
    let result = chain.call(vec![vec![], vec![]]).unwrap();
    assert_eq!(
        result,
        json!({"error": "cannot read property 'next' of null"})
    );
}

#[test]
fn into_fn_wraps_call() {
    let (module, _) = methods();
    let double = synchronize(&module, "asyncMethod").into_fn();
    assert_eq!(double(vec![json!(4)]).unwrap(), json!(8));
    assert_eq!(double(vec![json!(5)]).unwrap(), json!(10));
}
