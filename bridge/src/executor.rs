//! Worker-side request execution.
//!
//! Per request: resolve the module → resolve and invoke the first step →
//! feed each result into the next step of the chain → encode the response →
//! post it → close the port → notify the caller.
//!
//! Every failure is turned into data. Import failures become a diagnostic
//! string result, unresolved names become `null`, and failed or panicking
//! steps become the response's `error`. Nothing escapes to kill the worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use tosync_types::{CapturedError, DEFAULT_EXPORT, Request, Response, Step, encode_response};

use crate::config::RuntimeMode;
use crate::module::{Module, ModuleLoader};
use crate::object::{CallResult, Field, Invocation, Method, Object, Record};
use crate::signal::{Signal, WorkerPort};

/// A request in flight to the worker, with its reply path.
pub struct Envelope {
    request: Request,
    reply: Reply,
}

impl Envelope {
    pub(crate) fn new(request: Request, signal: Arc<Signal>, port: WorkerPort) -> Self {
        Self {
            request,
            reply: Reply {
                port: Some(port),
                signal,
            },
        }
    }
}

/// Closes the port and notifies the caller when dropped.
///
/// Held for the whole of [`serve`], so the caller is woken on every exit
/// path, including an envelope dropped unserved or a panic while serving.
struct Reply {
    port: Option<WorkerPort>,
    signal: Arc<Signal>,
}

impl Reply {
    fn post(&mut self, message: Vec<u8>) {
        if let Some(port) = self.port.take()
            && port.post(message).is_err()
        {
            tracing::debug!("caller port closed before the response was posted");
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        drop(self.port.take());
        self.signal.notify();
    }
}

/// Handle one envelope end to end.
pub(crate) async fn serve(envelope: Envelope, loader: &dyn ModuleLoader, mode: RuntimeMode) {
    let Envelope { request, mut reply } = envelope;

    match mode {
        RuntimeMode::Development => tracing::debug!(
            module = request.module(),
            functions = ?request.function_names(),
            request = %serde_json::to_string(&request).unwrap_or_default(),
            "handling request"
        ),
        RuntimeMode::Production => tracing::trace!(
            module = request.module(),
            functions = ?request.function_names(),
            "handling request"
        ),
    }

    let response = execute(request, loader).await;
    let message = encode_response(&response).or_else(|err| {
        tracing::warn!(error = %err, "worker response could not be encoded");
        encode_response(&Response::serialization_failure())
    });

    match message {
        Ok(bytes) => reply.post(bytes),
        // Only reachable if the sentinel itself fails to encode; the caller
        // sees a closed port and reports a missing response.
        Err(err) => tracing::error!(error = %err, "failed to encode fallback response"),
    }
}

/// Run a request against `loader` and build its response.
pub async fn execute(request: Request, loader: &dyn ModuleLoader) -> Response {
    let (specifier, steps) = request.into_steps();

    match run_steps(&specifier, steps, loader).await {
        Ok(object) => match object.into_value() {
            Ok(value) => Response::success(value),
            Err(err) => {
                tracing::warn!(module = %specifier, error = %err, "result cannot be serialized");
                Response::serialization_failure()
            }
        },
        Err(error) => {
            tracing::debug!(module = %specifier, %error, "invocation failed");
            Response::failure(error)
        }
    }
}

async fn run_steps(specifier: &str, steps: Vec<Step>, loader: &dyn ModuleLoader) -> CallResult {
    let module = match loader.load(specifier) {
        Ok(module) => module,
        Err(err) => {
            tracing::warn!(module = %specifier, error = %err, "import failed");
            return Ok(Object::Value(Value::String(format!(
                "Failed to import '{specifier}': {err}"
            ))));
        }
    };

    let mut steps = steps.into_iter();
    let Some(first) = steps.next() else {
        return Ok(Object::null());
    };

    // A miss yields null; any later step then reads a property of null.
    let mut current = match resolve_export(&module, first)? {
        Some(invocation) => settle(invocation).await?,
        None => {
            tracing::debug!(module = %specifier, "function not found; result is null");
            Object::null()
        }
    };

    for step in steps {
        current = match property(&current, &step.name)? {
            Property::Method(owner, method) => {
                // Chained steps receive their argument group as one array argument.
                let args = vec![Value::Array(step.args)];
                settle(guarded(|| method(owner, args))).await?
            }
            Property::Plain(object) => object,
        };
    }

    Ok(current)
}

/// Resolve the first step against the module namespace.
///
/// Named export first, then a default-export function for `default`, then a
/// property of the default-export record. `Ok(None)` is a resolution miss.
fn resolve_export(module: &Module, step: Step) -> Result<Option<Invocation>, CapturedError> {
    let Step { name, args } = step;

    if let Some(function) = module.export(&name) {
        return Ok(Some(guarded(|| function(args))));
    }
    if name == DEFAULT_EXPORT
        && let Some(function) = module.default_function()
    {
        return Ok(Some(guarded(|| function(args))));
    }

    let Some(default) = module.default_export() else {
        return Ok(None);
    };
    match default.get(&name) {
        Some(Field::Method(method)) => {
            let owner = default.clone();
            Ok(Some(guarded(|| method(owner, args))))
        }
        Some(Field::Object(_)) => Err(CapturedError::new(format!("'{name}' is not a function"))),
        None => Ok(None),
    }
}

enum Property {
    Method(Arc<Record>, Method),
    Plain(Object),
}

/// Read `name` off the previous step's result.
fn property(current: &Object, name: &str) -> Result<Property, CapturedError> {
    match current {
        Object::Record(record) => Ok(match record.get(name) {
            Some(Field::Method(method)) => Property::Method(record.clone(), method.clone()),
            Some(Field::Object(object)) => Property::Plain(object.clone()),
            None => Property::Plain(Object::null()),
        }),
        Object::Value(Value::Object(map)) => Ok(Property::Plain(Object::Value(
            map.get(name).cloned().unwrap_or(Value::Null),
        ))),
        Object::Value(Value::Null) => Err(CapturedError::new(format!(
            "cannot read property '{name}' of null"
        ))),
        Object::Value(_) => Ok(Property::Plain(Object::null())),
    }
}

/// Call a callable, turning a panic into a captured error.
fn guarded(call: impl FnOnce() -> Invocation) -> Invocation {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Invocation::Ready(Err(panic_error(&*payload))))
}

/// Await an invocation, turning a panic while polling into a captured error.
async fn settle(invocation: Invocation) -> CallResult {
    AssertUnwindSafe(invocation.settle())
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panic_error(&*payload)))
}

fn panic_error(payload: &(dyn Any + Send)) -> CapturedError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    CapturedError::new(format!("function panicked: {detail}")).with_field("panic", true)
}
