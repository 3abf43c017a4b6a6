//! Synchronized entry points.
//!
//! A [`SyncFn`] names one function of one module. Calling it posts a request
//! to the shared worker and parks the calling thread until the worker
//! notifies, then decodes the single response the worker left on the port.

use std::thread;

use serde_json::Value;
use tosync_types::{DEFAULT_EXPORT, Request, Response, decode_response};

use crate::error::BridgeError;
use crate::executor::Envelope;
use crate::signal;
use crate::worker::{Worker, get_or_create_worker};

/// A blocking handle to `module`'s export `name`.
#[derive(Debug, Clone)]
pub struct SyncFn {
    module: String,
    name: String,
}

/// Wrap an exported function so it can be called synchronously.
#[must_use]
pub fn synchronize(module: impl Into<String>, name: impl Into<String>) -> SyncFn {
    SyncFn {
        module: module.into(),
        name: name.into(),
    }
}

/// Wrap a module's default export.
#[must_use]
pub fn synchronize_default(module: impl Into<String>) -> SyncFn {
    synchronize(module, DEFAULT_EXPORT)
}

impl SyncFn {
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call and block. A worker-side failure is merged into the returned
    /// value under the `error` key.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.call_raw(args).map(Response::into_merged)
    }

    /// Call and block, returning the worker's response as is.
    pub fn call_raw(&self, args: Vec<Value>) -> Result<Response, BridgeError> {
        let request = Request::single(&self.module, &self.name, args);
        dispatch(get_or_create_worker()?, request)
    }

    /// A plain closure over [`SyncFn::call`].
    pub fn into_fn(self) -> impl Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync {
        move |args| self.call(args)
    }
}

/// A blocking handle to a chain: the first name resolves against the module,
/// each later name against the previous step's result.
#[derive(Debug, Clone)]
pub struct SyncChain {
    module: String,
    names: Vec<String>,
}

/// Wrap a chain of property reads and calls starting at `module`.
pub fn synchronize_chain<I, S>(
    module: impl Into<String>,
    names: I,
) -> Result<SyncChain, BridgeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
        return Err(tosync_types::ProtocolError::EmptyChain.into());
    }
    Ok(SyncChain {
        module: module.into(),
        names,
    })
}

impl SyncChain {
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Call with one argument group per name and block; failures are merged
    /// like [`SyncFn::call`].
    pub fn call(&self, groups: Vec<Vec<Value>>) -> Result<Value, BridgeError> {
        self.call_raw(groups).map(Response::into_merged)
    }

    pub fn call_raw(&self, groups: Vec<Vec<Value>>) -> Result<Response, BridgeError> {
        let request = Request::chain(&self.module, self.names.clone(), groups)?;
        dispatch(get_or_create_worker()?, request)
    }
}

/// Post `request` to `worker` and block until it answers.
///
/// Fails with [`BridgeError::Reentrant`] when called on the worker thread
/// itself, which could never serve the request while parked.
pub(crate) fn dispatch(worker: &Worker, request: Request) -> Result<Response, BridgeError> {
    if thread::current().id() == worker.thread_id() {
        return Err(BridgeError::Reentrant);
    }

    let (signal, mut local, port) = signal::create();
    tracing::trace!(
        module = request.module(),
        steps = request.function_names().len(),
        "dispatching synchronized call"
    );

    worker.post(Envelope::new(request, signal.clone(), port))?;
    signal.wait();

    let message = local.receive().ok_or(BridgeError::NoResponse)?;
    Ok(decode_response(&message)?)
}
