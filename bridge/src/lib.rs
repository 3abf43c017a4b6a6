//! Blocking bridge to asynchronous functions.
//!
//! Code that cannot `.await` calls [`synchronize`] to get a [`SyncFn`] for a
//! registered module function. Each call is shipped to a single background
//! worker thread, which runs it on its own tokio runtime while the caller
//! parks on a [`Signal`]. The worker posts exactly one response and wakes the
//! caller, whatever happened.
//!
//! ```no_run
//! use serde_json::json;
//! use tosync_bridge::{Module, registry, synchronize};
//!
//! registry().register(
//!     "math",
//!     Module::builder()
//!         .async_function("double", |args| async move {
//!             let n = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
//!             Ok::<_, tosync_bridge::CapturedError>(json!(n * 2))
//!         })
//!         .build(),
//! );
//!
//! let double = synchronize("math", "double");
//! assert_eq!(double.call(vec![json!(21)]).unwrap(), json!(42));
//! ```

mod builtins;
pub mod config;
mod error;
pub mod executor;
pub mod module;
pub mod object;
pub mod signal;
mod sync_fn;
mod worker;

pub use builtins::{FS_MODULE, HTTP_MODULE};
pub use config::{BridgeConfig, ConfigError, RuntimeMode, WorkerConfig, configure};
pub use error::BridgeError;
pub use executor::{Envelope, execute};
pub use module::{LoadError, Module, ModuleBuilder, ModuleLoader, Registry, registry};
pub use object::{CallResult, Field, Function, Invocation, Method, NotSerializable, Object, Record};
pub use signal::Signal;
pub use sync_fn::{SyncChain, SyncFn, synchronize, synchronize_chain, synchronize_default};
pub use tosync_types::{CapturedError, Response, Value};
pub use worker::{Worker, get_or_create_worker, spawned_workers};
