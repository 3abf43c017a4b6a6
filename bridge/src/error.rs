//! Caller-side failures of a synchronized call.
//!
//! Failures inside the worker never show up here; they travel back as data in
//! the response. These variants cover only what can go wrong getting a request
//! to the worker and a response back.

use tosync_types::{CodecError, ProtocolError};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to start worker thread: {0}")]
    WorkerSpawn(String),
    #[error("synchronized call made from the worker thread would deadlock")]
    Reentrant,
    #[error("worker thread is no longer accepting requests")]
    WorkerUnavailable,
    #[error("worker finished without posting a response")]
    NoResponse,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
