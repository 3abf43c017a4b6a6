//! Core protocol types for tosync.
//!
//! This crate contains the data exchanged between a blocked caller and the
//! worker thread, plus the [`Outcome`] result façade. No IO, no async runtime.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

pub mod codec;
pub mod outcome;
pub mod protocol;

pub use codec::{CodecError, decode_response, encode_response};
pub use outcome::{Outcome, capture, register_error_handler, reset_error_handlers};
pub use protocol::{
    CapturedError, DEFAULT_EXPORT, ProtocolError, Request, Response, SERIALIZE_FAILURE_MESSAGE,
    Step,
};

/// Re-exported so downstream crates agree on a single value type.
pub use serde_json::Value;
