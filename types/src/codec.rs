//! Byte encoding for responses crossing the worker port.
//!
//! The worker never hands live values to the caller: a [`Response`] is
//! encoded to JSON bytes before it is posted and decoded after the caller's
//! wait returns.

use crate::protocol::Response;

/// Upper bound on an encoded response (16 MiB).
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encoding worker response: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("decoding worker response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("worker response of {size} bytes exceeds maximum {MAX_RESPONSE_BYTES}")]
    TooLarge { size: usize },
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(response).map_err(CodecError::Encode)?;
    if bytes.len() > MAX_RESPONSE_BYTES {
        return Err(CodecError::TooLarge { size: bytes.len() });
    }
    Ok(bytes)
}

pub fn decode_response(bytes: &[u8]) -> Result<Response, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}
