//! Request/response serde types for caller ↔ worker communication.
//!
//! A [`Request`] names one or more functions to run in order (a chain) inside
//! a module, with one argument group per step. The worker answers with exactly
//! one [`Response`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Function name used when a caller targets a module's default export.
pub const DEFAULT_EXPORT: &str = "default";

/// Fixed message posted when the worker cannot encode its response.
pub const SERIALIZE_FAILURE_MESSAGE: &str = "cannot serialize worker response";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("a request needs at least one function name")]
    EmptyChain,
    #[error("expected {expected} argument groups, got {actual}")]
    ArgumentGroups { expected: usize, actual: usize },
}

/// One step of a request: the identifier to resolve and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub args: Vec<Value>,
}

/// A synchronized-call request.
///
/// Invariant: `function_name` is non-empty and `args` has the same length.
/// Construction and deserialization both go through that check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRequest")]
pub struct Request {
    function_name: Vec<String>,
    args: Vec<Vec<Value>>,
    file_path_or_module: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    function_name: Vec<String>,
    args: Vec<Vec<Value>>,
    file_path_or_module: String,
}

impl TryFrom<RawRequest> for Request {
    type Error = ProtocolError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        Self::chain(raw.file_path_or_module, raw.function_name, raw.args)
    }
}

impl Request {
    /// A one-step request: `args` is the call's argument list.
    #[must_use]
    pub fn single(module: impl Into<String>, name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function_name: vec![name.into()],
            args: vec![args],
            file_path_or_module: module.into(),
        }
    }

    /// A chained request with one argument group per function name.
    pub fn chain(
        module: impl Into<String>,
        names: Vec<String>,
        groups: Vec<Vec<Value>>,
    ) -> Result<Self, ProtocolError> {
        if names.is_empty() {
            return Err(ProtocolError::EmptyChain);
        }
        if names.len() != groups.len() {
            return Err(ProtocolError::ArgumentGroups {
                expected: names.len(),
                actual: groups.len(),
            });
        }
        Ok(Self {
            function_name: names,
            args: groups,
            file_path_or_module: module.into(),
        })
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.file_path_or_module
    }

    #[must_use]
    pub fn function_names(&self) -> &[String] {
        &self.function_name
    }

    #[must_use]
    pub fn is_chain(&self) -> bool {
        self.function_name.len() > 1
    }

    /// Split into the module specifier and the ordered steps.
    #[must_use]
    pub fn into_steps(self) -> (String, Vec<Step>) {
        let steps = self
            .function_name
            .into_iter()
            .zip(self.args)
            .map(|(name, args)| Step { name, args })
            .collect();
        (self.file_path_or_module, steps)
    }
}

/// A failure captured inside the worker.
///
/// Serialized flat: `{"message": "...", <extra fields>...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct CapturedError {
    message: String,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl CapturedError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Map::new(),
        }
    }

    /// Attach an extra field. The key `message` is reserved and ignored.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "message" {
            self.data.insert(key, value.into());
        }
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl From<std::io::Error> for CapturedError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string()).with_field("kind", format!("{:?}", err.kind()))
    }
}

impl From<String> for CapturedError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for CapturedError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A synchronized-call response. Exactly one of `result` or `error` is
/// meaningful; `result` is `null` whenever `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<CapturedError>,
}

impl Response {
    #[must_use]
    pub fn success(result: Value) -> Self {
        Self {
            result,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: CapturedError) -> Self {
        Self {
            result: Value::Null,
            error: Some(error),
        }
    }

    /// The sentinel response for payloads that could not be encoded.
    #[must_use]
    pub fn serialization_failure() -> Self {
        Self::failure(CapturedError::new(SERIALIZE_FAILURE_MESSAGE))
    }

    #[must_use]
    pub fn result(&self) -> &Value {
        &self.result
    }

    #[must_use]
    pub fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn into_parts(self) -> (Value, Option<CapturedError>) {
        (self.result, self.error)
    }

    /// Fold the error into the returned value instead of raising it.
    ///
    /// Without an error the result is returned untouched. With one, the
    /// result object (or a fresh object when the result is not an object)
    /// gains an `error` key holding the message, and an `errorData` key when
    /// the failure carried extra fields.
    #[must_use]
    pub fn into_merged(self) -> Value {
        let Some(error) = self.error else {
            return self.result;
        };

        let mut object = match self.result {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object.insert("error".to_string(), Value::String(error.message));
        if !error.data.is_empty() {
            object.insert("errorData".to_string(), Value::Object(error.data));
        }
        Value::Object(object)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "error: {error}"),
            None => write!(f, "{}", self.result),
        }
    }
}
