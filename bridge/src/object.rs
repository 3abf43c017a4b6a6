//! Values as seen inside the worker.
//!
//! Callables return an [`Object`]: either a plain JSON value or a live
//! [`Record`] whose fields may include methods. Records can feed the next
//! step of a chain, but only plain data can cross back to the caller, so
//! [`Object::into_value`] fails when a method is reachable.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use tosync_types::CapturedError;

pub type CallResult = Result<Object, CapturedError>;

/// What a callable hands back: a finished result or one still pending.
pub enum Invocation {
    Ready(CallResult),
    Pending(BoxFuture<'static, CallResult>),
}

impl Invocation {
    pub fn ready<R: Into<Object>>(result: Result<R, CapturedError>) -> Self {
        Self::Ready(result.map(Into::into))
    }

    pub fn pending<F, R>(future: F) -> Self
    where
        F: Future<Output = Result<R, CapturedError>> + Send + 'static,
        R: Into<Object>,
    {
        Self::Pending(future.map(|result| result.map(Into::into)).boxed())
    }

    /// Await the result if it is still pending.
    pub async fn settle(self) -> CallResult {
        match self {
            Self::Ready(result) => result,
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A named export: called with the step's arguments as positional values.
pub type Function = Arc<dyn Fn(Vec<Value>) -> Invocation + Send + Sync>;

/// A record method: called with its owning record as context.
pub type Method = Arc<dyn Fn(Arc<Record>, Vec<Value>) -> Invocation + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("method '{path}' cannot cross the worker boundary")]
pub struct NotSerializable {
    path: String,
}

#[derive(Clone, Debug)]
pub enum Object {
    Value(Value),
    Record(Arc<Record>),
}

impl Object {
    #[must_use]
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    /// Convert to plain data for transport.
    pub fn into_value(self) -> Result<Value, NotSerializable> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Record(record) => record.to_value_at(""),
        }
    }
}

impl From<Value> for Object {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Record> for Object {
    fn from(record: Record) -> Self {
        Self::Record(Arc::new(record))
    }
}

impl From<Arc<Record>> for Object {
    fn from(record: Arc<Record>) -> Self {
        Self::Record(record)
    }
}

#[derive(Clone)]
pub enum Field {
    Object(Object),
    Method(Method),
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(object) => object.fmt(f),
            Self::Method(_) => f.write_str("<method>"),
        }
    }
}

/// A live object: named fields and methods, ordered by name.
#[derive(Clone, Debug, Default)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Object>) -> Self {
        self.fields.insert(name.into(), Field::Object(value.into()));
        self
    }

    /// Add a method that completes synchronously.
    #[must_use]
    pub fn with_method<F, R>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Arc<Record>, Vec<Value>) -> Result<R, CapturedError> + Send + Sync + 'static,
        R: Into<Object>,
    {
        let method: Method = Arc::new(move |this, args| Invocation::ready(method(this, args)));
        self.fields.insert(name.into(), Field::Method(method));
        self
    }

    /// Add a method returning a future.
    #[must_use]
    pub fn with_async_method<F, Fut, R>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Arc<Record>, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, CapturedError>> + Send + 'static,
        R: Into<Object>,
    {
        let method: Method = Arc::new(move |this, args| Invocation::pending(method(this, args)));
        self.fields.insert(name.into(), Field::Method(method));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// A plain (non-method) field as JSON, if it is one.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name)? {
            Field::Object(Object::Value(value)) => Some(value),
            _ => None,
        }
    }

    fn to_value_at(&self, prefix: &str) -> Result<Value, NotSerializable> {
        let mut map = Map::new();
        for (name, field) in &self.fields {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            let value = match field {
                Field::Method(_) => return Err(NotSerializable { path }),
                Field::Object(Object::Value(value)) => value.clone(),
                Field::Object(Object::Record(nested)) => nested.to_value_at(&path)?,
            };
            map.insert(name.clone(), value);
        }
        Ok(Value::Object(map))
    }
}
