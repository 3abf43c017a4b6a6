//! Tagged result façade for fallible async work.
//!
//! [`capture`] awaits a fallible future and folds it into an [`Outcome`]
//! carrying an optional error message and an optional value. Reading the
//! value while an error is present, without ever having looked at the error,
//! notifies the handlers registered with [`register_error_handler`]. The
//! notification happens on an explicit accessor call, never implicitly.

use std::cell::Cell;
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

type ErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

static HANDLERS: RwLock<Vec<ErrorHandler>> = RwLock::new(Vec::new());

/// Register a handler called with the message of every ignored error.
pub fn register_error_handler(handler: impl Fn(&str) + Send + Sync + 'static) {
    HANDLERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Arc::new(handler));
}

/// Remove all registered handlers.
pub fn reset_error_handlers() {
    HANDLERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

fn notify_handlers(message: &str) {
    // Clone out of the lock so a handler may register further handlers.
    let handlers: Vec<ErrorHandler> = HANDLERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for handler in handlers {
        handler(message);
    }
}

/// An error message and/or a value, with lazy error reporting.
#[derive(Debug)]
pub struct Outcome<T> {
    error: Option<String>,
    value: Option<T>,
    error_inspected: Cell<bool>,
    handlers_notified: Cell<bool>,
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self {
            error: None,
            value: Some(value),
            error_inspected: Cell::new(false),
            handlers_notified: Cell::new(false),
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            value: None,
            error_inspected: Cell::new(false),
            handlers_notified: Cell::new(false),
        }
    }

    /// The error message, if any. Marks the error as inspected.
    pub fn error(&self) -> Option<&str> {
        self.error_inspected.set(true);
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// The value, if any.
    ///
    /// When an error is present and [`Outcome::error`] was never called, the
    /// registered handlers are notified (once per outcome).
    pub fn value(&self) -> Option<&T> {
        self.report_ignored_error();
        self.value.as_ref()
    }

    /// Consume the outcome, logging an ignored error before returning the value.
    pub fn unwrap_or_log(self) -> Option<T> {
        if let Some(error) = &self.error
            && !self.error_inspected.get()
        {
            tracing::warn!(%error, "ignored error in outcome");
        }
        self.report_ignored_error();
        self.value
    }

    /// Split into error and value without notifying anyone.
    #[must_use]
    pub fn into_parts(self) -> (Option<String>, Option<T>) {
        (self.error, self.value)
    }

    /// Run another fallible async step on the value.
    ///
    /// The first error wins: if this outcome already failed, `next` is not
    /// called and the error is carried over.
    pub async fn and_then_capture<U, E, F, Fut>(self, next: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<U, E>>,
        E: Display,
    {
        match self.into_parts() {
            (Some(error), _) => Outcome::failed(error),
            (None, Some(value)) => capture(next(value)).await,
            (None, None) => Outcome {
                error: None,
                value: None,
                error_inspected: Cell::new(false),
                handlers_notified: Cell::new(false),
            },
        }
    }

    fn report_ignored_error(&self) {
        let Some(error) = &self.error else {
            return;
        };
        if self.error_inspected.get() || self.handlers_notified.get() {
            return;
        }
        self.handlers_notified.set(true);
        notify_handlers(error);
    }
}

impl Outcome<Value> {
    /// Spread-style access to a member of an object value.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.value().and_then(|value| value.get(key))
    }
}

/// Await a fallible future into an [`Outcome`].
pub async fn capture<T, E, F>(future: F) -> Outcome<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match future.await {
        Ok(value) => Outcome::ok(value),
        Err(error) => Outcome::failed(error.to_string()),
    }
}
