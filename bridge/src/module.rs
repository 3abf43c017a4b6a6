//! Closed-world module registry.
//!
//! The worker never loads code by path. A module is a set of named exports
//! plus an optional default-export record, registered under a specifier
//! ahead of time. The executor resolves specifiers through [`ModuleLoader`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use serde_json::Value;
use tosync_types::CapturedError;

use crate::builtins;
use crate::object::{Function, Invocation, Object, Record};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no module registered under '{0}'")]
    NotFound(String),
}

/// Resolves a module specifier to its namespace.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, specifier: &str) -> Result<Arc<Module>, LoadError>;
}

/// A module namespace: named exports and an optional default export.
///
/// The default export may be callable, a record, or both (a function
/// carrying properties).
pub struct Module {
    exports: HashMap<String, Function>,
    default_function: Option<Function>,
    default: Option<Arc<Record>>,
}

impl Module {
    #[must_use]
    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    #[must_use]
    pub fn export(&self, name: &str) -> Option<&Function> {
        self.exports.get(name)
    }

    /// The callable default export, reached through the name `default`.
    #[must_use]
    pub fn default_function(&self) -> Option<&Function> {
        self.default_function.as_ref()
    }

    #[must_use]
    pub fn default_export(&self) -> Option<&Arc<Record>> {
        self.default.as_ref()
    }

    /// Export names, sorted.
    #[must_use]
    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Default)]
pub struct ModuleBuilder {
    exports: HashMap<String, Function>,
    default_function: Option<Function>,
    default: Option<Arc<Record>>,
}

impl ModuleBuilder {
    /// Export a function that completes synchronously.
    #[must_use]
    pub fn function<F, R>(self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<R, CapturedError> + Send + Sync + 'static,
        R: Into<Object>,
    {
        self.export(name, Arc::new(move |args| Invocation::ready(function(args))))
    }

    /// Export a function returning a future; the worker awaits it.
    #[must_use]
    pub fn async_function<F, Fut, R>(self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, CapturedError>> + Send + 'static,
        R: Into<Object>,
    {
        self.export(name, Arc::new(move |args| Invocation::pending(function(args))))
    }

    /// Export a callable that picks its own [`Invocation`] shape.
    #[must_use]
    pub fn export(mut self, name: impl Into<String>, function: Function) -> Self {
        self.exports.insert(name.into(), function);
        self
    }

    /// Make the default export callable.
    #[must_use]
    pub fn default_function<F, R>(mut self, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<R, CapturedError> + Send + Sync + 'static,
        R: Into<Object>,
    {
        self.default_function = Some(Arc::new(move |args| Invocation::ready(function(args))));
        self
    }

    #[must_use]
    pub fn default_async_function<F, Fut, R>(mut self, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, CapturedError>> + Send + 'static,
        R: Into<Object>,
    {
        self.default_function = Some(Arc::new(move |args| Invocation::pending(function(args))));
        self
    }

    #[must_use]
    pub fn default_export(mut self, record: Record) -> Self {
        self.default = Some(Arc::new(record));
        self
    }

    #[must_use]
    pub fn build(self) -> Module {
        Module {
            exports: self.exports,
            default_function: self.default_function,
            default: self.default,
        }
    }
}

/// Specifier → module map.
#[derive(Default)]
pub struct Registry {
    modules: RwLock<HashMap<String, Arc<Module>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `specifier`, returning the module it replaced.
    pub fn register(&self, specifier: impl Into<String>, module: Module) -> Option<Arc<Module>> {
        let specifier = specifier.into();
        tracing::debug!(module = %specifier, "registering module");
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(specifier, Arc::new(module))
    }

    pub fn unregister(&self, specifier: &str) -> Option<Arc<Module>> {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(specifier)
    }

    #[must_use]
    pub fn contains(&self, specifier: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(specifier)
    }
}

impl ModuleLoader for Registry {
    fn load(&self, specifier: &str) -> Result<Arc<Module>, LoadError> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(specifier)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(specifier.to_string()))
    }
}

static REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    let registry = Registry::new();
    builtins::install(&registry);
    Arc::new(registry)
});

/// The process-wide registry the shared worker resolves against.
///
/// Starts out with the built-in `fs` and `http` modules. Modules may be
/// registered at any time; each request resolves its module when it runs.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

pub(crate) fn shared_loader() -> Arc<dyn ModuleLoader> {
    REGISTRY.clone()
}
