//! Built-in modules available in every process: `fs` and `http`.

use serde_json::Value;
use tokio::fs;
use tosync_types::CapturedError;

use crate::module::{Module, Registry};

pub const FS_MODULE: &str = "fs";
pub const HTTP_MODULE: &str = "http";

pub(crate) fn install(registry: &Registry) {
    registry.register(FS_MODULE, fs_module());
    registry.register(HTTP_MODULE, http_module());
}

fn fs_module() -> Module {
    Module::builder()
        .async_function("readFile", |args| async move {
            let path = string_arg(&args, 0, "path")?;
            let encoding = optional_string_arg(&args, 1, "encoding")?;
            let bytes = fs::read(&path).await?;
            match encoding.as_deref() {
                None => Ok(Value::from(bytes)),
                Some(enc) if is_utf8(enc) => {
                    String::from_utf8(bytes).map(Value::String).map_err(|err| {
                        CapturedError::new(format!("'{path}' is not valid utf-8: {err}"))
                    })
                }
                Some(enc) => Err(CapturedError::new(format!("unsupported encoding '{enc}'"))),
            }
        })
        .async_function("writeFile", |args| async move {
            let path = string_arg(&args, 0, "path")?;
            let contents = bytes_arg(&args, 1, "contents")?;
            fs::write(&path, contents).await?;
            Ok::<_, CapturedError>(Value::Null)
        })
        .async_function("exists", |args| async move {
            let path = string_arg(&args, 0, "path")?;
            let exists = fs::try_exists(&path).await?;
            Ok::<_, CapturedError>(Value::Bool(exists))
        })
        .build()
}

fn http_module() -> Module {
    Module::builder()
        .async_function("load", |args| async move {
            let url = string_arg(&args, 0, "url")?;
            let body = args.get(1).filter(|v| !v.is_null()).cloned();
            Ok::<_, CapturedError>(tosync_fetch::load(&url, body).await.into_value())
        })
        .build()
}

fn is_utf8(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}

fn string_arg(args: &[Value], index: usize, name: &str) -> Result<String, CapturedError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(invalid_arg(name, "a string", other)),
        None => Err(CapturedError::new(format!("missing argument '{name}'"))),
    }
}

fn optional_string_arg(
    args: &[Value],
    index: usize,
    name: &str,
) -> Result<Option<String>, CapturedError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid_arg(name, "a string", other)),
    }
}

/// A string is written as utf-8; an array must hold bytes.
fn bytes_arg(args: &[Value], index: usize, name: &str) -> Result<Vec<u8>, CapturedError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone().into_bytes()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| invalid_arg(name, "a byte array", item))
            })
            .collect(),
        Some(other) => Err(invalid_arg(name, "a string or byte array", other)),
        None => Err(CapturedError::new(format!("missing argument '{name}'"))),
    }
}

fn invalid_arg(name: &str, expected: &str, got: &Value) -> CapturedError {
    CapturedError::new(format!("argument '{name}' must be {expected}, got {got}"))
        .with_field("argument", name)
}
