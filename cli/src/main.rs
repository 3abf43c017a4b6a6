//! tosync CLI - run one registered function synchronously and print its result.
//!
//! ```text
//! tosync <module> <function[.next...]> [ARG...]
//! ```
//!
//! Arguments are parsed as JSON and fall back to plain strings. With a dotted
//! chain (`load.json`) every ARG is one JSON array holding that step's
//! argument group; missing trailing groups are empty.

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tosync_bridge::{BridgeConfig, configure, synchronize, synchronize_chain};

const USAGE: &str = "usage: tosync <module> <function[.next...]> [ARG...]";

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the result; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[derive(Debug, PartialEq)]
enum Call {
    Single {
        module: String,
        name: String,
        args: Vec<Value>,
    },
    Chain {
        module: String,
        names: Vec<String>,
        groups: Vec<Vec<Value>>,
    },
}

impl Call {
    fn parse(mut argv: impl Iterator<Item = String>) -> Result<Self> {
        let module = argv.next().context(USAGE)?;
        let target = argv.next().context(USAGE)?;
        let rest: Vec<Value> = argv.map(|arg| parse_arg(&arg)).collect();

        if !target.contains('.') {
            return Ok(Self::Single {
                module,
                name: target,
                args: rest,
            });
        }

        let names: Vec<String> = target.split('.').map(str::to_string).collect();
        if names.iter().any(String::is_empty) {
            bail!("empty function name in chain '{target}'");
        }
        if rest.len() > names.len() {
            bail!(
                "chain '{target}' has {} steps but {} argument groups were given",
                names.len(),
                rest.len()
            );
        }

        let mut groups = rest
            .into_iter()
            .enumerate()
            .map(|(i, group)| match group {
                Value::Array(items) => Ok(items),
                other => bail!("argument group {} must be a JSON array, got {other}", i + 1),
            })
            .collect::<Result<Vec<_>>>()?;
        groups.resize_with(names.len(), Vec::new);

        Ok(Self::Chain {
            module,
            names,
            groups,
        })
    }

    fn run(self) -> Result<Value> {
        let value = match self {
            Self::Single { module, name, args } => synchronize(module, name).call(args)?,
            Self::Chain {
                module,
                names,
                groups,
            } => synchronize_chain(module, names)?.call(groups)?,
        };
        Ok(value)
    }
}

fn parse_arg(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    if configure(BridgeConfig::load()).is_err() {
        tracing::debug!("bridge already configured");
    }

    let call = Call::parse(env::args().skip(1))?;
    let value = call.run()?;
    let rendered = serde_json::to_string_pretty(&value).context("rendering result")?;
    println!("{rendered}");
    Ok(())
}
