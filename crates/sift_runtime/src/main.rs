//! Sift Runtime
//!
//! Minimal host binary: registers the script functions, runs a script file
//! through `js` and optionally calls one of its functions through `js_call`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use sift_core::{Args, ExecutionContext, FunctionCatalog, Scope, Value};
use sift_script::ScriptConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sift", version, about = "Run JavaScript through the sift query functions")]
struct Cli {
    /// Script to run with `js`
    script: PathBuf,

    /// Function to call with `js_call` once the script ran
    #[arg(long)]
    call: Option<String>,

    /// JSON arguments for `--call`; an array spreads into positional arguments
    #[arg(long, default_value = "[]")]
    args: String,

    /// Interpreter cache key
    #[arg(long)]
    key: Option<String>,

    /// Cancel the execution context after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON file with script settings
    #[arg(long)]
    config: Option<PathBuf>,
}

struct Request {
    source: String,
    call: Option<(String, Value)>,
    key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Sift v{}", sift_core::VERSION);

    let config = load_config(cli.config.as_deref())?;
    sift_script::register(&mut FunctionCatalog::global().write(), config)?;

    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("failed to read {}", cli.script.display()))?;
    let call = match cli.call {
        Some(func) => {
            let args: Value = serde_json::from_str(&cli.args).context("--args must be valid JSON")?;
            Some((func, args))
        }
        None => None,
    };
    let request = Request {
        source,
        call,
        key: cli.key,
    };

    let ctx = ExecutionContext::new();
    if let Some(ms) = cli.timeout_ms {
        ctx.cancel_after(Duration::from_millis(ms));
    }
    let scope = Arc::new(Scope::new());

    let mut runner = tokio::task::spawn_blocking({
        let ctx = ctx.clone();
        let scope = Arc::clone(&scope);
        move || execute(&ctx, &scope, request)
    });

    let result = tokio::select! {
        result = &mut runner => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, cancelling execution context");
            ctx.cancel();
            runner.await?
        }
    };

    if ctx.is_done() {
        tracing::warn!(reason = ?ctx.end_reason(), "execution context ended before the request finished");
    }
    ctx.complete();

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ScriptConfig> {
    let Some(path) = path else {
        return Ok(ScriptConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = ScriptConfig::from_json(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(?config, "loaded script settings");
    Ok(config)
}

fn execute(ctx: &ExecutionContext, scope: &Scope, request: Request) -> Value {
    let registry = FunctionCatalog::global().read();

    registry.call(
        "js",
        ctx,
        scope,
        args(json!({ "js": request.source, "key": request.key })),
    );

    match request.call {
        Some((func, call_args)) => registry.call(
            "js_call",
            ctx,
            scope,
            args(json!({ "func": func, "args": call_args, "key": request.key })),
        ),
        None => Value::Null,
    }
}

fn args(value: Value) -> Args {
    match value {
        Value::Object(map) => map,
        _ => Args::new(),
    }
}
