//!
//! surveyd server binary
//! ---------------------
//! Command-line entry point. Configuration comes from environment variables;
//! `--port` and `--database` override the matching variables.

use anyhow::{Context, Result};
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use surveyd::config::ServiceConfig;

fn arg_value(args: &[String], long: &str, short: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        if let Some(v) = a.strip_prefix(long).and_then(|rest| rest.strip_prefix('=')) {
            return Some(v.to_string());
        }
        if (a == long || a == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("surveyd\n\nUSAGE:\n  surveyd [--port N] [--database URL]\n\nOPTIONS:\n  -p, --port N          HTTP port (env: PORT, default 80)\n  -d, --database URL    Entity store: memory://, sqlite3://PATH or postgres://... (env: DATABASE_URL, default memory://)\n\nENVIRONMENT:\n  JWT_SECRET                  HMAC secret for bearer tokens\n  ANSWER_WEBHOOK_URL          POST target after each answer write\n  ANSWER_WEBHOOK_TIMEOUT_MS   Webhook request timeout (default 5000)\n  PROPERTIES_URL              Source relayed by /properties.json\n  PROPERTIES_TIMEOUT_MS       Properties request timeout (default 10000)\n");
        return Ok(());
    }

    let mut cfg = ServiceConfig::from_env().context("Invalid configuration in environment")?;

    // CLI arguments override environment
    if let Some(raw) = arg_value(&args, "--port", "-p") {
        cfg.http_port = raw.parse::<u16>().with_context(|| format!("--port expects a port number, got '{raw}'"))?;
    }
    if let Some(url) = arg_value(&args, "--database", "-d") {
        cfg.database_url = url;
    }

    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "surveyd::startup", "RUST_LOG='{}'", rust_log);

    surveyd::server::run_with_config(cfg).await
}
