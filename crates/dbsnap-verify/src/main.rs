//! dbsnap-verify: restore the latest snapshot of a database into a
//! temporary copy, prepare it for checks and tear it down again.
//!
//! Meant to be run by a scheduler. Each run advances the verification by
//! at most one round of handlers and exits.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dbsnap_rds::{AwsContext, RdsClient, classify_anyhow_error};
use dbsnap_verify::error::exit_code;
use dbsnap_verify::monitoring::TracingSink;
use dbsnap_verify::state::AnyStore;
use dbsnap_verify::{Outcome, Trigger, dispatch};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dbsnap-verify")]
#[command(about = "Verify RDS snapshots by restoring them into a temporary database")]
#[command(version)]
struct Args {
    /// Trigger event: a config object, an SNS envelope or an EventBridge
    /// RDS event, as JSON. `-` reads standard input.
    #[arg(default_value = "-")]
    event: PathBuf,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,

    /// Bucket holding state documents, used for lifecycle events
    #[arg(long, env = "STATE_DOC_BUCKET")]
    state_doc_bucket: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(exit_code(&e));
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(suggestion) = classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[2mHint: {suggestion}\x1b[0m");
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    // Reduce noise from AWS SDK (show only warnings and errors)
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    for target in ["aws_config", "aws_sdk_rds", "aws_sdk_s3", "aws_smithy_runtime"] {
        filter = filter.add_directive(format!("{target}=warn").parse()?);
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn read_event(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read trigger event from stdin")?;
        return Ok(raw);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read trigger event {}", path.display()))
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let trigger = Trigger::from_json(&read_event(&args.event).await?)?;
    let target = trigger.target(args.state_doc_bucket.as_deref())?;

    if let Some(profile) = &args.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }
    let home = AwsContext::from_env(args.aws_profile.as_deref()).await;
    let store = AnyStore::open(&target, &home);
    info!(store = %target, "Using state document store");

    let profile = args.aws_profile.clone();
    let outcome = dispatch(&store, &TracingSink, trigger, move |region| async move {
        Ok(RdsClient::new(&region, profile.as_deref()).await)
    })
    .await?;

    match outcome {
        Outcome::Ignored { reason } => info!(reason = %reason, "Ignoring unrelated event"),
        Outcome::Advanced {
            database,
            from,
            to,
            steps,
        } => info!(database = %database, from = %from, to = %to, steps, "Invocation complete"),
    }
    Ok(())
}
