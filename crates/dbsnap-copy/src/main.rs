//! dbsnap-copy: copy AWS RDS instance or cluster snapshots.
//!
//! Copy to another region, or just keep snapshots around for longer than
//! the 35 days RDS allows for automated ones.

use anyhow::Result;
use clap::Parser;
use dbsnap_copy::{CopyConfig, Destination, Source, copy_latest};
use dbsnap_rds::{RdsClient, classify_anyhow_error};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dbsnap-copy")]
#[command(about = "Copy the latest automated RDS snapshot and prune old copies")]
#[command(version)]
struct Args {
    /// Source of the snapshot: <region>:<db-identifier>
    source: Source,

    /// Destination of the snapshot: [<region>]:[<new-snapshot-name>].
    /// Defaults to the source region and a generated name.
    #[arg(short, long, default_value = ":")]
    dest: Destination,

    /// After copying, delete older copies made by this tool, keeping this
    /// many of the most recent. 0 disables pruning, a negative count
    /// deletes every copy
    #[arg(long, allow_negative_numbers = true)]
    prune_old: Option<i64>,

    /// Print what would happen without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// KMS key to encrypt the copy with
    #[arg(long)]
    kms_key: Option<String>,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
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

async fn run() -> Result<()> {
    let args = Args::parse();

    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    for target in ["aws_config", "aws_sdk_rds", "aws_smithy_runtime"] {
        filter = filter.add_directive(format!("{target}=warn").parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(profile) = &args.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let profile = args.aws_profile.as_deref();
    let source_rds = RdsClient::new(&args.source.region, profile).await;
    let dest_region = args.dest.region_or(&args.source.region);
    let dest_rds = RdsClient::new(dest_region, profile).await;

    let config = CopyConfig {
        dry_run: args.dry_run,
        kms_key_id: args.kms_key,
        prune_old: args.prune_old,
    };
    let report = copy_latest(
        &source_rds,
        &dest_rds,
        &args.source,
        &args.dest,
        &config,
        chrono::Utc::now(),
    )
    .await?;

    info!(
        source_snapshot = %report.source_snapshot.id,
        target_id = %report.target_id,
        region = %report.region,
        copied = report.copy.is_some(),
        pruned = report.pruned.len(),
        "Done"
    );
    Ok(())
}
