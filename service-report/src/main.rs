mod addr;
mod aggregate;
mod config;
mod dns;
mod report;
mod source;

use std::io::Write;
use std::path::PathBuf;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use shared::types::ReportWindow;
use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::dns::discover::discover_domains;
use crate::dns::resolver::PtrResolver;
use crate::source::db::TelemetryDb;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Aggregate service usage telemetry into a per-service report with reverse-DNS domain discovery."
)]
struct Args {
    /// Anchor date of the report window (YYYY-MM-DD)
    #[arg(value_parser = parse_date)]
    date: NaiveDate,

    /// Number of days in the window; negative counts back from the anchor
    #[arg(allow_hyphen_values = true)]
    days: i64,

    /// Only aggregate packets from this container type code
    #[arg(long)]
    container_type: Option<i64>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Telemetry database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {:?} (expected YYYY-MM-DD): {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("service_report=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let db_path = args
        .database
        .clone()
        .unwrap_or_else(|| config.source.db_path.clone());

    let window = ReportWindow::from_anchor(args.date, args.days);
    tracing::info!(
        "Generating per-service report between {} and {}",
        window.start,
        window.end
    );
    if let Some(ct) = args.container_type {
        tracing::info!("Container type: {}", ct);
    }

    let db = TelemetryDb::open(&db_path)?;
    tracing::info!("Opened telemetry database at {:?}", db_path);

    let records = db.fetch_records(&window, args.container_type)?;
    tracing::info!("Fetched {} usage packets", records.len());

    let mut aggregator = Aggregator::new();
    for record in &records {
        aggregator.compute(record);
    }
    tracing::info!("Aggregated {} distinct services", aggregator.service_count());

    let mut table = aggregator.into_table();

    // Ctrl-C during the potentially slow discovery pass cancels further
    // lookups; the report still prints with whatever resolved by then.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let resolver = PtrResolver::new(config.resolver.lookup_timeout());
    discover_domains(
        &mut table,
        &resolver,
        config.resolver.max_concurrent_lookups,
        &cancel,
    )
    .await;

    let report = report::build_report(&table, window, args.container_type);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report).context("Failed to serialize report")?;
        writeln!(out)?;
    } else {
        report::render_text(&report, &mut out).context("Failed to render report")?;
    }

    Ok(())
}
