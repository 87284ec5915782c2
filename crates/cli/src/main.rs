//! `pre-commit-audit` entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: flags and environment variables into an
//!    immutable [`compliance::AuditConfig`] and [`github::GitHubClientConfig`].
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer,
//!    plus an OpenTelemetry OTLP exporter when an endpoint is configured.
//! 3. **Construct infrastructure**: load the body templates, build the GitHub
//!    client, and inject both into [`reconciler::OrgScanner`].
//! 4. **Run one scan**: Ctrl-C stops dispatching new repositories and lets
//!    in-flight ones finish.
//!
//! Exits non-zero only when the audit cannot start (missing credential or
//! organisation, bad templates, first repository page unreachable).
//! Per-repository failures are logged and do not affect the exit status.

mod args;
mod report;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use compliance::{AuditError, HostingPlatform};
use github::GitHubClient;
use reconciler::OrgScanner;
use templates::FileTemplateRenderer;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::args::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let otlp_endpoint = std::env::var(telemetry::OTLP_ENDPOINT_ENV)
        .ok()
        .filter(|endpoint| !endpoint.trim().is_empty());
    let telemetry = match telemetry::init(&cli.log_level, cli.log_format, otlp_endpoint.as_deref()) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(cli).await;
    if let Err(err) = &result {
        let message = format!("{err:#}");
        error!(error = %message, "audit aborted");
    }
    telemetry.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let token = cli.token(std::env::var("GITHUB_TOKEN").ok())?;
    let config = Arc::new(cli.audit_config()?);
    debug!(token = %telemetry::token_prefix(&token), "credential loaded");

    let renderer = FileTemplateRenderer::load(
        &config.templates_dir,
        &[config.open_template.clone(), config.close_template.clone()],
    )
    .map_err(AuditError::from)
    .with_context(|| format!("failed to load templates from {}", config.templates_dir.display()))?;

    let client = GitHubClient::new(cli.client_config(token)).context("failed to build GitHub client")?;
    let platform: Arc<dyn HostingPlatform> = Arc::new(client);
    let scanner: OrgScanner = OrgScanner::new(platform, Arc::new(renderer), Arc::clone(&config));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(cancel.clone()));

    info!(
        organization = %config.organization,
        dry_run = config.dry_run,
        config_file = %config.config_path,
        concurrency = config.concurrency,
        delay_secs = config.delay.as_secs(),
        "starting pre-commit audit"
    );
    let report = scanner.scan(&cancel).await?;

    let totals = report.totals();
    if let Some(err) = &report.listing_error {
        warn!(error = %err, "repository listing incomplete; scan is partial");
    }
    if report.cancelled {
        warn!("scan interrupted before every repository was checked");
    }
    info!(run_id = %report.run_id, dry_run = config.dry_run, "{totals}");

    if cli.json {
        let rendered = serde_json::to_string_pretty(&report::to_json(&report))
            .context("failed to serialise scan report")?;
        println!("{rendered}");
    }
    Ok(())
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("interrupt received; finishing in-flight repositories");
            cancel.cancel();
        }
        Err(err) => warn!(error = %err, "cannot listen for interrupts"),
    }
}
