//! `dep-report`: resolve where each Go dependency comes from, how far behind
//! upstream it is, and under which license it ships.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and set up logging.
//! 2. Load override tables ([`config::load_config`]).
//! 3. Detect the lockfile ([`detector::detect_lockfile`]) and read it ([`analyzer`]).
//! 4. Capture the build commit for the report header ([`vcs`]).
//! 5. Resolve every dependency against its provider ([`assembler`], [`provider`]).
//! 6. Render the requested report ([`report`]) to stdout or `--output`.
//!
//! Any fatal error exits `1` without writing a report.

mod analyzer;
mod assembler;
mod cli;
mod config;
mod detector;
mod error;
mod models;
mod notify;
mod provider;
mod reconcile;
mod report;
mod vcs;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use analyzer::Analyzer;
use assembler::{Assembler, Providers};
use cli::{Cli, ReportFormat};
use config::load_config;
use detector::{detect_lockfile, Lockfile};
use notify::SlackNotifier;
use provider::gerrit::GerritClient;
use provider::github::GithubClient;
use vcs::BuildInfo;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // Resolve project path
    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let config = load_config(&path, cli.config.as_deref())?;
    let overrides = Arc::new(config.overrides);

    let Some(lockfile) = detect_lockfile(&path) else {
        eprintln!("No Gopkg.lock or go.mod found in {}", path.display());
        std::process::exit(1);
    };

    let descriptors = match lockfile {
        Lockfile::Gopkg => analyzer::gopkg::GopkgAnalyzer::new().analyze(&path)?,
        Lockfile::GoMod => analyzer::gomod::GoModAnalyzer::new().analyze(&path)?,
    };

    if !cli.quiet {
        eprintln!(
            "  {} {} {} dependencies",
            "→".cyan(),
            lockfile,
            descriptors.len()
        );
    }

    let product = cli
        .product
        .clone()
        .unwrap_or_else(|| default_product(&path));
    let header = BuildInfo::capture(&path)
        .context("unable to read build commit")?
        .into_header(product.as_str(), chrono::Utc::now());

    let client = provider::http_client(Duration::from_secs(cli.timeout))
        .context("unable to build HTTP client")?;
    let github = GithubClient::new(
        client.clone(),
        &config.github_api,
        &cli.github_token,
        Arc::clone(&overrides),
    );
    let gerrit = GerritClient::new(client, Arc::clone(&overrides));
    let notifier =
        SlackNotifier::new(cli.slack_webhook.clone()).context("unable to build Slack client")?;

    let providers = Providers {
        github: &github,
        gerrit: &gerrit,
        mirror: &github,
    };
    let mut assembler = Assembler::new(&product, &overrides, providers, &notifier);
    if !cli.quiet {
        assembler = assembler.with_progress(progress_bar(descriptors.len())?);
    }

    let report = assembler
        .assemble(header, &descriptors)
        .await
        .with_context(|| format!("unable to build report for {product}"))?;

    if cli.output.is_some() {
        colored::control::set_override(false);
    }

    let rendered = match cli.report {
        ReportFormat::Json => report::to_json(&report)?,
        ReportFormat::Cyclonedx => report::cyclonedx::render(&report)?,
        ReportFormat::Terminal => report::terminal::render(&report, cli.verbose, cli.quiet)?,
    };

    match &cli.output {
        Some(out) => {
            std::fs::write(out, rendered)
                .with_context(|| format!("unable to write report to {}", out.display()))?;
            if !cli.quiet {
                eprintln!("  {} report written to {}", "✓".green(), out.display());
            }
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn default_product(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}
