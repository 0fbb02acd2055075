//! Build metadata for the report header, read from the project's git checkout.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::ReportHeader;

/// Commit the product was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub commit: String,
    pub commit_time: String,
}

impl BuildInfo {
    pub fn capture(path: &Path) -> Result<Self> {
        let commit = git(path, &["rev-parse", "HEAD"]).context("unable to get commit hash")?;
        let commit_time = git(path, &["show", "-s", "--format=%cI", "HEAD"])
            .context("unable to get commit time")?;
        Ok(BuildInfo { commit, commit_time })
    }

    pub fn into_header(self, product: impl Into<String>, generated_at: DateTime<Utc>) -> ReportHeader {
        ReportHeader {
            product: product.into(),
            generated_at: report_timestamp(generated_at),
            build_commit: self.commit,
            build_commit_time: self.commit_time,
        }
    }
}

pub fn report_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn git(path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        bail!(
            "git {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
