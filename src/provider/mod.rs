//! Hosting-provider access.
//!
//! - [`classifier`]: decides which provider a dependency lives on.
//! - [`github`]: generic-hosting REST client.
//! - [`gerrit`]: code-review REST client.
//!
//! GitLab and unknown dependencies have no client; they become stub records
//! via [`stub_record`].

pub mod classifier;
pub mod gerrit;
pub mod github;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ReportError;
use crate::models::{CanonicalRevision, Descriptor, Provider, ReportRecord, Repository, VersionDetails};

pub const USER_AGENT: &str = concat!("dep-report/", env!("CARGO_PKG_VERSION"));

/// Length of a full commit hash.
pub const FULL_HASH_LEN: usize = 40;

pub fn is_full_hash(s: &str) -> bool {
    s.len() == FULL_HASH_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Shared HTTP client. Calls are bounded by `timeout` and never retried.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// The "resolve identifier to full hash" capability.
///
/// Any provider implementing it can serve as the first hop for providers
/// that only accept full hashes.
#[async_trait]
pub trait CommitResolver: Send + Sync {
    /// Turn a repository URL on this provider's host into its coordinates.
    fn repository_for_url(&self, url: &str) -> Result<Repository, ReportError>;

    /// Resolve a full hash, abbreviated hash, or tag to an exact commit.
    async fn resolve_commit(
        &self,
        repo: &Repository,
        reference: &str,
    ) -> Result<CanonicalRevision, ReportError>;
}

/// Installed/latest/license retrieval for one provider.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Find the repository a dependency lives in.
    fn locate(&self, name: &str) -> Result<Repository, ReportError>;

    /// Whether [`MetadataClient::fetch_installed`] accepts abbreviated hashes
    /// and tags, or only full hashes.
    fn resolves_abbreviated(&self) -> bool;

    async fn fetch_installed(
        &self,
        repo: &Repository,
        reference: &str,
    ) -> Result<CanonicalRevision, ReportError>;

    /// Head of the default branch, plus the latest tag or release if any.
    async fn fetch_latest(&self, repo: &Repository) -> Result<VersionDetails, ReportError>;

    /// `Ok(None)` means the provider has no license on record.
    async fn fetch_license(
        &self,
        name: &str,
        repo: &Repository,
    ) -> Result<Option<String>, ReportError>;
}

/// Record for a dependency no client handles. No network calls are made.
pub fn stub_record(descriptor: &Descriptor, provider: Provider) -> ReportRecord {
    let mut record = ReportRecord::stub(&descriptor.name, provider);
    if provider == Provider::Unknown {
        record.installed.version = Some(descriptor.version.clone()).filter(|v| !v.is_empty());
        record.repository_url = descriptor.source.clone().unwrap_or_default();
    }
    record
}
