use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{is_full_hash, MetadataClient};
use crate::config::OverrideTables;
use crate::error::ReportError;
use crate::models::{CanonicalRevision, Provider, Repository, VersionDetails};

/// Line Gerrit prepends to every JSON response to defeat XSSI.
/// https://gerrit-review.googlesource.com/Documentation/rest-api.html#output
const MAGIC_PREFIX: &str = ")]}'";

const GERRIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const REPORT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const DEFAULT_BRANCH: &str = "master";

#[derive(Debug, Deserialize)]
struct CommitInfo {
    commit: String,
    committer: GitPerson,
}

#[derive(Debug, Deserialize)]
struct GitPerson {
    date: String,
}

#[derive(Debug, Deserialize)]
struct BranchInfo {
    revision: String,
}

#[derive(Debug, Deserialize)]
struct TagInfo {
    #[serde(rename = "ref")]
    reference: String,
}

/// Gerrit REST client. Commit lookups only accept full hashes, and there is
/// no license endpoint; licenses come from the static table.
pub struct GerritClient {
    client: Client,
    overrides: Arc<OverrideTables>,
}

impl GerritClient {
    pub fn new(client: Client, overrides: Arc<OverrideTables>) -> Self {
        GerritClient { client, overrides }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ReportError> {
        tracing::debug!(url, "gerrit request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ReportError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|source| ReportError::Transport {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(strip_magic_prefix(&body)).map_err(|source| ReportError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn commit(&self, repo: &Repository, sha: &str) -> Result<CanonicalRevision, ReportError> {
        let url = format!("{}/commits/{}", repo.api_url, sha);
        let info: CommitInfo = self.get(&url).await?;
        let time = format_gerrit_time(&info.committer.date).map_err(|source| {
            ReportError::Timestamp {
                url: url.clone(),
                value: info.committer.date.clone(),
                source,
            }
        })?;
        Ok(CanonicalRevision {
            commit: info.commit,
            time,
        })
    }
}

/// Drop the magic first line, if present, leaving the JSON body.
pub fn strip_magic_prefix(body: &str) -> &str {
    match body.strip_prefix(MAGIC_PREFIX) {
        Some(rest) => rest.trim_start_matches(['\r', '\n']),
        None => body,
    }
}

/// Gerrit reports commit times as `2019-04-25 21:42:06.000000000` in UTC.
pub fn format_gerrit_time(value: &str) -> Result<String, chrono::ParseError> {
    let parsed = NaiveDateTime::parse_from_str(value, GERRIT_TIME_FORMAT)?;
    Ok(parsed.format(REPORT_TIME_FORMAT).to_string())
}

#[async_trait]
impl MetadataClient for GerritClient {
    fn provider(&self) -> Provider {
        Provider::Gerrit
    }

    fn locate(&self, name: &str) -> Result<Repository, ReportError> {
        let url = self
            .overrides
            .gerrit_project(name)
            .ok_or_else(|| ReportError::UnknownRepository {
                provider: Provider::Gerrit,
                dependency: name.to_string(),
            })?;
        Ok(Repository {
            api_url: url.trim_end_matches('/').to_string(),
            website: url,
        })
    }

    fn resolves_abbreviated(&self) -> bool {
        false
    }

    async fn fetch_installed(
        &self,
        repo: &Repository,
        reference: &str,
    ) -> Result<CanonicalRevision, ReportError> {
        if !is_full_hash(reference) {
            return Err(ReportError::AbbreviatedReference {
                repository: repo.website.clone(),
                reference: reference.to_string(),
            });
        }
        self.commit(repo, reference).await
    }

    async fn fetch_latest(&self, repo: &Repository) -> Result<VersionDetails, ReportError> {
        let branch_url = format!("{}/branches/{}", repo.api_url, DEFAULT_BRANCH);
        let branch: BranchInfo = self.get(&branch_url).await?;
        let head = self.commit(repo, &branch.revision).await?;

        let tags_url = format!("{}/tags", repo.api_url);
        let tags: Vec<TagInfo> = self.get(&tags_url).await?;
        // Last element as returned by the server; the order is not ours to change.
        let version = tags.last().map(|tag| {
            tag.reference
                .strip_prefix("refs/tags/")
                .unwrap_or(&tag.reference)
                .to_string()
        });

        Ok(VersionDetails {
            version,
            time: head.time,
            commit: branch.revision,
        })
    }

    async fn fetch_license(
        &self,
        name: &str,
        _repo: &Repository,
    ) -> Result<Option<String>, ReportError> {
        Ok(self.overrides.license(name).map(str::to_string))
    }
}
