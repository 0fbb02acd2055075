use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{CommitResolver, MetadataClient};
use crate::config::OverrideTables;
use crate::error::ReportError;
use crate::models::{CanonicalRevision, Provider, Repository, VersionDetails};

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitBody,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    committer: Committer,
}

#[derive(Debug, Deserialize)]
struct Committer {
    date: String,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    license: Option<LicenseInfo>,
}

#[derive(Debug, Deserialize)]
struct LicenseInfo {
    spdx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// GitHub REST client. Every endpoint is keyed by an `owner/repo` slug.
pub struct GithubClient {
    client: Client,
    api: String,
    token: String,
    overrides: Arc<OverrideTables>,
}

impl GithubClient {
    pub fn new(client: Client, api: &str, token: &str, overrides: Arc<OverrideTables>) -> Self {
        GithubClient {
            client,
            api: api.trim_end_matches('/').to_string(),
            token: token.to_string(),
            overrides,
        }
    }

    /// GET `url` and decode it. `Ok(None)` when the resource does not exist.
    async fn get_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, ReportError> {
        tracing::debug!(url, "github request");
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|source| ReportError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ReportError::Authentication {
                provider: Provider::Github,
                status,
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
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
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|source| ReportError::Decode {
                url: url.to_string(),
                source,
            })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ReportError> {
        self.get_optional(url)
            .await?
            .ok_or_else(|| ReportError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            })
    }

    async fn commit(&self, repo: &Repository, reference: &str) -> Result<CanonicalRevision, ReportError> {
        let url = format!("{}/commits/{}", repo.api_url, reference);
        let response: CommitResponse = self.get(&url).await?;
        Ok(CanonicalRevision {
            commit: response.sha,
            time: response.commit.committer.date,
        })
    }
}

/// Extract `owner/repo` from a repository URL.
///
/// The path has its single leading `/` stripped; API URLs of the form
/// `https://api.github.com/repos/owner/repo` are accepted as well, and any
/// segments after the repository are ignored.
pub fn repo_slug(url: &str) -> Result<String, ReportError> {
    let invalid = |reason: &str| ReportError::InvalidRepositoryUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    let path = parsed.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = if parsed.host_str().is_some_and(|h| h.starts_with("api.")) {
        path.strip_prefix("repos/").unwrap_or(path)
    } else {
        path
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) => Ok(format!(
            "{}/{}",
            owner,
            repo.strip_suffix(".git").unwrap_or(repo)
        )),
        _ => Err(invalid("expected an owner/repository path")),
    }
}

#[async_trait]
impl CommitResolver for GithubClient {
    fn repository_for_url(&self, url: &str) -> Result<Repository, ReportError> {
        let slug = repo_slug(url)?;
        Ok(Repository {
            api_url: format!("{}/repos/{}", self.api, slug),
            website: format!("https://github.com/{slug}"),
        })
    }

    async fn resolve_commit(
        &self,
        repo: &Repository,
        reference: &str,
    ) -> Result<CanonicalRevision, ReportError> {
        self.commit(repo, reference).await
    }
}

#[async_trait]
impl MetadataClient for GithubClient {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    fn locate(&self, name: &str) -> Result<Repository, ReportError> {
        match self.overrides.github_url(name) {
            Some(url) => self.repository_for_url(url),
            None => self.repository_for_url(&format!("https://{name}")),
        }
    }

    fn resolves_abbreviated(&self) -> bool {
        true
    }

    async fn fetch_installed(
        &self,
        repo: &Repository,
        reference: &str,
    ) -> Result<CanonicalRevision, ReportError> {
        self.commit(repo, reference).await
    }

    async fn fetch_latest(&self, repo: &Repository) -> Result<VersionDetails, ReportError> {
        let head = self.commit(repo, "HEAD").await?;

        let release_url = format!("{}/releases/latest", repo.api_url);
        let release: Option<Release> = self.get_optional(&release_url).await?;

        Ok(VersionDetails::from_revision(
            head,
            release.map(|r| r.tag_name).filter(|t| !t.is_empty()),
        ))
    }

    async fn fetch_license(
        &self,
        _name: &str,
        repo: &Repository,
    ) -> Result<Option<String>, ReportError> {
        let url = format!("{}/license", repo.api_url);
        let response: Option<LicenseResponse> = self.get_optional(&url).await?;
        Ok(response
            .and_then(|r| r.license)
            .and_then(|l| l.spdx_id)
            .filter(|id| !id.is_empty()))
    }
}
