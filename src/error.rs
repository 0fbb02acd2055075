//! Error taxonomy of the provenance engine.

use reqwest::StatusCode;

use crate::models::Provider;
use crate::notify::NotifyError;

/// Every failure the engine can surface. All of them end the run; the
/// license gap is not represented here because it is not an error.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The provider rejected the credential. Not attributable to a dependency.
    #[error("{status} returned from {provider}, verify that GITHUB_OAUTH_TOKEN is set")]
    Authentication { provider: Provider, status: StatusCode },

    #[error("unable to resolve `{identifier}` for {dependency}: {reason}")]
    Resolution {
        dependency: String,
        identifier: String,
        reason: String,
    },

    #[error("unable to make http request to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("unable to decode response body from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to parse commit time `{value}` returned by {url}")]
    Timestamp {
        url: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{repository} only resolves full commit hashes, got `{reference}`")]
    AbbreviatedReference { repository: String, reference: String },

    #[error("invalid version pattern")]
    Pattern(#[from] regex::Error),

    #[error("no {provider} repository known for {dependency}")]
    UnknownRepository { provider: Provider, dependency: String },

    #[error("unable to parse repo url {url}: {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("unable to post failure notification, product: {product}, dependency: {dependency}")]
    Notification {
        product: String,
        dependency: String,
        #[source]
        source: NotifyError,
    },

    /// A per-dependency failure, tagged with the dependency and the step.
    #[error("{operation} failed for {dependency}")]
    Dependency {
        dependency: String,
        operation: &'static str,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Attach dependency context. Run-level errors pass through untouched.
    pub fn for_dependency(self, dependency: &str, operation: &'static str) -> Self {
        match self {
            ReportError::Authentication { .. }
            | ReportError::Notification { .. }
            | ReportError::Dependency { .. } => self,
            other => ReportError::Dependency {
                dependency: dependency.to_string(),
                operation,
                source: Box::new(other),
            },
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, ReportError::Authentication { .. })
    }
}
