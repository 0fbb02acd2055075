use serde::{Deserialize, Serialize};

/// License value recorded when a provider supports licenses but none was found.
pub const UNKNOWN_LICENSE: &str = "Unknown license";

/// A dependency as read from a lockfile, before provenance resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    /// Full hash, truncated hash, semantic tag, or pseudo-version.
    pub version: String,
    /// Upstream source declared by the lockfile, if any.
    pub source: Option<String>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Descriptor {
            name: name.into(),
            version: version.into(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Gerrit,
    Gitlab,
    Unknown,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Github => write!(f, "github"),
            Provider::Gerrit => write!(f, "gerrit"),
            Provider::Gitlab => write!(f, "gitlab"),
            Provider::Unknown => write!(f, "unknown"),
        }
    }
}

/// An exact commit: full 40-hex hash plus its commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRevision {
    pub commit: String,
    /// ISO-8601 UTC.
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub time: String,
    pub commit: String,
}

impl VersionDetails {
    pub fn from_revision(revision: CanonicalRevision, version: Option<String>) -> Self {
        VersionDetails {
            version,
            time: revision.time,
            commit: revision.commit,
        }
    }
}

/// Repository coordinates for one dependency on one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Base URL every REST call for this repository is built from.
    pub api_url: String,
    /// Browsable URL written into the report.
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub name: String,
    #[serde(rename = "source")]
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(rename = "website", default)]
    pub repository_url: String,
    pub installed: VersionDetails,
    pub latest: VersionDetails,
}

impl ReportRecord {
    /// A record carrying only what is known without talking to a provider.
    pub fn stub(name: &str, provider: Provider) -> Self {
        ReportRecord {
            name: name.to_string(),
            provider,
            license: None,
            repository_url: String::new(),
            installed: VersionDetails::default(),
            latest: VersionDetails::default(),
        }
    }
}

/// Build metadata merged into every report once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub product: String,
    pub generated_at: String,
    pub build_commit: String,
    pub build_commit_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub product: String,
    #[serde(rename = "reportTime")]
    pub generated_at: String,
    #[serde(rename = "commit")]
    pub build_commit: String,
    #[serde(rename = "commitTime")]
    pub build_commit_time: String,
    pub dependencies: Vec<ReportRecord>,
}

impl Report {
    pub fn new(header: ReportHeader, dependencies: Vec<ReportRecord>) -> Self {
        Report {
            product: header.product,
            generated_at: header.generated_at,
            build_commit: header.build_commit,
            build_commit_time: header.build_commit_time,
            dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_historical_field_names() {
        let mut record = ReportRecord::stub("golang.org/x/text", Provider::Gerrit);
        record.license = Some("BSD-3-Clause".to_string());
        record.repository_url = "https://go-review.googlesource.com/projects/text".to_string();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "gerrit");
        assert_eq!(json["website"], "https://go-review.googlesource.com/projects/text");
        assert!(json["installed"].get("version").is_none());
    }

    #[test]
    fn test_license_omitted_when_absent() {
        let record = ReportRecord::stub("gitlab.1password.io/core", Provider::Gitlab);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("license").is_none());
    }
}
