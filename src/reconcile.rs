//! Turning lockfile version identifiers into exact commits.
//!
//! Lockfiles from different generations pin dependencies differently: full
//! hashes (`Gopkg.lock`), semantic tags, or pseudo-versions carrying a
//! truncated hash (`go.mod`). [`RevisionSpec::parse`] recognises the shape;
//! [`Reconciler::reconcile`] resolves it to a [`CanonicalRevision`].

use std::sync::OnceLock;

use regex::Regex;

use crate::config::OverrideTables;
use crate::error::ReportError;
use crate::models::{CanonicalRevision, Repository};
use crate::provider::{is_full_hash, CommitResolver, MetadataClient};

/// Suffix the Go toolchain appends to majors > 1 without a `/vN` module path.
const INCOMPATIBLE_SUFFIX: &str = "+incompatible";

/// Shortest hex string taken as an abbreviated commit hash.
const MIN_ABBREVIATED_LEN: usize = 7;

static PSEUDO_VERSION: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn pseudo_version_regex() -> Result<&'static Regex, regex::Error> {
    PSEUDO_VERSION
        .get_or_init(|| Regex::new(r"[.-]\d{14}-([0-9a-fA-F]{7,40})$"))
        .as_ref()
        .map_err(Clone::clone)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSpec {
    Full(String),
    Abbreviated(String),
    Tag(String),
}

impl RevisionSpec {
    pub fn parse(identifier: &str) -> Result<Self, regex::Error> {
        let identifier = identifier.trim();
        let identifier = identifier
            .strip_suffix(INCOMPATIBLE_SUFFIX)
            .unwrap_or(identifier);

        if is_full_hash(identifier) {
            return Ok(RevisionSpec::Full(identifier.to_string()));
        }
        if let Some(hash) = pseudo_version_hash(identifier)? {
            return Ok(RevisionSpec::Abbreviated(hash.to_string()));
        }
        if is_abbreviated_hash(identifier) {
            return Ok(RevisionSpec::Abbreviated(identifier.to_string()));
        }
        Ok(RevisionSpec::Tag(identifier.to_string()))
    }

    /// The string to hand to a provider's commit lookup.
    pub fn reference(&self) -> &str {
        match self {
            RevisionSpec::Full(s) | RevisionSpec::Abbreviated(s) | RevisionSpec::Tag(s) => s,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            RevisionSpec::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

fn is_abbreviated_hash(s: &str) -> bool {
    (MIN_ABBREVIATED_LEN..crate::provider::FULL_HASH_LEN).contains(&s.len())
        && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Final dash-delimited segment of a pseudo-version such as
/// `v0.0.0-20161208181325-20d25e280405` or `v1.2.4-0.20191010170311-2d4d3d3cc8f8`.
fn pseudo_version_hash(identifier: &str) -> Result<Option<&str>, regex::Error> {
    if let Some(caps) = pseudo_version_regex()?.captures(identifier) {
        return Ok(caps.get(1).map(|m| m.as_str()));
    }
    // Other dash-delimited forms still count when the tail is plainly a hash.
    Ok(identifier
        .rsplit_once('-')
        .map(|(_, tail)| tail)
        .filter(|tail| is_abbreviated_hash(tail) || is_full_hash(tail)))
}

/// Resolves identifiers against the owning provider, hopping through a
/// generic-hosting mirror when the owner only accepts full hashes.
pub struct Reconciler<'a> {
    overrides: &'a OverrideTables,
    first_hop: &'a dyn CommitResolver,
}

impl<'a> Reconciler<'a> {
    pub fn new(overrides: &'a OverrideTables, first_hop: &'a dyn CommitResolver) -> Self {
        Reconciler {
            overrides,
            first_hop,
        }
    }

    pub async fn reconcile(
        &self,
        name: &str,
        identifier: &str,
        client: &dyn MetadataClient,
        repo: &Repository,
    ) -> Result<CanonicalRevision, ReportError> {
        let spec = RevisionSpec::parse(identifier)?;
        tracing::debug!(dependency = name, ?spec, provider = %client.provider(), "reconciling");

        let revision = match &spec {
            RevisionSpec::Full(hash) => client.fetch_installed(repo, hash).await?,
            _ if client.resolves_abbreviated() => {
                client.fetch_installed(repo, spec.reference()).await?
            }
            _ => {
                let full = self.resolve_via_mirror(name, identifier, &spec).await?;
                client.fetch_installed(repo, &full).await?
            }
        };

        if !is_full_hash(&revision.commit) {
            return Err(ReportError::Resolution {
                dependency: name.to_string(),
                identifier: identifier.to_string(),
                reason: format!("provider returned partial commit `{}`", revision.commit),
            });
        }
        Ok(revision)
    }

    async fn resolve_via_mirror(
        &self,
        name: &str,
        identifier: &str,
        spec: &RevisionSpec,
    ) -> Result<String, ReportError> {
        let mirror = self
            .overrides
            .github_mirror(name)
            .ok_or_else(|| ReportError::Resolution {
                dependency: name.to_string(),
                identifier: identifier.to_string(),
                reason: "repository is not mirrored on github".to_string(),
            })?;

        let mirror_repo = self.first_hop.repository_for_url(&mirror)?;
        let resolved = self
            .first_hop
            .resolve_commit(&mirror_repo, spec.reference())
            .await?;
        tracing::debug!(dependency = name, mirror = %mirror, commit = %resolved.commit, "resolved through mirror");

        if !is_full_hash(&resolved.commit) {
            return Err(ReportError::Resolution {
                dependency: name.to_string(),
                identifier: identifier.to_string(),
                reason: format!("mirror returned partial commit `{}`", resolved.commit),
            });
        }
        Ok(resolved.commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fakes::{FakeGerrit, FakeGithub};

    const FULL: &str = "d3edc9973b7eb1fb302b0ff2c62357091cea9a30";

    #[test]
    fn test_full_hash_is_kept() {
        assert_eq!(RevisionSpec::parse(FULL).unwrap(), RevisionSpec::Full(FULL.to_string()));
    }

    #[test]
    fn test_pseudo_version_yields_hash_fragment() {
        assert_eq!(
            RevisionSpec::parse("v0.0.0-20161208181325-20d25e280405").unwrap(),
            RevisionSpec::Abbreviated("20d25e280405".to_string())
        );
        assert_eq!(
            RevisionSpec::parse("v1.2.4-0.20191010170311-2d4d3d3cc8f8").unwrap(),
            RevisionSpec::Abbreviated("2d4d3d3cc8f8".to_string())
        );
    }

    #[test]
    fn test_incompatible_marker_is_stripped() {
        assert_eq!(
            RevisionSpec::parse("v2.5.0+incompatible").unwrap(),
            RevisionSpec::Tag("v2.5.0".to_string())
        );
        assert_eq!(
            RevisionSpec::parse("v2.0.0-20190101000000-abcdef123456+incompatible").unwrap(),
            RevisionSpec::Abbreviated("abcdef123456".to_string())
        );
    }

    #[test]
    fn test_tags_and_bare_prefixes() {
        assert_eq!(RevisionSpec::parse("v0.3.2").unwrap(), RevisionSpec::Tag("v0.3.2".to_string()));
        assert_eq!(RevisionSpec::parse("v1.0.0-rc1").unwrap(), RevisionSpec::Tag("v1.0.0-rc1".to_string()));
        assert_eq!(
            RevisionSpec::parse("788fd7840127").unwrap(),
            RevisionSpec::Abbreviated("788fd7840127".to_string())
        );
        assert_eq!(RevisionSpec::parse("v0.3.2").unwrap().tag(), Some("v0.3.2"));
        assert_eq!(RevisionSpec::parse(FULL).unwrap().tag(), None);
    }

    #[test]
    fn test_pseudo_version_pattern_is_compiled_once() {
        let first = pseudo_version_regex().unwrap();
        let second = pseudo_version_regex().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(
            pseudo_version_hash("v0.0.0-20161208181325-20d25e280405").unwrap(),
            Some("20d25e280405")
        );
        assert_eq!(pseudo_version_hash("v1.0.0-rc1").unwrap(), None);
    }

    #[tokio::test]
    async fn test_full_hash_still_fetches_timestamp() {
        let tables = OverrideTables::empty();
        let github = FakeGithub::new().with_commit("pkg/errors", FULL, FULL, "2020-03-24T14:37:07Z");
        let reconciler = Reconciler::new(&tables, &github);
        let repo = github.locate("github.com/pkg/errors").unwrap();

        let revision = reconciler
            .reconcile("github.com/pkg/errors", FULL, &github, &repo)
            .await
            .unwrap();
        assert_eq!(revision.commit, FULL);
        assert_eq!(revision.time, "2020-03-24T14:37:07Z");
    }

    #[tokio::test]
    async fn test_gerrit_abbreviated_goes_through_mirror() {
        let tables = OverrideTables::default();
        let github = FakeGithub::new().with_commit("golang/net", "d3edc9973b7e", FULL, "2020-03-24T14:37:07Z");
        let gerrit = FakeGerrit::new(tables.clone()).with_commit("net", FULL, "2020-03-24T14:37:07Z");
        let reconciler = Reconciler::new(&tables, &github);
        let repo = gerrit.locate("golang.org/x/net").unwrap();

        let revision = reconciler
            .reconcile("golang.org/x/net", "v0.0.0-20200324143707-d3edc9973b7e", &gerrit, &repo)
            .await
            .unwrap();
        assert_eq!(revision.commit, FULL);
        assert_eq!(github.lookups(), vec!["golang/net@d3edc9973b7e".to_string()]);
    }

    #[tokio::test]
    async fn test_unmirrored_review_repository_fails() {
        let tables = OverrideTables::empty()
            .with_gerrit("example.org/review", "https://review.example.org/projects/review");
        let github = FakeGithub::new();
        let gerrit = FakeGerrit::new(tables.clone());
        let reconciler = Reconciler::new(&tables, &github);
        let repo = gerrit.locate("example.org/review").unwrap();

        let err = reconciler
            .reconcile("example.org/review", "v1.0.0", &gerrit, &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Resolution { ref dependency, .. } if dependency == "example.org/review"));
    }

    #[tokio::test]
    async fn test_partial_commit_never_leaks() {
        let tables = OverrideTables::empty();
        let github = FakeGithub::new().with_commit("pkg/errors", "v0.8.1", "645ef004", "2016-09-29T01:48:01Z");
        let reconciler = Reconciler::new(&tables, &github);
        let repo = github.locate("github.com/pkg/errors").unwrap();

        let err = reconciler
            .reconcile("github.com/pkg/errors", "v0.8.1", &github, &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Resolution { .. }));
    }
}
