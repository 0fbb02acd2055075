use crate::config::OverrideTables;
use crate::models::Provider;

/// Substrings identifying a code-review host.
const GERRIT_MARKERS: [&str; 2] = ["googlesource", "golang.org/x"];

/// Substring identifying the generic hosting provider.
const GITHUB_MARKER: &str = "github";

/// Decide which provider hosts `name`.
///
/// An overridden name is classified by its override URL, since the raw name
/// may not mention the hosting domain at all. Checks run in a fixed order:
/// private GitLab host, code-review host, generic host. Review markers are
/// checked before the generic marker, so a string carrying both (a review
/// repository with a browsable GitHub mirror) is `gerrit`.
pub fn classify(name: &str, overrides: &OverrideTables) -> Provider {
    let target = overrides.classification_target(name);

    if overrides
        .gitlab_markers()
        .iter()
        .any(|marker| target.contains(marker.as_str()))
    {
        return Provider::Gitlab;
    }

    if GERRIT_MARKERS.iter().any(|marker| target.contains(marker)) {
        return Provider::Gerrit;
    }

    if target.contains(GITHUB_MARKER) {
        return Provider::Github;
    }

    Provider::Unknown
}
