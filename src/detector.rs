use std::path::Path;

/// Lockfile formats dependencies can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lockfile {
    /// `Gopkg.lock` written by `dep`.
    Gopkg,
    /// `go.mod`, read through `go list`.
    GoMod,
}

impl std::fmt::Display for Lockfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lockfile::Gopkg => write!(f, "Gopkg.lock"),
            Lockfile::GoMod => write!(f, "go.mod"),
        }
    }
}

/// Find the lockfile to read. `Gopkg.lock` wins when both are present.
pub fn detect_lockfile(path: &Path) -> Option<Lockfile> {
    if path.join("Gopkg.lock").exists() {
        return Some(Lockfile::Gopkg);
    }
    if path.join("go.mod").exists() {
        return Some(Lockfile::GoMod);
    }
    None
}
