use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::Descriptor;

#[derive(Debug, Deserialize)]
struct GopkgLock {
    #[serde(default)]
    projects: Vec<GopkgProject>,
}

#[derive(Debug, Deserialize)]
struct GopkgProject {
    name: String,
    /// Pinned commit; always a full hash when `dep` wrote the file.
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    /// Alternate upstream, when the import path is served from elsewhere.
    #[serde(default)]
    source: Option<String>,
}

pub struct GopkgAnalyzer;

impl GopkgAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for GopkgAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<Descriptor>> {
        let lock_path = path.join("Gopkg.lock");
        let content = std::fs::read_to_string(&lock_path)
            .with_context(|| format!("failed to read {}", lock_path.display()))?;
        parse_gopkg_lock(&content).with_context(|| format!("failed to parse {}", lock_path.display()))
    }
}

fn parse_gopkg_lock(content: &str) -> Result<Vec<Descriptor>> {
    let lock: GopkgLock = toml::from_str(content)?;

    let deps = lock
        .projects
        .into_iter()
        .map(|p| {
            let version = p
                .revision
                .or(p.version)
                .or(p.branch)
                .unwrap_or_default();
            Descriptor {
                name: p.name,
                version,
                source: p.source.filter(|s| !s.is_empty()),
            }
        })
        .collect();

    Ok(deps)
}
