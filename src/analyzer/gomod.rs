use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::models::Descriptor;

/// One object from `go list -m -json all`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoModule {
    path: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    main: bool,
    #[serde(default)]
    replace: Option<GoReplace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoReplace {
    path: String,
    #[serde(default)]
    version: Option<String>,
}

/// Lists modules through the Go toolchain rather than parsing `go.mod`, so
/// the versions are the ones the build actually selects.
pub struct GoModAnalyzer;

impl GoModAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for GoModAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<Descriptor>> {
        let output = Command::new("go")
            .args(["list", "-m", "-mod=mod", "-json", "all"])
            .current_dir(path)
            .output()
            .context("unable to execute go list command")?;

        if !output.status.success() {
            bail!(
                "go list exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8(output.stdout).context("go list produced invalid UTF-8")?;
        parse_module_stream(&stdout)
    }
}

/// Decode the concatenated JSON objects `go list -json` prints.
fn parse_module_stream(stream: &str) -> Result<Vec<Descriptor>> {
    let mut deps = Vec::new();

    for module in serde_json::Deserializer::from_str(stream).into_iter::<GoModule>() {
        let module = module.context("unable to unmarshal module")?;
        if module.main {
            continue;
        }

        // A versioned replacement is what actually gets built.
        let (name, version) = match module.replace {
            Some(GoReplace {
                path,
                version: Some(version),
            }) => (path, Some(version)),
            _ => (module.path, module.version),
        };

        match version.filter(|v| !v.is_empty()) {
            Some(version) => deps.push(Descriptor {
                name,
                version,
                source: None,
            }),
            None => tracing::debug!(module = %name, "skipping module without version"),
        }
    }

    Ok(deps)
}
