use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default GitHub REST endpoint.
pub const GITHUB_API: &str = "https://api.github.com";

const GOLANG_X_PREFIX: &str = "golang.org/x/";
const GOLANG_X_GERRIT: &str = "https://go-review.googlesource.com/projects/";
const GOLANG_X_MIRROR: &str = "https://github.com/golang/";

/// Runtime configuration: the override tables plus endpoint settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub overrides: OverrideTables,
    pub github_api: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            overrides: OverrideTables::default(),
            github_api: GITHUB_API.to_string(),
        }
    }
}

/// Exceptions for dependencies whose name does not map cleanly to a
/// repository URL. Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct OverrideTables {
    github: HashMap<String, String>,
    gerrit: HashMap<String, String>,
    licenses: HashMap<String, String>,
    gitlab_markers: Vec<String>,
}

impl Default for OverrideTables {
    fn default() -> Self {
        let github = [
            ("go.opencensus.io", "https://github.com/census-instrumentation/opencensus-go"),
            ("google.golang.org/grpc", "https://github.com/grpc/grpc-go"),
            ("google.golang.org/genproto", "https://github.com/googleapis/go-genproto"),
            ("google.golang.org/appengine", "https://github.com/golang/appengine"),
            ("google.golang.org/api", "https://github.com/googleapis/google-api-go-client"),
            ("google.golang.org/protobuf", "https://github.com/golang/protobuf"),
            ("cloud.google.com/go", "https://api.github.com/repos/googleapis/google-cloud-go"),
            ("gopkg.in/check.v1", "https://github.com/go-check/check"),
            ("gopkg.in/yaml.v2", "https://github.com/go-yaml/yaml"),
            ("gopkg.in/yaml.v3", "https://github.com/go-yaml/yaml"),
            ("gopkg.in/square/go-jose.v2", "https://github.com/square/go-jose"),
            ("go.etcd.io/bbolt", "https://github.com/etcd-io/bbolt"),
            ("go.uber.org/atomic", "https://github.com/uber-go/atomic"),
            ("go.uber.org/multierr", "https://github.com/uber-go/multierr"),
            ("go.uber.org/zap", "https://github.com/uber-go/zap"),
            ("gopkg.in/resty.v1", "https://github.com/go-resty/resty"),
            ("gopkg.in/ini.v1", "https://github.com/go-ini/ini"),
            ("gopkg.in/alecthomas/kingpin.v2", "https://github.com/alecthomas/kingpin"),
            ("honnef.co/go/tools", "https://github.com/dominikh/go-tools"),
            ("gopkg.in/DataDog/dd-trace-go.v1", "https://github.com/DataDog/dd-trace-go"),
            ("gotest.tools", "https://github.com/gotestyourself/gotest.tools"),
            ("aidanwoods.dev/go-paseto", "https://github.com/aidantwoods/go-paseto"),
            ("go4.org/intern", "https://github.com/go4org/intern"),
            ("go4.org/unsafe/assume-no-moving-gc", "https://github.com/go4org/unsafe-assume-no-moving-gc"),
            ("inet.af/netaddr", "https://github.com/inetaf/netaddr"),
            ("go.opentelemetry.io/otel", "https://github.com/open-telemetry/opentelemetry-go"),
            ("go.opentelemetry.io/otel/trace", "https://github.com/open-telemetry/opentelemetry-go"),
        ];
        let gerrit = [(
            "cloud.google.com/go",
            "https://code-review.googlesource.com/projects/gocloud",
        )];
        let licenses = [
            ("golang.org/x/crypto", "BSD-3-Clause"),
            ("golang.org/x/sync", "BSD-3-Clause"),
            ("golang.org/x/image", "BSD-3-Clause"),
            ("golang.org/x/net", "BSD-3-Clause"),
            ("golang.org/x/sys", "BSD-3-Clause"),
            ("golang.org/x/text", "BSD-3-Clause"),
            ("golang.org/x/tools", "BSD-3-Clause"),
            ("golang.org/x/xerrors", "BSD-3-Clause"),
            ("golang.org/x/oauth2", "BSD-3-Clause"),
            ("google.golang.org/api", "BSD-3-Clause"),
            ("cloud.google.com/go", "NOASSERTION"),
        ];

        OverrideTables {
            github: to_map(&github),
            gerrit: to_map(&gerrit),
            licenses: to_map(&licenses),
            gitlab_markers: vec!["1password.io".to_string()],
        }
    }
}

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl OverrideTables {
    /// Tables with no entries at all; mostly useful for tests.
    pub fn empty() -> Self {
        OverrideTables {
            github: HashMap::new(),
            gerrit: HashMap::new(),
            licenses: HashMap::new(),
            gitlab_markers: Vec::new(),
        }
    }

    pub fn with_github(mut self, name: &str, url: &str) -> Self {
        self.github.insert(name.to_string(), url.to_string());
        self
    }

    pub fn with_gerrit(mut self, name: &str, url: &str) -> Self {
        self.gerrit.insert(name.to_string(), url.to_string());
        self
    }

    pub fn with_license(mut self, name: &str, license: &str) -> Self {
        self.licenses.insert(name.to_string(), license.to_string());
        self
    }

    pub fn with_gitlab_marker(mut self, marker: &str) -> Self {
        self.gitlab_markers.push(marker.to_string());
        self
    }

    pub fn github_url(&self, name: &str) -> Option<&str> {
        self.github.get(name).map(String::as_str)
    }

    pub fn gerrit_url(&self, name: &str) -> Option<&str> {
        self.gerrit.get(name).map(String::as_str)
    }

    /// Static license for providers without a license endpoint.
    pub fn license(&self, name: &str) -> Option<&str> {
        self.licenses.get(name).map(String::as_str)
    }

    pub fn gitlab_markers(&self) -> &[String] {
        &self.gitlab_markers
    }

    /// The string classification should look at: the code-review override
    /// first, then the generic-hosting override, then the raw name.
    pub fn classification_target<'a>(&'a self, name: &'a str) -> &'a str {
        self.gerrit_url(name)
            .or_else(|| self.github_url(name))
            .unwrap_or(name)
    }

    /// Code-review project URL for a dependency, if one is known.
    pub fn gerrit_project(&self, name: &str) -> Option<String> {
        if let Some(url) = self.gerrit_url(name) {
            return Some(url.to_string());
        }
        name.strip_prefix(GOLANG_X_PREFIX)
            .filter(|repo| !repo.is_empty())
            .map(|repo| format!("{GOLANG_X_GERRIT}{}", first_segment(repo)))
    }

    /// Generic-hosting mirror of a code-review repository, if one is known.
    pub fn github_mirror(&self, name: &str) -> Option<String> {
        if let Some(url) = self.github_url(name) {
            return Some(url.to_string());
        }
        name.strip_prefix(GOLANG_X_PREFIX)
            .filter(|repo| !repo.is_empty())
            .map(|repo| format!("{GOLANG_X_MIRROR}{}", first_segment(repo)))
    }

    fn extend(&mut self, file: ConfigFile) {
        self.github.extend(file.github);
        self.gerrit.extend(file.gerrit);
        self.licenses.extend(file.licenses);
        if let Some(markers) = file.hosts.gitlab {
            self.gitlab_markers = markers;
        }
    }
}

/// `golang.org/x/net/http2` lives in the `net` repository.
fn first_segment(path: &str) -> &str {
    path.split('/').next().unwrap_or(path)
}

/// On-disk override file, deserialized from `.dep-report/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    /// Dependency name → GitHub repository URL.
    github: HashMap<String, String>,
    /// Dependency name → Gerrit project URL.
    gerrit: HashMap<String, String>,
    /// Dependency name → license identifier for Gerrit-hosted projects.
    licenses: HashMap<String, String>,
    hosts: HostsFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostsFile {
    /// Substrings marking a private GitLab host. Replaces the built-in list.
    gitlab: Option<Vec<String>>,
    github_api: Option<String>,
}

impl Config {
    fn from_toml(content: &str) -> Result<Config> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Config::default();
        if let Some(api) = &file.hosts.github_api {
            config.github_api = api.trim_end_matches('/').to_string();
        }
        config.overrides.extend(file);
        Ok(config)
    }
}

/// Load the override configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<project_path>/.dep-report/config.toml`
/// 3. `~/.config/dep-report/config.toml`
/// 4. Built-in [`Config::default`]
///
/// File entries extend the built-in tables; an entry for a name that already
/// has a built-in override replaces it.
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".dep-report").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("dep-report").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded override config");
    Config::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
}
