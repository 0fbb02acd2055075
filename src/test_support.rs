//! In-process HTTP responder for exercising the REST clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Request line and headers, lowercased.
    pub head: String,
    pub path: String,
    pub body: String,
}

pub struct MockServer {
    pub base: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Serve canned `(path, status, body)` responses; anything else is a 404.
pub async fn serve(routes: Vec<(String, u16, String)>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, status, body)| (path, (status, body)))
            .collect(),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));

    let task_seen = seen.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let routes = routes.clone();
            let seen = task_seen.clone();
            tokio::spawn(async move {
                respond(socket, &routes, &seen).await;
            });
        }
    });

    MockServer { base, seen }
}

async fn respond(
    mut socket: TcpStream,
    routes: &HashMap<String, (u16, String)>,
    seen: &Mutex<Vec<SeenRequest>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request_line = String::from_utf8_lossy(&buf[..header_end])
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let (status, response_body) = routes
        .get(&path)
        .cloned()
        .unwrap_or((404, r#"{"message":"Not Found"}"#.to_string()));

    seen.lock().unwrap().push(SeenRequest { head, path, body });

    let response = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        reason(status),
        response_body.len(),
        response_body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

pub fn test_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Body of a GitHub `GET /repos/{owner}/{repo}/commits/{ref}` response.
pub fn commit_json(sha: &str, date: &str) -> String {
    format!(
        r#"{{"sha":"{sha}","commit":{{"committer":{{"name":"Gopher","date":"{date}"}},"message":"msg"}}}}"#
    )
}

/// Body of a Gerrit `GET /projects/{project}/commits/{sha}` response.
pub fn gerrit_commit_json(sha: &str, date: &str) -> String {
    format!(
        ")]}}'\n{{\"commit\":\"{sha}\",\"committer\":{{\"name\":\"Gopher\",\"date\":\"{date}\",\"tz\":0}},\"subject\":\"msg\"}}"
    )
}

/// In-memory providers and notifier for engine tests.
pub mod fakes {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::config::OverrideTables;
    use crate::error::ReportError;
    use crate::models::{CanonicalRevision, Provider, Repository, VersionDetails};
    use crate::notify::{NotifyError, Notifier};
    use crate::provider::github::repo_slug;
    use crate::provider::{is_full_hash, CommitResolver, MetadataClient};

    fn revision(sha: &str, time: &str) -> CanonicalRevision {
        CanonicalRevision {
            commit: sha.to_string(),
            time: time.to_string(),
        }
    }

    fn not_found(url: String) -> ReportError {
        ReportError::Status {
            url,
            status: StatusCode::NOT_FOUND,
        }
    }

    #[derive(Default)]
    pub struct FakeGithub {
        commits: HashMap<(String, String), CanonicalRevision>,
        latest: HashMap<String, VersionDetails>,
        licenses: HashMap<String, String>,
        unauthorized: bool,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeGithub {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_commit(mut self, slug: &str, reference: &str, sha: &str, time: &str) -> Self {
            self.commits
                .insert((slug.to_string(), reference.to_string()), revision(sha, time));
            self
        }

        pub fn with_latest(mut self, slug: &str, sha: &str, time: &str, version: Option<&str>) -> Self {
            self.latest.insert(
                slug.to_string(),
                VersionDetails::from_revision(revision(sha, time), version.map(str::to_string)),
            );
            self
        }

        pub fn with_license(mut self, slug: &str, license: &str) -> Self {
            self.licenses.insert(slug.to_string(), license.to_string());
            self
        }

        pub fn unauthorized(mut self) -> Self {
            self.unauthorized = true;
            self
        }

        /// `slug@reference` for every commit lookup made so far, including
        /// ones rejected as unauthorized.
        pub fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }

        fn check_auth(&self) -> Result<(), ReportError> {
            if self.unauthorized {
                return Err(ReportError::Authentication {
                    provider: Provider::Github,
                    status: StatusCode::UNAUTHORIZED,
                });
            }
            Ok(())
        }

        fn slug(repo: &Repository) -> String {
            repo.api_url.trim_start_matches("fake://github/").to_string()
        }
    }

    #[async_trait]
    impl CommitResolver for FakeGithub {
        fn repository_for_url(&self, url: &str) -> Result<Repository, ReportError> {
            let slug = repo_slug(url)?;
            Ok(Repository {
                api_url: format!("fake://github/{slug}"),
                website: format!("https://github.com/{slug}"),
            })
        }

        async fn resolve_commit(
            &self,
            repo: &Repository,
            reference: &str,
        ) -> Result<CanonicalRevision, ReportError> {
            let slug = Self::slug(repo);
            self.lookups.lock().unwrap().push(format!("{slug}@{reference}"));
            self.check_auth()?;
            self.commits
                .get(&(slug, reference.to_string()))
                .cloned()
                .ok_or_else(|| not_found(format!("{}/commits/{}", repo.api_url, reference)))
        }
    }

    #[async_trait]
    impl MetadataClient for FakeGithub {
        fn provider(&self) -> Provider {
            Provider::Github
        }

        fn locate(&self, name: &str) -> Result<Repository, ReportError> {
            self.repository_for_url(&format!("https://{name}"))
        }

        fn resolves_abbreviated(&self) -> bool {
            true
        }

        async fn fetch_installed(
            &self,
            repo: &Repository,
            reference: &str,
        ) -> Result<CanonicalRevision, ReportError> {
            self.resolve_commit(repo, reference).await
        }

        async fn fetch_latest(&self, repo: &Repository) -> Result<VersionDetails, ReportError> {
            self.check_auth()?;
            self.latest
                .get(&Self::slug(repo))
                .cloned()
                .ok_or_else(|| not_found(format!("{}/commits/HEAD", repo.api_url)))
        }

        async fn fetch_license(
            &self,
            _name: &str,
            repo: &Repository,
        ) -> Result<Option<String>, ReportError> {
            self.check_auth()?;
            Ok(self.licenses.get(&Self::slug(repo)).cloned())
        }
    }

    pub struct FakeGerrit {
        overrides: OverrideTables,
        commits: HashMap<(String, String), CanonicalRevision>,
        latest: HashMap<String, VersionDetails>,
    }

    impl FakeGerrit {
        pub fn new(overrides: OverrideTables) -> Self {
            FakeGerrit {
                overrides,
                commits: HashMap::new(),
                latest: HashMap::new(),
            }
        }

        /// `project` is the last path segment of the Gerrit project URL.
        pub fn with_commit(mut self, project: &str, sha: &str, time: &str) -> Self {
            self.commits
                .insert((project.to_string(), sha.to_string()), revision(sha, time));
            self
        }

        pub fn with_latest(mut self, project: &str, sha: &str, time: &str, tag: Option<&str>) -> Self {
            self.latest.insert(
                project.to_string(),
                VersionDetails::from_revision(revision(sha, time), tag.map(str::to_string)),
            );
            self
        }

        fn project(repo: &Repository) -> String {
            repo.api_url
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        }
    }

    #[async_trait]
    impl MetadataClient for FakeGerrit {
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
                api_url: url.clone(),
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
            assert!(is_full_hash(reference), "gerrit was asked for `{reference}`");
            self.commits
                .get(&(Self::project(repo), reference.to_string()))
                .cloned()
                .ok_or_else(|| not_found(format!("{}/commits/{}", repo.api_url, reference)))
        }

        async fn fetch_latest(&self, repo: &Repository) -> Result<VersionDetails, ReportError> {
            self.latest
                .get(&Self::project(repo))
                .cloned()
                .ok_or_else(|| not_found(format!("{}/branches/master", repo.api_url)))
        }

        async fn fetch_license(
            &self,
            name: &str,
            _repo: &Repository,
        ) -> Result<Option<String>, ReportError> {
            Ok(self.overrides.license(name).map(str::to_string))
        }
    }

    /// Records every notification; optionally rejects them.
    #[derive(Default)]
    pub struct FakeNotifier {
        reject: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeNotifier {
        pub fn accepting() -> Self {
            Self::default()
        }

        pub fn rejecting() -> Self {
            FakeNotifier {
                reject: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn notify_license_gap(&self, product: &str, dependency: &str) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((product.to_string(), dependency.to_string()));
            if self.reject {
                return Err(NotifyError::Rejected("invalid_payload".to_string()));
            }
            Ok(())
        }
    }
}
