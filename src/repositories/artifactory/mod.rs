use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tracing::debug;
use url::Url;

use super::{RepositoryListItem, VirtualRepository};
use crate::servers::Credentials;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("maven-resolver-config/", env!("CARGO_PKG_VERSION"));
const VIRTUAL_REPOSITORIES_PATH: &str = "api/repositories";

/// Source of a server's virtual repository catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every virtual repository visible with `credentials`, sorted by key.
    async fn fetch_virtual_repositories(
        &self,
        server_url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<VirtualRepository>, RepositoryFetchError>;
}

/// Catalog fetch failure. `Display` is meant to be shown to users as-is.
#[derive(thiserror::Error, Debug)]
pub enum RepositoryFetchError {
    #[error("invalid server URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("failed to GET {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("could not parse repository list from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Artifactory REST client listing virtual repositories.
#[derive(Debug, Clone)]
pub struct ArtifactoryClient {
    client: Client,
    timeout: Duration,
}

impl ArtifactoryClient {
    pub fn new() -> Result<Self, RepositoryFetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, RepositoryFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(RepositoryFetchError::Client)?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, url: &Url, err: reqwest::Error) -> RepositoryFetchError {
        if err.is_timeout() {
            RepositoryFetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            RepositoryFetchError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// `{server}/api/repositories?type=virtual`, keeping any context path.
pub fn virtual_repositories_url(server_url: &str) -> Result<Url, RepositoryFetchError> {
    let trimmed = server_url.trim();
    // `Url::join` drops the last segment unless the base ends with '/'.
    let base = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let mut url = Url::parse(&base)
        .and_then(|b| b.join(VIRTUAL_REPOSITORIES_PATH))
        .map_err(|source| RepositoryFetchError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
    url.query_pairs_mut().append_pair("type", "virtual");
    Ok(url)
}

/// Decode a listing body into a catalog sorted by key.
pub fn parse_repository_list(url: &Url, body: &[u8]) -> Result<Vec<VirtualRepository>, RepositoryFetchError> {
    let items: Vec<RepositoryListItem> =
        serde_json::from_slice(body).map_err(|source| RepositoryFetchError::Decode {
            url: url.to_string(),
            source,
        })?;
    let mut repos: Vec<VirtualRepository> = items.into_iter().map(Into::into).collect();
    repos.sort();
    Ok(repos)
}

#[async_trait]
impl CatalogSource for ArtifactoryClient {
    async fn fetch_virtual_repositories(
        &self,
        server_url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<VirtualRepository>, RepositoryFetchError> {
        let url = virtual_repositories_url(server_url)?;
        debug!("listing virtual repositories from {url}");

        let mut request = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(creds) = credentials {
            request = request.basic_auth(creds.username(), Some(creds.password()));
        }

        let res = request.send().await.map_err(|e| self.classify(&url, e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(RepositoryFetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let bytes = res.bytes().await.map_err(|e| self.classify(&url, e))?;
        let repos = parse_repository_list(&url, &bytes)?;
        debug!("received {} virtual repositories from {url}", repos.len());
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (format!("http://{addr}/artifactory"), rx)
    }

    #[test_case("https://repo.example.com/artifactory", "https://repo.example.com/artifactory/api/repositories?type=virtual" ; "context path")]
    #[test_case("https://repo.example.com/artifactory/", "https://repo.example.com/artifactory/api/repositories?type=virtual" ; "trailing slash")]
    #[test_case("http://localhost:8081", "http://localhost:8081/api/repositories?type=virtual" ; "bare host")]
    fn builds_listing_url(server: &str, expected: &str) {
        assert_eq!(virtual_repositories_url(server).unwrap().as_str(), expected);
    }

    #[test]
    fn rejects_unparsable_server_url() {
        let err = virtual_repositories_url("not a url").unwrap_err();
        assert!(matches!(err, RepositoryFetchError::InvalidUrl { .. }));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn parsed_listing_is_sorted() {
        let url = virtual_repositories_url("http://localhost").unwrap();
        let body = br#"[{"key":"remote-repos"},{"key":"libs-snapshot"},{"key":"Libs"},{"key":"libs-release"}]"#;
        let repos = parse_repository_list(&url, body).unwrap();
        let keys: Vec<_> = repos.iter().map(|r| r.key()).collect();
        assert_eq!(keys, ["Libs", "libs-release", "libs-snapshot", "remote-repos"]);
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn malformed_listing_is_decode_error() {
        let url = virtual_repositories_url("http://localhost").unwrap();
        let err = parse_repository_list(&url, br#"{"errors":[]}"#).unwrap_err();
        assert!(matches!(err, RepositoryFetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn fetches_sorted_catalog_with_basic_auth() {
        let body = r#"[{"key":"plugins-virtual","type":"VIRTUAL"},{"key":"maven-virtual","type":"VIRTUAL","description":"Maven"}]"#;
        let (server_url, request) = serve_once("200 OK", body).await;

        let client = ArtifactoryClient::new().unwrap();
        let creds = Credentials::new("ci", "s3cret");
        let repos = client
            .fetch_virtual_repositories(&server_url, Some(&creds))
            .await
            .unwrap();

        let keys: Vec<_> = repos.iter().map(|r| r.key()).collect();
        assert_eq!(keys, ["maven-virtual", "plugins-virtual"]);
        assert_eq!(repos[0].description(), Some("Maven"));

        let raw = request.await.unwrap();
        assert!(raw.starts_with("GET /artifactory/api/repositories?type=virtual "));
        // base64("ci:s3cret")
        assert!(raw.to_ascii_lowercase().contains("authorization: basic y2k6cznjcmv0"));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (server_url, _request) = serve_once("401 Unauthorized", r#"{"errors":[{"status":401}]}"#).await;

        let client = ArtifactoryClient::new().unwrap();
        let err = client.fetch_virtual_repositories(&server_url, None).await.unwrap_err();

        match err {
            RepositoryFetchError::Status { status, .. } => assert_eq!(status, StatusCode::UNAUTHORIZED),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn silent_server_is_timeout_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let holder = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
            drop(socket);
        });

        let client = ArtifactoryClient::with_timeout(Duration::from_millis(300)).unwrap();
        let err = client
            .fetch_virtual_repositories(&format!("http://{addr}"), None)
            .await
            .unwrap_err();
        holder.abort();

        assert!(matches!(err, RepositoryFetchError::Timeout { .. }), "{err}");
        assert!(err.to_string().ends_with("timed out after 300ms"), "{err}");
    }

    #[tokio::test]
    async fn connection_failure_is_request_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ArtifactoryClient::with_timeout(Duration::from_secs(5)).unwrap();
        let err = client
            .fetch_virtual_repositories(&format!("http://{addr}"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryFetchError::Request { .. } | RepositoryFetchError::Timeout { .. }
        ));
        assert!(!err.to_string().is_empty());
    }
}
