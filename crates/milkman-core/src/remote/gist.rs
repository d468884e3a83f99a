//! GitHub Gist backed document store
//!
//! ## Protocol
//!
//! - `GET  {api}/gists/{id}` returns the document; the ledger is the
//!   content of the configured file
//! - `POST {api}/gists` creates a private document, returns its `id`
//! - `PATCH {api}/gists/{id}` overwrites the file
//!
//! Create and update share the body
//! `{description, public: false, files: {filename: {content}}}`.
//! Non-2xx responses carry a `message` field.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DocumentStore, RemoteError};
use crate::config::Config;

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 10;

const ACCEPT_HEADER: &str = "application/vnd.github+json";

const USER_AGENT: &str = concat!("milkman/", env!("CARGO_PKG_VERSION"));

/// Body of create/update requests
#[derive(Debug, Serialize)]
struct GistPayload<'a> {
    description: String,
    public: bool,
    files: HashMap<&'a str, GistFileContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GistFileContent<'a> {
    content: &'a str,
}

/// Subset of a gist response we care about
#[derive(Debug, Deserialize)]
struct GistResponse {
    id: String,
    #[serde(default)]
    files: HashMap<String, Option<GistFile>>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the gist API
#[derive(Debug, Clone)]
pub struct GistClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    filename: String,
}

impl GistClient {
    /// Create a client
    ///
    /// `token` of `None` (or empty) puts the client in offline mode.
    pub fn new(
        api_url: &str,
        token: Option<String>,
        filename: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            filename: filename.into(),
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self, RemoteError> {
        let token = if config.sync_enabled { token } else { None };
        Self::new(&config.api_url, token, config.filename.clone())
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, RemoteError> {
        let token = self.token.as_deref().ok_or(RemoteError::Offline)?;
        Ok(request.bearer_auth(token).header(ACCEPT, ACCEPT_HEADER))
    }

    fn payload<'a>(&'a self, content: &'a str) -> GistPayload<'a> {
        GistPayload {
            description: format!(
                "milkman data sync ({})",
                Utc::now().format("%Y-%m-%d %H:%M:%S")
            ),
            public: false,
            files: HashMap::from([(self.filename.as_str(), GistFileContent { content })]),
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        id: Option<&str>,
    ) -> Result<Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        debug!("Remote store returned {}: {}", status, message);

        Err(match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound {
                id: id.unwrap_or_default().to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(message),
            _ => RemoteError::Http {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Pull the `message` field out of an error body
async fn error_message(response: Response) -> String {
    let status = response.status();
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    };

    match response.text().await {
        Ok(body) => serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(fallback),
        Err(_) => fallback(),
    }
}

async fn parse_gist(response: Response) -> Result<GistResponse, RemoteError> {
    response
        .json::<GistResponse>()
        .await
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl DocumentStore for GistClient {
    fn is_online(&self) -> bool {
        self.token.is_some()
    }

    async fn read(&self, id: &str) -> Result<String, RemoteError> {
        let url = format!("{}/gists/{}", self.api_url, id);
        debug!("GET {}", url);

        let request = self.authorized(self.http.get(&url))?;
        let response = self.send(request, Some(id)).await?;
        let mut gist = parse_gist(response).await?;

        gist.files
            .remove(&self.filename)
            .flatten()
            .and_then(|file| file.content)
            .ok_or_else(|| RemoteError::MissingFile {
                id: gist.id,
                filename: self.filename.clone(),
            })
    }

    async fn create(&self, content: &str) -> Result<String, RemoteError> {
        let url = format!("{}/gists", self.api_url);
        debug!("POST {}", url);

        let request = self.authorized(self.http.post(&url))?;
        let response = self
            .send(request.json(&self.payload(content)), None)
            .await?;
        let gist = parse_gist(response).await?;

        Ok(gist.id)
    }

    async fn update(&self, id: &str, content: &str) -> Result<(), RemoteError> {
        let url = format!("{}/gists/{}", self.api_url, id);
        debug!("PATCH {}", url);

        let request = self.authorized(self.http.patch(&url))?;
        self.send(request.json(&self.payload(content)), Some(id))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use serde_json::json;

    const FILE: &str = "milk-data.json";

    fn client(server: &MockServer) -> GistClient {
        GistClient::new(&server.base_url(), Some("t0k3n".to_string()), FILE).unwrap()
    }

    #[test]
    fn test_offline_without_token() {
        let client = GistClient::new("https://api.github.com", None, FILE).unwrap();
        assert!(!client.is_online());

        let client = GistClient::new("https://api.github.com", Some("  ".into()), FILE).unwrap();
        assert!(!client.is_online());
    }

    #[test]
    fn test_sync_disabled_forces_offline() {
        let config = Config {
            sync_enabled: false,
            ..Config::default()
        };
        let client = GistClient::from_config(&config, Some("t0k3n".into())).unwrap();
        assert!(!client.is_online());
    }

    #[tokio::test]
    async fn test_offline_operations_are_rejected_without_requests() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        let client = GistClient::new(&server.base_url(), None, FILE).unwrap();
        assert_eq!(client.read("abc").await, Err(RemoteError::Offline));
        assert_eq!(client.create("{}").await, Err(RemoteError::Offline));
        assert_eq!(client.update("abc", "{}").await, Err(RemoteError::Offline));

        assert_eq!(any.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_read_returns_file_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/gists/abc123")
                    .header("authorization", "Bearer t0k3n");
                then.status(200).json_body(json!({
                    "id": "abc123",
                    "files": {
                        FILE: { "filename": FILE, "content": "{\"count\":4}" },
                        "other.txt": { "filename": "other.txt", "content": "ignored" }
                    }
                }));
            })
            .await;

        let content = client(&server).read("abc123").await.unwrap();
        assert_eq!(content, "{\"count\":4}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gists/abc123");
                then.status(200).json_body(json!({
                    "id": "abc123",
                    "files": { "notes.md": { "content": "hello" } }
                }));
            })
            .await;

        let err = client(&server).read("abc123").await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::MissingFile {
                id: "abc123".to_string(),
                filename: FILE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_read_error_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gists/gone");
                then.status(404).json_body(json!({ "message": "Not Found" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gists/locked");
                then.status(401)
                    .json_body(json!({ "message": "Bad credentials" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gists/broken");
                then.status(502).body("<html>bad gateway</html>");
            })
            .await;

        let client = client(&server);
        assert_eq!(
            client.read("gone").await,
            Err(RemoteError::NotFound {
                id: "gone".to_string()
            })
        );
        assert_eq!(
            client.read("locked").await,
            Err(RemoteError::Auth("Bad credentials".to_string()))
        );
        assert_eq!(
            client.read("broken").await,
            Err(RemoteError::Http {
                status: 502,
                message: "Bad Gateway".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_read_invalid_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gists/abc");
                then.status(200).body("not json");
            })
            .await;

        let err = client(&server).read("abc").await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_network_error() {
        // Nothing listens on port 9 of localhost
        let client = GistClient::new("http://127.0.0.1:9", Some("t".into()), FILE).unwrap();
        let err = client.read("abc").await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }

    #[tokio::test]
    async fn test_create_posts_private_document() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/gists")
                    .header("authorization", "Bearer t0k3n")
                    .json_body_partial(
                        json!({
                            "public": false,
                            "files": { FILE: { "content": "{\"count\":3}" } }
                        })
                        .to_string(),
                    );
                then.status(201).json_body(json!({ "id": "new-gist", "files": {} }));
            })
            .await;

        let id = client(&server).create("{\"count\":3}").await.unwrap();
        assert_eq!(id, "new-gist");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_patches_document() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/gists/abc123")
                    .json_body_partial(
                        json!({ "files": { FILE: { "content": "{\"count\":9}" } } }).to_string(),
                    );
                then.status(200).json_body(json!({ "id": "abc123", "files": {} }));
            })
            .await;

        client(&server)
            .update("abc123", "{\"count\":9}")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_reports_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PATCH).path("/gists/abc123");
                then.status(422)
                    .json_body(json!({ "message": "Validation Failed" }));
            })
            .await;

        let err = client(&server).update("abc123", "{}").await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Http {
                status: 422,
                message: "Validation Failed".to_string()
            }
        );
        assert!(err.to_string().contains("Validation Failed"));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = GistClient::new("http://localhost:1234/", None, FILE).unwrap();
        assert_eq!(client.api_url, "http://localhost:1234");
    }
}
