//! JSON REST client for the school backend

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{ErrorBody, StartLiveResponse, WhipEndpoint};
use crate::error::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

const JSON: &str = "application/json";

/// REST client configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,

    /// Bearer token for the Authorization header
    pub token: Option<String>,

    /// Request timeout (None = transport default)
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            timeout: None,
        }
    }
}

impl ApiConfig {
    /// Defaults overridden by `API_BASE_URL` and `API_TOKEN`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = std::env::var("API_BASE_URL") {
            if !base.trim().is_empty() {
                config.base_url = base;
            }
        }
        config.token = std::env::var("API_TOKEN").ok().filter(|t| !t.is_empty());
        config
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Client for the school REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(Error::network)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path).header(CONTENT_TYPE, JSON))
            .await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    /// POST without a body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::POST, path).header(CONTENT_TYPE, JSON))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::DELETE, path).header(CONTENT_TYPE, JSON))
            .await
    }

    /// Multipart form submission (file uploads)
    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        self.send(self.request(Method::POST, path).multipart(form))
            .await
    }

    /// Ask the backend to open the live broadcast for a lesson
    pub async fn start_live(&self, lesson_id: u64) -> Result<StartLiveResponse> {
        self.post(&format!("/teacher/lessons/{}/start-live-youtube", lesson_id))
            .await
    }

    pub async fn whip_endpoint(&self, lesson_id: u64) -> Result<WhipEndpoint> {
        self.get(&format!("/teacher/lessons/{}/whip", lesson_id))
            .await
    }

    /// Start the lesson's live broadcast and return its ingest URL
    pub async fn open_live_lesson(&self, lesson_id: u64) -> Result<String> {
        self.start_live(lesson_id).await?;

        let endpoint = self.whip_endpoint(lesson_id).await?;
        let url = endpoint.url().ok_or(Error::MissingIngestUrl)?.to_owned();

        tracing::info!(lesson_id = lesson_id, url = %url, "Live lesson opened");
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, url).header(ACCEPT, JSON);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(Error::network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(Error::network)?;

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::debug!(status = status.as_u16(), message = %message, "API request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        // Empty success bodies decode as an empty object
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &body[..]
        };

        serde_json::from_slice(body).map_err(|e| Error::Api {
            status: status.as_u16(),
            message: format!("Invalid response body: {}", e),
        })
    }
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            format!(
                "API request failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
            .trim_end()
            .to_string()
        })
}
