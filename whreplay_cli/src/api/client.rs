//! Replay backend client
//!
//! Wraps the three backend calls. Failures never reach the caller: they are
//! classified, rendered into one message and handed to the error callback,
//! and the call resolves to `None`.

use anyhow::{Context, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use whreplay_common::{
    constants, CapturedRequest, RegisterResult, ReplayAck, ReplayRequest,
};

/// Receives one human readable message per failed call
pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Why a backend call failed
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Server returned status {status}: {status_text} with data {data}")]
    Status {
        status: u16,
        status_text: String,
        data: String,
    },

    #[error("The request was made but no response was received")]
    NoResponse,

    #[error("Unable to set up request: {0}")]
    Setup(String),

    #[error("Unable to read response: {0}")]
    Decode(String),
}

impl ApiError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Setup(err.to_string())
        } else {
            ApiError::NoResponse
        }
    }
}

/// Full notifier text for a failed call to `path`
pub fn error_message(path: &str, err: &ApiError) -> String {
    format!("Error: Request to {} failed. {}", path, err)
}

/// Client for the replay backend
#[derive(Clone)]
pub struct ReplayClient {
    base_url: String,
    client: Client,
    jar: Arc<Jar>,
    on_error: ErrorCallback,
}

impl ReplayClient {
    /// Create a client, seeding the cookie jar with a known identity
    pub fn new(base_url: &str, ident: Option<&str>, on_error: ErrorCallback) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let jar = Arc::new(Jar::default());

        if let Some(ident) = ident {
            match Url::parse(&base_url) {
                // Same path the backend's Set-Cookie defaults to, so a later
                // registration replaces this cookie instead of shadowing it
                Ok(url) => {
                    let cookie = format!("{}={}; Path={}", constants::IDENT_COOKIE, ident, url.path());
                    jar.add_cookie_str(&cookie, &url);
                }
                Err(e) => tracing::warn!("Not seeding identity cookie for {}: {}", base_url, e),
            }
        }

        let client = Client::builder()
            .timeout(constants::REQUEST_TIMEOUT)
            .cookie_provider(jar.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            client,
            jar,
            on_error,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new identity; the backend sets the `ident` cookie
    pub async fn register(&self) -> Option<RegisterResult> {
        let path = "/register";
        let request = self.client.post(self.url(path));
        self.checked_json(path, request).await
    }

    /// Fetch all captured requests with their replays
    pub async fn list_requests(&self) -> Option<Vec<CapturedRequest>> {
        let path = "/requests";
        let request = self.client.get(self.url(path));
        self.checked_json(path, request).await
    }

    /// Ask the backend to replay a captured request to `destination`
    pub async fn send_replay(&self, request_id: i64, destination: &str) -> Option<ReplayAck> {
        let path = "/replay";
        let payload = ReplayRequest {
            request_id,
            endpoint: destination.to_string(),
        };
        let request = self.client.post(self.url(path)).json(&payload);
        self.checked_json(path, request).await
    }

    /// Current value of the identity cookie, if one is set
    pub fn ident(&self) -> Option<String> {
        let url = Url::parse(&self.url("/requests")).ok()?;
        let header = self.jar.cookies(&url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, constants::IDENT_COOKIE).map(str::to_string)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn checked_json<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Option<T> {
        tracing::debug!("Requesting {}{}", self.base_url, path);

        match Self::send_json(request).await {
            Ok(value) => Some(value),
            Err(err) => {
                let message = error_message(path, &err);
                tracing::warn!("{}", message);
                (self.on_error)(message);
                None
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(ApiError::from_send)?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                data: render_data(text),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Compact JSON for JSON bodies, a quoted string otherwise
fn render_data(text: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => value.to_string(),
        Err(_) => serde_json::Value::String(text).to_string(),
    }
}

/// Value of cookie `name` in a `Cookie` header string
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
