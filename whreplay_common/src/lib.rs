//! Webhook Replay Common - Shared data model for the replay client
//!
//! This crate contains the wire types returned by the replay backend along
//! with the pure helpers the client uses to display them.

mod body;
mod stats;

pub use body::{format_body, FormattedBody};
pub use stats::ReplayStats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Destination validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("You must configure your replay URL before you can send a replay")]
    MissingDestination,

    #[error("Replay URL must start with http:// or https://")]
    MissingScheme,

    #[error("Replay URL must be at least {} characters long", constants::MIN_DESTINATION_LEN)]
    TooShort,
}

/// A single header as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An inbound request recorded against the user's custom URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub id: i64,

    /// HTTP method
    pub meth: String,

    /// Request path (including the custom URL prefix)
    pub loc: String,

    /// Arrival time
    pub time: DateTime<Utc>,

    #[serde(default)]
    pub body: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: Vec<Header>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub replays: Vec<Replay>,
}

impl CapturedRequest {
    /// Statistics over this request's replays
    pub fn stats(&self) -> ReplayStats {
        ReplayStats::from_replays(&self.replays)
    }

    /// Latest replay by id, if any
    pub fn latest_replay(&self) -> Option<&Replay> {
        self.replays.iter().max_by_key(|r| r.id)
    }
}

/// A recorded attempt to resend a captured request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    pub id: i64,
    pub req_id: i64,

    /// Destination the request was replayed to
    pub loc: String,

    pub resp_code: Option<u16>,

    pub resp_body: Option<String>,

    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub resp_headers: Vec<Header>,

    /// Set when the attempt failed (transport or application level)
    pub err_str: Option<String>,
}

impl Replay {
    pub fn is_error(&self) -> bool {
        self.err_str.is_some()
    }

    /// Response time in whole milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.end_at - self.start_at).num_milliseconds()
    }

    /// True for a non-errored replay with a 2xx response
    pub fn is_good_status(&self) -> bool {
        !self.is_error() && matches!(self.resp_code, Some(code) if (200..=299).contains(&code))
    }

    /// Short label for the status chip
    pub fn status_label(&self) -> String {
        match (self.is_error(), self.resp_code) {
            (true, _) => "ERROR".to_string(),
            (false, Some(code)) => code.to_string(),
            (false, None) => "-".to_string(),
        }
    }

    /// Title and text of the body section: the error for failed replays,
    /// otherwise the response body
    pub fn display_body(&self) -> (&'static str, &str) {
        match &self.err_str {
            Some(err) => ("Error:", err.as_str()),
            None => ("Response Body:", self.resp_body.as_deref().unwrap_or_default()),
        }
    }
}

/// Body of `POST /replay`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRequest {
    pub request_id: i64,
    pub endpoint: String,
}

/// Response of `POST /replay`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayAck {
    pub replay_id: i64,
}

/// Response of `POST /register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResult {
    pub ident: String,
}

/// Error body returned by the backend on 4xx/5xx
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// Why a replay destination can or cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationState {
    Missing,
    MissingScheme,
    TooShort,
    Ready,
}

impl DestinationState {
    pub fn of(destination: &str) -> Self {
        let has_scheme =
            destination.starts_with("http://") || destination.starts_with("https://");

        if destination.is_empty() {
            DestinationState::Missing
        } else if !has_scheme {
            DestinationState::MissingScheme
        } else if destination.len() < constants::MIN_DESTINATION_LEN {
            DestinationState::TooShort
        } else {
            DestinationState::Ready
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DestinationState::Ready)
    }

    pub fn check(&self) -> Result<(), ValidationError> {
        match self {
            DestinationState::Missing => Err(ValidationError::MissingDestination),
            DestinationState::MissingScheme => Err(ValidationError::MissingScheme),
            DestinationState::TooShort => Err(ValidationError::TooShort),
            DestinationState::Ready => Ok(()),
        }
    }
}

/// Whether the send-replay action is enabled for this destination
pub fn is_sendable_destination(destination: &str) -> bool {
    DestinationState::of(destination).is_ready()
}

/// The URL captured requests should be sent to
pub fn custom_url(base_url: &str, ident: &str) -> String {
    format!("{}/create/{}/", base_url.trim_end_matches('/'), ident)
}

/// The backend encodes empty lists as `null`
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Client constants
pub mod constants {
    use std::time::Duration;

    /// Name of the identity cookie set by `/register`
    pub const IDENT_COOKIE: &str = "ident";

    /// Period of the request list refresh
    pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

    /// Inactivity window after which polling pauses
    pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

    /// Per-call HTTP timeout
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(6);

    /// Shortest destination accepted, longer than a bare `http://`
    pub const MIN_DESTINATION_LEN: usize = 8;

    /// Backend address used when nothing is configured
    pub const DEV_SERVER_URL: &str = "http://localhost:5000";
}
