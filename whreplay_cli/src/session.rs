//! Client session state and identity bootstrap

use crate::api::ReplayClient;
use crate::idle::Activity;
use whreplay_common::{is_sendable_destination, CapturedRequest};

/// Outcome of making sure we have an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Identity cookie was already present
    Existing(String),
    /// A new identity was issued by `/register`
    Registered(String),
    /// Registration failed; the error callback has been told why
    Unavailable,
}

impl Bootstrap {
    pub fn ident(&self) -> Option<&str> {
        match self {
            Bootstrap::Existing(ident) | Bootstrap::Registered(ident) => Some(ident),
            Bootstrap::Unavailable => None,
        }
    }
}

/// Adopt the identity cookie if present, otherwise register for one
pub async fn ensure_identity(client: &ReplayClient) -> Bootstrap {
    match client.ident() {
        Some(ident) => {
            tracing::debug!("Not registering, ident exists");
            Bootstrap::Existing(ident)
        }
        None => {
            tracing::info!("Registering...");
            register(client).await
        }
    }
}

/// Register a fresh identity and re-read the cookie the backend set
pub async fn register(client: &ReplayClient) -> Bootstrap {
    match client.register().await {
        Some(result) => {
            let ident = client.ident().unwrap_or(result.ident);
            tracing::info!("Registered as {}", ident);
            Bootstrap::Registered(ident)
        }
        None => Bootstrap::Unavailable,
    }
}

/// Everything the views render from, owned by the event loop.
///
/// Updates consume the state and return the next one.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    requests: Option<Vec<CapturedRequest>>,
    selected: Option<i64>,
    ident: Option<String>,
    destination: String,
    activity: Activity,
}

impl ViewState {
    pub fn new(ident: Option<String>, destination: String) -> Self {
        Self {
            ident,
            destination,
            ..Self::default()
        }
    }

    /// Apply a fetched list. A selection that no longer exists is dropped,
    /// and with nothing selected the first request is picked.
    pub fn with_requests(mut self, requests: Vec<CapturedRequest>) -> Self {
        let still_present = self
            .selected
            .filter(|id| requests.iter().any(|r| r.id == *id));
        self.selected = still_present.or_else(|| requests.first().map(|r| r.id));
        self.requests = Some(requests);
        self
    }

    /// Select a request by id; ids not in the list are ignored
    pub fn select(mut self, id: i64) -> Self {
        if self.requests().iter().any(|r| r.id == id) {
            self.selected = Some(id);
        }
        self
    }

    pub fn select_next(self) -> Self {
        self.select_offset(1)
    }

    pub fn select_prev(self) -> Self {
        self.select_offset(-1)
    }

    fn select_offset(self, delta: isize) -> Self {
        let len = self.requests().len();
        if len == 0 {
            return self;
        }
        let target = match self.selected_index() {
            Some(idx) => idx.saturating_add_signed(delta).min(len - 1),
            None => 0,
        };
        let id = self.requests()[target].id;
        self.select(id)
    }

    pub fn cleared_selection(mut self) -> Self {
        self.selected = None;
        self
    }

    pub fn with_ident(mut self, ident: String) -> Self {
        self.ident = Some(ident);
        self
    }

    pub fn with_destination(mut self, destination: String) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = activity;
        self
    }

    /// Whether a list has been fetched yet
    pub fn is_loaded(&self) -> bool {
        self.requests.is_some()
    }

    /// Last fetched list, empty before the first fetch
    pub fn requests(&self) -> &[CapturedRequest] {
        self.requests.as_deref().unwrap_or_default()
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.selected
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected?;
        self.requests().iter().position(|r| r.id == id)
    }

    /// The selected request, if it is in the last fetched list
    pub fn current(&self) -> Option<&CapturedRequest> {
        let id = self.selected?;
        self.requests().iter().find(|r| r.id == id)
    }

    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Send-replay is enabled
    pub fn can_send(&self) -> bool {
        self.current().is_some() && is_sendable_destination(&self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorCallback;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn req(id: i64) -> CapturedRequest {
        CapturedRequest {
            id,
            meth: "POST".to_string(),
            loc: format!("/create/abc/{}", id),
            time: Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap(),
            body: String::new(),
            headers: Vec::new(),
            replays: Vec::new(),
        }
    }

    #[test]
    fn test_first_request_selected_when_none() {
        let state = ViewState::default();
        assert!(!state.is_loaded());
        assert!(state.current().is_none());

        let state = state.with_requests(vec![req(3), req(2), req(1)]);
        assert!(state.is_loaded());
        assert_eq!(state.selected_id(), Some(3));
    }

    #[test]
    fn test_empty_list_keeps_nothing_selected() {
        let state = ViewState::default().with_requests(Vec::new());
        assert!(state.is_loaded());
        assert_eq!(state.selected_id(), None);
    }

    #[test]
    fn test_selection_survives_refresh() {
        let state = ViewState::default()
            .with_requests(vec![req(3), req(2)])
            .select(2)
            .with_requests(vec![req(4), req(3), req(2)]);
        assert_eq!(state.selected_id(), Some(2));
        assert_eq!(state.selected_index(), Some(2));
    }

    #[test]
    fn test_vanished_selection_falls_back() {
        let state = ViewState::default()
            .with_requests(vec![req(3), req(2)])
            .select(2)
            .with_requests(vec![req(5)]);
        assert_eq!(state.selected_id(), Some(5));

        let state = state.with_requests(Vec::new());
        assert_eq!(state.selected_id(), None);
        assert!(state.current().is_none());
    }

    #[test]
    fn test_select_ignores_unknown_ids() {
        let state = ViewState::default().with_requests(vec![req(1)]).select(99);
        assert_eq!(state.selected_id(), Some(1));
    }

    #[test]
    fn test_navigation_clamps() {
        let state = ViewState::default().with_requests(vec![req(3), req(2), req(1)]);
        let state = state.select_prev();
        assert_eq!(state.selected_id(), Some(3));

        let state = state.select_next().select_next().select_next();
        assert_eq!(state.selected_id(), Some(1));

        let state = state.cleared_selection().select_next();
        assert_eq!(state.selected_id(), Some(3));
    }

    #[test]
    fn test_can_send_needs_selection_and_destination() {
        let state = ViewState::new(Some("abc".into()), "https://example.org".into());
        assert!(!state.can_send());

        let state = state.with_requests(vec![req(1)]);
        assert!(state.can_send());

        let state = state.with_destination("example.org".into());
        assert!(!state.can_send());
    }

    #[tokio::test]
    async fn test_ensure_identity_adopts_existing_cookie() {
        let on_error: ErrorCallback = Arc::new(|_| panic!("no call expected"));
        // Nothing listens here; an existing ident means no request is made
        let client = ReplayClient::new("http://127.0.0.1:9", Some("kept"), on_error).unwrap();

        assert_eq!(
            ensure_identity(&client).await,
            Bootstrap::Existing("kept".to_string())
        );
    }

    #[tokio::test]
    async fn test_ensure_identity_registration_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let errors = Arc::new(std::sync::Mutex::new(0));
        let counter = errors.clone();
        let on_error: ErrorCallback = Arc::new(move |_| *counter.lock().unwrap() += 1);
        let client = ReplayClient::new(&format!("http://{}", addr), None, on_error).unwrap();

        let outcome = ensure_identity(&client).await;
        assert_eq!(outcome, Bootstrap::Unavailable);
        assert_eq!(outcome.ident(), None);
        assert_eq!(*errors.lock().unwrap(), 1);
    }
}
