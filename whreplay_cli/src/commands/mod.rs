//! One-shot subcommands

pub mod identity;
pub mod replay;
pub mod requests;

use crate::api::{ErrorCallback, ReplayClient};
use crate::config::Config;
use crate::session::{self, Bootstrap};
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

/// Backend client that keeps the last failure for the command to report
pub(crate) struct Backend {
    pub client: ReplayClient,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Backend {
    pub fn connect(config: &Config) -> Result<Self> {
        let last_error = Arc::new(Mutex::new(None));
        let slot = last_error.clone();
        let on_error: ErrorCallback = Arc::new(move |message| {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(message);
            }
        });

        let client = ReplayClient::new(config.base_url(), config.ident(), on_error)?;
        Ok(Self { client, last_error })
    }

    /// The failure reported for the last call that resolved to `None`
    pub fn failure(&self) -> anyhow::Error {
        let message = self
            .last_error
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or_else(|| "Request failed".to_string());
        anyhow!(message)
    }

    /// Identity for this backend, registering and saving one if needed
    pub async fn ensure_identity(&self, config: &mut Config) -> Result<String> {
        let outcome = session::ensure_identity(&self.client).await;
        let Some(ident) = outcome.ident().map(str::to_string) else {
            return Err(self.failure());
        };

        if let Bootstrap::Registered(_) = outcome {
            cliclack::log::info(format!("Registered as {}", ident))?;
        }
        if config.set_ident(ident.clone()) {
            config.save()?;
        }
        Ok(ident)
    }

    /// Save the identity cookie if a call made the backend reissue it
    pub fn sync_identity(&self, config: &mut Config) -> Result<()> {
        if self.adopt_identity(config) {
            config.save()?;
        }
        Ok(())
    }

    fn adopt_identity(&self, config: &mut Config) -> bool {
        match self.client.ident() {
            Some(ident) if config.set_ident(ident.clone()) => {
                tracing::info!("Backend reissued identity {}", ident);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::routing::get;
    use axum::Router;

    fn config_for(server: String, ident: &str) -> Config {
        let mut config = Config::default().with_server(Some(server));
        config.set_ident(ident.to_string());
        config
    }

    #[tokio::test]
    async fn test_failure_carries_reported_message() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = config_for(format!("http://{}", addr), "abc");
        let backend = Backend::connect(&config).unwrap();
        assert!(backend.client.list_requests().await.is_none());

        assert_eq!(
            backend.failure().to_string(),
            "Error: Request to /requests failed. The request was made but no response was received"
        );
        // Taken once
        assert_eq!(backend.failure().to_string(), "Request failed");
    }

    #[tokio::test]
    async fn test_reissued_identity_is_adopted() {
        let app = Router::new().route(
            "/requests",
            get(|| async { ([(header::SET_COOKIE, "ident=reissued")], "[]") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let mut config = config_for(format!("http://{}", addr), "stale");
        let backend = Backend::connect(&config).unwrap();
        assert!(!backend.adopt_identity(&mut config));

        assert_eq!(backend.client.list_requests().await, Some(Vec::new()));
        assert!(backend.adopt_identity(&mut config));
        assert_eq!(config.ident(), Some("reissued"));
        assert_eq!(
            config.custom_url(),
            Some(format!("http://{}/create/reissued/", addr))
        );
        assert!(!backend.adopt_identity(&mut config));
    }
}
