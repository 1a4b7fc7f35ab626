//! Replay command - resend a captured request to a destination

use super::requests::print_replay;
use super::Backend;
use crate::config::Config;
use anyhow::{anyhow, Result};
use console::style;
use whreplay_common::{CapturedRequest, DestinationState, Replay};

/// Replay request `id` to `destination`, or to the saved replay URL
pub async fn run(mut config: Config, id: i64, destination: Option<String>) -> Result<()> {
    use cliclack::{intro, outro};

    let destination = destination
        .or_else(|| config.replay_url.clone())
        .unwrap_or_default();
    DestinationState::of(&destination).check()?;

    intro(style(" whreplay replay ").on_cyan().black().to_string())?;

    let backend = Backend::connect(&config)?;
    backend.ensure_identity(&mut config).await?;

    let spinner = cliclack::spinner();
    spinner.start(format!("Replaying request {} to {}...", id, destination));
    let Some(ack) = backend.client.send_replay(id, &destination).await else {
        spinner.error("Replay failed");
        return Err(backend.failure());
    };

    // Always refresh, the replay is recorded by the backend
    let requests = backend.client.list_requests().await;
    spinner.stop("Replay completed");

    if config.replay_url.as_deref() != Some(destination.as_str()) {
        config.replay_url = Some(destination);
        config.save()?;
    }
    backend.sync_identity(&mut config)?;

    let requests = requests.ok_or_else(|| backend.failure())?;
    let (req, replay) = find_replay(&requests, id, ack.replay_id)
        .ok_or_else(|| anyhow!("Replay {} not found for request {}", ack.replay_id, id))?;

    println!();
    print_replay(req, replay);
    println!();

    outro(format!("Replay {} recorded", ack.replay_id))?;
    Ok(())
}

/// The acknowledged replay, or the newest one if the list lags behind
fn find_replay(requests: &[CapturedRequest], request_id: i64, replay_id: i64) -> Option<(&CapturedRequest, &Replay)> {
    let req = requests.iter().find(|r| r.id == request_id)?;
    let replay = req
        .replays
        .iter()
        .find(|r| r.id == replay_id)
        .or_else(|| req.latest_replay())?;
    Some((req, replay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};
    use whreplay_common::{ReplayAck, ReplayRequest};

    fn config_for(server: &str) -> Config {
        let mut config = Config::default().with_server(Some(server.to_string()));
        config.set_ident("abc".to_string());
        config
    }

    fn replay(id: i64) -> Replay {
        let at = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        Replay {
            id,
            req_id: 1,
            loc: "https://example.org/in".to_string(),
            resp_code: Some(200),
            resp_body: Some("ok".to_string()),
            start_at: at,
            end_at: at,
            resp_headers: Vec::new(),
            err_str: None,
        }
    }

    #[test]
    fn test_find_replay() {
        let requests = vec![CapturedRequest {
            id: 1,
            meth: "POST".to_string(),
            loc: "/create/abc/".to_string(),
            time: Utc.with_ymd_and_hms(2020, 5, 1, 11, 0, 0).unwrap(),
            body: String::new(),
            headers: Vec::new(),
            replays: vec![replay(4), replay(9), replay(6)],
        }];

        assert_eq!(find_replay(&requests, 1, 6).map(|(_, r)| r.id), Some(6));
        // Unknown replay id falls back to the newest
        assert_eq!(find_replay(&requests, 1, 99).map(|(_, r)| r.id), Some(9));
        assert!(find_replay(&requests, 2, 6).is_none());
    }

    #[tokio::test]
    async fn test_invalid_destination_rejected_before_any_request() {
        let config = config_for("http://127.0.0.1:9");

        let err = run(config.clone(), 1, Some("example.org".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("http"));

        let err = run(config, 1, None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must configure your replay URL before you can send a replay"
        );
    }

    /// Backend that records every replay against request 1
    #[derive(Clone, Default)]
    struct Recorded {
        replays: Arc<Mutex<Vec<Replay>>>,
    }

    async fn record_replay(
        State(store): State<Recorded>,
        Json(req): Json<ReplayRequest>,
    ) -> Json<ReplayAck> {
        let mut replays = store.replays.lock().unwrap();
        let replay_id = replays.len() as i64 + 100;
        replays.push(Replay {
            req_id: req.request_id,
            loc: req.endpoint,
            ..replay(replay_id)
        });
        Json(ReplayAck { replay_id })
    }

    async fn recorded_requests(State(store): State<Recorded>) -> Json<Vec<CapturedRequest>> {
        let replays = store.replays.lock().unwrap().clone();
        Json(vec![CapturedRequest {
            id: 1,
            meth: "POST".to_string(),
            loc: "/create/abc/".to_string(),
            time: Utc.with_ymd_and_hms(2020, 5, 1, 11, 0, 0).unwrap(),
            body: "{}".to_string(),
            headers: Vec::new(),
            replays,
        }])
    }

    #[tokio::test]
    async fn test_refresh_after_replay_shows_new_replay() {
        let app = Router::new()
            .route("/replay", post(record_replay))
            .route("/requests", get(recorded_requests))
            .with_state(Recorded::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let config = config_for(&format!("http://{}", addr));
        let backend = Backend::connect(&config).unwrap();

        for (n, destination) in ["https://example.org/in", "https://example.org/other"]
            .into_iter()
            .enumerate()
        {
            let ack = backend.client.send_replay(1, destination).await.unwrap();
            let requests = backend.client.list_requests().await.unwrap();

            let (req, replay) = find_replay(&requests, 1, ack.replay_id).unwrap();
            assert_eq!(replay.id, ack.replay_id);
            assert_eq!(replay.loc, destination);
            assert_eq!(req.stats().attempted, n + 1);
            assert_eq!(req.latest_replay().map(|r| r.id), Some(ack.replay_id));
        }
    }
}
