//! HTTP viewer: a static acknowledgement plus the last data-fetched event
//! seen on the pipeline's subscription point.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Local;
use lagline_pipeline::PollerEvent;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const ACKNOWLEDGEMENT: &str = "Eventual consistency example";

/// Last event observed by the viewer.
#[derive(Clone, Default)]
pub struct ViewerState {
    latest: Arc<RwLock<Option<PollerEvent>>>,
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, event: PollerEvent) {
        *self.latest.write().await = Some(event);
    }

    pub async fn latest(&self) -> Option<PollerEvent> {
        self.latest.read().await.clone()
    }

    /// Log and keep every data-fetched event until the stream closes.
    pub fn spawn_listener(&self, mut rx: broadcast::Receiver<PollerEvent>) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        info!(
                            tick = event.tick(),
                            generation = event.snapshot().generation(),
                            records = event.snapshot().len(),
                            at = %Local::now().format("%H:%M:%S"),
                            "final data received"
                        );
                        state.record(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "viewer fell behind data-fetched events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

pub fn router(state: ViewerState) -> Router {
    Router::new()
        .route("/", get(acknowledge))
        .route("/latest", get(latest))
        .with_state(state)
}

async fn acknowledge() -> &'static str {
    ACKNOWLEDGEMENT
}

async fn latest(State(state): State<ViewerState>) -> Response {
    match state.latest().await {
        Some(event) => Json(event).into_response(),
        None => (StatusCode::NOT_FOUND, "no data fetched yet").into_response(),
    }
}

/// Serve the viewer until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: ViewerState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "viewer listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use lagline_pipeline::Snapshot;
    use tower::ServiceExt;

    fn fetched(tick: u64) -> PollerEvent {
        PollerEvent::DataFetched {
            tick,
            fetched_at_ms: 1_700_000_000_000,
            snapshot: Snapshot::from_records(tick, [("a", 100), ("b", 200)]),
        }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_root_returns_acknowledgement() {
        let (status, body) = get(router(ViewerState::new()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, ACKNOWLEDGEMENT.as_bytes());
    }

    #[tokio::test]
    async fn test_latest_is_not_found_before_first_poll() {
        let (status, _) = get(router(ViewerState::new()), "/latest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_latest_returns_recorded_event() {
        let state = ViewerState::new();
        state.record(fetched(3)).await;

        let (status, body) = get(router(state), "/latest").await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["event"], "data_fetched");
        assert_eq!(json["tick"], 3);
        assert_eq!(json["snapshot"]["records"]["b"], 200);
    }

    #[tokio::test]
    async fn test_listener_keeps_last_event() {
        let state = ViewerState::new();
        let (tx, rx) = broadcast::channel(8);
        let listener = state.spawn_listener(rx);

        tx.send(fetched(1)).unwrap();
        tx.send(fetched(2)).unwrap();
        drop(tx);
        listener.await.unwrap();

        assert_eq!(state.latest().await.map(|e| e.tick()), Some(2));
    }
}
