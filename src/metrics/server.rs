//! Live HTTP exporter for an encode session.
//!
//! Routes:
//! - `/metrics`: Prometheus text format
//! - `/status`: one `key = value` line per field of the latest snapshot
//! - `/health`: liveness check

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors from the exporter.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind metrics endpoint: {0}")]
    Bind(#[from] std::io::Error),

    #[error("metrics endpoint failed: {0}")]
    Serve(String),
}

/// Where the exporter listens.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Listen address; loopback unless overridden.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Listens on loopback at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], port).into(),
        }
    }
}

/// Registry plus the most recent snapshot pushed by the encoder.
pub struct MetricsState {
    registry: MetricsRegistry,
    latest: MetricsSnapshot,
}

impl MetricsState {
    /// Records a snapshot in the registry and keeps it for `/status`.
    pub fn update(&mut self, snapshot: &MetricsSnapshot) {
        self.registry.update(snapshot);
        self.latest = snapshot.clone();
    }

    /// Returns the last snapshot pushed.
    pub fn latest(&self) -> &MetricsSnapshot {
        &self.latest
    }

    fn status_text(&self) -> String {
        let s = &self.latest;
        let mut out = format!(
            "frames = {}\nkey_bytes = {}\nrle_bytes = {}\ncomplete = {}\ncompression_ratio = {:.3}\naccumulator_mean = {:.3}\n",
            s.frames, s.key_bytes, s.rle_bytes, s.complete, s.compression_ratio, s.accumulator_mean
        );
        if let Some(ratio) = s.ones_ratio {
            out.push_str(&format!("ones_ratio = {:.4}\n", ratio));
        }
        if let Some(psnr) = s.psnr.filter(|p| p.is_finite()) {
            out.push_str(&format!("psnr_db = {:.2}\n", psnr));
        }
        out
    }
}

type SharedState = Arc<RwLock<MetricsState>>;

/// Serves live session metrics over HTTP.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: SharedState,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState {
                registry,
                latest: MetricsSnapshot::default(),
            })),
        }
    }

    /// Handle the encoder uses to push snapshots.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/status", get(status_handler))
            .route("/health", get(|| async { (StatusCode::OK, "OK") }))
            .layer(CorsLayer::permissive())
            .with_state(self.state())
    }

    /// Serves until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Serving live metrics");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::debug!("Metrics endpoint stopped");
        Ok(())
    }
}

async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    match state.read().await.registry.encode() {
        Ok(body) => (StatusCode::OK, [("content-type", PROMETHEUS_CONTENT_TYPE)], body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string(),
        ),
    }
}

async fn status_handler(State(state): State<SharedState>) -> String {
    state.read().await.status_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> MetricsServer {
        MetricsServer::new(MetricsServerConfig::default(), MetricsRegistry::new().unwrap())
    }

    #[test]
    fn test_binds_loopback() {
        let config = MetricsServerConfig::with_port(8080);
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(MetricsServerConfig::default().bind_addr.port(), 9090);
    }

    #[tokio::test]
    async fn test_update_reaches_registry_and_status() {
        let server = server();
        server.state().write().await.update(&MetricsSnapshot {
            frames: 7,
            complete: true,
            psnr: Some(f64::INFINITY),
            ..Default::default()
        });

        let state = server.state();
        let state = state.read().await;
        assert_eq!(state.latest().frames, 7);
        assert!(state.registry.encode().unwrap().contains("akc_frames_encoded_total 7"));

        let status = state.status_text();
        assert!(status.contains("frames = 7\n"));
        assert!(status.contains("complete = true\n"));
        assert!(!status.contains("psnr_db"));
    }
}
