//! HTTP API for watcher control, on-demand lookups and Prometheus metrics.

use crate::types::{CommandResponse, ErrorResponse, PriceRequest, PriceResponse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pricewatch::{FetchError, PriceFetcher, PriceWatcher, WatchMetrics, WatcherStatus};
use prometheus_client::encoding::text::encode;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub watcher: Arc<PriceWatcher>,
    /// Fetcher for on-demand lookups, separate from the watcher's session
    pub lookup: Arc<dyn PriceFetcher>,
    pub metrics: Arc<WatchMetrics>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/watcher/start", post(start_handler))
        .route("/api/watcher/stop", post(stop_handler))
        .route("/api/watcher/status", get(status_handler))
        .route("/api/price", post(price_handler))
        .route("/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// HTTP server for the pricewatch API
pub struct ApiServer {
    state: AppState,
    listen_addr: String,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState, listen_addr: String) -> Self {
        Self { state, listen_addr }
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(listen_addr = %self.listen_addr, "Starting API server");

        let app = router(self.state);
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

async fn start_handler(State(state): State<AppState>) -> Response {
    match state.watcher.start() {
        Ok(()) => Json(CommandResponse::ok("Watcher started successfully")).into_response(),
        Err(e) => (StatusCode::CONFLICT, Json(CommandResponse::rejected(e.to_string())))
            .into_response(),
    }
}

async fn stop_handler(State(state): State<AppState>) -> Response {
    match state.watcher.stop() {
        Ok(()) => Json(CommandResponse::ok("Watcher stopped successfully")).into_response(),
        Err(e) => (StatusCode::CONFLICT, Json(CommandResponse::rejected(e.to_string())))
            .into_response(),
    }
}

async fn status_handler(State(state): State<AppState>) -> Json<WatcherStatus> {
    Json(state.watcher.status())
}

async fn price_handler(
    State(state): State<AppState>,
    Json(request): Json<PriceRequest>,
) -> Response {
    let url = request.url.trim();
    if url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing URL".to_string(),
                category: None,
            }),
        )
            .into_response();
    }

    match state.lookup.fetch(url).await {
        Ok(observation) => Json(PriceResponse {
            price: observation.price,
            name: observation.name,
        })
        .into_response(),
        Err(e) => {
            warn!(url = %url, error = %e, "Price lookup failed");
            (
                lookup_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                    category: Some(e.category().to_string()),
                }),
            )
                .into_response()
        }
    }
}

fn lookup_status(error: &FetchError) -> StatusCode {
    match error {
        FetchError::PriceNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FetchError::Network(_) | FetchError::CaptchaBlocked => StatusCode::BAD_GATEWAY,
    }
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut buffer = String::new();
    if let Err(e) = encode(&mut buffer, &state.metrics.registry) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}
