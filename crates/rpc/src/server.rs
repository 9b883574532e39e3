use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use oui_registry::{RefreshCoordinator, RefreshReport, RegistryStatus};
use oui_resolution::{ResolutionEngine, ResolverKind};
use oui_types::{now_millis, LookupResult};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ResolutionEngine>,
    pub refresher: RefreshCoordinator,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(engine: Arc<ResolutionEngine>, refresher: RefreshCoordinator) -> Self {
        Self {
            engine,
            refresher,
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn registry_status(&self) -> RegistryStatus {
        self.refresher
            .store()
            .status(now_millis(), self.refresher.refresh_interval())
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    req_total: u64,
    resolvers: Vec<ResolverKind>,
    registry_entries: usize,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    registry: RegistryStatus,
    refreshing: bool,
    refresh_interval_secs: u64,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    success: bool,
    report: RefreshReport,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_gateway<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            success: false,
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("RPC server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("RPC server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/lookup/:address", get(handle_lookup))
        .route("/registry/status", get(handle_registry_status))
        .route("/registry/refresh", post(handle_registry_refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_seconds(),
        req_total,
        resolvers: state.engine.order(),
        registry_entries: state.refresher.store().get().len(),
    })
}

async fn handle_lookup(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> (StatusCode, Json<LookupResult>) {
    state.record_request();
    let result = state.engine.resolve(&address).await;
    let status = match &result {
        LookupResult::Found { .. } => StatusCode::OK,
        LookupResult::NotFound { .. } => StatusCode::NOT_FOUND,
        LookupResult::Invalid { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(result))
}

async fn handle_registry_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    state.record_request();
    Json(StatusResponse {
        registry: state.registry_status(),
        refreshing: state.refresher.is_refreshing(),
        refresh_interval_secs: state.refresher.refresh_interval().as_secs(),
    })
}

async fn handle_registry_refresh(
    State(state): State<SharedState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    state.record_request();
    match state.refresher.refresh_now().await {
        Ok(report) => Ok(Json(RefreshResponse {
            success: true,
            report,
        })),
        Err(err) => {
            warn!("Registry refresh requested over RPC failed: {}", err);
            let inner = err.inner();
            if inner.is_transport_failure() || inner.is_parse_failure() {
                Err(ApiError::bad_gateway(err.to_string()))
            } else {
                Err(ApiError::internal(err.to_string()))
            }
        }
    }
}
