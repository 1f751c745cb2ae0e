//! HTTP query surface and the background poll loop.
//!
//! - GET /          banner
//! - GET /forecast  live forecast with an abbreviated analysis
//! - GET /history   newest resolved forecasts with accuracy stats
//! - GET /analysis  full latest analysis bundle
//! - GET /raw       newest outcomes, `?limit=N`
//! - GET /health    liveness

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::data::HistoryFeed;
use crate::engine::{AnalysisView, CycleOutcome, Engine, ForecastView, HistoryView, RawView};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub feed_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            feed_url: String::new(),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Shared server state. The poll task is the only writer.
pub struct AppState {
    pub engine: RwLock<Engine>,
    pub started: Instant,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: RwLock::new(engine),
            started: Instant::now(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Http(_) | Error::Status(_) | Error::Malformed(_) | Error::EmptySnapshot => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub rounds: usize,
    pub forecast_ready: bool,
    pub uptime_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawParams {
    pub limit: Option<usize>,
}

async fn root_handler() -> &'static str {
    "roundsight: next-round multiplier forecasts (see /forecast, /history, /analysis, /raw)"
}

async fn forecast_handler(State(state): State<Arc<AppState>>) -> Result<Json<ForecastView>> {
    let engine = state.engine.read().await;
    ForecastView::build(&engine).map(Json)
}

async fn history_handler(State(state): State<Arc<AppState>>) -> Json<HistoryView> {
    let engine = state.engine.read().await;
    Json(HistoryView::build(&engine))
}

async fn analysis_handler(State(state): State<Arc<AppState>>) -> Result<Json<AnalysisView>> {
    let engine = state.engine.read().await;
    AnalysisView::build(&engine).map(Json)
}

async fn raw_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RawParams>,
) -> Json<RawView> {
    let engine = state.engine.read().await;
    Json(RawView::build(&engine, params.limit))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = state.engine.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        rounds: engine.history().len(),
        forecast_ready: engine.current_forecast().is_some(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/forecast", get(forecast_handler))
        .route("/history", get(history_handler))
        .route("/analysis", get(analysis_handler))
        .route("/raw", get(raw_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// One refresh cycle. The fetch happens outside the lock; the engine is
/// only write-locked for the synchronous ingest.
pub async fn poll_once<F: HistoryFeed>(state: &AppState, feed: &F) -> Result<CycleOutcome> {
    let snapshot = feed.fetch().await?;
    let mut engine = state.engine.write().await;
    engine.ingest(&snapshot)
}

/// Drive refresh cycles on a fixed interval. Ticks missed while a cycle is
/// still running are skipped, so cycles never overlap.
pub fn spawn_poller<F>(state: Arc<AppState>, feed: F, interval: Duration) -> JoinHandle<()>
where
    F: HistoryFeed + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match poll_once(&state, &feed).await {
                Ok(CycleOutcome::Unchanged) => debug!("poll: no new rounds"),
                Ok(CycleOutcome::Forecasted { .. }) => {}
                Err(e) => warn!(error = %e, "refresh cycle aborted"),
            }
        }
    })
}

/// Start the poller and serve the query API until the process exits.
pub async fn run_server<F>(config: ServerConfig, engine: Engine, feed: F) -> Result<()>
where
    F: HistoryFeed + Send + Sync + 'static,
{
    let state = Arc::new(AppState::new(engine));
    let poller = spawn_poller(state.clone(), feed, config.poll_interval);
    let app = router(state);

    info!(bind = %config.bind, feed = %config.feed_url, "starting server");
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let served = axum::serve(listener, app).await;
    poller.abort();
    served?;
    Ok(())
}
