use crate::config::Config;
use crate::error::{ReadmeError, Result};
use crate::github::RepositoryReference;
use crate::metrics::{self, Metrics};
use crate::pipeline::{ReadmePipeline, StreamOutcome};
use crate::rate_limiter::{client_identifier, SlidingWindowLimiter};
use crate::stream::{sse_response, StreamEvent};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{CONNECTION, CONTENT_LENGTH},
        HeaderMap,
    },
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

const EVENT_BUFFER: usize = 16;

/// Request body accepted by both generation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Repository URL, e.g. `https://github.com/owner/repo`
    #[serde(rename = "repoUrl")]
    pub repo_url: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current status
    pub status: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
    /// Service uptime in seconds
    pub uptime: u64,
    /// Request counters
    pub counters: BTreeMap<String, u64>,
    /// Duration of the most recent successful generation, in milliseconds
    pub last_generation_ms: Option<u64>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ReadmePipeline>,
    limiter: Arc<SlidingWindowLimiter>,
    metrics: Metrics,
    max_request_body: usize,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Creates the state around an existing pipeline
    pub fn new(pipeline: ReadmePipeline, config: &Config) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            limiter: Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit)),
            metrics: Metrics::new(),
            max_request_body: config.max_request_body,
            started_at: Utc::now(),
        }
    }

    /// Creates the state with a GitHub- and Gemini-backed pipeline
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(ReadmePipeline::from_config(config)?, config))
    }

    /// Metrics collected by the handlers
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Builds the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/generate", post(generate))
        .route("/api/generate/stream", post(generate_stream))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Extracts and validates the repository reference from a JSON body
pub fn parse_request(body: &[u8]) -> Result<RepositoryReference> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ReadmeError::InvalidRequestBody(e.to_string()))?;

    let url = value
        .get("repoUrl")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ReadmeError::MissingRepoUrl)?;

    RepositoryReference::parse(url)
}

fn error_response(error: &ReadmeError) -> Response {
    (error.status_code(), Json(json!({ "error": error.user_message() }))).into_response()
}

async fn index() -> Json<Value> {
    Json(json!({
        "service": "readmegen",
        "version": crate::VERSION,
        "description": "Generate README documents for public GitHub repositories",
        "endpoints": {
            "health": "/health",
            "generate": "/api/generate",
            "stream": "/api/generate/stream"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0) as u64;
    Json(HealthResponse {
        service: "readmegen".to_string(),
        version: crate::VERSION.to_string(),
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime,
        counters: state.metrics.counters().await,
        last_generation_ms: state
            .metrics
            .get_timer(metrics::LAST_GENERATION)
            .await
            .map(|elapsed| elapsed.as_millis() as u64),
    })
}

/// Runs the pipeline and answers with `{ readme, repoName }`
async fn generate(State(state): State<AppState>, body: Bytes) -> Response {
    state.metrics.increment(metrics::SYNC_REQUESTS).await;

    let reference = match parse_request(&body) {
        Ok(reference) => reference,
        Err(e) => {
            warn!("Rejected generation request: {}", e);
            state.metrics.increment(metrics::REJECTED).await;
            return error_response(&e);
        }
    };

    info!("Generating README for {}", reference);
    state.metrics.increment(metrics::IN_FLIGHT).await;
    let started = Instant::now();
    let result = state.pipeline.generate(&reference).await;
    state.metrics.decrement(metrics::IN_FLIGHT).await;

    match result {
        Ok(generated) => {
            state.metrics.increment(metrics::GENERATED).await;
            state
                .metrics
                .record_time(metrics::LAST_GENERATION, started.elapsed())
                .await;
            Json(generated).into_response()
        }
        Err(e) => {
            error!("Error generating README for {}: {}", reference, e);
            state.metrics.increment(metrics::FAILED).await;
            error_response(&e)
        }
    }
}

/// Runs the pipeline and streams progress frames
///
/// Rate limiting, the body ceiling and URL validation happen before the
/// stream opens and are reported as plain JSON errors. Once the stream is
/// open, failures arrive in-band as an `error` frame.
async fn generate_stream(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    state.metrics.increment(metrics::STREAM_REQUESTS).await;

    let client = client_identifier(&headers);
    if !state.limiter.check(&client).await {
        state.metrics.increment(metrics::RATE_LIMITED).await;
        return error_response(&ReadmeError::ClientRateLimited);
    }

    let declared_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok());
    if declared_length.map_or(false, |length| length > state.max_request_body) {
        state.metrics.increment(metrics::REJECTED).await;
        return error_response(&ReadmeError::RequestTooLarge);
    }

    let body = match axum::body::to_bytes(body, state.max_request_body).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read request body from {}: {}", client, e);
            state.metrics.increment(metrics::REJECTED).await;
            return error_response(&ReadmeError::RequestTooLarge);
        }
    };

    let reference = match parse_request(&body) {
        Ok(reference) => reference,
        Err(e) => {
            warn!("Rejected streaming request from {}: {}", client, e);
            state.metrics.increment(metrics::REJECTED).await;
            return error_response(&e);
        }
    };

    let (tx, rx) = mpsc::channel::<StreamEvent>(EVENT_BUFFER);
    let span = info_span!("generate_stream", request_id = %Uuid::new_v4(), repository = %reference);
    let pipeline = Arc::clone(&state.pipeline);
    let recorder = state.metrics.clone();

    tokio::spawn(
        async move {
            recorder.increment(metrics::IN_FLIGHT).await;
            let started = Instant::now();
            let outcome = pipeline.stream(reference, tx).await;
            recorder.decrement(metrics::IN_FLIGHT).await;

            match outcome {
                StreamOutcome::Completed => {
                    recorder.increment(metrics::GENERATED).await;
                    recorder.record_time(metrics::LAST_GENERATION, started.elapsed()).await;
                }
                StreamOutcome::Failed => recorder.increment(metrics::FAILED).await,
                StreamOutcome::Cancelled => recorder.increment(metrics::CANCELLED).await,
            }
        }
        .instrument(span),
    );

    ([(CONNECTION, "keep-alive")], sse_response(rx)).into_response()
}
