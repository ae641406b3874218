//! HTTP API: prediction, chat, model reload, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use estimator_lib::{
    artifacts::{ArtifactCache, BundleSource, LoadedBundle},
    chat::{build_prompt, ChatAdapter},
    health::{components, ComponentStatus, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::Predictor,
    EstimatorError, InputRecord,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Shared application state, built once at startup
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub chat: ChatAdapter,
    pub cache: Arc<ArtifactCache>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    /// Serializes `/api/reload-model` runs
    reload_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        chat: ChatAdapter,
        cache: Arc<ArtifactCache>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            predictor,
            chat,
            cache,
            health_registry,
            metrics,
            logger,
            reload_lock: Mutex::new(()),
        }
    }
}

/// Emit logs and metrics for a freshly resolved bundle
pub fn record_loaded_bundle(
    loaded: &LoadedBundle,
    location: &str,
    logger: &StructuredLogger,
    metrics: &ServiceMetrics,
) {
    let bundle = &loaded.bundle;
    match &loaded.source {
        BundleSource::Cache => {
            logger.log_artifacts_loaded(
                location,
                bundle.short_fingerprint(),
                bundle.features().len(),
            );
        }
        BundleSource::Trained { report, persisted } => {
            metrics.observe_training_duration(report.elapsed.as_secs_f64());
            logger.log_artifacts_trained(report, bundle.short_fingerprint(), *persisted);
        }
    }
    metrics.set_model_info(bundle.short_fingerprint(), bundle.features().len());
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Body fat + BMI for one record
async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let start = Instant::now();

    let outcome = serde_json::from_slice::<Value>(&body)
        .map_err(|e| {
            EstimatorError::Validation(format!("request body is not valid JSON: {}", e))
        })
        .and_then(|value| match value {
            Value::Object(object) => InputRecord::from_json(&object),
            _ => Err(EstimatorError::Validation(
                "request body must be a JSON object".to_string(),
            )),
        })
        .and_then(|record| state.predictor.predict(&record));

    match outcome {
        Ok(result) => {
            state.metrics.observe_prediction_latency(start.elapsed().as_secs_f64());
            state.metrics.inc_predictions();
            let fingerprint = state.predictor.fingerprint().unwrap_or_default();
            state.logger.log_prediction(&result, &fingerprint);
            let registry = &state.health_registry;
            if registry.status_of(components::PREDICTOR).await != Some(ComponentStatus::Healthy) {
                registry.set_healthy(components::PREDICTOR).await;
            }
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            state.metrics.inc_prediction_errors();
            let client_error = e.is_client_error();
            state.logger.log_prediction_rejected(&e.to_string(), client_error);
            let status = if client_error {
                StatusCode::BAD_REQUEST
            } else {
                state
                    .health_registry
                    .set_degraded(components::PREDICTOR, format!("last prediction failed: {}", e))
                    .await;
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
}

/// Always 200; provider failures arrive as response text
async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let message = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_default();

    let reply = state.chat.generate(&build_prompt(&message)).await;
    Json(ChatResponse {
        response: reply.text,
    })
}

/// Retrain from the dataset and swap the new bundle in
async fn reload_model(State(state): State<Arc<AppState>>) -> Response {
    let _guard = state.reload_lock.lock().await;
    info!("Model reload requested");

    let cache = Arc::clone(&state.cache);
    let retrained = match tokio::task::spawn_blocking(move || cache.retrain()).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("training task failed: {}", e)),
    };

    let loaded = match retrained {
        Ok(loaded) => loaded,
        Err(message) => {
            error!(error = %message, "Model reload failed, keeping the active bundle");
            let reason = format!("last reload failed: {}", message);
            state
                .health_registry
                .set_degraded(components::ARTIFACTS, reason)
                .await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, message);
        }
    };

    let dataset = state.cache.dataset_path().display().to_string();
    record_loaded_bundle(&loaded, &dataset, &state.logger, &state.metrics);

    let fingerprint = loaded.bundle.fingerprint().to_string();
    let features = loaded.bundle.features().names().to_vec();
    let report = match &loaded.source {
        BundleSource::Trained { report, .. } => Some(report.clone()),
        BundleSource::Cache => None,
    };

    if let Err(e) = state.predictor.install(loaded.bundle) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    state.health_registry.set_healthy(components::ARTIFACTS).await;

    let mut body = json!({
        "status": "reloaded",
        "fingerprint": fingerprint,
        "features": features,
        "reloaded_at": chrono::Utc::now().to_rfc3339(),
    });
    if let Some(report) = report {
        body["train_rows"] = json!(report.train_rows);
        body["test_rows"] = json!(report.test_rows);
        body["r2"] = json!(report.r2);
        body["mae"] = json!(report.mae);
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/chat", post(chat))
        .route("/api/reload-model", post(reload_model))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
