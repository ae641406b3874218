//! Observability infrastructure for the estimator service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, training duration, request counters, model info)
//! - Structured JSON logging with tracing

use crate::models::PredictionResult;
use crate::predictor::TrainingReport;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, GaugeVec, Histogram, IntCounter,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for per-request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Histogram buckets for training runs (in seconds)
const TRAINING_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    training_duration_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    chat_requests_total: IntCounter,
    chat_errors_total: IntCounter,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "bodyfat_prediction_latency_seconds",
                "Time spent producing a body-fat prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_duration_seconds: register_histogram!(
                "bodyfat_training_duration_seconds",
                "Time spent training the regression model",
                TRAINING_BUCKETS.to_vec()
            )
            .expect("Failed to register training_duration_seconds"),

            predictions_total: register_int_counter!(
                "bodyfat_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter!(
                "bodyfat_prediction_errors_total",
                "Total number of rejected or failed prediction requests"
            )
            .expect("Failed to register prediction_errors_total"),

            chat_requests_total: register_int_counter!(
                "bodyfat_chat_requests_total",
                "Total number of chat requests"
            )
            .expect("Failed to register chat_requests_total"),

            chat_errors_total: register_int_counter!(
                "bodyfat_chat_errors_total",
                "Total number of chat requests answered with an error text"
            )
            .expect("Failed to register chat_errors_total"),

            model_info: register_gauge_vec!(
                "bodyfat_model_info",
                "Information about the active artifact bundle",
                &["fingerprint", "features"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_training_duration(&self, duration_secs: f64) {
        self.inner().training_duration_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn inc_chat_requests(&self) {
        self.inner().chat_requests_total.inc();
    }

    pub fn inc_chat_errors(&self) {
        self.inner().chat_errors_total.inc();
    }

    /// Replace the model info series with the active bundle's labels
    pub fn set_model_info(&self, fingerprint: &str, n_features: usize) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[fingerprint, &n_features.to_string()])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Every event carries an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, fingerprint: &str, bind: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            fingerprint = %fingerprint,
            bind = %bind,
            "Body-fat estimator started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Body-fat estimator shutting down"
        );
    }

    pub fn log_artifacts_loaded(&self, location: &str, fingerprint: &str, features: usize) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            location = %location,
            fingerprint = %fingerprint,
            features = features,
            "Loaded cached artifact bundle"
        );
    }

    pub fn log_artifacts_trained(
        &self,
        report: &TrainingReport,
        fingerprint: &str,
        persisted: bool,
    ) {
        let r2 = report.r2.unwrap_or(f64::NAN);
        let mae = report.mae.unwrap_or(f64::NAN);
        if persisted {
            info!(
                event = "artifacts_trained",
                instance = %self.instance,
                fingerprint = %fingerprint,
                rows_used = report.rows_used,
                train_rows = report.train_rows,
                test_rows = report.test_rows,
                r2 = r2,
                mae = mae,
                elapsed_ms = report.elapsed.as_millis() as u64,
                persisted = true,
                "Trained and persisted artifact bundle"
            );
        } else {
            warn!(
                event = "artifacts_trained",
                instance = %self.instance,
                fingerprint = %fingerprint,
                rows_used = report.rows_used,
                r2 = r2,
                mae = mae,
                elapsed_ms = report.elapsed.as_millis() as u64,
                persisted = false,
                "Trained artifact bundle, serving from memory only"
            );
        }
    }

    pub fn log_prediction(&self, result: &PredictionResult, fingerprint: &str) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            prediction = result.prediction,
            category = %result.category,
            bmi = result.bmi,
            bmi_category = %result.bmi_category,
            fingerprint = %fingerprint,
            "Generated body-fat prediction"
        );
    }

    pub fn log_prediction_rejected(&self, reason: &str, client_error: bool) {
        warn!(
            event = "prediction_rejected",
            instance = %self.instance,
            reason = %reason,
            client_error = client_error,
            "Prediction request failed"
        );
    }

    pub fn log_chat_provider_selected(&self, provider: &str, model: &str) {
        info!(
            event = "chat_provider_selected",
            instance = %self.instance,
            provider = %provider,
            model = %model,
            "Chat provider initialized"
        );
    }

    /// `stage` is `init` for construction failures and `generate` for call failures
    pub fn log_chat_provider_failed(&self, provider: &str, stage: &str, error: &str) {
        warn!(
            event = "chat_provider_failed",
            instance = %self.instance,
            provider = %provider,
            stage = %stage,
            error = %error,
            "Chat provider failed"
        );
    }
}
