//! Body-fat and BMI estimation library
//!
//! This crate provides the core functionality for:
//! - Loading the anthropometric dataset and preparing features
//! - Training and caching the regression artifact bundle
//! - Body-fat inference and BMI classification
//! - Multi-provider chat with graceful degradation
//! - Health checks and observability

pub mod artifacts;
pub mod bmi;
pub mod chat;
pub mod dataset;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use artifacts::{
    ArtifactBundle, ArtifactCache, ArtifactStore, BundleSource, FsArtifactStore, LoadedBundle,
    MemoryArtifactStore,
};
pub use bmi::{calculate_bmi, BmiResult};
pub use chat::{build_prompt, ChatAdapter, ChatConfig, ChatProvider, ProviderKind};
pub use error::{ChatError, EstimatorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{
    BodyFatPredictor, ModelTrainer, OutputConfig, Predictor, TrainerConfig, TrainingReport,
};

/// Test fixtures shared with the server and CLI crates
#[doc(hidden)]
pub mod testing {
    use crate::artifacts::ArtifactBundle;
    use crate::dataset::Table;
    use crate::error::Result;
    use crate::predictor::{ForestParams, ModelTrainer, TrainerConfig};
    use std::fmt::Write;

    /// Deterministic dataset in the source layout (`Height` in inches)
    pub fn synthetic_csv(rows: usize) -> String {
        let mut csv =
            String::from("Age,Weight,Height,Neck,Chest,Abdomen,Hip,Thigh,Biceps,BodyFat\n");
        for i in 0..rows {
            let f = i as f64;
            let abdomen = 75.0 + (f * 1.7) % 40.0;
            let weight = 60.0 + (f * 2.3) % 45.0;
            let body_fat = 0.55 * abdomen - 0.12 * weight - 20.0;
            let _ = writeln!(
                csv,
                "{},{},{},{},{},{},{},{},{},{:.2}",
                20 + i % 50,
                weight,
                64.0 + (f * 0.7) % 10.0,
                34.0 + (f * 0.3) % 8.0,
                90.0 + (f * 1.1) % 25.0,
                abdomen,
                92.0 + (f * 0.9) % 20.0,
                52.0 + (f * 0.5) % 12.0,
                28.0 + (f * 0.4) % 9.0,
                body_fat,
            );
        }
        csv
    }

    /// Trainer with a small forest, for fast tests
    pub fn fast_trainer() -> ModelTrainer {
        ModelTrainer::new(TrainerConfig {
            forest: ForestParams {
                n_estimators: 10,
                ..ForestParams::default()
            },
            ..TrainerConfig::default()
        })
    }

    pub fn trained_bundle() -> Result<ArtifactBundle> {
        let table = Table::from_reader(synthetic_csv(60).as_bytes())?;
        Ok(fast_trainer().train(&table)?.bundle)
    }
}
