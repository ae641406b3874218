//! Body-fat regression: feature preparation, training and inference

mod features;
mod forest;
mod inference;
mod output;
mod scaler;
mod trainer;

pub use features::{
    FeaturePreparer, FeatureSet, PreparedTable, CM_PER_INCH, FEATURE_PRIORITY, HEIGHT_CM,
    HEIGHT_INCHES, TARGET_COLUMN, WEIGHT,
};
pub use forest::{ForestParams, RandomForestRegressor, RegressionTree, TreeNode};
pub use inference::{BodyFatPredictor, InferenceStats};
pub use output::{
    band_for, round1, BodyFatAssessment, BodyFatBand, OutputConfig, OutputFormatter,
    BODY_FAT_BANDS, MAX_BODY_FAT, MIN_BODY_FAT,
};
pub use scaler::StandardScaler;
pub use trainer::{ModelTrainer, TrainedModel, TrainerConfig, TrainingReport};

use crate::artifacts::ArtifactBundle;
use crate::error::Result;
use crate::models::{InputRecord, PredictionResult};
use std::sync::Arc;

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Estimate body fat and BMI for one record
    fn predict(&self, record: &InputRecord) -> Result<PredictionResult>;

    /// Replace the active bundle, returning the one it displaced
    fn install(&self, bundle: ArtifactBundle) -> Result<Arc<ArtifactBundle>>;

    /// Fingerprint of the active bundle
    fn fingerprint(&self) -> Result<String>;
}
