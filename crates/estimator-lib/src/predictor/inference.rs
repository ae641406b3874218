//! Body-fat inference over the active artifact bundle
//!
//! The bundle sits behind `RwLock<Arc<_>>`. Each inference clones the `Arc`
//! once and works on that snapshot, so a concurrent `install` can never
//! pair one run's scaler with another run's model.

use super::features::{FeaturePreparer, HEIGHT_CM, WEIGHT};
use super::output::{BodyFatAssessment, OutputConfig, OutputFormatter};
use super::Predictor;
use crate::artifacts::ArtifactBundle;
use crate::bmi::{calculate_bmi, DEFAULT_HEIGHT_CM, DEFAULT_WEIGHT_KG};
use crate::error::{EstimatorError, Result};
use crate::models::{InputRecord, PredictionResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info};

/// Predictor backed by a trained forest and scaler
pub struct BodyFatPredictor {
    bundle: RwLock<Arc<ArtifactBundle>>,
    formatter: OutputFormatter,
    inference_count: AtomicU64,
    swap_count: AtomicU64,
}

impl BodyFatPredictor {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self::with_output_config(bundle, OutputConfig::default())
    }

    pub fn with_output_config(bundle: ArtifactBundle, config: OutputConfig) -> Self {
        Self {
            bundle: RwLock::new(Arc::new(bundle)),
            formatter: OutputFormatter::with_config(config),
            inference_count: AtomicU64::new(0),
            swap_count: AtomicU64::new(0),
        }
    }

    /// Snapshot of the active bundle
    pub fn bundle(&self) -> Result<Arc<ArtifactBundle>> {
        let guard = self
            .bundle
            .read()
            .map_err(|e| EstimatorError::Artifact(format!("Lock poisoned: {}", e)))?;
        Ok(Arc::clone(&guard))
    }

    /// Clamp + band for one record, without the BMI part
    pub fn assess(&self, record: &InputRecord) -> Result<BodyFatAssessment> {
        self.assess_prepared(&FeaturePreparer::prepare_record(record))
    }

    /// `record` must already carry `Height_cm` if it had `Height`
    fn assess_prepared(&self, record: &InputRecord) -> Result<BodyFatAssessment> {
        let bundle = self.bundle()?;
        let input = bundle.features().vectorize(record);
        let scaled = bundle.scaler().transform(&input)?;
        let raw = bundle.model().predict(&scaled)?;

        Ok(self.formatter.assess(raw))
    }

    /// Coerce a JSON object and predict
    pub fn predict_json(
        &self,
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<PredictionResult> {
        let record = InputRecord::from_json(object)?;
        self.predict(&record)
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            bundle_swaps: self.swap_count.load(Ordering::Relaxed),
        }
    }
}

impl Predictor for BodyFatPredictor {
    fn predict(&self, record: &InputRecord) -> Result<PredictionResult> {
        let start = Instant::now();
        let prepared = FeaturePreparer::prepare_record(record);
        let assessment = self.assess_prepared(&prepared)?;
        let bmi = calculate_bmi(
            prepared.get_or(WEIGHT, DEFAULT_WEIGHT_KG),
            prepared.get_or(HEIGHT_CM, DEFAULT_HEIGHT_CM),
        )?;

        self.inference_count.fetch_add(1, Ordering::Relaxed);
        debug!(
            elapsed_us = start.elapsed().as_micros() as u64,
            prediction = assessment.value,
            "Inference completed"
        );

        Ok(PredictionResult {
            prediction: assessment.value,
            category: assessment.band.category.to_string(),
            description: assessment.band.description.to_string(),
            advice: assessment.band.advice.to_string(),
            bmi: bmi.bmi,
            bmi_category: bmi.category,
            bmi_advice: bmi.advice,
        })
    }

    fn install(&self, bundle: ArtifactBundle) -> Result<Arc<ArtifactBundle>> {
        let next = Arc::new(bundle);
        let previous = {
            let mut guard = self
                .bundle
                .write()
                .map_err(|e| EstimatorError::Artifact(format!("Lock poisoned: {}", e)))?;
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };
        self.swap_count.fetch_add(1, Ordering::Relaxed);

        info!(
            old_fingerprint = %previous.short_fingerprint(),
            new_fingerprint = %next.short_fingerprint(),
            "Artifact bundle swapped"
        );
        Ok(previous)
    }

    fn fingerprint(&self) -> Result<String> {
        Ok(self.bundle()?.fingerprint().to_string())
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub bundle_swaps: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trained_bundle() -> ArtifactBundle {
        crate::testing::trained_bundle().unwrap()
    }

    fn reference_record() -> InputRecord {
        InputRecord::new()
            .with("Age", 25.0)
            .with("Weight", 70.0)
            .with("Height_cm", 175.0)
            .with("Abdomen", 85.0)
            .with("Neck", 38.0)
            .with("Chest", 95.0)
            .with("Hip", 98.0)
            .with("Thigh", 55.0)
            .with("Biceps", 32.0)
    }

    #[test]
    fn test_reference_prediction() {
        let predictor = BodyFatPredictor::new(trained_bundle());
        let result = predictor.predict(&reference_record()).unwrap();

        assert_eq!(result.bmi, 22.9);
        assert_eq!(result.bmi_category, "normal weight");
        assert_eq!(result.bmi_advice, "maintain regimen");
        assert!((5.0..=50.0).contains(&result.prediction));
        assert_eq!(result.prediction, (result.prediction * 10.0).round() / 10.0);
        assert!(!result.category.is_empty());
        assert!(!result.description.is_empty());
        assert!(!result.advice.is_empty());
        assert_eq!(predictor.stats().total_inferences, 1);
    }

    #[test]
    fn test_empty_record_defaults_to_zero() {
        let predictor = BodyFatPredictor::new(trained_bundle());
        let result = predictor.predict(&InputRecord::new()).unwrap();
        assert!((5.0..=50.0).contains(&result.prediction));
        // BMI falls back to 75 kg / 175 cm
        assert_eq!(result.bmi, 24.5);
    }

    #[test]
    fn test_inch_height_matches_cm() {
        let predictor = BodyFatPredictor::new(trained_bundle());
        let base = reference_record();
        let mut inches: InputRecord = InputRecord::new()
            .with("Age", 25.0)
            .with("Weight", 70.0)
            .with("Abdomen", 85.0)
            .with("Neck", 38.0)
            .with("Chest", 95.0)
            .with("Hip", 98.0)
            .with("Thigh", 55.0)
            .with("Biceps", 32.0);
        inches.insert("Height", 175.0 / 2.54);

        assert_eq!(
            predictor.predict(&base).unwrap(),
            predictor.predict(&inches).unwrap()
        );
    }

    #[test]
    fn test_repeated_predictions_are_stable() {
        let predictor = BodyFatPredictor::new(trained_bundle());
        let first = predictor.predict(&reference_record()).unwrap();
        for _ in 0..5 {
            assert_eq!(predictor.predict(&reference_record()).unwrap(), first);
        }
    }

    #[test]
    fn test_predict_json_rejects_text() {
        let predictor = BodyFatPredictor::new(trained_bundle());
        let body = json!({"Age": 25, "Weight": "heavy"});
        let err = predictor.predict_json(body.as_object().unwrap()).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_install_swaps_bundle() {
        let bundle = trained_bundle();
        let predictor = BodyFatPredictor::new(bundle.clone());
        let before = predictor.bundle().unwrap();

        let previous = predictor.install(bundle).unwrap();
        assert!(Arc::ptr_eq(&previous, &before));
        assert!(!Arc::ptr_eq(&predictor.bundle().unwrap(), &before));
        assert_eq!(predictor.stats().bundle_swaps, 1);
        assert_eq!(predictor.fingerprint().unwrap(), before.fingerprint());
    }

    #[test]
    fn test_custom_clamp_bounds_applied() {
        let predictor = BodyFatPredictor::with_output_config(
            trained_bundle(),
            OutputConfig {
                min_body_fat: 49.0,
                max_body_fat: 49.5,
            },
        );
        let result = predictor.predict(&reference_record()).unwrap();
        assert!((49.0..=49.5).contains(&result.prediction));
        assert_eq!(result.category, "elevated");
    }

    #[test]
    fn test_inch_height_feeds_model_and_bmi() {
        let predictor = BodyFatPredictor::new(trained_bundle());
        let record = InputRecord::new()
            .with("Weight", 70.0)
            .with("Height", 68.9)
            .with("Abdomen", 85.0);

        let result = predictor.predict(&record).unwrap();
        let assessment = predictor.assess(&record).unwrap();
        assert_eq!(result.prediction, assessment.value);
        assert_eq!(result.category, assessment.band.category);
        // 68.9 in is 175.0 cm
        assert_eq!(result.bmi, 22.9);

        let shorter = predictor.predict(&record.clone().with("Height", 60.0)).unwrap();
        assert_eq!(shorter.bmi, 30.1);
    }
}
