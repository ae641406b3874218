//! Feature preparation for training and inference
//!
//! Normalizes raw measurements into the canonical feature set: derives
//! `Height_cm` from an inch `Height` column, then selects the available
//! features in a fixed priority order. The resulting `FeatureSet` is
//! persisted with the model and its order is reused verbatim at inference.

use crate::dataset::Table;
use crate::error::{EstimatorError, Result};
use crate::models::InputRecord;
use serde::{Deserialize, Serialize};

/// Regression target column
pub const TARGET_COLUMN: &str = "BodyFat";

/// Height in inches, as recorded in the source dataset
pub const HEIGHT_INCHES: &str = "Height";

/// Height in centimetres, the unit the model is trained on
pub const HEIGHT_CM: &str = "Height_cm";

pub const WEIGHT: &str = "Weight";

pub const CM_PER_INCH: f64 = 2.54;

/// Candidate features in selection order
pub const FEATURE_PRIORITY: [&str; 9] = [
    "Age", WEIGHT, HEIGHT_CM, "Abdomen", "Neck", "Chest", "Hip", "Thigh", "Biceps",
];

/// Ordered list of feature names the model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet(Vec<String>);

impl FeatureSet {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Newline-separated form used for the persisted feature list
    pub fn to_text(&self) -> String {
        self.0.join("\n")
    }

    /// Parse the persisted feature list; line order is preserved
    pub fn from_text(text: &str) -> Result<Self> {
        let names: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(EstimatorError::Artifact("feature list is empty".into()));
        }
        Ok(Self(names))
    }

    /// Build the model input vector in feature order, missing fields as 0
    pub fn vectorize(&self, record: &InputRecord) -> Vec<f64> {
        self.0.iter().map(|name| record.get_or(name, 0.0)).collect()
    }
}

/// Table after preparation together with the features it provides
#[derive(Debug, Clone)]
pub struct PreparedTable {
    pub table: Table,
    pub features: FeatureSet,
}

/// Stateless transform from raw measurements to model features
pub struct FeaturePreparer;

impl FeaturePreparer {
    /// Derive `Height_cm` (if `Height` is present) and select available features
    pub fn prepare_table(table: &Table) -> Result<PreparedTable> {
        let mut table = table.clone();

        if let Some(inches) = table.column(HEIGHT_INCHES) {
            let cm = inches
                .into_iter()
                .map(|v| v.map(|inches| inches * CM_PER_INCH))
                .collect();
            table.set_column(HEIGHT_CM, cm)?;
        }

        let features = FEATURE_PRIORITY
            .iter()
            .filter(|name| table.has_column(name))
            .map(|name| name.to_string())
            .collect();

        Ok(PreparedTable {
            table,
            features: FeatureSet::new(features),
        })
    }

    /// Same unit conversion applied to a single inference record
    pub fn prepare_record(record: &InputRecord) -> InputRecord {
        let mut record = record.clone();
        if let Some(inches) = record.get(HEIGHT_INCHES) {
            record.insert(HEIGHT_CM, inches * CM_PER_INCH);
        }
        record
    }
}
