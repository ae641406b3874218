//! Per-column standardization (zero mean, unit variance)

use crate::error::{EstimatorError, Result};
use serde::{Deserialize, Serialize};

/// Standard scaler with parameters fixed at fit time.
///
/// Uses the population standard deviation. Constant columns get a scale
/// of 1 so they transform to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and standard deviations from row-major samples
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| EstimatorError::Data("cannot fit scaler on zero rows".into()))?;
        let n_features = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; n_features];
        for row in rows {
            if row.len() != n_features {
                return Err(EstimatorError::Data(format!(
                    "ragged row: expected {} features, got {}",
                    n_features,
                    row.len()
                )));
            }
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardize one sample
    pub fn transform(&self, sample: &[f64]) -> Result<Vec<f64>> {
        if sample.len() != self.n_features() {
            return Err(EstimatorError::Artifact(format!(
                "scaler expects {} features, got {}",
                self.n_features(),
                sample.len()
            )));
        }
        Ok(sample
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    /// Standardize many samples
    pub fn transform_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
