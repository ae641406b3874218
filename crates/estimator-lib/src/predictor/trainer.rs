//! Model training
//!
//! Builds an `ArtifactBundle` from a raw table: prepare features, drop
//! incomplete rows, fit the scaler, split 80/20 with a fixed seed, fit the
//! forest on the training part and score it on the held-out part.

use super::features::{FeaturePreparer, TARGET_COLUMN};
use super::forest::{ForestParams, RandomForestRegressor};
use super::scaler::StandardScaler;
use crate::artifacts::ArtifactBundle;
use crate::dataset::Table;
use crate::error::{EstimatorError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub forest: ForestParams,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the train/test shuffle
    pub split_seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            test_fraction: 0.2,
            split_seed: 42,
        }
    }
}

/// Summary of a training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows_total: usize,
    pub rows_used: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out R², absent when the test split is empty
    pub r2: Option<f64>,
    /// Held-out mean absolute error
    pub mae: Option<f64>,
    pub elapsed: Duration,
}

/// Trained bundle plus its report
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub bundle: ArtifactBundle,
    pub report: TrainingReport,
}

/// Fits the scaler and forest from historical measurements
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Load a CSV dataset and train on it
    pub fn train_from_path(&self, dataset: impl AsRef<Path>) -> Result<TrainedModel> {
        let table = Table::from_csv_path(dataset)?;
        self.train(&table)
    }

    pub fn train(&self, table: &Table) -> Result<TrainedModel> {
        let start = Instant::now();
        let prepared = FeaturePreparer::prepare_table(table)?;
        let features = prepared.features;
        let table = prepared.table;

        let target_idx = table.column_index(TARGET_COLUMN).ok_or_else(|| {
            EstimatorError::Config(format!("dataset has no '{}' column", TARGET_COLUMN))
        })?;
        if features.is_empty() {
            return Err(EstimatorError::Data(
                "dataset has none of the expected feature columns".into(),
            ));
        }

        let feature_idx: Vec<usize> = features
            .names()
            .iter()
            .filter_map(|name| table.column_index(name))
            .collect();

        let (x, y): (Vec<Vec<f64>>, Vec<f64>) = table
            .rows()
            .iter()
            .filter_map(|row| {
                let target = row[target_idx]?;
                let sample = feature_idx
                    .iter()
                    .map(|&i| row[i])
                    .collect::<Option<Vec<f64>>>()?;
                Some((sample, target))
            })
            .unzip();

        if x.is_empty() {
            return Err(EstimatorError::Data(
                "no rows left after dropping missing values".into(),
            ));
        }
        debug!(
            rows_total = table.len(),
            rows_used = x.len(),
            features = %features.names().join(","),
            "Prepared training rows"
        );

        let scaler = StandardScaler::fit(&x)?;
        let x_scaled = scaler.transform_rows(&x)?;

        let (train_idx, test_idx) = self.split(x_scaled.len());
        let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x_scaled[i].clone()).collect();
        let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();

        let model = RandomForestRegressor::fit(&x_train, &y_train, self.config.forest)?;

        let predictions = test_idx
            .iter()
            .map(|&i| model.predict(&x_scaled[i]))
            .collect::<Result<Vec<f64>>>()?;
        let actual: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();

        let report = TrainingReport {
            rows_total: table.len(),
            rows_used: x.len(),
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            r2: r_squared(&actual, &predictions),
            mae: mean_absolute_error(&actual, &predictions),
            elapsed: start.elapsed(),
        };

        info!(
            rows_used = report.rows_used,
            train_rows = report.train_rows,
            test_rows = report.test_rows,
            r2 = ?report.r2,
            mae = ?report.mae,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Model training finished"
        );

        Ok(TrainedModel {
            bundle: ArtifactBundle::new(model, scaler, features)?,
            report,
        })
    }

    /// Seeded shuffle split into (train, test) row indices
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.split_seed);
        indices.shuffle(&mut rng);

        let mut n_test = (n as f64 * self.config.test_fraction).ceil() as usize;
        // Keep at least one training row
        if n_test >= n {
            n_test = n.saturating_sub(1);
        }

        let train = indices.split_off(n_test);
        (train, indices)
    }
}

fn r_squared(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() {
        return None;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot <= f64::EPSILON {
        return None;
    }
    Some(1.0 - ss_res / ss_tot)
}

fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() {
        return None;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Some(total / actual.len() as f64)
}
