//! Training and reload commands

use anyhow::{bail, Result};
use colored::Colorize;
use estimator_lib::{
    artifacts::{ArtifactCache, BundleSource, FsArtifactStore},
    predictor::{ForestParams, ModelTrainer, TrainerConfig, TrainingReport},
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

use crate::client::{ApiClient, ReloadResponse};
use crate::output::{format_score, print_info, print_json, print_success, OutputFormat};

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct TrainSummary {
    fingerprint: String,
    features: Vec<String>,
    artifact_dir: String,
    rows_total: usize,
    rows_used: usize,
    train_rows: usize,
    test_rows: usize,
    r2: Option<f64>,
    mae: Option<f64>,
    elapsed_secs: f64,
}

/// Train from a local dataset and overwrite the artifacts in `artifact_dir`
pub fn retrain(
    dataset: &Path,
    artifact_dir: &Path,
    trees: usize,
    verbose: bool,
    format: OutputFormat,
) -> Result<()> {
    if trees == 0 {
        bail!("--trees must be at least 1");
    }

    let trainer = ModelTrainer::new(TrainerConfig {
        forest: ForestParams {
            n_estimators: trees,
            ..ForestParams::default()
        },
        ..TrainerConfig::default()
    });
    let store = Arc::new(FsArtifactStore::new(artifact_dir));
    let cache = ArtifactCache::new(store, dataset, trainer);

    if verbose {
        print_info(&format!(
            "Training {} trees on {}",
            trees,
            dataset.display()
        ));
    }

    let loaded = cache.retrain()?;
    let report = match &loaded.source {
        BundleSource::Trained { report, .. } => report.clone(),
        BundleSource::Cache => bail!("Expected a freshly trained bundle"),
    };
    let bundle = &loaded.bundle;

    let summary = summarize(
        &report,
        bundle.fingerprint(),
        bundle.features().names(),
        artifact_dir,
    );

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Trained model {} saved to {}",
                bundle.short_fingerprint(),
                artifact_dir.display()
            ));
            print_report(&summary);
            if verbose {
                println!();
                println!("{}", "Features".bold());
                for name in &summary.features {
                    println!("  {}", name);
                }
            }
        }
    }
    Ok(())
}

fn summarize(
    report: &TrainingReport,
    fingerprint: &str,
    features: &[String],
    artifact_dir: &Path,
) -> TrainSummary {
    TrainSummary {
        fingerprint: fingerprint.to_string(),
        features: features.to_vec(),
        artifact_dir: artifact_dir.display().to_string(),
        rows_total: report.rows_total,
        rows_used: report.rows_used,
        train_rows: report.train_rows,
        test_rows: report.test_rows,
        r2: report.r2,
        mae: report.mae,
        elapsed_secs: report.elapsed.as_secs_f64(),
    }
}

fn print_report(summary: &TrainSummary) {
    let rows = vec![
        ReportRow {
            metric: "Rows (used/total)",
            value: format!("{}/{}", summary.rows_used, summary.rows_total),
        },
        ReportRow {
            metric: "Train rows",
            value: summary.train_rows.to_string(),
        },
        ReportRow {
            metric: "Test rows",
            value: summary.test_rows.to_string(),
        },
        ReportRow {
            metric: "R²",
            value: format_score(summary.r2),
        },
        ReportRow {
            metric: "MAE",
            value: format_score(summary.mae),
        },
        ReportRow {
            metric: "Features",
            value: summary.features.len().to_string(),
        },
        ReportRow {
            metric: "Elapsed",
            value: format!("{:.2}s", summary.elapsed_secs),
        },
    ];

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
}

/// Ask the running service to retrain and swap its model
pub async fn reload_remote(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let reply: ReloadResponse = client
        .post("api/reload-model", &serde_json::json!({}))
        .await?;

    match format {
        OutputFormat::Json => print_json(&reply)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Service reloaded model {} ({} features) at {}",
                reply.fingerprint,
                reply.features.len(),
                reply.reloaded_at
            ));
            if let (Some(train), Some(test)) = (reply.train_rows, reply.test_rows) {
                println!(
                    "  rows {}/{}  R² {}  MAE {}",
                    train,
                    test,
                    format_score(reply.r2),
                    format_score(reply.mae)
                );
            }
        }
    }
    Ok(())
}
