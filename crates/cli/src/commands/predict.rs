//! Body-fat prediction commands

use anyhow::{Context, Result};
use colored::Colorize;
use estimator_lib::{
    artifacts::{ArtifactBundle, FsArtifactStore},
    predictor::{BodyFatPredictor, Predictor, HEIGHT_CM, HEIGHT_INCHES, WEIGHT},
    InputRecord, PredictionResult,
};
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_category, format_percent, print_json, OutputFormat};
use crate::Measurements;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Measure")]
    measure: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Named fields in the request layout the service expects
pub fn to_fields(m: &Measurements) -> BTreeMap<String, f64> {
    [
        ("Age", m.age),
        (WEIGHT, m.weight),
        (HEIGHT_CM, m.height_cm),
        (HEIGHT_INCHES, m.height_in),
        ("Abdomen", m.abdomen),
        ("Neck", m.neck),
        ("Chest", m.chest),
        ("Hip", m.hip),
        ("Thigh", m.thigh),
        ("Biceps", m.biceps),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
    .collect()
}

/// Predict through the running service
pub async fn predict_remote(
    client: &ApiClient,
    measurements: &Measurements,
    format: OutputFormat,
) -> Result<()> {
    let result: PredictionResult = client.post("api/predict", &to_fields(measurements)).await?;
    print_result(&result, format)
}

/// Predict with artifacts read straight from disk
pub fn predict_local(
    measurements: &Measurements,
    artifact_dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let store = FsArtifactStore::new(artifact_dir);
    let bundle = ArtifactBundle::load_from(&store).with_context(|| {
        format!(
            "No usable artifacts in {} (run `bfe train` first)",
            artifact_dir.display()
        )
    })?;

    let record: InputRecord = to_fields(measurements).into_iter().collect();
    let result = BodyFatPredictor::new(bundle).predict(&record)?;
    print_result(&result, format)
}

fn print_result(result: &PredictionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result)?,
        OutputFormat::Table => {
            println!("{}", "Body Fat Estimate".bold());
            println!("{}", "=".repeat(40));

            let rows = vec![
                ResultRow {
                    measure: "Body fat",
                    value: format_percent(result.prediction),
                },
                ResultRow {
                    measure: "Category",
                    value: color_category(&result.category),
                },
                ResultRow {
                    measure: "Description",
                    value: result.description.clone(),
                },
                ResultRow {
                    measure: "Advice",
                    value: result.advice.clone(),
                },
                ResultRow {
                    measure: "BMI",
                    value: format!("{:.1}", result.bmi),
                },
                ResultRow {
                    measure: "BMI category",
                    value: color_category(&result.bmi_category),
                },
                ResultRow {
                    measure: "BMI advice",
                    value: result.bmi_advice.clone(),
                },
            ];

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fields_skips_missing() {
        let fields = to_fields(&Measurements {
            age: Some(25.0),
            height_in: Some(68.9),
            ..Measurements::default()
        });
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["Age"], 25.0);
        assert_eq!(fields["Height"], 68.9);
    }

    #[test]
    fn test_to_fields_uses_service_names() {
        let fields = to_fields(&Measurements {
            weight: Some(70.0),
            height_cm: Some(175.0),
            abdomen: Some(85.0),
            ..Measurements::default()
        });
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["Abdomen", "Height_cm", "Weight"]);
    }
}
