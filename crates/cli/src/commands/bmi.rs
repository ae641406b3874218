//! Local BMI command

use anyhow::Result;
use estimator_lib::calculate_bmi;

use crate::output::{color_category, print_json, OutputFormat};

pub fn show_bmi(weight_kg: f64, height_cm: f64, format: OutputFormat) -> Result<()> {
    let result = calculate_bmi(weight_kg, height_cm)?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!(
                "BMI {:.1} ({}): {}",
                result.bmi,
                color_category(&result.category),
                result.advice
            );
        }
    }
    Ok(())
}
