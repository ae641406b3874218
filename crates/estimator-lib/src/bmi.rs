//! Body mass index classification

use crate::error::{EstimatorError, Result};
use crate::predictor::round1;
use serde::{Deserialize, Serialize};

/// Weight used when a request carries none
pub const DEFAULT_WEIGHT_KG: f64 = 75.0;

/// Height used when a request carries none
pub const DEFAULT_HEIGHT_CM: f64 = 175.0;

/// BMI with its category and advice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiResult {
    /// Rounded to one decimal
    pub bmi: f64,
    pub category: String,
    pub advice: String,
}

/// `(lower inclusive bound, category, advice)`, ascending
const BMI_BANDS: [(f64, &str, &str); 4] = [
    (0.0, "underweight", "increase calories and activity"),
    (18.5, "normal weight", "maintain regimen"),
    (25.0, "overweight", "reduce calories, increase activity"),
    (30.0, "obese", "consult a nutrition specialist"),
];

/// `weight_kg / (height_cm / 100)^2`, classified on the unrounded value
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> Result<BmiResult> {
    if !(height_cm.is_finite() && height_cm > 0.0) {
        return Err(EstimatorError::Validation(format!(
            "height must be a positive number of centimetres, got {}",
            height_cm
        )));
    }

    let meters = height_cm / 100.0;
    let bmi = weight_kg / (meters * meters);
    let (_, category, advice) = BMI_BANDS
        .iter()
        .rev()
        .find(|(lower, _, _)| bmi >= *lower)
        .unwrap_or(&BMI_BANDS[0]);

    Ok(BmiResult {
        bmi: round1(bmi),
        category: category.to_string(),
        advice: advice.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Weight that yields exactly `bmi` at 100 cm
    fn at(bmi: f64) -> BmiResult {
        calculate_bmi(bmi, 100.0).unwrap()
    }

    #[test]
    fn test_reference_example() {
        let result = calculate_bmi(70.0, 175.0).unwrap();
        assert_eq!(result.bmi, 22.9);
        assert_eq!(result.category, "normal weight");
        assert_eq!(result.advice, "maintain regimen");
    }

    #[test]
    fn test_boundaries_go_to_upper_band() {
        assert_eq!(at(18.4).category, "underweight");
        assert_eq!(at(18.5).category, "normal weight");
        assert_eq!(at(25.0).category, "overweight");
        assert_eq!(at(30.0).category, "obese");
        assert_eq!(at(29.99).category, "overweight");
    }

    #[test]
    fn test_bands_exhaustive() {
        for tenth in 1..600 {
            let result = at(tenth as f64 / 10.0);
            assert!(!result.category.is_empty());
            assert!(!result.advice.is_empty());
        }
    }

    #[test]
    fn test_non_positive_height_rejected() {
        assert!(calculate_bmi(70.0, 0.0).is_err());
        assert!(calculate_bmi(70.0, -170.0).is_err());
        assert!(calculate_bmi(70.0, f64::NAN).is_err());
    }
}
