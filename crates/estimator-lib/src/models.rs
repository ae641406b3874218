//! Core data models for the estimator

use crate::error::{EstimatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single inference record: named anthropometric measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    fields: BTreeMap<String, f64>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and the CLI
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Value for `name`, or `default` when the field is absent
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Coerce a JSON object into a record.
    ///
    /// Numbers are taken as-is, numeric strings are parsed, `null` is
    /// treated as an absent field. Anything else is a validation error.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut record = Self::new();
        for (name, value) in object {
            if let Some(number) = coerce_number(name, value)? {
                record.insert(name.clone(), number);
            }
        }
        Ok(record)
    }
}

impl FromIterator<(String, f64)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn coerce_number(name: &str, value: &serde_json::Value) -> Result<Option<f64>> {
    use serde_json::Value;

    let number = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    };

    match number {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(EstimatorError::Validation(format!(
            "field '{}' must be a number, got {}",
            name, value
        ))),
    }
}

/// Body-fat estimate combined with the BMI classification.
///
/// Serialized flat, as returned by the inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Clamped body-fat percentage, rounded to one decimal
    pub prediction: f64,
    pub category: String,
    pub description: String,
    pub advice: String,
    pub bmi: f64,
    pub bmi_category: String,
    pub bmi_advice: String,
}

/// Text produced by a chat provider (or the adapter's own diagnostics)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
}

impl ChatReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_json_numbers_and_strings() {
        let record = InputRecord::from_json(&object(json!({
            "Age": 25,
            "Weight": "70.5",
            "Height_cm": 175.0
        })))
        .unwrap();

        assert_eq!(record.get("Age"), Some(25.0));
        assert_eq!(record.get("Weight"), Some(70.5));
        assert_eq!(record.get("Height_cm"), Some(175.0));
    }

    #[test]
    fn test_from_json_null_is_absent() {
        let record = InputRecord::from_json(&object(json!({"Age": 30, "Neck": null}))).unwrap();
        assert!(!record.contains("Neck"));
        assert_eq!(record.get_or("Neck", 0.0), 0.0);
    }

    #[test]
    fn test_from_json_rejects_text() {
        let err = InputRecord::from_json(&object(json!({"Age": "thirty"}))).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("Age"));
    }

    #[test]
    fn test_from_json_rejects_bool_and_nested() {
        assert!(InputRecord::from_json(&object(json!({"Age": true}))).is_err());
        assert!(InputRecord::from_json(&object(json!({"Age": [1, 2]}))).is_err());
        assert!(InputRecord::from_json(&object(json!({"Age": {"v": 1}}))).is_err());
    }

    #[test]
    fn test_prediction_result_serializes_flat() {
        let result = PredictionResult {
            prediction: 17.3,
            category: "fit".into(),
            description: "good fitness level".into(),
            advice: "continue activity".into(),
            bmi: 22.9,
            bmi_category: "normal weight".into(),
            bmi_advice: "maintain regimen".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["prediction"], 17.3);
        assert_eq!(value["bmi_category"], "normal weight");
    }
}
