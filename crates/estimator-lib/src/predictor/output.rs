//! Prediction post-processing
//!
//! Clamps raw model output to plausible body-fat bounds and maps it to a
//! descriptive band.

use serde::Serialize;

/// Lowest reported body-fat percentage
pub const MIN_BODY_FAT: f64 = 5.0;

/// Highest reported body-fat percentage
pub const MAX_BODY_FAT: f64 = 50.0;

/// Body-fat band with lower-inclusive cut point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BodyFatBand {
    /// Inclusive lower bound; the first band extends down to the clamp minimum
    pub lower: u8,
    pub category: &'static str,
    pub description: &'static str,
    pub advice: &'static str,
}

/// Bands in ascending order
pub const BODY_FAT_BANDS: [BodyFatBand; 5] = [
    BodyFatBand {
        lower: 5,
        category: "essential",
        description: "very low body fat",
        advice: "may affect health",
    },
    BodyFatBand {
        lower: 6,
        category: "athletic",
        description: "excellent athletic level",
        advice: "maintain regimen",
    },
    BodyFatBand {
        lower: 14,
        category: "fit",
        description: "good fitness level",
        advice: "continue activity",
    },
    BodyFatBand {
        lower: 18,
        category: "average",
        description: "acceptable level",
        advice: "improve diet",
    },
    BodyFatBand {
        lower: 25,
        category: "elevated",
        description: "high percentage",
        advice: "consult specialist, increase activity",
    },
];

/// Band containing `value`; values below the first cut fall in the first band
pub fn band_for(value: f64) -> &'static BodyFatBand {
    BODY_FAT_BANDS
        .iter()
        .rev()
        .find(|band| value >= f64::from(band.lower))
        .unwrap_or(&BODY_FAT_BANDS[0])
}

/// Clamp bounds for reported predictions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputConfig {
    pub min_body_fat: f64,
    pub max_body_fat: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            min_body_fat: MIN_BODY_FAT,
            max_body_fat: MAX_BODY_FAT,
        }
    }
}

/// Clamped estimate with its band
#[derive(Debug, Clone, PartialEq)]
pub struct BodyFatAssessment {
    /// Clamped value, rounded to one decimal
    pub value: f64,
    pub band: &'static BodyFatBand,
}

/// Turns raw model output into a reportable assessment
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self {
            config: OutputConfig::default(),
        }
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn clamp(&self, raw: f64) -> f64 {
        if raw.is_nan() {
            return self.config.min_body_fat;
        }
        raw.clamp(self.config.min_body_fat, self.config.max_body_fat)
    }

    pub fn assess(&self, raw: f64) -> BodyFatAssessment {
        let clamped = self.clamp(raw);
        BodyFatAssessment {
            value: round1(clamped),
            band: band_for(clamped),
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
