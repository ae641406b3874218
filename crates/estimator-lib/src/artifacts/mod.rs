//! Trained artifact bundle and its persistence
//!
//! A bundle is the (model, scaler, feature list) triple produced by one
//! training run. It is immutable once built; consumers share it behind an
//! `Arc`. On disk it is three blobs: the serialized forest, the serialized
//! scaler and the newline-separated feature list. A manifest holding the
//! SHA-256 of each blob is written after them and ties the three to one run.

mod cache;
mod store;

pub use cache::{ArtifactCache, BundleSource, LoadedBundle};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};

use crate::error::{EstimatorError, Result};
use crate::predictor::{FeatureSet, RandomForestRegressor, StandardScaler};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Blob key for the serialized forest
pub const MODEL_KEY: &str = "bodyfat_model.json";

/// Blob key for the serialized scaler
pub const SCALER_KEY: &str = "scaler.json";

/// Blob key for the feature list
pub const FEATURES_KEY: &str = "features.txt";

/// Blob key for the manifest, always written last
pub const MANIFEST_KEY: &str = "manifest.json";

/// Serialized form of a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBlobs {
    pub model: Vec<u8>,
    pub scaler: Vec<u8>,
    pub features: Vec<u8>,
}

/// Per-blob digests of one persisted bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub model_sha256: String,
    pub scaler_sha256: String,
    pub features_sha256: String,
}

impl ArtifactManifest {
    pub fn for_blobs(blobs: &ArtifactBlobs) -> Self {
        Self {
            model_sha256: sha256_hex(&blobs.model),
            scaler_sha256: sha256_hex(&blobs.scaler),
            features_sha256: sha256_hex(&blobs.features),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| EstimatorError::Artifact(format!("corrupt manifest: {}", e)))
    }

    /// Reject blobs that were not all written by the run this manifest describes
    pub fn verify(&self, blobs: &ArtifactBlobs) -> Result<()> {
        let actual = Self::for_blobs(blobs);
        let stale: Vec<&str> = [
            (MODEL_KEY, self.model_sha256 == actual.model_sha256),
            (SCALER_KEY, self.scaler_sha256 == actual.scaler_sha256),
            (FEATURES_KEY, self.features_sha256 == actual.features_sha256),
        ]
        .into_iter()
        .filter(|(_, matches)| !matches)
        .map(|(key, _)| key)
        .collect();

        if !stale.is_empty() {
            return Err(EstimatorError::Artifact(format!(
                "blobs do not match manifest: {}",
                stale.join(", ")
            )));
        }
        Ok(())
    }
}

/// Model, scaler and feature order from a single training run
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    model: RandomForestRegressor,
    scaler: StandardScaler,
    features: FeatureSet,
    fingerprint: String,
}

impl ArtifactBundle {
    /// Assemble a bundle, checking that all three parts agree on width
    pub fn new(
        model: RandomForestRegressor,
        scaler: StandardScaler,
        features: FeatureSet,
    ) -> Result<Self> {
        check_widths(&model, &scaler, &features)?;
        let mut bundle = Self {
            model,
            scaler,
            features,
            fingerprint: String::new(),
        };
        bundle.fingerprint = fingerprint(&bundle.to_blobs()?);
        Ok(bundle)
    }

    pub fn model(&self) -> &RandomForestRegressor {
        &self.model
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// SHA-256 over the serialized blobs, hex encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// First 12 hex characters of the fingerprint, for logs and metrics
    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..self.fingerprint.len().min(12)]
    }

    pub fn to_blobs(&self) -> Result<ArtifactBlobs> {
        Ok(ArtifactBlobs {
            model: serde_json::to_vec(&self.model)?,
            scaler: serde_json::to_vec(&self.scaler)?,
            features: self.features.to_text().into_bytes(),
        })
    }

    /// Read the three blobs from a store, check them against the manifest, decode
    pub fn load_from(store: &dyn ArtifactStore) -> Result<Self> {
        let manifest = ArtifactManifest::from_bytes(&store.load(MANIFEST_KEY)?)?;
        let blobs = ArtifactBlobs {
            model: store.load(MODEL_KEY)?,
            scaler: store.load(SCALER_KEY)?,
            features: store.load(FEATURES_KEY)?,
        };
        manifest.verify(&blobs)?;
        Self::from_blobs(&blobs)
    }

    /// Decode a bundle; any corrupt or mismatched blob is an artifact error
    pub fn from_blobs(blobs: &ArtifactBlobs) -> Result<Self> {
        let model: RandomForestRegressor = serde_json::from_slice(&blobs.model)
            .map_err(|e| EstimatorError::Artifact(format!("corrupt model blob: {}", e)))?;
        let scaler: StandardScaler = serde_json::from_slice(&blobs.scaler)
            .map_err(|e| EstimatorError::Artifact(format!("corrupt scaler blob: {}", e)))?;
        let text = std::str::from_utf8(&blobs.features)
            .map_err(|e| EstimatorError::Artifact(format!("feature list is not UTF-8: {}", e)))?;
        let features = FeatureSet::from_text(text)?;

        model.validate()?;
        check_widths(&model, &scaler, &features)?;
        Ok(Self {
            model,
            scaler,
            features,
            fingerprint: fingerprint(blobs),
        })
    }
}

fn check_widths(
    model: &RandomForestRegressor,
    scaler: &StandardScaler,
    features: &FeatureSet,
) -> Result<()> {
    if scaler.n_features() != features.len() || model.n_features() != features.len() {
        return Err(EstimatorError::Artifact(format!(
            "artifact mismatch: {} features, scaler width {}, model width {}",
            features.len(),
            scaler.n_features(),
            model.n_features()
        )));
    }
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn fingerprint(blobs: &ArtifactBlobs) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&blobs.model);
    hasher.update(&blobs.scaler);
    hasher.update(&blobs.features);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained_bundle() -> ArtifactBundle {
        crate::testing::trained_bundle().unwrap()
    }

    #[test]
    fn test_blobs_roundtrip_keeps_fingerprint() {
        let bundle = trained_bundle();
        let restored = ArtifactBundle::from_blobs(&bundle.to_blobs().unwrap()).unwrap();
        assert_eq!(restored.fingerprint(), bundle.fingerprint());
        assert_eq!(restored.features(), bundle.features());
        assert_eq!(bundle.fingerprint().len(), 64);
        assert_eq!(bundle.short_fingerprint().len(), 12);
    }

    #[test]
    fn test_corrupt_model_blob_rejected() {
        let mut blobs = trained_bundle().to_blobs().unwrap();
        blobs.model = b"not json".to_vec();
        let err = ArtifactBundle::from_blobs(&blobs).unwrap_err();
        assert!(matches!(err, EstimatorError::Artifact(_)));
    }

    #[test]
    fn test_feature_list_mismatch_rejected() {
        let mut blobs = trained_bundle().to_blobs().unwrap();
        blobs.features = b"Age\nWeight".to_vec();
        let err = ArtifactBundle::from_blobs(&blobs).unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_manifest_flags_stale_blob() {
        let blobs = trained_bundle().to_blobs().unwrap();
        let manifest = ArtifactManifest::for_blobs(&blobs);
        manifest.verify(&blobs).unwrap();

        let mut mixed = blobs.clone();
        mixed.scaler = br#"{"mean":[0.0],"scale":[1.0]}"#.to_vec();
        let err = manifest.verify(&mixed).unwrap_err();
        assert!(matches!(err, EstimatorError::Artifact(_)));
        assert!(err.to_string().contains(SCALER_KEY));
    }

    #[test]
    fn test_out_of_range_split_feature_rejected() {
        let blobs = trained_bundle().to_blobs().unwrap();
        let model = String::from_utf8(blobs.model.clone()).unwrap();
        let start = model.find("\"feature\":").unwrap() + "\"feature\":".len();
        let end = start + model[start..].find(|c: char| !c.is_ascii_digit()).unwrap();
        let tampered = format!("{}99{}", &model[..start], &model[end..]);

        let err = ArtifactBundle::from_blobs(&ArtifactBlobs {
            model: tampered.into_bytes(),
            ..blobs
        })
        .unwrap_err();
        assert!(matches!(err, EstimatorError::Artifact(_)));
        assert!(err.to_string().contains("feature index 99"));
    }
}
