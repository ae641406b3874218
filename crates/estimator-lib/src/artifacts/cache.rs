//! Load-or-train artifact cache

use super::{
    ArtifactBundle, ArtifactManifest, ArtifactStore, FEATURES_KEY, MANIFEST_KEY, MODEL_KEY,
    SCALER_KEY,
};
use crate::error::Result;
use crate::predictor::{ModelTrainer, TrainingReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the active bundle came from
#[derive(Debug, Clone)]
pub enum BundleSource {
    /// Read back from the store
    Cache,
    /// Freshly trained (and persisted, if `persisted` is true)
    Trained {
        report: TrainingReport,
        persisted: bool,
    },
}

/// Bundle plus its provenance
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    pub bundle: ArtifactBundle,
    pub source: BundleSource,
}

/// Resolves the process's artifact bundle from storage, training on a miss.
///
/// Every call returns one complete bundle: the three blobs are decoded and
/// cross-checked together, and a training run produces all three at once,
/// so model and scaler never come from different runs.
pub struct ArtifactCache {
    store: Arc<dyn ArtifactStore>,
    dataset_path: PathBuf,
    trainer: ModelTrainer,
}

impl ArtifactCache {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        dataset_path: impl Into<PathBuf>,
        trainer: ModelTrainer,
    ) -> Self {
        Self {
            store,
            dataset_path: dataset_path.into(),
            trainer,
        }
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Read the stored bundle without falling back to training
    pub fn load(&self) -> Result<ArtifactBundle> {
        ArtifactBundle::load_from(self.store.as_ref())
    }

    /// Stored bundle if usable, otherwise train from the dataset and persist
    pub fn load_or_train(&self) -> Result<LoadedBundle> {
        match self.load() {
            Ok(bundle) => {
                info!(
                    location = %self.store.describe(),
                    fingerprint = %bundle.short_fingerprint(),
                    "Loaded cached artifacts"
                );
                Ok(LoadedBundle {
                    bundle,
                    source: BundleSource::Cache,
                })
            }
            Err(e) => {
                warn!(
                    location = %self.store.describe(),
                    error = %e,
                    "Cached artifacts unavailable, training a new model"
                );
                self.train_and_persist(false)
            }
        }
    }

    /// Train a fresh bundle regardless of the cache and overwrite it
    pub fn retrain(&self) -> Result<LoadedBundle> {
        self.train_and_persist(true)
    }

    /// Persist a bundle as the three named blobs, then the manifest.
    ///
    /// Until the manifest lands, a reader sees blobs that disagree with the
    /// previous manifest and rejects them, so a partial write never loads.
    pub fn persist(&self, bundle: &ArtifactBundle) -> Result<()> {
        let blobs = bundle.to_blobs()?;
        let manifest = ArtifactManifest::for_blobs(&blobs);
        self.store.save(FEATURES_KEY, &blobs.features)?;
        self.store.save(SCALER_KEY, &blobs.scaler)?;
        self.store.save(MODEL_KEY, &blobs.model)?;
        self.store.save(MANIFEST_KEY, &manifest.to_bytes()?)?;
        Ok(())
    }

    fn train_and_persist(&self, require_persist: bool) -> Result<LoadedBundle> {
        info!(dataset = %self.dataset_path.display(), "Training model");
        let trained = self.trainer.train_from_path(&self.dataset_path)?;

        let persisted = match self.persist(&trained.bundle) {
            Ok(()) => {
                info!(
                    location = %self.store.describe(),
                    fingerprint = %trained.bundle.short_fingerprint(),
                    "Persisted trained artifacts"
                );
                true
            }
            Err(e) if require_persist => return Err(e),
            Err(e) => {
                warn!(error = %e, "Failed to persist trained artifacts, continuing in memory");
                false
            }
        };

        Ok(LoadedBundle {
            bundle: trained.bundle,
            source: BundleSource::Trained {
                report: trained.report,
                persisted,
            },
        })
    }
}
