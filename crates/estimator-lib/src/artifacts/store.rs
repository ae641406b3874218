//! Key-value blob storage for artifacts

use crate::error::{EstimatorError, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Opaque blob store with whole-value load and save
pub trait ArtifactStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Vec<u8>>;

    fn save(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Stores each blob as a file in one directory
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path_for(key))?)
    }

    /// Write to a temp file, fsync, then rename over the final path
    fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(key);
        let temp_path = self.dir.join(format!(".{}.tmp", key));
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// In-process store, used by tests and embedders without a filesystem
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(key))
            .unwrap_or(false)
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| EstimatorError::Artifact(format!("store lock poisoned: {}", e)))?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| EstimatorError::Artifact(format!("no blob stored under '{}'", key)))
    }

    fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| EstimatorError::Artifact(format!("store lock poisoned: {}", e)))?;
        blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("nested"));

        store.save("features.txt", b"Age\nWeight").unwrap();
        assert_eq!(store.load("features.txt").unwrap(), b"Age\nWeight");
        assert!(!dir.path().join("nested/.features.txt.tmp").exists());
    }

    #[test]
    fn test_fs_store_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store.save("k", b"one").unwrap();
        store.save("k", b"two").unwrap();
        assert_eq!(store.load("k").unwrap(), b"two");
    }

    #[test]
    fn test_fs_store_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert!(matches!(store.load("absent"), Err(EstimatorError::Io(_))));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryArtifactStore::new();
        assert!(store.load("k").is_err());
        store.save("k", b"v").unwrap();
        assert!(store.contains("k"));
        assert_eq!(store.load("k").unwrap(), b"v");
    }
}
