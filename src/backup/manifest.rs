use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Bump when the on-disk layout changes. Loading a manifest with a different
/// version is rejected rather than silently misread.
pub const SCHEMA_VERSION: u32 = 1;

/// One backed-up file: where it came from, where the copy lives (relative to
/// the run directory), and what it hashed to at backup time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub digest: String,
    pub file_size: u64,
}

/// Durable record of one backup run. Append-only while the run is being
/// written, read-only after. The manifest and its copies are deleted
/// together, never separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<ManifestEntry>,
}

impl BackupManifest {
    pub fn new() -> Self {
        BackupManifest {
            schema_version: SCHEMA_VERSION,
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.file_size).sum()
    }

    pub fn contains(&self, original_path: &Path) -> bool {
        self.entries.iter().any(|e| e.original_path == original_path)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let json = fs::read_to_string(path)?;
        let manifest: BackupManifest = serde_json::from_str(&json)?;
        if manifest.schema_version != SCHEMA_VERSION {
            return Err(Error::Integrity(format!(
                "manifest {} has schema version {}, expected {}",
                path.display(),
                manifest.schema_version,
                SCHEMA_VERSION
            )));
        }
        Ok(manifest)
    }
}

impl Default for BackupManifest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_load_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("manifest.json");

        let mut manifest = BackupManifest::new();
        manifest.entries.push(ManifestEntry {
            original_path: PathBuf::from("b/config.json"),
            backup_path: PathBuf::from("files/b/config.json"),
            digest: "deadbeef".into(),
            file_size: 42,
        });
        manifest.save(&path).unwrap();

        let loaded = BackupManifest::load(&path).unwrap();
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].original_path, PathBuf::from("b/config.json"));
        assert!(loaded.contains(Path::new("b/config.json")));
        assert_eq!(loaded.total_bytes(), 42);
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("manifest.json");

        let mut manifest = BackupManifest::new();
        manifest.schema_version = 99;
        let json = serde_json::to_string(&manifest).unwrap();
        fs::write(&path, json).unwrap();

        match BackupManifest::load(&path) {
            Err(Error::Integrity(msg)) => assert!(msg.contains("schema version")),
            other => panic!("expected integrity error, got {:?}", other.map(|_| ())),
        }
    }
}
