use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Role assigned to a scanned file by the ordered classification rules.
///
/// Anything that matches no rule is `Production`; nothing is treated as
/// disposable by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Temporary,
    Production,
    Test,
    Config,
    Documentation,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Temporary => "temporary",
            FileCategory::Production => "production",
            FileCategory::Test => "test",
            FileCategory::Config => "config",
            FileCategory::Documentation => "documentation",
        }
    }
}

/// One scanned file. Created by a scan, immutable, superseded by the next
/// scan's record for the same path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the scan root. Unique key within one scan.
    pub rel_path: PathBuf,
    pub file_size: u64,
    /// Hex-encoded blake3 digest of the file bytes.
    pub digest: String,
    pub category: FileCategory,
    pub last_modified: DateTime<Utc>,
}

/// Files sharing one digest. Only built for groups of two or more members;
/// recomputed on every scan.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub digest: String,
    pub file_size: u64,
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Bytes that would be reclaimed by keeping a single survivor.
    pub fn wasted_bytes(&self) -> u64 {
        self.file_size * (self.members.len() as u64 - 1)
    }
}

/// A file the scanner could not read. Recorded instead of aborting the scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanError {
    pub rel_path: PathBuf,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasted_bytes_counts_all_but_one_member() {
        let record = |p: &str| FileRecord {
            rel_path: PathBuf::from(p),
            file_size: 100,
            digest: "abc".into(),
            category: FileCategory::Production,
            last_modified: Utc::now(),
        };
        let group = DuplicateGroup {
            digest: "abc".into(),
            file_size: 100,
            members: vec![record("a"), record("b"), record("c")],
        };
        assert_eq!(group.wasted_bytes(), 200);
    }
}
