use crate::error::Error;
use crate::model::{DuplicateGroup, FileCategory};
use std::str::FromStr;

/// Pluggable survivor selection for duplicate consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurvivorStrategy {
    /// First member that is neither temporary nor named like a backup copy.
    Primary,
    /// Most recently modified member.
    Newest,
    /// First member already classified production.
    Production,
}

impl FromStr for SurvivorStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(SurvivorStrategy::Primary),
            "newest" => Ok(SurvivorStrategy::Newest),
            "production" => Ok(SurvivorStrategy::Production),
            other => Err(Error::Other(format!(
                "unknown duplicate strategy '{other}' (expected primary, newest, or production)"
            ))),
        }
    }
}

impl SurvivorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurvivorStrategy::Primary => "primary",
            SurvivorStrategy::Newest => "newest",
            SurvivorStrategy::Production => "production",
        }
    }

    /// Pick the surviving member of `group`, or `None` when the group is
    /// ambiguous; no member the strategy can call clearly primary. An
    /// ambiguous group is flagged to the operator, never resolved by a
    /// silent keep-the-first fallback.
    pub fn choose(&self, group: &DuplicateGroup) -> Option<usize> {
        match self {
            SurvivorStrategy::Primary => group
                .members
                .iter()
                .position(|m| m.category != FileCategory::Temporary && !is_backup_like(m)),
            SurvivorStrategy::Newest => group
                .members
                .iter()
                .enumerate()
                .max_by(|(ai, a), (bi, b)| {
                    a.last_modified
                        .cmp(&b.last_modified)
                        // Tie-break toward the earlier path so the choice is
                        // deterministic across scans.
                        .then(bi.cmp(ai))
                })
                .map(|(i, _)| i),
            SurvivorStrategy::Production => group
                .members
                .iter()
                .position(|m| m.category == FileCategory::Production),
        }
    }
}

/// Name-level check for files that are themselves backup copies.
fn is_backup_like(record: &crate::model::FileRecord) -> bool {
    let name = record
        .rel_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ["backup", "_copy", " copy", ".bak", ".orig", "_old"]
        .iter()
        .any(|marker| name.contains(marker))
}
