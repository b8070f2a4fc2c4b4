pub mod strategy;

use crate::backup::BackupStore;
use crate::config::AppConfig;
use crate::error::Error;
use crate::model::{FileCategory, ScanError};
use crate::scanner::Inventory;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strategy::SurvivorStrategy;
use tracing::{info, warn};

/// Why a file is slated for removal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemovalReason {
    Temporary,
    Duplicate { survivor: PathBuf },
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedRemoval {
    pub rel_path: PathBuf,
    pub file_size: u64,
    pub digest: String,
    pub reason: RemovalReason,
}

/// A duplicate group the strategy could not resolve: every member looks
/// disposable, so nothing is clearly primary. Flagged to the operator and
/// left on disk.
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousGroup {
    pub digest: String,
    pub members: Vec<PathBuf>,
}

/// The dry-run report. `execute` applies exactly this; planning and
/// execution share one code path, only the apply-to-disk step differs.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupPlan {
    pub strategy: String,
    pub removals: Vec<PlannedRemoval>,
    pub ambiguous_groups: Vec<AmbiguousGroup>,
}

impl CleanupPlan {
    pub fn bytes_planned(&self) -> u64 {
        self.removals.iter().map(|r| r.file_size).sum()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.removals.iter().map(|r| r.rel_path.clone()).collect()
    }
}

#[derive(Debug)]
pub struct CleanupExecution {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<ScanError>,
    pub manifest_path: PathBuf,
    pub bytes_removed: u64,
}

#[derive(Debug)]
pub struct ValidationOutcome {
    pub still_present: Vec<PathBuf>,
    pub advisories: Vec<String>,
}

/// Cleanup run lifecycle. `Executing` is reachable only from `DryRun`
/// computed in the same run; preview before destroy is structural, not a
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Planning,
    DryRun,
    Executing,
    Validating,
    Done,
}

pub struct CleanupEngine {
    strategy: SurvivorStrategy,
    target_top_level_count: Option<usize>,
    state: RunState,
}

impl CleanupEngine {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(CleanupEngine {
            strategy: SurvivorStrategy::from_str(&config.duplicate_strategy)?,
            target_top_level_count: config.target_top_level_count,
            state: RunState::Idle,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Compute the removal plan: the full temporary set, plus every
    /// resolvable duplicate group reduced to one survivor. Deterministic for
    /// a given inventory; this IS the dry-run report.
    pub fn plan(&mut self, inventory: &Inventory) -> Result<CleanupPlan, Error> {
        if self.state != RunState::Idle {
            return Err(Error::Other(format!(
                "plan() called in state {:?}, expected Idle",
                self.state
            )));
        }
        self.state = RunState::Planning;

        let mut removals: Vec<PlannedRemoval> = Vec::new();
        let mut ambiguous_groups: Vec<AmbiguousGroup> = Vec::new();

        for record in &inventory.records {
            if record.category == FileCategory::Temporary {
                removals.push(PlannedRemoval {
                    rel_path: record.rel_path.clone(),
                    file_size: record.file_size,
                    digest: record.digest.clone(),
                    reason: RemovalReason::Temporary,
                });
            }
        }

        for group in inventory.duplicate_groups.values() {
            // Groups made up entirely of temporaries are already covered by
            // the temporary sweep.
            if group
                .members
                .iter()
                .all(|m| m.category == FileCategory::Temporary)
            {
                continue;
            }

            match self.strategy.choose(group) {
                Some(survivor_index) => {
                    let survivor = group.members[survivor_index].rel_path.clone();
                    for (index, member) in group.members.iter().enumerate() {
                        if index == survivor_index {
                            continue;
                        }
                        // Temporaries in a mixed group are swept above.
                        if member.category == FileCategory::Temporary {
                            continue;
                        }
                        removals.push(PlannedRemoval {
                            rel_path: member.rel_path.clone(),
                            file_size: member.file_size,
                            digest: member.digest.clone(),
                            reason: RemovalReason::Duplicate {
                                survivor: survivor.clone(),
                            },
                        });
                    }
                }
                None => {
                    warn!(
                        "Duplicate group {} has no clearly primary member; flagging for operator review",
                        group.digest
                    );
                    ambiguous_groups.push(AmbiguousGroup {
                        digest: group.digest.clone(),
                        members: group.members.iter().map(|m| m.rel_path.clone()).collect(),
                    });
                }
            }
        }

        removals.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        removals.dedup_by(|a, b| a.rel_path == b.rel_path);

        self.state = RunState::DryRun;
        info!(
            "Cleanup plan: {} removals ({} bytes), {} ambiguous groups",
            removals.len(),
            removals.iter().map(|r| r.file_size).sum::<u64>(),
            ambiguous_groups.len()
        );
        Ok(CleanupPlan {
            strategy: self.strategy.as_str().to_string(),
            removals,
            ambiguous_groups,
        })
    }

    /// Apply a plan. Refused unless a dry-run report was computed by this
    /// engine immediately prior and the operator confirmed.
    ///
    /// Per item: confirm the verified backup entry exists, delete, then check
    /// the path is gone. A failing item is recorded and the batch continues.
    pub fn execute(
        &mut self,
        root: &Path,
        plan: &CleanupPlan,
        store: &BackupStore,
        confirmed: bool,
    ) -> Result<CleanupExecution, Error> {
        if self.state != RunState::DryRun {
            return Err(Error::Other(format!(
                "execute() called in state {:?}; a dry-run plan must be computed first",
                self.state
            )));
        }
        if !confirmed {
            return Err(Error::Other(
                "execute() requires explicit confirmation".to_string(),
            ));
        }
        self.state = RunState::Executing;

        let mut removed: Vec<PathBuf> = Vec::new();
        let mut failed: Vec<ScanError> = Vec::new();
        let mut bytes_removed = 0u64;

        // Per item: the backup gate first, then delete, then confirm the
        // deletion. An unreadable item is recorded and the batch moves on;
        // a digest mismatch means backups cannot be trusted and aborts.
        for item in &plan.removals {
            if let Err(err) = store.backup_file(root, &item.rel_path) {
                if matches!(err, Error::Integrity(_)) {
                    return Err(err);
                }
                failed.push(ScanError {
                    rel_path: item.rel_path.clone(),
                    message: err.to_string(),
                });
                continue;
            }
            let backup_copy = store.run_dir().join("files").join(&item.rel_path);
            if !backup_copy.is_file() {
                failed.push(ScanError {
                    rel_path: item.rel_path.clone(),
                    message: "backup copy missing on disk; refusing to delete".to_string(),
                });
                continue;
            }

            let absolute = root.join(&item.rel_path);
            if let Err(err) = fs::remove_file(&absolute) {
                failed.push(ScanError {
                    rel_path: item.rel_path.clone(),
                    message: err.to_string(),
                });
                continue;
            }
            if absolute.exists() {
                failed.push(ScanError {
                    rel_path: item.rel_path.clone(),
                    message: "file still present after deletion".to_string(),
                });
                continue;
            }
            bytes_removed += item.file_size;
            removed.push(item.rel_path.clone());
        }

        info!(
            "Cleanup executed: {} removed, {} failed, {} bytes reclaimed",
            removed.len(),
            failed.len(),
            bytes_removed
        );
        self.state = RunState::Validating;
        Ok(CleanupExecution {
            removed,
            failed,
            manifest_path: store.manifest_path(),
            bytes_removed,
        })
    }

    /// Post-condition check: every removed path must now be absent. The
    /// top-level count target is advisory only; reported, never fatal.
    pub fn validate(
        &mut self,
        root: &Path,
        execution: &CleanupExecution,
    ) -> Result<ValidationOutcome, Error> {
        if self.state != RunState::Validating {
            return Err(Error::Other(format!(
                "validate() called in state {:?}, expected Validating",
                self.state
            )));
        }

        let still_present: Vec<PathBuf> = execution
            .removed
            .iter()
            .filter(|rel| root.join(rel).exists())
            .cloned()
            .collect();

        let mut advisories = Vec::new();
        if let Some(target) = self.target_top_level_count {
            let top_level = fs::read_dir(root)?.count();
            if top_level > target {
                advisories.push(format!(
                    "top-level entry count {top_level} exceeds target {target}"
                ));
            }
        }

        self.state = RunState::Done;
        Ok(ValidationOutcome {
            still_present,
            advisories,
        })
    }
}
