use crate::cleanup::CleanupPlan;
use crate::reorg::FileMapping;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Pipeline phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scan,
    Cleanup,
    Redact,
    Reorganize,
    Validate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Scan => "scan",
            Phase::Cleanup => "cleanup",
            Phase::Redact => "redact",
            Phase::Reorganize => "reorganize",
            Phase::Validate => "validate",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportError {
    pub path: PathBuf,
    pub phase: Phase,
    pub message: String,
}

/// Per-phase accounting. This plus `ReportError` is the whole machine
/// contract; nothing downstream should parse log text.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub considered: usize,
    pub acted_on: usize,
    pub bytes_affected: u64,
    pub errors: Vec<ReportError>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        PhaseReport {
            phase,
            considered: 0,
            acted_on: 0,
            bytes_affected: 0,
            errors: Vec::new(),
        }
    }

    pub fn push_error(&mut self, path: PathBuf, message: String) {
        self.errors.push(ReportError {
            path,
            phase: self.phase,
            message,
        });
    }
}

/// Secret finding as it appears in the report: location and category only.
/// The matched text stays out of the report on purpose; the report file
/// must never become a secrets inventory itself.
#[derive(Debug, Clone, Serialize)]
pub struct FindingSummary {
    pub path: PathBuf,
    pub line_number: usize,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub mode: String,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub phases: Vec<PhaseReport>,
    pub backup_manifest: Option<PathBuf>,
    pub advisories: Vec<String>,
    pub cleanup_plan: Option<CleanupPlan>,
    pub layout_plan: Option<Vec<FileMapping>>,
    pub secret_findings: Vec<FindingSummary>,
}

impl RunReport {
    pub fn new(mode: &str, root: &Path) -> Self {
        RunReport {
            mode: mode.to_string(),
            root: root.to_path_buf(),
            started_at: Utc::now(),
            finished_at: None,
            phases: Vec::new(),
            backup_manifest: None,
            advisories: Vec::new(),
            cleanup_plan: None,
            layout_plan: None,
            secret_findings: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Partial failure is not silent success: any per-item error anywhere
    /// makes the run exit non-zero.
    pub fn has_errors(&self) -> bool {
        self.phases.iter().any(|p| !p.errors.is_empty())
    }

    pub fn error_count(&self) -> usize {
        self.phases.iter().map(|p| p.errors.len()).sum()
    }

    pub fn save(&self, path: &Path) -> Result<(), crate::error::Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
