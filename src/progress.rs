/// Trait for reporting pipeline progress.
///
/// The CLI implements this with indicatif bars; library callers and tests use
/// `SilentReporter`. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _files_found: usize) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_hash_progress(&self, _files_hashed: usize, _total_files: usize) {}
    fn on_hash_complete(&self, _duplicate_groups: usize, _duration_secs: f64) {}
    fn on_phase_start(&self, _phase: &str) {}
    fn on_phase_complete(&self, _phase: &str, _acted_on: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
