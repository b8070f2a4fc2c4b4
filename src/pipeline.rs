use crate::backup::BackupStore;
use crate::cleanup::CleanupEngine;
use crate::config::AppConfig;
use crate::error::Error;
use crate::model::{FileCategory, FileRecord};
use crate::progress::{ProgressReporter, SilentReporter};
use crate::redact::SecretScanner;
use crate::reorg::LayoutPlanner;
use crate::report::{FindingSummary, Phase, PhaseReport, RunReport};
use crate::scanner;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Preview,
    Execute,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Preview => "preview",
            Mode::Execute => "execute",
        }
    }
}

/// Thin driver over the five core components. Phases run in strict order
/// (scan, cleanup, redact, reorganize, re-scan-validate) and every phase
/// lands its counts and per-item errors in one aggregated report.
pub struct Pipeline<'a> {
    config: &'a AppConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Pipeline { config }
    }

    fn backup_root(&self, root: &Path) -> PathBuf {
        let configured = Path::new(&self.config.backup_root);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            root.join(configured)
        }
    }

    pub fn run(
        &self,
        mode: Mode,
        confirmed: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, Error> {
        let root = PathBuf::from(&self.config.root_path);
        let mut report = RunReport::new(mode.as_str(), &root);
        info!("Pipeline starting in {} mode on {}", mode.as_str(), root.display());

        // Phase 1: inventory scan.
        reporter.on_phase_start("scan");
        let inventory = scanner::scan(&root, self.config, reporter)?;
        let stats = inventory.stats();
        let mut scan_phase = PhaseReport::new(Phase::Scan);
        scan_phase.considered = stats.total_files + inventory.errors.len();
        scan_phase.acted_on = stats.total_files;
        scan_phase.bytes_affected = stats.total_bytes;
        for err in &inventory.errors {
            scan_phase.push_error(err.rel_path.clone(), err.message.clone());
        }
        report.phases.push(scan_phase);

        // Phase 2: cleanup planning. The plan is the dry-run report; execute
        // mode applies exactly this plan; same code path, same decisions.
        let mut engine = CleanupEngine::from_config(self.config)?;
        let plan = engine.plan(&inventory)?;
        for group in &plan.ambiguous_groups {
            report.advisories.push(format!(
                "duplicate group {} has no clearly primary member; {} files left untouched",
                group.digest,
                group.members.len()
            ));
        }

        match mode {
            Mode::Preview => self.run_preview(&root, &inventory, plan, &mut report)?,
            Mode::Execute => {
                self.run_execute(&root, &inventory, engine, plan, confirmed, &mut report)?
            }
        }

        report.finish();
        info!(
            "Pipeline finished: {} phases, {} errors",
            report.phases.len(),
            report.error_count()
        );
        Ok(report)
    }

    fn run_preview(
        &self,
        root: &Path,
        inventory: &scanner::Inventory,
        plan: crate::cleanup::CleanupPlan,
        report: &mut RunReport,
    ) -> Result<(), Error> {
        let mut cleanup_phase = PhaseReport::new(Phase::Cleanup);
        cleanup_phase.considered = plan.removals.len();
        cleanup_phase.bytes_affected = plan.bytes_planned();
        report.phases.push(cleanup_phase);

        let planned: HashSet<PathBuf> = plan.paths().into_iter().collect();
        let survivors = surviving_records(inventory, &planned);

        // Redact: report what would be replaced, touch nothing.
        let secret_scanner = SecretScanner::from_config(self.config)?;
        let candidates = redact_candidates(&survivors);
        let secret_report = secret_scanner.scan_files(root, &candidates);
        let mut redact_phase = PhaseReport::new(Phase::Redact);
        redact_phase.considered = candidates.len();
        for err in &secret_report.errors {
            redact_phase.push_error(err.rel_path.clone(), err.message.clone());
        }
        report.secret_findings = summarize(&secret_report.findings);
        report.phases.push(redact_phase);

        // Reorganize: plan only.
        let planner = LayoutPlanner::from_config(self.config)?;
        let mappings = planner.plan(root, &survivors)?;
        let mut reorg_phase = PhaseReport::new(Phase::Reorganize);
        reorg_phase.considered = mappings.len();
        reorg_phase.bytes_affected = mapping_bytes(&survivors, &mappings);
        report.phases.push(reorg_phase);
        report.layout_plan = Some(mappings);

        // Nothing mutated, so validation has nothing to assert.
        let mut validate_phase = PhaseReport::new(Phase::Validate);
        validate_phase.considered = inventory.records.len();
        report.phases.push(validate_phase);

        report.cleanup_plan = Some(plan);
        Ok(())
    }

    fn run_execute(
        &self,
        root: &Path,
        inventory: &scanner::Inventory,
        mut engine: CleanupEngine,
        plan: crate::cleanup::CleanupPlan,
        confirmed: bool,
        report: &mut RunReport,
    ) -> Result<(), Error> {
        let store = BackupStore::create(&self.backup_root(root))?;

        // Cleanup: backup-gated removal, then post-condition check.
        let execution = engine.execute(root, &plan, &store, confirmed)?;
        let validation = engine.validate(root, &execution)?;
        let mut cleanup_phase = PhaseReport::new(Phase::Cleanup);
        cleanup_phase.considered = plan.removals.len();
        cleanup_phase.acted_on = execution.removed.len();
        cleanup_phase.bytes_affected = execution.bytes_removed;
        for err in &execution.failed {
            cleanup_phase.push_error(err.rel_path.clone(), err.message.clone());
        }
        for path in &validation.still_present {
            cleanup_phase.push_error(path.clone(), "planned removal still present".to_string());
        }
        report.advisories.extend(validation.advisories.clone());
        report.backup_manifest = Some(execution.manifest_path.clone());
        report.phases.push(cleanup_phase);

        let removed: HashSet<PathBuf> = execution.removed.iter().cloned().collect();
        let survivors = surviving_records(inventory, &removed);

        // Redact: files about to be rewritten go into the manifest first.
        let secret_scanner = SecretScanner::from_config(self.config)?;
        let candidates = redact_candidates(&survivors);
        let secret_report = secret_scanner.scan_files(root, &candidates);
        let touched: Vec<PathBuf> = unique_paths(&secret_report.findings);
        store.backup_files(root, &touched)?;
        let (counts, redact_errors) = secret_scanner.redact_files(root, &touched);

        let size_of: HashMap<&PathBuf, u64> =
            survivors.iter().map(|r| (&r.rel_path, r.file_size)).collect();
        let mut redact_phase = PhaseReport::new(Phase::Redact);
        redact_phase.considered = candidates.len();
        redact_phase.acted_on = counts.iter().filter(|(_, n)| *n > 0).count();
        redact_phase.bytes_affected = counts
            .iter()
            .filter(|(_, n)| *n > 0)
            .filter_map(|(path, _)| size_of.get(path).copied())
            .sum();
        for err in secret_report.errors.iter().chain(redact_errors.iter()) {
            redact_phase.push_error(err.rel_path.clone(), err.message.clone());
        }
        report.secret_findings = summarize(&secret_report.findings);
        report.phases.push(redact_phase);

        // Reorganize: back up sources, move, rewrite references.
        let planner = LayoutPlanner::from_config(self.config)?;
        let mappings = planner.plan(root, &survivors)?;
        let sources: Vec<PathBuf> = mappings.iter().map(|m| m.source.clone()).collect();
        store.backup_files(root, &sources)?;
        let outcome = planner.apply(root, &mappings, self.config, Some(&store))?;

        let mut reorg_phase = PhaseReport::new(Phase::Reorganize);
        reorg_phase.considered = mappings.len();
        reorg_phase.acted_on = outcome.moved.len();
        reorg_phase.bytes_affected = mapping_bytes(&survivors, &outcome.moved);
        for (mapping, message) in &outcome.unmoved {
            reorg_phase.push_error(mapping.source.clone(), message.clone());
        }
        for err in &outcome.errors {
            reorg_phase.push_error(err.rel_path.clone(), err.message.clone());
        }
        report.phases.push(reorg_phase);

        // Final re-scan: removed paths must be gone, moved paths must exist.
        let final_inventory = scanner::scan(root, self.config, &SilentReporter)?;
        let mut validate_phase = PhaseReport::new(Phase::Validate);
        validate_phase.considered = final_inventory.records.len();
        for rel in &execution.removed {
            if root.join(rel).exists() {
                validate_phase.push_error(rel.clone(), "removed path reappeared".to_string());
            }
        }
        for mapping in &outcome.moved {
            if !root.join(&mapping.dest).is_file() {
                validate_phase.push_error(
                    mapping.dest.clone(),
                    "moved file missing at destination".to_string(),
                );
            }
        }
        report.phases.push(validate_phase);

        report.layout_plan = Some(mappings);
        report.cleanup_plan = Some(plan);
        Ok(())
    }
}

fn surviving_records(inventory: &scanner::Inventory, removed: &HashSet<PathBuf>) -> Vec<FileRecord> {
    inventory
        .records
        .iter()
        .filter(|r| !removed.contains(&r.rel_path))
        .cloned()
        .collect()
}

/// Secrets hide in configuration and live source, not in docs or test
/// fixtures; scan those two categories.
fn redact_candidates(records: &[FileRecord]) -> Vec<PathBuf> {
    records
        .iter()
        .filter(|r| matches!(r.category, FileCategory::Config | FileCategory::Production))
        .map(|r| r.rel_path.clone())
        .collect()
}

fn unique_paths(findings: &[crate::redact::SecretFinding]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    for finding in findings {
        if seen.insert(finding.rel_path.clone()) {
            paths.push(finding.rel_path.clone());
        }
    }
    paths
}

fn summarize(findings: &[crate::redact::SecretFinding]) -> Vec<FindingSummary> {
    findings
        .iter()
        .map(|f| FindingSummary {
            path: f.rel_path.clone(),
            line_number: f.line_number,
            category: f.category.clone(),
        })
        .collect()
}

fn mapping_bytes(records: &[FileRecord], mappings: &[crate::reorg::FileMapping]) -> u64 {
    let size_of: HashMap<&PathBuf, u64> = records.iter().map(|r| (&r.rel_path, r.file_size)).collect();
    mappings
        .iter()
        .filter_map(|m| size_of.get(&m.source).copied())
        .sum()
}
