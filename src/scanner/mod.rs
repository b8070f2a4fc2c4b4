pub mod classify;
pub mod digest;
pub mod walk;

use crate::config::AppConfig;
use crate::error::Error;
use crate::model::{DuplicateGroup, FileRecord, ScanError};
use crate::progress::ProgressReporter;
use crate::utils;
use chrono::{DateTime, Utc};
use classify::CategoryRules;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

/// Result of one tree scan. Records are sorted by relative path, so two scans
/// of an unchanged tree are byte-for-byte identical regardless of how the
/// parallel hashing interleaved.
#[derive(Debug)]
pub struct Inventory {
    pub records: Vec<FileRecord>,
    pub duplicate_groups: BTreeMap<String, DuplicateGroup>,
    pub errors: Vec<ScanError>,
}

#[derive(Debug)]
pub struct ScanStats {
    pub total_files: usize,
    pub total_bytes: u64,
    pub duplicate_groups: usize,
    pub wasted_bytes: u64,
}

impl Inventory {
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            total_files: self.records.len(),
            total_bytes: self.records.iter().map(|r| r.file_size).sum(),
            duplicate_groups: self.duplicate_groups.len(),
            wasted_bytes: self
                .duplicate_groups
                .values()
                .map(|g| g.wasted_bytes())
                .sum(),
        }
    }

    pub fn record_for(&self, rel_path: &Path) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.rel_path == rel_path)
    }
}

/// Walk `root`, classify and digest every file, and group duplicates.
///
/// Unreadable files land in `errors` rather than aborting the scan. Hashing
/// runs on the rayon pool; everything downstream sees sorted output only.
pub fn scan(
    root: &Path,
    config: &AppConfig,
    reporter: &dyn ProgressReporter,
) -> Result<Inventory, Error> {
    let rules = CategoryRules::from_config(config)?;

    reporter.on_scan_start();
    let scan_start = Instant::now();
    let size_map = walk::build_size_to_files_map(root, &config.ignore_dirs)?;
    let paths: Vec<(PathBuf, u64)> = size_map
        .into_iter()
        .flat_map(|(size, files)| files.into_iter().map(move |f| (f, size)))
        .collect();
    let scan_duration = scan_start.elapsed();
    reporter.on_scan_complete(paths.len(), scan_duration.as_secs_f64());
    debug!(
        "Walk completed in {:.2}s — {} files",
        scan_duration.as_secs_f64(),
        paths.len()
    );

    reporter.on_hash_start(paths.len());
    let hash_start = Instant::now();
    let records: Mutex<Vec<FileRecord>> = Mutex::new(Vec::with_capacity(paths.len()));
    let errors: Mutex<Vec<ScanError>> = Mutex::new(Vec::new());
    let hashed = AtomicUsize::new(0);

    paths.par_iter().for_each(|(path, size)| {
        let rel_path = utils::relative_to(path, root);
        match build_record(path, rel_path.clone(), *size, &rules) {
            Ok(record) => records.lock().unwrap().push(record),
            Err(err) => errors.lock().unwrap().push(ScanError {
                rel_path,
                message: err.to_string(),
            }),
        }
        let done = hashed.fetch_add(1, Ordering::Relaxed) + 1;
        reporter.on_hash_progress(done, paths.len());
    });

    let mut records = records.into_inner().unwrap();
    let mut errors = errors.into_inner().unwrap();
    // Parallelism must never be observable downstream.
    records.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    errors.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    let duplicate_groups = group_duplicates(&records);
    let hash_duration = hash_start.elapsed();
    reporter.on_hash_complete(duplicate_groups.len(), hash_duration.as_secs_f64());

    info!(
        "Scanned {} files ({} unreadable), {} duplicate groups",
        records.len(),
        errors.len(),
        duplicate_groups.len()
    );

    Ok(Inventory {
        records,
        duplicate_groups,
        errors,
    })
}

fn build_record(
    path: &Path,
    rel_path: PathBuf,
    size: u64,
    rules: &CategoryRules,
) -> std::io::Result<FileRecord> {
    let metadata = fs::metadata(path)?;
    let last_modified: DateTime<Utc> = metadata.modified()?.into();
    let digest = digest::hash_file(path)?;

    Ok(FileRecord {
        category: rules.classify(&rel_path),
        rel_path,
        file_size: size,
        digest,
        last_modified,
    })
}

/// Group records by digest. Input must already be path-sorted, which makes
/// group member order deterministic too. Single-member groups are dropped,
/// as are zero-byte files; every empty `__init__.py` shares one digest and
/// none of them is a duplicate worth consolidating.
fn group_duplicates(records: &[FileRecord]) -> BTreeMap<String, DuplicateGroup> {
    let mut by_digest: BTreeMap<String, Vec<FileRecord>> = BTreeMap::new();
    for record in records {
        by_digest
            .entry(record.digest.clone())
            .or_default()
            .push(record.clone());
    }

    by_digest
        .into_iter()
        .filter(|(_, members)| members.len() > 1 && members[0].file_size > 0)
        .map(|(digest, members)| {
            let group = DuplicateGroup {
                digest: digest.clone(),
                file_size: members[0].file_size,
                members,
            };
            (digest, group)
        })
        .collect()
}
