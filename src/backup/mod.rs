pub mod manifest;

use crate::error::Error;
use crate::scanner::digest;
use chrono::{DateTime, Utc};
use manifest::{BackupManifest, ManifestEntry};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

/// One backup run: an isolated, timestamp-qualified directory owned by a
/// single pipeline invocation. Constructed per run and discarded after;
/// there is no shared or global store.
pub struct BackupStore {
    run_dir: PathBuf,
}

#[derive(Debug)]
pub struct BackupRunInfo {
    pub run_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub entry_count: usize,
    pub total_bytes: u64,
}

impl BackupStore {
    /// Create a fresh run directory under `backup_root`. The timestamped name
    /// keeps concurrent and historical runs from ever sharing a directory; on
    /// a same-second collision a numeric suffix is appended.
    pub fn create(backup_root: &Path) -> Result<Self, Error> {
        fs::create_dir_all(backup_root)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let mut run_dir = backup_root.join(format!("run_{stamp}"));
        let mut suffix = 1;
        while run_dir.exists() {
            run_dir = backup_root.join(format!("run_{stamp}_{suffix}"));
            suffix += 1;
        }
        fs::create_dir_all(run_dir.join(FILES_DIR))?;
        debug!("Backup run directory: {}", run_dir.display());
        Ok(BackupStore { run_dir })
    }

    /// Open an existing run directory (for restore).
    pub fn open(run_dir: &Path) -> Result<Self, Error> {
        if !run_dir.join(MANIFEST_FILE).is_file() {
            return Err(Error::Integrity(format!(
                "no manifest found in {}",
                run_dir.display()
            )));
        }
        Ok(BackupStore {
            run_dir: run_dir.to_path_buf(),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.run_dir.join(MANIFEST_FILE)
    }

    /// Copy every file into the run directory and persist the manifest.
    ///
    /// Each copy is digest-verified immediately: a mismatch means the backup
    /// cannot be trusted as a rollback point, so the whole operation fails
    /// before the caller gets a manifest to destroy files against.
    ///
    /// Within one run the manifest is append-only: later phases add their
    /// entries to the same manifest. Paths already backed up are not copied
    /// twice; the first copy is the pre-mutation state worth keeping.
    pub fn backup_files(&self, root: &Path, rel_paths: &[PathBuf]) -> Result<BackupManifest, Error> {
        for rel_path in rel_paths {
            self.backup_file(root, rel_path)?;
        }
        let manifest = self.load_or_new_manifest()?;
        info!(
            "Backed up {} files ({} bytes) to {}",
            manifest.entries.len(),
            manifest.total_bytes(),
            self.run_dir.display()
        );
        Ok(manifest)
    }

    /// Back up a single file and persist the updated manifest before
    /// returning, so the entry is durable before the caller mutates
    /// anything. A path already in the manifest is not copied twice; the
    /// first copy is the pre-mutation state worth keeping.
    pub fn backup_file(&self, root: &Path, rel_path: &Path) -> Result<(), Error> {
        let mut manifest = self.load_or_new_manifest()?;
        if manifest.contains(rel_path) {
            return Ok(());
        }

        let source = root.join(rel_path);
        let backup_rel = Path::new(FILES_DIR).join(rel_path);
        let target = self.run_dir.join(&backup_rel);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let source_digest = digest::hash_file(&source)?;
        let file_size = fs::metadata(&source)?.len();
        fs::copy(&source, &target)?;

        let copy_digest = digest::hash_file(&target)?;
        if copy_digest != source_digest {
            return Err(Error::Integrity(format!(
                "backup copy of {} does not match source (expected {}, got {})",
                rel_path.display(),
                source_digest,
                copy_digest
            )));
        }

        manifest.entries.push(ManifestEntry {
            original_path: rel_path.to_path_buf(),
            backup_path: backup_rel,
            digest: source_digest,
            file_size,
        });
        manifest.save(&self.manifest_path())
    }

    fn load_or_new_manifest(&self) -> Result<BackupManifest, Error> {
        if self.manifest_path().is_file() {
            self.load_manifest()
        } else {
            Ok(BackupManifest::new())
        }
    }

    pub fn load_manifest(&self) -> Result<BackupManifest, Error> {
        BackupManifest::load(&self.manifest_path())
    }

    /// Copy every manifest entry back to its original path, creating parent
    /// directories as needed. All entries are attempted; if any fail, the
    /// restore as a whole is an integrity error naming exactly what could not
    /// be copied back, so the operator knows the tree is partially restored.
    pub fn restore(&self, root: &Path) -> Result<usize, Error> {
        let manifest = self.load_manifest()?;
        let mut restored = 0usize;
        let mut failures: Vec<String> = Vec::new();

        for entry in &manifest.entries {
            let source = self.run_dir.join(&entry.backup_path);
            let target = root.join(&entry.original_path);

            if !source.is_file() {
                failures.push(format!(
                    "{}: backup copy missing at {}",
                    entry.original_path.display(),
                    source.display()
                ));
                continue;
            }

            if let Some(parent) = target.parent() {
                if let Err(err) = fs::create_dir_all(parent) {
                    failures.push(format!("{}: {}", entry.original_path.display(), err));
                    continue;
                }
            }

            match fs::copy(&source, &target) {
                Ok(_) => restored += 1,
                Err(err) => failures.push(format!("{}: {}", entry.original_path.display(), err)),
            }
        }

        if !failures.is_empty() {
            warn!(
                "Restore from {} incomplete: {} of {} entries restored",
                self.run_dir.display(),
                restored,
                manifest.entries.len()
            );
            return Err(Error::Integrity(format!(
                "restore incomplete ({restored} restored): {}",
                failures.join("; ")
            )));
        }

        info!(
            "Restored {} files from {}",
            restored,
            self.run_dir.display()
        );
        Ok(restored)
    }
}

/// Enumerate backup runs under `backup_root`, oldest first.
pub fn list_backups(backup_root: &Path) -> Result<Vec<BackupRunInfo>, Error> {
    let mut runs = Vec::new();
    if !backup_root.is_dir() {
        return Ok(runs);
    }

    for entry in fs::read_dir(backup_root)? {
        let entry = entry?;
        let manifest_path = entry.path().join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            continue;
        }
        let manifest = BackupManifest::load(&manifest_path)?;
        runs.push(BackupRunInfo {
            run_dir: entry.path(),
            created_at: manifest.created_at,
            entry_count: manifest.entries.len(),
            total_bytes: manifest.total_bytes(),
        });
    }

    runs.sort_by_key(|r| r.created_at);
    Ok(runs)
}

/// Explicit retention: delete the oldest runs, keeping the `keep` most
/// recent. A run's manifest and copies are one unit; the whole run
/// directory goes. Returns the number of runs removed.
pub fn purge_backups(backup_root: &Path, keep: usize) -> Result<usize, Error> {
    let runs = list_backups(backup_root)?;
    if runs.len() <= keep {
        return Ok(0);
    }

    let remove_count = runs.len() - keep;
    for run in runs.iter().take(remove_count) {
        fs::remove_dir_all(&run.run_dir)?;
        info!("Purged backup run {}", run.run_dir.display());
    }
    Ok(remove_count)
}
