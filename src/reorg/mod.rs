pub mod rewrite;

use crate::backup::BackupStore;
use crate::config::{AppConfig, LayoutBucket};
use crate::error::Error;
use crate::model::{FileRecord, ScanError};
use glob::Pattern;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// One planned move. Either fully applied; file moved and references
/// rewritten; or not applied at all; a partially applied mapping is an
/// error, never a valid end state.
#[derive(Debug, Clone, Serialize)]
pub struct FileMapping {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub role: String,
}

#[derive(Debug)]
pub struct ApplyOutcome {
    pub moved: Vec<FileMapping>,
    /// Mappings that could not be applied, with the underlying cause. When
    /// non-empty, reference rewriting was skipped entirely; recovery goes
    /// through the backup store at the pipeline level.
    pub unmoved: Vec<(FileMapping, String)>,
    pub files_rewritten: usize,
    pub references_rewritten: usize,
    pub errors: Vec<ScanError>,
}

struct CompiledBucket {
    name: String,
    dest: String,
    patterns: Vec<Pattern>,
}

pub struct LayoutPlanner {
    buckets: Vec<CompiledBucket>,
}

impl LayoutPlanner {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let buckets = config
            .layout_buckets
            .iter()
            .map(compile_bucket)
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(LayoutPlanner { buckets })
    }

    /// Bucket every record by ordered pattern match and derive its
    /// destination. Files already in place and files matching no bucket are
    /// not mapped. Destination collisions and would-overwrite conflicts are
    /// planning-time errors; nothing has touched the disk yet.
    pub fn plan(&self, root: &Path, records: &[FileRecord]) -> Result<Vec<FileMapping>, Error> {
        let mut mappings: Vec<FileMapping> = Vec::new();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        for record in records {
            let bucket = match self.classify(&record.rel_path) {
                Some(bucket) => bucket,
                None => continue,
            };

            let file_name = match record.rel_path.file_name() {
                Some(name) => name,
                None => continue,
            };
            let dest_dir = bucket_dest(bucket, &record.rel_path);
            let dest = dest_dir.join(file_name);

            if dest == record.rel_path {
                continue;
            }

            if let Some(previous) = claimed.get(&dest) {
                return Err(Error::PlanningConflict(format!(
                    "both {} and {} map to {}",
                    previous.display(),
                    record.rel_path.display(),
                    dest.display()
                )));
            }

            // Refuse to plan over any file already on disk at the
            // destination. Moves are not ordered, so even a file that is
            // itself being relocated cannot be treated as vacating in time.
            if root.join(&dest).exists() {
                return Err(Error::PlanningConflict(format!(
                    "{} would overwrite existing file {}",
                    record.rel_path.display(),
                    dest.display()
                )));
            }

            claimed.insert(dest.clone(), record.rel_path.clone());
            mappings.push(FileMapping {
                source: record.rel_path.clone(),
                dest,
                role: bucket.name.clone(),
            });
        }

        info!("Layout plan: {} moves", mappings.len());
        Ok(mappings)
    }

    fn classify(&self, rel_path: &Path) -> Option<&CompiledBucket> {
        let file_name = rel_path.file_name().map(|n| n.to_string_lossy());
        self.buckets.iter().find(|bucket| {
            bucket.patterns.iter().any(|pattern| {
                pattern.matches_path(rel_path)
                    || file_name
                        .as_deref()
                        .map(|name| pattern.matches(name))
                        .unwrap_or(false)
            })
        })
    }

    /// Two-phase apply. Phase one moves every file; if anything fails the
    /// remaining moves are surfaced as unmoved and phase two never runs.
    /// Phase two rewrites references to the moved modules across the tree;
    /// with a backup store supplied, every file about to be rewritten is
    /// backed up first.
    pub fn apply(
        &self,
        root: &Path,
        mappings: &[FileMapping],
        config: &AppConfig,
        store: Option<&BackupStore>,
    ) -> Result<ApplyOutcome, Error> {
        let mut moved: Vec<FileMapping> = Vec::new();
        let mut unmoved: Vec<(FileMapping, String)> = Vec::new();

        for mapping in mappings {
            let source = root.join(&mapping.source);
            let dest = root.join(&mapping.dest);

            let result = dest
                .parent()
                .map(fs::create_dir_all)
                .unwrap_or(Ok(()))
                .and_then(|_| fs::rename(&source, &dest));

            match result {
                Ok(()) => moved.push(mapping.clone()),
                Err(err) => unmoved.push((mapping.clone(), err.to_string())),
            }
        }

        if !unmoved.is_empty() {
            warn!(
                "Layout apply incomplete: {} moved, {} unmoved; skipping reference rewrite",
                moved.len(),
                unmoved.len()
            );
            return Ok(ApplyOutcome {
                moved,
                unmoved,
                files_rewritten: 0,
                references_rewritten: 0,
                errors: Vec::new(),
            });
        }

        let (files_rewritten, references_rewritten, errors) =
            self.rewrite_tree(root, &moved, config, store)?;

        info!(
            "Layout applied: {} moves, {} references rewritten in {} files",
            moved.len(),
            references_rewritten,
            files_rewritten
        );
        Ok(ApplyOutcome {
            moved,
            unmoved,
            files_rewritten,
            references_rewritten,
            errors,
        })
    }

    /// Update every affected file's references from old module tokens to new
    /// ones. Whole-identifier substitution only. Rewrites are computed
    /// first, then the target files are backed up, then written; a file is
    /// never overwritten before its pre-rewrite state is in the manifest.
    fn rewrite_tree(
        &self,
        root: &Path,
        moved: &[FileMapping],
        config: &AppConfig,
        store: Option<&BackupStore>,
    ) -> Result<(usize, usize, Vec<ScanError>), Error> {
        let pairs: Vec<(String, String)> = moved
            .iter()
            .map(|m| (rewrite::module_token(&m.source), rewrite::module_token(&m.dest)))
            .filter(|(old, new)| old != new && !old.is_empty())
            .collect();
        if pairs.is_empty() {
            return Ok((0, 0, Vec::new()));
        }

        let mut pending: Vec<(PathBuf, String, usize)> = Vec::new();
        let mut errors: Vec<ScanError> = Vec::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| {
                !e.file_type().is_dir()
                    || e.file_name()
                        .to_str()
                        .map(|name| !config.ignore_dirs.iter().any(|d| d == name))
                        .unwrap_or(true)
            })
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let extension = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !config.rewrite_extensions.iter().any(|e| e == &extension) {
                continue;
            }

            let rel_path = crate::utils::relative_to(entry.path(), root);
            let content = match fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(err) => {
                    errors.push(ScanError {
                        rel_path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let mut updated = content;
            let mut file_count = 0usize;
            for (old, new) in &pairs {
                let (next, count) = rewrite::replace_identifier(&updated, old, new);
                updated = next;
                file_count += count;
            }

            if file_count > 0 {
                pending.push((rel_path, updated, file_count));
            }
        }

        if let Some(store) = store {
            let rel_paths: Vec<PathBuf> = pending.iter().map(|(rel, _, _)| rel.clone()).collect();
            store.backup_files(root, &rel_paths)?;
        }

        let mut files_rewritten = 0usize;
        let mut references_rewritten = 0usize;
        for (rel_path, updated, file_count) in pending {
            if let Err(err) = fs::write(root.join(&rel_path), updated) {
                errors.push(ScanError {
                    rel_path,
                    message: err.to_string(),
                });
                continue;
            }
            files_rewritten += 1;
            references_rewritten += file_count;
        }

        Ok((files_rewritten, references_rewritten, errors))
    }
}

fn compile_bucket(bucket: &LayoutBucket) -> Result<CompiledBucket, Error> {
    Ok(CompiledBucket {
        name: bucket.name.clone(),
        dest: bucket.dest.clone(),
        patterns: bucket
            .patterns
            .iter()
            .map(|g| Ok(Pattern::new(g)?))
            .collect::<Result<Vec<_>, Error>>()?,
    })
}

/// Destination directory for a file in a bucket. A `{topic}` placeholder in
/// the bucket root is filled from the leading segment of the file stem, so
/// `setup_guide.md` lands under `docs/setup/`.
fn bucket_dest(bucket: &CompiledBucket, rel_path: &Path) -> PathBuf {
    if !bucket.dest.contains("{topic}") {
        return PathBuf::from(&bucket.dest);
    }
    let stem = rel_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let topic = stem
        .split(['_', '-'])
        .next()
        .filter(|t| !t.is_empty())
        .unwrap_or("misc")
        .to_string();
    PathBuf::from(bucket.dest.replace("{topic}", &topic))
}
