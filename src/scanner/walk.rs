use dashmap::DashMap;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::error;

/// Parallel directory traversal. Builds a map of file_size → Vec<PathBuf>,
/// skipping denied directory names wherever they appear in the tree.
/// Symlinks are not followed.
pub fn build_size_to_files_map(
    root: &Path,
    deny_dirs: &[String],
) -> io::Result<DashMap<u64, Vec<PathBuf>>> {
    let map: DashMap<u64, Vec<PathBuf>> = DashMap::new();
    visit_dirs(root, &map, deny_dirs)?;
    Ok(map)
}

fn is_denied(dir: &Path, deny_dirs: &[String]) -> bool {
    dir.file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            deny_dirs.iter().any(|deny| deny == name.as_ref())
        })
        .unwrap_or(false)
}

fn visit_dirs(dir: &Path, map: &DashMap<u64, Vec<PathBuf>>, deny_dirs: &[String]) -> io::Result<()> {
    if !dir.is_dir() || is_denied(dir, deny_dirs) {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!("Access denied reading directory {}: {}", dir.display(), err);
                return Ok(());
            } else {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        }
    };

    entries.par_bridge().try_for_each(|entry_result| {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading entry in directory {}: {}", dir.display(), err),
                ));
            }
        };

        let path = entry.path();
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                error!("Error getting metadata for {}: {}", path.display(), err);
                return Ok(());
            }
        };

        if metadata.is_dir() {
            visit_dirs(&path, map, deny_dirs)?;
        } else if metadata.is_file() {
            map.entry(metadata.len()).or_default().push(path);
        }
        Ok(())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn walk_skips_denied_directories() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::write(root.join("src/main.py"), "print('hi')").unwrap();

        let map = build_size_to_files_map(root, &[".git".to_string()]).unwrap();
        let all: Vec<PathBuf> = map.iter().flat_map(|e| e.value().clone()).collect();
        assert_eq!(all.len(), 1);
        assert!(all[0].ends_with("src/main.py"));
    }

    #[test]
    fn walk_groups_by_size() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.txt"), "same size!").unwrap();
        fs::write(root.join("b.txt"), "same size?").unwrap();
        fs::write(root.join("c.txt"), "different length").unwrap();

        let map = build_size_to_files_map(root, &[]).unwrap();
        assert_eq!(map.get(&10).unwrap().len(), 2);
        assert_eq!(map.get(&16).unwrap().len(), 1);
    }
}
