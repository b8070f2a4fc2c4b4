pub mod prompt;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn hide_cursor() {
    print!("\x1B[?25l");
    let _ = io::stdout().flush();
}

pub fn show_cursor() {
    print!("\x1B[?25h");
    let _ = io::stdout().flush();
}

/// Strip `root` from `path`. Falls back to the full path when `path` is not
/// under `root` (symlinked entries mostly).
pub fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_strips_root() {
        let root = Path::new("/data/project");
        let path = Path::new("/data/project/src/main.py");
        assert_eq!(relative_to(path, root), PathBuf::from("src/main.py"));
    }

    #[test]
    fn relative_to_keeps_unrelated_path() {
        let root = Path::new("/data/project");
        let path = Path::new("/elsewhere/file.txt");
        assert_eq!(relative_to(path, root), PathBuf::from("/elsewhere/file.txt"));
    }
}
