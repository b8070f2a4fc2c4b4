use crate::config::AppConfig;
use crate::error::Error;
use crate::model::FileCategory;
use glob::Pattern;
use std::path::Path;

/// Compiled category classification rules, tested in a fixed priority order:
/// temporary first, then test, then config, then documentation. A file that
/// matches nothing is production.
pub struct CategoryRules {
    temp: Vec<Pattern>,
    test: Vec<Pattern>,
    config: Vec<Pattern>,
    doc: Vec<Pattern>,
}

impl CategoryRules {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(CategoryRules {
            temp: compile(&config.temp_patterns)?,
            test: compile(&config.test_patterns)?,
            config: compile(&config.config_patterns)?,
            doc: compile(&config.doc_patterns)?,
        })
    }

    /// Classify by relative path. Patterns are tried against the full
    /// relative path and against the bare file name, so `tests/**` and
    /// `test_*` both behave as expected.
    pub fn classify(&self, rel_path: &Path) -> FileCategory {
        if matches_any(&self.temp, rel_path) {
            FileCategory::Temporary
        } else if matches_any(&self.test, rel_path) {
            FileCategory::Test
        } else if matches_any(&self.config, rel_path) {
            FileCategory::Config
        } else if matches_any(&self.doc, rel_path) {
            FileCategory::Documentation
        } else {
            FileCategory::Production
        }
    }
}

fn compile(globs: &[String]) -> Result<Vec<Pattern>, Error> {
    globs.iter().map(|g| Ok(Pattern::new(g)?)).collect()
}

fn matches_any(patterns: &[Pattern], rel_path: &Path) -> bool {
    let file_name = rel_path.file_name().map(|n| n.to_string_lossy());
    patterns.iter().any(|pattern| {
        pattern.matches_path(rel_path)
            || file_name
                .as_deref()
                .map(|name| pattern.matches(name))
                .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn rules() -> CategoryRules {
        CategoryRules::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn temporary_beats_every_other_category() {
        // *.log would also never match config/doc, but tmp/** overlaps with
        // anything placed under tmp/; temporary must win.
        assert_eq!(
            rules().classify(Path::new("tmp/settings.toml")),
            FileCategory::Temporary
        );
        assert_eq!(
            rules().classify(Path::new("cache.log")),
            FileCategory::Temporary
        );
    }

    #[test]
    fn test_files_by_name_and_directory() {
        assert_eq!(
            rules().classify(Path::new("test_upload.py")),
            FileCategory::Test
        );
        assert_eq!(
            rules().classify(Path::new("tests/helpers/fixtures.py")),
            FileCategory::Test
        );
    }

    #[test]
    fn config_and_documentation() {
        assert_eq!(
            rules().classify(Path::new("a/config.json")),
            FileCategory::Config
        );
        assert_eq!(rules().classify(Path::new(".env")), FileCategory::Config);
        assert_eq!(
            rules().classify(Path::new("docs/setup.md")),
            FileCategory::Documentation
        );
    }

    #[test]
    fn unmatched_defaults_to_production() {
        assert_eq!(
            rules().classify(Path::new("src/uploader.py")),
            FileCategory::Production
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let rules = rules();
        let path = Path::new("scripts/generate_video.py");
        let first = rules.classify(path);
        for _ in 0..10 {
            assert_eq!(rules.classify(path), first);
        }
    }
}
