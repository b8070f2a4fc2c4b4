use config::{Config, ConfigError, File as ConfigFile};
use serde::{Deserialize, Serialize};

/// A user-supplied secret detection rule, appended after the built-ins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretPatternConfig {
    pub category: String,
    pub pattern: String,
    pub placeholder: String,
}

/// One destination bucket for the layout reorganizer. Patterns are globs
/// tested against the relative path; first matching bucket wins. `dest` may
/// contain `{topic}`, filled from the leading segment of the file stem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBucket {
    pub name: String,
    pub dest: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tree the pipeline operates on.
    pub root_path: String,
    /// Directory names skipped during every walk, so the scanner never
    /// descends into VCS metadata, dependency caches, or its own backups.
    pub ignore_dirs: Vec<String>,
    /// Category classification globs, tested in this order:
    /// temporary, test, config, documentation. Unmatched files are production.
    pub temp_patterns: Vec<String>,
    pub test_patterns: Vec<String>,
    pub config_patterns: Vec<String>,
    pub doc_patterns: Vec<String>,
    /// Duplicate survivor strategy: primary | newest | production.
    pub duplicate_strategy: String,
    /// Extra secret rules evaluated after the built-in table.
    pub secret_patterns: Vec<SecretPatternConfig>,
    /// Reorganizer destination buckets, tested in order.
    pub layout_buckets: Vec<LayoutBucket>,
    /// Where backup runs are created (one timestamped subdirectory per run).
    pub backup_root: String,
    /// File extensions whose contents are rewritten after a move.
    pub rewrite_extensions: Vec<String>,
    /// Advisory post-cleanup target for top-level entries under the root.
    pub target_top_level_count: Option<usize>,
    /// Where the machine-readable run report is written.
    pub report_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            root_path: ".".to_string(),
            ignore_dirs: vec_of(&[
                ".git",
                ".hg",
                ".svn",
                "node_modules",
                "target",
                "__pycache__",
                ".venv",
                "venv",
                ".idea",
                "backups",
            ]),
            temp_patterns: vec_of(&[
                "*.tmp",
                "*.temp",
                "*.log",
                "*.bak",
                "*.orig",
                "*.swp",
                "*~",
                "*.pyc",
                "*.cache",
                ".DS_Store",
                "Thumbs.db",
                "tmp/**",
            ]),
            test_patterns: vec_of(&[
                "test_*",
                "*_test.*",
                "*.test.*",
                "tests/**",
                "test/**",
                "conftest.*",
            ]),
            config_patterns: vec_of(&[
                "*.toml",
                "*.yaml",
                "*.yml",
                "*.ini",
                "*.cfg",
                "*.conf",
                ".env*",
                "*.json",
            ]),
            doc_patterns: vec_of(&[
                "*.md",
                "*.rst",
                "*.txt",
                "docs/**",
                "LICENSE*",
                "README*",
                "CHANGELOG*",
            ]),
            duplicate_strategy: "primary".to_string(),
            secret_patterns: Vec::new(),
            layout_buckets: vec![
                LayoutBucket {
                    name: "test-unit".to_string(),
                    dest: "tests/unit".to_string(),
                    patterns: vec_of(&["test_*.*", "*_test.*"]),
                },
                LayoutBucket {
                    name: "test-integration".to_string(),
                    dest: "tests/integration".to_string(),
                    patterns: vec_of(&["*integration*", "*e2e*"]),
                },
                LayoutBucket {
                    name: "agents".to_string(),
                    dest: "src/agents".to_string(),
                    patterns: vec_of(&["*agent*", "*generator*"]),
                },
                LayoutBucket {
                    name: "services".to_string(),
                    dest: "src/services".to_string(),
                    patterns: vec_of(&["*service*", "*client*", "*uploader*"]),
                },
                LayoutBucket {
                    name: "config".to_string(),
                    dest: "config".to_string(),
                    patterns: vec_of(&["*.toml", "*.yaml", "*.yml", "*.ini", ".env*"]),
                },
                LayoutBucket {
                    name: "docs".to_string(),
                    dest: "docs/{topic}".to_string(),
                    patterns: vec_of(&["*.md", "*.rst"]),
                },
                LayoutBucket {
                    name: "utils".to_string(),
                    dest: "src/utils".to_string(),
                    patterns: vec_of(&["*util*", "*helper*"]),
                },
            ],
            backup_root: "backups".to_string(),
            rewrite_extensions: vec_of(&["py", "rs", "js", "ts", "sh", "toml", "yaml", "yml"]),
            target_top_level_count: Some(20),
            report_path: "groom-report.json".to_string(),
        }
    }
}

fn vec_of(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
