use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "repo-groom")]
#[command(about = "Safe, reversible grooming of a source tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan and plan only; emits the full report without touching any file
    Preview,
    /// Apply the plan: backup-gated cleanup, redaction, and reorganization
    Execute {
        /// Skip the interactive confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Reverse a prior execute from its backup manifest
    Restore {
        /// Path to a manifest.json, or to the backup run directory holding it
        manifest: PathBuf,
    },
    /// Write a redacted template next to an env-style file
    Template {
        env_file: PathBuf,
    },
    /// List backup runs
    Backups,
    /// Delete the oldest backup runs, keeping the most recent N
    PurgeBackups {
        #[arg(long, default_value_t = 3)]
        keep: usize,
    },
    /// Print configuration values
    PrintConfig,
    /// Write the default configuration to Config.toml
    InitConfig,
}
