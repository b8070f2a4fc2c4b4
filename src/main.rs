mod cli;
mod reporter;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use repo_groom::backup::{self, BackupStore};
use repo_groom::redact::SecretScanner;
use repo_groom::report::RunReport;
use repo_groom::utils::prompt::prompt_confirm;
use repo_groom::{config, logging, utils, AppConfig, Mode, Pipeline};
use reporter::CliReporter;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    utils::hide_cursor();

    let args = Cli::parse();
    let code = match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("Error: {:#}", err);
            2
        }
    };

    utils::show_cursor();
    process::exit(code);
}

fn run(args: Cli) -> anyhow::Result<i32> {
    let config = config::load_configuration().context("loading configuration")?;

    match args.command {
        Some(Commands::Preview) => run_pipeline(&config, Mode::Preview, true),
        Some(Commands::Execute { yes }) => {
            let confirmed = yes
                || prompt_confirm(
                    &format!(
                        "About to modify files under '{}' (backed up first). Continue?",
                        config.root_path
                    ),
                    Some(false),
                )?;
            if !confirmed {
                println!("Aborted; nothing was changed.");
                return Ok(0);
            }
            run_pipeline(&config, Mode::Execute, confirmed)
        }
        Some(Commands::Restore { manifest }) => {
            let run_dir = if manifest.is_file() {
                manifest
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            } else {
                manifest.clone()
            };
            let store = BackupStore::open(&run_dir)?;
            let restored = store.restore(Path::new(&config.root_path))?;
            info!("Restored {} files from {}", restored, run_dir.display());
            Ok(0)
        }
        Some(Commands::Template { env_file }) => {
            let scanner = SecretScanner::from_config(&config)?;
            let template = scanner.write_template(&env_file)?;
            println!("Template written to {}", template.display());
            Ok(0)
        }
        Some(Commands::Backups) => {
            let runs = backup::list_backups(&backup_root(&config))?;
            if runs.is_empty() {
                println!("No backup runs found.");
            }
            for run in runs {
                println!(
                    "{}  {}  {} files, {} bytes",
                    run.created_at.format("%Y-%m-%d %H:%M:%S"),
                    run.run_dir.display(),
                    run.entry_count,
                    run.total_bytes,
                );
            }
            Ok(0)
        }
        Some(Commands::PurgeBackups { keep }) => {
            match prompt_confirm(
                &format!("Delete all but the {keep} most recent backup runs?"),
                Some(false),
            ) {
                Ok(true) => {
                    let removed = backup::purge_backups(&backup_root(&config), keep)?;
                    println!("Purged {removed} backup runs");
                    Ok(0)
                }
                _ => Ok(0),
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(0)
        }
        Some(Commands::InitConfig) => {
            let path = Path::new("Config.toml");
            if path.exists() {
                println!("Config.toml already exists; not overwriting.");
                return Ok(2);
            }
            let rendered = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(path, rendered)?;
            println!("Wrote default configuration to Config.toml");
            Ok(0)
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(0)
        }
    }
}

fn backup_root(config: &AppConfig) -> PathBuf {
    let configured = Path::new(&config.backup_root);
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        Path::new(&config.root_path).join(configured)
    }
}

fn run_pipeline(config: &AppConfig, mode: Mode, confirmed: bool) -> anyhow::Result<i32> {
    let pipeline = Pipeline::new(config);
    let reporter = CliReporter::new();
    let report = pipeline.run(mode, confirmed, &reporter)?;
    report.save(Path::new(&config.report_path))?;

    println!();
    print_summary(&report);
    info!("Report written to {}", config.report_path);

    Ok(if report.has_errors() { 1 } else { 0 })
}

fn print_summary(report: &RunReport) {
    println!(
        "{} run on {}",
        report.mode.to_uppercase().bold(),
        report.root.display()
    );
    for phase in &report.phases {
        let errors = if phase.errors.is_empty() {
            "ok".green().to_string()
        } else {
            format!("{} errors", phase.errors.len()).red().to_string()
        };
        println!(
            "  {:<12} {:>6} considered  {:>6} acted on  {:>12} bytes  [{}]",
            phase.phase.as_str(),
            phase.considered,
            phase.acted_on,
            phase.bytes_affected,
            errors,
        );
    }
    if let Some(plan) = &report.cleanup_plan {
        println!(
            "  {} removals planned ({} bytes), strategy '{}'",
            plan.removals.len(),
            format!("{}", plan.bytes_planned()).yellow(),
            plan.strategy,
        );
    }
    if !report.secret_findings.is_empty() {
        println!(
            "  {} secret findings",
            format!("{}", report.secret_findings.len()).red()
        );
    }
    for advisory in &report.advisories {
        println!("  {} {}", "advisory:".yellow(), advisory);
    }
    if let Some(manifest) = &report.backup_manifest {
        println!("  backup manifest: {}", manifest.display());
    }
}
