mod commands;
mod logging;
mod progress;

use std::fs;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use sheetgate_core::engine::Collaborators;
use sheetgate_core::{AppConfig, IntakeEngine, SweepReport};
use tracing::{error, info};

fn main() -> Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match sheetgate_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    info!(
        storage_root = %config.storage_root,
        log_file = %logging::log_file_path().display(),
        "sheetgate starting"
    );

    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    if let Commands::PrintConfig = command {
        println!("Configuration: {:?}", config);
        return Ok(());
    }

    let engine = IntakeEngine::new(config.clone(), Collaborators::from_config(&config))
        .context("Error opening storage")?;

    let result = match command {
        Commands::Ingest { file, session } => run_ingest(&engine, &file, &session),
        Commands::Batch {
            zip,
            session,
            template,
        } => run_batch(&engine, &zip, &session, &template),
        Commands::Sweep => {
            print_report("Sweep", &engine.cleanup_old_files());
            Ok(())
        }
        Commands::SweepAll => {
            print_report("Full sweep", &engine.cleanup_all_files());
            Ok(())
        }
        Commands::Prewarm => {
            let created = engine
                .sweeper()
                .prewarm_templates(Local::now().date_naive());
            info!("{} templates created", format!("{}", created.len()).green());
            for name in created {
                println!("  {}", name);
            }
            Ok(())
        }
        Commands::RunSweeper => run_sweeper(&engine, &config),
        Commands::PrintConfig => Ok(()),
    };

    if let Err(err) = &result {
        error!("Error: {:#}", err);
    }
    result
}

fn run_ingest(engine: &IntakeEngine, file: &Path, session: &str) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Error reading {}", file.display()))?;
    let declared = declared_name(file);

    let stored = engine.store_upload(&data, &declared, session)?;
    info!(
        "Stored {} as {} ({} bytes, sha256 {})",
        declared,
        stored.name.green(),
        stored.size,
        stored.content_hash.dimmed(),
    );
    Ok(())
}

fn run_batch(engine: &IntakeEngine, zip: &Path, session: &str, template: &Path) -> Result<()> {
    let data = fs::read(zip).with_context(|| format!("Error reading {}", zip.display()))?;
    let stored = engine.store_upload(&data, &declared_name(zip), session)?;

    let reporter = CliReporter::new();
    let outcome = engine.process_archive(session, &stored.name, template, &reporter)?;

    println!();
    info!(
        "{} converted, {} failed, result {}",
        format!("{}", outcome.success_count).green(),
        format!("{}", outcome.failure_count).red(),
        outcome.result_path.display(),
    );
    for failure in &outcome.failures {
        info!("  {} {}", failure.name.yellow(), failure.reason);
    }
    Ok(())
}

fn run_sweeper(engine: &IntakeEngine, config: &AppConfig) -> Result<()> {
    let scheduler = engine.start()?;
    info!(
        "Sweeping {} every {} minutes (retention {} minutes)",
        engine.store().root().display(),
        config.sweep_interval_minutes,
        config.retention_minutes
    );
    scheduler.join();
    Ok(())
}

fn print_report(label: &str, report: &SweepReport) {
    info!(
        "{}: {} deleted ({} bytes), {} exempt, {} retained, {} failed",
        label,
        format!("{}", report.deleted).red(),
        report.bytes_freed,
        format!("{}", report.exempt).cyan(),
        report.retained,
        report.failed,
    );
    for name in &report.templates_created {
        info!("Template created: {}", name.cyan());
    }
}

fn declared_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
