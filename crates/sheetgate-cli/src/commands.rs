use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sheetgate")]
#[command(about = "Upload intake and retention for the timesheet converter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a local file and store it for a session
    Ingest {
        file: PathBuf,
        #[arg(short, long)]
        session: String,
    },
    /// Store a zip of spreadsheets and convert every entry
    Batch {
        zip: PathBuf,
        #[arg(short, long)]
        session: String,
        /// Word template handed to the converter
        #[arg(short, long)]
        template: PathBuf,
    },
    /// Delete files older than the retention window
    Sweep,
    /// Delete every stored file except period templates
    SweepAll,
    /// Generate missing templates around the current month
    Prewarm,
    /// Run the boot sweep and keep sweeping on the configured interval
    RunSweeper,
    /// Print configuration values
    PrintConfig,
}
