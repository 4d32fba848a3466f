use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::DEFAULT_KIND;

#[derive(Parser)]
#[command(name = "scanqr")]
#[command(about = "A local log of scanned barcodes and QR codes")]
#[command(version)]
pub struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the remote scan service
    #[arg(long, global = true)]
    pub remote_url: Option<String>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record a scanned code and print the updated log
    Scan(ScanArgs),

    /// List all scans, newest first
    List(OutputArgs),

    /// Show a single scan by ID
    Show(IdArgs),

    /// Delete a scan by ID
    Delete(IdArgs),

    /// Delete every scan
    Clear,

    /// Check whether a payload has been scanned before
    Exists(ExistsArgs),

    /// Totals per symbology and the time of the last scan
    Stats(OutputArgs),

    /// Schema version and migration health of the database
    Status(OutputArgs),

    /// Rebuild the scan table with the current schema, keeping all rows
    Rebuild,

    /// Talk to the remote scan service
    #[command(subcommand)]
    Remote(RemoteCommand),
}

#[derive(Parser)]
pub struct ScanArgs {
    /// Decoded payload
    pub data: String,

    /// Symbology of the code
    #[arg(long = "type", default_value = DEFAULT_KIND)]
    pub kind: String,

    /// Do nothing if the same payload is already recorded
    #[arg(long, default_value_t = false)]
    pub skip_duplicates: bool,

    /// Output as JSON instead of table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct OutputArgs {
    /// Output as JSON instead of table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct IdArgs {
    pub id: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ExistsArgs {
    pub data: String,
}

#[derive(Subcommand)]
pub enum RemoteCommand {
    /// List scans stored on the remote service
    List(OutputArgs),

    /// Fetch one remote scan
    Get(IdArgs),

    /// Create a scan on the remote service
    Push(PushArgs),

    /// Delete a remote scan
    Delete(IdArgs),
}

#[derive(Parser)]
pub struct PushArgs {
    pub data: String,

    #[arg(long = "type", default_value = DEFAULT_KIND)]
    pub kind: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
