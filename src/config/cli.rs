use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "trace-mint")]
#[command(about = "Inspection batches and mint requests over a local snapshot")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Snapshot file, overrides store.snapshot_path
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print an inspection batch with model numbers filled in
    Show { production_id: String },

    /// Update one inspection item
    UpdateItem {
        production_id: String,
        product_id: String,
        #[arg(long)]
        result: Option<String>,
        #[arg(long)]
        inspected_by: Option<String>,
        #[arg(long)]
        inspected_at: Option<DateTime<Utc>>,
        #[arg(long)]
        status: Option<String>,
    },

    /// Complete a batch and sync every unit's result
    Complete {
        production_id: String,
        #[arg(long)]
        by: String,
        /// Defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Replay product syncs for a batch
    Resync { production_id: String },

    /// Create a mint request from a production's passed units
    RequestMint {
        #[arg(long)]
        company: String,
        /// Productions visible to the company; defaults to --production
        #[arg(long, value_delimiter = ',')]
        scope: Vec<String>,
        #[arg(long)]
        production: String,
        #[arg(long)]
        brand: String,
        #[arg(long)]
        blueprint: String,
        #[arg(long)]
        by: String,
    },
}
