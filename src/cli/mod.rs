//! CLI command definitions and handlers

use clap::{Parser, Subcommand, ValueEnum};

pub mod cache;
pub mod context;
pub mod init;
pub mod report;
pub mod snapshot;
pub mod status;
pub mod tenancy;

pub use context::CommandContext;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-oriented output with summaries and glyphs
    #[default]
    Pretty,
    /// Plain tables
    Table,
    /// JSON envelope for scripting
    Json,
}

/// Tenop CLI - companion for cloud tenancy operations
#[derive(Parser, Debug)]
#[command(name = "tenop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "TENOP_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override the configured region
    #[arg(long, global = true, env = "TENOP_REGION", hide_env = true)]
    pub region: Option<String>,

    /// Override config file location
    #[arg(long, global = true, env = "TENOP_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "TENOP_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass the response cache, always query live
    #[arg(long, global = true, env = "TENOP_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Tenop configuration
    Init {
        /// API key for the cloud endpoint
        #[arg(long)]
        api_key: Option<String>,

        /// Tenancy to scope all operations to
        #[arg(long)]
        tenancy: Option<String>,

        /// Default region
        #[arg(long)]
        region: Option<String>,

        /// Custom API endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Show configuration and snapshot status
    Status,

    /// Display version information
    Version,

    /// Tenancy metadata queries
    #[command(subcommand)]
    Tenancy(TenancyCommands),

    /// Manage the inventory snapshot
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Manage the local response cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Generate skill reports
    #[command(subcommand)]
    Report(ReportCommands),
}

/// Tenancy subcommands
#[derive(Subcommand, Debug)]
pub enum TenancyCommands {
    /// Show tenancy metadata from the snapshot
    Info,
}

/// Snapshot management subcommands
#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// Refresh the inventory snapshot
    Refresh {
        /// Rebuild even if the current snapshot is fresh
        #[arg(long, short = 'f')]
        force: bool,

        /// Age in minutes past which the snapshot counts as stale
        #[arg(long)]
        max_age_minutes: Option<f64>,
    },

    /// Show snapshot metadata without loading the full document
    Info,
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Status,
    /// Clear cached responses and snapshot artifacts
    Clear,
    /// Print cache directory path
    Path,
}

/// Report generation subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Cost trend, forecast, and anomaly analysis
    Cost {
        /// Time window to analyze (e.g. 30d, 6m)
        #[arg(long, short = 'w', default_value = "30d")]
        window: String,

        /// Anomaly threshold in standard deviations
        #[arg(long, default_value_t = crate::skills::cost::DEFAULT_ANOMALY_THRESHOLD)]
        anomaly_threshold: f64,
    },

    /// Inventory audit of the tenancy snapshot
    Inventory {
        /// Restrict the audit to one compartment (name or ID)
        #[arg(long, short = 'c')]
        compartment: Option<String>,
    },

    /// Network topology and security assessment
    Network,
}
