//! Tenop CLI - companion for cloud tenancy operations

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod output;
mod skills;
mod snapshot;

use cli::{
    CacheCommands, Cli, CommandContext, Commands, OutputFormat, SnapshotCommands, TenancyCommands,
};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();

    match cli.command {
        Commands::Init {
            api_key,
            tenancy,
            region,
            endpoint,
        } => cli::init::run(api_key, tenancy, region, endpoint, cli.config.as_deref()),
        Commands::Status => cli::status::run(cli.config.as_deref()),
        Commands::Version => {
            println!("tenop version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Tenancy(tenancy_cmd) => {
            let ctx = context(cli.format, cli.region.as_deref(), cli.config.as_deref(), cli.no_cache)?;
            match tenancy_cmd {
                TenancyCommands::Info => cli::tenancy::info(&ctx).await,
            }
        }
        Commands::Snapshot(snapshot_cmd) => match snapshot_cmd {
            SnapshotCommands::Refresh {
                force,
                max_age_minutes,
            } => {
                let ctx = context(cli.format, cli.region.as_deref(), cli.config.as_deref(), cli.no_cache)?;
                cli::snapshot::refresh(&ctx, force, max_age_minutes).await
            }
            SnapshotCommands::Info => cli::snapshot::info(cli.format, cli.config.as_deref()),
        },
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(cli.format, cli.config.as_deref()),
            CacheCommands::Clear => cli::cache::clear(cli.format, cli.config.as_deref()),
            CacheCommands::Path => cli::cache::path(cli.config.as_deref()),
        },
        Commands::Report(report_cmd) => {
            let ctx = context(cli.format, cli.region.as_deref(), cli.config.as_deref(), cli.no_cache)?;
            cli::report::run(&ctx, report_cmd).await
        }
    }
}

fn context(
    format: OutputFormat,
    region: Option<&str>,
    config: Option<&str>,
    no_cache: bool,
) -> Result<CommandContext> {
    CommandContext::new(format, region, config, no_cache)
}
