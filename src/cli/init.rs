//! Init command: write the configuration file

use colored::Colorize;

use crate::config::Config;
use crate::error::Result;

/// Create or update the configuration file from the given flags.
pub fn run(
    api_key: Option<String>,
    tenancy: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    config_path: Option<&str>,
) -> Result<()> {
    // Start from the existing config when present so init can be re-run to
    // update a single field.
    let mut config = Config::load_at(config_path).unwrap_or_default();

    if let Some(api_key) = api_key {
        config.api_key = Some(api_key);
    }
    if let Some(tenancy) = tenancy {
        config.tenancy_id = Some(tenancy);
    }
    if let Some(region) = region {
        config.region = Some(region);
    }
    if let Some(endpoint) = endpoint {
        config.endpoint = Some(endpoint);
    }

    config.save_at(config_path)?;
    let path = Config::resolve_path(config_path)?;
    println!("{} Configuration saved to {}", "✓".green(), path.display());

    if config.api_key.is_none() {
        println!(
            "{} No API key set yet; run {} to add one",
            "⚠".yellow(),
            "tenop init --api-key <KEY>".cyan()
        );
    }
    if config.tenancy_id.is_none() {
        println!(
            "{} No tenancy set yet; run {} to add one",
            "⚠".yellow(),
            "tenop init --tenancy <ID>".cyan()
        );
    }

    Ok(())
}
