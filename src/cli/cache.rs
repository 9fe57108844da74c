//! Cache management commands

use tabled::Tabled;

use crate::cache::CacheTier;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::output::format_table;
use crate::snapshot::{SNAPSHOT_FILE, SNAPSHOT_META_FILE, SnapshotStore};

#[derive(Tabled, serde::Serialize)]
struct TierRow {
    #[tabled(rename = "TIER")]
    tier: &'static str,
    #[tabled(rename = "TTL")]
    ttl: String,
    #[tabled(rename = "CAPACITY")]
    capacity: usize,
}

/// Show cache tier policy and on-disk snapshot artifact usage.
///
/// The response cache itself is in-memory and scoped to one process, so what
/// persists between runs is the snapshot artifacts.
pub fn status(format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let rows: Vec<TierRow> = CacheTier::ALL
        .iter()
        .map(|tier| TierRow {
            tier: tier.name(),
            ttl: format!("{}s", tier.ttl().as_secs()),
            capacity: tier.max_entries(),
        })
        .collect();

    let dir = cache_dir(config_path)?;
    let artifact_bytes: u64 = [SNAPSHOT_FILE, SNAPSHOT_META_FILE]
        .iter()
        .filter_map(|name| std::fs::metadata(dir.join(name)).ok())
        .map(|meta| meta.len())
        .sum();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "tiers": rows,
                "path": dir.display().to_string(),
                "snapshot_artifact_bytes": artifact_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            println!("Cache Tiers");
            println!("{}", format_table(&rows));
            println!();
            println!("Location:           {}", dir.display());
            println!("Snapshot artifacts: {}", format_size(artifact_bytes as usize));
        }
    }

    Ok(())
}

/// Remove snapshot artifacts from the cache directory.
pub fn clear(format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let dir = cache_dir(config_path)?;
    let mut removed = 0usize;

    for name in [SNAPSHOT_FILE, SNAPSHOT_META_FILE] {
        let path = dir.join(name);
        if path.exists() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "artifacts_removed": removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            if removed > 0 {
                println!("Removed {} snapshot artifact(s)", removed);
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

/// Print the cache directory path.
pub fn path(config_path: Option<&str>) -> Result<()> {
    println!("{}", cache_dir(config_path)?.display());
    Ok(())
}

/// Resolve the cache directory: config override first, default otherwise.
/// Works without a complete config so cache commands stay usable.
fn cache_dir(config_path: Option<&str>) -> Result<std::path::PathBuf> {
    if let Ok(config) = Config::load_at(config_path)
        && let Some(dir) = config.cache_dir
    {
        return Ok(dir);
    }
    SnapshotStore::default_cache_dir()
}

/// Format bytes as human-readable size
fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
