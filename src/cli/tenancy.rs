//! Tenancy metadata commands

use tabled::Tabled;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::{Result, SnapshotError};
use crate::output::{format_json, format_table};

#[derive(Tabled)]
struct TenancyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "HOME REGION")]
    home_region: String,
    #[tabled(rename = "SUBSCRIBED REGIONS")]
    subscribed: String,
}

/// Show tenancy metadata, building the snapshot first if needed.
pub async fn info(ctx: &CommandContext) -> Result<()> {
    ctx.store
        .refresh(false, ctx.max_snapshot_age_minutes())
        .await?;

    let tenancy = ctx
        .store
        .tenancy_info()
        .ok_or(SnapshotError::NotAvailable)?;

    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&tenancy)?),
        _ => {
            let row = TenancyRow {
                id: tenancy.id.clone(),
                name: tenancy.name.clone(),
                home_region: tenancy.home_region.clone(),
                subscribed: tenancy.subscribed_regions.join(", "),
            };
            println!("{}", format_table(&[row]));
        }
    }

    Ok(())
}
