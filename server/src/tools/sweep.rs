use std::time::Duration;

use crate::cli::SweepArgs;
use crate::climate::OpenMeteoSource;
use crate::db;
use crate::models::GridBounds;
use crate::store::PgGridStore;
use crate::sweep::{self, SweepConfig};

pub async fn exec(database_url: &str, args: SweepArgs) -> anyhow::Result<()> {
    let pool = db::pool(database_url).await?;
    let store = PgGridStore::new(pool);
    let provider = OpenMeteoSource::new();

    let defaults = GridBounds::TURKEY;
    let config = SweepConfig {
        bounds: GridBounds {
            lat_min: args.lat_min.unwrap_or(defaults.lat_min),
            lat_max: args.lat_max.unwrap_or(defaults.lat_max),
            lon_min: args.lon_min.unwrap_or(defaults.lon_min),
            lon_max: args.lon_max.unwrap_or(defaults.lon_max),
        },
        step: args.step,
        pacing: Duration::from_secs_f64(args.pacing_secs),
        ..SweepConfig::default()
    };

    let started = std::time::Instant::now();
    let summary = sweep::run_sweep(&provider, &store, args.resource, &config).await?;

    println!(
        "{} sweep complete: {} points checked, {} fresh, {} updated, {} failed ({:.1} min)",
        args.resource,
        summary.total,
        summary.skipped_fresh,
        summary.updated,
        summary.failed,
        started.elapsed().as_secs_f64() / 60.0
    );
    Ok(())
}
