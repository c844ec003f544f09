use crate::db;
use crate::models::{GridAnalysis, ResourceType};

pub async fn find(
    client: &db::Client<'_>,
    lat: f64,
    lon: f64,
    resource: ResourceType,
) -> anyhow::Result<Option<GridAnalysis>> {
    let stmt = "SELECT * FROM grid_analyses \
                WHERE latitude = $1 AND longitude = $2 AND resource_type = $3";
    let row_opt = client
        .query_opt(stmt, &[&lat, &lon, &resource.as_str()])
        .await?;
    match row_opt {
        Some(row) => Ok(Some(GridAnalysis::try_from(&row)?)),
        None => Ok(None),
    }
}

// Insert-or-update in one statement, so a concurrent reader never observes a
// half-written record.
pub async fn upsert(client: &db::Client<'_>, record: &GridAnalysis) -> anyhow::Result<()> {
    let monthly = serde_json::to_value(&record.monthly_breakdown)?;
    let stmt = "INSERT INTO grid_analyses \
                (latitude, longitude, resource_type, annual_potential_kwh_m2, \
                 avg_wind_speed_ms, annual_production_kwh, capacity_factor, \
                 logistics_score, overall_score, monthly_breakdown, updated_at) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
                ON CONFLICT (latitude, longitude, resource_type) DO UPDATE SET \
                 annual_potential_kwh_m2 = excluded.annual_potential_kwh_m2, \
                 avg_wind_speed_ms = excluded.avg_wind_speed_ms, \
                 annual_production_kwh = excluded.annual_production_kwh, \
                 capacity_factor = excluded.capacity_factor, \
                 logistics_score = excluded.logistics_score, \
                 overall_score = excluded.overall_score, \
                 monthly_breakdown = excluded.monthly_breakdown, \
                 updated_at = excluded.updated_at";
    client
        .execute(
            stmt,
            &[
                &record.latitude,
                &record.longitude,
                &record.resource_type.as_str(),
                &record.annual_potential_kwh_m2,
                &record.avg_wind_speed_ms,
                &record.annual_production_kwh,
                &record.capacity_factor,
                &record.logistics_score,
                &record.overall_score,
                &monthly,
                &record.updated_at,
            ],
        )
        .await?;
    Ok(())
}

pub async fn scored_points(
    client: &db::Client<'_>,
    resource: ResourceType,
) -> anyhow::Result<Vec<GridAnalysis>> {
    let stmt = "SELECT * FROM grid_analyses \
                WHERE resource_type = $1 AND overall_score > 0 \
                ORDER BY latitude, longitude";
    let rows = client.query(stmt, &[&resource.as_str()]).await?;
    let records = super::from_rows(rows)?;
    Ok(records)
}
