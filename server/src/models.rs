use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_postgres::Row;

/// Which physical model and climate fields a grid point is scored with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Solar,
    Wind,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Solar => "Solar",
            ResourceType::Wind => "Wind",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solar" => Ok(ResourceType::Solar),
            "wind" => Ok(ResourceType::Wind),
            other => Err(format!("unknown resource type: {}", other)),
        }
    }
}

/// One month of a 12-entry breakdown. `month` is 1-based (1 = January).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyValue {
    pub month: u32,
    pub value: f64,
}

/// Geographic bounding box, degrees.
#[derive(Clone, Copy, Debug)]
pub struct GridBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl GridBounds {
    /// Default sweep extent over Turkey.
    pub const TURKEY: GridBounds = GridBounds {
        lat_min: 36.0,
        lat_max: 42.0,
        lon_min: 26.0,
        lon_max: 44.0,
    };

    /// Wider box used for rendered rasters, so interpolation bleeds past the
    /// outermost sample ring instead of clipping at it.
    pub const TURKEY_RASTER: GridBounds = GridBounds {
        lat_min: 35.8,
        lat_max: 42.2,
        lon_min: 25.5,
        lon_max: 45.0,
    };

    pub fn center_lat(&self) -> f64 {
        (self.lat_min + self.lat_max) / 2.0
    }
}

/// Cached analysis for one `(lat, lon, resource_type)` grid point.
///
/// A failed fetch is recorded with `overall_score = 0` and no potential
/// fields, which keeps the point eligible for retry on the next sweep.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridAnalysis {
    pub latitude: f64,
    pub longitude: f64,
    pub resource_type: ResourceType,
    pub annual_potential_kwh_m2: Option<f64>,
    pub avg_wind_speed_ms: Option<f64>,
    pub annual_production_kwh: Option<f64>,
    pub capacity_factor: Option<f64>,
    pub logistics_score: f64,
    pub overall_score: f64,
    pub monthly_breakdown: Vec<MonthlyValue>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Row> for GridAnalysis {
    type Error = anyhow::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let resource_type: String = row.try_get("resource_type")?;
        let monthly: serde_json::Value = row.try_get("monthly_breakdown")?;
        Ok(GridAnalysis {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            resource_type: resource_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?,
            annual_potential_kwh_m2: row.try_get("annual_potential_kwh_m2")?,
            avg_wind_speed_ms: row.try_get("avg_wind_speed_ms")?,
            annual_production_kwh: row.try_get("annual_production_kwh")?,
            capacity_factor: row.try_get("capacity_factor")?,
            logistics_score: row.try_get("logistics_score")?,
            overall_score: row.try_get("overall_score")?,
            monthly_breakdown: serde_json::from_value(monthly)?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
