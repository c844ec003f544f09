//! Climate sample provider: historical climate statistics for a coordinate.
//!
//! The production implementation queries the Open-Meteo archive API for
//! daily means over a fixed historical window and aggregates them into the
//! per-point statistics the sweep scores from. Errors carry an explicit
//! retry classification so the sweep's policy never has to parse error
//! prose.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

use crate::config::config;
use crate::models::{MonthlyValue, ResourceType};
use crate::solar::mj_to_kwh;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider signalled too many requests; worth retrying with backoff.
    #[error("climate provider rate limit exceeded")]
    RateLimited,
    /// Permanent rejection (bad request, missing data); retrying won't help.
    #[error("climate provider rejected the request: {0}")]
    Terminal(String),
    /// Network or server failure.
    #[error("climate provider transport failure: {0}")]
    Transport(String),
}

/// Aggregate climate statistics for one coordinate.
///
/// Irradiance figures are mean daily kWh/m² (already converted from the
/// provider's MJ/m²); `monthly` holds per-calendar-month means of the same
/// daily series and may cover fewer than 12 months.
#[derive(Clone, Debug, Default)]
pub struct ClimateStats {
    pub mean_irradiance_kwh_m2: Option<f64>,
    pub mean_wind_speed_ms: Option<f64>,
    pub monthly: Vec<MonthlyValue>,
}

#[async_trait]
pub trait ClimateProvider: Send + Sync {
    async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        resource: ResourceType,
    ) -> Result<ClimateStats, ProviderError>;
}

/// Open-Meteo historical archive source.
pub struct OpenMeteoSource {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    #[serde(default)]
    wind_speed_10m_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    shortwave_radiation_sum: Option<Vec<Option<f64>>>,
}

impl OpenMeteoSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config().provider.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    fn daily_variable(resource: ResourceType) -> &'static str {
        match resource {
            ResourceType::Solar => "shortwave_radiation_sum",
            ResourceType::Wind => "wind_speed_10m_mean",
        }
    }
}

#[async_trait]
impl ClimateProvider for OpenMeteoSource {
    async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        resource: ResourceType,
    ) -> Result<ClimateStats, ProviderError> {
        let provider = &config().provider;
        let response = self
            .client
            .get(&provider.archive_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("start_date", provider.start_date.clone()),
                ("end_date", provider.end_date.clone()),
                ("daily", Self::daily_variable(resource).to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status.is_client_error() {
            return Err(ProviderError::Terminal(format!(
                "HTTP {} for ({}, {})",
                status, lat, lon
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!("HTTP {}", status)));
        }

        let body: ArchiveResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        aggregate_daily(&body.daily, resource)
    }
}

/// Collapse a daily series into an overall mean plus per-month means.
///
/// Irradiance arrives as MJ/m² per day and is converted to kWh/m² here,
/// once, at ingestion.
fn aggregate_daily(
    daily: &DailyBlock,
    resource: ResourceType,
) -> Result<ClimateStats, ProviderError> {
    let values = match resource {
        ResourceType::Solar => daily.shortwave_radiation_sum.as_ref(),
        ResourceType::Wind => daily.wind_speed_10m_mean.as_ref(),
    }
    .ok_or_else(|| {
        ProviderError::Terminal(format!(
            "response is missing the {} series",
            OpenMeteoSource::daily_variable(resource)
        ))
    })?;

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut month_sum = [0.0f64; 12];
    let mut month_count = [0usize; 12];

    for (date_str, value) in daily.time.iter().zip(values.iter()) {
        let Some(mut v) = *value else { continue };
        if resource == ResourceType::Solar {
            v = mj_to_kwh(v);
        }
        sum += v;
        count += 1;

        if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            let idx = (date.month() - 1) as usize;
            month_sum[idx] += v;
            month_count[idx] += 1;
        }
    }

    if count == 0 {
        return Err(ProviderError::Terminal(
            "provider returned an empty daily series".into(),
        ));
    }

    let mean = sum / count as f64;
    let monthly: Vec<MonthlyValue> = (0..12)
        .filter(|&i| month_count[i] > 0)
        .map(|i| MonthlyValue {
            month: i as u32 + 1,
            value: month_sum[i] / month_count[i] as f64,
        })
        .collect();

    Ok(ClimateStats {
        mean_irradiance_kwh_m2: (resource == ResourceType::Solar).then_some(mean),
        mean_wind_speed_ms: (resource == ResourceType::Wind).then_some(mean),
        monthly,
    })
}
