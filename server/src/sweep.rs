//! Scheduled grid sweep: walks the national coordinate grid, refreshes stale
//! cache entries from the climate provider and scores each point.
//!
//! The sweep is a single sequential worker. The find-then-upsert sequence per
//! point is only race-free under that contract; sharding sweeps across
//! workers would need a per-coordinate guard (or a conditional update) plus a
//! shared rate budget instead of per-worker pacing sleeps.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

use crate::climate::{ClimateProvider, ClimateStats, ProviderError};
use crate::models::{GridAnalysis, GridBounds, MonthlyValue, ResourceType};
use crate::power_curve::{self, PowerCurve};
use crate::retry::{self, RetryPolicy};
use crate::solar::{self, PanelSpec};
use crate::store::GridStore;

/// How far from the geographic center the logistics penalty bottoms out.
const LOGISTICS_SPREAD: f64 = 10.0;

pub struct SweepConfig {
    pub bounds: GridBounds,
    pub step: f64,
    /// Fresh records younger than this are skipped.
    pub freshness: ChronoDuration,
    pub retry: RetryPolicy,
    /// Pause between provider calls, independent of the retry policy, to
    /// stay under the provider's steady-state rate limit.
    pub pacing: Duration,
    pub panel: PanelSpec,
    pub curve: PowerCurve,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            bounds: GridBounds::TURKEY,
            step: 0.5,
            freshness: ChronoDuration::days(30),
            retry: RetryPolicy::default(),
            pacing: Duration::from_secs(1),
            panel: PanelSpec::default(),
            curve: power_curve::reference_turbine(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub total: u32,
    pub skipped_fresh: u32,
    pub updated: u32,
    pub failed: u32,
}

/// Enumerate the grid, both bounds inclusive, coordinates rounded to 2
/// decimals. Latitude-major order.
pub fn grid_coordinates(bounds: &GridBounds, step: f64) -> Vec<(f64, f64)> {
    let mut coords = Vec::new();
    if step <= 0.0 {
        return coords;
    }
    let mut i = 0u32;
    loop {
        let lat = bounds.lat_min + f64::from(i) * step;
        if lat > bounds.lat_max + 1e-9 {
            break;
        }
        let mut j = 0u32;
        loop {
            let lon = bounds.lon_min + f64::from(j) * step;
            if lon > bounds.lon_max + 1e-9 {
                break;
            }
            coords.push((round2(lat), round2(lon)));
            j += 1;
        }
        i += 1;
    }
    coords
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Proximity-to-center proxy for road and grid access cost. Anchored at the
/// country center regardless of sweep bound overrides.
pub fn logistics_score(lat: f64) -> f64 {
    let distance = (lat - GridBounds::TURKEY.center_lat()).abs();
    round2((1.0 - distance / LOGISTICS_SPREAD).clamp(0.4, 1.0))
}

fn is_fresh(record: &GridAnalysis, now: DateTime<Utc>, freshness: ChronoDuration) -> bool {
    record.overall_score > 0.0 && now - record.updated_at < freshness
}

/// Zero-score placeholder written on failure; `overall_score == 0` makes the
/// point a retry candidate on the next sweep.
fn failure_record(lat: f64, lon: f64, resource: ResourceType) -> GridAnalysis {
    GridAnalysis {
        latitude: lat,
        longitude: lon,
        resource_type: resource,
        annual_potential_kwh_m2: None,
        avg_wind_speed_ms: None,
        annual_production_kwh: None,
        capacity_factor: None,
        logistics_score: 0.0,
        overall_score: 0.0,
        monthly_breakdown: Vec::new(),
        updated_at: Utc::now(),
    }
}

/// Turn climate statistics into a scored cache record.
fn score_record(
    lat: f64,
    lon: f64,
    resource: ResourceType,
    stats: &ClimateStats,
    config: &SweepConfig,
) -> Result<GridAnalysis, ProviderError> {
    let logistics = logistics_score(lat);

    let record = match resource {
        ResourceType::Solar => {
            let daily_ghi = stats.mean_irradiance_kwh_m2.ok_or_else(|| {
                ProviderError::Terminal("missing irradiance statistic".into())
            })?;
            let annual_potential = daily_ghi * 365.0;
            let monthly_irr = (!stats.monthly.is_empty()).then_some(stats.monthly.as_slice());
            let est = solar::estimate_production(daily_ghi, &config.panel, monthly_irr);
            GridAnalysis {
                latitude: lat,
                longitude: lon,
                resource_type: resource,
                annual_potential_kwh_m2: Some(annual_potential),
                avg_wind_speed_ms: None,
                annual_production_kwh: Some(est.annual_kwh),
                capacity_factor: None,
                logistics_score: logistics,
                overall_score: annual_potential * logistics,
                monthly_breakdown: est.monthly_kwh,
                updated_at: Utc::now(),
            }
        }
        ResourceType::Wind => {
            let speed = stats.mean_wind_speed_ms.ok_or_else(|| {
                ProviderError::Terminal("missing wind speed statistic".into())
            })?;
            let est = power_curve::derive_annual_production(speed, &config.curve);
            // Monthly mean speeds, back-filled with the annual mean.
            let monthly = (1..=12u32)
                .map(|month| MonthlyValue {
                    month,
                    value: stats
                        .monthly
                        .iter()
                        .find(|m| m.month == month)
                        .map(|m| m.value)
                        .unwrap_or(speed),
                })
                .collect();
            // Stored figures are rounded: speed to centi-m/s, production to
            // whole kWh, capacity factor to 3 decimals.
            let speed = round2(speed);
            GridAnalysis {
                latitude: lat,
                longitude: lon,
                resource_type: resource,
                annual_potential_kwh_m2: None,
                avg_wind_speed_ms: Some(speed),
                annual_production_kwh: Some(est.annual_production_kwh.round()),
                capacity_factor: Some(round3(est.capacity_factor)),
                logistics_score: logistics,
                overall_score: speed * logistics,
                monthly_breakdown: monthly,
                updated_at: Utc::now(),
            }
        }
    };
    Ok(record)
}

/// Walk the whole grid once. Individual point failures are recorded as
/// zero-score rows and never abort the sweep; a store read failure does,
/// since freshness decisions would be unsound without it.
pub async fn run_sweep<P, S>(
    provider: &P,
    store: &S,
    resource: ResourceType,
    config: &SweepConfig,
) -> anyhow::Result<SweepSummary>
where
    P: ClimateProvider,
    S: GridStore,
{
    let coords = grid_coordinates(&config.bounds, config.step);
    log::info!(
        "Starting {} sweep: {} grid points, step {}",
        resource,
        coords.len(),
        config.step
    );

    let mut summary = SweepSummary::default();
    for (lat, lon) in coords {
        summary.total += 1;

        let existing = store.find(lat, lon, resource).await?;
        if let Some(existing) = &existing {
            if is_fresh(existing, Utc::now(), config.freshness) {
                summary.skipped_fresh += 1;
                continue;
            }
        }

        log::debug!("Scanning ({}, {})", lat, lon);
        let fetched =
            retry::with_backoff(|| provider.fetch(lat, lon, resource), &config.retry).await;

        let record = match fetched.and_then(|stats| score_record(lat, lon, resource, &stats, config))
        {
            Ok(record) => {
                summary.updated += 1;
                record
            }
            Err(err) => {
                log::warn!("Scan failed for ({}, {}): {}", lat, lon, err);
                summary.failed += 1;
                failure_record(lat, lon, resource)
            }
        };

        if let Err(err) = store.upsert(&record).await {
            // A lost point will be retried next sweep; the batch goes on.
            log::error!("Failed to store analysis for ({}, {}): {}", lat, lon, err);
        }

        tokio::time::sleep(config.pacing).await;
    }

    log::info!(
        "{} sweep complete: {} checked, {} fresh, {} updated, {} failed",
        resource,
        summary.total,
        summary.skipped_fresh,
        summary.updated,
        summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Provider double: replays a script of results, then falls back to a
    /// fixed response. Records every call it receives.
    struct FakeProvider {
        script: Mutex<VecDeque<Result<ClimateStats, ProviderError>>>,
        fallback: ClimateStats,
        calls: Mutex<Vec<(f64, f64)>>,
    }

    impl FakeProvider {
        fn wind(speed: f64) -> Self {
            FakeProvider {
                script: Mutex::new(VecDeque::new()),
                fallback: ClimateStats {
                    mean_wind_speed_ms: Some(speed),
                    ..Default::default()
                },
                calls: Mutex::new(Vec::new()),
            }
        }

        fn solar(daily_kwh_m2: f64, monthly: Vec<MonthlyValue>) -> Self {
            FakeProvider {
                script: Mutex::new(VecDeque::new()),
                fallback: ClimateStats {
                    mean_irradiance_kwh_m2: Some(daily_kwh_m2),
                    monthly,
                    ..Default::default()
                },
                calls: Mutex::new(Vec::new()),
            }
        }

        fn scripted(self, script: Vec<Result<ClimateStats, ProviderError>>) -> Self {
            FakeProvider {
                script: Mutex::new(script.into()),
                ..self
            }
        }

        async fn call_count(&self) -> usize {
            self.calls.lock().await.len()
        }
    }

    #[async_trait]
    impl ClimateProvider for FakeProvider {
        async fn fetch(
            &self,
            lat: f64,
            lon: f64,
            _resource: ResourceType,
        ) -> Result<ClimateStats, ProviderError> {
            self.calls.lock().await.push((lat, lon));
            match self.script.lock().await.pop_front() {
                Some(result) => result,
                None => Ok(self.fallback.clone()),
            }
        }
    }

    /// Store double that fails on demand: all reads, or the next N writes.
    struct FailingStore {
        inner: MemoryStore,
        fail_finds: bool,
        upsert_failures: Mutex<u32>,
    }

    impl FailingStore {
        fn new(fail_finds: bool, upsert_failures: u32) -> Self {
            FailingStore {
                inner: MemoryStore::new(),
                fail_finds,
                upsert_failures: Mutex::new(upsert_failures),
            }
        }
    }

    #[async_trait]
    impl GridStore for FailingStore {
        async fn find(
            &self,
            lat: f64,
            lon: f64,
            resource: ResourceType,
        ) -> anyhow::Result<Option<GridAnalysis>> {
            if self.fail_finds {
                anyhow::bail!("cache store unavailable");
            }
            self.inner.find(lat, lon, resource).await
        }

        async fn upsert(&self, record: &GridAnalysis) -> anyhow::Result<()> {
            let mut left = self.upsert_failures.lock().await;
            if *left > 0 {
                *left -= 1;
                anyhow::bail!("write rejected");
            }
            self.inner.upsert(record).await
        }

        async fn scored_points(
            &self,
            resource: ResourceType,
        ) -> anyhow::Result<Vec<GridAnalysis>> {
            self.inner.scored_points(resource).await
        }
    }

    fn fast_config(bounds: GridBounds, step: f64) -> SweepConfig {
        SweepConfig {
            bounds,
            step,
            pacing: Duration::ZERO,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::ZERO,
                jitter_factor: 0.0,
            },
            ..SweepConfig::default()
        }
    }

    fn single_point(lat: f64, lon: f64) -> GridBounds {
        GridBounds {
            lat_min: lat,
            lat_max: lat,
            lon_min: lon,
            lon_max: lon,
        }
    }

    // =========================================================================
    // Grid enumeration & scoring helpers
    // =========================================================================

    #[test]
    fn test_grid_enumeration_is_inclusive_and_rounded() {
        let bounds = GridBounds {
            lat_min: 36.0,
            lat_max: 37.0,
            lon_min: 35.0,
            lon_max: 36.0,
        };
        let coords = grid_coordinates(&bounds, 1.0);
        assert_eq!(
            coords,
            vec![(36.0, 35.0), (36.0, 36.0), (37.0, 35.0), (37.0, 36.0)]
        );

        // Fractional steps accumulate cleanly.
        let coords = grid_coordinates(&GridBounds::TURKEY, 0.5);
        assert_eq!(coords.len(), 13 * 37);
        assert_eq!(*coords.last().unwrap(), (42.0, 44.0));
    }

    #[test]
    fn test_logistics_score_clamps_and_peaks_at_center() {
        assert_eq!(logistics_score(39.0), 1.0);
        assert_eq!(logistics_score(36.0), 0.7);
        assert_eq!(logistics_score(42.0), 0.7);
        // Far outside the country the floor holds.
        assert_eq!(logistics_score(20.0), 0.4);
    }

    // =========================================================================
    // run_sweep scenarios
    // =========================================================================

    #[tokio::test]
    async fn test_end_to_end_wind_sweep_over_four_points() {
        let provider = FakeProvider::wind(7.0);
        let store = MemoryStore::new();
        let config = fast_config(
            GridBounds {
                lat_min: 36.0,
                lat_max: 37.0,
                lon_min: 35.0,
                lon_max: 36.0,
            },
            1.0,
        );

        let summary = run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(
            summary,
            SweepSummary {
                total: 4,
                skipped_fresh: 0,
                updated: 4,
                failed: 0
            }
        );

        let records = store.scored_points(ResourceType::Wind).await.unwrap();
        assert_eq!(records.len(), 4);
        let expected_production = 950.0 * 1.6 * 8760.0;
        for r in &records {
            assert_eq!(r.avg_wind_speed_ms, Some(7.0));
            assert!((r.annual_production_kwh.unwrap() - expected_production).abs() < 1e-6);
            assert_eq!(r.monthly_breakdown.len(), 12);
            assert_eq!(r.overall_score, 7.0 * logistics_score(r.latitude));
        }
    }

    #[tokio::test]
    async fn test_fresh_records_are_skipped_without_provider_calls() {
        let provider = FakeProvider::wind(7.0);
        let store = MemoryStore::new();
        let config = fast_config(single_point(39.0, 35.0), 1.0);

        run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(provider.call_count().await, 1);
        let first = store
            .find(39.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .unwrap();

        let summary = run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(provider.call_count().await, 1, "second sweep must not fetch");
        assert_eq!(summary.skipped_fresh, 1);

        let second = store
            .find(39.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.updated_at, second.updated_at);
        assert_eq!(first.overall_score, second.overall_score);
    }

    #[tokio::test]
    async fn test_zero_score_record_is_retried_regardless_of_age() {
        let store = MemoryStore::new();
        let mut seeded = failure_record(39.0, 35.0, ResourceType::Wind);
        seeded.updated_at = Utc::now();
        store.upsert(&seeded).await.unwrap();

        let provider = FakeProvider::wind(6.0);
        let config = fast_config(single_point(39.0, 35.0), 1.0);
        run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();

        assert_eq!(provider.call_count().await, 1, "zero-score point must be re-fetched");
        let record = store
            .find(39.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.avg_wind_speed_ms, Some(6.0));
        assert!(record.overall_score > 0.0);
    }

    #[tokio::test]
    async fn test_stale_record_is_rescanned() {
        let provider = FakeProvider::wind(9.0);
        let store = MemoryStore::new();
        let config = fast_config(single_point(39.0, 35.0), 1.0);

        run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        // Age the record past the freshness window.
        let mut aged = store
            .find(39.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .unwrap();
        aged.updated_at = Utc::now() - ChronoDuration::days(31);
        store.upsert(&aged).await.unwrap();

        let summary = run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(provider.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_rate_limited_point_retried_then_succeeds() {
        let provider = FakeProvider::wind(6.0).scripted(vec![
            Err(ProviderError::RateLimited),
            Err(ProviderError::RateLimited),
            Ok(ClimateStats {
                mean_wind_speed_ms: Some(6.0),
                ..Default::default()
            }),
        ]);
        let store = MemoryStore::new();
        let config = fast_config(single_point(39.0, 35.0), 1.0);

        let summary = run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(provider.call_count().await, 3);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);

        let record = store
            .find(39.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.avg_wind_speed_ms, Some(6.0));
    }

    #[tokio::test]
    async fn test_terminal_error_writes_zero_score_and_does_not_retry() {
        let provider = FakeProvider::wind(6.0)
            .scripted(vec![Err(ProviderError::Terminal("bad request".into()))]);
        let store = MemoryStore::new();
        let config = fast_config(single_point(39.0, 35.0), 1.0);

        let summary = run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(provider.call_count().await, 1);
        assert_eq!(summary.failed, 1);

        let record = store
            .find(39.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.overall_score, 0.0);
        assert_eq!(record.logistics_score, 0.0);
        assert_eq!(record.avg_wind_speed_ms, None);
        assert!(record.monthly_breakdown.is_empty());

        // Failed points never surface on the map.
        assert!(store
            .scored_points(ResourceType::Wind)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_wind_record_figures_are_rounded() {
        let provider = FakeProvider::wind(6.789);
        let store = MemoryStore::new();
        let config = fast_config(single_point(39.0, 35.0), 1.0);

        run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        let record = store
            .find(39.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.avg_wind_speed_ms, Some(6.79));
        assert_eq!(record.overall_score, 6.79 * logistics_score(39.0));

        let production = record.annual_production_kwh.unwrap();
        assert_eq!(production, production.round());

        let cf = record.capacity_factor.unwrap();
        assert!((cf * 1000.0 - (cf * 1000.0).round()).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_solar_sweep_scores_from_irradiance() {
        let provider = FakeProvider::solar(
            5.0,
            vec![MonthlyValue { month: 6, value: 7.0 }],
        );
        let store = MemoryStore::new();
        let config = fast_config(single_point(39.0, 35.0), 1.0);

        run_sweep(&provider, &store, ResourceType::Solar, &config)
            .await
            .unwrap();
        let record = store
            .find(39.0, 35.0, ResourceType::Solar)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.annual_potential_kwh_m2, Some(5.0 * 365.0));
        assert_eq!(record.avg_wind_speed_ms, None);
        assert_eq!(record.overall_score, 5.0 * 365.0 * 1.0);
        assert_eq!(record.monthly_breakdown.len(), 12);

        // June comes from the real monthly figure, not the back-fill.
        let panel = &config.panel;
        let june = &record.monthly_breakdown[5];
        let expected =
            7.0 * panel.area_m2 * panel.efficiency * panel.performance_ratio * 30.0;
        assert!((june.value - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_store_read_failure_aborts_sweep() {
        let provider = FakeProvider::wind(7.0);
        let store = FailingStore::new(true, 0);
        let config = fast_config(
            GridBounds {
                lat_min: 36.0,
                lat_max: 37.0,
                lon_min: 35.0,
                lon_max: 36.0,
            },
            1.0,
        );

        let result = run_sweep(&provider, &store, ResourceType::Wind, &config).await;
        assert!(result.is_err(), "a failed freshness lookup must abort");
        assert_eq!(provider.call_count().await, 0, "no fetch without a sound freshness check");
    }

    #[tokio::test]
    async fn test_store_write_failure_is_skipped_and_sweep_completes() {
        let provider = FakeProvider::wind(7.0);
        // First upsert rejected, the rest go through.
        let store = FailingStore::new(false, 1);
        let config = fast_config(
            GridBounds {
                lat_min: 36.0,
                lat_max: 36.0,
                lon_min: 35.0,
                lon_max: 36.0,
            },
            1.0,
        );

        let summary = run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(
            summary,
            SweepSummary {
                total: 2,
                skipped_fresh: 0,
                updated: 2,
                failed: 0
            }
        );

        // The lost point simply isn't there; it will be retried next sweep.
        assert!(store
            .find(36.0, 35.0, ResourceType::Wind)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find(36.0, 36.0, ResourceType::Wind)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_sweep_continues_past_failed_points() {
        let provider = FakeProvider::wind(7.0)
            .scripted(vec![Err(ProviderError::Transport("conn reset".into()))]);
        let store = MemoryStore::new();
        let config = fast_config(
            GridBounds {
                lat_min: 36.0,
                lat_max: 36.0,
                lon_min: 35.0,
                lon_max: 36.0,
            },
            1.0,
        );

        let summary = run_sweep(&provider, &store, ResourceType::Wind, &config)
            .await
            .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.updated, 1);
    }
}
