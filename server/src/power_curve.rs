//! Turbine power curve lookup and annual production estimate.
//!
//! A power curve is a sparse table of (wind speed m/s, power kW) reference
//! pairs. Speeds below the first key (cut-in) or above the last key
//! (cut-out) produce zero power; anything in between is linearly
//! interpolated.

use anyhow::{bail, Result};

const HOURS_PER_YEAR: f64 = 8760.0;

/// Realistic ceiling for onshore capacity factors.
const MAX_CAPACITY_FACTOR: f64 = 0.55;

/// Validated, ascending table of `(speed m/s, power kW)` pairs.
#[derive(Clone, Debug)]
pub struct PowerCurve {
    points: Vec<(f64, f64)>,
}

impl PowerCurve {
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self> {
        if points.is_empty() {
            bail!("power curve requires at least one reference pair");
        }
        for (speed, power) in &points {
            if !speed.is_finite() || !power.is_finite() {
                bail!("power curve contains a non-finite entry");
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(PowerCurve { points })
    }

    /// Nameplate power: the highest output anywhere on the curve.
    pub fn rated_power_kw(&self) -> f64 {
        self.points.iter().fold(0.0, |acc, &(_, p)| acc.max(p))
    }

    /// Instantaneous output (kW) at `speed`, with cut-in/cut-out semantics.
    pub fn power_at(&self, speed: f64) -> f64 {
        let first = self.points[0].0;
        let last = self.points[self.points.len() - 1].0;
        if speed < first || speed > last {
            return 0.0;
        }

        match self
            .points
            .binary_search_by(|(s, _)| s.total_cmp(&speed))
        {
            Ok(i) => self.points[i].1,
            Err(i) => {
                let (s_lo, p_lo) = self.points[i - 1];
                let (s_hi, p_hi) = self.points[i];
                // Duplicate keys would divide by zero.
                if s_hi == s_lo {
                    return p_lo;
                }
                p_lo + (speed - s_lo) * (p_hi - p_lo) / (s_hi - s_lo)
            }
        }
    }
}

/// Generic 3.3 MW onshore turbine used for grid scoring.
pub fn reference_turbine() -> PowerCurve {
    PowerCurve::new(vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (2.0, 0.0),
        (3.0, 50.0),
        (4.0, 150.0),
        (5.0, 350.0),
        (6.0, 600.0),
        (7.0, 950.0),
        (8.0, 1400.0),
        (9.0, 1900.0),
        (10.0, 2300.0),
        (11.0, 2700.0),
        (12.0, 3000.0),
        (13.0, 3200.0),
        (14.0, 3300.0),
        (25.0, 3300.0),
        (30.0, 0.0),
    ])
    .expect("reference turbine curve is valid")
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindEstimate {
    pub avg_wind_speed_ms: f64,
    pub annual_production_kwh: f64,
    pub capacity_factor: f64,
}

/// Annual energy estimate from an average wind speed.
///
/// Power at the mean speed underestimates energy: instantaneous power grows
/// with the cube of speed and real wind varies around the mean, so a
/// variability correction is applied (1.6 below 8 m/s, 1.2 above). The
/// resulting capacity factor is capped at 0.55. Heuristic constants, kept
/// as-is because downstream scoring depends on them.
pub fn derive_annual_production(avg_speed: f64, curve: &PowerCurve) -> WindEstimate {
    let base_power_kw = curve.power_at(avg_speed);

    let variability_factor = if avg_speed < 8.0 { 1.6 } else { 1.2 };
    let mut annual_production_kwh = base_power_kw * variability_factor * HOURS_PER_YEAR;

    let rated_power = curve.rated_power_kw();
    let mut capacity_factor = if rated_power > 0.0 {
        annual_production_kwh / (rated_power * HOURS_PER_YEAR)
    } else {
        0.0
    };

    if capacity_factor > MAX_CAPACITY_FACTOR {
        capacity_factor = MAX_CAPACITY_FACTOR;
        annual_production_kwh = rated_power * HOURS_PER_YEAR * MAX_CAPACITY_FACTOR;
    }

    WindEstimate {
        avg_wind_speed_ms: avg_speed,
        annual_production_kwh,
        capacity_factor,
    }
}
