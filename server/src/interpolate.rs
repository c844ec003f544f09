//! Inverse-distance-weighted interpolation of sparse scored points onto a
//! regular lattice for map rendering.
//!
//! Cost is a dense pairwise distance pass, O(cells x samples). The sample
//! set is the sparse grid cache (hundreds to low thousands of rows) and the
//! lattice is bounded by the country extent, so brute force is fine.

use serde::Serialize;

use crate::models::GridBounds;

/// Distance floor: a lattice cell landing exactly on a sample would
/// otherwise divide by zero.
const EPSILON: f64 = 1e-6;

/// Cells at or below this value are dropped from the output, so near-zero
/// ocean and no-data noise does not flood the response.
const VALUE_THRESHOLD: f64 = 0.001;

pub const DEFAULT_RESOLUTION: f64 = 0.1;
pub const DEFAULT_POWER: f64 = 2.0;

/// Floor for caller-supplied resolutions; anything finer would blow the
/// lattice up to billions of cells.
pub const MIN_RESOLUTION: f64 = 0.01;

/// A known sample to interpolate from.
#[derive(Clone, Copy, Debug)]
pub struct SamplePoint {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct RasterCell {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

fn lattice_axis(min: f64, max: f64, resolution: f64) -> Vec<f64> {
    let mut axis = Vec::new();
    let mut i = 0u32;
    loop {
        let v = min + f64::from(i) * resolution;
        if v >= max {
            break;
        }
        axis.push(v);
        i += 1;
    }
    axis
}

/// Classic IDW estimator: `u(x) = sum(w_i * u_i) / sum(w_i)` with
/// `w_i = 1 / d_i^power`. Exact at samples in the limit, with influence
/// strictly decreasing in distance; `power` tunes how local the blend is.
pub fn interpolate(
    points: &[SamplePoint],
    bounds: &GridBounds,
    resolution: f64,
    power: f64,
) -> Vec<RasterCell> {
    if points.is_empty() || resolution <= 0.0 {
        return Vec::new();
    }

    let lats = lattice_axis(bounds.lat_min, bounds.lat_max, resolution);
    let lons = lattice_axis(bounds.lon_min, bounds.lon_max, resolution);

    let mut cells = Vec::new();
    for &lat in &lats {
        for &lon in &lons {
            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for p in points {
                let d = ((lat - p.lat).powi(2) + (lon - p.lon).powi(2))
                    .sqrt()
                    .max(EPSILON);
                let w = 1.0 / d.powf(power);
                numerator += w * p.value;
                denominator += w;
            }

            let mut value = numerator / denominator;
            // All weights underflowing leaves 0/0.
            if value.is_nan() {
                value = 0.0;
            }
            if value > VALUE_THRESHOLD {
                cells.push(RasterCell { lat, lon, value });
            }
        }
    }
    cells
}
