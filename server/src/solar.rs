//! Photovoltaic production estimate from irradiance statistics.

use crate::models::MonthlyValue;

const DAYS_PER_YEAR: f64 = 365.0;

const DAYS_IN_MONTH: [f64; 12] = [
    31.0, 28.0, 31.0, 30.0, 31.0, 30.0, 31.0, 31.0, 30.0, 31.0, 30.0, 31.0,
];

/// Panel parameters for grid scoring. Defaults mirror a standard 400 W
/// panel: 2 m², 15% module efficiency, 0.80 system performance ratio.
#[derive(Clone, Debug)]
pub struct PanelSpec {
    pub area_m2: f64,
    pub efficiency: f64,
    pub performance_ratio: f64,
}

impl Default for PanelSpec {
    fn default() -> Self {
        PanelSpec {
            area_m2: 2.0,
            efficiency: 0.15,
            performance_ratio: 0.80,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolarEstimate {
    pub daily_kwh: f64,
    pub annual_kwh: f64,
    /// Always exactly 12 entries, January through December.
    pub monthly_kwh: Vec<MonthlyValue>,
}

/// Convert an irradiance figure from MJ/m² to kWh/m² (1 kWh = 3.6 MJ).
///
/// Applied exactly once, at provider ingestion. Everything downstream of the
/// climate provider works in kWh.
pub fn mj_to_kwh(mj: f64) -> f64 {
    mj / 3.6
}

/// Fallback seasonal weight when no real monthly data is available: summer
/// months (March..August) up 40%, the rest down 40%. A documented
/// placeholder, deliberately not a uniform split; the two halves cancel so
/// the 12 months still sum to the annual total.
fn seasonal_weight(month: u32) -> f64 {
    if (3..=8).contains(&month) {
        1.4
    } else {
        0.6
    }
}

/// Estimate PV production from a mean daily irradiance (kWh/m²).
///
/// When a monthly irradiance breakdown (mean daily kWh/m² per month) is
/// supplied, each covered month gets a real per-month figure and any missing
/// month is back-filled with `annual / 12`; without one, the annual total is
/// redistributed over the seasonal curve. Either way the result carries
/// exactly 12 monthly entries.
pub fn estimate_production(
    daily_irradiance_kwh_m2: f64,
    panel: &PanelSpec,
    monthly_irradiance: Option<&[MonthlyValue]>,
) -> SolarEstimate {
    let daily_kwh =
        daily_irradiance_kwh_m2 * panel.area_m2 * panel.efficiency * panel.performance_ratio;
    let annual_kwh = daily_kwh * DAYS_PER_YEAR;

    let monthly_kwh = match monthly_irradiance {
        Some(months) => {
            let mut out = Vec::with_capacity(12);
            for month in 1..=12u32 {
                let value = months
                    .iter()
                    .find(|m| m.month == month)
                    .map(|m| {
                        m.value
                            * panel.area_m2
                            * panel.efficiency
                            * panel.performance_ratio
                            * DAYS_IN_MONTH[(month - 1) as usize]
                    })
                    .unwrap_or(annual_kwh / 12.0);
                out.push(MonthlyValue { month, value });
            }
            out
        }
        None => (1..=12u32)
            .map(|month| MonthlyValue {
                month,
                value: annual_kwh / 12.0 * seasonal_weight(month),
            })
            .collect(),
    };

    SolarEstimate {
        daily_kwh,
        annual_kwh,
        monthly_kwh,
    }
}
