use once_cell::sync::Lazy;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    /// Per-request timeout; also bounds the cumulative retry budget per point.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
}

fn default_archive_url() -> String {
    "https://archive-api.open-meteo.com/v1/archive".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// Fixed decade of history: long enough to smooth out anomalous years,
// recent enough to reflect the current climate.
fn default_start_date() -> String {
    "2014-01-01".to_string()
}

fn default_end_date() -> String {
    "2023-12-31".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub provider: ProviderConfig,
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    envy::prefixed("RENATLAS_PROVIDER_")
        .from_env::<ProviderConfig>()
        .map(|provider| Config { provider })
        .expect("Invalid provider config. Supported env vars: RENATLAS_PROVIDER_ARCHIVE_URL, RENATLAS_PROVIDER_TIMEOUT_SECS, RENATLAS_PROVIDER_START_DATE, RENATLAS_PROVIDER_END_DATE")
});

pub fn config() -> &'static Config {
    &CONFIG
}
