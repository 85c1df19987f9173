use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{Result, ShopMetricsError};

pub const ENV_DATABASE: &str = "SHOP_METRICS_DATABASE";
pub const ENV_EXTRACTS_DIR: &str = "SHOP_METRICS_EXTRACTS_DIR";
pub const ENV_CACHE_TTL_SECS: &str = "SHOP_METRICS_CACHE_TTL_SECS";
pub const ENV_CACHE_CAPACITY: &str = "SHOP_METRICS_CACHE_CAPACITY";

/// Sub-directory of the extracts dir holding `<shop_id>.csv` creative files.
pub const CREATIVE_EXTRACT_PREFIX: &str = "creative_by_shop_id";

/// Earliest date considered when joining creatives with performance.
pub fn default_creative_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn default_extracts_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("shop-metrics").join("extracts")
    } else {
        PathBuf::from(".shop-metrics/extracts")
    }
}

/// Read an optional path from the environment.
pub(crate) fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Read an optional unsigned integer from the environment.
pub(crate) fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ShopMetricsError::Config(format!("{} must be an integer: {}", name, e))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ShopMetricsError::Config(format!("{}: {}", name, e))),
    }
}

pub(crate) fn env_secs(name: &str) -> Result<Option<Duration>> {
    Ok(env_u64(name)?.map(Duration::from_secs))
}
