use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BusinessDaily: One shop's blended metrics for one day
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BusinessDaily {
    pub shop_id: i64,
    pub date: NaiveDate,
    pub channel: Option<String>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub orders: Option<f64>,
    #[serde(default)]
    pub spend: Option<f64>,
    #[serde(default)]
    pub impressions: Option<f64>,
    #[serde(default)]
    pub clicks: Option<f64>,
    #[serde(default)]
    pub conversions: Option<f64>,
}
