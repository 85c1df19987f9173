use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AdAccount: Ad platform account linked to a shop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdAccount {
    /// Platform-side account id (`google_id` / `facebook_id`).
    #[serde(alias = "google_id", alias = "facebook_id", alias = "account_id")]
    pub platform_id: String,
    pub name: String,
    pub currency: String,
    pub shop_id: i64,
    pub created_time: Option<String>,
    pub time_zone: Option<String>,
    pub timezone_offset_hours_utc: Option<i64>,
    #[serde(default = "default_connected")]
    pub connected: bool,
}

fn default_connected() -> bool {
    true
}

// ---------------------------------------------------------------------------
// AdPerformanceRow: Summed ad performance (query result)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdPerformanceRow {
    pub ad_id: String,
    pub shop_id: i64,
    pub account_id: String,
    pub impr: f64,
    pub link_clicks: f64,
    pub purch: f64,
    pub spend: f64,
    pub purch_value: f64,
    #[serde(default)]
    pub year_month: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}
