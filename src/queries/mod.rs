//! Query modules for the shop metrics layer.
//!
//! Each module provides a query struct that borrows from a [`Connection`](crate::connection::Connection)
//! and exposes methods returning `Result<T>` with typed models or
//! `serde_json::Value` payloads.

pub mod ad_performance;
pub mod business_daily;
pub mod creatives;
pub mod orders;

pub use ad_performance::{AdPerformanceQuery, AdPlatform, PerformanceParams};
pub use business_daily::BusinessDailyQuery;
pub use creatives::CreativeQuery;
pub use orders::ShopifyOrderQuery;

use std::collections::HashMap;

use serde_json::Value;

pub(crate) fn rows_to_values(rows: Vec<HashMap<String, Value>>) -> Vec<Value> {
    rows.into_iter()
        .map(|r| Value::Object(r.into_iter().collect()))
        .collect()
}
