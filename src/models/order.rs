use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ShopifyOrder: Order row synced from Shopify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ShopifyOrder {
    pub id: i64,
    pub shop_id: i64,
    pub customer_id: Option<i64>,
    /// Stored as text upstream; cast to a number when summed.
    pub total_price_usd: Option<String>,
    pub processed_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// FirstOrder: Earliest processed order of a customer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FirstOrder {
    pub customer_id: i64,
    pub first_order_id: i64,
}
