//! Shared test fixtures for the shop metrics integration tests.
//!
//! Provides `setup_sample_db()` which creates an in-memory DuckDB connection
//! populated with small warehouse tables (business_daily, shopify_order,
//! google/facebook daily performance and ad accounts), and `setup_sdk()`
//! which additionally writes creative extracts to a temporary directory.

#![allow(dead_code)]

use chrono::NaiveDate;
use shop_metrics::{Connection, ShopMetrics};
use std::fs;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Create an in-memory `Connection` with sample data loaded.
pub fn setup_sample_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();

    // -- business_daily -------------------------------------------------------
    register_business_daily(&conn);

    // -- shopify_order --------------------------------------------------------
    register_shopify_orders(&conn);

    // -- ad performance and accounts ------------------------------------------
    register_ad_tables(&conn);

    conn
}

/// Create a `ShopMetrics` over the sample data, with creative extracts for
/// shops 1 and 2 written below a temporary extracts directory.
///
/// The caller must keep the `TempDir` alive for the duration of the test.
pub fn setup_sdk() -> (ShopMetrics, tempfile::TempDir) {
    setup_sdk_with_ttl(Duration::from_secs(60))
}

pub fn setup_sdk_with_ttl(ttl: Duration) -> (ShopMetrics, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    write_creative_extracts(tmp_dir.path());

    let sdk = ShopMetrics::builder()
        .extracts_dir(tmp_dir.path())
        .cache_ttl(ttl)
        .build_with_connection(setup_sample_db());
    (sdk, tmp_dir)
}

fn business_row(
    shop_id: i64,
    date: &str,
    channel: &str,
    revenue: f64,
    orders: i64,
    spend: Option<f64>,
) -> serde_json::Value {
    serde_json::json!({
        "shop_id": shop_id,
        "date": date,
        "channel": channel,
        "revenue": revenue,
        "orders": orders,
        "spend": spend,
        "impressions": 1000.0,
        "clicks": 50.0,
        "conversions": orders as f64
    })
}

fn register_business_daily(conn: &Connection) {
    let rows = vec![
        // Shop 1 inside January / February 2024.
        business_row(1, "2024-01-05", "google", 100.0, 2, Some(10.0)),
        business_row(1, "2024-01-20", "meta", 50.0, 1, Some(5.0)),
        business_row(1, "2024-01-21", "meta", 20.0, 1, None),
        business_row(1, "2024-02-02", "google", 30.0, 1, Some(7.0)),
        // Shop 1 outside the window used by most tests.
        business_row(1, "2023-12-31", "google", 999.0, 9, Some(100.0)),
        business_row(1, "2024-03-01", "google", 999.0, 9, Some(1000.0)),
        // Another shop on the same days.
        business_row(2, "2024-01-05", "google", 400.0, 4, Some(40.0)),
        business_row(2, "2024-01-10", "meta", 300.0, 3, Some(30.0)),
    ];

    write_ndjson_and_register(conn, "business_daily", &rows);
}

fn register_shopify_orders(conn: &Connection) {
    // Explicit types: `total_price_usd` is stored as text upstream.
    conn.execute_batch(
        "CREATE TABLE shopify_order (
            id BIGINT,
            shop_id BIGINT,
            customer_id BIGINT,
            total_price_usd VARCHAR,
            processed_at TIMESTAMP,
            created_at TIMESTAMP
        );
        INSERT INTO shopify_order VALUES
            (101, 1, 7, '12.50', '2024-01-03 10:00:00', '2024-01-03 09:55:00'),
            (102, 1, 8, '20.00', '2024-01-04 11:00:00', '2024-01-04 10:00:00'),
            (103, 1, 7, '7.50',  '2024-01-10 12:00:00', '2024-01-10 12:00:00'),
            (104, 1, NULL, '99.00', '2024-01-11 08:00:00', '2024-01-11 08:00:00'),
            (105, 1, 8, 'n/a',   '2024-01-12 08:00:00', '2024-01-12 08:00:00'),
            (106, 1, 9, '5.00',  '2024-02-15 08:00:00', '2024-02-15 08:00:00'),
            (201, 2, 7, '1000.00', '2024-01-05 08:00:00', '2024-01-05 08:00:00');",
    )
    .unwrap();
}

fn register_ad_tables(conn: &Connection) {
    let google = vec![
        serde_json::json!({"ad_id": "g-1", "shop_id": 1, "account_id": "gacc-1", "date_start": "2024-01-05",
            "impressions": 1000.0, "clicks": 40.0, "conversions_purchase": 2.0, "spend": 20.0, "conversions_value_purchase": 80.0}),
        serde_json::json!({"ad_id": "g-1", "shop_id": 1, "account_id": "gacc-1", "date_start": "2024-01-25",
            "impressions": 500.0, "clicks": 10.0, "conversions_purchase": 1.0, "spend": 10.0, "conversions_value_purchase": 40.0}),
        serde_json::json!({"ad_id": "g-1", "shop_id": 1, "account_id": "gacc-1", "date_start": "2024-02-03",
            "impressions": 200.0, "clicks": 5.0, "conversions_purchase": 0.0, "spend": 4.0, "conversions_value_purchase": 0.0}),
        serde_json::json!({"ad_id": "g-2", "shop_id": 2, "account_id": "gacc-2", "date_start": "2024-01-06",
            "impressions": 300.0, "clicks": 3.0, "conversions_purchase": 0.0, "spend": 3.0, "conversions_value_purchase": 0.0}),
    ];
    write_ndjson_and_register(conn, "google_daily_performance", &google);

    let facebook = vec![
        serde_json::json!({"ad_id": "f-1", "shop_id": 1, "account_id": "facc-1", "date_start": "2024-01-05",
            "impressions": 2000.0, "clicks": 100.0, "conversions_purchase": 4.0, "spend": 50.0, "conversions_value_purchase": 200.0}),
        serde_json::json!({"ad_id": "f-1", "shop_id": 1, "account_id": "facc-1", "date_start": "2024-01-06",
            "impressions": 1000.0, "clicks": 0.0, "conversions_purchase": 0.0, "spend": 25.0, "conversions_value_purchase": 0.0}),
        serde_json::json!({"ad_id": "f-2", "shop_id": 1, "account_id": "facc-1", "date_start": "2024-01-07",
            "impressions": 0.0, "clicks": 0.0, "conversions_purchase": 0.0, "spend": 0.0, "conversions_value_purchase": 0.0}),
        serde_json::json!({"ad_id": "f-3", "shop_id": 2, "account_id": "facc-2", "date_start": "2024-01-05",
            "impressions": 400.0, "clicks": 20.0, "conversions_purchase": 1.0, "spend": 10.0, "conversions_value_purchase": 30.0}),
    ];
    write_ndjson_and_register(conn, "facebook_daily_performance", &facebook);

    let google_accounts = vec![
        serde_json::json!({"google_id": "gacc-1", "name": "Shop One Search", "currency": "EUR", "shop_id": 1}),
        serde_json::json!({"google_id": "gacc-2", "name": "Shop Two Search", "currency": "USD", "shop_id": 2}),
    ];
    write_ndjson_and_register(conn, "google_ad_account", &google_accounts);

    let facebook_accounts = vec![
        serde_json::json!({"facebook_id": "facc-1", "name": "Shop One Social", "currency": "USD", "shop_id": 1}),
        serde_json::json!({"facebook_id": "facc-0", "name": "Another Social", "currency": "USD", "shop_id": 1}),
        serde_json::json!({"facebook_id": "facc-2", "name": "Shop Two Social", "currency": "GBP", "shop_id": 2}),
    ];
    write_ndjson_and_register(conn, "facebook_ad_account", &facebook_accounts);
}

/// Write `creative_by_shop_id/<shop>.csv` extracts for shops 1 and 2.
pub fn write_creative_extracts(dir: &std::path::Path) {
    let prefix = dir.join("creative_by_shop_id");
    fs::create_dir_all(&prefix).unwrap();
    fs::write(
        prefix.join("1.csv"),
        "ad_id,shop_id,headline,has_video\nf-1,1,Summer sale,true\nf-2,1,New arrivals,false\nf-9,1,Never ran,false\n",
    )
    .unwrap();
    fs::write(
        prefix.join("2.csv"),
        "ad_id,shop_id,headline,has_video\nf-3,2,Free shipping,true\n",
    )
    .unwrap();
    // Not a shop extract.
    fs::write(prefix.join("README.txt"), "synced nightly\n").unwrap();
}

/// Write a slice of JSON values as NDJSON to a temp file and register it
/// as a DuckDB table via `Connection::register_table_from_ndjson`.
pub fn write_ndjson_and_register(conn: &Connection, table_name: &str, rows: &[serde_json::Value]) {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
    file.flush().unwrap();

    let path = file.path().to_str().unwrap();
    conn.register_table_from_ndjson(table_name, path).unwrap();
    // DuckDB has copied the rows into an in-memory table by now.
}
