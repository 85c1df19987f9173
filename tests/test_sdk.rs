//! `ShopMetrics` facade tests: builder, caching and raw SQL.

mod common;

use std::time::Duration;

use common::d;
use shop_metrics::{AggregationRequest, PeriodType, ShopMetrics, SqlParam};

fn monthly_spend() -> AggregationRequest {
    AggregationRequest::new(1, PeriodType::Monthly, d(2024, 1, 1), d(2024, 2, 29)).metrics(["spend"])
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[test]
fn builder_defaults_to_in_memory_database() {
    let sdk = ShopMetrics::builder().cache_ttl(Duration::from_secs(1)).build().unwrap();
    assert!(sdk.connection().registered_tables().is_empty());
    assert!(sdk.cache().is_enabled());
    assert_eq!(sdk.cache().ttl(), Duration::from_secs(1));
}

#[test]
fn builder_opens_database_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("warehouse.duckdb");

    {
        let sdk = ShopMetrics::builder().database(&path).build().unwrap();
        sdk.connection()
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (42)")
            .unwrap();
    }

    let sdk = ShopMetrics::builder().database(&path).build().unwrap();
    let rows = sdk.sql("SELECT x FROM t", &[]).unwrap();
    assert_eq!(rows[0]["x"], 42);
}

#[test]
fn display_lists_loaded_tables() {
    let (sdk, _tmp) = common::setup_sdk();
    let shown = sdk.to_string();
    assert!(shown.starts_with("ShopMetrics("));
    assert!(shown.contains("business_daily"));
    assert!(shown.contains("facebook_ad_account"));
}

#[test]
fn from_env_keeps_defaults_when_unset() {
    let builder = shop_metrics::ShopMetricsBuilder::from_env().unwrap();
    let sdk = builder.build_with_connection(common::setup_sample_db());
    assert!(sdk.cache().is_enabled());
}

// ---------------------------------------------------------------------------
// business_daily().get
// ---------------------------------------------------------------------------

#[test]
fn get_returns_daily_row() {
    let (sdk, _tmp) = common::setup_sdk();
    let row = sdk.business_daily().get(1, d(2024, 1, 21)).unwrap().unwrap();

    assert_eq!(row.shop_id, 1);
    assert_eq!(row.date, d(2024, 1, 21));
    assert_eq!(row.channel.as_deref(), Some("meta"));
    assert_eq!(row.revenue, Some(20.0));
    assert_eq!(row.spend, None);

    assert!(sdk.business_daily().get(1, d(2024, 1, 22)).unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

#[test]
fn cached_result_matches_uncached() {
    let (sdk, _tmp) = common::setup_sdk();
    let cached = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();
    let uncached = shop_metrics::queries::BusinessDailyQuery::new(sdk.connection())
        .per_period_metrics(&monthly_spend())
        .unwrap();
    assert_eq!(cached, uncached);
}

#[test]
fn repeated_request_is_served_from_cache() {
    let (sdk, _tmp) = common::setup_sdk();
    let first = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();

    // New data is invisible until the entry expires or the cache is cleared.
    sdk.connection()
        .execute_batch("DELETE FROM business_daily WHERE shop_id = 1")
        .unwrap();
    let second = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();
    assert_eq!(first, second);

    sdk.clear_cache();
    let third = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();
    assert!(third.is_empty());
}

#[test]
fn cache_entries_expire() {
    let (sdk, _tmp) = common::setup_sdk_with_ttl(Duration::from_millis(50));
    let first = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();
    assert_eq!(first.len(), 2);

    sdk.connection()
        .execute_batch("DELETE FROM business_daily WHERE shop_id = 1")
        .unwrap();
    std::thread::sleep(Duration::from_millis(120));

    let second = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();
    assert!(second.is_empty());
}

#[test]
fn zero_ttl_disables_cache() {
    let (sdk, _tmp) = common::setup_sdk_with_ttl(Duration::ZERO);
    assert!(!sdk.cache().is_enabled());

    sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();
    sdk.connection()
        .execute_batch("DELETE FROM business_daily WHERE shop_id = 1")
        .unwrap();
    let rows = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn different_arguments_are_cached_separately() {
    let (sdk, _tmp) = common::setup_sdk();
    let monthly = sdk.business_daily().per_period_metrics(&monthly_spend()).unwrap();

    let mut all = monthly_spend();
    all.period = PeriodType::All;
    let all = sdk.business_daily().per_period_metrics(&all).unwrap();

    assert_eq!(monthly.len(), 2);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].metric("spend"), Some(22.0));
}

// ---------------------------------------------------------------------------
// sql
// ---------------------------------------------------------------------------

#[test]
fn sql_binds_parameters() {
    let (sdk, _tmp) = common::setup_sdk();
    let rows = sdk
        .sql(
            "SELECT COUNT(*) AS n FROM business_daily WHERE shop_id = ? AND channel = ?",
            &[SqlParam::from(1_i64), SqlParam::from("meta")],
        )
        .unwrap();
    assert_eq!(rows[0]["n"], 2);
}

#[test]
fn sql_surfaces_source_errors() {
    let (sdk, _tmp) = common::setup_sdk();
    let err = sdk.sql("SELECT * FROM no_such_table", &[]).unwrap_err();
    assert!(matches!(err, shop_metrics::ShopMetricsError::SourceUnavailable(_)));
}
