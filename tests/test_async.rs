//! Async wrapper tests (requires the `async` feature).

#![cfg(feature = "async")]

mod common;

use common::d;
use shop_metrics::{AggregationRequest, AsyncShopMetrics, PeriodType, ShopMetrics, SqlParam};

#[tokio::test]
async fn runs_queries_on_blocking_pool() {
    let sdk = AsyncShopMetrics::new(ShopMetrics::builder()).await.unwrap();

    sdk.run(|s| {
        s.connection().execute_batch(
            "CREATE TABLE business_daily (shop_id BIGINT, date DATE, channel VARCHAR, spend DOUBLE);
             INSERT INTO business_daily VALUES
                (1, '2024-01-05', 'google', 10), (1, '2024-01-20', 'meta', 5), (1, '2024-02-02', 'google', 7);",
        )
    })
    .await
    .unwrap();

    let request = AggregationRequest::new(1, PeriodType::Monthly, d(2024, 1, 1), d(2024, 2, 29))
        .metrics(["spend"]);
    let rows = sdk.per_period_metrics(request).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].metric("spend"), Some(15.0));
    assert_eq!(rows[1].metric("spend"), Some(7.0));

    let count = sdk
        .sql("SELECT COUNT(*) AS n FROM business_daily WHERE shop_id = ?", &[SqlParam::from(1_i64)])
        .await
        .unwrap();
    assert_eq!(count[0]["n"], 3);
}
