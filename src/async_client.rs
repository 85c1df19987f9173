//! Async wrapper around [`ShopMetrics`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free.
//!
//! # Example
//!
//! ```no_run
//! use shop_metrics::AsyncShopMetrics;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sdk = AsyncShopMetrics::new(shop_metrics::ShopMetrics::builder()).await.unwrap();
//!
//!     let total = sdk.run(|s| {
//!         let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!         let end = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap().and_hms_opt(23, 59, 59).unwrap();
//!         s.orders().sum_total_usd_in_period(42, start, end)
//!     }).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Result, ShopMetricsError};
use crate::sql_builder::SqlParam;
use crate::{AggregationRequest, PeriodRow, ShopMetrics, ShopMetricsBuilder};

/// Async wrapper around [`ShopMetrics`].
///
/// The DuckDB connection is not `Sync`, so the SDK sits behind a [`Mutex`]
/// and calls are serialized.
#[derive(Clone)]
pub struct AsyncShopMetrics {
    inner: Arc<Mutex<ShopMetrics>>,
}

impl AsyncShopMetrics {
    /// Build the SDK on the blocking pool.
    pub async fn new(builder: ShopMetricsBuilder) -> Result<Self> {
        tokio::task::spawn_blocking(move || {
            let sdk = builder.build()?;
            Ok(AsyncShopMetrics {
                inner: Arc::new(Mutex::new(sdk)),
            })
        })
        .await
        .map_err(|e| ShopMetricsError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Run a sync SDK operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ShopMetrics) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = sdk
                .lock()
                .map_err(|_| ShopMetricsError::InvalidArgument("SDK lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| ShopMetricsError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Cached per-period business metrics.
    pub async fn per_period_metrics(&self, request: AggregationRequest) -> Result<Vec<PeriodRow>> {
        self.run(move |s| s.business_daily().per_period_metrics(&request))
            .await
    }

    /// Execute a raw SQL query asynchronously.
    pub async fn sql(
        &self,
        query: &str,
        params: &[SqlParam],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let query = query.to_string();
        let params = params.to_vec();
        self.run(move |s| s.sql(&query, &params)).await
    }
}
