//! Shop metrics data-access layer.
//!
//! Query helpers over a marketing-analytics warehouse held in DuckDB: daily
//! business metrics bucketed per period, Shopify orders, Google and Facebook
//! ad performance, and creative feature extracts joined with performance.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use shop_metrics::{AggregationRequest, PeriodType, ShopMetrics};
//!
//! let sdk = ShopMetrics::builder().database("warehouse.duckdb").build().unwrap();
//!
//! let request = AggregationRequest::new(
//!     42,
//!     PeriodType::Monthly,
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
//! )
//! .metrics(["spend", "revenue"]);
//!
//! let rows = sdk.business_daily().per_period_metrics(&request).unwrap();
//! ```

pub mod aggregate;
#[cfg(feature = "async")]
pub mod async_client;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod period;
pub mod queries;
pub mod schema;
pub mod sql_builder;

pub use aggregate::{AggregationCache, AggregationRequest, PeriodAggregator, PeriodRow};
#[cfg(feature = "async")]
pub use async_client::AsyncShopMetrics;
pub use cache::ResultCache;
pub use connection::Connection;
pub use error::{Result, ShopMetricsError};
pub use period::PeriodType;
pub use sql_builder::{SqlBuilder, SqlParam};

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

// ---------------------------------------------------------------------------
// ShopMetricsBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`ShopMetrics`] instance.
///
/// Use [`ShopMetrics::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](ShopMetricsBuilder::build).
#[derive(Debug, Clone)]
pub struct ShopMetricsBuilder {
    database: Option<PathBuf>,
    extracts_dir: Option<PathBuf>,
    cache_ttl: Duration,
    cache_capacity: u64,
}

impl Default for ShopMetricsBuilder {
    fn default() -> Self {
        Self {
            database: None,
            extracts_dir: None,
            cache_ttl: cache::DEFAULT_TTL,
            cache_capacity: cache::DEFAULT_CAPACITY,
        }
    }
}

impl ShopMetricsBuilder {
    /// Start from the environment (after loading a `.env` file if present).
    ///
    /// Reads `SHOP_METRICS_DATABASE`, `SHOP_METRICS_EXTRACTS_DIR`,
    /// `SHOP_METRICS_CACHE_TTL_SECS` and `SHOP_METRICS_CACHE_CAPACITY`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Self::default();
        if let Some(path) = config::env_path(config::ENV_DATABASE) {
            builder = builder.database(path);
        }
        if let Some(path) = config::env_path(config::ENV_EXTRACTS_DIR) {
            builder = builder.extracts_dir(path);
        }
        if let Some(ttl) = config::env_secs(config::ENV_CACHE_TTL_SECS)? {
            builder = builder.cache_ttl(ttl);
        }
        if let Some(capacity) = config::env_u64(config::ENV_CACHE_CAPACITY)? {
            builder = builder.cache_capacity(capacity);
        }
        Ok(builder)
    }

    /// Open this DuckDB database file instead of an in-memory database.
    pub fn database<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the directory holding creative extracts.
    ///
    /// If not set, the platform data directory is used (e.g.
    /// `~/.local/share/shop-metrics/extracts` on Linux).
    pub fn extracts_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.extracts_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Time-to-live of cached per-period aggregations. Zero disables caching.
    ///
    /// Defaults to five minutes.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Maximum number of cached aggregations. Defaults to 1024.
    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Open the database and set up the result cache.
    pub fn build(self) -> Result<ShopMetrics> {
        let conn = match &self.database {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        Ok(self.build_with_connection(conn))
    }

    /// Use an already opened connection.
    pub fn build_with_connection(self, conn: Connection) -> ShopMetrics {
        let extracts_dir = self
            .extracts_dir
            .unwrap_or_else(config::default_extracts_dir);
        info!(
            "Shop metrics ready (extracts: {}, cache ttl: {:?})",
            extracts_dir.display(),
            self.cache_ttl
        );
        ShopMetrics {
            conn,
            cache: ResultCache::new(self.cache_ttl, self.cache_capacity),
            extracts_dir,
        }
    }
}

// ---------------------------------------------------------------------------
// ShopMetrics
// ---------------------------------------------------------------------------

/// The main entry point.
///
/// Owns the [`Connection`] and the aggregation cache, and exposes
/// domain-specific query interfaces as lightweight borrowing wrappers.
pub struct ShopMetrics {
    conn: Connection,
    cache: AggregationCache,
    extracts_dir: PathBuf,
}

impl ShopMetrics {
    /// Create a new builder.
    pub fn builder() -> ShopMetricsBuilder {
        ShopMetricsBuilder::default()
    }

    // -- Query accessors ---------------------------------------------------

    /// Access daily business metrics, with per-period aggregations cached.
    pub fn business_daily(&self) -> queries::BusinessDailyQuery<'_> {
        queries::BusinessDailyQuery::with_cache(&self.conn, &self.cache)
    }

    /// Access Shopify order queries.
    pub fn orders(&self) -> queries::ShopifyOrderQuery<'_> {
        queries::ShopifyOrderQuery::new(&self.conn)
    }

    /// Access Google / Facebook ad performance queries.
    pub fn ad_performance(&self) -> queries::AdPerformanceQuery<'_> {
        queries::AdPerformanceQuery::new(&self.conn)
    }

    /// Access creative extracts below the configured extracts directory.
    pub fn creatives(&self) -> queries::CreativeQuery<'_> {
        queries::CreativeQuery::new(&self.conn, &self.extracts_dir)
    }

    /// Aggregator over any registered table, bypassing the cache.
    pub fn aggregator(&self) -> PeriodAggregator<'_> {
        PeriodAggregator::new(&self.conn)
    }

    /// Cached per-period aggregation over any registered table.
    ///
    /// Fails with `NotFound` for a table missing from the
    /// [`schema`](crate::schema) registry.
    pub fn per_period_metrics(
        &self,
        table: &str,
        request: &AggregationRequest,
    ) -> Result<Vec<PeriodRow>> {
        let resolved = request.resolve(schema::table(table)?)?;
        let aggregator = self.aggregator();
        self.cache
            .get_or_try_insert_with(resolved.clone(), || aggregator.aggregate(&resolved))
    }

    // -- Utility methods ---------------------------------------------------

    /// Execute a raw SQL query.
    ///
    /// # Arguments
    ///
    /// * `query` - SQL string with `?` positional placeholders.
    /// * `params` - Parameter values corresponding to the placeholders.
    pub fn sql(&self, query: &str, params: &[SqlParam]) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    /// Drop all cached aggregations, e.g. after new data was loaded.
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    /// The aggregation cache.
    pub fn cache(&self) -> &AggregationCache {
        &self.cache
    }

    pub fn extracts_dir(&self) -> &Path {
        &self.extracts_dir
    }

    /// Return a reference to the underlying [`Connection`].
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for ShopMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShopMetrics(extracts_dir={}, tables=[{}], cache_ttl={:?})",
            self.extracts_dir.display(),
            self.conn.registered_tables().join(", "),
            self.cache.ttl()
        )
    }
}
