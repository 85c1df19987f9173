//! Creative feature extracts joined with ad performance.
//!
//! Extracts are CSV files laid out as `<extracts_dir>/creative_by_shop_id/<shop_id>.csv`,
//! mirroring the object-storage bucket they are synced from.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde_json::Value;
use tracing::debug;

use crate::config::{default_creative_start, CREATIVE_EXTRACT_PREFIX};
use crate::connection::Connection;
use crate::error::{Result, ShopMetricsError};
use crate::queries::ad_performance::{performance_sql, AdPlatform, PerformanceParams};
use crate::queries::rows_to_values;

/// Table the requested extracts are loaded into.
const EXTRACT_TABLE: &str = "creative_extract";

// ---------------------------------------------------------------------------
// CreativeQuery
// ---------------------------------------------------------------------------

/// Query interface for per-shop creative feature extracts.
pub struct CreativeQuery<'a> {
    conn: &'a Connection,
    extracts_dir: &'a Path,
}

impl<'a> CreativeQuery<'a> {
    /// Create a new `CreativeQuery` reading extracts below `extracts_dir`.
    pub fn new(conn: &'a Connection, extracts_dir: &'a Path) -> Self {
        Self { conn, extracts_dir }
    }

    fn prefix_dir(&self) -> PathBuf {
        self.extracts_dir.join(CREATIVE_EXTRACT_PREFIX)
    }

    /// Path of the extract for one shop. The id must be all digits.
    pub fn extract_path(&self, shop_id: &str) -> Result<PathBuf> {
        if !is_shop_id(shop_id) {
            return Err(ShopMetricsError::InvalidArgument(format!(
                "Invalid shop id: {:?}",
                shop_id
            )));
        }
        Ok(self.prefix_dir().join(format!("{}.csv", shop_id)))
    }

    /// Shop ids that have an extract, in ascending numeric order.
    ///
    /// A missing extract directory yields an empty list.
    pub fn shop_ids(&self) -> Result<Vec<String>> {
        let dir = self.prefix_dir();
        if !dir.is_dir() {
            debug!("No creative extract directory at {}", dir.display());
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_shop_id(stem) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Ok(ids)
    }

    /// Creative rows for the given shops, concatenated in the given order.
    ///
    /// Fails with `NotFound` if any shop has no extract.
    pub fn by_shop(&self, shop_ids: &[&str]) -> Result<Vec<Value>> {
        if !self.load_extracts(shop_ids)? {
            return Ok(Vec::new());
        }
        let rows = self
            .conn
            .execute(&format!("SELECT * FROM {}", EXTRACT_TABLE), &[])?;
        Ok(rows_to_values(rows))
    }

    /// Creative rows joined with their Facebook ad performance.
    ///
    /// Performance is summed per ad over `[start, end]` (defaults: 2015-01-01
    /// through today) and joined on `ad_id` and `shop_id`. Adds `ctr`, `cpc`
    /// and `roas`; a zero denominator yields null.
    pub fn with_performance(
        &self,
        shop_ids: &[&str],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Value>> {
        if !self.load_extracts(shop_ids)? {
            return Ok(Vec::new());
        }

        let numeric_ids = shop_ids
            .iter()
            .map(|id| {
                id.parse::<i64>().map_err(|_| {
                    ShopMetricsError::InvalidArgument(format!("Invalid shop id: {:?}", id))
                })
            })
            .collect::<Result<Vec<i64>>>()?;

        let params = PerformanceParams {
            shop_ids: Some(numeric_ids),
            ad_ids: None,
            start_date: Some(start.unwrap_or_else(default_creative_start)),
            end_date: Some(end.unwrap_or_else(|| Local::now().date_naive())),
            add_currency: false,
            monthly: false,
        };
        let (perf_sql, sql_params) = performance_sql(AdPlatform::Facebook, &params);

        let sql = format!(
            r#"
            WITH perf AS ({perf})
            SELECT c.*,
                   perf.account_id,
                   perf.impr,
                   perf.link_clicks,
                   perf.purch,
                   perf.spend,
                   perf.purch_value,
                   CASE WHEN perf.impr = 0 THEN NULL ELSE perf.link_clicks / perf.impr END AS ctr,
                   CASE WHEN perf.link_clicks = 0 THEN NULL ELSE perf.spend / perf.link_clicks END AS cpc,
                   CASE WHEN perf.spend = 0 THEN NULL ELSE perf.purch_value / perf.spend END AS roas
            FROM {table} c
            JOIN perf
              ON CAST(c.ad_id AS VARCHAR) = CAST(perf.ad_id AS VARCHAR)
             AND CAST(c.shop_id AS VARCHAR) = CAST(perf.shop_id AS VARCHAR)
            ORDER BY c.shop_id, c.ad_id
            "#,
            perf = perf_sql,
            table = EXTRACT_TABLE
        );

        let rows = self.conn.execute(&sql, &sql_params)?;
        Ok(rows_to_values(rows))
    }

    /// Load the extracts into the extract table. Returns `false` when no
    /// shops were requested.
    fn load_extracts(&self, shop_ids: &[&str]) -> Result<bool> {
        if shop_ids.is_empty() {
            return Ok(false);
        }
        let mut paths = Vec::with_capacity(shop_ids.len());
        for id in shop_ids {
            let path = self.extract_path(id)?;
            if !path.is_file() {
                return Err(ShopMetricsError::NotFound(format!(
                    "No creative extract for shop {}",
                    id
                )));
            }
            paths.push(path);
        }
        self.conn.register_table_from_csv(EXTRACT_TABLE, &paths)?;
        Ok(true)
    }
}

fn is_shop_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
