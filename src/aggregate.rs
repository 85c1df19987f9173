//! Per-period metric aggregation.
//!
//! Buckets daily rows of a registered table by [`PeriodType`], optionally
//! splits each bucket by secondary group-by columns, and sums the requested
//! metrics. One parameterized query is issued per call.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use shop_metrics::aggregate::AggregationRequest;
//! use shop_metrics::PeriodType;
//!
//! let request = AggregationRequest::new(
//!     1,
//!     PeriodType::Monthly,
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
//! )
//! .metrics(["spend"])
//! .group_by(["channel"]);
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::connection::Connection;
use crate::error::{Result, ShopMetricsError};
use crate::period::{PeriodType, ALL_PERIOD_KEY};
use crate::schema::TableSchema;
use crate::sql_builder::{quote_ident, SqlBuilder, SqlParam};

/// Expiring cache of aggregation results keyed by resolved request.
pub type AggregationCache = ResultCache<ResolvedRequest, Vec<PeriodRow>>;

/// Output keys that metric and group-by labels may not shadow.
const RESERVED_LABELS: &[&str] = &["period", "date"];

// ---------------------------------------------------------------------------
// AggregationRequest
// ---------------------------------------------------------------------------

/// Caller-facing description of a per-period aggregation.
///
/// Names are resolved against a [`TableSchema`] by [`resolve`](Self::resolve).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    pub shop_id: i64,
    pub period: PeriodType,
    pub date_first: NaiveDate,
    pub date_last: NaiveDate,
    /// Metric labels to sum. Empty means the table's default metrics.
    pub metrics: Vec<String>,
    /// Secondary group-by labels.
    pub group_by: Vec<String>,
    /// Label to column remapping; unmapped labels are used as column names.
    pub column_map: Vec<(String, String)>,
}

impl AggregationRequest {
    pub fn new(shop_id: i64, period: PeriodType, date_first: NaiveDate, date_last: NaiveDate) -> Self {
        Self {
            shop_id,
            period,
            date_first,
            date_last,
            metrics: Vec::new(),
            group_by: Vec::new(),
            column_map: Vec::new(),
        }
    }

    pub fn metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics.extend(metrics.into_iter().map(Into::into));
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Read the metric or group-by `label` from `column`.
    pub fn map_column(mut self, label: impl Into<String>, column: impl Into<String>) -> Self {
        self.column_map.push((label.into(), column.into()));
        self
    }

    /// Validate the request against `table` and resolve every label to a column.
    ///
    /// Fails with `InvalidRange` when the range is reversed and with
    /// `UnknownColumn` when a label does not resolve. Nothing is queried.
    pub fn resolve(&self, table: &'static TableSchema) -> Result<ResolvedRequest> {
        if self.date_first > self.date_last {
            return Err(ShopMetricsError::InvalidRange {
                first: self.date_first,
                last: self.date_last,
            });
        }

        let mapper: HashMap<&str, &str> = self
            .column_map
            .iter()
            .map(|(label, column)| (label.as_str(), column.as_str()))
            .collect();

        let labels: Vec<String> = if self.metrics.is_empty() {
            table.default_metrics.iter().map(|m| m.to_string()).collect()
        } else {
            self.metrics.clone()
        };

        let mut metrics: Vec<(String, &'static str)> = Vec::with_capacity(labels.len());
        for label in labels {
            check_label(&label)?;
            if metrics.iter().any(|(l, _)| *l == label) {
                continue;
            }
            let column = table.resolve_metric(column_for(&mapper, &label))?;
            metrics.push((label, column));
        }

        let mut group_by: Vec<(String, &'static str)> = Vec::with_capacity(self.group_by.len());
        for label in &self.group_by {
            check_label(label)?;
            if group_by.iter().any(|(l, _)| l == label) {
                continue;
            }
            if metrics.iter().any(|(l, _)| l == label) {
                return Err(ShopMetricsError::InvalidArgument(format!(
                    "'{}' is requested both as a metric and as a group-by column",
                    label
                )));
            }
            let column = table.resolve_group_by(column_for(&mapper, label))?;
            group_by.push((label.clone(), column));
        }

        Ok(ResolvedRequest {
            table: table.name,
            entity_column: table.entity_column,
            date_column: table.date_column,
            shop_id: self.shop_id,
            period: self.period,
            date_first: self.date_first,
            date_last: self.date_last,
            metrics,
            group_by,
        })
    }
}

fn column_for<'a>(mapper: &HashMap<&'a str, &'a str>, label: &'a str) -> &'a str {
    mapper.get(label).copied().unwrap_or(label)
}

fn check_label(label: &str) -> Result<()> {
    if RESERVED_LABELS.contains(&label) {
        return Err(ShopMetricsError::InvalidArgument(format!(
            "'{}' is reserved and cannot be used as a metric or group-by label",
            label
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ResolvedRequest
// ---------------------------------------------------------------------------

/// A validated request whose columns all come from the schema registry.
///
/// Also serves as the cache key: two equal resolved requests always produce
/// the same rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedRequest {
    pub table: &'static str,
    pub entity_column: &'static str,
    pub date_column: &'static str,
    pub shop_id: i64,
    pub period: PeriodType,
    pub date_first: NaiveDate,
    pub date_last: NaiveDate,
    /// `(label, column)` pairs in request order.
    pub metrics: Vec<(String, &'static str)>,
    /// `(label, column)` pairs in request order.
    pub group_by: Vec<(String, &'static str)>,
}

impl ResolvedRequest {
    /// Build the aggregate query.
    ///
    /// Selected columns are aliased positionally (`g0`, `m0`, ...) so caller
    /// labels never reach the SQL text.
    pub fn to_sql(&self) -> (String, Vec<SqlParam>) {
        let period_expr = self.period.sql_expr(&quote_ident(self.date_column));

        let group_cols: Vec<String> = self.group_by.iter().map(|(_, c)| quote_ident(c)).collect();

        let mut qb = SqlBuilder::new(&quote_ident(self.table));
        qb.select_as(&period_expr, "period");
        for (i, column) in group_cols.iter().enumerate() {
            qb.select_as(column, &format!("g{}", i));
        }
        for (i, (_, column)) in self.metrics.iter().enumerate() {
            qb.select_as(
                &format!("CAST(COALESCE(SUM({}), 0) AS DOUBLE)", quote_ident(column)),
                &format!("m{}", i),
            );
        }

        qb.where_eq(&quote_ident(self.entity_column), self.shop_id);
        qb.where_date_between(&quote_ident(self.date_column), self.date_first, self.date_last);

        if self.period != PeriodType::All {
            qb.group_by(&[period_expr.as_str()]);
        }
        let group_refs: Vec<&str> = group_cols.iter().map(String::as_str).collect();
        qb.group_by(&group_refs);
        // Without GROUP BY columns the aggregate would still yield one row
        // over an empty window.
        qb.having("COUNT(*) > 0", &[]);

        let mut order: Vec<String> = vec!["\"period\"".to_string()];
        order.extend((0..self.group_by.len()).map(|i| format!("\"g{}\"", i)));
        let order_refs: Vec<&str> = order.iter().map(String::as_str).collect();
        qb.order_by(&order_refs);

        qb.build()
    }
}

// ---------------------------------------------------------------------------
// PeriodRow
// ---------------------------------------------------------------------------

/// One aggregated bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRow {
    /// Period key, or `"all"` for [`PeriodType::All`].
    pub period: String,
    /// First calendar date of the period; `None` only for [`PeriodType::All`].
    pub date: Option<NaiveDate>,
    /// Group-by values by label, in request order.
    pub groups: Vec<(String, Value)>,
    /// Summed metrics by label, in request order.
    pub metrics: Vec<(String, f64)>,
}

impl PeriodRow {
    pub fn metric(&self, label: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    pub fn group(&self, label: &str) -> Option<&Value> {
        self.groups.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }
}

/// Serializes as one flat record: `period`, `date`, group labels, metric labels.
impl Serialize for PeriodRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map =
            serializer.serialize_map(Some(2 + self.groups.len() + self.metrics.len()))?;
        map.serialize_entry("period", &self.period)?;
        map.serialize_entry("date", &self.date)?;
        for (label, value) in &self.groups {
            map.serialize_entry(label, value)?;
        }
        for (label, value) in &self.metrics {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// PeriodAggregator
// ---------------------------------------------------------------------------

/// Runs resolved aggregation requests against a [`Connection`].
pub struct PeriodAggregator<'a> {
    conn: &'a Connection,
}

impl<'a> PeriodAggregator<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Resolve `request` against `table` and aggregate.
    pub fn aggregate_table(
        &self,
        table: &'static TableSchema,
        request: &AggregationRequest,
    ) -> Result<Vec<PeriodRow>> {
        let resolved = request.resolve(table)?;
        self.aggregate(&resolved)
    }

    /// Aggregate a resolved request. Returns an empty vector when no rows
    /// fall inside the window.
    pub fn aggregate(&self, request: &ResolvedRequest) -> Result<Vec<PeriodRow>> {
        let (sql, params) = request.to_sql();
        let rows = self.conn.execute(&sql, &params)?;
        debug!(
            "Aggregated {} {} bucket(s) from {} for shop {}",
            rows.len(),
            request.period,
            request.table,
            request.shop_id
        );

        Ok(rows
            .into_iter()
            .map(|mut row| {
                let period = match row.remove("period") {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => ALL_PERIOD_KEY.to_string(),
                };
                let date = period_first_date(request.period, &period);

                let groups = request
                    .group_by
                    .iter()
                    .enumerate()
                    .map(|(i, (label, _))| {
                        let value = row.remove(&format!("g{}", i)).unwrap_or(Value::Null);
                        (label.clone(), value)
                    })
                    .collect();

                let metrics = request
                    .metrics
                    .iter()
                    .enumerate()
                    .map(|(i, (label, _))| {
                        let value = row
                            .get(&format!("m{}", i))
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0);
                        (label.clone(), value)
                    })
                    .collect();

                PeriodRow {
                    period,
                    date,
                    groups,
                    metrics,
                }
            })
            .collect())
    }
}

fn period_first_date(period: PeriodType, key: &str) -> Option<NaiveDate> {
    if period == PeriodType::All {
        return None;
    }
    let date = period.first_date(key);
    if date.is_none() {
        warn!("Period key '{}' does not parse as a {} period", key, period);
    }
    date
}
