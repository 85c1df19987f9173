//! Registry of the warehouse tables this crate knows how to query.
//!
//! Metric and group-by names arrive as strings from callers (dashboards pass
//! them straight through), so every name is checked here before it reaches a
//! SQL string. Only identifiers stored in this registry are ever interpolated.

use crate::error::{Result, ShopMetricsError};

/// Role of a column in aggregation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Summable measure.
    Numeric,
    /// Dimension usable as a group-by column.
    Categorical,
}

/// Static description of a table.
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    /// Column holding the shop id used as the entity filter.
    pub entity_column: &'static str,
    /// Date column used for range filters and period bucketing.
    pub date_column: &'static str,
    pub columns: &'static [(&'static str, ColumnKind)],
    /// Metrics summed when a request names none.
    pub default_metrics: &'static [&'static str],
}

use ColumnKind::{Categorical, Numeric};

pub const BUSINESS_DAILY: TableSchema = TableSchema {
    name: "business_daily",
    entity_column: "shop_id",
    date_column: "date",
    columns: &[
        ("shop_id", Categorical),
        ("date", Categorical),
        ("channel", Categorical),
        ("revenue", Numeric),
        ("orders", Numeric),
        ("spend", Numeric),
        ("impressions", Numeric),
        ("clicks", Numeric),
        ("conversions", Numeric),
    ],
    default_metrics: &[
        "revenue",
        "orders",
        "spend",
        "impressions",
        "clicks",
        "conversions",
    ],
};

const AD_PERFORMANCE_COLUMNS: &[(&str, ColumnKind)] = &[
    ("ad_id", Categorical),
    ("shop_id", Categorical),
    ("account_id", Categorical),
    ("date_start", Categorical),
    ("impressions", Numeric),
    ("clicks", Numeric),
    ("conversions_purchase", Numeric),
    ("spend", Numeric),
    ("conversions_value_purchase", Numeric),
];

const AD_PERFORMANCE_METRICS: &[&str] = &[
    "impressions",
    "clicks",
    "conversions_purchase",
    "spend",
    "conversions_value_purchase",
];

pub const GOOGLE_DAILY_PERFORMANCE: TableSchema = TableSchema {
    name: "google_daily_performance",
    entity_column: "shop_id",
    date_column: "date_start",
    columns: AD_PERFORMANCE_COLUMNS,
    default_metrics: AD_PERFORMANCE_METRICS,
};

pub const FACEBOOK_DAILY_PERFORMANCE: TableSchema = TableSchema {
    name: "facebook_daily_performance",
    entity_column: "shop_id",
    date_column: "date_start",
    columns: AD_PERFORMANCE_COLUMNS,
    default_metrics: AD_PERFORMANCE_METRICS,
};

pub const SHOPIFY_ORDER: TableSchema = TableSchema {
    name: "shopify_order",
    entity_column: "shop_id",
    date_column: "processed_at",
    columns: &[
        ("id", Categorical),
        ("shop_id", Categorical),
        ("customer_id", Categorical),
        ("processed_at", Categorical),
        ("created_at", Categorical),
        ("total_price_usd", Numeric),
    ],
    default_metrics: &["total_price_usd"],
};

const TABLES: &[&TableSchema] = &[
    &BUSINESS_DAILY,
    &GOOGLE_DAILY_PERFORMANCE,
    &FACEBOOK_DAILY_PERFORMANCE,
    &SHOPIFY_ORDER,
];

/// Look up a registered table by name.
pub fn table(name: &str) -> Result<&'static TableSchema> {
    TABLES
        .iter()
        .copied()
        .find(|t| t.name == name)
        .ok_or_else(|| ShopMetricsError::NotFound(format!("Unknown table: {}", name)))
}

impl TableSchema {
    pub fn column_kind(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, kind)| *kind)
    }

    /// Resolve a metric name to a numeric column of this table.
    pub fn resolve_metric(&self, column: &str) -> Result<&'static str> {
        self.columns
            .iter()
            .find(|(name, kind)| *name == column && *kind == Numeric)
            .map(|(name, _)| *name)
            .ok_or_else(|| ShopMetricsError::unknown_column(self.name, column))
    }

    /// Resolve a group-by name to any known column of this table.
    pub fn resolve_group_by(&self, column: &str) -> Result<&'static str> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(name, _)| *name)
            .ok_or_else(|| ShopMetricsError::unknown_column(self.name, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_metric() {
        assert_eq!(BUSINESS_DAILY.resolve_metric("spend").unwrap(), "spend");
    }

    #[test]
    fn categorical_column_is_not_a_metric() {
        let err = BUSINESS_DAILY.resolve_metric("channel").unwrap_err();
        assert!(matches!(err, ShopMetricsError::UnknownColumn { .. }));
        assert_eq!(BUSINESS_DAILY.resolve_group_by("channel").unwrap(), "channel");
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = BUSINESS_DAILY.resolve_group_by("spend; DROP TABLE x").unwrap_err();
        match err {
            ShopMetricsError::UnknownColumn { table, column } => {
                assert_eq!(table, "business_daily");
                assert_eq!(column, "spend; DROP TABLE x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn table_lookup() {
        assert_eq!(table("shopify_order").unwrap().date_column, "processed_at");
        assert!(table("nope").is_err());
    }

    #[test]
    fn default_metrics_are_numeric() {
        for t in TABLES {
            for m in t.default_metrics {
                assert_eq!(t.column_kind(m), Some(ColumnKind::Numeric), "{}.{}", t.name, m);
            }
        }
    }
}
