//! SQL builder with parameterized query construction.
//!
//! All user-supplied values go through DuckDB's parameter binding (`?` placeholders),
//! never through string interpolation. Column names and expressions passed to the
//! builder are expected to come from the [`schema`](crate::schema) registry.
//! Builder methods return `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use shop_metrics::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("business_daily")
//!     .select_as("COALESCE(SUM(spend), 0)", "spend")
//!     .where_eq("shop_id", 1_i64)
//!     .group_by(&["channel"])
//!     .build();
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::types::{ToSql, ToSqlOutput, Value};

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl From<&String> for SqlParam {
    fn from(s: &String) -> Self {
        SqlParam::Text(s.clone())
    }
}

impl From<i64> for SqlParam {
    fn from(n: i64) -> Self {
        SqlParam::Int(n)
    }
}

impl From<f64> for SqlParam {
    fn from(f: f64) -> Self {
        SqlParam::Float(f)
    }
}

/// Dates bind as ISO text; queries cast them with `CAST(? AS DATE)`.
impl From<NaiveDate> for SqlParam {
    fn from(d: NaiveDate) -> Self {
        SqlParam::Text(d.format("%Y-%m-%d").to_string())
    }
}

/// Timestamps bind as `YYYY-MM-DD HH:MM:SS` text, cast with `CAST(? AS TIMESTAMP)`.
impl From<NaiveDateTime> for SqlParam {
    fn from(ts: NaiveDateTime) -> Self {
        SqlParam::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            SqlParam::Int(n) => ToSqlOutput::Owned(Value::BigInt(*n)),
            SqlParam::Float(f) => ToSqlOutput::Owned(Value::Double(*f)),
        })
    }
}

/// Quote an identifier: `spend` -> `"spend"`.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builds parameterized SQL queries safely.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    select_cols: Vec<String>,
    is_distinct: bool,
    from_table: String,
    joins: Vec<String>,
    where_clauses: Vec<String>,
    params: Vec<SqlParam>,
    group_by_cols: Vec<String>,
    having_clauses: Vec<String>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
    offset_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table or view.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: Vec::new(),
            is_distinct: false,
            from_table: table.to_string(),
            joins: Vec::new(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            group_by_cols: Vec::new(),
            having_clauses: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
            offset_val: None,
        }
    }

    /// Set the columns to select (replaces anything selected so far).
    ///
    /// With nothing selected the query selects `*`.
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append a selected expression with an alias: `{expr} AS "{alias}"`.
    pub fn select_as(&mut self, expr: &str, alias: &str) -> &mut Self {
        self.select_cols.push(format!("{} AS \"{}\"", expr, alias));
        self
    }

    /// Add DISTINCT to the SELECT clause.
    pub fn distinct(&mut self) -> &mut Self {
        self.is_distinct = true;
        self
    }

    /// Add a JOIN clause.
    ///
    /// The clause should be a full JOIN expression, e.g.
    /// `"JOIN google_ad_account a ON p.account_id = a.google_id"`.
    pub fn join(&mut self, clause: &str) -> &mut Self {
        self.joins.push(clause.to_string());
        self
    }

    /// Add a WHERE condition with `?` placeholders for each param.
    pub fn where_clause(&mut self, condition: &str, params: &[SqlParam]) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.params.extend(params.iter().cloned());
        self
    }

    /// Add an equality condition: `{column} = ?`.
    pub fn where_eq(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        self.where_clauses.push(format!("{} = ?", column));
        self.params.push(value.into());
        self
    }

    /// Add an IN condition with parameterized values.
    ///
    /// Empty values list produces `FALSE`.
    pub fn where_in<T>(&mut self, column: &str, values: &[T]) -> &mut Self
    where
        T: Into<SqlParam> + Clone,
    {
        if values.is_empty() {
            self.where_clauses.push("FALSE".to_string());
            return self;
        }
        let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
        self.where_clauses
            .push(format!("{} IN ({})", column, placeholders.join(", ")));
        self.params.extend(values.iter().cloned().map(Into::into));
        self
    }

    /// Add a greater-than-or-equal condition: `{column} >= ?`.
    pub fn where_gte(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        self.where_clauses.push(format!("{} >= ?", column));
        self.params.push(value.into());
        self
    }

    /// Add a less-than-or-equal condition: `{column} <= ?`.
    pub fn where_lte(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        self.where_clauses.push(format!("{} <= ?", column));
        self.params.push(value.into());
        self
    }

    /// Add an inclusive date range on a date column.
    ///
    /// Generates: `CAST({column} AS DATE) BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)`
    pub fn where_date_between(
        &mut self,
        column: &str,
        first: NaiveDate,
        last: NaiveDate,
    ) -> &mut Self {
        self.where_clauses.push(format!(
            "CAST({} AS DATE) BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)",
            column
        ));
        self.params.push(first.into());
        self.params.push(last.into());
        self
    }

    /// Add an `IS NOT NULL` condition.
    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        self.where_clauses.push(format!("{} IS NOT NULL", column));
        self
    }

    /// Add GROUP BY columns or expressions.
    pub fn group_by(&mut self, cols: &[&str]) -> &mut Self {
        self.group_by_cols
            .extend(cols.iter().map(|c| c.to_string()));
        self
    }

    /// Add a HAVING condition with `?` placeholders.
    pub fn having(&mut self, condition: &str, params: &[SqlParam]) -> &mut Self {
        self.having_clauses.push(condition.to_string());
        self.params.extend(params.iter().cloned());
        self
    }

    /// Add ORDER BY clauses (e.g. `"period ASC"`, `"spend DESC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    /// Set the maximum number of rows to return.
    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    /// Set the number of rows to skip before returning results.
    pub fn offset(&mut self, n: usize) -> &mut Self {
        self.offset_val = Some(n);
        self
    }

    /// Build the final SQL string and parameter list.
    ///
    /// Returns a tuple of `(sql_string, params_list)` ready for execution.
    pub fn build(&self) -> (String, Vec<SqlParam>) {
        let distinct = if self.is_distinct { "DISTINCT " } else { "" };
        let cols = if self.select_cols.is_empty() {
            "*".to_string()
        } else {
            self.select_cols.join(", ")
        };
        let mut parts = vec![
            format!("SELECT {}{}", distinct, cols),
            format!("FROM {}", self.from_table),
        ];

        for j in &self.joins {
            parts.push(j.clone());
        }

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.group_by_cols.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by_cols.join(", ")));
        }

        if !self.having_clauses.is_empty() {
            parts.push(format!("HAVING {}", self.having_clauses.join(" AND ")));
        }

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        if let Some(n) = self.limit_val {
            parts.push(format!("LIMIT {}", n));
        }

        if let Some(n) = self.offset_val {
            parts.push(format!("OFFSET {}", n));
        }

        (parts.join("\n"), self.params.clone())
    }
}
