//! DuckDB connection wrapper with table registration and query execution.
//!
//! The warehouse tables are expected to exist already when a database file is
//! opened. Extract files (CSV) and fixtures (NDJSON) can be loaded into
//! additional tables on demand.

use crate::error::{Result, ShopMetricsError};
use crate::sql_builder::SqlParam;
use chrono::{DateTime, Duration, NaiveDate};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection as DuckDbConnection;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Wraps a DuckDB connection and tracks tables loaded from files.
pub struct Connection {
    conn: DuckDbConnection,
    registered_tables: RefCell<HashSet<String>>,
}

impl Connection {
    /// Open an in-memory DuckDB database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self::from_raw(conn))
    }

    /// Open (or create) a DuckDB database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = DuckDbConnection::open(path.as_ref())?;
        info!("Opened database {}", path.as_ref().display());
        Ok(Self::from_raw(conn))
    }

    fn from_raw(conn: DuckDbConnection) -> Self {
        Self {
            conn,
            registered_tables: RefCell::new(HashSet::new()),
        }
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    /// Dates and timestamps come back as ISO strings.
    pub fn execute(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        debug!("Executing query: {} with {} params", sql, params.len());
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has run.
        let executed = rows_result.as_ref().ok_or_else(|| {
            ShopMetricsError::InvalidArgument("statement produced no result set".to_string())
        })?;
        let column_names: Vec<String> = executed
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let column_count = executed.column_count();

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::with_capacity(column_count);
            for (i, col_name) in column_names.iter().enumerate().take(column_count) {
                let value = convert_value_ref(row.get_ref(i)?);
                map.insert(col_name.clone(), value);
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(
                row.into_iter().collect::<serde_json::Map<String, serde_json::Value>>(),
            );
            let item: T = serde_json::from_value(value)?;
            results.push(item);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<serde_json::Value>> {
        debug!("Executing scalar query: {}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            let value = convert_value_ref(row.get_ref(0)?);
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Run one or more statements without parameters (DDL, bulk inserts).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Create a DuckDB table from a newline-delimited JSON file.
    pub fn register_table_from_ndjson(&self, table_name: &str, ndjson_path: &str) -> Result<()> {
        let path_fwd = ndjson_path.replace('\\', "/");
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; \
             CREATE TABLE {} AS SELECT * FROM read_json_auto('{}', format='newline_delimited')",
            table_name,
            table_name,
            escape_literal(&path_fwd)
        ))?;
        self.registered_tables
            .borrow_mut()
            .insert(table_name.to_string());
        info!("Registered table {} from {}", table_name, path_fwd);
        Ok(())
    }

    /// Create a DuckDB table from one or more CSV files.
    ///
    /// Files are concatenated in the order given; columns are matched by
    /// header name, so extracts with differing column sets still load.
    pub fn register_table_from_csv(&self, table_name: &str, csv_paths: &[PathBuf]) -> Result<()> {
        if csv_paths.is_empty() {
            return Err(ShopMetricsError::InvalidArgument(format!(
                "No CSV files given for table {}",
                table_name
            )));
        }
        let files: Vec<String> = csv_paths
            .iter()
            .map(|p| format!("'{}'", escape_literal(&p.to_string_lossy().replace('\\', "/"))))
            .collect();
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; \
             CREATE TABLE {} AS SELECT * FROM read_csv_auto([{}], header=true, union_by_name=true)",
            table_name,
            table_name,
            files.join(", ")
        ))?;
        self.registered_tables
            .borrow_mut()
            .insert(table_name.to_string());
        info!("Registered table {} from {} CSV file(s)", table_name, csv_paths.len());
        Ok(())
    }

    /// Check whether a table or view exists in the database.
    pub fn has_table(&self, name: &str) -> Result<bool> {
        let count = self.execute_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            &[SqlParam::from(name)],
        )?;
        Ok(count.and_then(|v| v.as_i64()).unwrap_or(0) > 0)
    }

    /// Return the names of tables loaded through this connection.
    pub fn registered_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registered_tables.borrow().iter().cloned().collect();
        names.sort();
        names
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UTinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::USmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // SUM over BIGINT widens to HUGEINT; keep it numeric when it fits.
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        ValueRef::Date32(days) => date_from_epoch_days(days)
            .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Timestamp(unit, value) => {
            let micros = match unit {
                TimeUnit::Second => value.saturating_mul(1_000_000),
                TimeUnit::Millisecond => value.saturating_mul(1_000),
                TimeUnit::Microsecond => value,
                TimeUnit::Nanosecond => value / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|ts| {
                    serde_json::Value::String(ts.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string())
                })
                .unwrap_or(serde_json::Value::Null)
        }
        _ => serde_json::Value::Null,
    }
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(Duration::days(i64::from(days)))
}
