use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum ShopMetricsError {
    #[error("Invalid date range: {first} is after {last}")]
    InvalidRange { first: NaiveDate, last: NaiveDate },

    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ShopMetricsError {
    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        Self::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopMetricsError>;
