//! Daily business metric queries against the `business_daily` table.

use chrono::NaiveDate;

use crate::aggregate::{AggregationCache, AggregationRequest, PeriodAggregator, PeriodRow};
use crate::connection::Connection;
use crate::error::Result;
use crate::models::BusinessDaily;
use crate::schema::BUSINESS_DAILY;
use crate::sql_builder::{quote_ident, SqlBuilder};

// ---------------------------------------------------------------------------
// BusinessDailyQuery
// ---------------------------------------------------------------------------

/// Query interface for per-shop daily business metrics.
pub struct BusinessDailyQuery<'a> {
    conn: &'a Connection,
    cache: Option<&'a AggregationCache>,
}

impl<'a> BusinessDailyQuery<'a> {
    /// Create a new `BusinessDailyQuery` bound to the given connection, without caching.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn, cache: None }
    }

    /// Create a query whose per-period aggregations go through `cache`.
    pub fn with_cache(conn: &'a Connection, cache: &'a AggregationCache) -> Self {
        Self {
            conn,
            cache: Some(cache),
        }
    }

    /// Get the row for one shop and day.
    pub fn get(&self, shop_id: i64, date: NaiveDate) -> Result<Option<BusinessDaily>> {
        let (sql, params) = SqlBuilder::new(&quote_ident(BUSINESS_DAILY.name))
            .where_eq(&quote_ident(BUSINESS_DAILY.entity_column), shop_id)
            .where_date_between(&quote_ident(BUSINESS_DAILY.date_column), date, date)
            .limit(1)
            .build();

        let rows: Vec<BusinessDaily> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().next())
    }

    /// Sum metrics per period (and per secondary group) for one shop.
    ///
    /// Returned rows carry `period`, the period's first `date` (none for
    /// [`PeriodType::All`](crate::PeriodType::All)), group-by values and one
    /// sum per metric. An empty metric list sums the default business metrics.
    pub fn per_period_metrics(&self, request: &AggregationRequest) -> Result<Vec<PeriodRow>> {
        let resolved = request.resolve(&BUSINESS_DAILY)?;
        let aggregator = PeriodAggregator::new(self.conn);
        match self.cache {
            Some(cache) => {
                cache.get_or_try_insert_with(resolved.clone(), || aggregator.aggregate(&resolved))
            }
            None => aggregator.aggregate(&resolved),
        }
    }
}
