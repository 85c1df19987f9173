//! Ad platform performance queries (Google Ads and Facebook Ads daily tables).

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::error::Result;
use crate::models::{AdAccount, AdPerformanceRow};
use crate::period::PeriodType;
use crate::schema::{TableSchema, FACEBOOK_DAILY_PERFORMANCE, GOOGLE_DAILY_PERFORMANCE};
use crate::sql_builder::{SqlBuilder, SqlParam};

// ---------------------------------------------------------------------------
// AdPlatform
// ---------------------------------------------------------------------------

/// Ad platform whose performance tables are queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdPlatform {
    Google,
    Facebook,
}

impl AdPlatform {
    pub fn performance_table(&self) -> &'static TableSchema {
        match self {
            AdPlatform::Google => &GOOGLE_DAILY_PERFORMANCE,
            AdPlatform::Facebook => &FACEBOOK_DAILY_PERFORMANCE,
        }
    }

    pub fn account_table(&self) -> &'static str {
        match self {
            AdPlatform::Google => "google_ad_account",
            AdPlatform::Facebook => "facebook_ad_account",
        }
    }

    /// Column of the account table holding the platform account id.
    pub fn account_id_column(&self) -> &'static str {
        match self {
            AdPlatform::Google => "google_id",
            AdPlatform::Facebook => "facebook_id",
        }
    }
}

// ---------------------------------------------------------------------------
// PerformanceParams
// ---------------------------------------------------------------------------

/// Filters and shape options for [`AdPerformanceQuery::performance`].
///
/// `None` id filters are skipped; an empty id list matches nothing.
#[derive(Debug, Clone)]
pub struct PerformanceParams {
    pub shop_ids: Option<Vec<i64>>,
    pub ad_ids: Option<Vec<String>>,
    /// The date filter only applies when a start date is given.
    pub start_date: Option<NaiveDate>,
    /// Defaults to today.
    pub end_date: Option<NaiveDate>,
    /// Join the account table and group by its currency.
    pub add_currency: bool,
    /// Split sums by `year_month` (`YYYY-MM`).
    pub monthly: bool,
}

impl Default for PerformanceParams {
    fn default() -> Self {
        Self {
            shop_ids: None,
            ad_ids: None,
            start_date: None,
            end_date: None,
            add_currency: true,
            monthly: true,
        }
    }
}

/// Summed measures and the names they are reported under.
const PERFORMANCE_SUMS: &[(&str, &str)] = &[
    ("impressions", "impr"),
    ("clicks", "link_clicks"),
    ("conversions_purchase", "purch"),
    ("spend", "spend"),
    ("conversions_value_purchase", "purch_value"),
];

/// Build the grouped performance query for `platform`.
pub(crate) fn performance_sql(
    platform: AdPlatform,
    params: &PerformanceParams,
) -> (String, Vec<SqlParam>) {
    let table = platform.performance_table();
    let mut qb = SqlBuilder::new(&format!("{} p", table.name));

    let mut group_cols: Vec<String> = vec![
        "p.ad_id".to_string(),
        "p.shop_id".to_string(),
        "p.account_id".to_string(),
    ];
    qb.select_as("p.ad_id", "ad_id");
    qb.select_as("p.shop_id", "shop_id");
    qb.select_as("p.account_id", "account_id");

    for (column, alias) in PERFORMANCE_SUMS {
        qb.select_as(
            &format!("CAST(COALESCE(SUM(p.{}), 0) AS DOUBLE)", column),
            alias,
        );
    }

    if params.monthly {
        let year_month = PeriodType::Monthly.sql_expr(&format!("p.{}", table.date_column));
        qb.select_as(&year_month, "year_month");
        group_cols.push(year_month);
    }

    if params.add_currency {
        qb.join(&format!(
            "JOIN {} a ON p.account_id = a.{}",
            platform.account_table(),
            platform.account_id_column()
        ));
        qb.select_as("a.currency", "currency");
        group_cols.push("a.currency".to_string());
    }

    if let Some(ref ad_ids) = params.ad_ids {
        qb.where_in("p.ad_id", ad_ids);
    }

    if let Some(ref shop_ids) = params.shop_ids {
        qb.where_in("p.shop_id", shop_ids);
    }

    if let Some(start) = params.start_date {
        let end = params
            .end_date
            .unwrap_or_else(|| Local::now().date_naive());
        qb.where_date_between(&format!("p.{}", table.date_column), start, end);
    }

    let group_refs: Vec<&str> = group_cols.iter().map(String::as_str).collect();
    qb.group_by(&group_refs);

    let mut order = vec!["ad_id", "shop_id", "account_id"];
    if params.monthly {
        order.push("year_month");
    }
    qb.order_by(&order);

    qb.build()
}

// ---------------------------------------------------------------------------
// AdPerformanceQuery
// ---------------------------------------------------------------------------

/// Query interface for ad-level performance across platforms.
pub struct AdPerformanceQuery<'a> {
    conn: &'a Connection,
}

impl<'a> AdPerformanceQuery<'a> {
    /// Create a new `AdPerformanceQuery` bound to the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Summed performance per ad (and per month / currency when requested).
    pub fn performance(
        &self,
        platform: AdPlatform,
        params: &PerformanceParams,
    ) -> Result<Vec<AdPerformanceRow>> {
        let (sql, sql_params) = performance_sql(platform, params);
        self.conn.execute_into(&sql, &sql_params)
    }

    /// Ad accounts connected to a shop, ordered by name.
    pub fn accounts(&self, platform: AdPlatform, shop_id: i64) -> Result<Vec<AdAccount>> {
        let (sql, params) = SqlBuilder::new(platform.account_table())
            .where_eq("shop_id", shop_id)
            .order_by(&["name ASC"])
            .build();
        self.conn.execute_into(&sql, &params)
    }
}
