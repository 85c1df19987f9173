//! Shopify order queries against the `shopify_order` table.

use chrono::NaiveDateTime;

use crate::connection::Connection;
use crate::error::Result;
use crate::models::{FirstOrder, ShopifyOrder};
use crate::sql_builder::{SqlBuilder, SqlParam};

// ---------------------------------------------------------------------------
// ShopifyOrderQuery
// ---------------------------------------------------------------------------

/// Query interface for synced Shopify orders.
pub struct ShopifyOrderQuery<'a> {
    conn: &'a Connection,
}

impl<'a> ShopifyOrderQuery<'a> {
    /// Create a new `ShopifyOrderQuery` bound to the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Total USD value of the orders processed in `[start, end]`.
    ///
    /// Returns `0.0` when the shop has no orders in the window.
    pub fn sum_total_usd_in_period(
        &self,
        shop_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<f64> {
        let (sql, params) = SqlBuilder::new("shopify_order")
            .select(&["CAST(COALESCE(SUM(TRY_CAST(total_price_usd AS DOUBLE)), 0) AS DOUBLE)"])
            .where_eq("shop_id", shop_id)
            .where_clause(
                "CAST(processed_at AS TIMESTAMP) >= CAST(? AS TIMESTAMP)",
                &[start.into()],
            )
            .where_clause(
                "CAST(processed_at AS TIMESTAMP) <= CAST(? AS TIMESTAMP)",
                &[end.into()],
            )
            .build();

        let total = self.conn.execute_scalar(&sql, &params)?;
        Ok(total.and_then(|v| v.as_f64()).unwrap_or(0.0))
    }

    /// Page through orders that have a customer attached, oldest processed first.
    ///
    /// With `include_orders_after`, only orders created at or after that
    /// instant are returned.
    pub fn with_customer_id_set(
        &self,
        shop_id: i64,
        offset: usize,
        limit: usize,
        include_orders_after: Option<NaiveDateTime>,
    ) -> Result<Vec<ShopifyOrder>> {
        let mut qb = SqlBuilder::new("shopify_order");
        qb.where_eq("shop_id", shop_id);
        qb.where_not_null("customer_id");

        if let Some(after) = include_orders_after {
            qb.where_clause(
                "CAST(created_at AS TIMESTAMP) >= CAST(? AS TIMESTAMP)",
                &[SqlParam::from(after)],
            );
        }

        qb.order_by(&["processed_at ASC", "id ASC"]);
        qb.offset(offset);
        qb.limit(limit);

        let (sql, params) = qb.build();
        self.conn.execute_into(&sql, &params)
    }

    /// The first processed order of one customer in a shop.
    pub fn first_processed_with_customer_id(
        &self,
        shop_id: i64,
        customer_id: i64,
    ) -> Result<Option<ShopifyOrder>> {
        let (sql, params) = SqlBuilder::new("shopify_order")
            .where_eq("customer_id", customer_id)
            .where_eq("shop_id", shop_id)
            .order_by(&["processed_at ASC", "id ASC"])
            .limit(1)
            .build();

        let rows: Vec<ShopifyOrder> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().next())
    }

    /// Each customer's first processed order id in a shop, ordered by customer id.
    pub fn customers_first_order_ids(&self, shop_id: i64) -> Result<Vec<FirstOrder>> {
        let sql = r#"
            SELECT DISTINCT ON (customer_id) customer_id, id AS first_order_id
            FROM shopify_order
            WHERE shop_id = ?
              AND customer_id IS NOT NULL
            ORDER BY customer_id, processed_at, id
        "#;

        self.conn.execute_into(sql, &[SqlParam::from(shop_id)])
    }
}
