//! # Sale Repository
//!
//! Completed sales and refunds, as the till recorded them.
//!
//! ## Sign Convention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales.amount_cents     gross amount charged (positive)                │
//! │  returns.amount_cents   amount refunded      (positive magnitude)      │
//! │                                                                         │
//! │  The normalizer negates returns; the store never flips a sign.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use tally_core::{OperatorFilter, ReturnRecord, SaleRecord, Window};

use super::{from_millis, operator_param, to_millis, window_millis};
use crate::error::StoreResult;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    operator_id: Option<String>,
    operator_name: Option<String>,
    occurred_at: Option<i64>,
    amount_cents: Option<i64>,
    tax_cents: Option<i64>,
    discount_cents: Option<i64>,
    payment_method: Option<String>,
    product_id: Option<String>,
    product_name: Option<String>,
}

impl From<SaleRow> for SaleRecord {
    fn from(row: SaleRow) -> Self {
        SaleRecord {
            id: row.id,
            operator_id: row.operator_id,
            operator_name: row.operator_name,
            occurred_at: from_millis(row.occurred_at),
            amount_cents: row.amount_cents,
            tax_cents: row.tax_cents,
            discount_cents: row.discount_cents,
            payment_method: row.payment_method,
            product_id: row.product_id,
            product_name: row.product_name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReturnRow {
    id: String,
    sale_id: Option<String>,
    operator_id: Option<String>,
    operator_name: Option<String>,
    occurred_at: Option<i64>,
    amount_cents: Option<i64>,
    tax_cents: Option<i64>,
    payment_method: Option<String>,
    product_id: Option<String>,
    product_name: Option<String>,
}

impl From<ReturnRow> for ReturnRecord {
    fn from(row: ReturnRow) -> Self {
        ReturnRecord {
            id: row.id,
            sale_id: row.sale_id,
            operator_id: row.operator_id,
            operator_name: row.operator_name,
            occurred_at: from_millis(row.occurred_at),
            amount_cents: row.amount_cents,
            tax_cents: row.tax_cents,
            payment_method: row.payment_method,
            product_id: row.product_id,
            product_name: row.product_name,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sales and returns.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Sales in `window`, narrowed to one operator when the filter says so.
    pub async fn list_sales(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> StoreResult<Vec<SaleRecord>> {
        let (start, end) = window_millis(window);

        let rows: Vec<SaleRow> = sqlx::query_as(
            r#"
            SELECT
                id, operator_id, operator_name, occurred_at,
                amount_cents, tax_cents, discount_cents,
                payment_method, product_id, product_name
            FROM sales
            WHERE occurred_at >= ?1 AND occurred_at < ?2
              AND (?3 IS NULL OR operator_id = ?3)
            ORDER BY occurred_at, id
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(operator_param(filter))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded sales");
        Ok(rows.into_iter().map(SaleRecord::from).collect())
    }

    pub async fn list_returns(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> StoreResult<Vec<ReturnRecord>> {
        let (start, end) = window_millis(window);

        let rows: Vec<ReturnRow> = sqlx::query_as(
            r#"
            SELECT
                id, sale_id, operator_id, operator_name, occurred_at,
                amount_cents, tax_cents, payment_method,
                product_id, product_name
            FROM returns
            WHERE occurred_at >= ?1 AND occurred_at < ?2
              AND (?3 IS NULL OR operator_id = ?3)
            ORDER BY occurred_at, id
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(operator_param(filter))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded returns");
        Ok(rows.into_iter().map(ReturnRecord::from).collect())
    }

    pub async fn insert_sale(&self, sale: &SaleRecord) -> StoreResult<()> {
        debug!(id = %sale.id, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, operator_id, operator_name, occurred_at,
                amount_cents, tax_cents, discount_cents,
                payment_method, product_id, product_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.operator_id)
        .bind(&sale.operator_name)
        .bind(to_millis(sale.occurred_at))
        .bind(sale.amount_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(&sale.payment_method)
        .bind(&sale.product_id)
        .bind(&sale.product_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_return(&self, refund: &ReturnRecord) -> StoreResult<()> {
        debug!(id = %refund.id, sale_id = ?refund.sale_id, "Inserting return");

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, sale_id, operator_id, operator_name, occurred_at,
                amount_cents, tax_cents, payment_method,
                product_id, product_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&refund.id)
        .bind(&refund.sale_id)
        .bind(&refund.operator_id)
        .bind(&refund.operator_name)
        .bind(to_millis(refund.occurred_at))
        .bind(refund.amount_cents)
        .bind(refund.tax_cents)
        .bind(&refund.payment_method)
        .bind(&refund.product_id)
        .bind(&refund.product_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of sales, for the seed binary's duplicate check.
    pub async fn count_sales(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
