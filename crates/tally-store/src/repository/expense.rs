//! # Expense Repository
//!
//! Supplier purchases and operating charges. Both are store-wide, so
//! queries take a window but no operator filter.

use sqlx::SqlitePool;
use tracing::debug;

use tally_core::{ChargeRecord, PurchaseRecord, Window};

use super::{from_millis, to_millis, window_millis};
use crate::error::StoreResult;

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: String,
    operator_id: Option<String>,
    occurred_at: Option<i64>,
    amount_cents: Option<i64>,
    tax_cents: Option<i64>,
    supplier_name: Option<String>,
    invoice_ref: Option<String>,
}

impl From<PurchaseRow> for PurchaseRecord {
    fn from(row: PurchaseRow) -> Self {
        PurchaseRecord {
            id: row.id,
            operator_id: row.operator_id,
            occurred_at: from_millis(row.occurred_at),
            amount_cents: row.amount_cents,
            tax_cents: row.tax_cents,
            supplier_name: row.supplier_name,
            invoice_ref: row.invoice_ref,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChargeRow {
    id: String,
    operator_id: Option<String>,
    occurred_at: Option<i64>,
    amount_cents: Option<i64>,
    tax_cents: Option<i64>,
    category: Option<String>,
}

impl From<ChargeRow> for ChargeRecord {
    fn from(row: ChargeRow) -> Self {
        ChargeRecord {
            id: row.id,
            operator_id: row.operator_id,
            occurred_at: from_millis(row.occurred_at),
            amount_cents: row.amount_cents,
            tax_cents: row.tax_cents,
            category: row.category,
        }
    }
}

/// Repository for purchases and charges.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn list_purchases(&self, window: &Window) -> StoreResult<Vec<PurchaseRecord>> {
        let (start, end) = window_millis(window);

        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, operator_id, occurred_at, amount_cents, tax_cents,
                   supplier_name, invoice_ref
            FROM purchases
            WHERE occurred_at >= ?1 AND occurred_at < ?2
            ORDER BY occurred_at, id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded purchases");
        Ok(rows.into_iter().map(PurchaseRecord::from).collect())
    }

    pub async fn list_charges(&self, window: &Window) -> StoreResult<Vec<ChargeRecord>> {
        let (start, end) = window_millis(window);

        let rows: Vec<ChargeRow> = sqlx::query_as(
            r#"
            SELECT id, operator_id, occurred_at, amount_cents, tax_cents, category
            FROM charges
            WHERE occurred_at >= ?1 AND occurred_at < ?2
            ORDER BY occurred_at, id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded charges");
        Ok(rows.into_iter().map(ChargeRecord::from).collect())
    }

    pub async fn insert_purchase(&self, purchase: &PurchaseRecord) -> StoreResult<()> {
        debug!(id = %purchase.id, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, operator_id, occurred_at, amount_cents, tax_cents,
                supplier_name, invoice_ref
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.operator_id)
        .bind(to_millis(purchase.occurred_at))
        .bind(purchase.amount_cents)
        .bind(purchase.tax_cents)
        .bind(&purchase.supplier_name)
        .bind(&purchase.invoice_ref)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_charge(&self, charge: &ChargeRecord) -> StoreResult<()> {
        debug!(id = %charge.id, "Inserting charge");

        sqlx::query(
            r#"
            INSERT INTO charges (
                id, operator_id, occurred_at, amount_cents, tax_cents, category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&charge.id)
        .bind(&charge.operator_id)
        .bind(to_millis(charge.occurred_at))
        .bind(charge.amount_cents)
        .bind(charge.tax_cents)
        .bind(&charge.category)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{at, day, db};
    use chrono::Duration;

    #[tokio::test]
    async fn test_purchases_and_charges_in_window() {
        let db = db().await;
        let repo = db.expenses();

        repo.insert_purchase(&PurchaseRecord {
            id: "p-1".to_string(),
            occurred_at: Some(at(8)),
            amount_cents: Some(12_000),
            supplier_name: Some("Metro".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        repo.insert_purchase(&PurchaseRecord {
            id: "p-old".to_string(),
            occurred_at: Some(at(8) - Duration::days(2)),
            amount_cents: Some(5_000),
            ..Default::default()
        })
        .await
        .unwrap();
        repo.insert_charge(&ChargeRecord {
            id: "c-1".to_string(),
            operator_id: Some("mgr-1".to_string()),
            occurred_at: Some(at(18)),
            amount_cents: Some(4_500),
            category: Some("electricity".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        let purchases = repo.list_purchases(&day()).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].supplier_name.as_deref(), Some("Metro"));

        let charges = repo.list_charges(&day()).await.unwrap();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].category.as_deref(), Some("electricity"));
        assert_eq!(charges[0].occurred_at, Some(at(18)));
    }
}
