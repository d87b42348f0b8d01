//! # Catalog Repository
//!
//! Current product names. Used only to fill in names that the sale or
//! return rows do not carry themselves.

use sqlx::SqlitePool;
use tracing::debug;

use tally_core::CatalogEntry;

use crate::error::StoreResult;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
}

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    pub async fn list(&self) -> StoreResult<Vec<CatalogEntry>> {
        let rows: Vec<ProductRow> = sqlx::query_as("SELECT id, name FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Loaded catalog");
        Ok(rows
            .into_iter()
            .map(|row| CatalogEntry {
                product_id: row.id,
                name: row.name,
            })
            .collect())
    }

    /// Inserts or renames a product.
    pub async fn upsert(&self, entry: &CatalogEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name) VALUES (?1, ?2)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(&entry.product_id)
        .bind(&entry.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::db;

    #[tokio::test]
    async fn test_upsert_renames() {
        let db = db().await;
        let catalog = db.catalog();

        let mut entry = CatalogEntry {
            product_id: "p-1".to_string(),
            name: "Espresso".to_string(),
        };
        catalog.upsert(&entry).await.unwrap();
        entry.name = "Double Espresso".to_string();
        catalog.upsert(&entry).await.unwrap();

        assert_eq!(catalog.list().await.unwrap(), vec![entry]);
    }
}
