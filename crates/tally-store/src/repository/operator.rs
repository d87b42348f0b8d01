//! # Operator Repository
//!
//! Who may run reports, and for whom.
//!
//! ## Access Rules
//! ```text
//! ┌──────────────────┬───────────────────────┬─────────────────────────────┐
//! │ Operator         │ OperatorFilter::All   │ OperatorFilter::Specific(x) │
//! ├──────────────────┼───────────────────────┼─────────────────────────────┤
//! │ manager          │ ✓                     │ ✓                           │
//! │ cashier          │ ✗                     │ only x == self              │
//! │ inactive (any)   │ ✗                     │ ✗                           │
//! └──────────────────┴───────────────────────┴─────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use tally_core::{OperatorFilter, OperatorId, OperatorIdentity};

use crate::error::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorRole {
    Cashier,
    Manager,
}

impl OperatorRole {
    fn as_db(&self) -> &'static str {
        match self {
            OperatorRole::Cashier => "cashier",
            OperatorRole::Manager => "manager",
        }
    }

    /// Anything unrecognized gets the narrower role.
    fn from_db(role: &str) -> Self {
        match role {
            "manager" => OperatorRole::Manager,
            _ => OperatorRole::Cashier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOperator {
    pub id: OperatorId,
    pub display_name: String,
    pub role: OperatorRole,
    pub is_active: bool,
}

impl StoredOperator {
    pub fn identity(&self) -> OperatorIdentity {
        OperatorIdentity {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
        }
    }

    pub fn may_view(&self, filter: &OperatorFilter) -> bool {
        if !self.is_active {
            return false;
        }
        match (self.role, filter) {
            (OperatorRole::Manager, _) => true,
            (OperatorRole::Cashier, OperatorFilter::Specific(id)) => *id == self.id,
            (OperatorRole::Cashier, OperatorFilter::All) => false,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OperatorRow {
    id: String,
    display_name: String,
    role: String,
    is_active: bool,
}

impl From<OperatorRow> for StoredOperator {
    fn from(row: OperatorRow) -> Self {
        StoredOperator {
            id: OperatorId::new(row.id),
            display_name: row.display_name,
            role: OperatorRole::from_db(&row.role),
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorRepository {
    pool: SqlitePool,
}

impl OperatorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OperatorRepository { pool }
    }

    pub async fn get(&self, id: &OperatorId) -> StoreResult<Option<StoredOperator>> {
        let row: Option<OperatorRow> = sqlx::query_as(
            "SELECT id, display_name, role, is_active FROM operators WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredOperator::from))
    }

    pub async fn insert(&self, operator: &StoredOperator) -> StoreResult<()> {
        debug!(id = %operator.id, role = operator.role.as_db(), "Inserting operator");

        sqlx::query(
            r#"
            INSERT INTO operators (id, display_name, role, is_active)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(operator.id.as_str())
        .bind(&operator.display_name)
        .bind(operator.role.as_db())
        .bind(operator.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::db;

    fn cashier(id: &str) -> StoredOperator {
        StoredOperator {
            id: OperatorId::new(id),
            display_name: id.to_uppercase(),
            role: OperatorRole::Cashier,
            is_active: true,
        }
    }

    #[test]
    fn test_access_rules() {
        let alice = cashier("op-1");
        let own = OperatorFilter::Specific(OperatorId::new("op-1"));
        let other = OperatorFilter::Specific(OperatorId::new("op-2"));

        assert!(alice.may_view(&own));
        assert!(!alice.may_view(&other));
        assert!(!alice.may_view(&OperatorFilter::All));

        let manager = StoredOperator {
            role: OperatorRole::Manager,
            ..cashier("mgr-1")
        };
        assert!(manager.may_view(&other));
        assert!(manager.may_view(&OperatorFilter::All));

        let retired = StoredOperator {
            is_active: false,
            ..manager
        };
        assert!(!retired.may_view(&OperatorFilter::All));
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let repo = db.operators();
        let manager = StoredOperator {
            role: OperatorRole::Manager,
            ..cashier("mgr-1")
        };

        repo.insert(&manager).await.unwrap();

        assert_eq!(repo.get(&manager.id).await.unwrap(), Some(manager));
        assert_eq!(repo.get(&OperatorId::new("ghost")).await.unwrap(), None);
    }
}
