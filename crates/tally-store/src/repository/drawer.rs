//! # Drawer Repository
//!
//! Cash drawer sessions (one per operator shift, carrying the opening
//! float) and the pay-ins / payouts made during them.
//!
//! ## Which Sessions Count
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  window:      [──────────────────────────────)                          │
//! │  session A:  ●──────────────                   opened before: ignored  │
//! │  session B:          ●──────────────           opened inside: listed   │
//! │  session C:                    ●────────       opened inside: listed   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only a window holding exactly one of the operator's sessions has an
//! opening float; the gateway turns two or more into an unavailable cash
//! position.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use tally_core::{CashMovementRecord, Money, OperatorFilter, OperatorId, Window};

use super::{from_millis, operator_param, to_millis, window_millis};
use crate::error::{StoreError, StoreResult};

/// A drawer opened by one operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawerSession {
    pub id: String,
    pub operator_id: OperatorId,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub opening_float: Money,
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    operator_id: String,
    opened_at: i64,
    closed_at: Option<i64>,
    opening_float_cents: i64,
}

impl TryFrom<SessionRow> for DrawerSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let opened_at = from_millis(Some(row.opened_at)).ok_or_else(|| {
            StoreError::Internal(format!(
                "drawer session {} has unreadable opened_at {}",
                row.id, row.opened_at
            ))
        })?;
        Ok(DrawerSession {
            id: row.id,
            operator_id: OperatorId::new(row.operator_id),
            opened_at,
            closed_at: from_millis(row.closed_at),
            opening_float: Money::from_cents(row.opening_float_cents),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    operator_id: Option<String>,
    operator_name: Option<String>,
    occurred_at: Option<i64>,
    amount_cents: Option<i64>,
    direction: Option<String>,
    reason: Option<String>,
}

impl From<MovementRow> for CashMovementRecord {
    fn from(row: MovementRow) -> Self {
        CashMovementRecord {
            id: row.id,
            operator_id: row.operator_id,
            operator_name: row.operator_name,
            occurred_at: from_millis(row.occurred_at),
            amount_cents: row.amount_cents,
            direction: row.direction,
            reason: row.reason,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrawerRepository {
    pool: SqlitePool,
}

impl DrawerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DrawerRepository { pool }
    }

    /// Every session `operator` opened inside `window`, oldest first.
    pub async fn sessions_opened_in(
        &self,
        operator: &OperatorId,
        window: &Window,
    ) -> StoreResult<Vec<DrawerSession>> {
        let (start, end) = window_millis(window);

        let rows: Vec<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, operator_id, opened_at, closed_at, opening_float_cents
            FROM drawer_sessions
            WHERE operator_id = ?1
              AND opened_at >= ?2 AND opened_at < ?3
            ORDER BY opened_at, id
            "#,
        )
        .bind(operator.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(%operator, count = rows.len(), "Loaded drawer sessions");
        rows.into_iter().map(DrawerSession::try_from).collect()
    }

    pub async fn list_movements(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> StoreResult<Vec<CashMovementRecord>> {
        let (start, end) = window_millis(window);

        let rows: Vec<MovementRow> = sqlx::query_as(
            r#"
            SELECT id, operator_id, operator_name, occurred_at,
                   amount_cents, direction, reason
            FROM cash_movements
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

        debug!(count = rows.len(), "Loaded cash movements");
        Ok(rows.into_iter().map(CashMovementRecord::from).collect())
    }

    /// Records a session. The operator must already exist.
    pub async fn open_session(&self, session: &DrawerSession) -> StoreResult<()> {
        debug!(id = %session.id, operator = %session.operator_id, "Opening drawer session");

        sqlx::query(
            r#"
            INSERT INTO drawer_sessions (
                id, operator_id, opened_at, closed_at, opening_float_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&session.id)
        .bind(session.operator_id.as_str())
        .bind(session.opened_at.timestamp_millis())
        .bind(to_millis(session.closed_at))
        .bind(session.opening_float.cents())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_movement(&self, movement: &CashMovementRecord) -> StoreResult<()> {
        debug!(id = %movement.id, direction = ?movement.direction, "Inserting cash movement");

        sqlx::query(
            r#"
            INSERT INTO cash_movements (
                id, operator_id, operator_name, occurred_at,
                amount_cents, direction, reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.operator_id)
        .bind(&movement.operator_name)
        .bind(to_millis(movement.occurred_at))
        .bind(movement.amount_cents)
        .bind(&movement.direction)
        .bind(&movement.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
