//! # Ticket Repository
//!
//! Meal vouchers accepted at the till, to be reimbursed by the issuing
//! vendor minus its commission.

use sqlx::SqlitePool;
use tracing::debug;

use tally_core::{OperatorFilter, TicketRedemptionRecord, Window};

use super::{from_millis, operator_param, to_millis, window_millis};
use crate::error::StoreResult;

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: String,
    operator_id: Option<String>,
    operator_name: Option<String>,
    occurred_at: Option<i64>,
    face_value_cents: Option<i64>,
    vendor_id: Option<String>,
    vendor_name: Option<String>,
    commission_bps: Option<i64>,
}

impl From<TicketRow> for TicketRedemptionRecord {
    fn from(row: TicketRow) -> Self {
        TicketRedemptionRecord {
            id: row.id,
            operator_id: row.operator_id,
            operator_name: row.operator_name,
            occurred_at: from_millis(row.occurred_at),
            face_value_cents: row.face_value_cents,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
            // Saturate so a corrupt rate is still rejected as out of range.
            commission_bps: row
                .commission_bps
                .map(|bps| u32::try_from(bps).unwrap_or(u32::MAX)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TicketRepository { pool }
    }

    pub async fn list_redemptions(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> StoreResult<Vec<TicketRedemptionRecord>> {
        let (start, end) = window_millis(window);

        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, operator_id, operator_name, occurred_at,
                   face_value_cents, vendor_id, vendor_name, commission_bps
            FROM ticket_redemptions
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

        debug!(count = rows.len(), "Loaded ticket redemptions");
        Ok(rows.into_iter().map(TicketRedemptionRecord::from).collect())
    }

    pub async fn insert(&self, ticket: &TicketRedemptionRecord) -> StoreResult<()> {
        debug!(id = %ticket.id, vendor = ?ticket.vendor_id, "Inserting ticket redemption");

        sqlx::query(
            r#"
            INSERT INTO ticket_redemptions (
                id, operator_id, operator_name, occurred_at,
                face_value_cents, vendor_id, vendor_name, commission_bps
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&ticket.id)
        .bind(&ticket.operator_id)
        .bind(&ticket.operator_name)
        .bind(to_millis(ticket.occurred_at))
        .bind(ticket.face_value_cents)
        .bind(&ticket.vendor_id)
        .bind(&ticket.vendor_name)
        .bind(ticket.commission_bps.map(i64::from))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{at, day, db};
    use tally_core::OperatorId;

    #[tokio::test]
    async fn test_redemptions_round_trip_commission() {
        let db = db().await;
        let repo = db.tickets();

        let ticket = TicketRedemptionRecord {
            id: "t-1".to_string(),
            operator_id: Some("op-1".to_string()),
            occurred_at: Some(at(12)),
            face_value_cents: Some(900),
            vendor_id: Some("swile".to_string()),
            vendor_name: Some("Swile".to_string()),
            commission_bps: Some(350),
            ..Default::default()
        };
        repo.insert(&ticket).await.unwrap();

        let loaded = repo
            .list_redemptions(&day(), &OperatorFilter::Specific(OperatorId::new("op-1")))
            .await
            .unwrap();
        assert_eq!(loaded, vec![ticket]);

        let others = repo
            .list_redemptions(&day(), &OperatorFilter::Specific(OperatorId::new("op-2")))
            .await
            .unwrap();
        assert!(others.is_empty());
    }

    #[test]
    fn test_negative_commission_saturates() {
        let row = TicketRow {
            id: "t-bad".to_string(),
            operator_id: None,
            operator_name: None,
            occurred_at: None,
            face_value_cents: None,
            vendor_id: None,
            vendor_name: None,
            commission_bps: Some(-5),
        };
        let record = TicketRedemptionRecord::from(row);
        assert_eq!(record.commission_bps, Some(u32::MAX));
    }
}
