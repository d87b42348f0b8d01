//! # SQLite Gateways
//!
//! One value that implements every source trait of the engine against the
//! local store, so a complete engine is a single line:
//!
//! ```rust,ignore
//! let gateways = Gateways::from_single(Arc::new(SqliteGateways::new(db, operator)));
//! let engine = ReportEngine::new(gateways, EngineConfig::load_or_default(None));
//! ```
//!
//! The signed-in operator is fixed at construction; the operators table
//! decides what that operator may see.

use async_trait::async_trait;

use tally_core::{
    CashMovementRecord, CatalogEntry, ChargeRecord, Money, OperatorFilter, OperatorId,
    OperatorIdentity, PurchaseRecord, ReturnRecord, SaleRecord, TicketRedemptionRecord, Window,
};
use tally_engine::{
    CashDrawerGateway, CatalogGateway, ChargesGateway, GatewayError, GatewayResult,
    IdentityProvider, OpeningFloat, PurchasesGateway, ReturnsGateway, SalesGateway, TicketGateway,
};
use tracing::warn;

use crate::pool::Database;

#[derive(Debug, Clone)]
pub struct SqliteGateways {
    db: Database,
    signed_in: OperatorId,
}

impl SqliteGateways {
    pub fn new(db: Database, signed_in: OperatorId) -> Self {
        SqliteGateways { db, signed_in }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SalesGateway for SqliteGateways {
    async fn fetch_sales(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<SaleRecord>> {
        Ok(self.db.sales().list_sales(window, filter).await?)
    }
}

#[async_trait]
impl ReturnsGateway for SqliteGateways {
    async fn fetch_returns(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<ReturnRecord>> {
        Ok(self.db.sales().list_returns(window, filter).await?)
    }
}

#[async_trait]
impl PurchasesGateway for SqliteGateways {
    async fn fetch_purchases(&self, window: &Window) -> GatewayResult<Vec<PurchaseRecord>> {
        Ok(self.db.expenses().list_purchases(window).await?)
    }
}

#[async_trait]
impl ChargesGateway for SqliteGateways {
    async fn fetch_charges(&self, window: &Window) -> GatewayResult<Vec<ChargeRecord>> {
        Ok(self.db.expenses().list_charges(window).await?)
    }
}

#[async_trait]
impl TicketGateway for SqliteGateways {
    async fn fetch_ticket_redemptions(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<TicketRedemptionRecord>> {
        Ok(self.db.tickets().list_redemptions(window, filter).await?)
    }
}

#[async_trait]
impl CashDrawerGateway for SqliteGateways {
    async fn fetch_opening_float(
        &self,
        operator: &OperatorId,
        window: &Window,
    ) -> GatewayResult<OpeningFloat> {
        let sessions = self.db.drawer().sessions_opened_in(operator, window).await?;
        let floats: Vec<Money> = sessions.iter().map(|s| s.opening_float).collect();
        Ok(OpeningFloat::from_floats(&floats))
    }

    async fn fetch_cash_movements(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<CashMovementRecord>> {
        Ok(self.db.drawer().list_movements(window, filter).await?)
    }
}

#[async_trait]
impl CatalogGateway for SqliteGateways {
    async fn fetch_catalog(&self) -> GatewayResult<Vec<CatalogEntry>> {
        Ok(self.db.catalog().list().await?)
    }
}

#[async_trait]
impl IdentityProvider for SqliteGateways {
    async fn current_operator(&self) -> GatewayResult<OperatorIdentity> {
        match self.db.operators().get(&self.signed_in).await? {
            Some(operator) => Ok(operator.identity()),
            None => {
                warn!(operator = %self.signed_in, "Signed-in operator is not in the store");
                Err(GatewayError::Unavailable(format!(
                    "unknown operator {}",
                    self.signed_in
                )))
            }
        }
    }

    async fn is_authorized(
        &self,
        identity: &OperatorIdentity,
        filter: &OperatorFilter,
    ) -> GatewayResult<bool> {
        let operator = self.db.operators().get(&identity.id).await?;
        Ok(operator.is_some_and(|operator| operator.may_view(filter)))
    }
}
