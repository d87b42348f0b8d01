//! # Source Gateways
//!
//! Contracts for every data source a report is built from. The engine only
//! knows these traits; how a gateway fetches (SQLite, HTTP, fixtures) is the
//! implementor's business.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every fetch returns records whose activity timestamp lies in          │
//! │  [window.start, window.end), narrowed by the OperatorFilter where the  │
//! │  method takes one. The normalizer re-checks the window and rejects     │
//! │  stragglers, so a misbehaving gateway degrades a report instead of     │
//! │  corrupting it.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use tally_core::{
    CashMovementRecord, CatalogEntry, ChargeRecord, Money, OperatorFilter, OperatorId,
    OperatorIdentity, PurchaseRecord, ReturnRecord, SaleRecord, TicketRedemptionRecord, Window,
};

// =============================================================================
// Gateway Error
// =============================================================================

/// Why a single source call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The source could not be reached or refused the request.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with something that could not be decoded.
    #[error("could not decode source payload: {0}")]
    Decode(String),

    /// The call did not finish within its budget.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Source Traits
// =============================================================================

#[async_trait]
pub trait SalesGateway: Send + Sync {
    async fn fetch_sales(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<SaleRecord>>;
}

#[async_trait]
pub trait ReturnsGateway: Send + Sync {
    async fn fetch_returns(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<ReturnRecord>>;
}

/// Supplier invoices are store-wide, so no operator filter.
#[async_trait]
pub trait PurchasesGateway: Send + Sync {
    async fn fetch_purchases(&self, window: &Window) -> GatewayResult<Vec<PurchaseRecord>>;
}

#[async_trait]
pub trait ChargesGateway: Send + Sync {
    async fn fetch_charges(&self, window: &Window) -> GatewayResult<Vec<ChargeRecord>>;
}

#[async_trait]
pub trait TicketGateway: Send + Sync {
    async fn fetch_ticket_redemptions(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<TicketRedemptionRecord>>;
}

/// What the drawer source knows about one operator's float for a window.
///
/// Only a single session opened inside the window yields a float. With
/// several, the window's cash sales were spread over drawers that were each
/// counted on their own, so no expected-cash figure matches any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningFloat {
    Found(Money),
    NoSession,
    /// Number of sessions the operator opened inside the window.
    MultipleSessions(usize),
}

impl OpeningFloat {
    /// Classifies the floats of every session opened inside the window.
    pub fn from_floats(floats: &[Money]) -> Self {
        match floats {
            [] => OpeningFloat::NoSession,
            [float] => OpeningFloat::Found(*float),
            many => OpeningFloat::MultipleSessions(many.len()),
        }
    }
}

/// Drawer sessions: opening floats and non-sale cash movements.
#[async_trait]
pub trait CashDrawerGateway: Send + Sync {
    /// Float of the operator's drawer session that opened in the window.
    async fn fetch_opening_float(
        &self,
        operator: &OperatorId,
        window: &Window,
    ) -> GatewayResult<OpeningFloat>;

    async fn fetch_cash_movements(
        &self,
        window: &Window,
        filter: &OperatorFilter,
    ) -> GatewayResult<Vec<CashMovementRecord>>;
}

/// Current product names, used when a record carries no name of its own.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn fetch_catalog(&self) -> GatewayResult<Vec<CatalogEntry>>;
}

/// The authorization collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_operator(&self) -> GatewayResult<OperatorIdentity>;

    /// Whether `identity` may see a report for `filter`.
    async fn is_authorized(
        &self,
        identity: &OperatorIdentity,
        filter: &OperatorFilter,
    ) -> GatewayResult<bool>;
}

// =============================================================================
// Gateway Bundle
// =============================================================================

/// All gateways a [`ReportEngine`] needs, shared behind `Arc`.
///
/// [`ReportEngine`]: crate::engine::ReportEngine
#[derive(Clone)]
pub struct Gateways {
    pub sales: Arc<dyn SalesGateway>,
    pub returns: Arc<dyn ReturnsGateway>,
    pub purchases: Arc<dyn PurchasesGateway>,
    pub charges: Arc<dyn ChargesGateway>,
    pub tickets: Arc<dyn TicketGateway>,
    pub cash_drawer: Arc<dyn CashDrawerGateway>,
    pub catalog: Arc<dyn CatalogGateway>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Gateways {
    /// Uses one value for every source, e.g. a database that holds them all.
    pub fn from_single<G>(gateway: Arc<G>) -> Self
    where
        G: SalesGateway
            + ReturnsGateway
            + PurchasesGateway
            + ChargesGateway
            + TicketGateway
            + CashDrawerGateway
            + CatalogGateway
            + IdentityProvider
            + 'static,
    {
        Gateways {
            sales: gateway.clone(),
            returns: gateway.clone(),
            purchases: gateway.clone(),
            charges: gateway.clone(),
            tickets: gateway.clone(),
            cash_drawer: gateway.clone(),
            catalog: gateway.clone(),
            identity: gateway,
        }
    }
}

impl std::fmt::Debug for Gateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateways").finish_non_exhaustive()
    }
}
