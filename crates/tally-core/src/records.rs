//! # Raw Source Records
//!
//! The shapes gateways hand back, before any checking. They mirror the
//! back-office API payloads: anything that can be missing is an `Option`,
//! amounts are plain integer cents, and payment methods are free-form tags.
//!
//! Nothing here is trusted. The normalizer turns these into [`LineItem`]s
//! or diagnostics.
//!
//! ```text
//! SalesGateway ──► Vec<SaleRecord> ──┐
//! ReturnsGateway ─► Vec<ReturnRecord> ├──► RawSnapshot ──► normalize()
//! ...                                 ┘
//! ```
//!
//! [`LineItem`]: crate::types::LineItem

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed sale line as recorded at the till.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: String,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// Tax-inclusive amount before discount.
    pub amount_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub payment_method: Option<String>,
    pub product_id: Option<String>,
    /// Product name as printed on the receipt at sale time.
    pub product_name: Option<String>,
}

/// A refund. `amount_cents` is the positive refunded magnitude.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: String,
    /// The sale being refunded, when the till recorded it.
    pub sale_id: Option<String>,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub payment_method: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
}

/// Stock purchased from a supplier (a supplier invoice).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: String,
    pub operator_id: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub supplier_name: Option<String>,
    pub invoice_ref: Option<String>,
}

/// A running expense (rent, utilities, cleaning).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub id: String,
    pub operator_id: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub category: Option<String>,
}

/// A meal voucher accepted at the till.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRedemptionRecord {
    pub id: String,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub face_value_cents: Option<i64>,
    pub vendor_id: Option<String>,
    pub vendor_name: Option<String>,
    /// Vendor commission in basis points. Missing means none.
    pub commission_bps: Option<u32>,
}

/// Cash added to or taken from the drawer outside of a sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashMovementRecord {
    pub id: String,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// Positive magnitude; the sign comes from `direction`.
    pub amount_cents: Option<i64>,
    /// `"in"` or `"out"`.
    pub direction: Option<String>,
    pub reason: Option<String>,
}

/// Current catalog name for a product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: String,
    pub name: String,
}

/// Everything fetched for one report request.
///
/// Owned by that request alone. A source that failed contributes an empty
/// vector; the engine tracks its absence separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSnapshot {
    pub sales: Vec<SaleRecord>,
    pub returns: Vec<ReturnRecord>,
    pub purchases: Vec<PurchaseRecord>,
    pub charges: Vec<ChargeRecord>,
    pub ticket_redemptions: Vec<TicketRedemptionRecord>,
    pub cash_movements: Vec<CashMovementRecord>,
    pub catalog: Vec<CatalogEntry>,
}

impl RawSnapshot {
    /// Total number of transactional records (catalog excluded).
    pub fn record_count(&self) -> usize {
        self.sales.len()
            + self.returns.len()
            + self.purchases.len()
            + self.charges.len()
            + self.ticket_redemptions.len()
            + self.cash_movements.len()
    }
}
