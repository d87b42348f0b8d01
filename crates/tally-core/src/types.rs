//! # Domain Types
//!
//! The normalized ledger shape and the request-level value types shared by
//! every stage of report generation.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │    LineKind     │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  kind           │   │  Sale           │   │  Cash           │       │
//! │  │  operator_id    │   │  Return         │   │  Card           │       │
//! │  │  occurred_at    │   │  Purchase       │   │  Cheque         │       │
//! │  │  gross_amount   │   │  Charge         │   │  MealTicket     │       │
//! │  │  tax_amount     │   │  TicketRedempt. │   │  None           │       │
//! │  │  product        │   │  Adjustment     │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Window      │   │ OperatorFilter  │   │   SourceKind    │       │
//! │  │  [start, end)   │   │  All            │   │  Sales, ...     │       │
//! │  │                 │   │  Specific(id)   │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sign Convention
//! Returns are negative `gross_amount`s. Purchases and charges are positive
//! costs. Adjustments (drawer pay-ins/pay-outs) carry their own sign. Every
//! total in the crate is therefore a plain sum.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Operator Identity
// =============================================================================

/// Identifier of a cashier/operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OperatorId(String);

impl OperatorId {
    pub fn new(id: impl Into<String>) -> Self {
        OperatorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperatorId {
    fn from(id: &str) -> Self {
        OperatorId(id.to_string())
    }
}

/// The operator currently signed in, as reported by the authorization layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OperatorIdentity {
    pub id: OperatorId,
    pub display_name: String,
}

/// Which operators a report covers.
///
/// Passed unchanged to every gateway so each source applies the same
/// filtering semantics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "scope", content = "operator_id", rename_all = "snake_case")]
pub enum OperatorFilter {
    /// Every operator in the window.
    #[default]
    All,
    /// A single operator.
    Specific(OperatorId),
}

impl OperatorFilter {
    /// Returns true if a record attributed to `operator` belongs in the report.
    ///
    /// Records without an operator only match `All`.
    pub fn matches(&self, operator: Option<&OperatorId>) -> bool {
        match self {
            OperatorFilter::All => true,
            OperatorFilter::Specific(id) => operator == Some(id),
        }
    }

    /// The specific operator, if any.
    pub fn operator(&self) -> Option<&OperatorId> {
        match self {
            OperatorFilter::All => None,
            OperatorFilter::Specific(id) => Some(id),
        }
    }
}

impl fmt::Display for OperatorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorFilter::All => write!(f, "all"),
            OperatorFilter::Specific(id) => write!(f, "{}", id),
        }
    }
}

// =============================================================================
// Window
// =============================================================================

/// Half-open reporting period `[start, end)`.
///
/// Constructed only through [`Window::new`], so `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Window {
    #[ts(as = "String")]
    start: DateTime<Utc>,
    #[ts(as = "String")]
    end: DateTime<Utc>,
}

impl Window {
    /// Creates a window, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidWindow {
                reason: format!("start {} must be before end {}", start, end),
            });
        }
        Ok(Window { start, end })
    }

    #[inline]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `start <= at < end`.
    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

// =============================================================================
// Line Kind
// =============================================================================

/// What a ledger line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Sale,
    Return,
    Purchase,
    Charge,
    TicketRedemption,
    /// Drawer cash movement that is not a sale (pay-in, pay-out, drop).
    Adjustment,
}

impl LineKind {
    /// Sale and Return lines make up net revenue.
    #[inline]
    pub fn is_revenue(&self) -> bool {
        matches!(self, LineKind::Sale | LineKind::Return)
    }

    /// Only purchases and charges may lack an operator.
    #[inline]
    pub fn requires_operator(&self) -> bool {
        !matches!(self, LineKind::Purchase | LineKind::Charge)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Tender used for a line. `None` marks lines that never touch the till.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Cheque,
    MealTicket,
    None,
}

impl PaymentMethod {
    /// Parses the tender tag a source record carries.
    ///
    /// Accepts the spellings the back office has used over time. `None` is
    /// never a valid tender, so it is not parsed here.
    ///
    /// ```rust
    /// use tally_core::PaymentMethod;
    ///
    /// assert_eq!(PaymentMethod::from_tender_tag("CB"), Some(PaymentMethod::Card));
    /// assert_eq!(PaymentMethod::from_tender_tag("ticket_restaurant"), Some(PaymentMethod::MealTicket));
    /// assert_eq!(PaymentMethod::from_tender_tag("bitcoin"), None);
    /// ```
    pub fn from_tender_tag(tag: &str) -> Option<PaymentMethod> {
        match tag.trim().to_lowercase().as_str() {
            "cash" | "especes" | "espèces" => Some(PaymentMethod::Cash),
            "card" | "cb" | "credit_card" | "debit_card" => Some(PaymentMethod::Card),
            "cheque" | "check" => Some(PaymentMethod::Cheque),
            "meal_ticket" | "ticket_restaurant" | "tr" | "voucher" => {
                Some(PaymentMethod::MealTicket)
            }
            _ => None,
        }
    }

    /// True for every method except `None`.
    #[inline]
    pub fn is_tender(&self) -> bool {
        !matches!(self, PaymentMethod::None)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::MealTicket => "meal_ticket",
            PaymentMethod::None => "none",
        };
        f.write_str(label)
    }
}

// =============================================================================
// References
// =============================================================================

/// Product a sale/return line refers to, with the display name frozen at
/// normalization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRef {
    pub id: String,
    pub name: Option<String>,
}

/// Meal-ticket vendor and the voucher's face value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierTicketRef {
    pub vendor_id: String,
    pub vendor_name: Option<String>,
    pub face_value: Money,
    /// Commission the vendor withholds on reimbursement, in basis points.
    pub commission_bps: u32,
}

impl SupplierTicketRef {
    /// Amount the vendor is expected to pay back for this ticket.
    pub fn reimbursable(&self) -> Money {
        self.face_value.apply_percentage_discount(self.commission_bps)
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One normalized transactional fact.
///
/// Produced only by the normalizer; every field has already been checked
/// against the kind-specific rules (operator presence, non-negative tax,
/// product present on revenue lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub kind: LineKind,
    /// Id of the source record this line came from.
    pub source_id: String,
    pub operator_id: Option<OperatorId>,
    pub operator_name: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    /// Signed, pre-discount, tax-inclusive amount.
    pub gross_amount: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub payment_method: PaymentMethod,
    pub product: Option<ProductRef>,
    pub supplier_ticket: Option<SupplierTicketRef>,
}

impl LineItem {
    /// What actually changed hands: gross minus discount.
    #[inline]
    pub fn tendered(&self) -> Money {
        self.gross_amount - self.discount_amount
    }

    /// True for Sale/Return lines paid in cash.
    #[inline]
    pub fn is_cash_revenue(&self) -> bool {
        self.kind.is_revenue() && self.payment_method == PaymentMethod::Cash
    }
}

// =============================================================================
// Source Kind
// =============================================================================

/// The independent sources a report is built from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sales,
    Returns,
    Purchases,
    Charges,
    TicketRedemptions,
    CashMovements,
    OpeningFloat,
    Catalog,
}

impl SourceKind {
    pub const ALL: [SourceKind; 8] = [
        SourceKind::Sales,
        SourceKind::Returns,
        SourceKind::Purchases,
        SourceKind::Charges,
        SourceKind::TicketRedemptions,
        SourceKind::CashMovements,
        SourceKind::OpeningFloat,
        SourceKind::Catalog,
    ];

    /// A report cannot exist without this source.
    #[inline]
    pub fn is_critical(&self) -> bool {
        matches!(self, SourceKind::Sales)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::Sales => "sales",
            SourceKind::Returns => "returns",
            SourceKind::Purchases => "purchases",
            SourceKind::Charges => "charges",
            SourceKind::TicketRedemptions => "ticket_redemptions",
            SourceKind::CashMovements => "cash_movements",
            SourceKind::OpeningFloat => "opening_float",
            SourceKind::Catalog => "catalog",
        };
        f.write_str(label)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, 0, 0).unwrap()
    }

    #[test]
    fn test_window_is_half_open() {
        let window = Window::new(at(8), at(20)).unwrap();
        assert!(window.contains(at(8)));
        assert!(window.contains(at(19)));
        assert!(!window.contains(at(20)));
        assert!(!window.contains(at(7)));
        assert_eq!(window.duration(), Duration::hours(12));
    }

    #[test]
    fn test_window_rejects_empty_and_inverted() {
        assert!(Window::new(at(8), at(8)).is_err());
        assert!(Window::new(at(20), at(8)).is_err());
    }

    #[test]
    fn test_operator_filter_matches() {
        let alice = OperatorId::from("alice");
        let bob = OperatorId::from("bob");

        assert!(OperatorFilter::All.matches(Some(&alice)));
        assert!(OperatorFilter::All.matches(None));

        let only_alice = OperatorFilter::Specific(alice.clone());
        assert!(only_alice.matches(Some(&alice)));
        assert!(!only_alice.matches(Some(&bob)));
        assert!(!only_alice.matches(None));
    }

    #[test]
    fn test_operator_filter_serialization() {
        let json = serde_json::to_string(&OperatorFilter::Specific("op-7".into())).unwrap();
        assert_eq!(json, r#"{"scope":"specific","operator_id":"op-7"}"#);
        let json = serde_json::to_string(&OperatorFilter::All).unwrap();
        assert_eq!(json, r#"{"scope":"all"}"#);
    }

    #[test]
    fn test_tender_tags() {
        assert_eq!(PaymentMethod::from_tender_tag(" Cash "), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::from_tender_tag("check"), Some(PaymentMethod::Cheque));
        assert_eq!(PaymentMethod::from_tender_tag("TR"), Some(PaymentMethod::MealTicket));
        assert_eq!(PaymentMethod::from_tender_tag("none"), None);
        assert_eq!(PaymentMethod::from_tender_tag(""), None);
    }

    #[test]
    fn test_line_kind_rules() {
        assert!(LineKind::Sale.is_revenue());
        assert!(LineKind::Return.is_revenue());
        assert!(!LineKind::Adjustment.is_revenue());
        assert!(!LineKind::Purchase.requires_operator());
        assert!(!LineKind::Charge.requires_operator());
        assert!(LineKind::TicketRedemption.requires_operator());
    }

    #[test]
    fn test_ticket_reimbursable() {
        let ticket = SupplierTicketRef {
            vendor_id: "v1".into(),
            vendor_name: Some("Ticket Resto".into()),
            face_value: Money::from_cents(900),
            commission_bps: 350,
        };
        assert_eq!(ticket.reimbursable().cents(), 868);
    }

    #[test]
    fn test_only_sales_are_critical() {
        let critical: Vec<_> = SourceKind::ALL.iter().filter(|s| s.is_critical()).collect();
        assert_eq!(critical, vec![&SourceKind::Sales]);
    }
}
