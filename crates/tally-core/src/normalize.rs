//! # Ledger Normalizer
//!
//! Converts every source's record shape into [`LineItem`]s.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RawSnapshot                                                            │
//! │   ├── sales ──────────► sale_line() ─────────┐                          │
//! │   ├── returns ────────► return_line() ───────┤   (amount negated)       │
//! │   ├── purchases ──────► purchase_line() ─────┤                          │
//! │   ├── charges ────────► charge_line() ───────┼──► Normalized.items      │
//! │   ├── tickets ────────► ticket_line() ───────┤                          │
//! │   └── cash movements ─► cash_movement_line() ┘                          │
//! │                                  │                                      │
//! │                                  └── Err ──► Normalized.diagnostics     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mapping is a pure function of its record, the window and the
//! catalog. A bad record becomes a `MalformedRecord` diagnostic and the
//! rest of the snapshot is still processed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::Diagnostic;
use crate::money::Money;
use crate::records::{
    CashMovementRecord, CatalogEntry, ChargeRecord, PurchaseRecord, RawSnapshot, ReturnRecord,
    SaleRecord, TicketRedemptionRecord,
};
use crate::types::{
    LineItem, LineKind, OperatorId, PaymentMethod, ProductRef, SourceKind, SupplierTicketRef,
    Window,
};
use crate::MAX_RECORD_AMOUNT_CENTS;

/// Output of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub items: Vec<LineItem>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Catalog names by product id, used to fill in names a record lacks.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    names: HashMap<String, String>,
}

impl Catalog {
    /// Builds the lookup; the first non-empty name for an id wins.
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut names = HashMap::with_capacity(entries.len());
        for entry in entries {
            if let Some(name) = non_empty(Some(&entry.name)) {
                names.entry(entry.product_id.clone()).or_insert(name);
            }
        }
        Catalog { names }
    }

    pub fn name(&self, product_id: &str) -> Option<&str> {
        self.names.get(product_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Normalizes a whole snapshot.
///
/// Sources are emitted in a fixed order (sales, returns, purchases, charges,
/// tickets, cash movements), records in the order the gateway returned them.
pub fn normalize(snapshot: &RawSnapshot, window: &Window) -> Normalized {
    let catalog = Catalog::from_entries(&snapshot.catalog);
    let mut out = Normalized {
        items: Vec::with_capacity(snapshot.record_count()),
        diagnostics: Vec::new(),
    };

    for record in &snapshot.sales {
        out.push(sale_line(record, window, &catalog));
    }
    for record in &snapshot.returns {
        out.push(return_line(record, window, &catalog));
    }
    for record in &snapshot.purchases {
        out.push(purchase_line(record, window));
    }
    for record in &snapshot.charges {
        out.push(charge_line(record, window));
    }
    for record in &snapshot.ticket_redemptions {
        out.push(ticket_line(record, window));
    }
    for record in &snapshot.cash_movements {
        out.push(cash_movement_line(record, window));
    }

    out
}

impl Normalized {
    fn push(&mut self, result: Result<LineItem, Diagnostic>) {
        match result {
            Ok(item) => self.items.push(item),
            Err(diag) => self.diagnostics.push(diag),
        }
    }
}

// =============================================================================
// Per-Source Mappings
// =============================================================================

/// Maps a sale. Gross is the pre-discount amount.
pub fn sale_line(
    record: &SaleRecord,
    window: &Window,
    catalog: &Catalog,
) -> Result<LineItem, Diagnostic> {
    let check = Check::new(SourceKind::Sales, &record.id);

    let occurred_at = check.timestamp(record.occurred_at, window)?;
    let amount = check.amount("amount", record.amount_cents)?;
    let tax = check.optional_amount("tax", record.tax_cents)?;
    let discount = check.optional_amount("discount", record.discount_cents)?;
    if discount > amount {
        return Err(check.fail(format!(
            "discount {} exceeds amount {}",
            discount, amount
        )));
    }
    let operator_id = check.operator(record.operator_id.as_deref())?;
    let payment_method = check.tender(record.payment_method.as_deref())?;
    let product = check.product(
        record.product_id.as_deref(),
        record.product_name.as_ref(),
        catalog,
    )?;

    Ok(LineItem {
        kind: LineKind::Sale,
        source_id: record.id.clone(),
        operator_id: Some(operator_id),
        operator_name: non_empty(record.operator_name.as_ref()),
        occurred_at,
        gross_amount: amount,
        tax_amount: tax,
        discount_amount: discount,
        payment_method,
        product: Some(product),
        supplier_ticket: None,
    })
}

/// Maps a refund. The positive source magnitude becomes a negative gross.
pub fn return_line(
    record: &ReturnRecord,
    window: &Window,
    catalog: &Catalog,
) -> Result<LineItem, Diagnostic> {
    let check = Check::new(SourceKind::Returns, &record.id);

    let occurred_at = check.timestamp(record.occurred_at, window)?;
    let amount = check.amount("amount", record.amount_cents)?;
    let tax = check.optional_amount("tax", record.tax_cents)?;
    let operator_id = check.operator(record.operator_id.as_deref())?;
    let payment_method = check.tender(record.payment_method.as_deref())?;
    let product = check.product(
        record.product_id.as_deref(),
        record.product_name.as_ref(),
        catalog,
    )?;

    Ok(LineItem {
        kind: LineKind::Return,
        source_id: record.id.clone(),
        operator_id: Some(operator_id),
        operator_name: non_empty(record.operator_name.as_ref()),
        occurred_at,
        gross_amount: -amount,
        tax_amount: tax,
        discount_amount: Money::zero(),
        payment_method,
        product: Some(product),
        supplier_ticket: None,
    })
}

pub fn purchase_line(record: &PurchaseRecord, window: &Window) -> Result<LineItem, Diagnostic> {
    let check = Check::new(SourceKind::Purchases, &record.id);

    Ok(LineItem {
        kind: LineKind::Purchase,
        source_id: record.id.clone(),
        occurred_at: check.timestamp(record.occurred_at, window)?,
        gross_amount: check.amount("amount", record.amount_cents)?,
        tax_amount: check.optional_amount("tax", record.tax_cents)?,
        operator_id: check.optional_operator(record.operator_id.as_deref())?,
        operator_name: None,
        discount_amount: Money::zero(),
        payment_method: PaymentMethod::None,
        product: None,
        supplier_ticket: None,
    })
}

pub fn charge_line(record: &ChargeRecord, window: &Window) -> Result<LineItem, Diagnostic> {
    let check = Check::new(SourceKind::Charges, &record.id);

    Ok(LineItem {
        kind: LineKind::Charge,
        source_id: record.id.clone(),
        occurred_at: check.timestamp(record.occurred_at, window)?,
        gross_amount: check.amount("amount", record.amount_cents)?,
        tax_amount: check.optional_amount("tax", record.tax_cents)?,
        operator_id: check.optional_operator(record.operator_id.as_deref())?,
        operator_name: None,
        discount_amount: Money::zero(),
        payment_method: PaymentMethod::None,
        product: None,
        supplier_ticket: None,
    })
}

/// Maps a meal-voucher redemption. Gross is the voucher's face value.
pub fn ticket_line(
    record: &TicketRedemptionRecord,
    window: &Window,
) -> Result<LineItem, Diagnostic> {
    let check = Check::new(SourceKind::TicketRedemptions, &record.id);

    let occurred_at = check.timestamp(record.occurred_at, window)?;
    let face_value = check.amount("face value", record.face_value_cents)?;
    let operator_id = check.operator(record.operator_id.as_deref())?;
    let vendor_id = non_empty(record.vendor_id.as_ref())
        .ok_or_else(|| check.fail("missing vendor id"))?;
    let commission_bps = record.commission_bps.unwrap_or(0);
    if commission_bps > 10_000 {
        return Err(check.fail(format!("commission {} bps exceeds 100%", commission_bps)));
    }

    Ok(LineItem {
        kind: LineKind::TicketRedemption,
        source_id: record.id.clone(),
        operator_id: Some(operator_id),
        operator_name: non_empty(record.operator_name.as_ref()),
        occurred_at,
        gross_amount: face_value,
        tax_amount: Money::zero(),
        discount_amount: Money::zero(),
        payment_method: PaymentMethod::MealTicket,
        product: None,
        supplier_ticket: Some(SupplierTicketRef {
            vendor_id,
            vendor_name: non_empty(record.vendor_name.as_ref()),
            face_value,
            commission_bps,
        }),
    })
}

/// Maps a drawer pay-in (positive) or pay-out (negative).
pub fn cash_movement_line(
    record: &CashMovementRecord,
    window: &Window,
) -> Result<LineItem, Diagnostic> {
    let check = Check::new(SourceKind::CashMovements, &record.id);

    let occurred_at = check.timestamp(record.occurred_at, window)?;
    let amount = check.amount("amount", record.amount_cents)?;
    let operator_id = check.operator(record.operator_id.as_deref())?;
    let signed = match record.direction.as_deref().map(str::trim) {
        Some(d) if d.eq_ignore_ascii_case("in") => amount,
        Some(d) if d.eq_ignore_ascii_case("out") => -amount,
        Some(other) => return Err(check.fail(format!("unknown direction '{}'", other))),
        None => return Err(check.fail("missing direction")),
    };

    Ok(LineItem {
        kind: LineKind::Adjustment,
        source_id: record.id.clone(),
        operator_id: Some(operator_id),
        operator_name: non_empty(record.operator_name.as_ref()),
        occurred_at,
        gross_amount: signed,
        tax_amount: Money::zero(),
        discount_amount: Money::zero(),
        payment_method: PaymentMethod::Cash,
        product: None,
        supplier_ticket: None,
    })
}

// =============================================================================
// Field Checks
// =============================================================================

/// Field checks bound to one record, so every failure names its record.
struct Check<'a> {
    source: SourceKind,
    record_id: &'a str,
}

impl<'a> Check<'a> {
    fn new(source: SourceKind, record_id: &'a str) -> Self {
        Check { source, record_id }
    }

    fn fail(&self, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::malformed(self.source, self.record_id, reason)
    }

    fn timestamp(
        &self,
        at: Option<DateTime<Utc>>,
        window: &Window,
    ) -> Result<DateTime<Utc>, Diagnostic> {
        let at = at.ok_or_else(|| self.fail("missing timestamp"))?;
        if !window.contains(at) {
            return Err(self.fail(format!(
                "timestamp {} outside window {}",
                at.to_rfc3339(),
                window
            )));
        }
        Ok(at)
    }

    fn amount(&self, field: &str, cents: Option<i64>) -> Result<Money, Diagnostic> {
        let cents = cents.ok_or_else(|| self.fail(format!("missing {}", field)))?;
        if cents < 0 {
            return Err(self.fail(format!("negative {}: {}", field, cents)));
        }
        if cents > MAX_RECORD_AMOUNT_CENTS {
            return Err(self.fail(format!(
                "{} {} exceeds limit {}",
                field, cents, MAX_RECORD_AMOUNT_CENTS
            )));
        }
        Ok(Money::from_cents(cents))
    }

    /// Missing means zero; negative is still malformed.
    fn optional_amount(&self, field: &str, cents: Option<i64>) -> Result<Money, Diagnostic> {
        self.amount(field, Some(cents.unwrap_or(0)))
    }

    fn operator(&self, id: Option<&str>) -> Result<OperatorId, Diagnostic> {
        self.optional_operator(id)?
            .ok_or_else(|| self.fail("missing operator"))
    }

    fn optional_operator(&self, id: Option<&str>) -> Result<Option<OperatorId>, Diagnostic> {
        match id.map(str::trim) {
            None | Some("") => Ok(None),
            Some(id) => Ok(Some(OperatorId::new(id))),
        }
    }

    fn tender(&self, tag: Option<&str>) -> Result<PaymentMethod, Diagnostic> {
        let tag = tag.ok_or_else(|| self.fail("missing payment method"))?;
        PaymentMethod::from_tender_tag(tag)
            .ok_or_else(|| self.fail(format!("unknown payment method '{}'", tag)))
    }

    /// Record snapshot name first, then the catalog, else no name.
    fn product(
        &self,
        id: Option<&str>,
        name: Option<&String>,
        catalog: &Catalog,
    ) -> Result<ProductRef, Diagnostic> {
        let id = match id.map(str::trim) {
            None | Some("") => return Err(self.fail("missing product id")),
            Some(id) => id,
        };
        let name = non_empty(name).or_else(|| catalog.name(id).map(str::to_string));
        Ok(ProductRef {
            id: id.to_string(),
            name,
        })
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================
