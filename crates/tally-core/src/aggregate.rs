//! # Aggregation Engine
//!
//! One fold over the normalized line items produces every aggregate view a
//! report needs.
//!
//! ## What Each Line Feeds
//! ```text
//! ┌──────────────────┬─────────┬──────────┬─────────┬──────────┬──────┬─────────┐
//! │ kind             │ product │ operator │ payment │ supplier │ cash │ summary │
//! ├──────────────────┼─────────┼──────────┼─────────┼──────────┼──────┼─────────┤
//! │ Sale             │   ✓     │    ✓     │   ✓     │          │ Cash │   ✓     │
//! │ Return (neg.)    │   ✓     │    ✓     │   ✓     │          │ Cash │   ✓     │
//! │ Purchase         │         │          │         │          │      │   ✓     │
//! │ Charge           │         │          │         │          │      │   ✓     │
//! │ TicketRedemption │         │          │         │   ✓      │      │         │
//! │ Adjustment       │         │          │         │          │ ±    │         │
//! └──────────────────┴─────────┴──────────┴─────────┴──────────┴──────┴─────────┘
//! ```
//!
//! A line feeding several buckets is not double counting: each bucket is a
//! different dimension over the same money.
//!
//! ## Sign Convention
//! Returns are already negative, so every total is a plain sum:
//!
//! ```text
//! net_result = gross_sales + total_returns - total_purchases
//!            - total_charges - total_discounts
//! ```
//!
//! ## Overflow
//! Every running total is accumulated with checked arithmetic. A total
//! leaving the `i64` cent range fails the fold with
//! [`ReportError::InvariantViolation`] instead of wrapping.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use ts_rs::TS;

use crate::error::{ReportError, ReportResult};
use crate::money::Money;
use crate::types::{LineItem, LineKind, OperatorId, PaymentMethod};

// =============================================================================
// Buckets
// =============================================================================

/// Totals for one key of one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct BucketEntry {
    /// First non-empty display name seen for the key.
    pub label: Option<String>,
    pub count: u32,
    /// Sum of gross amounts (face value for supplier tickets).
    pub gross_total: Money,
    /// Sum of tendered amounts (reimbursable amount for supplier tickets).
    pub net_total: Money,
}

/// A dimension key mapped to its totals. Keys are unique, iteration is sorted.
pub type Bucket<K> = BTreeMap<K, BucketEntry>;

fn credit<K: Ord>(
    bucket: &mut Bucket<K>,
    key: K,
    label: Option<&str>,
    gross: Money,
    net: Money,
    what: &str,
) -> ReportResult<()> {
    let entry = bucket.entry(key).or_default();
    bump(&mut entry.count, what)?;
    add_to(&mut entry.gross_total, gross, what)?;
    add_to(&mut entry.net_total, net, what)?;
    if entry.label.is_none() {
        entry.label = label
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string);
    }
    Ok(())
}

/// Sums one field over a bucket, or `None` if the sum overflows.
pub fn bucket_sum<K>(bucket: &Bucket<K>, field: impl Fn(&BucketEntry) -> Money) -> Option<Money> {
    Money::checked_sum(bucket.values().map(field))
}

fn overflow(what: &str) -> ReportError {
    ReportError::InvariantViolation(format!("{} overflows the money range", what))
}

fn add_to(total: &mut Money, amount: Money, what: &str) -> ReportResult<()> {
    *total = total.checked_add(amount).ok_or_else(|| overflow(what))?;
    Ok(())
}

fn sub_from(total: &mut Money, amount: Money, what: &str) -> ReportResult<()> {
    *total = total.checked_sub(amount).ok_or_else(|| overflow(what))?;
    Ok(())
}

fn bump(count: &mut u32, what: &str) -> ReportResult<()> {
    *count = count.checked_add(1).ok_or_else(|| {
        ReportError::InvariantViolation(format!("{} line count overflows", what))
    })?;
    Ok(())
}

// =============================================================================
// Cash Position
// =============================================================================

/// Expected physical cash in the drawer at the end of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct CashPosition {
    pub opening_float: Money,
    /// Tendered amount of Cash sale and return lines only.
    pub cash_sales_total: Money,
    pub cash_inflows: Money,
    /// Positive magnitude of drawer pay-outs.
    pub cash_outflows: Money,
    pub expected: Money,
}

impl CashPosition {
    pub fn new(
        opening_float: Money,
        cash_sales_total: Money,
        cash_inflows: Money,
        cash_outflows: Money,
    ) -> Self {
        CashPosition {
            opening_float,
            cash_sales_total,
            cash_inflows,
            cash_outflows,
            expected: opening_float + cash_sales_total - cash_outflows + cash_inflows,
        }
    }

    /// Same as [`CashPosition::new`], or `None` if `expected` overflows.
    pub fn checked(
        opening_float: Money,
        cash_sales_total: Money,
        cash_inflows: Money,
        cash_outflows: Money,
    ) -> Option<Self> {
        let expected = opening_float
            .checked_add(cash_sales_total)?
            .checked_sub(cash_outflows)?
            .checked_add(cash_inflows)?;
        Some(CashPosition {
            opening_float,
            cash_sales_total,
            cash_inflows,
            cash_outflows,
            expected,
        })
    }

    /// Counted minus expected. Positive means the drawer is over.
    ///
    /// ```rust
    /// use tally_core::{CashPosition, Money};
    ///
    /// let pos = CashPosition::new(
    ///     Money::from_cents(20_000),
    ///     Money::from_cents(8_000),
    ///     Money::zero(),
    ///     Money::zero(),
    /// );
    /// assert_eq!(pos.variance(Money::from_cents(27_950)).cents(), -50);
    /// ```
    pub fn variance(&self, counted: Money) -> Money {
        counted - self.expected
    }
}

/// The opening float could not be resolved; every other aggregate is still
/// valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cash position unavailable: {reason}")]
pub struct CashPositionUnavailable {
    pub reason: String,
}

// =============================================================================
// Revenue Summary
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct RevenueSummary {
    /// Pre-discount total of sale lines.
    pub gross_sales: Money,
    /// Sum of return lines (zero or negative).
    pub total_returns: Money,
    /// Tax collected on sales minus tax refunded on returns.
    pub total_tax: Money,
    pub total_discounts: Money,
    pub total_purchases: Money,
    pub total_charges: Money,
    pub net_result: Money,
    pub sales_count: u32,
    pub returns_count: u32,
}

impl RevenueSummary {
    /// Net result by plain addition over signed totals.
    pub fn compute_net(&self) -> Money {
        self.gross_sales + self.total_returns
            - self.total_purchases
            - self.total_charges
            - self.total_discounts
    }

    /// Same figure with returns treated as a positive deduction. Must always
    /// agree with [`RevenueSummary::compute_net`].
    pub fn net_by_subtraction(&self) -> Money {
        let returned = self.total_returns.abs();
        self.gross_sales
            - returned
            - self.total_purchases
            - self.total_charges
            - self.total_discounts
    }

    /// [`RevenueSummary::compute_net`], or `None` if it or
    /// [`RevenueSummary::net_by_subtraction`] would overflow.
    pub fn checked_net(&self) -> Option<Money> {
        self.total_returns.cents().checked_abs()?;
        self.gross_sales
            .checked_add(self.total_returns)?
            .checked_sub(self.total_purchases)?
            .checked_sub(self.total_charges)?
            .checked_sub(self.total_discounts)
    }

    /// Net revenue from sale and return lines, after discounts.
    pub fn net_revenue(&self) -> Money {
        self.gross_sales + self.total_returns - self.total_discounts
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Every view computed from one set of line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregates {
    pub product_totals: Bucket<String>,
    pub operator_totals: Bucket<OperatorId>,
    pub payment_totals: Bucket<PaymentMethod>,
    pub supplier_ticket_totals: Bucket<String>,
    pub cash_position: Result<CashPosition, CashPositionUnavailable>,
    pub revenue_summary: RevenueSummary,
    pub line_count: usize,
}

/// Folds line items into all aggregate views in a single pass.
///
/// `opening_float` is an explicit input; without it the cash position is
/// unavailable while every other view is still returned.
///
/// ## Errors
/// [`ReportError::InvariantViolation`] if any total overflows.
pub fn aggregate(items: &[LineItem], opening_float: Option<Money>) -> ReportResult<Aggregates> {
    let mut acc = Accumulator::default();
    for item in items {
        acc.add(item)?;
    }
    acc.finish(opening_float, items.len())
}

#[derive(Default)]
struct Accumulator {
    product_totals: Bucket<String>,
    operator_totals: Bucket<OperatorId>,
    payment_totals: Bucket<PaymentMethod>,
    supplier_ticket_totals: Bucket<String>,
    summary: RevenueSummary,
    cash_sales_total: Money,
    cash_inflows: Money,
    cash_outflows: Money,
}

impl Accumulator {
    fn add(&mut self, item: &LineItem) -> ReportResult<()> {
        let summary = &mut self.summary;
        match item.kind {
            LineKind::Sale => {
                add_to(&mut summary.gross_sales, item.gross_amount, "gross sales")?;
                add_to(&mut summary.total_tax, item.tax_amount, "total tax")?;
                add_to(&mut summary.total_discounts, item.discount_amount, "total discounts")?;
                bump(&mut summary.sales_count, "sales")?;
                self.add_revenue(item)?;
            }
            LineKind::Return => {
                add_to(&mut summary.total_returns, item.gross_amount, "total returns")?;
                sub_from(&mut summary.total_tax, item.tax_amount, "total tax")?;
                add_to(&mut summary.total_discounts, item.discount_amount, "total discounts")?;
                bump(&mut summary.returns_count, "returns")?;
                self.add_revenue(item)?;
            }
            LineKind::Purchase => {
                add_to(&mut summary.total_purchases, item.gross_amount, "total purchases")?
            }
            LineKind::Charge => {
                add_to(&mut summary.total_charges, item.gross_amount, "total charges")?
            }
            LineKind::TicketRedemption => {
                if let Some(ticket) = &item.supplier_ticket {
                    credit(
                        &mut self.supplier_ticket_totals,
                        ticket.vendor_id.clone(),
                        ticket.vendor_name.as_deref(),
                        ticket.face_value,
                        ticket.reimbursable(),
                        "supplier tickets",
                    )?;
                }
            }
            LineKind::Adjustment => {
                if item.gross_amount.is_negative() {
                    sub_from(&mut self.cash_outflows, item.gross_amount, "cash outflows")?;
                } else {
                    add_to(&mut self.cash_inflows, item.gross_amount, "cash inflows")?;
                }
            }
        }
        Ok(())
    }

    fn add_revenue(&mut self, item: &LineItem) -> ReportResult<()> {
        let gross = item.gross_amount;
        let net = item.tendered();

        if let Some(product) = &item.product {
            credit(
                &mut self.product_totals,
                product.id.clone(),
                product.name.as_deref(),
                gross,
                net,
                "product totals",
            )?;
        }
        if let Some(operator) = &item.operator_id {
            credit(
                &mut self.operator_totals,
                operator.clone(),
                item.operator_name.as_deref(),
                gross,
                net,
                "operator totals",
            )?;
        }
        if item.payment_method.is_tender() {
            let label = item.payment_method.to_string();
            credit(
                &mut self.payment_totals,
                item.payment_method,
                Some(&label),
                gross,
                net,
                "payment totals",
            )?;
        }
        if item.is_cash_revenue() {
            add_to(&mut self.cash_sales_total, net, "cash sales")?;
        }
        Ok(())
    }

    fn finish(self, opening_float: Option<Money>, line_count: usize) -> ReportResult<Aggregates> {
        let mut summary = self.summary;
        summary.net_result = summary.checked_net().ok_or_else(|| overflow("net result"))?;

        let cash_position = match opening_float {
            Some(float) => Ok(CashPosition::checked(
                float,
                self.cash_sales_total,
                self.cash_inflows,
                self.cash_outflows,
            )
            .ok_or_else(|| overflow("expected cash"))?),
            None => Err(CashPositionUnavailable {
                reason: "no opening float for this window".to_string(),
            }),
        };

        Ok(Aggregates {
            product_totals: self.product_totals,
            operator_totals: self.operator_totals,
            payment_totals: self.payment_totals,
            supplier_ticket_totals: self.supplier_ticket_totals,
            cash_position,
            revenue_summary: summary,
            line_count,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductRef, SupplierTicketRef};
    use chrono::{TimeZone, Utc};

    fn line(kind: LineKind, dollars: i64, method: PaymentMethod, product: Option<&str>) -> LineItem {
        LineItem {
            kind,
            source_id: format!("{:?}-{}", kind, dollars),
            operator_id: Some(OperatorId::new("op-1")),
            operator_name: Some("Alice".to_string()),
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
            gross_amount: Money::from_major_minor(dollars, 0),
            tax_amount: Money::zero(),
            discount_amount: Money::zero(),
            payment_method: method,
            product: product.map(|id| ProductRef {
                id: id.to_string(),
                name: Some(format!("Product {}", id)),
            }),
            supplier_ticket: None,
        }
    }

    fn sale(dollars: i64, method: PaymentMethod, product: &str) -> LineItem {
        line(LineKind::Sale, dollars, method, Some(product))
    }

    fn refund(dollars: i64, method: PaymentMethod, product: &str) -> LineItem {
        line(LineKind::Return, -dollars, method, Some(product))
    }

    fn cost(kind: LineKind, dollars: i64) -> LineItem {
        LineItem {
            operator_id: None,
            operator_name: None,
            ..line(kind, dollars, PaymentMethod::None, None)
        }
    }

    fn shift() -> Vec<LineItem> {
        vec![
            sale(100, PaymentMethod::Cash, "p-1"),
            sale(50, PaymentMethod::Card, "p-2"),
            sale(30, PaymentMethod::MealTicket, "p-3"),
            refund(20, PaymentMethod::Cash, "p-1"),
        ]
    }

    fn dollars(d: i64) -> Money {
        Money::from_major_minor(d, 0)
    }

    #[test]
    fn test_worked_shift() {
        let agg = aggregate(&shift(), Some(dollars(200))).unwrap();

        let cash = &agg.payment_totals[&PaymentMethod::Cash];
        assert_eq!(cash.count, 2);
        assert_eq!(cash.net_total, dollars(80));

        let card = &agg.payment_totals[&PaymentMethod::Card];
        assert_eq!(card.count, 1);
        assert_eq!(card.net_total, dollars(50));

        assert_eq!(agg.revenue_summary.net_result, dollars(160));
        assert_eq!(agg.cash_position.unwrap().expected, dollars(280));
    }

    #[test]
    fn test_all_cash_shift() {
        let items = vec![
            sale(100, PaymentMethod::Cash, "p-1"),
            sale(50, PaymentMethod::Card, "p-2"),
            sale(30, PaymentMethod::Cash, "p-3"),
            refund(20, PaymentMethod::Cash, "p-1"),
        ];
        let agg = aggregate(&items, Some(dollars(200))).unwrap();

        let cash = &agg.payment_totals[&PaymentMethod::Cash];
        assert_eq!(cash.count, 3);
        assert_eq!(cash.net_total, dollars(110));
        assert_eq!(agg.revenue_summary.net_result, dollars(160));
        assert_eq!(agg.cash_position.unwrap().expected, dollars(310));
    }

    #[test]
    fn test_sign_consistency() {
        let mut items = shift();
        items.push(refund(15, PaymentMethod::Card, "p-2"));
        items.push(cost(LineKind::Purchase, 40));
        items.push(cost(LineKind::Charge, 12));

        let summary = aggregate(&items, None).unwrap().revenue_summary;
        assert_eq!(summary.net_result, summary.net_by_subtraction());
        assert_eq!(summary.net_result, dollars(100 + 50 + 30 - 20 - 15 - 40 - 12));
        assert_eq!(summary.returns_count, 2);
        assert_eq!(summary.sales_count, 3);
    }

    #[test]
    fn test_bucket_completeness() {
        let mut items = shift();
        items.push(cost(LineKind::Purchase, 40));
        let agg = aggregate(&items, None).unwrap();

        let with_product: Money = items
            .iter()
            .filter(|i| i.product.is_some())
            .map(|i| i.gross_amount)
            .sum();
        assert_eq!(bucket_sum(&agg.product_totals, |e| e.gross_total), Some(with_product));
        assert_eq!(agg.product_totals[&"p-1".to_string()].gross_total, dollars(80));
        assert_eq!(agg.product_totals[&"p-1".to_string()].count, 2);
    }

    #[test]
    fn test_payment_exclusivity() {
        let mut items = shift();
        items.push(cost(LineKind::Purchase, 40));
        items.push(cost(LineKind::Charge, 12));
        let agg = aggregate(&items, None).unwrap();

        assert!(!agg.payment_totals.contains_key(&PaymentMethod::None));
        assert_eq!(agg.product_totals.len(), 3);
        let payment_count: u32 = agg.payment_totals.values().map(|e| e.count).sum();
        assert_eq!(payment_count, 4);
    }

    #[test]
    fn test_cash_isolation() {
        let cash_of = |items: &[LineItem], float: i64| {
            aggregate(items, Some(dollars(float)))
                .unwrap()
                .cash_position
                .unwrap()
        };
        let base = cash_of(&shift(), 200);

        let mut bumped = shift();
        bumped[1].gross_amount = dollars(5_000); // card sale
        bumped[2].gross_amount = dollars(999); // meal ticket sale
        assert_eq!(base, cash_of(&bumped, 200));

        let mut more_cash = shift();
        more_cash[0].gross_amount = dollars(101);
        assert_ne!(base.expected, cash_of(&more_cash, 200).expected);

        assert_ne!(base.expected, cash_of(&shift(), 150).expected);
    }

    #[test]
    fn test_discounts_reduce_net_and_cash() {
        let mut discounted = sale(100, PaymentMethod::Cash, "p-1");
        discounted.discount_amount = dollars(10);
        let agg = aggregate(&[discounted], Some(Money::zero())).unwrap();

        let entry = &agg.payment_totals[&PaymentMethod::Cash];
        assert_eq!(entry.gross_total, dollars(100));
        assert_eq!(entry.net_total, dollars(90));
        assert_eq!(agg.revenue_summary.total_discounts, dollars(10));
        assert_eq!(agg.revenue_summary.net_result, dollars(90));
        assert_eq!(agg.cash_position.unwrap().cash_sales_total, dollars(90));
    }

    #[test]
    fn test_drawer_movements_feed_cash_only() {
        let mut items = shift();
        items.push(line(LineKind::Adjustment, 50, PaymentMethod::Cash, None));
        items.push(line(LineKind::Adjustment, -35, PaymentMethod::Cash, None));
        let agg = aggregate(&items, Some(dollars(200))).unwrap();

        let cash = agg.cash_position.unwrap();
        assert_eq!(cash.cash_inflows, dollars(50));
        assert_eq!(cash.cash_outflows, dollars(35));
        assert_eq!(cash.expected, dollars(200 + 80 - 35 + 50));
        assert_eq!(agg.payment_totals[&PaymentMethod::Cash].count, 2);
        assert_eq!(agg.revenue_summary.net_result, dollars(160));
    }

    #[test]
    fn test_first_non_empty_label_wins() {
        let mut nameless = sale(10, PaymentMethod::Cash, "p-9");
        nameless.product.as_mut().unwrap().name = None;
        let mut named = sale(20, PaymentMethod::Cash, "p-9");
        named.product.as_mut().unwrap().name = Some("Old Name".into());
        let mut renamed = sale(30, PaymentMethod::Cash, "p-9");
        renamed.product.as_mut().unwrap().name = Some("New Name".into());

        let agg = aggregate(&[nameless, named, renamed], None).unwrap();
        let entry = &agg.product_totals[&"p-9".to_string()];
        assert_eq!(entry.label.as_deref(), Some("Old Name"));
        assert_eq!(entry.count, 3);
    }

    #[test]
    fn test_supplier_ticket_totals() {
        let ticket = |vendor: &str, face: i64| LineItem {
            supplier_ticket: Some(SupplierTicketRef {
                vendor_id: vendor.to_string(),
                vendor_name: Some(vendor.to_uppercase()),
                face_value: Money::from_cents(face),
                commission_bps: 400,
            }),
            gross_amount: Money::from_cents(face),
            ..line(LineKind::TicketRedemption, 0, PaymentMethod::MealTicket, None)
        };
        let tickets = [ticket("swile", 1000), ticket("swile", 800), ticket("edenred", 900)];
        let agg = aggregate(&tickets, None).unwrap();

        let swile = &agg.supplier_ticket_totals[&"swile".to_string()];
        assert_eq!(swile.count, 2);
        assert_eq!(swile.gross_total.cents(), 1800);
        assert_eq!(swile.net_total.cents(), 960 + 768);
        assert_eq!(swile.label.as_deref(), Some("SWILE"));
        assert!(agg.payment_totals.is_empty());
        assert_eq!(agg.revenue_summary.net_result, Money::zero());
    }

    #[test]
    fn test_missing_float_only_drops_cash() {
        let agg = aggregate(&shift(), None).unwrap();
        assert!(agg.cash_position.is_err());
        assert_eq!(agg.payment_totals.len(), 3);
        assert_eq!(agg.line_count, 4);
    }

    #[test]
    fn test_return_tax_is_deducted() {
        let mut s = sale(100, PaymentMethod::Card, "p-1");
        s.tax_amount = dollars(20);
        let mut r = refund(50, PaymentMethod::Card, "p-1");
        r.tax_amount = dollars(10);
        let summary = aggregate(&[s, r], None).unwrap().revenue_summary;
        assert_eq!(summary.total_tax, dollars(10));
    }

    #[test]
    fn test_overflowing_totals_fail_instead_of_wrapping() {
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        let mut first = sale(0, PaymentMethod::Cash, "p-1");
        first.gross_amount = huge;
        let mut second = sale(0, PaymentMethod::Card, "p-2");
        second.gross_amount = huge;

        let err = aggregate(&[first, second], None).unwrap_err();
        assert!(matches!(err, ReportError::InvariantViolation(ref msg) if msg.contains("overflows")));
    }

    #[test]
    fn test_expected_cash_overflow_is_an_error() {
        let items = vec![sale(100, PaymentMethod::Cash, "p-1")];
        let err = aggregate(&items, Some(Money::from_cents(i64::MAX))).unwrap_err();
        assert_eq!(
            err,
            ReportError::InvariantViolation("expected cash overflows the money range".to_string())
        );

        // Without a float the same lines still aggregate.
        assert!(aggregate(&items, None).is_ok());
    }
}
