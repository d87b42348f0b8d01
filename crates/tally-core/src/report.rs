//! # Report Assembler
//!
//! Turns computed aggregates plus identity metadata into one immutable
//! [`Report`].
//!
//! ## Assembly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Aggregates ──────┐                                                     │
//! │                   │                                                     │
//! │  ReportContext ───┼──► verify() ──► mark sections ──► Report            │
//! │   ├── window      │       │              │                              │
//! │   ├── filter      │       │              └── Unavailable { missing }    │
//! │   ├── identity    │       │                  when a source it depends   │
//! │   ├── missing     │       │                  on failed                  │
//! │   └── diagnostics │       └── InvariantViolation (fatal)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Section Dependencies
//! | section                  | depends on                                  |
//! |--------------------------|---------------------------------------------|
//! | product/operator/payment | Sales, Returns                              |
//! | supplier tickets         | TicketRedemptions                           |
//! | revenue summary          | Sales, Returns, Purchases, Charges          |
//! | cash position            | Sales, Returns, CashMovements, OpeningFloat |
//!
//! Assembly never recomputes a figure and never performs I/O. The only
//! process-wide state is the report number sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use ts_rs::TS;

use crate::aggregate::{bucket_sum, Aggregates, Bucket, CashPosition, RevenueSummary};
use crate::error::{Diagnostic, ReportError, ReportResult};
use crate::types::{OperatorFilter, OperatorId, OperatorIdentity, PaymentMethod, SourceKind, Window};

// =============================================================================
// Report Identity
// =============================================================================

/// Millisecond timestamp of the last issued report number.
static LAST_ISSUED_MS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Human-displayable report number, e.g. `Z20261017-143012-457`.
///
/// ## Uniqueness
/// Numbers are derived from the issue time in milliseconds. Two numbers
/// issued in the same millisecond are pushed apart by bumping the later one
/// a millisecond forward, so within a process every number is unique and
/// strictly increasing even when the clock stalls or steps backwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportNumber(String);

impl ReportNumber {
    /// Issues the next number for a report generated at `now`.
    pub fn issue(now: DateTime<Utc>) -> Self {
        let now_ms = now.timestamp_millis();
        let mut last = LAST_ISSUED_MS.load(Ordering::Relaxed);
        let issued_ms = loop {
            let next = now_ms.max(last.saturating_add(1));
            match LAST_ISSUED_MS.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break next,
                Err(actual) => last = actual,
            }
        };

        let stamp = DateTime::<Utc>::from_timestamp_millis(issued_ms).unwrap_or(now);
        ReportNumber(stamp.format("Z%Y%m%d-%H%M%S-%3f").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who generated a report, when, and under which number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportIdentity {
    pub number: ReportNumber,
    pub generated_at: DateTime<Utc>,
    pub generated_by: OperatorIdentity,
}

impl ReportIdentity {
    /// Stamps a fresh identity at `now`.
    pub fn issue(now: DateTime<Utc>, generated_by: OperatorIdentity) -> Self {
        ReportIdentity {
            number: ReportNumber::issue(now),
            generated_at: now,
            generated_by,
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// One aggregate view of a report, or the sources that kept it from being
/// computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Complete { data: T },
    Unavailable { missing: Vec<SourceKind> },
}

impl<T> Section<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Section::Complete { .. })
    }

    pub fn as_complete(&self) -> Option<&T> {
        match self {
            Section::Complete { data } => Some(data),
            Section::Unavailable { .. } => None,
        }
    }

    /// Sources this section is missing; empty when complete.
    pub fn missing(&self) -> &[SourceKind] {
        match self {
            Section::Complete { .. } => &[],
            Section::Unavailable { missing } => missing,
        }
    }
}

/// The aggregate views a report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    ProductTotals,
    OperatorTotals,
    PaymentTotals,
    SupplierTicketTotals,
    RevenueSummary,
    CashPosition,
}

impl SectionKind {
    /// Sources a section is computed from.
    pub fn dependencies(&self) -> &'static [SourceKind] {
        use SourceKind::*;
        match self {
            SectionKind::ProductTotals
            | SectionKind::OperatorTotals
            | SectionKind::PaymentTotals => &[Sales, Returns],
            SectionKind::SupplierTicketTotals => &[TicketRedemptions],
            SectionKind::RevenueSummary => &[Sales, Returns, Purchases, Charges],
            SectionKind::CashPosition => &[Sales, Returns, CashMovements, OpeningFloat],
        }
    }

    fn section<T>(&self, data: T, missing: &BTreeSet<SourceKind>) -> Section<T> {
        let absent: Vec<SourceKind> = self
            .dependencies()
            .iter()
            .filter(|source| missing.contains(*source))
            .copied()
            .collect();
        if absent.is_empty() {
            Section::Complete { data }
        } else {
            Section::Unavailable { missing: absent }
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// A point-in-time statement of one window's activity.
///
/// Fields are private: once assembled a report cannot be changed, only read
/// or serialized for the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Report {
    report_number: ReportNumber,
    window: Window,
    operator_filter: OperatorFilter,
    #[ts(as = "String")]
    generated_at: DateTime<Utc>,
    generated_by: OperatorIdentity,
    product_totals: Section<Bucket<String>>,
    operator_totals: Section<Bucket<OperatorId>>,
    payment_totals: Section<Bucket<PaymentMethod>>,
    supplier_ticket_totals: Section<Bucket<String>>,
    cash_position: Section<CashPosition>,
    revenue_summary: Section<RevenueSummary>,
    line_count: u32,
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn report_number(&self) -> &ReportNumber {
        &self.report_number
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn operator_filter(&self) -> &OperatorFilter {
        &self.operator_filter
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn generated_by(&self) -> &OperatorIdentity {
        &self.generated_by
    }

    pub fn product_totals(&self) -> &Section<Bucket<String>> {
        &self.product_totals
    }

    pub fn operator_totals(&self) -> &Section<Bucket<OperatorId>> {
        &self.operator_totals
    }

    pub fn payment_totals(&self) -> &Section<Bucket<PaymentMethod>> {
        &self.payment_totals
    }

    pub fn supplier_ticket_totals(&self) -> &Section<Bucket<String>> {
        &self.supplier_ticket_totals
    }

    pub fn cash_position(&self) -> &Section<CashPosition> {
        &self.cash_position
    }

    pub fn revenue_summary(&self) -> &Section<RevenueSummary> {
        &self.revenue_summary
    }

    /// Number of line items the aggregates were computed from.
    pub fn line_count(&self) -> u32 {
        self.line_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True when any record was skipped or any section is unavailable.
    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Everything besides the aggregates that goes into a report.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub window: Window,
    pub operator_filter: OperatorFilter,
    pub identity: ReportIdentity,
    /// Sources that failed or timed out for this request.
    pub missing_sources: BTreeSet<SourceKind>,
    /// Diagnostics accumulated so far (skipped records, degraded sources).
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the report.
///
/// ## Errors
/// `ReportError::InvariantViolation` if the aggregates contradict each
/// other. That is a defect upstream and is never papered over.
pub fn assemble(aggregates: Aggregates, context: ReportContext) -> ReportResult<Report> {
    verify(&aggregates)?;

    let ReportContext {
        window,
        operator_filter,
        identity,
        missing_sources,
        mut diagnostics,
    } = context;

    let (cash_position, cash_reason) = match aggregates.cash_position {
        Ok(cash) => (SectionKind::CashPosition.section(cash, &missing_sources), None),
        Err(unavailable) => {
            let mut missing = SectionKind::CashPosition
                .section((), &missing_sources)
                .missing()
                .to_vec();
            if !missing.contains(&SourceKind::OpeningFloat) {
                missing.push(SourceKind::OpeningFloat);
            }
            (Section::Unavailable { missing }, Some(unavailable.reason))
        }
    };
    if let Section::Unavailable { missing } = &cash_position {
        let already_reported = diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CashPositionUnavailable { .. }));
        if !already_reported {
            let reason = cash_reason.unwrap_or_else(|| {
                let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
                format!("missing {}", names.join(", "))
            });
            diagnostics.push(Diagnostic::CashPositionUnavailable { reason });
        }
    }

    let line_count = u32::try_from(aggregates.line_count).map_err(|_| {
        ReportError::InvariantViolation(format!(
            "line count {} does not fit a report",
            aggregates.line_count
        ))
    })?;

    Ok(Report {
        report_number: identity.number,
        window,
        operator_filter,
        generated_at: identity.generated_at,
        generated_by: identity.generated_by,
        product_totals: SectionKind::ProductTotals
            .section(aggregates.product_totals, &missing_sources),
        operator_totals: SectionKind::OperatorTotals
            .section(aggregates.operator_totals, &missing_sources),
        payment_totals: SectionKind::PaymentTotals
            .section(aggregates.payment_totals, &missing_sources),
        supplier_ticket_totals: SectionKind::SupplierTicketTotals
            .section(aggregates.supplier_ticket_totals, &missing_sources),
        cash_position,
        revenue_summary: SectionKind::RevenueSummary
            .section(aggregates.revenue_summary, &missing_sources),
        line_count,
        diagnostics,
    })
}

// ===== Invariant checks =====

fn verify(aggregates: &Aggregates) -> ReportResult<()> {
    let summary = &aggregates.revenue_summary;

    let net = summary.checked_net().ok_or_else(|| out_of_range("net result"))?;
    ensure(summary.net_result == net, "net result", summary.net_result, net)?;
    ensure(
        net == summary.net_by_subtraction(),
        "net result by subtraction",
        net,
        summary.net_by_subtraction(),
    )?;

    let revenue_gross = summary
        .gross_sales
        .checked_add(summary.total_returns)
        .ok_or_else(|| out_of_range("revenue gross"))?;
    let product_gross = bucket_sum(&aggregates.product_totals, |e| e.gross_total)
        .ok_or_else(|| out_of_range("product totals"))?;
    ensure(
        product_gross == revenue_gross,
        "product totals",
        product_gross,
        revenue_gross,
    )?;
    let operator_gross = bucket_sum(&aggregates.operator_totals, |e| e.gross_total)
        .ok_or_else(|| out_of_range("operator totals"))?;
    ensure(
        operator_gross == revenue_gross,
        "operator totals",
        operator_gross,
        revenue_gross,
    )?;
    let payment_net = bucket_sum(&aggregates.payment_totals, |e| e.net_total)
        .ok_or_else(|| out_of_range("payment totals"))?;
    ensure(
        payment_net == summary.net_revenue(),
        "payment totals",
        payment_net,
        summary.net_revenue(),
    )?;

    let payment_lines: u64 = aggregates
        .payment_totals
        .values()
        .map(|e| u64::from(e.count))
        .sum();
    let revenue_lines = u64::from(summary.sales_count) + u64::from(summary.returns_count);
    if payment_lines != revenue_lines {
        return Err(ReportError::InvariantViolation(format!(
            "payment totals cover {} lines, revenue summary has {}",
            payment_lines, revenue_lines
        )));
    }

    if let Ok(cash) = &aggregates.cash_position {
        let recomputed = CashPosition::checked(
            cash.opening_float,
            cash.cash_sales_total,
            cash.cash_inflows,
            cash.cash_outflows,
        )
        .ok_or_else(|| out_of_range("expected cash"))?;
        ensure(
            cash.expected == recomputed.expected,
            "cash position",
            cash.expected,
            recomputed.expected,
        )?;
    }

    Ok(())
}

fn out_of_range(what: &str) -> ReportError {
    ReportError::InvariantViolation(format!("{} overflows the money range", what))
}

fn ensure(
    holds: bool,
    what: &str,
    found: impl fmt::Display,
    expected: impl fmt::Display,
) -> ReportResult<()> {
    if holds {
        Ok(())
    } else {
        Err(ReportError::InvariantViolation(format!(
            "{} is {}, expected {}",
            what, found, expected
        )))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, BucketEntry};
    use crate::money::Money;
    use crate::types::{LineItem, LineKind, ProductRef};
    use chrono::{Duration, TimeZone};

    fn window() -> Window {
        let start = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        Window::new(start, start + Duration::days(1)).unwrap()
    }

    fn manager() -> OperatorIdentity {
        OperatorIdentity {
            id: OperatorId::new("mgr-1"),
            display_name: "Dana".to_string(),
        }
    }

    fn context(missing: &[SourceKind]) -> ReportContext {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 9, 30, 0).unwrap();
        ReportContext {
            window: window(),
            operator_filter: OperatorFilter::Specific(OperatorId::new("op-1")),
            identity: ReportIdentity::issue(now, manager()),
            missing_sources: missing.iter().copied().collect(),
            diagnostics: Vec::new(),
        }
    }

    fn sale(cents: i64, method: PaymentMethod) -> LineItem {
        LineItem {
            kind: LineKind::Sale,
            source_id: format!("s-{}", cents),
            operator_id: Some(OperatorId::new("op-1")),
            operator_name: None,
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
            gross_amount: Money::from_cents(cents),
            tax_amount: Money::zero(),
            discount_amount: Money::zero(),
            payment_method: method,
            product: Some(ProductRef {
                id: "p-1".into(),
                name: None,
            }),
            supplier_ticket: None,
        }
    }

    #[test]
    fn test_report_numbers_are_unique_and_increasing() {
        let frozen = Utc.with_ymd_and_hms(2026, 10, 17, 14, 30, 12).unwrap();
        let numbers: Vec<ReportNumber> = (0..50).map(|_| ReportNumber::issue(frozen)).collect();
        for pair in numbers.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert!(numbers[0].as_str().starts_with('Z'));
        assert_eq!(numbers[0].as_str().len(), "Z20261017-143012-457".len());
    }

    #[test]
    fn test_complete_report() {
        let items = vec![sale(10_000, PaymentMethod::Cash), sale(5_000, PaymentMethod::Card)];
        let report = assemble(
            aggregate(&items, Some(Money::from_cents(20_000))).unwrap(),
            context(&[]),
        )
        .unwrap();

        assert!(report.product_totals().is_complete());
        assert!(report.cash_position().is_complete());
        assert_eq!(
            report.cash_position().as_complete().unwrap().expected.cents(),
            30_000
        );
        assert_eq!(report.line_count(), 2);
        assert!(!report.has_warnings());
        assert_ne!(report.generated_at(), report.window().end());
        assert_eq!(report.generated_by().display_name, "Dana");
    }

    #[test]
    fn test_failed_source_marks_dependent_sections() {
        let items = vec![sale(10_000, PaymentMethod::Cash)];
        let report = assemble(
            aggregate(&items, Some(Money::zero())).unwrap(),
            context(&[SourceKind::TicketRedemptions, SourceKind::Purchases]),
        )
        .unwrap();

        assert_eq!(
            report.supplier_ticket_totals().missing(),
            &[SourceKind::TicketRedemptions]
        );
        assert_eq!(report.revenue_summary().missing(), &[SourceKind::Purchases]);
        assert!(report.product_totals().is_complete());
        assert!(report.payment_totals().is_complete());
        assert!(report.cash_position().is_complete());
    }

    #[test]
    fn test_missing_float_reports_cash_unavailable() {
        let items = vec![sale(10_000, PaymentMethod::Cash)];
        let report = assemble(aggregate(&items, None).unwrap(), context(&[])).unwrap();

        assert_eq!(report.cash_position().missing(), &[SourceKind::OpeningFloat]);
        assert!(report.payment_totals().is_complete());
        assert_eq!(report.diagnostics().len(), 1);
        assert!(matches!(
            report.diagnostics()[0],
            Diagnostic::CashPositionUnavailable { .. }
        ));
    }

    #[test]
    fn test_tampered_aggregates_are_rejected() {
        let items = vec![sale(10_000, PaymentMethod::Cash)];
        let mut agg = aggregate(&items, None).unwrap();
        agg.revenue_summary.gross_sales = Money::from_cents(9_999);

        let err = assemble(agg, context(&[])).unwrap_err();
        assert!(matches!(err, ReportError::InvariantViolation(_)));
    }

    #[test]
    fn test_overflowing_bucket_is_rejected_not_wrapped() {
        let items = vec![sale(10_000, PaymentMethod::Cash)];
        let mut agg = aggregate(&items, None).unwrap();
        agg.product_totals.insert(
            "p-forged".to_string(),
            BucketEntry {
                gross_total: Money::from_cents(i64::MAX),
                ..Default::default()
            },
        );

        let err = assemble(agg, context(&[])).unwrap_err();
        assert_eq!(
            err,
            ReportError::InvariantViolation("product totals overflows the money range".into())
        );
    }

    #[test]
    fn test_untendered_sale_is_a_defect() {
        let items = vec![sale(10_000, PaymentMethod::None)];
        let err = assemble(aggregate(&items, None).unwrap(), context(&[])).unwrap_err();
        assert!(err.to_string().contains("payment totals"));
    }

    #[test]
    fn test_report_serializes_sections_with_status() {
        let items = vec![sale(10_000, PaymentMethod::Cash)];
        let report = assemble(aggregate(&items, None).unwrap(), context(&[])).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["payment_totals"]["status"], "complete");
        assert_eq!(json["payment_totals"]["data"]["cash"]["net_total"], 10_000);
        assert_eq!(json["cash_position"]["status"], "unavailable");
        assert_eq!(json["cash_position"]["missing"][0], "opening_float");
        assert_eq!(json["operator_filter"]["scope"], "specific");
    }
}
