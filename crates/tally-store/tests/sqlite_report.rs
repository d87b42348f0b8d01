//! Reports generated straight from a seeded SQLite store.

use chrono::NaiveDate;
use std::sync::Arc;

use tally_core::{Diagnostic, Money, OperatorFilter, OperatorId, PaymentMethod, Report};
use tally_engine::{
    CancellationToken, EngineConfig, EngineError, Gateways, ReportEngine, ReportRequest,
};
use tally_store::demo::{seed_shift, DemoShift};
use tally_store::{Database, DbConfig, DrawerSession, SqliteGateways};

async fn seeded() -> (Database, DemoShift) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let shift = seed_shift(&db, date).await.unwrap();
    (db, shift)
}

async fn run(
    db: &Database,
    shift: &DemoShift,
    signed_in: &str,
    filter: OperatorFilter,
) -> Result<Report, EngineError> {
    let gateways = SqliteGateways::new(db.clone(), OperatorId::new(signed_in));
    let engine = ReportEngine::new(
        Gateways::from_single(Arc::new(gateways)),
        EngineConfig::default(),
    );
    let request = ReportRequest {
        window: shift.window,
        operator_filter: filter,
    };
    engine.generate(&request, &CancellationToken::new()).await
}

fn alice() -> OperatorFilter {
    OperatorFilter::Specific(OperatorId::new("op-1"))
}

#[tokio::test]
async fn test_cashier_shift_reconciles() {
    let (db, shift) = seeded().await;
    let report = run(&db, &shift, "op-1", alice()).await.unwrap();

    let payments = report.payment_totals().as_complete().unwrap();
    let cash = &payments[&PaymentMethod::Cash];
    assert_eq!((cash.count, cash.net_total), (2, Money::from_cents(8_000)));
    let card = &payments[&PaymentMethod::Card];
    assert_eq!((card.count, card.net_total), (1, Money::from_cents(5_000)));

    let cash_position = report.cash_position().as_complete().unwrap();
    assert_eq!(cash_position.opening_float, Money::from_cents(20_000));
    assert_eq!(cash_position.expected, Money::from_cents(28_000));

    let products = report.product_totals().as_complete().unwrap();
    assert_eq!(
        products["p-beans"].label.as_deref(),
        Some("Espresso Beans 250g")
    );

    let operators = report.operator_totals().as_complete().unwrap();
    assert_eq!(operators.len(), 1);
    assert_eq!(
        operators[&OperatorId::new("op-1")].label.as_deref(),
        Some("Alice")
    );

    assert!(report.diagnostics().is_empty());
    assert_eq!(report.generated_by().display_name, "Alice");
}

#[tokio::test]
async fn test_manager_sees_whole_store() {
    let (db, shift) = seeded().await;
    let report = run(&db, &shift, "mgr-1", OperatorFilter::All).await.unwrap();

    let payments = report.payment_totals().as_complete().unwrap();
    let cash = &payments[&PaymentMethod::Cash];
    assert_eq!((cash.count, cash.net_total), (4, Money::from_cents(8_830)));
    let card = &payments[&PaymentMethod::Card];
    assert_eq!((card.count, card.net_total), (2, Money::from_cents(9_250)));

    let summary = report.revenue_summary().as_complete().unwrap();
    assert_eq!(summary.total_purchases, Money::from_cents(12_000));
    assert_eq!(summary.total_charges, Money::from_cents(4_500));

    // No single drawer covers every operator.
    assert!(!report.cash_position().is_complete());
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::CashPositionUnavailable { .. }]
    ));
}

#[tokio::test]
async fn test_payout_reduces_expected_cash() {
    let (db, shift) = seeded().await;
    let bruno = OperatorFilter::Specific(OperatorId::new("op-2"));
    let report = run(&db, &shift, "mgr-1", bruno).await.unwrap();

    let cash = report.cash_position().as_complete().unwrap();
    assert_eq!(cash.cash_outflows, Money::from_cents(1_500));
    // 150.00 float + 4.50 + 3.80 cash sales - 15.00 payout
    assert_eq!(cash.expected, Money::from_cents(15_000 + 830 - 1_500));
}

#[tokio::test]
async fn test_reopened_drawer_leaves_cash_unavailable() {
    let (db, shift) = seeded().await;
    db.drawer()
        .open_session(&DrawerSession {
            id: "drawer-reopen".to_string(),
            operator_id: OperatorId::new("op-1"),
            opened_at: shift.window.start() + chrono::Duration::hours(13),
            closed_at: None,
            opening_float: Money::from_cents(5_000),
        })
        .await
        .unwrap();

    let report = run(&db, &shift, "op-1", alice()).await.unwrap();
    assert!(!report.cash_position().is_complete());
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::CashPositionUnavailable { reason }] if reason.contains("2 drawer sessions")
    ));

    // The rest of the shift is unaffected.
    let payments = report.payment_totals().as_complete().unwrap();
    assert_eq!(payments[&PaymentMethod::Cash].net_total, Money::from_cents(8_000));
}

#[tokio::test]
async fn test_cashier_cannot_see_colleague() {
    let (db, shift) = seeded().await;
    let bruno = OperatorFilter::Specific(OperatorId::new("op-2"));

    let err = run(&db, &shift, "op-1", bruno).await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));

    let err = run(&db, &shift, "op-1", OperatorFilter::All).await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_unknown_operator_cannot_report() {
    let (db, shift) = seeded().await;
    let err = run(&db, &shift, "ghost", alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::IdentityUnavailable(_)));
}
