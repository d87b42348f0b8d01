//! End-to-end report generation against in-memory gateways.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tally_core::{
    CashMovementRecord, CatalogEntry, ChargeRecord, Diagnostic, Money, OperatorFilter, OperatorId,
    OperatorIdentity, PaymentMethod, PurchaseRecord, ReturnRecord, SaleRecord, SourceKind,
    TicketRedemptionRecord, Window,
};
use tally_engine::{
    CancellationToken, CashDrawerGateway, CatalogGateway, ChargesGateway, EngineConfig,
    EngineError, GatewayError, GatewayResult, Gateways, IdentityProvider, OpeningFloat,
    PurchasesGateway, ReportEngine, ReportRequest, ReturnsGateway, SalesGateway, TicketGateway,
    TimeoutSettings,
};

// =============================================================================
// Fake Sources
// =============================================================================

#[derive(Default)]
struct FakeSources {
    sales: Vec<SaleRecord>,
    returns: Vec<ReturnRecord>,
    purchases: Vec<PurchaseRecord>,
    charges: Vec<ChargeRecord>,
    tickets: Vec<TicketRedemptionRecord>,
    movements: Vec<CashMovementRecord>,
    catalog: Vec<CatalogEntry>,
    /// Floats of the drawer sessions opened inside the window.
    session_floats: Vec<Money>,
    failing: HashSet<SourceKind>,
    delays: HashMap<SourceKind, Duration>,
    deny: bool,
    calls: Mutex<Vec<SourceKind>>,
}

impl FakeSources {
    async fn serve<T: Clone>(&self, source: SourceKind, data: &T) -> GatewayResult<T> {
        self.calls.lock().unwrap().push(source);
        if let Some(delay) = self.delays.get(&source) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&source) {
            return Err(GatewayError::Unavailable(format!("{} backend is down", source)));
        }
        Ok(data.clone())
    }

    fn called(&self, source: SourceKind) -> bool {
        self.calls.lock().unwrap().contains(&source)
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SalesGateway for FakeSources {
    async fn fetch_sales(&self, _: &Window, _: &OperatorFilter) -> GatewayResult<Vec<SaleRecord>> {
        self.serve(SourceKind::Sales, &self.sales).await
    }
}

#[async_trait]
impl ReturnsGateway for FakeSources {
    async fn fetch_returns(
        &self,
        _: &Window,
        _: &OperatorFilter,
    ) -> GatewayResult<Vec<ReturnRecord>> {
        self.serve(SourceKind::Returns, &self.returns).await
    }
}

#[async_trait]
impl PurchasesGateway for FakeSources {
    async fn fetch_purchases(&self, _: &Window) -> GatewayResult<Vec<PurchaseRecord>> {
        self.serve(SourceKind::Purchases, &self.purchases).await
    }
}

#[async_trait]
impl ChargesGateway for FakeSources {
    async fn fetch_charges(&self, _: &Window) -> GatewayResult<Vec<ChargeRecord>> {
        self.serve(SourceKind::Charges, &self.charges).await
    }
}

#[async_trait]
impl TicketGateway for FakeSources {
    async fn fetch_ticket_redemptions(
        &self,
        _: &Window,
        _: &OperatorFilter,
    ) -> GatewayResult<Vec<TicketRedemptionRecord>> {
        self.serve(SourceKind::TicketRedemptions, &self.tickets).await
    }
}

#[async_trait]
impl CashDrawerGateway for FakeSources {
    async fn fetch_opening_float(
        &self,
        _: &OperatorId,
        _: &Window,
    ) -> GatewayResult<OpeningFloat> {
        let floats = self.serve(SourceKind::OpeningFloat, &self.session_floats).await?;
        Ok(OpeningFloat::from_floats(&floats))
    }

    async fn fetch_cash_movements(
        &self,
        _: &Window,
        _: &OperatorFilter,
    ) -> GatewayResult<Vec<CashMovementRecord>> {
        self.serve(SourceKind::CashMovements, &self.movements).await
    }
}

#[async_trait]
impl CatalogGateway for FakeSources {
    async fn fetch_catalog(&self) -> GatewayResult<Vec<CatalogEntry>> {
        self.serve(SourceKind::Catalog, &self.catalog).await
    }
}

#[async_trait]
impl IdentityProvider for FakeSources {
    async fn current_operator(&self) -> GatewayResult<OperatorIdentity> {
        Ok(OperatorIdentity {
            id: OperatorId::new("mgr-1"),
            display_name: "Dana".to_string(),
        })
    }

    async fn is_authorized(
        &self,
        _: &OperatorIdentity,
        _: &OperatorFilter,
    ) -> GatewayResult<bool> {
        Ok(!self.deny)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn day_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap()
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
}

fn request(filter: OperatorFilter) -> ReportRequest {
    ReportRequest::new(day_start(), day_start() + ChronoDuration::days(1), filter).unwrap()
}

fn alice() -> OperatorFilter {
    OperatorFilter::Specific(OperatorId::new("op-1"))
}

fn sale(id: &str, dollars: i64, method: &str, product: &str) -> SaleRecord {
    SaleRecord {
        id: id.to_string(),
        operator_id: Some("op-1".to_string()),
        operator_name: Some("Alice".to_string()),
        occurred_at: Some(at(10)),
        amount_cents: Some(dollars * 100),
        tax_cents: Some(0),
        discount_cents: None,
        payment_method: Some(method.to_string()),
        product_id: Some(product.to_string()),
        product_name: None,
    }
}

fn refund(id: &str, dollars: i64, method: &str, product: &str) -> ReturnRecord {
    ReturnRecord {
        id: id.to_string(),
        sale_id: Some("s-1".to_string()),
        operator_id: Some("op-1".to_string()),
        operator_name: Some("Alice".to_string()),
        occurred_at: Some(at(15)),
        amount_cents: Some(dollars * 100),
        tax_cents: Some(0),
        payment_method: Some(method.to_string()),
        product_id: Some(product.to_string()),
        product_name: None,
    }
}

fn ticket(id: &str, vendor: &str, face_cents: i64) -> TicketRedemptionRecord {
    TicketRedemptionRecord {
        id: id.to_string(),
        operator_id: Some("op-1".to_string()),
        operator_name: Some("Alice".to_string()),
        occurred_at: Some(at(12)),
        face_value_cents: Some(face_cents),
        vendor_id: Some(vendor.to_string()),
        vendor_name: None,
        commission_bps: Some(400),
    }
}

/// A day with three sales, one refund and a $200 float.
fn shift() -> FakeSources {
    FakeSources {
        sales: vec![
            sale("s-1", 100, "cash", "p-espresso"),
            sale("s-2", 50, "card", "p-sandwich"),
            sale("s-3", 30, "meal_ticket", "p-salad"),
        ],
        returns: vec![refund("r-1", 20, "cash", "p-espresso")],
        tickets: vec![ticket("t-1", "swile", 3_000)],
        catalog: vec![CatalogEntry {
            product_id: "p-espresso".to_string(),
            name: "Espresso".to_string(),
        }],
        session_floats: vec![Money::from_cents(20_000)],
        ..Default::default()
    }
}

fn engine_with(sources: FakeSources, timeouts: TimeoutSettings) -> (ReportEngine, Arc<FakeSources>) {
    let sources = Arc::new(sources);
    let config = EngineConfig {
        timeouts,
        ..EngineConfig::default()
    };
    (
        ReportEngine::new(Gateways::from_single(sources.clone()), config),
        sources,
    )
}

fn engine(sources: FakeSources) -> (ReportEngine, Arc<FakeSources>) {
    engine_with(sources, TimeoutSettings::default())
}

fn dollars(d: i64) -> Money {
    Money::from_cents(d * 100)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_shift_report_totals() {
    let (engine, _) = engine(shift());
    let report = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    let payments = report.payment_totals().as_complete().unwrap();
    let cash = &payments[&PaymentMethod::Cash];
    assert_eq!((cash.count, cash.net_total), (2, dollars(80)));
    let card = &payments[&PaymentMethod::Card];
    assert_eq!((card.count, card.net_total), (1, dollars(50)));

    let summary = report.revenue_summary().as_complete().unwrap();
    assert_eq!(summary.net_result, dollars(160));
    assert_eq!(summary.total_returns, dollars(-20));

    let cash_position = report.cash_position().as_complete().unwrap();
    assert_eq!(cash_position.expected, dollars(280));

    let products = report.product_totals().as_complete().unwrap();
    assert_eq!(products["p-espresso"].label.as_deref(), Some("Espresso"));
    assert_eq!(products["p-espresso"].gross_total, dollars(80));

    let tickets = report.supplier_ticket_totals().as_complete().unwrap();
    assert_eq!(tickets["swile"].net_total.cents(), 2_880);

    assert_eq!(report.line_count(), 5);
    assert!(report.diagnostics().is_empty());
    assert_eq!(report.generated_by().display_name, "Dana");
    assert_eq!(report.operator_filter(), &alice());
}

#[tokio::test]
async fn test_failed_source_degrades_only_its_sections() {
    let mut sources = shift();
    sources.failing.insert(SourceKind::TicketRedemptions);
    let (engine, _) = engine(sources);

    let report = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.supplier_ticket_totals().missing(),
        &[SourceKind::TicketRedemptions]
    );
    assert!(report.payment_totals().is_complete());
    assert!(report.revenue_summary().is_complete());
    assert!(report.cash_position().is_complete());
    assert_eq!(
        report.diagnostics(),
        &[Diagnostic::SourceUnavailable {
            source: SourceKind::TicketRedemptions,
            reason: "source unavailable: ticket_redemptions backend is down".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_sales_failure_is_fatal() {
    let mut sources = shift();
    sources.failing.insert(SourceKind::Sales);
    let (engine, _) = engine(sources);

    let err = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::CriticalSourceFailure {
            source_kind: SourceKind::Sales,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_times_out_into_diagnostic() {
    let mut sources = shift();
    sources.delays.insert(SourceKind::Returns, Duration::from_secs(30));
    let (engine, _) = engine_with(sources, TimeoutSettings::uniform(1_000));

    let report = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.payment_totals().missing(), &[SourceKind::Returns]);
    assert_eq!(
        report.cash_position().missing(),
        &[SourceKind::Returns]
    );
    assert!(report.supplier_ticket_totals().is_complete());
    match &report.diagnostics()[0] {
        Diagnostic::SourceUnavailable { source, reason } => {
            assert_eq!(*source, SourceKind::Returns);
            assert_eq!(reason, "timed out after 1000ms");
        }
        other => panic!("unexpected diagnostic {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_sales_is_fatal() {
    let mut sources = shift();
    sources.delays.insert(SourceKind::Sales, Duration::from_secs(30));
    let timeouts = TimeoutSettings {
        sales_ms: Some(2_000),
        ..TimeoutSettings::default()
    };
    let (engine, _) = engine_with(sources, timeouts);

    let err = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        EngineError::CriticalSourceFailure { error, .. } => {
            assert_eq!(error, GatewayError::Timeout(Duration::from_secs(2)));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sources_are_fetched_concurrently() {
    let mut sources = shift();
    for source in SourceKind::ALL {
        sources.delays.insert(source, Duration::from_secs(1));
    }
    let (engine, fake) = engine(sources);

    let started = tokio::time::Instant::now();
    engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(fake.call_count(), SourceKind::ALL.len());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_discards_everything() {
    let mut sources = shift();
    sources.delays.insert(SourceKind::Sales, Duration::from_secs(60));
    let (engine, _) = engine_with(sources, TimeoutSettings::uniform(120_000));

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        }
    };

    let req = request(alice());
    let (result, ()) = tokio::join!(engine.generate(&req, &token), canceller);
    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[tokio::test]
async fn test_cancelled_before_start_touches_nothing() {
    let (engine, fake) = engine(shift());
    let token = CancellationToken::new();
    token.cancel();

    let result = engine.generate(&request(alice()), &token).await;
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_all_operators_skips_opening_float() {
    let (engine, fake) = engine(shift());
    let report = engine
        .generate(&request(OperatorFilter::All), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!fake.called(SourceKind::OpeningFloat));
    assert_eq!(report.cash_position().missing(), &[SourceKind::OpeningFloat]);
    assert!(report.payment_totals().is_complete());

    let cash_diags = report
        .diagnostics()
        .iter()
        .filter(|d| matches!(d, Diagnostic::CashPositionUnavailable { .. }))
        .count();
    assert_eq!(cash_diags, 1);
}

#[tokio::test]
async fn test_missing_drawer_session() {
    let mut sources = shift();
    sources.session_floats.clear();
    let (engine, _) = engine(sources);

    let report = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.cash_position().is_complete());
    assert!(matches!(
        &report.diagnostics()[0],
        Diagnostic::CashPositionUnavailable { reason } if reason.contains("op-1")
    ));
}

#[tokio::test]
async fn test_two_drawer_sessions_leave_cash_unavailable() {
    let mut sources = shift();
    sources.session_floats = vec![Money::from_cents(20_000), Money::from_cents(10_000)];
    let (engine, _) = engine(sources);

    let report = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.cash_position().missing(), &[SourceKind::OpeningFloat]);
    assert!(report.payment_totals().is_complete());
    assert!(report.revenue_summary().is_complete());
    assert!(matches!(
        report.diagnostics(),
        [Diagnostic::CashPositionUnavailable { reason }] if reason.contains("2 drawer sessions")
    ));
}

#[tokio::test]
async fn test_unauthorized_caller_gets_nothing() {
    let mut sources = shift();
    sources.deny = true;
    let (engine, fake) = engine(sources);

    let err = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_same_window_gets_new_report_number() {
    let (engine, _) = engine(shift());
    let token = CancellationToken::new();

    let first = engine.generate(&request(alice()), &token).await.unwrap();
    let second = engine.generate(&request(alice()), &token).await.unwrap();

    assert_ne!(first.report_number(), second.report_number());
    assert_eq!(first.payment_totals(), second.payment_totals());
    assert_eq!(first.window(), second.window());
}

#[tokio::test]
async fn test_malformed_record_is_contained() {
    let mut sources = shift();
    let mut broken = sale("s-broken", 10, "cash", "p-espresso");
    broken.occurred_at = Some(day_start() - ChronoDuration::minutes(5));
    sources.sales.push(broken);
    let (engine, _) = engine(sources);

    let report = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.line_count(), 5);
    assert_eq!(report.diagnostics().len(), 1);
    assert!(report.diagnostics()[0].is_malformed_record());
    assert!(report.payment_totals().is_complete());
}

#[tokio::test]
async fn test_overlong_window_is_rejected() {
    let (engine, fake) = engine(shift());
    let req = ReportRequest::new(
        day_start(),
        day_start() + ChronoDuration::days(45),
        OperatorFilter::All,
    )
    .unwrap();

    let err = engine
        .generate(&req, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_card_amounts_never_move_cash() {
    let (baseline_engine, _) = engine(shift());
    let baseline = baseline_engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    let mut bigger_card = shift();
    bigger_card.sales[1].amount_cents = Some(999_999);
    bigger_card.sales[2].amount_cents = Some(12_345);
    let (engine, _) = engine(bigger_card);
    let changed = engine
        .generate(&request(alice()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(baseline.cash_position(), changed.cash_position());
    assert_ne!(baseline.revenue_summary(), changed.revenue_summary());
}
