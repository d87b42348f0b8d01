//! # Report Engine
//!
//! Orchestrates one report generation: authorize, fan out to every source
//! at once, then run the pure pipeline on the complete snapshot.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        generate(request, cancel)                        │
//! │                                                                         │
//! │  1. Validate         window length, operator id                        │
//! │        │                                                                │
//! │  2. Authorize        IdentityProvider ──► Unauthorized?                │
//! │        │                                                                │
//! │  3. Fan out          ┌── sales ────────┐                               │
//! │     (tokio::join!,   ├── returns       │  each call wrapped in its     │
//! │      all at once)    ├── purchases     │  own tokio::time::timeout     │
//! │                      ├── charges       │                               │
//! │                      ├── tickets       │                               │
//! │                      ├── opening float │  (Specific operator only)     │
//! │                      ├── cash moves    │                               │
//! │                      └── catalog ──────┘                               │
//! │        │                                                                │
//! │  4. Triage           sales failed?  ──► CriticalSourceFailure          │
//! │                      other failed?  ──► SourceUnavailable diagnostic   │
//! │        │                                                                │
//! │  5. normalize ──► aggregate ──► assemble   (pure, synchronous)         │
//! │                                                                         │
//! │  At any point: cancel.cancelled() ──► in-flight calls dropped,         │
//! │                                       EngineError::Cancelled           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is cached between requests. Two concurrent requests share only
//! the gateways, never a snapshot.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tally_core::validation::{validate_operator_filter, validate_window};
use tally_core::{
    aggregate, assemble, normalize, Diagnostic, Money, OperatorFilter, OperatorIdentity,
    RawSnapshot, Report, ReportContext, ReportIdentity, SourceKind, ValidationError, Window,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gateway::{GatewayError, GatewayResult, Gateways, OpeningFloat};

// =============================================================================
// Request
// =============================================================================

/// The only external parameters of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub window: Window,
    pub operator_filter: OperatorFilter,
}

impl ReportRequest {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        operator_filter: OperatorFilter,
    ) -> Result<Self, ValidationError> {
        Ok(ReportRequest {
            window: Window::new(start, end)?,
            operator_filter,
        })
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Generates reports from a fixed set of gateways.
///
/// Cheap to share: clone the `Arc`s inside [`Gateways`] or wrap the engine in
/// an `Arc` and call [`ReportEngine::generate`] from as many tasks as needed.
#[derive(Debug, Clone)]
pub struct ReportEngine {
    gateways: Gateways,
    config: EngineConfig,
}

impl ReportEngine {
    pub fn new(gateways: Gateways, config: EngineConfig) -> Self {
        ReportEngine { gateways, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generates a report, or stops as soon as `cancel` fires.
    ///
    /// ## Errors
    /// - `InvalidRequest` for a window longer than configured
    /// - `Unauthorized` before any source is touched
    /// - `CriticalSourceFailure` when sales failed or timed out
    /// - `InvariantViolation` when assembly finds contradictory figures
    /// - `Cancelled` when the token fires first
    ///
    /// Every other source failure is reported in `Report::diagnostics`.
    #[instrument(
        skip_all,
        fields(window = %request.window, operator_filter = %request.operator_filter)
    )]
    pub async fn generate(
        &self,
        request: &ReportRequest,
        cancel: &CancellationToken,
    ) -> EngineResult<Report> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Report generation cancelled, discarding partial results");
                Err(EngineError::Cancelled)
            }
            result = self.run(request) => result,
        }
    }

    async fn run(&self, request: &ReportRequest) -> EngineResult<Report> {
        validate_window(&request.window, self.config.report.max_window_days)?;
        validate_operator_filter(&request.operator_filter)?;

        let caller = self.authorize(&request.operator_filter).await?;
        info!(operator = %caller.id, "Generating report");

        let fetched = self.fetch_all(request).await?;

        let normalized = normalize(&fetched.snapshot, &request.window);
        for diag in &normalized.diagnostics {
            warn!(%diag, "Skipped malformed record");
        }

        let aggregates = aggregate(&normalized.items, fetched.opening_float)?;

        let mut diagnostics = fetched.diagnostics;
        diagnostics.extend(normalized.diagnostics);

        let context = ReportContext {
            window: request.window,
            operator_filter: request.operator_filter.clone(),
            identity: ReportIdentity::issue(Utc::now(), caller),
            missing_sources: fetched.missing,
            diagnostics,
        };
        let report = assemble(aggregates, context)?;

        info!(
            report_number = %report.report_number(),
            lines = report.line_count(),
            diagnostics = report.diagnostics().len(),
            "Report generated"
        );
        Ok(report)
    }

    async fn authorize(&self, filter: &OperatorFilter) -> EngineResult<OperatorIdentity> {
        let budget = Duration::from_millis(self.config.timeouts.default_ms);
        let identity = &self.gateways.identity;

        let caller = within(budget, identity.current_operator())
            .await
            .map_err(EngineError::IdentityUnavailable)?;
        let allowed = within(budget, identity.is_authorized(&caller, filter))
            .await
            .map_err(EngineError::IdentityUnavailable)?;

        if !allowed {
            warn!(operator = %caller.id, scope = %filter, "Unauthorized report request");
            return Err(EngineError::Unauthorized {
                operator: caller.id.to_string(),
                scope: filter.to_string(),
            });
        }
        Ok(caller)
    }

    /// Issues every source call concurrently and waits for all of them.
    async fn fetch_all(&self, request: &ReportRequest) -> EngineResult<Fetched> {
        let window = &request.window;
        let filter = &request.operator_filter;
        let gw = &self.gateways;
        let budget = |source| self.config.timeouts.for_source(source);

        let opening_float = async {
            match filter.operator() {
                Some(operator) => Some(
                    timed(
                        SourceKind::OpeningFloat,
                        budget(SourceKind::OpeningFloat),
                        gw.cash_drawer.fetch_opening_float(operator, window),
                    )
                    .await,
                ),
                None => None,
            }
        };

        let (sales, returns, purchases, charges, tickets, float, movements, catalog) = tokio::join!(
            timed(SourceKind::Sales, budget(SourceKind::Sales), gw.sales.fetch_sales(window, filter)),
            timed(
                SourceKind::Returns,
                budget(SourceKind::Returns),
                gw.returns.fetch_returns(window, filter)
            ),
            timed(
                SourceKind::Purchases,
                budget(SourceKind::Purchases),
                gw.purchases.fetch_purchases(window)
            ),
            timed(
                SourceKind::Charges,
                budget(SourceKind::Charges),
                gw.charges.fetch_charges(window)
            ),
            timed(
                SourceKind::TicketRedemptions,
                budget(SourceKind::TicketRedemptions),
                gw.tickets.fetch_ticket_redemptions(window, filter)
            ),
            opening_float,
            timed(
                SourceKind::CashMovements,
                budget(SourceKind::CashMovements),
                gw.cash_drawer.fetch_cash_movements(window, filter)
            ),
            timed(SourceKind::Catalog, budget(SourceKind::Catalog), gw.catalog.fetch_catalog()),
        );

        let sales = sales.map_err(|error| {
            warn!(%error, "Sales source failed, no report can be produced");
            EngineError::CriticalSourceFailure {
                source_kind: SourceKind::Sales,
                error,
            }
        })?;

        let mut triage = Triage::default();
        let snapshot = RawSnapshot {
            sales,
            returns: triage.accept(SourceKind::Returns, returns),
            purchases: triage.accept(SourceKind::Purchases, purchases),
            charges: triage.accept(SourceKind::Charges, charges),
            ticket_redemptions: triage.accept(SourceKind::TicketRedemptions, tickets),
            cash_movements: triage.accept(SourceKind::CashMovements, movements),
            catalog: triage.accept(SourceKind::Catalog, catalog),
        };

        let opening_float = match (float, filter.operator()) {
            (Some(result), Some(operator)) => {
                match triage.accept(SourceKind::OpeningFloat, result.map(Some)) {
                    Some(OpeningFloat::Found(float)) => Some(float),
                    Some(OpeningFloat::NoSession) => {
                        triage.cash_unavailable(&format!(
                            "no drawer session for operator {} in window",
                            operator
                        ));
                        None
                    }
                    Some(OpeningFloat::MultipleSessions(count)) => {
                        triage.cash_unavailable(&format!(
                            "operator {} opened {} drawer sessions in window; \
                             no single opening float applies",
                            operator, count
                        ));
                        None
                    }
                    None => None,
                }
            }
            _ => {
                triage.cash_unavailable(
                    "report covers all operators; no single drawer session applies",
                );
                None
            }
        };

        Ok(Fetched {
            snapshot,
            opening_float,
            missing: triage.missing,
            diagnostics: triage.diagnostics,
        })
    }
}

// =============================================================================
// Fetch Helpers
// =============================================================================

/// The complete, immutable input of one report.
struct Fetched {
    snapshot: RawSnapshot,
    opening_float: Option<Money>,
    missing: BTreeSet<SourceKind>,
    diagnostics: Vec<Diagnostic>,
}

/// Sorts non-critical source results into data and diagnostics.
#[derive(Default)]
struct Triage {
    missing: BTreeSet<SourceKind>,
    diagnostics: Vec<Diagnostic>,
}

impl Triage {
    fn accept<T: Default>(&mut self, source: SourceKind, result: GatewayResult<T>) -> T {
        match result {
            Ok(records) => records,
            Err(error) => {
                warn!(%source, %error, "Source unavailable, degrading dependent sections");
                self.missing.insert(source);
                self.diagnostics.push(Diagnostic::SourceUnavailable {
                    source,
                    reason: error.to_string(),
                });
                T::default()
            }
        }
    }

    fn cash_unavailable(&mut self, reason: &str) {
        debug!(reason, "Cash position unavailable");
        self.diagnostics.push(Diagnostic::CashPositionUnavailable {
            reason: reason.to_string(),
        });
    }
}

/// Runs one source call under its budget and logs how it went.
async fn timed<T, F>(source: SourceKind, budget: Duration, call: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
    T: Len,
{
    let started = Instant::now();
    let result = within(budget, call).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(value) => debug!(%source, records = value.len(), elapsed_ms, "Source fetched"),
        Err(error) => debug!(%source, %error, elapsed_ms, "Source fetch failed"),
    }
    result
}

async fn within<T, F>(budget: Duration, call: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(budget)),
    }
}

/// Record count for fetch logging.
trait Len {
    fn len(&self) -> usize;
}

impl<T> Len for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Sessions found.
impl Len for OpeningFloat {
    fn len(&self) -> usize {
        match self {
            OpeningFloat::Found(_) => 1,
            OpeningFloat::NoSession => 0,
            OpeningFloat::MultipleSessions(count) => *count,
        }
    }
}
