//! # tally-engine: Report Generation for Tally
//!
//! This crate drives one report generation from request to [`Report`]:
//! it authorizes the caller, fans out to every source gateway at once,
//! and hands the complete snapshot to the pure pipeline in `tally-core`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Report Engine Architecture                       │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                ReportEngine (Main Orchestrator)                  │  │
//! │  │                                                                  │  │
//! │  │  generate(request, cancel) ──► Report | EngineError             │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │   Gateways     │  │  EngineConfig  │  │  tally-core pipeline   │    │
//! │  │                │  │                │  │                        │    │
//! │  │ async traits,  │  │ per-source     │  │ normalize ──►          │    │
//! │  │ one per source │  │ timeouts, max  │  │ aggregate ──►          │    │
//! │  │ Arc<dyn ...>   │  │ window length  │  │ assemble               │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - `ReportEngine` and `ReportRequest`
//! - [`gateway`] - Source gateway traits and `GatewayError`
//! - [`config`] - Engine configuration (timeouts, window limit)
//! - [`error`] - Engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_engine::{EngineConfig, Gateways, ReportEngine, ReportRequest};
//! use tally_core::OperatorFilter;
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = ReportEngine::new(Gateways::from_single(store), EngineConfig::load_or_default(None));
//! let request = ReportRequest::new(shift_start, shift_end, OperatorFilter::Specific("op-7".into()))?;
//!
//! let report = engine.generate(&request, &CancellationToken::new()).await?;
//! println!("{} ({} warnings)", report.report_number(), report.diagnostics().len());
//! ```
//!
//! [`Report`]: tally_core::Report

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{EngineConfig, ReportSettings, TimeoutSettings};
pub use engine::{ReportEngine, ReportRequest};
pub use error::{EngineError, EngineResult};
pub use gateway::{
    CashDrawerGateway, CatalogGateway, ChargesGateway, GatewayError, GatewayResult, Gateways,
    IdentityProvider, OpeningFloat, PurchasesGateway, ReturnsGateway, SalesGateway,
    TicketGateway,
};

// Callers need the token type to cancel a request.
pub use tokio_util::sync::CancellationToken;
