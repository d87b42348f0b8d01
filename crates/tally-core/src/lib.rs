//! # tally-core: Pure Ledger Logic for Tally
//!
//! This crate is the **heart** of the end-of-shift reconciliation engine.
//! It turns raw source records into an immutable, internally consistent
//! [`Report`] using pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-engine (async)                         │   │
//! │  │   gateways fetched concurrently ──► RawSnapshot                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ normalize │─►│ aggregate │─►│  report   │  │   money   │  │   │
//! │  │   │ records → │  │ one fold, │  │ identity, │  │   types   │  │   │
//! │  │   │ LineItems │  │ all views │  │ sections  │  │   error   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO ASYNC                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                     Report ──► presenter (TypeScript, via ts-rs)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - LineItem, Window, OperatorFilter, PaymentMethod, SourceKind
//! - [`records`] - Raw source record shapes as gateways return them
//! - [`normalize`] - Records to LineItems, with per-record diagnostics
//! - [`aggregate`] - Product/operator/payment/supplier buckets, cash, summary
//! - [`report`] - Report numbers, sections, assembly and invariant checks
//! - [`error`] - Diagnostics and error types
//! - [`validation`] - Request validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tally_core::{aggregate, normalize, Money, RawSnapshot, SaleRecord, Window};
//!
//! let start = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
//! let window = Window::new(start, end).unwrap();
//!
//! let snapshot = RawSnapshot {
//!     sales: vec![SaleRecord {
//!         id: "s-1".into(),
//!         operator_id: Some("op-1".into()),
//!         occurred_at: Some(Utc.with_ymd_and_hms(2026, 3, 14, 9, 5, 0).unwrap()),
//!         amount_cents: Some(450),
//!         payment_method: Some("cash".into()),
//!         product_id: Some("espresso".into()),
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let normalized = normalize(&snapshot, &window);
//! let aggregates = aggregate(&normalized.items, Some(Money::from_cents(10_000))).unwrap();
//! assert_eq!(aggregates.cash_position.unwrap().expected.cents(), 10_450);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod error;
pub mod money;
pub mod normalize;
pub mod records;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::{
    aggregate, Aggregates, Bucket, BucketEntry, CashPosition, CashPositionUnavailable,
    RevenueSummary,
};
pub use error::{Diagnostic, ReportError, ValidationError};
pub use money::Money;
pub use normalize::{normalize, Catalog, Normalized};
pub use records::*;
pub use report::{
    assemble, Report, ReportContext, ReportIdentity, ReportNumber, Section, SectionKind,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest window a single report may cover unless configured otherwise.
pub const MAX_WINDOW_DAYS: u32 = 31;

/// Largest amount a single source record may carry, in cents.
///
/// Far above any real till line, and low enough that basis-point math on a
/// single amount stays well inside `i64`.
pub const MAX_RECORD_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Upper bound on operator identifier length.
pub const MAX_OPERATOR_ID_LEN: usize = 64;
