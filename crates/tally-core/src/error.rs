//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core (this file)                                                │
//! │  ├── Diagnostic       - Recoverable, carried ON the Report             │
//! │  │   ├── MalformedRecord          (one record skipped)                 │
//! │  │   ├── SourceUnavailable        (one source degraded)                │
//! │  │   └── CashPositionUnavailable  (cash section omitted)               │
//! │  ├── ReportError      - Fatal assembly defects                         │
//! │  └── ValidationError  - Request input failures                         │
//! │                                                                         │
//! │  tally-engine                                                          │
//! │  ├── GatewayError     - One source call failed                         │
//! │  └── EngineError      - What the caller of generate() sees             │
//! │                                                                         │
//! │  Flow: GatewayError ─► Diagnostic (non-critical source)                │
//! │        GatewayError ─► EngineError::CriticalSourceFailure (sales)      │
//! │        ReportError  ─► EngineError::InvariantViolation                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in messages (source, record id)
//! 3. Per-record and per-source failures are data, not `Err`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use ts_rs::TS;

use crate::types::SourceKind;

// =============================================================================
// Diagnostic
// =============================================================================

/// A recoverable problem encountered while building a report.
///
/// Diagnostics are accumulated and attached to the finished [`Report`] so a
/// presenter can show a warning banner instead of failing the whole report.
///
/// ## Lifecycle
/// ```text
/// Normalizer ──► MalformedRecord ──┐
/// Engine     ──► SourceUnavailable ├──► Report.diagnostics ──► warning banner
/// Aggregator ──► CashPositionUnav. ┘
/// ```
///
/// [`Report`]: crate::report::Report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// One source record could not be normalized and was skipped.
    MalformedRecord {
        source: SourceKind,
        record_id: String,
        reason: String,
    },

    /// A non-critical source failed or timed out; dependent sections are
    /// marked unavailable.
    SourceUnavailable { source: SourceKind, reason: String },

    /// The opening float could not be resolved; only the cash position is
    /// omitted.
    CashPositionUnavailable { reason: String },
}

impl Diagnostic {
    pub fn malformed(
        source: SourceKind,
        record_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Diagnostic::MalformedRecord {
            source,
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this diagnostic is about a skipped record.
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, Diagnostic::MalformedRecord { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedRecord {
                source,
                record_id,
                reason,
            } => write!(f, "malformed {} record {}: {}", source, record_id, reason),
            Diagnostic::SourceUnavailable { source, reason } => {
                write!(f, "{} unavailable: {}", source, reason)
            }
            Diagnostic::CashPositionUnavailable { reason } => {
                write!(f, "cash position unavailable: {}", reason)
            }
        }
    }
}

// =============================================================================
// Report Error
// =============================================================================

/// Fatal errors raised while assembling a report.
///
/// These indicate a programming defect, never bad input data. The engine
/// surfaces them to the caller; they are never defaulted away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Two computations of the same figure disagree.
    ///
    /// ## When This Occurs
    /// - Revenue summary does not recompute to its own net result
    /// - Sum of a revenue bucket differs from the revenue summary
    /// - A running total or the expected cash leaves the `i64` cent range
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for report requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., identifier with control characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The reporting window is empty, inverted or too long.
    #[error("invalid window: {reason}")]
    InvalidWindow { reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for assembly results.
pub type ReportResult<T> = Result<T, ReportError>;

// =============================================================================
// Unit Tests
// =============================================================================
