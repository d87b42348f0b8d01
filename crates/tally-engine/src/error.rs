//! # Engine Error Types
//!
//! What a caller of `ReportEngine::generate` can get back instead of a
//! report.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Request      │  │    Sources      │  │     Defects             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidRequest │  │  CriticalSource │  │  InvariantViolation     │ │
//! │  │  Unauthorized   │  │    Failure      │  │                         │ │
//! │  │  Cancelled      │  │  (sales only)   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Configuration  │  Failures of any other source never show up      │
//! │  │                 │  here: they become diagnostics on the report.    │
//! │  │  InvalidConfig  │                                                   │
//! │  │  ConfigLoad...  │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use tally_core::{ReportError, SourceKind, ValidationError};

use crate::gateway::GatewayError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    /// The request itself is malformed (bad window, bad operator id).
    #[error("Invalid report request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// The current operator may not see this report.
    #[error("Operator {operator} may not view reports for operator scope {scope}")]
    Unauthorized { operator: String, scope: String },

    /// The caller abandoned the request; nothing was produced.
    #[error("Report generation cancelled")]
    Cancelled,

    // =========================================================================
    // Source Errors
    // =========================================================================
    /// A source without which no report makes sense failed.
    #[error("Critical source {source_kind} failed: {error}")]
    CriticalSourceFailure {
        source_kind: SourceKind,
        error: GatewayError,
    },

    /// The authorization collaborator could not answer.
    #[error("Identity provider failed: {0}")]
    IdentityUnavailable(GatewayError),

    // =========================================================================
    // Defects
    // =========================================================================
    /// Assembly found contradictory aggregates.
    #[error(transparent)]
    InvariantViolation(#[from] ReportError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl EngineError {
    /// True if running the same request again might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::CriticalSourceFailure { .. } | EngineError::IdentityUnavailable(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidConfig(_) | EngineError::ConfigLoadFailed(_)
        )
    }
}
