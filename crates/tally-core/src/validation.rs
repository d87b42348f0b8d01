//! # Validation Module
//!
//! Request-level validation for report generation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request (THIS MODULE)                                        │
//! │  ├── Window length within the configured maximum                       │
//! │  └── Operator id well-formed                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Normalizer (per record)                                      │
//! │  ├── Required fields present                                           │
//! │  └── Timestamp inside the window ──► MalformedRecord, skip             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Assembler                                                    │
//! │  └── Cross-checks between buckets ──► InvariantViolation               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tally_core::types::Window;
//! use tally_core::validation::{validate_operator_id, validate_window};
//!
//! let start = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
//! let window = Window::new(start, end).unwrap();
//!
//! validate_window(&window, 31).unwrap();
//! validate_operator_id("op-7").unwrap();
//! ```

use chrono::Duration;

use crate::error::ValidationError;
use crate::types::{OperatorFilter, Window};
use crate::MAX_OPERATOR_ID_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Window Validators
// =============================================================================

/// Validates that a window does not exceed `max_days`.
///
/// `Window::new` already guarantees `start < end`; this check bounds the
/// amount of data a single request may pull from every source.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use tally_core::types::Window;
/// use tally_core::validation::validate_window;
///
/// let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
/// let window = Window::new(start, end).unwrap();
///
/// assert!(validate_window(&window, 31).is_err());
/// assert!(validate_window(&window, 90).is_ok());
/// ```
pub fn validate_window(window: &Window, max_days: u32) -> ValidationResult<()> {
    if window.duration() > Duration::days(i64::from(max_days)) {
        return Err(ValidationError::InvalidWindow {
            reason: format!(
                "window spans {} hours, maximum is {} days",
                window.duration().num_hours(),
                max_days
            ),
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an operator identifier.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most `MAX_OPERATOR_ID_LEN` characters
/// - No control characters
pub fn validate_operator_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "operator_id".to_string(),
        });
    }

    if id.chars().count() > MAX_OPERATOR_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "operator_id".to_string(),
            max: MAX_OPERATOR_ID_LEN,
        });
    }

    if id.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: "operator_id".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates the operator in a filter, if any.
pub fn validate_operator_filter(filter: &OperatorFilter) -> ValidationResult<()> {
    match filter.operator() {
        Some(id) => validate_operator_id(id.as_str()),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
