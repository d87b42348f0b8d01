//! # Repository Module
//!
//! Window-scoped queries over the source tables.
//!
//! ## Query Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every source query follows the same pattern:                          │
//! │                                                                         │
//! │    SELECT <columns> FROM <table>                                        │
//! │    WHERE occurred_at >= ?1            -- window.start (inclusive)      │
//! │      AND occurred_at <  ?2            -- window.end   (exclusive)      │
//! │      AND (?3 IS NULL OR operator_id = ?3)   -- OperatorFilter          │
//! │    ORDER BY occurred_at, id                                             │
//! │                                                                         │
//! │  Rows decode into `*Row` structs (sqlx::FromRow), then convert into    │
//! │  the raw record types of tally-core. Nothing is validated here: the    │
//! │  normalizer owns that.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SaleRepository`](sale::SaleRepository) - sales and returns
//! - [`ExpenseRepository`](expense::ExpenseRepository) - purchases and charges
//! - [`TicketRepository`](ticket::TicketRepository) - supplier ticket redemptions
//! - [`DrawerRepository`](drawer::DrawerRepository) - drawer sessions and cash movements
//! - [`CatalogRepository`](catalog::CatalogRepository) - product names
//! - [`OperatorRepository`](operator::OperatorRepository) - operators and roles

pub mod catalog;
pub mod drawer;
pub mod expense;
pub mod operator;
pub mod sale;
pub mod ticket;

use chrono::{DateTime, Utc};
use tally_core::{OperatorFilter, OperatorId, Window};

/// Window bounds as stored: unix milliseconds, end exclusive.
///
/// Both bounds round up to the next whole millisecond, so a stored
/// millisecond `m` passes `m >= start AND m < end` exactly when
/// `Window::contains` accepts the instant it decodes to.
pub(crate) fn window_millis(window: &Window) -> (i64, i64) {
    (ceil_millis(window.start()), ceil_millis(window.end()))
}

fn ceil_millis(at: DateTime<Utc>) -> i64 {
    let floor = at.timestamp_millis();
    if at.timestamp_subsec_nanos() % 1_000_000 == 0 {
        floor
    } else {
        floor.saturating_add(1)
    }
}

/// `None` matches every operator in the `?3 IS NULL OR ...` clause.
pub(crate) fn operator_param(filter: &OperatorFilter) -> Option<&str> {
    filter.operator().map(OperatorId::as_str)
}

pub(crate) fn to_millis(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(|at| at.timestamp_millis())
}

/// Out-of-range values decode as missing, which the normalizer rejects.
pub(crate) fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}
