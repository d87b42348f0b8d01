//! # tally-store: SQLite Source Store for Tally
//!
//! A local SQLite copy of the back-office feeds, served to the report
//! engine through its gateway traits.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  ReportEngine::generate                                                │
//! │       │  fan-out, one call per source                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-store (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ SqliteGateways│    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (gateways.rs) │───►│ sale, expense │    │  (embedded)  │  │   │
//! │  │   │               │    │ ticket, drawer│    │              │  │   │
//! │  │   │ every trait   │    │ catalog, oper.│    │ 001_source_  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    │   schema.sql │  │   │
//! │  │                                │            └──────────────┘  │   │
//! │  │                        ┌───────┴───────┐                       │   │
//! │  │                        │   Database    │                       │   │
//! │  │                        │   (pool.rs)   │                       │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//! - [`repository`] - Window-scoped source queries
//! - [`gateways`] - Engine gateway implementations
//! - [`demo`] - A reproducible demo shift for the seed binary and tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_store::{Database, DbConfig, SqliteGateways};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let gateways = Gateways::from_single(Arc::new(SqliteGateways::new(db, operator)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod demo;
pub mod error;
pub mod gateways;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use gateways::SqliteGateways;
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::drawer::{DrawerRepository, DrawerSession};
pub use repository::expense::ExpenseRepository;
pub use repository::operator::{OperatorRepository, OperatorRole, StoredOperator};
pub use repository::sale::SaleRepository;
pub use repository::ticket::TicketRepository;
