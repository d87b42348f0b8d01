//! # Engine Configuration
//!
//! Configuration management for report generation.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DEFAULT_TIMEOUT_MS=3000                                      │
//! │     TALLY_SALES_TIMEOUT_MS=10000                                       │
//! │     TALLY_MAX_WINDOW_DAYS=62                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.tally/tally.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     5s per source, 31-day windows                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tally.toml
//! [timeouts]
//! default_ms = 5000
//! sales_ms = 10000      # the one source a report cannot do without
//! tickets_ms = 2000
//!
//! [report]
//! max_window_days = 31
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use tally_core::{SourceKind, MAX_WINDOW_DAYS};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Timeouts
// =============================================================================

/// Per-source call budgets in milliseconds.
///
/// Any source without its own value uses `default_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_timeout_ms")]
    pub default_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchases_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charges_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_ms: Option<u64>,
    /// Covers both the opening float and cash movements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_drawer_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_ms: Option<u64>,
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        TimeoutSettings {
            default_ms: default_timeout_ms(),
            sales_ms: None,
            returns_ms: None,
            purchases_ms: None,
            charges_ms: None,
            tickets_ms: None,
            cash_drawer_ms: None,
            catalog_ms: None,
        }
    }
}

impl TimeoutSettings {
    /// Same budget for every source.
    pub fn uniform(ms: u64) -> Self {
        TimeoutSettings {
            default_ms: ms,
            ..Default::default()
        }
    }

    fn override_for(&self, source: SourceKind) -> Option<u64> {
        match source {
            SourceKind::Sales => self.sales_ms,
            SourceKind::Returns => self.returns_ms,
            SourceKind::Purchases => self.purchases_ms,
            SourceKind::Charges => self.charges_ms,
            SourceKind::TicketRedemptions => self.tickets_ms,
            SourceKind::CashMovements | SourceKind::OpeningFloat => self.cash_drawer_ms,
            SourceKind::Catalog => self.catalog_ms,
        }
    }

    /// Budget for one source call.
    pub fn for_source(&self, source: SourceKind) -> Duration {
        Duration::from_millis(self.override_for(source).unwrap_or(self.default_ms))
    }
}

// =============================================================================
// Report Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Longest window a single request may cover.
    #[serde(default = "default_max_window_days")]
    pub max_window_days: u32,
}

fn default_max_window_days() -> u32 {
    MAX_WINDOW_DAYS
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            max_window_days: default_max_window_days(),
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timeouts: TimeoutSettings,

    #[serde(default)]
    pub report: ReportSettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tally.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn from_file(path: &Path) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        let t = &self.timeouts;
        let all = [
            ("default_ms", Some(t.default_ms)),
            ("sales_ms", t.sales_ms),
            ("returns_ms", t.returns_ms),
            ("purchases_ms", t.purchases_ms),
            ("charges_ms", t.charges_ms),
            ("tickets_ms", t.tickets_ms),
            ("cash_drawer_ms", t.cash_drawer_ms),
            ("catalog_ms", t.catalog_ms),
        ];
        for (name, value) in all {
            if value == Some(0) {
                return Err(EngineError::InvalidConfig(format!(
                    "timeouts.{} must be greater than 0",
                    name
                )));
            }
        }

        if !(1..=366).contains(&self.report.max_window_days) {
            return Err(EngineError::InvalidConfig(format!(
                "report.max_window_days must be between 1 and 366, got {}",
                self.report.max_window_days
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(ms) = env_number::<u64>("TALLY_DEFAULT_TIMEOUT_MS") {
            debug!(ms, "Overriding default timeout from environment");
            self.timeouts.default_ms = ms;
        }

        if let Some(ms) = env_number::<u64>("TALLY_SALES_TIMEOUT_MS") {
            debug!(ms, "Overriding sales timeout from environment");
            self.timeouts.sales_ms = Some(ms);
        }

        if let Some(days) = env_number::<u32>("TALLY_MAX_WINDOW_DAYS") {
            debug!(days, "Overriding max window from environment");
            self.report.max_window_days = days;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring non-numeric environment override");
            None
        }
    }
}
