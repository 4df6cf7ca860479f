//! # Service Configuration
//!
//! Configuration for the catalog cache and sale processor.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     DUKA_MAX_SALE_ITEMS=10                                              │
//! │     DUKA_WATCH_BUFFER=256                                               │
//! │     DUKA_WARM_ON_START=true                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     Explicit path, or DUKA_CONFIG, or ./duka.toml                       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # duka.toml
//! [cache]
//! watch_buffer = 256
//! warm_on_start = true
//!
//! [sale]
//! max_line_items = 10
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use duka_core::DEFAULT_MAX_SALE_ITEMS;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Cache Settings
// =============================================================================

/// Catalog cache behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Capacity of each change-feed channel. Overflow is safe: a full
    /// feed drops events and the next refresh rescans everything anyway.
    #[serde(default = "default_watch_buffer")]
    pub watch_buffer: usize,

    /// Build the snapshot before serving, instead of on first use.
    #[serde(default = "default_true")]
    pub warm_on_start: bool,
}

fn default_watch_buffer() -> usize {
    256
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            watch_buffer: default_watch_buffer(),
            warm_on_start: true,
        }
    }
}

// =============================================================================
// Sale Settings
// =============================================================================

/// Sale processor behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSettings {
    /// Hard cap on lines per sale; extra lines are dropped, noted in the
    /// response metadata.
    #[serde(default = "default_max_line_items")]
    pub max_line_items: usize,
}

fn default_max_line_items() -> usize {
    DEFAULT_MAX_SALE_ITEMS
}

impl Default for SaleSettings {
    fn default() -> Self {
        SaleSettings {
            max_line_items: default_max_line_items(),
        }
    }
}

// =============================================================================
// Service Configuration
// =============================================================================

/// Complete service configuration.
///
/// ## Example Config File
/// ```toml
/// [cache]
/// watch_buffer = 256
/// warm_on_start = true
///
/// [sale]
/// max_line_items = 10
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub sale: SaleSettings,
}

impl ServiceConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (explicit path, `DUKA_CONFIG`, or `./duka.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading service config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if the load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load service config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.sale.max_line_items == 0 {
            return Err(EngineError::InvalidConfig(
                "max_line_items must be greater than 0".into(),
            ));
        }
        if self.cache.watch_buffer == 0 {
            return Err(EngineError::InvalidConfig(
                "watch_buffer must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("DUKA_MAX_SALE_ITEMS") {
            if let Ok(n) = value.parse::<usize>() {
                debug!(max_line_items = n, "Overriding sale cap from environment");
                self.sale.max_line_items = n;
            }
        }

        if let Ok(value) = std::env::var("DUKA_WATCH_BUFFER") {
            if let Ok(n) = value.parse::<usize>() {
                self.cache.watch_buffer = n;
            }
        }

        if let Ok(value) = std::env::var("DUKA_WARM_ON_START") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.cache.warm_on_start = true,
                "0" | "false" | "no" => self.cache.warm_on_start = false,
                other => warn!(value = %other, "Unknown DUKA_WARM_ON_START value"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("DUKA_CONFIG") {
            return Some(PathBuf::from(path));
        }
        Some(PathBuf::from("duka.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServiceConfig::default();
        assert_eq!(config.sale.max_line_items, 10);
        assert_eq!(config.cache.watch_buffer, 256);
        assert!(config.cache.warm_on_start);
    }

    #[test]
    fn parses_partial_toml() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [sale]
            max_line_items = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.sale.max_line_items, 25);
        // Untouched section keeps its defaults.
        assert_eq!(config.cache.watch_buffer, 256);
    }

    #[test]
    fn validation_rejects_zero_caps() {
        let mut config = ServiceConfig::default();
        assert!(config.validate().is_ok());

        config.sale.max_line_items = 0;
        assert!(config.validate().is_err());

        config.sale.max_line_items = 10;
        config.cache.watch_buffer = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_keeps_sections() {
        let config = ServiceConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[cache]"));
        assert!(text.contains("[sale]"));

        let back: ServiceConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.sale.max_line_items, config.sale.max_line_items);
    }
}
