//! Configuration for the Timing Butler.
//!
//! This module provides:
//! - The resolved threshold set ([`ButlerConfig`]) and per-scope layers
//!   ([`ButlerOverrides`])
//! - Pure project-over-local resolution with defaults
//! - Pluggable storage: in memory or TOML files with atomic writes
//!
//! # Example
//!
//! ```no_run
//! use butler_core::config::{ButlerConfigService, ConfigKey, ConfigScope, TomlConfigStore};
//!
//! let store = TomlConfigStore::new("project.toml", ".config/timing_butler.toml");
//! let mut service = ButlerConfigService::new(store);
//!
//! // Override one value for everyone working on the project
//! service.set(ConfigScope::Project, ConfigKey::LeadIn, Some(80)).unwrap();
//!
//! // Resolve the thresholds for a Butler call
//! let config = service.effective_config().unwrap();
//! assert_eq!(config.lead_in, 80);
//! ```

mod manager;
mod service;
mod settings;
mod store;

pub(crate) use manager::atomic_write;
pub use manager::{ConfigError, ConfigResult, TomlConfigStore, BUTLER_TABLE};
pub use service::{ButlerConfigService, ConfigSnapshot};
pub use settings::{
    resolve_value, ButlerConfig, ButlerOverrides, ConfigKey, ConfigScope, UnknownKey,
};
pub use store::{ConfigStore, MemoryConfigStore};
