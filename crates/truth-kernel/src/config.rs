//! Engine configuration.
//!
//! Defaults work out of the box. Overrides come from a JSON document or from
//! `TRUTH_KERNEL_*` environment variables; unknown JSON fields are rejected
//! so typos do not silently fall back to defaults.

use serde::{Deserialize, Serialize};
use tracing::warn;
use truth_kernel_sync::SyncConfig;

use crate::error::{EngineError, Result};

/// Environment variable overriding `sync.fetch_timeout_ms`.
pub const ENV_FETCH_TIMEOUT_MS: &str = "TRUTH_KERNEL_FETCH_TIMEOUT_MS";
/// Environment variable overriding `sync.max_response_bytes`.
pub const ENV_MAX_RESPONSE_BYTES: &str = "TRUTH_KERNEL_MAX_RESPONSE_BYTES";
/// Environment variable overriding `sync.max_records_per_response`.
pub const ENV_MAX_RECORDS: &str = "TRUTH_KERNEL_MAX_RECORDS";
/// Environment variable overriding `sync.records_path`.
pub const ENV_RECORDS_PATH: &str = "TRUTH_KERNEL_RECORDS_PATH";

/// Configuration for an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Sync round settings.
    pub sync: SyncConfig,
}

impl EngineConfig {
    /// Read a configuration from JSON text. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Defaults, overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults, overridden by whatever `lookup` returns for each variable.
    ///
    /// Values that do not parse are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let sync = &mut config.sync;

        if let Some(ms) = parse_var(&lookup, ENV_FETCH_TIMEOUT_MS) {
            sync.fetch_timeout_ms = ms;
        }
        if let Some(bytes) = parse_var(&lookup, ENV_MAX_RESPONSE_BYTES) {
            sync.max_response_bytes = bytes;
        }
        if let Some(records) = parse_var(&lookup, ENV_MAX_RECORDS) {
            sync.max_records_per_response = records;
        }
        if let Some(path) = lookup(ENV_RECORDS_PATH) {
            sync.records_path = path;
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
