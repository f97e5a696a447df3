//! Configuration for the metadata store.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::error::QueryError;

// ============================================================================
// Default configuration constants
// ============================================================================

/// Default row limit for key enumeration when no selector supplies one.
pub const DEFAULT_KEY_LIMIT: usize = 1000;

/// Default row limit for value enumeration.
pub const DEFAULT_VALUE_LIMIT: usize = 50;

pub const DEFAULT_TRACES_DATABASE: &str = "parallax_traces";
pub const DEFAULT_TRACES_DICTIONARY_TABLE: &str = "span_fields";
pub const DEFAULT_TRACES_TABLE: &str = "spans_index";

pub const DEFAULT_LOGS_DATABASE: &str = "parallax_logs";
pub const DEFAULT_LOGS_DICTIONARY_TABLE: &str = "log_fields";
pub const DEFAULT_LOGS_TABLE: &str = "logs_index";

pub const DEFAULT_METRICS_DATABASE: &str = "parallax_metrics";
pub const DEFAULT_METRICS_TIMESERIES_TABLE: &str = "timeseries_1week";

pub const DEFAULT_RELATED_DATABASE: &str = "parallax_metadata";
pub const DEFAULT_RELATED_TABLE: &str = "related_metadata";

/// Where the metadata store finds dictionary and data tables, and its
/// enumeration limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub traces: SignalTables,
    pub logs: SignalTables,
    pub metrics: MetricsTables,
    pub related: RelatedTables,
    pub limits: LimitConfig,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            traces: SignalTables::default(),
            logs: SignalTables::logs_default(),
            metrics: MetricsTables::default(),
            related: RelatedTables::default(),
            limits: LimitConfig::default(),
        }
    }
}

impl MetadataConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order (later sources override earlier):
    /// 1. Default values
    /// 2. `parallax.toml` in the current directory
    /// 3. Environment variables prefixed with `PARALLAX_`
    pub fn load() -> Result<Self, QueryError> {
        Figment::new()
            .merge(Toml::file("parallax.toml"))
            .merge(Env::prefixed("PARALLAX_").split("_"))
            .extract()
            .map_err(|e| QueryError::Config(e.to_string()))
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &str) -> Result<Self, QueryError> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PARALLAX_").split("_"))
            .extract()
            .map_err(|e| QueryError::Config(e.to_string()))
    }
}

/// The dictionary and data tables of one signal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalTables {
    pub database: String,
    /// The key-dictionary table enumerated for field keys.
    pub dictionary_table: String,
    /// The data table whose DDL declares the materialised columns.
    pub table: String,
}

impl Default for SignalTables {
    fn default() -> Self {
        Self {
            database: DEFAULT_TRACES_DATABASE.to_owned(),
            dictionary_table: DEFAULT_TRACES_DICTIONARY_TABLE.to_owned(),
            table: DEFAULT_TRACES_TABLE.to_owned(),
        }
    }
}

impl SignalTables {
    /// Defaults for the logs signal.
    pub fn logs_default() -> Self {
        Self {
            database: DEFAULT_LOGS_DATABASE.to_owned(),
            dictionary_table: DEFAULT_LOGS_DICTIONARY_TABLE.to_owned(),
            table: DEFAULT_LOGS_TABLE.to_owned(),
        }
    }
}

/// Tables of the metrics signal; keys live in the labels column of the
/// time-series roll-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsTables {
    pub database: String,
    pub timeseries_table: String,
}

impl Default for MetricsTables {
    fn default() -> Self {
        Self {
            database: DEFAULT_METRICS_DATABASE.to_owned(),
            timeseries_table: DEFAULT_METRICS_TIMESERIES_TABLE.to_owned(),
        }
    }
}

/// The related-metadata roll-up queried for value completion.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelatedTables {
    pub database: String,
    pub table: String,
}

impl Default for RelatedTables {
    fn default() -> Self {
        Self {
            database: DEFAULT_RELATED_DATABASE.to_owned(),
            table: DEFAULT_RELATED_TABLE.to_owned(),
        }
    }
}

/// Enumeration limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Applied when no key selector supplies a limit.
    pub default_key_limit: usize,
    /// Applied to value enumeration queries.
    pub default_value_limit: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            default_key_limit: DEFAULT_KEY_LIMIT,
            default_value_limit: DEFAULT_VALUE_LIMIT,
        }
    }
}
