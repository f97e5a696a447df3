//! Field identity: signals, contexts, data types, keys, and selectors.
//!
//! A *field key* identifies a queryable field within a signal: its name, the
//! column family it lives in (the [`FieldContext`]), and its logical
//! [`FieldDataType`]. Selectors describe what the metadata store should
//! enumerate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Telemetry signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Trace spans.
    Traces,
    /// Log records.
    Logs,
    /// Metric time series.
    Metrics,
    /// No signal specified; enumeration unions all three.
    #[default]
    Unspecified,
}

impl Signal {
    /// Get the string representation for use in paths and diagnostics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Logs => "logs",
            Self::Metrics => "metrics",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The column family housing a field.
///
/// `Span`, `Log`, and `Metric` denote the fixed top-level columns of the
/// respective signal tables; the rest denote attribute maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldContext {
    Resource,
    Scope,
    Attribute,
    Event,
    Span,
    Log,
    Metric,
    Trace,
    #[default]
    Unspecified,
}

impl FieldContext {
    /// Parse a context name as written by users or stored in dictionary
    /// tables. Unrecognised names map to `Unspecified`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "resource" => Self::Resource,
            "scope" => Self::Scope,
            "tag" | "attribute" => Self::Attribute,
            "event" => Self::Event,
            "spanfield" | "span" => Self::Span,
            "logfield" | "log" => Self::Log,
            "metric" => Self::Metric,
            "trace" => Self::Trace,
            _ => Self::Unspecified,
        }
    }

    /// The `tag_type` representation used by the dictionary tables.
    pub const fn tag_type(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Scope => "scope",
            Self::Attribute => "tag",
            Self::Event => "event",
            Self::Span => "spanfield",
            Self::Log => "logfield",
            Self::Metric => "metric",
            Self::Trace => "trace",
            Self::Unspecified => "",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Scope => "scope",
            Self::Attribute => "attribute",
            Self::Event => "event",
            Self::Span => "span",
            Self::Log => "log",
            Self::Metric => "metric",
            Self::Trace => "trace",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The logical data type of a field's value.
///
/// `Number` is the normalised numeric kind; `Int64` and `Float64` are
/// absorbed into it for storage lookup, enrichment matching, and
/// shadow-column naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDataType {
    String,
    Bool,
    Int64,
    Float64,
    Number,
    #[default]
    Unspecified,
}

impl FieldDataType {
    /// Parse a data type name as written by users (`key:int`) or stored in
    /// dictionary tables. Unrecognised names map to `Unspecified`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "bool" => Self::Bool,
            "int" | "int64" => Self::Int64,
            "float" | "float64" => Self::Float64,
            "number" => Self::Number,
            _ => Self::Unspecified,
        }
    }

    /// Collapse the numeric variants into `Number`.
    pub const fn normalised(&self) -> Self {
        match self {
            Self::Int64 | Self::Float64 => Self::Number,
            other => *other,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64 | Self::Number)
    }

    /// The `tag_data_type` representation used by the dictionary tables.
    pub const fn tag_data_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int64 => "int64",
            Self::Float64 | Self::Number => "float64",
            Self::Unspecified => "",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Number => "number",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A queryable field within a signal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryFieldKey {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
    pub signal: Signal,
    pub field_context: FieldContext,
    pub field_data_type: FieldDataType,
    /// True iff the store declares a materialised shadow column for exactly
    /// this `(context, data type, name)` triple.
    #[serde(skip)]
    pub materialized: bool,
}

impl TelemetryFieldKey {
    /// Shorthand constructor for the common `(name, context, data type)`
    /// shape.
    pub fn new(
        name: impl Into<String>,
        field_context: FieldContext,
        field_data_type: FieldDataType,
    ) -> Self {
        Self {
            name: name.into(),
            field_context,
            field_data_type,
            ..Default::default()
        }
    }

    /// The shadow-column name for a materialised key:
    /// `{context}_{datatype}_{name}` with `.` in the name written as `$$`.
    ///
    /// The data type is normalised, so a key enumerated as `float64` still
    /// round-trips to the `_number_` column the DDL declares.
    pub fn materialised_column_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.field_context,
            self.field_data_type.normalised(),
            self.name.replace('.', "$$")
        )
    }

    /// Composite identity used when matching enumerated keys against
    /// materialised keys extracted from DDL.
    pub fn composite_identity(&self) -> String {
        format!(
            "{};{};{}",
            self.name,
            self.field_context,
            self.field_data_type.normalised()
        )
    }
}

/// How a selector's name should match against dictionary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorMatchType {
    /// Equality on the key name.
    #[default]
    Exact,
    /// Substring match on the key name.
    Fuzzy,
}

/// Restricts metric-signal key enumeration to the labels of named metrics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricContext {
    pub metric_names: Vec<String>,
}

/// Selects field keys to enumerate from the metadata store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldKeySelector {
    pub name: String,
    pub signal: Signal,
    pub field_context: FieldContext,
    pub field_data_type: FieldDataType,
    pub match_type: SelectorMatchType,
    /// Inclusive lower time bound in unix milliseconds; 0 means unbounded.
    pub start_unix_milli: i64,
    /// Inclusive upper time bound in unix milliseconds; 0 means unbounded.
    pub end_unix_milli: i64,
    /// Per-selector row limit; 0 falls back to the store default.
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_context: Option<MetricContext>,
}

impl FieldKeySelector {
    /// Exact-match selector for a plain key name.
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse the text of a KEY token into a selector.
    ///
    /// The first dot-separated part may name an explicit [`FieldContext`];
    /// the last part may carry an explicit `:datatype` suffix. Whatever is
    /// consumed is stripped from the canonical name:
    /// `resource.k8s.pod.name:string` selects `k8s.pod.name` with context
    /// `resource` and data type `string`.
    pub fn from_key_text(text: &str) -> Self {
        let mut remainder = text;

        let mut field_context = FieldContext::Unspecified;
        if let Some((head, rest)) = remainder.split_once('.') {
            let explicit = FieldContext::parse(head);
            if explicit != FieldContext::Unspecified {
                field_context = explicit;
                remainder = rest;
            }
        }

        let mut field_data_type = FieldDataType::Unspecified;
        let mut name = remainder;
        if let Some((head, suffix)) = remainder.rsplit_once(':') {
            let explicit = FieldDataType::parse(suffix);
            if explicit != FieldDataType::Unspecified {
                field_data_type = explicit;
                name = head;
            }
        }

        Self {
            name: name.to_owned(),
            field_context,
            field_data_type,
            ..Default::default()
        }
    }

    /// Bound the selector to a time range.
    pub fn time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_unix_milli = start.timestamp_millis();
        self.end_unix_milli = end.timestamp_millis();
        self
    }
}

/// Selects field values to enumerate from the metadata store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldValueSelector {
    pub name: String,
    pub signal: Signal,
    pub field_context: FieldContext,
    pub field_data_type: FieldDataType,
    /// Substring the returned values must contain; empty matches all.
    pub value: String,
    pub start_unix_milli: i64,
    pub end_unix_milli: i64,
    pub limit: usize,
}

/// Distinct values enumerated for a field, bucketed by runtime type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFieldValues {
    pub string_values: Vec<String>,
    pub bool_values: Vec<bool>,
    pub number_values: Vec<f64>,
}
