//! Parallax Filter - filter expression compiler for the Parallax
//! observability backend.
//!
//! This crate turns a human-written filter expression over traces, logs, and
//! metrics into a parameterised ClickHouse `WHERE` fragment plus a positional
//! argument vector, ready to be composed into a full aggregation query.
//!
//! ## Architecture
//!
//! ```text
//! filter text → Lexer → Parser → parse tree
//!                │                   │
//!                └─ key replay ──→ Metadata store (dictionary tables + DDL)
//!                                    │
//!                       field-key map▼
//!                              Compiler ──→ Condition builder (per signal)
//!                                    │
//!                                    ▼
//!                          (fragment, args, warnings)
//! ```
//!
//! The compiler never interpolates user-supplied literals: every literal in
//! the input surfaces as a `?` placeholder whose value is appended to the
//! argument vector in left-to-right textual order.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use parallax_filter::{
//!     compile_where_clause, FieldContext, FieldDataType, LogConditionBuilder,
//!     Signal, TelemetryFieldKey,
//! };
//!
//! let mut field_keys = HashMap::new();
//! field_keys.insert(
//!     "service.name".to_owned(),
//!     vec![TelemetryFieldKey {
//!         name: "service.name".to_owned(),
//!         signal: Signal::Logs,
//!         field_context: FieldContext::Resource,
//!         field_data_type: FieldDataType::String,
//!         ..Default::default()
//!     }],
//! );
//!
//! let body = TelemetryFieldKey {
//!     name: "body".to_owned(),
//!     signal: Signal::Logs,
//!     field_context: FieldContext::Log,
//!     field_data_type: FieldDataType::String,
//!     ..Default::default()
//! };
//!
//! let compiled = compile_where_clause(
//!     r#"service.name="redis""#,
//!     &field_keys,
//!     &LogConditionBuilder,
//!     &body,
//! )
//! .unwrap();
//!
//! assert_eq!(compiled.fragment, "(resources_string['service.name'] = ?)");
//! ```

pub mod conditions;
pub mod config;
pub mod error;
pub mod fields;
pub mod grammar;
pub mod metadata;
pub mod schema;
pub mod sql;
pub mod store;
pub mod value;

pub use conditions::logs::LogConditionBuilder;
pub use conditions::metadata::MetadataConditionBuilder;
pub use conditions::spans::SpanConditionBuilder;
pub use conditions::ConditionBuilder;
pub use config::MetadataConfig;
pub use error::{QueryError, SyntaxDiagnostic};
pub use fields::{
    FieldContext, FieldDataType, FieldKeySelector, FieldValueSelector, SelectorMatchType, Signal,
    TelemetryFieldKey, TelemetryFieldValues,
};
pub use grammar::compiler::{compile_where_clause, selectors_from_query, CompiledFilter};
pub use metadata::{FieldMetadata, TelemetryMetaStore};
pub use store::{Row, StoreValue, TelemetryStore};
pub use value::{FilterOperator, FilterValue};
