//! Client abstraction over the columnar telemetry store.
//!
//! The metadata store needs exactly two operations: run a parameterised
//! query and fetch a table's `CREATE TABLE` statement. Implementations wrap
//! the actual store driver; tests use an in-memory fake.

use async_trait::async_trait;

use crate::error::QueryError;
use crate::value::FilterValue;

/// A single column value of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    String(String),
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Null,
}

impl StoreValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(pub Vec<StoreValue>);

impl Row {
    pub fn get(&self, index: usize) -> Option<&StoreValue> {
        self.0.get(index)
    }

    /// The string at `index`, or an error naming the column position.
    pub fn expect_str(&self, index: usize) -> Result<&str, QueryError> {
        self.get(index)
            .and_then(StoreValue::as_str)
            .ok_or_else(|| QueryError::Storage(format!("expected string at column {index}")))
    }

    pub fn expect_f64(&self, index: usize) -> Result<f64, QueryError> {
        self.get(index)
            .and_then(StoreValue::as_f64)
            .ok_or_else(|| QueryError::Storage(format!("expected number at column {index}")))
    }
}

/// Read-only access to the telemetry store, as required by the metadata
/// layer.
///
/// Implementations must be cancel-safe: dropping a returned future abandons
/// the request.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Execute a query with positional `?` arguments and return all rows.
    async fn query(&self, sql: &str, args: &[FilterValue]) -> Result<Vec<Row>, QueryError>;

    /// Fetch the `CREATE TABLE` statement of `database`.`table`.
    async fn show_create_table(&self, database: &str, table: &str)
        -> Result<String, QueryError>;
}
