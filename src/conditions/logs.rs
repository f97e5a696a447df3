//! Condition builder for the logs table.
//!
//! Differs from the span builder in its fixed columns (severity, body, trace
//! correlation) and in scope handling: the reserved names resolve to the
//! scalar `scope_name`/`scope_version` columns, everything else in the scope
//! context goes to the `scope_string` map.

use crate::conditions::{
    coerce_for_value, lower_operator, map_aware_field_reference, ConditionBuilder,
};
use crate::error::QueryError;
use crate::fields::{FieldContext, FieldDataType, TelemetryFieldKey};
use crate::schema::{Column, ColumnType, MapValueType};
use crate::sql::SqlBuilder;
use crate::value::{FilterOperator, FilterValue};

const ATTRIBUTES_STRING: Column =
    Column::new("attributes_string", ColumnType::Map(MapValueType::String));
const ATTRIBUTES_NUMBER: Column =
    Column::new("attributes_number", ColumnType::Map(MapValueType::Int64));
const ATTRIBUTES_BOOL: Column =
    Column::new("attributes_bool", ColumnType::Map(MapValueType::Bool));
const RESOURCES_STRING: Column =
    Column::new("resources_string", ColumnType::Map(MapValueType::String));
const SCOPE_STRING: Column =
    Column::new("scope_string", ColumnType::Map(MapValueType::String));
const SCOPE_NAME: Column = Column::new("scope_name", ColumnType::String);
const SCOPE_VERSION: Column = Column::new("scope_version", ColumnType::String);

/// Fixed top-level columns of the logs table, addressable as log fields.
const LOG_COLUMNS: &[Column] = &[
    Column::new("ts_bucket_start", ColumnType::UInt64),
    Column::new("resource_fingerprint", ColumnType::String),
    Column::new("timestamp", ColumnType::UInt64),
    Column::new("observed_timestamp", ColumnType::UInt64),
    Column::new("id", ColumnType::String),
    Column::new("trace_id", ColumnType::String),
    Column::new("span_id", ColumnType::String),
    Column::new("trace_flags", ColumnType::UInt32),
    Column::new("severity_text", ColumnType::LowCardinalityString),
    Column::new("severity_number", ColumnType::UInt8),
    Column::new("body", ColumnType::String),
    Column::new("scope_name", ColumnType::String),
    Column::new("scope_version", ColumnType::String),
];

/// Condition builder for the logs signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConditionBuilder;

impl ConditionBuilder for LogConditionBuilder {
    fn column(&self, key: &TelemetryFieldKey) -> Result<Column, QueryError> {
        match key.field_context {
            FieldContext::Resource => Ok(RESOURCES_STRING),
            FieldContext::Scope => match key.name.as_str() {
                "name" | "scope.name" | "scope_name" => Ok(SCOPE_NAME),
                "version" | "scope.version" | "scope_version" => Ok(SCOPE_VERSION),
                _ => Ok(SCOPE_STRING),
            },
            FieldContext::Attribute => match key.field_data_type.normalised() {
                FieldDataType::String => Ok(ATTRIBUTES_STRING),
                FieldDataType::Number => Ok(ATTRIBUTES_NUMBER),
                FieldDataType::Bool => Ok(ATTRIBUTES_BOOL),
                _ => Err(QueryError::ColumnNotFound(key.name.clone())),
            },
            FieldContext::Log => LOG_COLUMNS
                .iter()
                .find(|c| c.name == key.name)
                .copied()
                .ok_or_else(|| QueryError::ColumnNotFound(key.name.clone())),
            _ => Err(QueryError::ColumnNotFound(key.name.clone())),
        }
    }

    fn field_reference(&self, key: &TelemetryFieldKey) -> Result<String, QueryError> {
        let column = self.column(key)?;
        Ok(map_aware_field_reference(&column, key))
    }

    fn condition(
        &self,
        key: &TelemetryFieldKey,
        operator: FilterOperator,
        value: Option<&FilterValue>,
        sql: &mut SqlBuilder,
    ) -> Result<String, QueryError> {
        let column = self.column(key)?;
        let field = map_aware_field_reference(&column, key);
        let (field, value) = coerce_for_value(field, key.field_data_type, value);
        lower_operator(&column, key, &field, operator, value, sql)
    }
}
