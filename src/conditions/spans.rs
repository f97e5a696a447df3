//! Condition builder for the spans table.
//!
//! Resolves resource attributes to the `resources_string` map, typed
//! attributes to their respective maps, and span fields to the table's fixed
//! top-level columns, including the materialised shadow columns the span
//! schema ships with. The span table carries no scope columns.

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
    Column::new("attributes_number", ColumnType::Map(MapValueType::Float64));
const ATTRIBUTES_BOOL: Column =
    Column::new("attributes_bool", ColumnType::Map(MapValueType::Bool));
const RESOURCES_STRING: Column =
    Column::new("resources_string", ColumnType::Map(MapValueType::String));

/// Fixed top-level columns of the spans table, addressable as span fields.
const SPAN_COLUMNS: &[Column] = &[
    Column::new("ts_bucket_start", ColumnType::UInt64),
    Column::new("resource_fingerprint", ColumnType::String),
    Column::new("timestamp", ColumnType::UInt64),
    Column::new("trace_id", ColumnType::String),
    Column::new("span_id", ColumnType::String),
    Column::new("trace_state", ColumnType::String),
    Column::new("parent_span_id", ColumnType::String),
    Column::new("flags", ColumnType::UInt32),
    Column::new("name", ColumnType::String),
    Column::new("kind", ColumnType::Int8),
    Column::new("kind_string", ColumnType::String),
    Column::new("duration_nano", ColumnType::UInt64),
    Column::new("status_code", ColumnType::Int16),
    Column::new("status_message", ColumnType::String),
    Column::new("status_code_string", ColumnType::String),
    Column::new("events", ColumnType::ArrayString),
    Column::new("links", ColumnType::String),
    Column::new("response_status_code", ColumnType::String),
    Column::new("external_http_url", ColumnType::String),
    Column::new("http_url", ColumnType::String),
    Column::new("external_http_method", ColumnType::String),
    Column::new("http_method", ColumnType::String),
    Column::new("http_host", ColumnType::String),
    Column::new("db_name", ColumnType::String),
    Column::new("db_operation", ColumnType::String),
    Column::new("has_error", ColumnType::UInt8),
    Column::new("is_remote", ColumnType::String),
    // Materialised shadow columns declared by the span schema.
    Column::new("resource_string_service$$name", ColumnType::String),
    Column::new("attribute_string_http$$route", ColumnType::String),
    Column::new("attribute_string_messaging$$system", ColumnType::String),
    Column::new("attribute_string_messaging$$operation", ColumnType::String),
    Column::new("attribute_string_db$$system", ColumnType::String),
    Column::new("attribute_string_rpc$$system", ColumnType::String),
    Column::new("attribute_string_rpc$$service", ColumnType::String),
    Column::new("attribute_string_rpc$$method", ColumnType::String),
    Column::new("attribute_string_peer$$service", ColumnType::String),
    Column::new("resource_string_service$$name_exists", ColumnType::UInt8),
    Column::new("attribute_string_http$$route_exists", ColumnType::UInt8),
    Column::new("attribute_string_messaging$$system_exists", ColumnType::UInt8),
    Column::new("attribute_string_messaging$$operation_exists", ColumnType::UInt8),
    Column::new("attribute_string_db$$system_exists", ColumnType::UInt8),
    Column::new("attribute_string_rpc$$system_exists", ColumnType::UInt8),
    Column::new("attribute_string_rpc$$service_exists", ColumnType::UInt8),
    Column::new("attribute_string_rpc$$method_exists", ColumnType::UInt8),
    Column::new("attribute_string_peer$$service_exists", ColumnType::UInt8),
];

/// Condition builder for the traces signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanConditionBuilder;

impl ConditionBuilder for SpanConditionBuilder {
    fn column(&self, key: &TelemetryFieldKey) -> Result<Column, QueryError> {
        match key.field_context {
            FieldContext::Resource => Ok(RESOURCES_STRING),
            FieldContext::Attribute => match key.field_data_type.normalised() {
                FieldDataType::String => Ok(ATTRIBUTES_STRING),
                FieldDataType::Number => Ok(ATTRIBUTES_NUMBER),
                FieldDataType::Bool => Ok(ATTRIBUTES_BOOL),
                _ => Err(QueryError::ColumnNotFound(key.name.clone())),
            },
            FieldContext::Span => SPAN_COLUMNS
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
