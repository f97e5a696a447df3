//! Condition builder for the related-metadata table.
//!
//! Used by the value-completion path, not the main compile path. Every
//! predicate is guarded by an outer `mapContains(map, ?)` so rows without
//! the key are never scanned. Only string-typed keys participate;
//! everything else quietly contributes no condition.

use crate::conditions::{map_aware_field_reference, ConditionBuilder};
use crate::error::QueryError;
use crate::fields::{FieldContext, FieldDataType, TelemetryFieldKey};
use crate::schema::{Column, ColumnType, MapValueType};
use crate::sql::{and_conditions, SqlBuilder};
use crate::value::{FilterOperator, FilterValue};

const RESOURCE_ATTRIBUTES: Column =
    Column::new("resource_attributes", ColumnType::Map(MapValueType::String));
const ATTRIBUTES: Column = Column::new("attributes", ColumnType::Map(MapValueType::String));

/// Condition builder for the related-metadata roll-up table.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataConditionBuilder;

impl ConditionBuilder for MetadataConditionBuilder {
    fn column(&self, key: &TelemetryFieldKey) -> Result<Column, QueryError> {
        match key.field_context {
            FieldContext::Resource => Ok(RESOURCE_ATTRIBUTES),
            FieldContext::Attribute => Ok(ATTRIBUTES),
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
        // Keys outside the two maps, or with a non-string type, cannot
        // narrow a related-values scan; contribute nothing.
        let Ok(column) = self.column(key) else {
            return Ok(String::new());
        };
        if key.field_data_type.normalised() != FieldDataType::String {
            return Ok(String::new());
        }
        let field = map_aware_field_reference(&column, key);

        // Key membership is the condition itself for the exists operators.
        if matches!(operator, FilterOperator::Exists | FilterOperator::NotExists) {
            let membership = format!("mapContains({}, '{}')", column.name, key.name);
            return Ok(if operator == FilterOperator::Exists {
                sql.eq(&membership, FilterValue::Bool(true))
            } else {
                sql.ne(&membership, FilterValue::Bool(true))
            });
        }

        if !matches!(
            operator,
            FilterOperator::Equal
                | FilterOperator::NotEqual
                | FilterOperator::Like
                | FilterOperator::NotLike
                | FilterOperator::ILike
                | FilterOperator::NotILike
                | FilterOperator::Contains
                | FilterOperator::NotContains
                | FilterOperator::Regexp
                | FilterOperator::NotRegexp
                | FilterOperator::In
                | FilterOperator::NotIn
        ) {
            return Ok(String::new());
        }

        let membership = format!(
            "mapContains({}, {})",
            column.name,
            sql.var(FilterValue::String(key.name.clone()))
        );

        let value = value.cloned();
        let require_value = || value.clone().ok_or(QueryError::InValues);

        let inner = match operator {
            FilterOperator::Equal => sql.eq(&field, require_value()?),
            FilterOperator::NotEqual => sql.ne(&field, require_value()?),
            FilterOperator::Like => sql.like(&field, require_value()?),
            FilterOperator::NotLike => sql.not_like(&field, require_value()?),
            FilterOperator::ILike | FilterOperator::Contains => {
                sql.ilike(&field, require_value()?)
            }
            FilterOperator::NotILike | FilterOperator::NotContains => {
                sql.not_ilike(&field, require_value()?)
            }
            FilterOperator::Regexp => {
                format!("match({field}, {})", sql.var(require_value()?))
            }
            FilterOperator::NotRegexp => {
                format!("not match({field}, {})", sql.var(require_value()?))
            }
            FilterOperator::In | FilterOperator::NotIn => {
                let values = match value.clone() {
                    Some(FilterValue::Array(values)) => values,
                    _ => return Err(QueryError::InValues),
                };
                if operator == FilterOperator::In {
                    sql.in_list(&field, values)
                } else {
                    sql.not_in_list(&field, values)
                }
            }
            _ => unreachable!("operator support checked above"),
        };

        Ok(and_conditions([membership, inner]))
    }
}
