//! Per-signal condition builders.
//!
//! A condition builder knows the physical schema of one signal table: it
//! resolves a logical field key to a column, decides the left operand (bare
//! scalar name, `map['key']` subscript, or materialised shadow column), and
//! lowers `(key, operator, value)` to a SQL fragment against the
//! request-local [`SqlBuilder`].

pub mod logs;
pub mod metadata;
pub mod spans;

use crate::error::QueryError;
use crate::fields::{FieldDataType, TelemetryFieldKey};
use crate::schema::Column;
use crate::sql::SqlBuilder;
use crate::value::{FilterOperator, FilterValue};

/// Maps `(physical column, operator, value)` to a SQL fragment for one
/// signal.
pub trait ConditionBuilder: Send + Sync {
    /// Resolve the physical column housing the key.
    fn column(&self, key: &TelemetryFieldKey) -> Result<Column, QueryError>;

    /// The left operand naming the key in SQL: a scalar column name, a map
    /// subscript, or the materialised shadow column.
    fn field_reference(&self, key: &TelemetryFieldKey) -> Result<String, QueryError>;

    /// Build the condition fragment. `value` is absent for the exists
    /// operators.
    fn condition(
        &self,
        key: &TelemetryFieldKey,
        operator: FilterOperator,
        value: Option<&FilterValue>,
        sql: &mut SqlBuilder,
    ) -> Result<String, QueryError>;
}

/// The left operand for a key resolved to `column`: materialised keys use
/// their shadow column, map columns use a quoted subscript, scalars their
/// bare name.
pub(crate) fn map_aware_field_reference(column: &Column, key: &TelemetryFieldKey) -> String {
    if column.column_type.is_map() {
        if key.materialized {
            return key.materialised_column_name();
        }
        return format!("{}['{}']", column.name, key.name);
    }
    column.name.to_owned()
}

/// Rewrite the column side when the key's logical type and the value's
/// runtime type disagree, keeping the bound argument in its natural host
/// type so the driver marshals it correctly.
pub(crate) fn coerce_for_value(
    field: String,
    key_data_type: FieldDataType,
    value: Option<&FilterValue>,
) -> (String, Option<FilterValue>) {
    let Some(value) = value else {
        return (field, None);
    };

    match key_data_type.normalised() {
        FieldDataType::String => match value {
            FilterValue::Number(_) => (format!("toFloat64OrNull({field})"), Some(value.clone())),
            FilterValue::Bool(b) => (field, Some(FilterValue::String(b.to_string()))),
            FilterValue::Array(_) if value.is_numeric_array() => {
                (format!("toFloat64OrNull({field})"), Some(value.clone()))
            }
            _ => (field, Some(value.clone())),
        },
        FieldDataType::Number => match value {
            FilterValue::String(_) => (format!("toString({field})"), Some(value.clone())),
            _ => (field, Some(value.clone())),
        },
        FieldDataType::Bool => match value {
            FilterValue::String(_) => (format!("toString({field})"), Some(value.clone())),
            _ => (field, Some(value.clone())),
        },
        _ => (field, Some(value.clone())),
    }
}

/// Operator lowering shared by the span and log builders.
///
/// `field` has already been through [`coerce_for_value`]; `column` is only
/// consulted for the exists operators, whose semantics depend on the
/// column's shape.
pub(crate) fn lower_operator(
    column: &Column,
    key: &TelemetryFieldKey,
    field: &str,
    operator: FilterOperator,
    value: Option<FilterValue>,
    sql: &mut SqlBuilder,
) -> Result<String, QueryError> {
    let require_value = || value.clone().ok_or(QueryError::InValues);

    match operator {
        FilterOperator::Equal => Ok(sql.eq(field, require_value()?)),
        FilterOperator::NotEqual => Ok(sql.ne(field, require_value()?)),
        FilterOperator::GreaterThan => Ok(sql.gt(field, require_value()?)),
        FilterOperator::GreaterThanOrEq => Ok(sql.ge(field, require_value()?)),
        FilterOperator::LessThan => Ok(sql.lt(field, require_value()?)),
        FilterOperator::LessThanOrEq => Ok(sql.le(field, require_value()?)),

        FilterOperator::Like => Ok(sql.like(field, require_value()?)),
        FilterOperator::NotLike => Ok(sql.not_like(field, require_value()?)),
        FilterOperator::ILike | FilterOperator::Contains => Ok(sql.ilike(field, require_value()?)),
        FilterOperator::NotILike | FilterOperator::NotContains => {
            Ok(sql.not_ilike(field, require_value()?))
        }

        FilterOperator::Regexp => Ok(format!("(match({field}, {}))", sql.var(require_value()?))),
        FilterOperator::NotRegexp => {
            Ok(format!("(not match({field}, {}))", sql.var(require_value()?)))
        }

        FilterOperator::Between | FilterOperator::NotBetween => {
            let values = match value.clone() {
                Some(FilterValue::Array(values)) if values.len() == 2 => values,
                _ => return Err(QueryError::BetweenValues),
            };
            let mut pair = values.into_iter();
            let low = pair.next().expect("length checked");
            let high = pair.next().expect("length checked");
            if operator == FilterOperator::Between {
                Ok(sql.between(field, low, high))
            } else {
                Ok(sql.not_between(field, low, high))
            }
        }

        FilterOperator::In | FilterOperator::NotIn => {
            let values = match value.clone() {
                Some(FilterValue::Array(values)) => values,
                _ => return Err(QueryError::InValues),
            };
            if operator == FilterOperator::In {
                Ok(sql.in_list(field, values))
            } else {
                Ok(sql.not_in_list(field, values))
            }
        }

        FilterOperator::Exists | FilterOperator::NotExists => {
            lower_exists(column, key, field, operator, sql)
        }
    }
}

/// Exists semantics depend on the column shape: text scalars compare with
/// the empty string, numeric scalars with zero, maps use `mapContains`.
fn lower_exists(
    column: &Column,
    key: &TelemetryFieldKey,
    field: &str,
    operator: FilterOperator,
    sql: &mut SqlBuilder,
) -> Result<String, QueryError> {
    let exists = operator == FilterOperator::Exists;
    if column.column_type.is_text_scalar() {
        let empty = FilterValue::String(String::new());
        Ok(if exists {
            sql.ne(field, empty)
        } else {
            sql.eq(field, empty)
        })
    } else if column.column_type.is_numeric_scalar() {
        let zero = FilterValue::Number(0.0);
        Ok(if exists {
            sql.ne(field, zero)
        } else {
            sql.eq(field, zero)
        })
    } else if column.column_type.is_map() {
        let membership = format!("mapContains({}, '{}')", column.name, key.name);
        Ok(if exists {
            sql.eq(&membership, FilterValue::Bool(true))
        } else {
            sql.ne(&membership, FilterValue::Bool(true))
        })
    } else {
        Err(QueryError::OperatorUnsupported {
            operator: if exists { "exists" } else { "not exists" },
            column_type: column.column_type.to_string(),
        })
    }
}
