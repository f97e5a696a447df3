//! Physical column model for the signal tables.
//!
//! The condition builders resolve every logical field key to one of these
//! columns; the column's shape (scalar, map, array) decides how an operator
//! is lowered.

use std::fmt;

/// Value type of an attribute map. Keys are always
/// `LowCardinality(String)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapValueType {
    String,
    Int64,
    Float64,
    /// Stored as UInt8 in the table.
    Bool,
}

/// The column types the signal tables use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    LowCardinalityString,
    UInt8,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int64,
    Float64,
    Map(MapValueType),
    ArrayString,
}

impl ColumnType {
    /// Scalar text columns, where exists means "not the empty string".
    pub const fn is_text_scalar(&self) -> bool {
        matches!(self, Self::String | Self::LowCardinalityString)
    }

    /// Scalar numeric columns, where exists means "not zero".
    pub const fn is_numeric_scalar(&self) -> bool {
        matches!(
            self,
            Self::UInt8
                | Self::UInt32
                | Self::UInt64
                | Self::Int8
                | Self::Int16
                | Self::Int64
                | Self::Float64
        )
    }

    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "String"),
            Self::LowCardinalityString => write!(f, "LowCardinality(String)"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Map(MapValueType::String) => {
                write!(f, "Map(LowCardinality(String), String)")
            }
            Self::Map(MapValueType::Int64) => {
                write!(f, "Map(LowCardinality(String), Int64)")
            }
            Self::Map(MapValueType::Float64) => {
                write!(f, "Map(LowCardinality(String), Float64)")
            }
            Self::Map(MapValueType::Bool) => {
                write!(f, "Map(LowCardinality(String), Bool)")
            }
            Self::ArrayString => write!(f, "Array(String)"),
        }
    }
}

/// A physical column of a signal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_shape_predicates() {
        assert!(ColumnType::String.is_text_scalar());
        assert!(ColumnType::LowCardinalityString.is_text_scalar());
        assert!(ColumnType::UInt64.is_numeric_scalar());
        assert!(ColumnType::Int16.is_numeric_scalar());
        assert!(!ColumnType::Map(MapValueType::String).is_text_scalar());
        assert!(ColumnType::Map(MapValueType::Bool).is_map());
        assert!(!ColumnType::ArrayString.is_map());
    }

    #[test]
    fn type_display_matches_store_syntax() {
        assert_eq!(
            ColumnType::Map(MapValueType::Float64).to_string(),
            "Map(LowCardinality(String), Float64)"
        );
        assert_eq!(ColumnType::LowCardinalityString.to_string(), "LowCardinality(String)");
    }
}
