//! Filter operators and the dynamic value type bound to placeholders.

use std::fmt;

/// The logical comparison operators a filter expression can apply to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,

    Like,
    NotLike,
    ILike,
    NotILike,

    Between,
    NotBetween,

    In,
    NotIn,

    Exists,
    NotExists,

    Regexp,
    NotRegexp,

    Contains,
    NotContains,
}

impl FilterOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEq => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEq => "<=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::ILike => "ilike",
            Self::NotILike => "not ilike",
            Self::Between => "between",
            Self::NotBetween => "not between",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Exists => "exists",
            Self::NotExists => "not exists",
            Self::Regexp => "regexp",
            Self::NotRegexp => "not regexp",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value flowing through the compiler: a literal from the query text or a
/// homogeneous sequence of literals.
///
/// Numbers are carried as `f64` regardless of how the store types the target
/// column; the driver marshals them when binding.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<FilterValue>),
}

impl FilterValue {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// True for an array whose every element is a number.
    pub fn is_numeric_array(&self) -> bool {
        match self {
            Self::Array(items) => items.iter().all(|v| matches!(v, Self::Number(_))),
            _ => false,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_array_detection() {
        let numbers = FilterValue::Array(vec![FilterValue::Number(1.0), FilterValue::Number(2.0)]);
        assert!(numbers.is_numeric_array());

        let mixed = FilterValue::Array(vec![FilterValue::Number(1.0), FilterValue::from("two")]);
        assert!(!mixed.is_numeric_array());

        assert!(!FilterValue::Number(1.0).is_numeric_array());
    }

    #[test]
    fn operator_display() {
        assert_eq!(FilterOperator::NotBetween.to_string(), "not between");
        assert_eq!(FilterOperator::GreaterThanOrEq.to_string(), ">=");
    }
}
