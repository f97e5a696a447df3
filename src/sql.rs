//! Parameterised SQL assembly.
//!
//! [`SqlBuilder`] owns the placeholder discipline for one compile request:
//! every literal becomes a `?` in the emitted fragment and its value is
//! appended to the argument vector, so the vector's order is the
//! left-to-right textual order of the literals.
//!
//! The free functions combine already-built condition strings. Empty
//! conditions (a comparison whose key vanished from metadata) are skipped so
//! that the enclosing connective short-circuits to its surviving siblings.

use crate::value::FilterValue;

/// Request-local collector of placeholder arguments plus the condition
/// helpers that emit them.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    args: Vec<FilterValue>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, returning the placeholder that stands for it.
    pub fn var(&mut self, value: FilterValue) -> &'static str {
        self.args.push(value);
        "?"
    }

    /// Consume the builder, yielding the argument vector in bind order.
    pub fn into_args(self) -> Vec<FilterValue> {
        self.args
    }

    pub fn args(&self) -> &[FilterValue] {
        &self.args
    }

    pub fn eq(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} = {}", self.var(value))
    }

    pub fn ne(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} <> {}", self.var(value))
    }

    pub fn gt(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} > {}", self.var(value))
    }

    pub fn ge(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} >= {}", self.var(value))
    }

    pub fn lt(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} < {}", self.var(value))
    }

    pub fn le(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} <= {}", self.var(value))
    }

    pub fn like(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} LIKE {}", self.var(value))
    }

    pub fn not_like(&mut self, field: &str, value: FilterValue) -> String {
        format!("{field} NOT LIKE {}", self.var(value))
    }

    /// Case-insensitive pattern match, lowered for dialects without a native
    /// ILIKE.
    pub fn ilike(&mut self, field: &str, value: FilterValue) -> String {
        format!("LOWER({field}) LIKE LOWER({})", self.var(value))
    }

    pub fn not_ilike(&mut self, field: &str, value: FilterValue) -> String {
        format!("LOWER({field}) NOT LIKE LOWER({})", self.var(value))
    }

    pub fn between(&mut self, field: &str, low: FilterValue, high: FilterValue) -> String {
        format!("{field} BETWEEN {} AND {}", self.var(low), self.var(high))
    }

    pub fn not_between(&mut self, field: &str, low: FilterValue, high: FilterValue) -> String {
        format!(
            "{field} NOT BETWEEN {} AND {}",
            self.var(low),
            self.var(high)
        )
    }

    pub fn in_list(&mut self, field: &str, values: Vec<FilterValue>) -> String {
        format!("{field} IN ({})", self.placeholders(values))
    }

    pub fn not_in_list(&mut self, field: &str, values: Vec<FilterValue>) -> String {
        format!("{field} NOT IN ({})", self.placeholders(values))
    }

    fn placeholders(&mut self, values: Vec<FilterValue>) -> String {
        let marks: Vec<&str> = values.into_iter().map(|v| self.var(v)).collect();
        marks.join(", ")
    }
}

/// OR the given conditions, skipping empty ones. A non-empty result is always
/// parenthesised, matching the shape the outer query builder expects.
pub fn or_conditions<I, S>(conditions: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join_conditions(conditions, " OR ")
}

/// AND the given conditions, skipping empty ones. A non-empty result is
/// always parenthesised.
pub fn and_conditions<I, S>(conditions: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join_conditions(conditions, " AND ")
}

fn join_conditions<I, S>(conditions: I, separator: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<String> = conditions
        .into_iter()
        .map(|c| c.as_ref().to_owned())
        .filter(|c| !c.is_empty())
        .collect();
    if parts.is_empty() {
        return String::new();
    }
    format!("({})", parts.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_bind_in_order() {
        let mut sb = SqlBuilder::new();
        let a = sb.eq("name", "redis".into());
        let b = sb.gt("duration_nano", 100.0.into());
        assert_eq!(a, "name = ?");
        assert_eq!(b, "duration_nano > ?");
        assert_eq!(
            sb.into_args(),
            vec![FilterValue::from("redis"), FilterValue::from(100.0)]
        );
    }

    #[test]
    fn ilike_lowers_both_sides() {
        let mut sb = SqlBuilder::new();
        let cond = sb.ilike("attributes_string['user.id']", "%admin%".into());
        assert_eq!(
            cond,
            "LOWER(attributes_string['user.id']) LIKE LOWER(?)"
        );
    }

    #[test]
    fn between_binds_two_args() {
        let mut sb = SqlBuilder::new();
        let cond = sb.between("status_code", 200.0.into(), 300.0.into());
        assert_eq!(cond, "status_code BETWEEN ? AND ?");
        assert_eq!(sb.args().len(), 2);
    }

    #[test]
    fn in_list_emits_one_placeholder_per_value() {
        let mut sb = SqlBuilder::new();
        let cond = sb.in_list(
            "severity_text",
            vec!["error".into(), "fatal".into(), "critical".into()],
        );
        assert_eq!(cond, "severity_text IN (?, ?, ?)");
        assert_eq!(sb.args().len(), 3);
    }

    #[test]
    fn or_wraps_even_single_condition() {
        assert_eq!(or_conditions(["a = ?"]), "(a = ?)");
        assert_eq!(or_conditions(["a = ?", "b = ?"]), "(a = ? OR b = ?)");
    }

    #[test]
    fn connectives_skip_empty_conditions() {
        assert_eq!(and_conditions(["", "a = ?"]), "(a = ?)");
        assert_eq!(or_conditions(["", ""]), "");
        assert_eq!(
            and_conditions(["(x = ?)", "", "(y = ?)"]),
            "((x = ?) AND (y = ?))"
        );
    }
}
