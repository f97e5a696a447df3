//! The tree-walking compiler: parse tree → `WHERE` fragment + arguments.

use std::collections::HashMap;

use crate::conditions::ConditionBuilder;
use crate::error::QueryError;
use crate::fields::{FieldContext, FieldDataType, FieldKeySelector, TelemetryFieldKey};
use crate::grammar::ast::{
    ArrayFunction, Comparison, ComparisonKind, Expr, FunctionCall, FunctionParam, Literal,
};
use crate::grammar::lexer::{tokenize, TokenKind};
use crate::grammar::parser::parse;
use crate::sql::{and_conditions, or_conditions, SqlBuilder};
use crate::value::{FilterOperator, FilterValue};

/// The result of compiling a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    /// A SQL boolean expression with `?` placeholders. Empty iff the input
    /// contained no expression at all.
    pub fragment: String,
    /// Positional arguments, one per placeholder, in left-to-right textual
    /// order of the literals they came from.
    pub args: Vec<FilterValue>,
    /// Informational diagnostics (unknown keys, ambiguous keys) that did not
    /// change the emitted SQL.
    pub warnings: Vec<String>,
}

/// Replay the lexer over a query and collect a selector for every KEY token,
/// so the caller can fetch the whole field-key map in one metadata
/// round-trip.
pub fn selectors_from_query(query: &str) -> Result<Vec<FieldKeySelector>, QueryError> {
    let tokens = tokenize(query).map_err(QueryError::InvalidSyntax)?;
    Ok(tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Key)
        .map(|t| FieldKeySelector::from_key_text(&t.text))
        .collect())
}

/// Compile a filter expression into a parameterised `WHERE` fragment.
///
/// `field_keys` maps canonical key names to the physical keys the metadata
/// store resolved for them; when a name resolves to several keys the emitted
/// condition is the OR of one condition per key, in map order.
/// `full_text_column` is the request-scoped column that bare identifiers and
/// standalone quoted phrases match against.
///
/// A whitespace-only input compiles to an empty fragment with no arguments.
/// A query whose every condition vanished (all keys unknown) returns
/// [`QueryError::NoApplicableFields`].
#[tracing::instrument(skip_all, fields(query_len = query.len()))]
pub fn compile_where_clause(
    query: &str,
    field_keys: &HashMap<String, Vec<TelemetryFieldKey>>,
    condition_builder: &dyn ConditionBuilder,
    full_text_column: &TelemetryFieldKey,
) -> Result<CompiledFilter, QueryError> {
    let tokens = tokenize(query).map_err(QueryError::InvalidSyntax)?;
    let expr = parse(&tokens).map_err(QueryError::InvalidSyntax)?;

    let Some(expr) = expr else {
        return Ok(CompiledFilter {
            fragment: String::new(),
            args: Vec::new(),
            warnings: Vec::new(),
        });
    };

    let mut compiler = Compiler {
        field_keys,
        condition_builder,
        full_text_column,
        sql: SqlBuilder::new(),
        warnings: Vec::new(),
    };

    let fragment = compiler.visit(&expr)?;
    if fragment.is_empty() {
        return Err(QueryError::NoApplicableFields);
    }

    Ok(CompiledFilter {
        fragment,
        args: compiler.sql.into_args(),
        warnings: compiler.warnings,
    })
}

#[derive(Clone, Copy)]
enum Connective {
    And,
    Or,
}

/// Combine sibling conditions, dropping the ones that vanished. A lone
/// survivor passes through unchanged; two or more are wrapped by the
/// connective.
fn combine(mut conds: Vec<String>, connective: Connective) -> String {
    conds.retain(|c| !c.is_empty());
    match conds.len() {
        0 => String::new(),
        1 => conds.remove(0),
        _ => match connective {
            Connective::And => and_conditions(conds),
            Connective::Or => or_conditions(conds),
        },
    }
}

struct Compiler<'a> {
    field_keys: &'a HashMap<String, Vec<TelemetryFieldKey>>,
    condition_builder: &'a dyn ConditionBuilder,
    full_text_column: &'a TelemetryFieldKey,
    sql: SqlBuilder,
    warnings: Vec<String>,
}

impl Compiler<'_> {
    fn visit(&mut self, expr: &Expr) -> Result<String, QueryError> {
        match expr {
            Expr::Or(children) => {
                let conds = children
                    .iter()
                    .map(|c| self.visit(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(combine(conds, Connective::Or))
            }
            Expr::And(children) => {
                let conds = children
                    .iter()
                    .map(|c| self.visit(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(combine(conds, Connective::And))
            }
            Expr::Not(inner) => {
                let cond = self.visit(inner)?;
                if cond.is_empty() {
                    return Ok(String::new());
                }
                Ok(format!("NOT ({cond})"))
            }
            Expr::Group(inner) => {
                let cond = self.visit(inner)?;
                if cond.is_empty() {
                    return Ok(String::new());
                }
                Ok(format!("({cond})"))
            }
            Expr::Comparison(comparison) => self.visit_comparison(comparison),
            Expr::Call(call) => self.visit_call(call),
            Expr::FullText(phrase) => self.full_text_condition(phrase),
            Expr::BareKey(term) => self.full_text_condition(term),
        }
    }

    /// Resolve a KEY lexeme against the field-key map, honouring any
    /// explicit context or data type the user wrote.
    fn resolve_key(&mut self, key_text: &str) -> Vec<TelemetryFieldKey> {
        let selector = FieldKeySelector::from_key_text(key_text);
        let candidates = self
            .field_keys
            .get(&selector.name)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let resolved: Vec<TelemetryFieldKey> = candidates
            .iter()
            .filter(|k| {
                (selector.field_context == FieldContext::Unspecified
                    || k.field_context == selector.field_context)
                    && (selector.field_data_type == FieldDataType::Unspecified
                        || k.field_data_type.normalised()
                            == selector.field_data_type.normalised())
            })
            .cloned()
            .collect();

        if resolved.is_empty() {
            tracing::warn!(key = %selector.name, "filter key not found in metadata");
            self.warnings
                .push(format!("key `{}` not found", selector.name));
        } else if resolved.len() > 1 {
            self.warnings.push(format!(
                "key `{}` is ambiguous, found {} field context and data type combinations",
                selector.name,
                resolved.len()
            ));
        }

        resolved
    }

    fn visit_comparison(&mut self, comparison: &Comparison) -> Result<String, QueryError> {
        let keys = self.resolve_key(&comparison.key);
        if keys.is_empty() {
            // The enclosing connective short-circuits to its siblings.
            return Ok(String::new());
        }

        let (operator, value) = match &comparison.kind {
            ComparisonKind::Binary { op, value } => (*op, Some(FilterValue::from(value))),
            ComparisonKind::Between { negated, low, high } => (
                if *negated {
                    FilterOperator::NotBetween
                } else {
                    FilterOperator::Between
                },
                Some(FilterValue::Array(vec![
                    FilterValue::from(low),
                    FilterValue::from(high),
                ])),
            ),
            ComparisonKind::In { negated, values } => (
                if *negated {
                    FilterOperator::NotIn
                } else {
                    FilterOperator::In
                },
                Some(FilterValue::Array(
                    values.iter().map(FilterValue::from).collect(),
                )),
            ),
            ComparisonKind::Exists { negated } => (
                if *negated {
                    FilterOperator::NotExists
                } else {
                    FilterOperator::Exists
                },
                None,
            ),
        };

        let mut conds = Vec::with_capacity(keys.len());
        for key in &keys {
            conds.push(self.condition_builder.condition(
                key,
                operator,
                value.as_ref(),
                &mut self.sql,
            )?);
        }
        Ok(or_conditions(conds))
    }

    /// A standalone term or quoted phrase matches the configured full-text
    /// column as a single regular expression.
    fn full_text_condition(&mut self, phrase: &str) -> Result<String, QueryError> {
        self.condition_builder.condition(
            self.full_text_column,
            FilterOperator::Regexp,
            Some(&FilterValue::String(phrase.to_owned())),
            &mut self.sql,
        )
    }

    fn visit_call(&mut self, call: &FunctionCall) -> Result<String, QueryError> {
        let mut rendered = Vec::with_capacity(call.params.len());
        for param in &call.params {
            rendered.push(self.render_param(param)?);
        }
        let params = rendered.join(", ");

        Ok(match call.function {
            ArrayFunction::Has => format!("has({params})"),
            ArrayFunction::HasAny => format!("hasAny({params})"),
            ArrayFunction::HasAll => format!("hasAll({params})"),
            // The store has no hasNone; negate hasAny instead.
            ArrayFunction::HasNone => format!("not hasAny({params})"),
        })
    }

    fn render_param(&mut self, param: &FunctionParam) -> Result<String, QueryError> {
        match param {
            FunctionParam::Key(key_text) => {
                let selector = FieldKeySelector::from_key_text(key_text);
                let resolved = self
                    .field_keys
                    .get(&selector.name)
                    .and_then(|keys| keys.first());
                match resolved {
                    Some(key) => self.condition_builder.field_reference(key),
                    None => {
                        // Unresolvable array keys pass through verbatim.
                        self.warnings
                            .push(format!("key `{}` not found", selector.name));
                        Ok(selector.name)
                    }
                }
            }
            FunctionParam::Literal(literal) => {
                Ok(self.sql.var(FilterValue::from(literal)).to_owned())
            }
            FunctionParam::Array(values) => {
                let marks: Vec<String> = values
                    .iter()
                    .map(|v| self.sql.var(FilterValue::from(v)).to_owned())
                    .collect();
                Ok(format!("[{}]", marks.join(", ")))
            }
        }
    }
}
