//! Recursive-descent parser for the filter expression grammar.
//!
//! Precedence, low to high: OR, AND (explicit or by juxtaposition), NOT,
//! comparison. Parentheses override. The full grammar is documented on
//! [`parse`].

use crate::error::SyntaxDiagnostic;
use crate::grammar::ast::{
    ArrayFunction, Comparison, ComparisonKind, Expr, FunctionCall, FunctionParam, Literal,
};
use crate::grammar::lexer::{Token, TokenKind};
use crate::value::FilterOperator;

/// Parse a token stream into a parse tree.
///
/// ```text
/// query       := orExpr EOF
/// orExpr      := andExpr ( OR andExpr )*
/// andExpr     := unary ( AND? unary )*          -- juxtaposition = AND
/// unary       := NOT? primary
/// primary     := '(' orExpr ')' | comparison | functionCall
///              | QUOTED_TEXT | KEY
/// comparison  := KEY op value
///              | KEY (NOT)? BETWEEN value AND value
///              | KEY (NOT)? IN ( '(' valueList ')' | '[' valueList ']' )
///              | KEY (NOT)? EXISTS
///              | KEY (NOT)? (REGEXP | CONTAINS) value
///              | KEY (LIKE | NOT LIKE | ILIKE | NOT ILIKE) value
/// functionCall:= (HAS|HASANY|HASALL|HASNONE) '(' param (',' param)* ')'
/// param       := KEY | value | '[' valueList ']'
/// value       := QUOTED_TEXT | NUMBER | BOOL | KEY
/// ```
///
/// A KEY in value position is an unquoted string literal, so
/// `service.name=redis` and `service.name="redis"` are the same filter.
///
/// Returns `Ok(None)` for an input containing no expression at all (only
/// whitespace). On failure the returned diagnostics carry the first-seen
/// offending token's position.
pub fn parse(tokens: &[Token]) -> Result<Option<Expr>, Vec<SyntaxDiagnostic>> {
    let mut parser = Parser { tokens, pos: 0 };

    if parser.peek_kind() == TokenKind::Eof {
        return Ok(None);
    }

    let expr = parser.parse_or().map_err(|d| vec![d])?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(vec![SyntaxDiagnostic::new(
            trailing.line,
            trailing.column,
            format!("unexpected token {}", describe_token(trailing)),
        )]);
    }
    Ok(Some(expr))
}

fn describe_token(token: &Token) -> String {
    if token.text.is_empty() {
        token.kind.describe().to_owned()
    } else {
        format!("`{}`", token.text)
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &'a Token {
        // The stream is always EOF-terminated.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn bump(&mut self) -> &'a Token {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, SyntaxDiagnostic> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.bump())
        } else {
            Err(SyntaxDiagnostic::new(
                token.line,
                token.column,
                format!(
                    "expected {}, found {}",
                    kind.describe(),
                    describe_token(token)
                ),
            ))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxDiagnostic> {
        let mut children = vec![self.parse_and()?];
        while self.peek_kind() == TokenKind::Or {
            self.bump();
            children.push(self.parse_and()?);
        }
        Ok(flatten(children, Expr::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxDiagnostic> {
        let mut children = vec![self.parse_unary()?];
        loop {
            if self.peek_kind() == TokenKind::And {
                self.bump();
                children.push(self.parse_unary()?);
            } else if self.starts_unary() {
                children.push(self.parse_unary()?);
            } else {
                break;
            }
        }
        Ok(flatten(children, Expr::And))
    }

    /// Whether the next token can begin a unary expression, for implicit
    /// conjunction.
    fn starts_unary(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::LParen
                | TokenKind::Not
                | TokenKind::Has
                | TokenKind::HasAny
                | TokenKind::HasAll
                | TokenKind::HasNone
                | TokenKind::QuotedText
                | TokenKind::Key
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxDiagnostic> {
        if self.peek_kind() == TokenKind::Not {
            self.bump();
            let inner = self.parse_primary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxDiagnostic> {
        let token = self.peek();
        match token.kind {
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Group(Box::new(inner)))
            }
            TokenKind::Has | TokenKind::HasAny | TokenKind::HasAll | TokenKind::HasNone => {
                self.parse_function_call()
            }
            TokenKind::QuotedText => {
                let text = self.bump();
                Ok(Expr::FullText(strip_quotes(&text.text)))
            }
            TokenKind::Key => self.parse_key_primary(),
            _ => Err(SyntaxDiagnostic::new(
                token.line,
                token.column,
                format!("unexpected token {}", describe_token(token)),
            )),
        }
    }

    /// A KEY begins either a comparison or, when no operator follows, a
    /// bare full-text term.
    fn parse_key_primary(&mut self) -> Result<Expr, SyntaxDiagnostic> {
        let key = self.bump().text.clone();

        let kind = match self.peek_kind() {
            TokenKind::Equals => Some(self.parse_binary(FilterOperator::Equal)?),
            TokenKind::NotEquals | TokenKind::Neq => {
                Some(self.parse_binary(FilterOperator::NotEqual)?)
            }
            TokenKind::Lt => Some(self.parse_binary(FilterOperator::LessThan)?),
            TokenKind::Le => Some(self.parse_binary(FilterOperator::LessThanOrEq)?),
            TokenKind::Gt => Some(self.parse_binary(FilterOperator::GreaterThan)?),
            TokenKind::Ge => Some(self.parse_binary(FilterOperator::GreaterThanOrEq)?),
            TokenKind::Like => Some(self.parse_binary(FilterOperator::Like)?),
            TokenKind::NotLike => Some(self.parse_binary(FilterOperator::NotLike)?),
            TokenKind::Ilike => Some(self.parse_binary(FilterOperator::ILike)?),
            TokenKind::NotIlike => Some(self.parse_binary(FilterOperator::NotILike)?),
            TokenKind::Regexp => Some(self.parse_binary(FilterOperator::Regexp)?),
            TokenKind::Contains => Some(self.parse_binary(FilterOperator::Contains)?),
            TokenKind::Between => Some(self.parse_between(false)?),
            TokenKind::In => Some(self.parse_in(false)?),
            TokenKind::Exists => {
                self.bump();
                Some(ComparisonKind::Exists { negated: false })
            }
            TokenKind::Not => match self.peek_kind_at(1) {
                TokenKind::Between => {
                    self.bump();
                    Some(self.parse_between(true)?)
                }
                TokenKind::In => {
                    self.bump();
                    Some(self.parse_in(true)?)
                }
                TokenKind::Exists => {
                    self.bump();
                    self.bump();
                    Some(ComparisonKind::Exists { negated: true })
                }
                TokenKind::Regexp => {
                    self.bump();
                    Some(self.parse_binary(FilterOperator::NotRegexp)?)
                }
                TokenKind::Contains => {
                    self.bump();
                    Some(self.parse_binary(FilterOperator::NotContains)?)
                }
                // `key NOT <something else>` leaves the NOT for the next
                // unary; the key itself is a full-text term.
                _ => None,
            },
            _ => None,
        };

        match kind {
            Some(kind) => Ok(Expr::Comparison(Comparison { key, kind })),
            None => Ok(Expr::BareKey(key)),
        }
    }

    fn parse_binary(&mut self, op: FilterOperator) -> Result<ComparisonKind, SyntaxDiagnostic> {
        self.bump();
        let value = self.parse_value()?;
        Ok(ComparisonKind::Binary { op, value })
    }

    fn parse_between(&mut self, negated: bool) -> Result<ComparisonKind, SyntaxDiagnostic> {
        self.bump();
        let low = self.parse_value()?;
        self.expect(TokenKind::And)?;
        let high = self.parse_value()?;
        Ok(ComparisonKind::Between { negated, low, high })
    }

    fn parse_in(&mut self, negated: bool) -> Result<ComparisonKind, SyntaxDiagnostic> {
        self.bump();
        let (open, close) = match self.peek_kind() {
            TokenKind::LBrack => (TokenKind::LBrack, TokenKind::RBrack),
            _ => (TokenKind::LParen, TokenKind::RParen),
        };
        self.expect(open)?;
        let values = self.parse_value_list(close)?;
        self.expect(close)?;
        Ok(ComparisonKind::In { negated, values })
    }

    fn parse_value_list(&mut self, close: TokenKind) -> Result<Vec<Literal>, SyntaxDiagnostic> {
        let mut values = Vec::new();
        if self.peek_kind() == close {
            return Ok(values);
        }
        values.push(self.parse_value()?);
        while self.peek_kind() == TokenKind::Comma {
            self.bump();
            values.push(self.parse_value()?);
        }
        Ok(values)
    }

    fn parse_value(&mut self) -> Result<Literal, SyntaxDiagnostic> {
        let token = self.peek();
        match token.kind {
            TokenKind::QuotedText => {
                let text = strip_quotes(&self.bump().text);
                Ok(Literal::String(text))
            }
            TokenKind::Number => {
                let token = self.bump();
                token.text.parse::<f64>().map(Literal::Number).map_err(|_| {
                    SyntaxDiagnostic::new(
                        token.line,
                        token.column,
                        format!("invalid number `{}`", token.text),
                    )
                })
            }
            TokenKind::Bool => {
                let token = self.bump();
                Ok(Literal::Bool(token.text.eq_ignore_ascii_case("true")))
            }
            // An unquoted bare word is a string value: `service.name=redis`.
            TokenKind::Key => Ok(Literal::String(self.bump().text.clone())),
            _ => Err(SyntaxDiagnostic::new(
                token.line,
                token.column,
                format!("expected a value, found {}", describe_token(token)),
            )),
        }
    }

    fn parse_function_call(&mut self) -> Result<Expr, SyntaxDiagnostic> {
        let function = match self.bump().kind {
            TokenKind::Has => ArrayFunction::Has,
            TokenKind::HasAny => ArrayFunction::HasAny,
            TokenKind::HasAll => ArrayFunction::HasAll,
            TokenKind::HasNone => ArrayFunction::HasNone,
            _ => unreachable!("caller checked the function token"),
        };
        self.expect(TokenKind::LParen)?;
        let mut params = vec![self.parse_function_param()?];
        while self.peek_kind() == TokenKind::Comma {
            self.bump();
            params.push(self.parse_function_param()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Call(FunctionCall { function, params }))
    }

    fn parse_function_param(&mut self) -> Result<FunctionParam, SyntaxDiagnostic> {
        match self.peek_kind() {
            TokenKind::Key => Ok(FunctionParam::Key(self.bump().text.clone())),
            TokenKind::LBrack => {
                self.bump();
                let values = self.parse_value_list(TokenKind::RBrack)?;
                self.expect(TokenKind::RBrack)?;
                Ok(FunctionParam::Array(values))
            }
            _ => Ok(FunctionParam::Literal(self.parse_value()?)),
        }
    }
}

fn flatten(mut children: Vec<Expr>, combine: fn(Vec<Expr>) -> Expr) -> Expr {
    if children.len() == 1 {
        children.remove(0)
    } else {
        combine(children)
    }
}

fn strip_quotes(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'').to_owned()
}
