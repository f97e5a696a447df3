//! Tokeniser for the filter expression language.
//!
//! Whitespace separates tokens and is never emitted. Keywords are
//! case-insensitive. `NOT LIKE` and `NOT ILIKE` are recognised as single
//! tokens; the remaining `NOT`-prefixed operators are assembled by the
//! parser.

use crate::error::SyntaxDiagnostic;

/// Token kinds of the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBrack,
    RBrack,
    Comma,

    Equals,
    NotEquals,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    Like,
    NotLike,
    Ilike,
    NotIlike,
    Between,
    Exists,
    Regexp,
    Contains,
    In,
    Not,
    And,
    Or,

    Has,
    HasAny,
    HasAll,
    HasNone,

    Bool,
    Number,
    QuotedText,
    Key,

    Eof,
}

impl TokenKind {
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBrack => "`[`",
            Self::RBrack => "`]`",
            Self::Comma => "`,`",
            Self::Equals => "`=`",
            Self::NotEquals => "`!=`",
            Self::Neq => "`<>`",
            Self::Lt => "`<`",
            Self::Le => "`<=`",
            Self::Gt => "`>`",
            Self::Ge => "`>=`",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::Ilike => "ILIKE",
            Self::NotIlike => "NOT ILIKE",
            Self::Between => "BETWEEN",
            Self::Exists => "EXISTS",
            Self::Regexp => "REGEXP",
            Self::Contains => "CONTAINS",
            Self::In => "IN",
            Self::Not => "NOT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Has => "has",
            Self::HasAny => "hasAny",
            Self::HasAll => "hasAll",
            Self::HasNone => "hasNone",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::QuotedText => "quoted string",
            Self::Key => "key",
            Self::Eof => "end of input",
        }
    }
}

/// A token with its text and source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The raw lexeme. Quoted strings keep their quotes; value extraction
    /// strips them later.
    pub text: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column, in characters.
    pub column: u32,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// Characters a KEY token may contain after its first character. `[` is
/// accepted only as part of an embedded `[digits]` / `[]` index so that the
/// standalone array brackets of `IN [...]` still lex as punctuation.
fn is_key_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/' | ':' | '*' | '#' | '@')
}

fn is_key_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

struct Cursor<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|&(_, c)| c)
    }

    fn byte_offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.input.len(), |&(i, _)| i)
    }

    fn bump(&mut self) -> Option<char> {
        let &(_, c) = self.chars.get(self.pos)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }
}

/// Tokenise the input, returning the token stream terminated by an EOF
/// token.
///
/// All lexical problems (illegal characters, unterminated strings) are
/// collected; if any occurred the diagnostics are returned instead of the
/// tokens, in source order.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Vec<SyntaxDiagnostic>> {
    let mut cursor = Cursor::new(input);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    loop {
        while matches!(cursor.peek(), Some(c) if c.is_whitespace()) {
            cursor.bump();
        }

        let start = cursor.byte_offset();
        let line = cursor.line;
        let column = cursor.column;

        let Some(c) = cursor.peek() else {
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line,
                column,
                start,
                end: start,
            });
            break;
        };

        let kind = match c {
            '(' => {
                cursor.bump();
                TokenKind::LParen
            }
            ')' => {
                cursor.bump();
                TokenKind::RParen
            }
            '[' => {
                cursor.bump();
                TokenKind::LBrack
            }
            ']' => {
                cursor.bump();
                TokenKind::RBrack
            }
            ',' => {
                cursor.bump();
                TokenKind::Comma
            }
            '=' => {
                cursor.bump();
                TokenKind::Equals
            }
            '!' => {
                cursor.bump();
                if cursor.peek() == Some('=') {
                    cursor.bump();
                    TokenKind::NotEquals
                } else {
                    diagnostics.push(SyntaxDiagnostic::new(
                        line,
                        column,
                        "unexpected character `!`",
                    ));
                    continue;
                }
            }
            '<' => {
                cursor.bump();
                match cursor.peek() {
                    Some('=') => {
                        cursor.bump();
                        TokenKind::Le
                    }
                    Some('>') => {
                        cursor.bump();
                        TokenKind::Neq
                    }
                    _ => TokenKind::Lt,
                }
            }
            '>' => {
                cursor.bump();
                if cursor.peek() == Some('=') {
                    cursor.bump();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '\'' | '"' => {
                let quote = c;
                cursor.bump();
                let mut terminated = false;
                while let Some(next) = cursor.peek() {
                    cursor.bump();
                    if next == quote {
                        terminated = true;
                        break;
                    }
                }
                if terminated {
                    TokenKind::QuotedText
                } else {
                    diagnostics.push(SyntaxDiagnostic::new(
                        line,
                        column,
                        "unterminated string literal",
                    ));
                    continue;
                }
            }
            '-' => {
                if matches!(cursor.peek_at(1), Some(d) if d.is_ascii_digit()) {
                    lex_number(&mut cursor);
                    TokenKind::Number
                } else {
                    cursor.bump();
                    diagnostics.push(SyntaxDiagnostic::new(
                        line,
                        column,
                        "unexpected character `-`",
                    ));
                    continue;
                }
            }
            c if c.is_ascii_digit() => {
                lex_number(&mut cursor);
                TokenKind::Number
            }
            c if is_key_start(c) => lex_word(&mut cursor),
            other => {
                cursor.bump();
                diagnostics.push(SyntaxDiagnostic::new(
                    line,
                    column,
                    format!("unexpected character `{other}`"),
                ));
                continue;
            }
        };

        let end = cursor.byte_offset();
        tokens.push(Token {
            kind,
            text: cursor.slice(start, end).to_owned(),
            line,
            column,
            start,
            end,
        });
    }

    if diagnostics.is_empty() {
        Ok(tokens)
    } else {
        Err(diagnostics)
    }
}

fn lex_number(cursor: &mut Cursor<'_>) {
    if cursor.peek() == Some('-') {
        cursor.bump();
    }
    while matches!(cursor.peek(), Some(d) if d.is_ascii_digit()) {
        cursor.bump();
    }
    if cursor.peek() == Some('.') && matches!(cursor.peek_at(1), Some(d) if d.is_ascii_digit()) {
        cursor.bump();
        while matches!(cursor.peek(), Some(d) if d.is_ascii_digit()) {
            cursor.bump();
        }
    }
}

/// Lex an identifier-shaped run, then classify it as a keyword, boolean, or
/// KEY. A `NOT` immediately followed by `LIKE`/`ILIKE` fuses into the
/// two-word token.
fn lex_word(cursor: &mut Cursor<'_>) -> TokenKind {
    let word_start = cursor.byte_offset();
    consume_key_chars(cursor);
    let word = cursor.slice(word_start, cursor.byte_offset()).to_owned();
    let lowered = word.to_ascii_lowercase();

    match lowered.as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "in" => TokenKind::In,
        "between" => TokenKind::Between,
        "exists" => TokenKind::Exists,
        "regexp" => TokenKind::Regexp,
        "contains" => TokenKind::Contains,
        "like" => TokenKind::Like,
        "ilike" => TokenKind::Ilike,
        "has" => TokenKind::Has,
        "hasany" => TokenKind::HasAny,
        "hasall" => TokenKind::HasAll,
        "hasnone" => TokenKind::HasNone,
        "true" | "false" => TokenKind::Bool,
        "not" => {
            // Fuse `NOT LIKE` / `NOT ILIKE` into one token, leaving any other
            // continuation for the parser.
            let mut lookahead = 0;
            while matches!(cursor.peek_at(lookahead), Some(c) if c.is_whitespace()) {
                lookahead += 1;
            }
            let mut next_word = String::new();
            let mut i = lookahead;
            while let Some(c) = cursor.peek_at(i) {
                if is_key_continue(c) {
                    next_word.push(c.to_ascii_lowercase());
                    i += 1;
                } else {
                    break;
                }
            }
            match next_word.as_str() {
                "like" => {
                    for _ in 0..i {
                        cursor.bump();
                    }
                    TokenKind::NotLike
                }
                "ilike" => {
                    for _ in 0..i {
                        cursor.bump();
                    }
                    TokenKind::NotIlike
                }
                _ => TokenKind::Not,
            }
        }
        _ => TokenKind::Key,
    }
}

fn consume_key_chars(cursor: &mut Cursor<'_>) {
    while let Some(c) = cursor.peek() {
        if is_key_continue(c) {
            cursor.bump();
        } else if c == '[' {
            // Accept an embedded `[digits]` or `[]` index, as in `body[0]`
            // or `proto.user_objects[].name`.
            let mut i = 1;
            while matches!(cursor.peek_at(i), Some(d) if d.is_ascii_digit()) {
                i += 1;
            }
            if cursor.peek_at(i) == Some(']') {
                for _ in 0..=i {
                    cursor.bump();
                }
            } else {
                break;
            }
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_comparison() {
        assert_eq!(
            kinds(r#"service.name="redis""#),
            vec![
                TokenKind::Key,
                TokenKind::Equals,
                TokenKind::QuotedText,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("a BETWEEN 1 AND 2 or b In (3)"),
            vec![
                TokenKind::Key,
                TokenKind::Between,
                TokenKind::Number,
                TokenKind::And,
                TokenKind::Number,
                TokenKind::Or,
                TokenKind::Key,
                TokenKind::In,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn not_like_fuses() {
        assert_eq!(
            kinds(r#"email not like "%corp.example%""#),
            vec![
                TokenKind::Key,
                TokenKind::NotLike,
                TokenKind::QuotedText,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("user.name NOT ILIKE '%ops%'"),
            vec![
                TokenKind::Key,
                TokenKind::NotIlike,
                TokenKind::QuotedText,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn not_before_key_stays_bare() {
        // `like_count` must not be mistaken for the LIKE keyword.
        assert_eq!(
            kinds("not like_count = 5"),
            vec![
                TokenKind::Not,
                TokenKind::Key,
                TokenKind::Equals,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn not_in_stays_two_tokens() {
        assert_eq!(
            kinds("service.name not in (\"redis\")"),
            vec![
                TokenKind::Key,
                TokenKind::Not,
                TokenKind::In,
                TokenKind::LParen,
                TokenKind::QuotedText,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keys_accept_dotted_paths_and_indexes() {
        let tokens = tokenize("proto.user_objects[].name body[0] http.status_code").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Key);
        assert_eq!(tokens[0].text, "proto.user_objects[].name");
        assert_eq!(tokens[1].kind, TokenKind::Key);
        assert_eq!(tokens[1].text, "body[0]");
        assert_eq!(tokens[2].kind, TokenKind::Key);
        assert_eq!(tokens[2].text, "http.status_code");
    }

    #[test]
    fn array_brackets_lex_as_punctuation() {
        assert_eq!(
            kinds("tags in [\"a\", \"b\"]"),
            vec![
                TokenKind::Key,
                TokenKind::In,
                TokenKind::LBrack,
                TokenKind::QuotedText,
                TokenKind::Comma,
                TokenKind::QuotedText,
                TokenKind::RBrack,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn numbers_signed_and_fractional() {
        let tokens = tokenize("-3.5 200 1.25").unwrap();
        assert_eq!(tokens[0].text, "-3.5");
        assert_eq!(tokens[1].text, "200");
        assert_eq!(tokens[2].text, "1.25");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn booleans() {
        assert_eq!(
            kinds("paid_user = TRUE"),
            vec![
                TokenKind::Key,
                TokenKind::Equals,
                TokenKind::Bool,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn quoted_text_keeps_quotes_in_lexeme() {
        let tokens = tokenize(r#""waiting for response""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::QuotedText);
        assert_eq!(tokens[0].text, r#""waiting for response""#);
    }

    #[test]
    fn single_quotes_accepted() {
        let tokens = tokenize("body like '%gmail.com%'").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::QuotedText);
        assert_eq!(tokens[2].text, "'%gmail.com%'");
    }

    #[test]
    fn unterminated_string_is_diagnosed() {
        let diags = tokenize(r#"service.name = "redis"#).unwrap_err();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 1);
        assert_eq!(diags[0].column, 16);
        assert!(diags[0].message.contains("unterminated"));
    }

    #[test]
    fn illegal_character_is_diagnosed_with_position() {
        let diags = tokenize("a = 1 ; b = 2").unwrap_err();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].column, 7);
        assert!(diags[0].message.contains('`'));
    }

    #[test]
    fn positions_track_lines() {
        let tokens = tokenize("a = 1\nAND b = 2").unwrap();
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!(b.line, 2);
        assert_eq!(b.column, 5);
    }

    #[test]
    fn whitespace_only_input_yields_only_eof() {
        let tokens = tokenize("   \n\t ").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }
}
