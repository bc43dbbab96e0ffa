//! Recursive-descent parser for the expression language.
//!
//! Binary operators form flat left-to-right chains without precedence:
//! `3 + 4 * 5` parses as `(3 + 4) * 5`. Parentheses are the only way to
//! group differently.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{Expression, ExpressionBuilder, LiteralKind, NodeId, NodeKind};
use crate::expression::operator::{is_operator_symbol, BinaryOperator, MAX_SYMBOL_LEN};

/// Expression parser configured with extra identifier characters.
///
/// Identifiers start with a letter, `_` or an additional character and
/// continue with letters, digits, `_`, `.` or additional characters.
#[derive(Debug, Clone, Default)]
pub struct ExpressionParser {
    additional_identifier_chars: Vec<char>,
}

/// Result of [`ExpressionParser::parse_partial`]
#[derive(Debug, Clone, PartialEq)]
pub struct PartialParse {
    pub expression: Expression,
    /// The consumed prefix, trimmed
    pub parsed: String,
    /// Everything after the consumed prefix, starting at the first non-space character
    pub remainder: String,
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier_chars(chars: impl IntoIterator<Item = char>) -> Self {
        Self {
            additional_identifier_chars: chars.into_iter().collect(),
        }
    }

    pub fn additional_identifier_chars(&self) -> &[char] {
        &self.additional_identifier_chars
    }

    /// Parses the whole text as one expression.
    pub fn parse(&self, text: &str) -> ExpressionResult<Expression> {
        let mut cursor = Cursor::new(self, text, false);
        cursor.skip_whitespace();
        if cursor.current().is_none() {
            return Err(cursor.error("empty expression"));
        }
        let root = cursor.parse_chain(Context::Root)?;
        Ok(cursor.builder.finish(root))
    }

    /// Parses the longest prefix that forms a complete expression and stops at
    /// the first top-level token that cannot continue it (a comma, an
    /// unmatched `)` or a word such as `AS`).
    pub fn parse_partial(&self, text: &str) -> ExpressionResult<PartialParse> {
        let mut cursor = Cursor::new(self, text, true);
        cursor.skip_whitespace();
        if cursor.current().is_none() {
            return Err(cursor.error("empty expression"));
        }
        let root = cursor.parse_chain(Context::Root)?;
        let parsed: String = cursor.chars[..cursor.position].iter().collect();
        let remainder: String = cursor.chars[cursor.position..].iter().collect();
        Ok(PartialParse {
            expression: cursor.builder.finish(root),
            parsed: parsed.trim().to_string(),
            remainder,
        })
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_alphabetic() || ch == '_' || self.additional_identifier_chars.contains(&ch)
    }

    fn is_identifier_body(&self, ch: char) -> bool {
        ch.is_alphanumeric()
            || ch == '_'
            || ch == '.'
            || self.additional_identifier_chars.contains(&ch)
    }
}

/// Where a chain is being parsed; decides which characters end it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Root,
    Group,
    Arguments,
}

struct Cursor<'p> {
    parser: &'p ExpressionParser,
    text: String,
    chars: Vec<char>,
    position: usize,
    partial: bool,
    builder: ExpressionBuilder,
}

impl<'p> Cursor<'p> {
    fn new(parser: &'p ExpressionParser, text: &str, partial: bool) -> Self {
        Self {
            parser,
            text: text.to_string(),
            chars: text.chars().collect(),
            position: 0,
            partial,
            builder: ExpressionBuilder::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, reason: impl Into<String>) -> ExpressionError {
        ExpressionError::malformed(self.text.clone(), reason)
    }

    /// operand (operator operand)*
    fn parse_chain(&mut self, context: Context) -> ExpressionResult<NodeId> {
        let mut left = self.parse_operand()?;

        loop {
            self.skip_whitespace();
            let Some(ch) = self.current() else {
                break;
            };

            match (ch, context) {
                (')', Context::Group) | (')', Context::Arguments) | (',', Context::Arguments) => {
                    break
                }
                _ => {}
            }

            match self.read_operator() {
                Some(op) => {
                    let right = self.parse_operand()?;
                    left = self.builder.binary(op, left, right);
                }
                None if context == Context::Root && self.partial => break,
                None => return Err(self.unexpected(ch)),
            }
        }

        Ok(left)
    }

    fn unexpected(&self, ch: char) -> ExpressionError {
        match ch {
            ')' => self.error(format!("unmatched ')' at position {}", self.position)),
            ',' => self.error(format!("unexpected ',' at position {}", self.position)),
            _ => {
                let rest: String = self.chars[self.position..].iter().take(10).collect();
                self.error(format!(
                    "unknown operator at position {} near '{}'",
                    self.position, rest
                ))
            }
        }
    }

    /// Matches the longest symbolic operator, then the word operators.
    /// Leaves the position untouched when nothing matches.
    fn read_operator(&mut self) -> Option<BinaryOperator> {
        for len in (1..=MAX_SYMBOL_LEN).rev() {
            if self.position + len > self.chars.len() {
                continue;
            }
            let candidate: String = self.chars[self.position..self.position + len]
                .iter()
                .collect();
            if is_operator_symbol(&candidate) {
                self.position += len;
                return BinaryOperator::from_symbol(&candidate);
            }
        }

        let word = self.peek_word()?;
        let op = BinaryOperator::from_symbol(&word)?;
        self.position += word.chars().count();
        Some(op)
    }

    fn peek_word(&self) -> Option<String> {
        let first = self.current()?;
        if !first.is_alphabetic() {
            return None;
        }
        let word: String = self.chars[self.position..]
            .iter()
            .take_while(|c| self.parser.is_identifier_body(**c))
            .collect();
        Some(word)
    }

    fn parse_operand(&mut self) -> ExpressionResult<NodeId> {
        self.skip_whitespace();
        let Some(ch) = self.current() else {
            return Err(self.error("missing operand at end of expression"));
        };

        if ch == '(' {
            self.advance();
            let inner = self.parse_chain(Context::Group)?;
            self.skip_whitespace();
            if self.current() != Some(')') {
                return Err(self.error("unmatched '('"));
            }
            self.advance();
            return Ok(self.builder.group(inner));
        }

        if ch == '\'' {
            return self.read_string();
        }

        if ch.is_ascii_digit() || (ch == '-' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) {
            return self.read_number();
        }

        if self.parser.is_identifier_start(ch) {
            return self.read_identifier();
        }

        Err(self.error(format!(
            "unexpected character '{}' at position {}",
            ch, self.position
        )))
    }

    fn read_number(&mut self) -> ExpressionResult<NodeId> {
        let mut text = String::new();
        if self.current() == Some('-') {
            text.push('-');
            self.advance();
        }

        let mut seen_point = false;
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '.' {
                if seen_point {
                    return Err(self.error(format!(
                        "number '{}.' contains more than one decimal point",
                        text
                    )));
                }
                seen_point = true;
                text.push(ch);
            } else {
                break;
            }
            self.advance();
        }

        Ok(self.builder.literal(text, LiteralKind::Number))
    }

    fn read_string(&mut self) -> ExpressionResult<NodeId> {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.current() {
                None => return Err(self.error("unterminated string literal")),
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let escaped = match self.peek(1) {
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => {
                            return Err(
                                self.error(format!("unknown escape sequence '\\{}'", other))
                            )
                        }
                        None => return Err(self.error("unterminated string literal")),
                    };
                    value.push(escaped);
                    self.position += 2;
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Ok(self.builder.literal(value, LiteralKind::String))
    }

    fn read_identifier(&mut self) -> ExpressionResult<NodeId> {
        let start = self.position;
        while let Some(ch) = self.current() {
            if self.parser.is_identifier_body(ch) {
                self.advance();
            } else {
                break;
            }
        }
        let name: String = self.chars[start..self.position].iter().collect();

        // A following '(' makes it a call, whitespace allowed in between
        let after_name = self.position;
        self.skip_whitespace();
        if self.current() == Some('(') {
            self.advance();
            let args = self.parse_arguments(&name)?;
            return Ok(self.builder.call(name, args));
        }
        self.position = after_name;

        let kind = match name.to_ascii_lowercase().as_str() {
            "true" => NodeKind::Boolean(true),
            "false" => NodeKind::Boolean(false),
            "null" => NodeKind::Null,
            _ => NodeKind::Reference(name),
        };
        Ok(self.builder.add(kind))
    }

    fn parse_arguments(&mut self, function: &str) -> ExpressionResult<Vec<NodeId>> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.current() == Some(')') {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_chain(Context::Arguments)?);
            self.skip_whitespace();
            match self.current() {
                Some(',') => self.advance(),
                Some(')') => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(self.error(format!(
                        "unterminated argument list of '{}'",
                        function
                    )))
                }
            }
        }

        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expression {
        ExpressionParser::new().parse(text).unwrap()
    }

    #[test]
    fn test_flat_left_to_right_chain() {
        let expr = parse("3 + 4 * 5");
        let NodeKind::Binary { op, left, .. } = expr.kind(expr.root()) else {
            panic!("expected binary root");
        };
        assert_eq!(*op, BinaryOperator::Mul);
        assert!(matches!(
            expr.kind(*left),
            NodeKind::Binary {
                op: BinaryOperator::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_literals_and_keywords() {
        let expr = parse("'a\\'b\\n'");
        assert_eq!(
            expr.kind(expr.root()),
            &NodeKind::Literal {
                text: "a'b\n".to_string(),
                kind: LiteralKind::String
            }
        );
        assert_eq!(parse("TRUE").kind(parse("TRUE").root()), &NodeKind::Boolean(true));
        assert_eq!(parse("null").kind(NodeId(0)), &NodeKind::Null);
        assert_eq!(
            parse("-3.25").kind(NodeId(0)),
            &NodeKind::Literal {
                text: "-3.25".to_string(),
                kind: LiteralKind::Number
            }
        );
    }

    #[test]
    fn test_calls_and_references() {
        let expr = parse("abs (-3) + nvl(t.x, pi())");
        assert_eq!(expr.to_string(), "abs(-3) + nvl(t.x, pi())");
        assert_eq!(expr.references(), vec!["t.x"]);
    }

    #[test]
    fn test_word_operators() {
        let expr = parse("a == 1 AND b <> 2 or c != 3");
        assert_eq!(expr.to_string(), "a = 1 and b <> 2 or c <> 3");
    }

    #[test]
    fn test_minus_after_operand_is_operator() {
        let expr = parse("a -3");
        assert!(matches!(
            expr.kind(expr.root()),
            NodeKind::Binary {
                op: BinaryOperator::Sub,
                ..
            }
        ));
        assert_eq!(parse("a - -3").to_string(), "a - -3");
    }

    #[test]
    fn test_additional_identifier_chars() {
        let parser = ExpressionParser::with_identifier_chars(['$', '#']);
        let expr = parser.parse("$row#id + 1").unwrap();
        assert_eq!(expr.references(), vec!["$row#id"]);
        assert!(ExpressionParser::new().parse("$row").is_err());
    }

    #[test]
    fn test_malformed_inputs() {
        let parser = ExpressionParser::new();
        for text in [
            "",
            "'open",
            "'bad \\q escape'",
            "(a + b",
            "a + b)",
            "a +",
            "1.2.3",
            "a b",
            "f(a, b",
            "(a, b)",
            "a ? b",
        ] {
            let err = parser.parse(text).unwrap_err();
            assert!(
                matches!(err, ExpressionError::MalformedExpression { .. }),
                "{:?} gave {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_partial_parse_select_list() {
        let parser = ExpressionParser::new();

        let first = parser.parse_partial("a, f(b,c), (d+e)").unwrap();
        assert_eq!(first.parsed, "a");
        assert_eq!(first.remainder, ", f(b,c), (d+e)");

        let second = parser.parse_partial(&first.remainder[1..]).unwrap();
        assert_eq!(second.parsed, "f(b,c)");
        assert_eq!(second.remainder, ", (d+e)");

        let third = parser.parse_partial(&second.remainder[1..]).unwrap();
        assert_eq!(third.parsed, "(d+e)");
        assert_eq!(third.remainder, "");
        assert_eq!(third.expression.to_string(), "(d + e)");
    }

    #[test]
    fn test_partial_parse_stops_at_word() {
        let parser = ExpressionParser::new();
        let result = parser.parse_partial("a.x + 1 AS total, b").unwrap();
        assert_eq!(result.parsed, "a.x + 1");
        assert_eq!(result.remainder, "AS total, b");

        let result = parser
            .parse_partial("a.id = b.id and b.k = 2 INNER JOIN c")
            .unwrap();
        assert_eq!(result.parsed, "a.id = b.id and b.k = 2");
        assert_eq!(result.remainder, "INNER JOIN c");
    }

    #[test]
    fn test_partial_parse_still_rejects_nested_errors() {
        let parser = ExpressionParser::new();
        assert!(parser.parse_partial("f(a b)").is_err());
        assert!(parser.parse_partial("a +").is_err());
    }
}
