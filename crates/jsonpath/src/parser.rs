//! Single-pass recursive-descent parser for the path grammar.
//!
//! `Parser` wraps a `Peekable` char-index cursor so every error can name the
//! exact byte offset at which parsing failed.

use std::iter::Peekable;
use std::str::CharIndices;

use value::{Number, Value};

use crate::ast::{Atom, CmpOp, FilterExpr, Path, ScriptExpr, Segment, Selector, Slice};
use crate::error::JsonPathParseError;

pub(crate) fn parse(input: &str) -> Result<Path, JsonPathParseError> {
    Parser::new(input).parse_path()
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn err(&self, position: usize, message: impl Into<String>) -> JsonPathParseError {
        JsonPathParseError::new(self.input, position, message)
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn rest(&mut self) -> &'a str {
        &self.input[self.pos()..]
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> Result<(), JsonPathParseError> {
        let pos = self.pos();
        match self.bump() {
            Some((_, c)) if c == expected => Ok(()),
            _ => Err(self.err(pos, format!("expected '{expected}'"))),
        }
    }

    /// Consumes `expected` if the remaining input starts with it literally.
    fn eat_str(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            for _ in 0..expected.chars().count() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    fn parse_path(&mut self) -> Result<Path, JsonPathParseError> {
        self.eat('$')?;
        let mut segments = Vec::new();
        while self.peek().is_some() {
            segments.push(self.parse_segment()?);
        }
        Ok(Path { segments })
    }

    fn parse_segment(&mut self) -> Result<Segment, JsonPathParseError> {
        match self.peek() {
            Some('.') => {
                self.bump();
                if self.peek() == Some('.') {
                    self.bump();
                    self.parse_rec_target()
                } else {
                    self.parse_name_or_wildcard()
                }
            }
            Some('[') => self.parse_bracket(),
            _ => {
                let pos = self.pos();
                Err(self.err(pos, "expected '.' or '[' to start a segment"))
            }
        }
    }

    fn parse_rec_target(&mut self) -> Result<Segment, JsonPathParseError> {
        let target = if self.peek() == Some('[') {
            self.parse_bracket()?
        } else {
            self.parse_name_or_wildcard()?
        };
        Ok(Segment::RecursiveDescent(Box::new(target)))
    }

    fn parse_name_or_wildcard(&mut self) -> Result<Segment, JsonPathParseError> {
        match self.peek() {
            Some('*') => {
                self.bump();
                Ok(Segment::Wildcard)
            }
            Some(c) if is_name_start(c) => self.parse_bare_name(),
            _ => {
                let pos = self.pos();
                Err(self.err(pos, "expected a name or '*'"))
            }
        }
    }

    fn parse_bare_name(&mut self) -> Result<Segment, JsonPathParseError> {
        let start = self.pos();
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.bump();
        }
        let name = &self.input[start..self.pos()];
        if name.is_empty() {
            return Err(self.err(start, "empty property name"));
        }
        Ok(Segment::Property(name.to_string()))
    }

    fn parse_bracket(&mut self) -> Result<Segment, JsonPathParseError> {
        self.eat('[')?;
        self.skip_ws();
        let segment = match self.peek() {
            Some('*') => {
                self.bump();
                Segment::Wildcard
            }
            Some('?') => {
                self.bump();
                self.skip_ws();
                self.eat('(')?;
                let expr = self.parse_or()?;
                self.skip_ws();
                self.eat(')')?;
                Segment::Filter(expr)
            }
            Some('(') => {
                self.bump();
                Segment::Script(self.parse_script()?)
            }
            Some('\'' | '"') => self.parse_quoted_list()?,
            _ => self.parse_numeric_bracket()?,
        };
        self.skip_ws();
        self.eat(']')?;
        Ok(segment)
    }

    fn parse_script(&mut self) -> Result<ScriptExpr, JsonPathParseError> {
        let start = self.pos();
        let mut depth = 1;
        loop {
            match self.bump() {
                Some((_, '(')) => depth += 1,
                Some((p, ')')) => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.input[start..p].trim();
                        return Ok(if text == "@.length-1" {
                            ScriptExpr::LastIndex
                        } else {
                            ScriptExpr::Noop
                        });
                    }
                }
                Some(_) => {}
                None => return Err(self.err(start, "unterminated script expression")),
            }
        }
    }

    fn parse_quoted_list(&mut self) -> Result<Segment, JsonPathParseError> {
        let mut names = vec![self.parse_quoted_string()?];
        self.skip_ws();
        while self.peek() == Some(',') {
            self.bump();
            self.skip_ws();
            names.push(self.parse_quoted_string()?);
            self.skip_ws();
        }
        if names.len() == 1 {
            Ok(Segment::Property(names.into_iter().next().expect("one name")))
        } else {
            Ok(Segment::Union(names.into_iter().map(Selector::Property).collect()))
        }
    }

    fn parse_quoted_string(&mut self) -> Result<String, JsonPathParseError> {
        let start = self.pos();
        let quote = match self.bump() {
            Some((_, c)) if c == '\'' || c == '"' => c,
            _ => return Err(self.err(start, "expected a quoted name")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some((_, c)) if c == quote => break,
                Some((p, '\\')) => out.push(self.parse_escape(p)?),
                Some((_, c)) => out.push(c),
                None => return Err(self.err(start, "unterminated quoted string")),
            }
        }
        Ok(out)
    }

    /// Mirrors JSON string escapes, called right after the backslash at `pos` was consumed.
    fn parse_escape(&mut self, pos: usize) -> Result<char, JsonPathParseError> {
        let (_, escaped) = self.bump().ok_or_else(|| self.err(pos, "unterminated escape"))?;
        Ok(match escaped {
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => self.parse_unicode_escape(pos)?,
            other => return Err(self.err(pos, format!("unknown escape '\\{other}'"))),
        })
    }

    fn parse_unicode_escape(&mut self, pos: usize) -> Result<char, JsonPathParseError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let (_, c) = self.bump().ok_or_else(|| self.err(pos, "incomplete unicode escape"))?;
            let digit = c.to_digit(16).ok_or_else(|| self.err(pos, "invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.err(pos, "invalid unicode code point"))
    }

    fn parse_numeric_bracket(&mut self) -> Result<Segment, JsonPathParseError> {
        let pos = self.pos();
        let first = self.parse_opt_int()?;
        self.skip_ws();
        if self.peek() == Some(':') {
            self.bump();
            self.skip_ws();
            let end = self.parse_opt_int()?;
            self.skip_ws();
            let step = if self.peek() == Some(':') {
                self.bump();
                self.skip_ws();
                self.parse_opt_int()?
            } else {
                None
            };
            return Ok(Segment::Slice(Slice { start: first, end, step }));
        }

        let first = first.ok_or_else(|| self.err(pos, "expected an integer index"))?;
        let mut indices = vec![first];
        self.skip_ws();
        while self.peek() == Some(',') {
            self.bump();
            self.skip_ws();
            let item_pos = self.pos();
            let value = self
                .parse_opt_int()?
                .ok_or_else(|| self.err(item_pos, "expected an integer index"))?;
            indices.push(value);
            self.skip_ws();
        }
        if indices.len() == 1 {
            Ok(Segment::Index(indices[0]))
        } else {
            Ok(Segment::Union(indices.into_iter().map(Selector::Index).collect()))
        }
    }

    fn parse_opt_int(&mut self) -> Result<Option<i64>, JsonPathParseError> {
        let start = self.pos();
        let negative = self.peek() == Some('-');
        if negative {
            self.bump();
        }
        let digits_start = self.pos();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos() == digits_start {
            if negative {
                return Err(self.err(start, "expected digits after '-'"));
            }
            return Ok(None);
        }
        let text = &self.input[start..self.pos()];
        text.parse::<i64>()
            .map(Some)
            .map_err(|_| self.err(start, "integer literal out of range"))
    }

    fn parse_or(&mut self) -> Result<FilterExpr, JsonPathParseError> {
        self.skip_ws();
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.eat_str("||") {
                self.skip_ws();
                let right = self.parse_and()?;
                left = FilterExpr::Or(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, JsonPathParseError> {
        self.skip_ws();
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if self.eat_str("&&") {
                self.skip_ws();
                let right = self.parse_unary()?;
                left = FilterExpr::And(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpr, JsonPathParseError> {
        self.skip_ws();
        if self.peek() == Some('!') {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterExpr, JsonPathParseError> {
        self.skip_ws();
        if self.peek() == Some('(') {
            self.bump();
            let inner = self.parse_or()?;
            self.skip_ws();
            self.eat(')')?;
            return Ok(inner);
        }
        let left = self.parse_atom()?;
        self.skip_ws();
        if let Some(op) = self.try_parse_cmp_op() {
            self.skip_ws();
            let right = self.parse_atom()?;
            Ok(FilterExpr::Compare(left, op, right))
        } else {
            Ok(FilterExpr::Exists(left))
        }
    }

    fn try_parse_cmp_op(&mut self) -> Option<CmpOp> {
        const OPS: [(&str, CmpOp); 6] = [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ];
        for (text, op) in OPS {
            if self.eat_str(text) {
                return Some(op);
            }
        }
        None
    }

    fn parse_atom(&mut self) -> Result<Atom, JsonPathParseError> {
        self.skip_ws();
        if self.peek() == Some('@') {
            self.bump();
            let mut path = Vec::new();
            while self.peek() == Some('.') {
                self.bump();
                let start = self.pos();
                while matches!(self.peek(), Some(c) if is_name_char(c)) {
                    self.bump();
                }
                let name = &self.input[start..self.pos()];
                if name.is_empty() {
                    return Err(self.err(start, "expected a property name after '@.'"));
                }
                path.push(name.to_string());
            }
            return Ok(Atom::Current(path));
        }
        if matches!(self.peek(), Some('\'' | '"')) {
            return Ok(Atom::Literal(Value::String(self.parse_quoted_string()?)));
        }
        if self.eat_str("true") {
            return Ok(Atom::Literal(Value::Bool(true)));
        }
        if self.eat_str("false") {
            return Ok(Atom::Literal(Value::Bool(false)));
        }
        if self.eat_str("null") {
            return Ok(Atom::Literal(Value::Null));
        }
        if matches!(self.peek(), Some(c) if c == '-' || c.is_ascii_digit()) {
            return self.parse_number_atom();
        }
        let pos = self.pos();
        Err(self.err(pos, "expected '@', a quoted string, a number, or true/false/null"))
    }

    fn parse_number_atom(&mut self) -> Result<Atom, JsonPathParseError> {
        let start = self.pos();
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = &self.input[start..self.pos()];
        let number: f64 = text
            .parse()
            .map_err(|_| self.err(start, format!("invalid number literal '{text}'")))?;
        Ok(Atom::Literal(
            Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null),
        ))
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn root_only() {
        assert_eq!(parse("$").unwrap(), Path { segments: vec![] });
    }

    #[test]
    fn dotted_property_chain() {
        let path = parse("$.store.book").unwrap();
        assert_eq!(
            path.segments,
            vec![Segment::Property("store".into()), Segment::Property("book".into())]
        );
    }

    #[test]
    fn bracket_quoted_name_matches_dotted_form() {
        assert_eq!(parse("$['store']").unwrap(), parse("$.store").unwrap());
    }

    #[test_case("$[0]", Segment::Index(0))]
    #[test_case("$[-1]", Segment::Index(-1))]
    #[test_case("$[*]", Segment::Wildcard)]
    fn single_bracket_segment(input: &str, expected: Segment) {
        let path = parse(input).unwrap();
        assert_eq!(path.segments, vec![expected]);
    }

    #[test]
    fn slice_with_all_parts() {
        let path = parse("$[1:5:2]").unwrap();
        assert_eq!(
            path.segments,
            vec![Segment::Slice(Slice {
                start: Some(1),
                end: Some(5),
                step: Some(2),
            })]
        );
    }

    #[test]
    fn union_of_indices() {
        let path = parse("$[0,2,4]").unwrap();
        assert_eq!(
            path.segments,
            vec![Segment::Union(vec![Selector::Index(0), Selector::Index(2), Selector::Index(4)])]
        );
    }

    #[test]
    fn recursive_descent_wraps_its_target() {
        let path = parse("$..book").unwrap();
        assert_eq!(
            path.segments,
            vec![Segment::RecursiveDescent(Box::new(Segment::Property("book".into())))]
        );
    }

    #[test]
    fn filter_parses_a_comparison() {
        let path = parse("$.book[?(@.price<10)]").unwrap();
        assert_eq!(
            path.segments[1],
            Segment::Filter(FilterExpr::Compare(
                Atom::Current(vec!["price".into()]),
                CmpOp::Lt,
                Atom::Literal(Value::from(10.0))
            ))
        );
    }

    #[test]
    fn filter_parses_logical_combinators() {
        let path = parse("$[?(@.a && !@.b)]").unwrap();
        let Segment::Filter(expr) = &path.segments[0] else {
            panic!("expected a filter segment");
        };
        assert!(matches!(expr, FilterExpr::And(_, _)));
    }

    #[test]
    fn missing_root_sigil_reports_position_zero() {
        let error = parse("store.book").unwrap_err();
        assert_eq!(error.position, 0);
    }

    #[test]
    fn unterminated_bracket_is_an_error() {
        assert!(parse("$[0").is_err());
    }

    #[test]
    fn script_expression_is_recognized_only_for_last_index() {
        let path = parse("$[(@.length-1)]").unwrap();
        assert_eq!(path.segments, vec![Segment::Script(ScriptExpr::LastIndex)]);

        let path = parse("$[(@.foo)]").unwrap();
        assert_eq!(path.segments, vec![Segment::Script(ScriptExpr::Noop)]);
    }
}
