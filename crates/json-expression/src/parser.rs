//! Recursive-descent parser for the safe expression sub-language.

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ComparisonToken {
    operator: BinaryOp,
    len: usize,
}

pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn parse(input: &'a str) -> Result<Expr, ParseError> {
        let mut parser = Self { input, pos: 0 };
        parser.skip_whitespace();
        let expr = parser.parse_logical_or()?;
        parser.skip_whitespace();
        if !parser.is_at_end() {
            return Err(ParseError(format!(
                "unexpected trailing input at byte {}",
                parser.pos
            )));
        }
        Ok(expr)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        self.skip_whitespace();
        while self.peek_str("||") {
            self.advance_by(2);
            self.skip_whitespace();
            let right = self.parse_logical_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
            self.skip_whitespace();
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        self.skip_whitespace();
        while self.peek_str("&&") {
            self.advance_by(2);
            self.skip_whitespace();
            let right = self.parse_equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
            self.skip_whitespace();
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_comparison()?;
        self.skip_whitespace();
        if self.peek_str("==") {
            self.advance_by(2);
            self.skip_whitespace();
            let right = self.parse_comparison()?;
            return Ok(Expr::Binary(BinaryOp::Eq, Box::new(left), Box::new(right)));
        }
        if self.peek_str("!=") {
            self.advance_by(2);
            self.skip_whitespace();
            let right = self.parse_comparison()?;
            return Ok(Expr::Binary(BinaryOp::Ne, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        self.skip_whitespace();
        if let Some(op) = self.peek_comparison_operator() {
            self.advance_by(op.len);
            self.skip_whitespace();
            let right = self.parse_additive()?;
            return Ok(Expr::Binary(op.operator, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_whitespace();
            if self.peek() == Some('+') {
                self.advance();
                self.skip_whitespace();
                let right = self.parse_multiplicative()?;
                left = Expr::Binary(BinaryOp::Add, Box::new(left), Box::new(right));
            } else if self.peek() == Some('-') {
                self.advance();
                self.skip_whitespace();
                let right = self.parse_multiplicative()?;
                left = Expr::Binary(BinaryOp::Sub, Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let op = if self.peek() == Some('*') {
                Some(BinaryOp::Mul)
            } else if self.peek() == Some('/') {
                Some(BinaryOp::Div)
            } else if self.peek() == Some('%') {
                Some(BinaryOp::Rem)
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.advance();
                    self.skip_whitespace();
                    let right = self.parse_unary()?;
                    left = Expr::Binary(op, Box::new(left), Box::new(right));
                }
                None => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('!') {
            self.advance();
            self.skip_whitespace();
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(expr)));
        }
        if self.peek() == Some('-') {
            self.advance();
            self.skip_whitespace();
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(expr)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.peek() == Some('.') {
                self.advance();
                let name = self.parse_identifier()?;
                expr = Expr::Member(Box::new(expr), name);
            } else if self.peek() == Some('[') {
                self.advance();
                self.skip_whitespace();
                let index = self.parse_logical_or()?;
                self.skip_whitespace();
                self.expect(']')?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                self.skip_whitespace();
                let expr = self.parse_logical_or()?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(expr)
            }
            Some('\'') | Some('"') => {
                let s = self.parse_string()?;
                Ok(Expr::Literal(serde_json::Value::String(s)))
            }
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                let ident = self.parse_identifier()?;
                match ident.as_str() {
                    "true" => Ok(Expr::Literal(serde_json::Value::Bool(true))),
                    "false" => Ok(Expr::Literal(serde_json::Value::Bool(false))),
                    "null" => Ok(Expr::Literal(serde_json::Value::Null)),
                    _ => Ok(Expr::Ident(ident)),
                }
            }
            Some(c) => Err(ParseError(format!("unexpected character '{c}'"))),
            None => Err(ParseError("unexpected end of expression".to_string())),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.input[start..self.pos];
        let n: f64 = text
            .parse()
            .map_err(|_| ParseError(format!("invalid number literal '{text}'")))?;
        Ok(Expr::Literal(
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        ))
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        if !matches!(self.peek(), Some(c) if c.is_alphabetic() || c == '_' || c == '$') {
            return Err(ParseError("expected identifier".to_string()));
        }
        self.advance();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$') {
            self.advance();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let quote = self.peek().unwrap();
        self.advance();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError("unterminated string literal".to_string())),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('\\') => out.push('\\'),
                        Some('\'') => out.push('\''),
                        Some('"') => out.push('"'),
                        Some(other) => out.push(other),
                        None => return Err(ParseError("invalid escape sequence".to_string())),
                    }
                    self.advance();
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
        Ok(out)
    }

    fn peek_comparison_operator(&self) -> Option<ComparisonToken> {
        if self.peek_str("<=") {
            Some(ComparisonToken { operator: BinaryOp::Le, len: 2 })
        } else if self.peek_str(">=") {
            Some(ComparisonToken { operator: BinaryOp::Ge, len: 2 })
        } else if self.peek_str("<") {
            Some(ComparisonToken { operator: BinaryOp::Lt, len: 1 })
        } else if self.peek_str(">") {
            Some(ComparisonToken { operator: BinaryOp::Gt, len: 1 })
        } else {
            None
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError(format!(
                "expected '{expected}', found {:?}",
                self.peek()
            )))
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comparison() {
        let expr = Parser::parse("_$_v.price > 10").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Gt,
                Box::new(Expr::Member(Box::new(Expr::Ident("_$_v".into())), "price".into())),
                Box::new(Expr::Literal(serde_json::json!(10.0))),
            )
        );
    }

    #[test]
    fn parses_logical_precedence() {
        // a && b || c  ==  (a && b) || c
        let expr = Parser::parse("a && b || c").unwrap();
        match expr {
            Expr::Logical(LogicalOp::Or, left, _) => {
                assert!(matches!(*left, Expr::Logical(LogicalOp::And, _, _)));
            }
            other => panic!("expected top-level Or, got {other:?}"),
        }
    }

    #[test]
    fn parses_index_and_member_chain() {
        let expr = Parser::parse("_$_v.books[0].title").unwrap();
        assert!(matches!(expr, Expr::Member(_, ref name) if name == "title"));
    }

    #[test]
    fn parses_negation_and_parens() {
        let expr = Parser::parse("!(a == b)").unwrap();
        assert!(matches!(expr, Expr::Unary(UnaryOp::Not, _)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(Parser::parse("1 + 1)").is_err());
    }
}
