//! Recursive descent parser for filter expressions

use super::lexer::{tokenize, Token};
use crate::error::{Result, RuntimeError};
use snax_core::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    StartsWith,
    EndsWith,
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Literal(bool),
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Not(Box<Predicate>),
    /// All of the terms hold; never fewer than two terms
    And(Vec<Predicate>),
    /// Any of the terms holds; never fewer than two terms
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Columns referenced by the expression, in order of appearance
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Literal(_) => {}
            Predicate::Compare { column, .. } | Predicate::In { column, .. } => {
                if !out.contains(&column.as_str()) {
                    out.push(column);
                }
            }
            Predicate::Not(inner) => inner.collect_columns(out),
            Predicate::And(terms) | Predicate::Or(terms) => {
                for term in terms {
                    term.collect_columns(out);
                }
            }
        }
    }
}

/// Filter expression parser
///
/// Grammar, lowest precedence first:
///
/// ```text
/// or      := and ( 'or' and )*
/// and     := not ( 'and' not )*
/// not     := 'not' not | primary
/// primary := '(' or ')' | 'true' | 'false' | comparison
/// comparison := ident op literal
///             | literal op ident
///             | ident ['not'] 'in' ( '(' list ')' | '[' list ']' )
/// ```
pub struct FilterParser {
    input: String,
    tokens: Vec<Token>,
    pos: usize,
}

impl FilterParser {
    /// Parse a filter expression
    pub fn parse(input: &str) -> Result<Predicate> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(RuntimeError::InvalidPredicate("empty predicate".to_string()));
        }
        let mut parser = FilterParser {
            input: input.to_string(),
            tokens,
            pos: 0,
        };
        let predicate = parser.parse_or()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(predicate)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", expected)))
        }
    }

    fn error(&self, message: &str) -> RuntimeError {
        let found = self
            .peek()
            .map(|t| format!("{:?}", t))
            .unwrap_or_else(|| "end of input".to_string());
        RuntimeError::InvalidPredicate(format!(
            "{} at token {} ({}) in '{}'",
            message, self.pos, found, self.input
        ))
    }

    // Chains are kept flat: `a or b or c` is one node with three terms, so
    // long key lookups do not nest.
    fn parse_or(&mut self) -> Result<Predicate> {
        let mut terms = Vec::new();
        loop {
            match self.parse_and()? {
                Predicate::Or(inner) => terms.extend(inner),
                term => terms.push(term),
            }
            if !self.eat(&Token::Or) {
                break;
            }
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Predicate> {
        let mut terms = Vec::new();
        loop {
            match self.parse_not()? {
                Predicate::And(inner) => terms.extend(inner),
                term => terms.push(term),
            }
            if !self.eat(&Token::And) {
                break;
            }
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::And(terms)
        })
    }

    fn parse_not(&mut self) -> Result<Predicate> {
        if self.eat(&Token::Not) {
            let inner = self.parse_not()?;
            return Ok(Predicate::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(_)) => self.parse_column_first(),
            Some(Token::True) | Some(Token::False) if !self.next_is_operator() => {
                let value = self.next() == Some(Token::True);
                Ok(Predicate::Literal(value))
            }
            Some(_) => self.parse_literal_first(),
            None => Err(self.error("unexpected end of predicate")),
        }
    }

    fn next_is_operator(&self) -> bool {
        self.tokens
            .get(self.pos + 1)
            .map_or(false, |t| compare_op(t).is_some())
    }

    fn parse_column_first(&mut self) -> Result<Predicate> {
        let column = match self.next() {
            Some(Token::Ident(name)) => name,
            _ => return Err(self.error("expected column name")),
        };

        let negated = self.eat(&Token::Not);
        if self.eat(&Token::In) {
            let values = self.parse_list()?;
            return Ok(Predicate::In {
                column,
                values,
                negated,
            });
        }
        if negated {
            return Err(self.error("expected 'in' after 'not'"));
        }

        let op = self
            .next()
            .as_ref()
            .and_then(compare_op)
            .ok_or_else(|| self.error("expected comparison operator"))?;
        let value = self.parse_literal()?;
        Ok(Predicate::Compare { column, op, value })
    }

    /// `literal op column`, rewritten to `column op' literal`
    fn parse_literal_first(&mut self) -> Result<Predicate> {
        let value = self.parse_literal()?;
        let op = self
            .next()
            .as_ref()
            .and_then(compare_op)
            .ok_or_else(|| self.error("expected comparison operator"))?;
        let column = match self.next() {
            Some(Token::Ident(name)) => name,
            _ => return Err(self.error("expected column name")),
        };
        let op = match op {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            CompareOp::Eq | CompareOp::Ne => op,
            _ => return Err(self.error("string operators need the column on the left")),
        };
        Ok(Predicate::Compare { column, op, value })
    }

    fn parse_list(&mut self) -> Result<Vec<Value>> {
        let close = match self.next() {
            Some(Token::LParen) => Token::RParen,
            Some(Token::LBracket) => Token::RBracket,
            _ => return Err(self.error("expected '(' or '[' after 'in'")),
        };
        let mut values = Vec::new();
        if self.eat(&close) {
            return Ok(values);
        }
        loop {
            values.push(self.parse_literal()?);
            if self.eat(&close) {
                return Ok(values);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn parse_literal(&mut self) -> Result<Value> {
        let value = match self.next() {
            Some(Token::Str(s)) => Value::String(s),
            Some(Token::Int(i)) => Value::Int(i),
            Some(Token::Float(f)) => Value::Float(f),
            Some(Token::True) => Value::Bool(true),
            Some(Token::False) => Value::Bool(false),
            Some(Token::Null) => Value::Null,
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error("expected literal"));
            }
        };
        Ok(value)
    }
}

fn compare_op(token: &Token) -> Option<CompareOp> {
    let op = match token {
        Token::Eq => CompareOp::Eq,
        Token::Ne => CompareOp::Ne,
        Token::Lt => CompareOp::Lt,
        Token::Le => CompareOp::Le,
        Token::Gt => CompareOp::Gt,
        Token::Ge => CompareOp::Ge,
        Token::Contains => CompareOp::Contains,
        Token::StartsWith => CompareOp::StartsWith,
        Token::EndsWith => CompareOp::EndsWith,
        _ => return None,
    };
    Some(op)
}
