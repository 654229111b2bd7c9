//! Tokenizer for filter expressions

use crate::error::{Result, RuntimeError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    In,
    Contains,
    StartsWith,
    EndsWith,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' | '!' | '<' | '>' | '&' | '|' => {
                let next = chars.get(i + 1).copied();
                let (token, width) = match (c, next) {
                    ('=', Some('=')) => (Token::Eq, 2),
                    ('!', Some('=')) => (Token::Ne, 2),
                    ('<', Some('=')) => (Token::Le, 2),
                    ('>', Some('=')) => (Token::Ge, 2),
                    ('<', _) => (Token::Lt, 1),
                    ('>', _) => (Token::Gt, 1),
                    ('&', Some('&')) => (Token::And, 2),
                    ('|', Some('|')) => (Token::Or, 2),
                    ('&', _) => (Token::And, 1),
                    ('|', _) => (Token::Or, 1),
                    ('!', _) => (Token::Not, 1),
                    _ => return Err(unexpected(input, i)),
                };
                tokens.push(token);
                i += width;
            }
            '~' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '\'' | '"' => {
                let (text, end) = read_string(input, &chars, i)?;
                tokens.push(Token::Str(text));
                i = end;
            }
            '`' => {
                let (name, end) = read_quoted_ident(input, &chars, i)?;
                tokens.push(Token::Ident(name));
                i = end;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).map_or(false, |n| n.is_ascii_digit() || *n == '.'))
                || (c == '.' && chars.get(i + 1).map_or(false, |n| n.is_ascii_digit())) =>
            {
                let (token, end) = read_number(input, &chars, i)?;
                tokens.push(token);
                i = end;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(keyword(&word).unwrap_or(Token::Ident(word)));
            }
            _ => return Err(unexpected(input, i)),
        }
    }

    Ok(tokens)
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "and" | "AND" => Token::And,
        "or" | "OR" => Token::Or,
        "not" | "NOT" => Token::Not,
        "in" | "IN" => Token::In,
        "true" | "True" | "TRUE" => Token::True,
        "false" | "False" | "FALSE" => Token::False,
        "null" | "None" | "NULL" => Token::Null,
        "contains" => Token::Contains,
        "starts_with" => Token::StartsWith,
        "ends_with" => Token::EndsWith,
        _ => return None,
    };
    Some(token)
}

fn read_string(input: &str, chars: &[char], start: usize) -> Result<(String, usize)> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars.get(i + 1).ok_or_else(|| unterminated(input))?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => *other,
                });
                i += 2;
            }
            c if c == quote => return Ok((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(unterminated(input))
}

/// Back-quoted identifier; a doubled back quote stands for itself
fn read_quoted_ident(input: &str, chars: &[char], start: usize) -> Result<(String, usize)> {
    let mut name = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '`' {
            if chars.get(i + 1) == Some(&'`') {
                name.push('`');
                i += 2;
                continue;
            }
            return Ok((name, i + 1));
        }
        name.push(chars[i]);
        i += 1;
    }
    Err(unterminated(input))
}

fn read_number(input: &str, chars: &[char], start: usize) -> Result<(Token, usize)> {
    let mut i = start;
    if chars[i] == '-' {
        i += 1;
    }
    while i < chars.len()
        && (chars[i].is_ascii_digit()
            || chars[i] == '.'
            || chars[i] == 'e'
            || chars[i] == 'E'
            || ((chars[i] == '-' || chars[i] == '+') && matches!(chars[i - 1], 'e' | 'E')))
    {
        i += 1;
    }
    let text: String = chars[start..i].iter().collect();
    if let Ok(int) = text.parse::<i64>() {
        return Ok((Token::Int(int), i));
    }
    text.parse::<f64>()
        .map(|f| (Token::Float(f), i))
        .map_err(|_| {
            RuntimeError::InvalidPredicate(format!("invalid number '{}' in '{}'", text, input))
        })
}

fn unexpected(input: &str, pos: usize) -> RuntimeError {
    RuntimeError::InvalidPredicate(format!(
        "unexpected character at position {} in '{}'",
        pos, input
    ))
}

fn unterminated(input: &str) -> RuntimeError {
    RuntimeError::InvalidPredicate(format!("unterminated quote in '{}'", input))
}
