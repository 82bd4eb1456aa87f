//! Calculator tool — evaluates arithmetic expressions.
//!
//! Supports `+`, `-`, `*`, `/`, `%`, `^` (right-associative power),
//! parentheses, and unary negation via a recursive-descent parser.
//! Results are rounded to two decimal places.

use async_trait::async_trait;
use reagent_core::error::ToolError;
use reagent_core::tool::Tool;
use serde_json::{Value, json};

const NAME: &str = "calculate";

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Perform basic math. Supports +, -, *, /, %, ^, parentheses, and decimal numbers."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. '(2 + 3) * 4'"
                }
            },
            "required": ["expression"]
        }))
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let expr = input["expression"]
            .as_str()
            .ok_or_else(|| ToolError::invalid(NAME, "missing 'expression' argument"))?;

        let value = evaluate(expr)
            .map_err(|e| ToolError::execution(NAME, format!("could not evaluate '{expr}': {e}")))?;
        if !value.is_finite() {
            return Err(ToolError::execution(
                NAME,
                format!("could not evaluate '{expr}': result is not finite"),
            ));
        }

        Ok(json!({ "result": round2(value) }))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate an arithmetic expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(format!("unexpected {tok:?} at token {}", parser.pos));
    }
    Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let simple = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '^' => Some(Token::Caret),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            c if c.is_ascii_digit() || c == '.' => None,
            c => return Err(format!("unexpected character '{c}'")),
        };

        if let Some(tok) = simple {
            tokens.push(tok);
            chars.next();
            continue;
        }

        let mut end = start;
        while let Some(&(i, d)) = chars.peek() {
            if !(d.is_ascii_digit() || d == '.') {
                break;
            }
            end = i + d.len_utf8();
            chars.next();
        }
        let literal = &input[start..end];
        let num: f64 = literal
            .parse()
            .map_err(|_| format!("invalid number '{literal}'"))?;
        tokens.push(Token::Number(num));
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut left = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    left += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.bump();
                    left -= self.parse_term()?;
                }
                _ => return Ok(left),
            }
        }
    }

    // term = unary (('*' | '/' | '%') unary)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(op @ (Token::Star | Token::Slash | Token::Percent)) => op,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.parse_unary()?;
            left = match op {
                Token::Star => left * right,
                _ if right == 0.0 => return Err("division by zero".into()),
                Token::Slash => left / right,
                _ => left % right,
            };
        }
    }

    // unary = '-' unary | power
    fn parse_unary(&mut self) -> Result<f64, String> {
        if self.peek() == Some(Token::Minus) {
            self.bump();
            return Ok(-self.parse_unary()?);
        }
        self.parse_power()
    }

    // power = primary ('^' unary)?
    fn parse_power(&mut self) -> Result<f64, String> {
        let base = self.parse_primary()?;
        if self.peek() == Some(Token::Caret) {
            self.bump();
            let exponent = self.parse_unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary = NUMBER | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, String> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(val),
                    _ => Err("expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("unexpected {tok:?}")),
            None => Err("unexpected end of expression".into()),
        }
    }
}
