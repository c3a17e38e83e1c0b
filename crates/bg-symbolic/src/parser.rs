//! Expression parsing using recursive descent.
//!
//! Grammar:
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | identifier | identifier '(' expr ')' | '(' expr ')'
//! ```
//! Numbers are read exactly: `0.001` is the rational `1/1000`.

use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Pow;

use crate::error::{SymbolicError, SymbolicResult};
use crate::expr::Expr;
use crate::poly::{Func, MAX_EXPONENT};

/// Parse an expression from a string.
pub fn parse(input: &str) -> SymbolicResult<Expr> {
    ExprParser::new(input).parse()
}

impl FromStr for Expr {
    type Err = SymbolicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(&mut self) -> SymbolicResult<Expr> {
        self.skip_whitespace();
        let expr = self.parse_additive()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(expr),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> SymbolicError {
        SymbolicError::Parse {
            pos: self.pos,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.as_bytes().get(self.pos).map(|&b| b as char)
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn check_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn parse_additive(&mut self) -> SymbolicResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('+') => {
                    self.advance();
                    left = left + self.parse_multiplicative()?;
                }
                Some('-') => {
                    self.advance();
                    left = left - self.parse_multiplicative()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> SymbolicResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            if self.check_str("**") {
                break;
            }
            match self.peek() {
                Some('*') => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = left.checked_mul(&right)?;
                }
                Some('/') => {
                    self.advance();
                    let at = self.pos;
                    let right = self.parse_unary()?;
                    left = left.checked_div(&right).map_err(|_| SymbolicError::Parse {
                        pos: at,
                        message: "division by zero".into(),
                    })?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> SymbolicResult<Expr> {
        self.skip_whitespace();
        match self.peek() {
            Some('-') => {
                self.advance();
                Ok(-self.parse_unary()?)
            }
            Some('+') => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> SymbolicResult<Expr> {
        let base = self.parse_primary()?;
        self.skip_whitespace();
        if self.check_str("**") {
            self.advance();
            self.advance();
        } else if self.peek() == Some('^') {
            self.advance();
        } else {
            return Ok(base);
        }
        // right associative: the exponent may itself be a power
        let exp = self.parse_unary()?;
        base.pow(&exp)
    }

    fn parse_primary(&mut self) -> SymbolicResult<Expr> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let expr = self.parse_additive()?;
                self.skip_whitespace();
                if self.peek() != Some(')') {
                    return Err(self.error("expected ')'"));
                }
                self.advance();
                Ok(expr)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.parse_identifier(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_number(&mut self) -> SymbolicResult<Expr> {
        let start = self.pos;
        let mut digits = String::new();
        let mut frac_len: i64 = 0;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                if seen_dot {
                    frac_len += 1;
                }
                self.advance();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(SymbolicError::Parse {
                pos: start,
                message: "invalid number".into(),
            });
        }

        let mut exponent: i64 = 0;
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.advance();
            let negative = match self.peek() {
                Some('-') => {
                    self.advance();
                    true
                }
                Some('+') => {
                    self.advance();
                    false
                }
                _ => false,
            };
            let exp_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            if self.pos == exp_start {
                // `2e` followed by something else: leave it for the caller
                self.pos = mark;
            } else {
                exponent = self.input[exp_start..self.pos]
                    .parse()
                    .map_err(|_| self.error("exponent out of range"))?;
                if negative {
                    exponent = -exponent;
                }
            }
        }

        let mantissa: BigInt = digits
            .parse()
            .map_err(|_| SymbolicError::Parse {
                pos: start,
                message: format!("invalid number: {}", &self.input[start..self.pos]),
            })?;
        let shift = exponent.saturating_sub(frac_len);
        if shift.unsigned_abs() > u64::from(MAX_EXPONENT) {
            return Err(SymbolicError::Parse {
                pos: start,
                message: format!("exponent out of range: {}", &self.input[start..self.pos]),
            });
        }
        let ten = BigInt::from(10);
        let scale = Pow::pow(&ten, shift.unsigned_abs());
        let value = if shift >= 0 {
            BigRational::from_integer(mantissa * scale)
        } else {
            BigRational::new(mantissa, scale)
        };
        Ok(Expr::rational(value))
    }

    fn parse_identifier(&mut self) -> SymbolicResult<Expr> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let ident = &self.input[start..self.pos];

        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Ok(Expr::symbol(ident));
        }
        self.advance();
        let arg = self.parse_additive()?;
        self.skip_whitespace();
        if self.peek() != Some(')') {
            return Err(self.error(format!("expected ')' after argument of {ident}")));
        }
        self.advance();

        if ident == "sqrt" {
            return arg.sqrt();
        }
        match Func::from_name(ident) {
            Some(func) => Ok(Expr::apply(func, arg)),
            None => Err(SymbolicError::UnknownFunction {
                name: ident.to_string(),
            }),
        }
    }
}
