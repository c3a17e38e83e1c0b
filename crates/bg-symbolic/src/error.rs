//! Error types for symbolic operations.

use thiserror::Error;

/// Errors raised while parsing or manipulating expressions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolicError {
    #[error("Parse error at position {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Exponent out of range: {exponent}")]
    ExponentOutOfRange { exponent: String },
}

pub type SymbolicResult<T> = Result<T, SymbolicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SymbolicError::Parse {
            pos: 4,
            message: "unexpected ')'".into(),
        };
        assert!(err.to_string().contains("position 4"));
        assert_eq!(SymbolicError::DivisionByZero.to_string(), "Division by zero");
    }
}
