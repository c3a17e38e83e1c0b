//! Error types for the linear-algebra layer.

use bg_core::error::BgError;
use bg_symbolic::SymbolicError;
use thiserror::Error;

/// Errors raised while assembling or reducing a constraint system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgebraError {
    #[error("Relation references unmapped symbol: {symbol}")]
    UnmappedSymbol { symbol: String },

    #[error("Bond endpoint missing from the port index: {what}")]
    UnknownEndpoint { what: String },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Dimension mismatch in {what}: expected {expected}, got {got}")]
    Dimension {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Symbolic error: {0}")]
    Symbolic(#[from] SymbolicError),
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;

impl From<AlgebraError> for BgError {
    fn from(e: AlgebraError) -> Self {
        match e {
            AlgebraError::UnmappedSymbol { .. } | AlgebraError::Symbolic(_) => {
                BgError::model_parsing(e.to_string())
            }
            AlgebraError::UnknownEndpoint { .. } => BgError::Invariant {
                what: "bond endpoint outside the port index",
            },
            AlgebraError::IndexOob { what, index, len } => BgError::IndexOob { what, index, len },
            AlgebraError::Dimension { .. } => BgError::Invariant {
                what: "matrix dimensions",
            },
        }
    }
}
