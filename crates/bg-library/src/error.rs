//! Error types for library lookups and component construction.

use bg_core::error::BgError;
use bg_symbolic::SymbolicError;
use thiserror::Error;

/// Errors that can occur while building a component from the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Unknown component type: {id}")]
    UnknownComponent { id: String },

    #[error("Too many values for {id}: expected at most {expected}, got {got}")]
    TooManyValues {
        id: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid expression: {0}")]
    Parse(#[from] SymbolicError),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

impl From<LibraryError> for BgError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::UnknownComponent { .. } => BgError::invalid_component(e.to_string()),
            LibraryError::TooManyValues { .. } | LibraryError::Parse(_) => {
                BgError::model_parsing(e.to_string())
            }
        }
    }
}
