//! Graph-specific error types.

use bg_algebra::AlgebraError;
use bg_core::{BgError, CompId};
use bg_symbolic::SymbolicError;

pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised by graph mutation and relation assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A port is missing, already bonded, or cannot be chosen unambiguously.
    InvalidPort { comp: CompId, what: String },

    /// The component is not a member of the graph.
    InvalidComponent { comp: CompId },

    /// A relation or the graph itself cannot be turned into equations.
    ModelParsing { what: String },

    /// Failure inside the algebra layer.
    Algebra(AlgebraError),
}

impl GraphError {
    pub(crate) fn invalid_port(comp: CompId, what: impl Into<String>) -> Self {
        GraphError::InvalidPort {
            comp,
            what: what.into(),
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::InvalidPort { comp, what } => {
                write!(f, "Invalid port on component {}: {}", comp, what)
            }
            GraphError::InvalidComponent { comp } => {
                write!(f, "Component {} is not a member of the graph", comp)
            }
            GraphError::ModelParsing { what } => write!(f, "Model parsing error: {}", what),
            GraphError::Algebra(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<AlgebraError> for GraphError {
    fn from(err: AlgebraError) -> Self {
        match err {
            AlgebraError::UnmappedSymbol { .. } => GraphError::ModelParsing {
                what: err.to_string(),
            },
            other => GraphError::Algebra(other),
        }
    }
}

impl From<SymbolicError> for GraphError {
    fn from(err: SymbolicError) -> Self {
        GraphError::Algebra(err.into())
    }
}

impl From<GraphError> for BgError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::InvalidPort { .. } => BgError::invalid_port(err.to_string()),
            GraphError::InvalidComponent { .. } => BgError::invalid_component(err.to_string()),
            GraphError::ModelParsing { what } => BgError::model_parsing(what),
            GraphError::Algebra(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_core::Id;

    #[test]
    fn display_mentions_component() {
        let err = GraphError::invalid_port(Id::from_index(3), "port 0 is already bonded");
        assert_eq!(
            err.to_string(),
            "Invalid port on component 3: port 0 is already bonded"
        );
    }

    #[test]
    fn unmapped_symbols_become_parsing_errors() {
        let err: GraphError = AlgebraError::UnmappedSymbol { symbol: "z".into() }.into();
        assert!(matches!(err, GraphError::ModelParsing { .. }));
    }

    #[test]
    fn converts_into_umbrella_error() {
        let err: BgError = GraphError::InvalidComponent {
            comp: Id::from_index(1),
        }
        .into();
        assert!(matches!(err, BgError::InvalidComponent { .. }));
    }
}
