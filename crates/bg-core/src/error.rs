use thiserror::Error;

pub type BgResult<T> = Result<T, BgError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BgError {
    #[error("Invalid port: {what}")]
    InvalidPort { what: String },

    #[error("Invalid component: {what}")]
    InvalidComponent { what: String },

    #[error("Model parsing error: {what}")]
    ModelParsing { what: String },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },
}

impl BgError {
    pub fn invalid_port(what: impl Into<String>) -> Self {
        BgError::InvalidPort { what: what.into() }
    }

    pub fn invalid_component(what: impl Into<String>) -> Self {
        BgError::InvalidComponent { what: what.into() }
    }

    pub fn model_parsing(what: impl Into<String>) -> Self {
        BgError::ModelParsing { what: what.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_kind() {
        let err = BgError::invalid_port("port 3 on C_0 is already bonded");
        let msg = format!("{err}");
        assert!(msg.starts_with("Invalid port"));
        assert!(msg.contains("C_0"));
    }

    #[test]
    fn helpers_pick_the_variant() {
        assert!(matches!(
            BgError::model_parsing("x"),
            BgError::ModelParsing { .. }
        ));
        assert!(matches!(
            BgError::invalid_component("x"),
            BgError::InvalidComponent { .. }
        ));
    }
}
