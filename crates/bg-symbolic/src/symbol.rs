//! Named symbols.

use std::fmt;
use std::sync::Arc;

/// Name of the independent time variable. Parameters given as time functions
/// are expressions over this symbol.
pub const TIME: &str = "t";

/// A symbolic name. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// `<prefix>_<index>`, the naming scheme of every coordinate symbol.
    pub fn indexed(prefix: &str, index: usize) -> Self {
        Self::new(format!("{prefix}_{index}"))
    }

    /// The time symbol `t`.
    pub fn time() -> Self {
        Self::new(TIME)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Symbol naming the time derivative: `q_0` becomes `dq_0`.
    pub fn derivative(&self) -> Self {
        Self::new(format!("d{}", self.0))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}
