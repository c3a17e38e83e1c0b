//! bg-core: stable foundation for the bond graph workspace.
//!
//! Contains:
//! - ids (stable compact IDs for components and ports)
//! - error (the umbrella error type every crate converts into)

pub mod error;
pub mod ids;

// Re-exports: nice ergonomics for downstream crates
pub use error::{BgError, BgResult};
pub use ids::*;
