//! bg-library: primitive bond graph components.
//!
//! Provides:
//! - A static registry of element templates (R, C, I, Se, Sf, TF, GY, 0, 1)
//! - Construction from a type id with positional parameter values
//! - Cloning of existing components under a new name
//!
//! # Example
//!
//! ```
//! use bg_graph::{BondGraph, Model};
//! use bg_library::{BuildArgs, new, parse_value};
//!
//! let mut graph = BondGraph::new("rc");
//! let c = graph.add(new("C", BuildArgs::default()).unwrap());
//! let r = graph.add(new("R", BuildArgs::default().with_value(parse_value("10").unwrap())).unwrap());
//! graph.connect(c, r).unwrap();
//!
//! let relations = graph.constitutive_relations().unwrap();
//! assert_eq!(relations.len(), 1);
//! ```

pub mod error;
pub mod factory;
pub mod registry;

// Re-exports
pub use error::{LibraryError, LibraryResult};
pub use factory::{BuildArgs, clone_component, new, parse_value};
pub use registry::{
    ComponentSpec, ParamDefault, ParamSpec, PortSpec, REGISTRY, RelationSpec, lookup,
};
