//! bg-graph: composite bond graphs and their constitutive relations.
//!
//! Provides:
//! - Components (atomic primitives and nested composites) behind one [`Model`] trait
//! - The [`BondGraph`] arena with connect/disconnect and cascading removal
//! - Global coordinate bases and assembly of the linear constraint system
//!
//! # Example
//!
//! ```
//! use bg_graph::{AtomicComponent, BondGraph, Model, ParamValue, RelationTemplate};
//! use bg_symbolic::{Expr, parse};
//!
//! let c = AtomicComponent::new("C", "C")
//!     .with_ports(1)
//!     .with_state("q_0")
//!     .with_param("c", ParamValue::Expr(Expr::symbol("c")))
//!     .with_relations(RelationTemplate::Explicit(vec![
//!         parse("q_0 - c*e_0").unwrap(),
//!         parse("dq_0 - f_0").unwrap(),
//!     ]));
//!
//! let mut graph = BondGraph::new("tank");
//! graph.add(c);
//! let relations = graph.constitutive_relations().unwrap();
//! assert_eq!(relations.len(), 2);
//! ```

pub mod basis;
pub mod component;
pub mod error;
pub mod graph;
pub mod system;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use basis::{BasisVectors, ControlCoordinate, Origin, PortCoordinate, TangentCoordinate};
pub use component::{
    AtomicComponent, Component, Model, Param, ParamValue, RelationTemplate, effort, flow,
};
pub use error::{GraphError, GraphResult};
pub use graph::{Bond, BondGraph, Endpoint, PortRef};
