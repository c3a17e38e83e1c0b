//! Exact linear algebra for bond graph constraint systems.
//!
//! The pipeline has three stages:
//! - [`junction`] turns bonds into effort/flow constraint rows;
//! - [`extract`] splits each constitutive relation into a linear row and a
//!   nonlinear residual;
//! - [`reduce`] row-reduces the stacked system with exact arithmetic and
//!   keeps only the relations that survive elimination.

pub mod error;
pub mod extract;
pub mod junction;
pub mod reduce;
pub mod rref;

pub use error::{AlgebraError, AlgebraResult};
pub use extract::{LinearRow, extract_coefficients, recombine};
pub use junction::{SparseMatrix, junction_constraints};
pub use reduce::{Column, ColumnKind, LinearSystem, ReduceConfig, Reduction, Relation, reduce};
pub use rref::{
    Rref, StructuralAnalysis, augmented_rref, multiply, rref, smith_normal_form,
    structural_analysis, to_dense,
};
