//! bg-symbolic: exact symbolic algebra for constitutive relations.
//!
//! Expressions are rational functions with arbitrary-precision rational
//! coefficients. Transcendental functions and non-integer powers are opaque
//! atoms, so the algebra stays exact and decidable: two expressions are equal
//! as functions iff their difference normalizes to zero.

pub mod error;
pub mod expr;
pub mod parser;
pub mod poly;
pub mod symbol;

pub use error::{SymbolicError, SymbolicResult};
pub use expr::Expr;
pub use parser::parse;
pub use poly::{Atom, Func, MAX_EXPONENT, Monomial, Poly};
pub use symbol::{Symbol, TIME};

// Re-export the coefficient type so callers need not depend on num-rational.
pub use num_rational::BigRational;
