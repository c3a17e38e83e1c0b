//! Reduction of an assembled constraint system to its minimal relations.

use std::collections::HashMap;

use bg_symbolic::{Expr, Symbol};
use nalgebra::DMatrix;
use tracing::{debug, trace};

use crate::error::{AlgebraError, AlgebraResult};
use crate::extract::LinearRow;
use crate::rref::{StructuralAnalysis, rref, structural_analysis};

/// What a column of the system stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Derivative(usize),
    /// Effort or flow of junction-space port `index`. Bonded ports are
    /// eliminated from the final relations.
    Junction {
        index: usize,
        flow: bool,
        eliminate: bool,
    },
    /// Variable a nested composite left in its own relations. Always
    /// eliminated, like a bonded port.
    Auxiliary(usize),
    State(usize),
    Control(usize),
    ControlDerivative(usize),
    Constant,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub symbol: Expr,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(symbol: impl Into<Symbol>, kind: ColumnKind) -> Self {
        Self {
            symbol: Expr::symbol(symbol),
            kind,
        }
    }

    pub fn constant() -> Self {
        Self {
            symbol: Expr::one(),
            kind: ColumnKind::Constant,
        }
    }

    fn is_eliminated(&self) -> bool {
        matches!(
            self.kind,
            ColumnKind::Junction { eliminate: true, .. } | ColumnKind::Auxiliary(_)
        )
    }
}

/// One row: `Σ linear[j] * column[j] + nonlinear = 0`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Relation {
    pub linear: LinearRow,
    pub nonlinear: Expr,
}

impl Relation {
    pub fn new(linear: LinearRow, nonlinear: Expr) -> Self {
        Self { linear, nonlinear }
    }

    pub fn is_zero(&self) -> bool {
        self.linear.values().all(Expr::is_zero) && self.nonlinear.is_zero()
    }

    pub fn to_expr(&self, columns: &[Column]) -> Expr {
        self.linear
            .iter()
            .filter_map(|(&j, coeff)| columns.get(j).map(|c| coeff * &c.symbol))
            .fold(self.nonlinear.clone(), |acc, term| acc + term)
    }
}

/// Constraint rows over an ordered column set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearSystem {
    pub columns: Vec<Column>,
    pub rows: Vec<Relation>,
}

impl LinearSystem {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, relation: Relation) {
        self.rows.push(relation);
    }

    pub fn coefficient_matrix(&self) -> AlgebraResult<DMatrix<Expr>> {
        coefficient_matrix(&self.columns, &self.rows)
    }

    /// Structural rank of the block over derivative, junction, auxiliary and
    /// state columns. Returned indices are global column indices.
    pub fn structural_analysis(&self) -> AlgebraResult<StructuralAnalysis> {
        let block: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                matches!(
                    c.kind,
                    ColumnKind::Derivative(_)
                        | ColumnKind::Junction { .. }
                        | ColumnKind::Auxiliary(_)
                        | ColumnKind::State(_)
                )
            })
            .map(|(j, _)| j)
            .collect();
        let full = self.coefficient_matrix()?;
        let sub = DMatrix::from_fn(full.nrows(), block.len(), |i, k| full[(i, block[k])].clone());
        let local = structural_analysis(&sub)?;
        Ok(StructuralAnalysis {
            rank: local.rank,
            dependent: local.dependent.iter().map(|&k| block[k]).collect(),
            free: local.free.iter().map(|&k| block[k]).collect(),
        })
    }
}

fn coefficient_matrix(columns: &[Column], rows: &[Relation]) -> AlgebraResult<DMatrix<Expr>> {
    let ncols = columns.len();
    for row in rows {
        if let Some((&j, _)) = row.linear.last_key_value() {
            if j >= ncols {
                return Err(AlgebraError::IndexOob {
                    what: "relation column",
                    index: j,
                    len: ncols,
                });
            }
        }
    }
    Ok(DMatrix::from_fn(rows.len(), ncols, |i, j| {
        rows[i].linear.get(&j).cloned().unwrap_or_default()
    }))
}

/// Reducer settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReduceConfig {
    /// Differentiate algebraic state/control constraints when bonded
    /// junction variables are left undetermined, then reduce again.
    pub differentiate_constraints: bool,
    /// Replace eliminated junction variables inside surviving nonlinear
    /// terms by their definitions.
    pub substitute_eliminated: bool,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            differentiate_constraints: true,
            substitute_eliminated: true,
        }
    }
}

/// Output of [`reduce`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reduction {
    /// Surviving rows, in pivot order.
    pub relations: Vec<Relation>,
    pub dropped_redundant: usize,
    pub dropped_eliminated: usize,
    /// Rows added by constraint differentiation.
    pub differentiated: usize,
}

impl Reduction {
    pub fn equations(&self, columns: &[Column]) -> Vec<Expr> {
        self.relations.iter().map(|r| r.to_expr(columns)).collect()
    }

    fn references_eliminated(&self, columns: &[Column]) -> bool {
        let eliminated: Vec<&Symbol> = columns
            .iter()
            .filter(|c| c.is_eliminated())
            .filter_map(|c| c.symbol.as_symbol())
            .collect();
        self.relations.iter().any(|rel| {
            rel.linear
                .keys()
                .any(|&j| columns.get(j).is_some_and(Column::is_eliminated))
                || (!rel.nonlinear.is_zero()
                    && rel
                        .nonlinear
                        .free_symbols()
                        .iter()
                        .any(|s| eliminated.contains(&s)))
        })
    }
}

/// Reduce the system to its minimal relations.
///
/// Rows are brought to reduced row-echelon form together with a provenance
/// transform `T`. Row `i` keeps the nonlinear term `Σ_j T[i, j] * N_j`. A row
/// is dropped when it vanishes entirely, or when its pivot is an eliminated
/// junction column.
pub fn reduce(system: &LinearSystem, config: &ReduceConfig) -> AlgebraResult<Reduction> {
    let mut reduction = reduce_once(&system.columns, &system.rows, config)?;

    if config.differentiate_constraints && reduction.references_eliminated(&system.columns) {
        let derived = differentiate_constraints(&system.columns, &reduction.relations);
        if !derived.is_empty() {
            debug!(
                count = derived.len(),
                "junction variables undetermined, differentiating constraints"
            );
            let count = derived.len();
            let mut rows = system.rows.clone();
            rows.extend(derived);
            reduction = reduce_once(&system.columns, &rows, config)?;
            reduction.differentiated = count;
        }
    }
    Ok(reduction)
}

fn reduce_once(
    columns: &[Column],
    rows: &[Relation],
    config: &ReduceConfig,
) -> AlgebraResult<Reduction> {
    let matrix = coefficient_matrix(columns, rows)?;
    let (nrows, ncols) = matrix.shape();
    debug!(rows = nrows, cols = ncols, "reducing constraint system");

    let reduced = rref(&matrix)?;
    let residuals: Vec<(usize, &Expr)> = rows
        .iter()
        .map(|r| &r.nonlinear)
        .enumerate()
        .filter(|(_, n)| !n.is_zero())
        .collect();

    let mut reduction = Reduction::default();
    let mut definitions: HashMap<Symbol, Expr> = HashMap::new();

    for i in 0..nrows {
        let linear: LinearRow = (0..ncols)
            .filter(|&j| !reduced.matrix[(i, j)].is_zero())
            .map(|j| (j, reduced.matrix[(i, j)].clone()))
            .collect();
        let nonlinear: Expr = residuals
            .iter()
            .filter(|(j, _)| !reduced.augment[(i, *j)].is_zero())
            .map(|(j, n)| &reduced.augment[(i, *j)] * *n)
            .sum();

        let Some(&pivot) = reduced.pivots.get(i) else {
            if nonlinear.is_zero() {
                trace!(row = i, "redundant row dropped");
                reduction.dropped_redundant += 1;
            } else {
                reduction.relations.push(Relation::new(linear, nonlinear));
            }
            continue;
        };

        let column = &columns[pivot];
        if column.is_eliminated() {
            if let Some(symbol) = column.symbol.as_symbol() {
                if !nonlinear.contains_symbol(symbol) {
                    // pivot coefficient is one: x_p = -(rest)
                    let rest: Expr = linear
                        .iter()
                        .filter(|(j, _)| **j != pivot)
                        .map(|(&j, c)| c * &columns[j].symbol)
                        .sum();
                    definitions.insert(symbol.clone(), -(rest + &nonlinear));
                }
            }
            trace!(row = i, column = %column.symbol, "junction definition eliminated");
            reduction.dropped_eliminated += 1;
            continue;
        }
        reduction.relations.push(Relation::new(linear, nonlinear));
    }

    if config.substitute_eliminated && !definitions.is_empty() {
        for rel in &mut reduction.relations {
            if !rel.nonlinear.is_zero() {
                rel.nonlinear = rel.nonlinear.subs(&definitions)?;
            }
        }
    }

    debug!(
        kept = reduction.relations.len(),
        redundant = reduction.dropped_redundant,
        eliminated = reduction.dropped_eliminated,
        "reduction finished"
    );
    Ok(reduction)
}

/// Time derivatives of the purely algebraic state/control constraints.
///
/// A row qualifies when it is linear, has at least one state or control
/// entry, no junction or derivative entries, and coefficients free of time.
fn differentiate_constraints(columns: &[Column], relations: &[Relation]) -> Vec<Relation> {
    let index: HashMap<ColumnKind, usize> = columns
        .iter()
        .enumerate()
        .map(|(j, c)| (c.kind, j))
        .collect();
    let time = Symbol::time();

    relations
        .iter()
        .filter(|rel| rel.nonlinear.is_zero() && !rel.linear.is_empty())
        .filter_map(|rel| {
            let mut derived = LinearRow::new();
            for (&j, coeff) in &rel.linear {
                if coeff.contains_symbol(&time) {
                    return None;
                }
                let target = match columns.get(j)?.kind {
                    ColumnKind::State(k) => index.get(&ColumnKind::Derivative(k))?,
                    ColumnKind::Control(k) => index.get(&ColumnKind::ControlDerivative(k))?,
                    ColumnKind::Constant => continue,
                    _ => return None,
                };
                derived.insert(*target, coeff.clone());
            }
            (!derived.is_empty()).then(|| Relation::new(derived, Expr::zero()))
        })
        .collect()
}
