//! Junction structure: the bond constraints in matrix form.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use bg_symbolic::Expr;

use crate::error::{AlgebraError, AlgebraResult};

/// Sparse matrix keyed by `(row, col)`. Absent entries are zero.
pub type SparseMatrix = BTreeMap<(usize, usize), Expr>;

/// Constraint rows for a list of bonds.
///
/// Port `k` owns the effort column `offset + 2k` and the flow column
/// `offset + 2k + 1`. Bond `i` between `p1` and `p2` contributes
/// - row `2i`: `-e(p1) + e(p2)`, equal efforts;
/// - row `2i + 1`: `f(p1) + f(p2)`, flows directed into the bond cancel.
pub fn junction_constraints<K>(
    bonds: &[(K, K)],
    index_map: &HashMap<K, usize>,
    offset: usize,
) -> AlgebraResult<SparseMatrix>
where
    K: Eq + Hash + Debug,
{
    let lookup = |port: &K| {
        index_map
            .get(port)
            .copied()
            .ok_or_else(|| AlgebraError::UnknownEndpoint {
                what: format!("{port:?}"),
            })
    };

    let mut matrix = SparseMatrix::new();
    for (i, (p1, p2)) in bonds.iter().enumerate() {
        let (j1, j2) = (lookup(p1)?, lookup(p2)?);
        let effort_row = 2 * i;
        let flow_row = effort_row + 1;
        matrix.insert((effort_row, offset + 2 * j1), Expr::integer(-1));
        matrix.insert((effort_row, offset + 2 * j2), Expr::one());
        matrix.insert((flow_row, offset + 2 * j1 + 1), Expr::one());
        matrix.insert((flow_row, offset + 2 * j2 + 1), Expr::one());
    }
    Ok(matrix)
}
