//! Exact Gauss-Jordan elimination over symbolic matrices.

use bg_symbolic::Expr;
use nalgebra::DMatrix;

use crate::error::{AlgebraError, AlgebraResult};
use crate::junction::SparseMatrix;

/// Result of an augmented row reduction.
#[derive(Clone, Debug, PartialEq)]
pub struct Rref {
    /// Reduced row-echelon form of the input.
    pub matrix: DMatrix<Expr>,
    /// The augment after the same row operations.
    pub augment: DMatrix<Expr>,
    /// Pivot column of row `i`, for the first `pivots.len()` rows.
    pub pivots: Vec<usize>,
}

impl Rref {
    pub fn rank(&self) -> usize {
        self.pivots.len()
    }
}

/// Structural rank of a constraint block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuralAnalysis {
    pub rank: usize,
    /// Columns fixed by the others.
    pub dependent: Vec<usize>,
    /// Columns left free.
    pub free: Vec<usize>,
}

pub fn zeros(nrows: usize, ncols: usize) -> DMatrix<Expr> {
    DMatrix::from_element(nrows, ncols, Expr::zero())
}

pub fn identity(n: usize) -> DMatrix<Expr> {
    DMatrix::from_fn(n, n, |i, j| if i == j { Expr::one() } else { Expr::zero() })
}

pub fn to_dense(sparse: &SparseMatrix, nrows: usize, ncols: usize) -> AlgebraResult<DMatrix<Expr>> {
    let mut dense = zeros(nrows, ncols);
    for (&(i, j), value) in sparse {
        if i >= nrows || j >= ncols {
            return Err(AlgebraError::IndexOob {
                what: "sparse entry",
                index: if i >= nrows { i } else { j },
                len: if i >= nrows { nrows } else { ncols },
            });
        }
        dense[(i, j)] = value.clone();
    }
    Ok(dense)
}

/// `a * b` with exact arithmetic.
pub fn multiply(a: &DMatrix<Expr>, b: &DMatrix<Expr>) -> AlgebraResult<DMatrix<Expr>> {
    if a.ncols() != b.nrows() {
        return Err(AlgebraError::Dimension {
            what: "matrix product",
            expected: a.ncols(),
            got: b.nrows(),
        });
    }
    Ok(DMatrix::from_fn(a.nrows(), b.ncols(), |i, j| {
        (0..a.ncols())
            .filter(|&k| !a[(i, k)].is_zero() && !b[(k, j)].is_zero())
            .map(|k| &a[(i, k)] * &b[(k, j)])
            .sum()
    }))
}

/// Reduce `matrix` to row-echelon form, applying every row operation to
/// `augment` as well.
///
/// The pivot of each column is its first nonzero entry at or below the
/// current row. Entries are exact, so no magnitude-based pivoting is needed.
pub fn augmented_rref(matrix: &DMatrix<Expr>, augment: &DMatrix<Expr>) -> AlgebraResult<Rref> {
    let (nrows, ncols) = matrix.shape();
    if augment.nrows() != nrows {
        return Err(AlgebraError::Dimension {
            what: "augment rows",
            expected: nrows,
            got: augment.nrows(),
        });
    }
    let mut m = matrix.clone();
    let mut a = augment.clone();
    let mut pivots = Vec::new();
    let mut row = 0;

    for col in 0..ncols {
        if row == nrows {
            break;
        }
        let Some(pivot_row) = (row..nrows).find(|&r| !m[(r, col)].is_zero()) else {
            continue;
        };
        if pivot_row != row {
            m.swap_rows(row, pivot_row);
            a.swap_rows(row, pivot_row);
        }

        let inv = m[(row, col)].recip()?;
        scale_row(&mut m, row, &inv);
        scale_row(&mut a, row, &inv);

        for r in 0..nrows {
            if r == row || m[(r, col)].is_zero() {
                continue;
            }
            let factor = m[(r, col)].clone();
            eliminate(&mut m, r, row, &factor);
            eliminate(&mut a, r, row, &factor);
        }

        pivots.push(col);
        row += 1;
    }

    Ok(Rref {
        matrix: m,
        augment: a,
        pivots,
    })
}

fn scale_row(m: &mut DMatrix<Expr>, row: usize, factor: &Expr) {
    for j in 0..m.ncols() {
        if !m[(row, j)].is_zero() {
            let v = &m[(row, j)] * factor;
            m[(row, j)] = v;
        }
    }
}

/// `row[target] -= factor * row[source]`
fn eliminate(m: &mut DMatrix<Expr>, target: usize, source: usize, factor: &Expr) {
    for j in 0..m.ncols() {
        if m[(source, j)].is_zero() {
            continue;
        }
        let v = &m[(target, j)] - &(factor * &m[(source, j)]);
        m[(target, j)] = v;
    }
}

/// Reduced row-echelon form; `augment` is the transform `T` with
/// `T * matrix == reduced`.
pub fn rref(matrix: &DMatrix<Expr>) -> AlgebraResult<Rref> {
    augmented_rref(matrix, &identity(matrix.nrows()))
}

/// Structural normal form: an `n x n` matrix (`n` = columns of `matrix`)
/// holding each reduced row on the diagonal position of its pivot. A nonzero
/// diagonal entry marks a dependent column.
pub fn smith_normal_form(matrix: &DMatrix<Expr>) -> AlgebraResult<DMatrix<Expr>> {
    let n = matrix.ncols();
    let reduced = rref(matrix)?;
    let mut out = zeros(n, n);
    for (i, &col) in reduced.pivots.iter().enumerate() {
        for j in 0..n {
            out[(col, j)] = reduced.matrix[(i, j)].clone();
        }
    }
    Ok(out)
}

pub fn structural_analysis(matrix: &DMatrix<Expr>) -> AlgebraResult<StructuralAnalysis> {
    let snf = smith_normal_form(matrix)?;
    let (dependent, free): (Vec<usize>, Vec<usize>) =
        (0..snf.ncols()).partition(|&i| !snf[(i, i)].is_zero());
    Ok(StructuralAnalysis {
        rank: dependent.len(),
        dependent,
        free,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_symbolic::parse;

    fn e(s: &str) -> Expr {
        parse(s).unwrap()
    }

    fn int_matrix(rows: usize, cols: usize, data: &[i64]) -> DMatrix<Expr> {
        DMatrix::from_fn(rows, cols, |i, j| Expr::integer(data[i * cols + j]))
    }

    #[test]
    fn augmented_reduction_carries_the_augment() {
        let m = int_matrix(3, 4, &[1, 0, 1, 0, 1, 0, 1, 0, 0, 0, 1, 0]);
        let a = DMatrix::from_fn(3, 1, |i, _| e(["a", "a", "c"][i]));
        let r = augmented_rref(&m, &a).unwrap();

        assert_eq!(r.pivots, vec![0, 2]);
        assert_eq!(r.augment[(0, 0)], e("a - c"));
        assert_eq!(r.augment[(1, 0)], e("c"));
        assert_eq!(r.augment[(2, 0)], Expr::zero());
    }

    #[test]
    fn transform_reproduces_the_reduction() {
        let m = DMatrix::from_fn(2, 3, |i, j| e([["r", "1", "0"], ["1", "c", "-1"]][i][j]));
        let r = rref(&m).unwrap();
        let product = multiply(&r.augment, &m).unwrap();
        for (lhs, rhs) in product.iter().zip(r.matrix.iter()) {
            assert!(lhs.is_equivalent(rhs), "{lhs} != {rhs}");
        }
        assert_eq!(r.rank(), 2);
        assert_eq!(r.matrix[(0, 2)], e("1/(c*r - 1)"));
    }

    #[test]
    fn symbolic_pivot_is_divided_out() {
        let m = DMatrix::from_fn(1, 2, |_, j| e(["c", "-1"][j]));
        let r = rref(&m).unwrap();
        assert_eq!(r.matrix[(0, 0)], Expr::one());
        assert_eq!(r.matrix[(0, 1)], e("-1/c"));
    }

    #[test]
    fn snf_places_rows_at_pivots() {
        let mut m = zeros(2, 3);
        m[(0, 2)] = Expr::integer(2);
        m[(1, 1)] = Expr::one();
        let snf = smith_normal_form(&m).unwrap();

        assert_eq!(snf.shape(), (3, 3));
        assert!(snf[(0, 0)].is_zero());
        assert!(!snf[(1, 1)].is_zero());
        assert!(!snf[(2, 2)].is_zero());
    }

    #[test]
    fn snf_of_identity_with_missing_row() {
        let m = int_matrix(2, 3, &[1, 0, 0, 0, 0, 1]);
        let snf = smith_normal_form(&m).unwrap();
        let expected = int_matrix(3, 3, &[1, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(snf, expected);
    }

    #[test]
    fn structural_analysis_splits_columns() {
        let m = int_matrix(2, 3, &[1, 1, 0, 2, 2, 0]);
        let sa = structural_analysis(&m).unwrap();
        assert_eq!(sa.rank, 1);
        assert_eq!(sa.dependent, vec![0]);
        assert_eq!(sa.free, vec![1, 2]);
    }

    #[test]
    fn dense_conversion_checks_bounds() {
        let sparse = SparseMatrix::from([((0, 3), Expr::one())]);
        assert!(to_dense(&sparse, 1, 4).is_ok());
        assert!(matches!(
            to_dense(&sparse, 1, 3),
            Err(AlgebraError::IndexOob { index: 3, len: 3, .. })
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn matrix_strategy() -> impl Strategy<Value = DMatrix<Expr>> {
        (1usize..4, 1usize..5).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(-3i64..=3, rows * cols).prop_map(move |data| {
                DMatrix::from_fn(rows, cols, |i, j| Expr::integer(data[i * cols + j]))
            })
        })
    }

    proptest! {
        #[test]
        fn transform_times_original_is_reduced(m in matrix_strategy()) {
            let r = rref(&m).unwrap();
            prop_assert_eq!(multiply(&r.augment, &m).unwrap(), r.matrix);
        }

        #[test]
        fn reduction_is_idempotent(m in matrix_strategy()) {
            let once = rref(&m).unwrap();
            let twice = rref(&once.matrix).unwrap();
            prop_assert_eq!(&twice.matrix, &once.matrix);
            prop_assert_eq!(twice.pivots, once.pivots);
        }
    }
}
