//! Split a local constitutive relation into a linear row and a residual.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bg_symbolic::{Atom, Expr, Monomial, Poly, Symbol};
use tracing::trace;

use crate::error::{AlgebraError, AlgebraResult};

/// Sparse coefficient row keyed by global column.
pub type LinearRow = BTreeMap<usize, Expr>;

/// Decompose `relation` against the global coordinate list.
///
/// `local_map` sends each local symbol to its column in `coordinates`, whose
/// last entry is the constant `1`. Symbols outside `local_map` must be listed
/// in `parameters` or be the time symbol.
///
/// Classification is per term of the expanded numerator: constants go to the
/// last column, `coeff * coordinate` to the coordinate's column, everything
/// else to the residual. A denominator that depends on a coordinate makes the
/// whole relation residual.
pub fn extract_coefficients(
    relation: &Expr,
    local_map: &HashMap<Symbol, usize>,
    coordinates: &[Expr],
    parameters: &BTreeSet<Symbol>,
) -> AlgebraResult<(LinearRow, Expr)> {
    let constant_col = coordinates
        .len()
        .checked_sub(1)
        .ok_or(AlgebraError::Dimension {
            what: "coordinate list",
            expected: 1,
            got: 0,
        })?;

    let time = Symbol::time();
    for symbol in relation.free_symbols() {
        if !local_map.contains_key(&symbol) && !parameters.contains(&symbol) && symbol != time {
            return Err(AlgebraError::UnmappedSymbol {
                symbol: symbol.to_string(),
            });
        }
    }

    let mut substitution = HashMap::with_capacity(local_map.len());
    for (local, &col) in local_map {
        let global = coordinates.get(col).ok_or(AlgebraError::IndexOob {
            what: "local symbol column",
            index: col,
            len: coordinates.len(),
        })?;
        substitution.insert(local.clone(), global.clone());
    }
    let expr = relation.subs(&substitution)?;

    let columns: HashMap<Symbol, usize> = coordinates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.as_symbol().map(|s| (s.clone(), i)))
        .collect();

    let den = expr.denominator();
    if poly_depends_on(den, &columns) {
        trace!(%expr, "coordinate in denominator, relation is fully nonlinear");
        return Ok((LinearRow::new(), expr));
    }
    let den = Expr::from_poly(den.clone());

    let mut linear = LinearRow::new();
    let mut nonlinear = Poly::zero();
    for (mon, coeff) in expr.numerator().terms() {
        match classify(mon, &columns) {
            Term::Constant => accumulate(&mut linear, constant_col, mon.clone(), coeff, &den)?,
            Term::Linear(atom, col) => {
                accumulate(&mut linear, col, mon.without(atom), coeff, &den)?
            }
            Term::Nonlinear => nonlinear.add_term(mon.clone(), coeff.clone()),
        }
    }
    linear.retain(|_, c| !c.is_zero());
    let nonlinear = Expr::from_poly(nonlinear).checked_div(&den)?;

    if !nonlinear.is_zero() {
        trace!(%relation, %nonlinear, "nonlinear residual");
    }
    Ok((linear, nonlinear))
}

enum Term<'a> {
    Constant,
    Linear(&'a Atom, usize),
    Nonlinear,
}

fn classify<'a>(mon: &'a Monomial, columns: &HashMap<Symbol, usize>) -> Term<'a> {
    let mut found = None;
    for (atom, exp) in mon.factors() {
        match atom {
            Atom::Symbol(s) => {
                if let Some(&col) = columns.get(s) {
                    if exp != 1 || found.is_some() {
                        return Term::Nonlinear;
                    }
                    found = Some((atom, col));
                }
            }
            _ => {
                if atom_depends_on(atom, columns) {
                    return Term::Nonlinear;
                }
            }
        }
    }
    match found {
        Some((atom, col)) => Term::Linear(atom, col),
        None => Term::Constant,
    }
}

fn accumulate(
    linear: &mut LinearRow,
    col: usize,
    mon: Monomial,
    coeff: &bg_symbolic::BigRational,
    den: &Expr,
) -> AlgebraResult<()> {
    let term = Expr::from_poly(Poly::term(mon, coeff.clone())).checked_div(den)?;
    let slot = linear.entry(col).or_default();
    *slot += &term;
    Ok(())
}

fn atom_depends_on(atom: &Atom, columns: &HashMap<Symbol, usize>) -> bool {
    let mut symbols = BTreeSet::new();
    match atom {
        Atom::Symbol(s) => {
            symbols.insert(s.clone());
        }
        Atom::Apply(_, arg) => symbols.extend(arg.free_symbols()),
        Atom::Pow(base, exp) => {
            symbols.extend(base.free_symbols());
            symbols.extend(exp.free_symbols());
        }
    }
    symbols.iter().any(|s| columns.contains_key(s))
}

fn poly_depends_on(poly: &Poly, columns: &HashMap<Symbol, usize>) -> bool {
    poly.terms()
        .any(|(mon, _)| mon.factors().any(|(atom, _)| atom_depends_on(atom, columns)))
}

/// Rebuild `Σ coeff * coordinate + residual`.
pub fn recombine(linear: &LinearRow, nonlinear: &Expr, coordinates: &[Expr]) -> Expr {
    linear
        .iter()
        .filter_map(|(&col, coeff)| coordinates.get(col).map(|c| coeff * c))
        .fold(nonlinear.clone(), |acc, term| acc + term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_symbolic::parse;

    fn coords(names: &[&str]) -> Vec<Expr> {
        let mut out: Vec<Expr> = names.iter().map(|n| Expr::symbol(*n)).collect();
        out.push(Expr::one());
        out
    }

    fn local(pairs: &[(&str, usize)]) -> HashMap<Symbol, usize> {
        pairs.iter().map(|(s, i)| (Symbol::new(s), *i)).collect()
    }

    #[test]
    fn affine_relation() {
        let relation = parse("y - 2*x - 3").unwrap();
        let coordinates = coords(&["r_1", "r_0"]);
        let (linear, nonlinear) = extract_coefficients(
            &relation,
            &local(&[("y", 0), ("x", 1)]),
            &coordinates,
            &BTreeSet::new(),
        )
        .unwrap();

        assert_eq!(linear.len(), 3);
        assert_eq!(linear[&0], Expr::one());
        assert_eq!(linear[&1], Expr::integer(-2));
        assert_eq!(linear[&2], Expr::integer(-3));
        assert!(nonlinear.is_zero());
    }

    #[test]
    fn nonlinear_term_is_isolated_per_term() {
        let relation = parse("y - 2*x - 3 + exp(x)").unwrap();
        let coordinates = coords(&["r_1", "r_0"]);
        let (linear, nonlinear) = extract_coefficients(
            &relation,
            &local(&[("y", 0), ("x", 1)]),
            &coordinates,
            &BTreeSet::new(),
        )
        .unwrap();

        assert_eq!(linear[&0], Expr::one());
        assert_eq!(linear[&1], Expr::integer(-2));
        assert_eq!(linear[&2], Expr::integer(-3));
        assert_eq!(nonlinear, parse("exp(r_0)").unwrap());
    }

    #[test]
    fn symbolic_coefficients_and_products() {
        let relation = parse("q_0/c - e_0 + r*e_0*f_0").unwrap();
        let coordinates = coords(&["x_0", "e_3", "f_3"]);
        let params = BTreeSet::from([Symbol::new("c"), Symbol::new("r")]);
        let (linear, nonlinear) = extract_coefficients(
            &relation,
            &local(&[("q_0", 0), ("e_0", 1), ("f_0", 2)]),
            &coordinates,
            &params,
        )
        .unwrap();

        assert_eq!(linear[&0], parse("1/c").unwrap());
        assert_eq!(linear[&1], Expr::integer(-1));
        assert!(!linear.contains_key(&2));
        assert_eq!(nonlinear, parse("r*e_3*f_3").unwrap());
    }

    #[test]
    fn coordinate_denominator_is_nonlinear() {
        let relation = parse("e_0 - 1/f_0").unwrap();
        let coordinates = coords(&["e_1", "f_1"]);
        let (linear, nonlinear) = extract_coefficients(
            &relation,
            &local(&[("e_0", 0), ("f_0", 1)]),
            &coordinates,
            &BTreeSet::new(),
        )
        .unwrap();

        assert!(linear.is_empty());
        assert!(nonlinear.is_equivalent(&parse("e_1 - 1/f_1").unwrap()));
    }

    #[test]
    fn time_is_an_admissible_coefficient() {
        let relation = parse("e_0 - sin(t)").unwrap();
        let coordinates = coords(&["e_0"]);
        let (linear, nonlinear) = extract_coefficients(
            &relation,
            &local(&[("e_0", 0)]),
            &coordinates,
            &BTreeSet::new(),
        )
        .unwrap();

        assert_eq!(linear[&1], parse("-sin(t)").unwrap());
        assert!(nonlinear.is_zero());
    }

    #[test]
    fn unmapped_symbol_is_rejected() {
        let relation = parse("e_0 - z*f_0").unwrap();
        let err = extract_coefficients(
            &relation,
            &local(&[("e_0", 0), ("f_0", 1)]),
            &coords(&["e_0", "f_0"]),
            &BTreeSet::new(),
        )
        .unwrap_err();
        assert_eq!(err, AlgebraError::UnmappedSymbol { symbol: "z".into() });
    }

    #[test]
    fn recombination_restores_the_relation() {
        let relation = parse("y*x + 3*y - exp(x) + 7").unwrap();
        let coordinates = coords(&["a", "b"]);
        let map = local(&[("y", 0), ("x", 1)]);
        let (linear, nonlinear) =
            extract_coefficients(&relation, &map, &coordinates, &BTreeSet::new()).unwrap();

        let back = recombine(&linear, &nonlinear, &coordinates);
        assert_eq!(back, parse("a*b + 3*a - exp(b) + 7").unwrap());
    }
}
