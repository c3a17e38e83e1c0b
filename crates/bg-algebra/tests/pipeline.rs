//! The algebra stages wired together by hand, without a graph.

use std::collections::{BTreeSet, HashMap};

use bg_algebra::{
    Column, ColumnKind, LinearRow, LinearSystem, ReduceConfig, Relation, extract_coefficients,
    junction_constraints, reduce,
};
use bg_symbolic::{Expr, Symbol, parse};

fn junction(index: usize, flow: bool) -> ColumnKind {
    ColumnKind::Junction {
        index,
        flow,
        eliminate: true,
    }
}

/// Capacitor bonded to a resistor: columns dx_0, e_0, f_0, e_1, f_1, x_0, 1.
fn rc_columns() -> Vec<Column> {
    vec![
        Column::new("dx_0", ColumnKind::Derivative(0)),
        Column::new("e_0", junction(0, false)),
        Column::new("f_0", junction(0, true)),
        Column::new("e_1", junction(1, false)),
        Column::new("f_1", junction(1, true)),
        Column::new("x_0", ColumnKind::State(0)),
        Column::constant(),
    ]
}

fn assemble(resistor: &str) -> LinearSystem {
    let mut system = LinearSystem::new(rc_columns());
    let coordinates: Vec<Expr> = system.columns.iter().map(|c| c.symbol.clone()).collect();

    let bonds = [("c", "r")];
    let ports = HashMap::from([("c", 0), ("r", 1)]);
    let constraints = junction_constraints(&bonds, &ports, 1).unwrap();
    let mut rows = vec![LinearRow::new(); 2];
    for ((i, j), value) in constraints {
        rows[i].insert(j, value);
    }
    for row in rows {
        system.push(Relation::new(row, Expr::zero()));
    }

    let params = BTreeSet::from([Symbol::new("c"), Symbol::new("r")]);
    let capacitor = HashMap::from([
        (Symbol::new("q_0"), 5),
        (Symbol::new("dq_0"), 0),
        (Symbol::new("e_0"), 1),
        (Symbol::new("f_0"), 2),
    ]);
    for relation in ["q_0 - c*e_0", "dq_0 - f_0"] {
        let (linear, nonlinear) =
            extract_coefficients(&parse(relation).unwrap(), &capacitor, &coordinates, &params)
                .unwrap();
        system.push(Relation::new(linear, nonlinear));
    }

    let local = HashMap::from([(Symbol::new("e_0"), 3), (Symbol::new("f_0"), 4)]);
    let (linear, nonlinear) =
        extract_coefficients(&parse(resistor).unwrap(), &local, &coordinates, &params).unwrap();
    system.push(Relation::new(linear, nonlinear));
    system
}

#[test]
fn linear_rc_circuit() {
    let system = assemble("e_0 - r*f_0");
    let reduction = reduce(&system, &ReduceConfig::default()).unwrap();

    assert_eq!(reduction.dropped_eliminated, 4);
    let equations = reduction.equations(&system.columns);
    assert_eq!(equations.len(), 1);
    assert!(equations[0].is_equivalent(&parse("dx_0 + x_0/(c*r)").unwrap()));
}

#[test]
fn cubic_resistor_keeps_the_residual() {
    let system = assemble("e_0 - r*f_0^3");
    let reduction = reduce(&system, &ReduceConfig::default()).unwrap();

    // the resistor flow stays undetermined and is left in place
    assert_eq!(
        reduction.equations(&system.columns),
        vec![parse("dx_0 + f_1").unwrap(), parse("x_0 - c*r*f_1^3").unwrap()]
    );
    assert_eq!(reduction.differentiated, 0);
}

#[test]
fn structural_rank_of_rc_circuit() {
    let system = assemble("e_0 - r*f_0");
    let analysis = system.structural_analysis().unwrap();
    assert_eq!(analysis.rank, 5);
    assert_eq!(analysis.free, vec![5]);
}
