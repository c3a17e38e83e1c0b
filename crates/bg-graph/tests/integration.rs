//! Integration tests for bg-graph.

use bg_core::{CompId, PortId};
use bg_graph::{
    AtomicComponent, BondGraph, Component, GraphError, Model, ParamValue, PortRef,
    RelationTemplate,
};
use bg_symbolic::{Expr, parse};

fn e(s: &str) -> Expr {
    parse(s).unwrap()
}

fn symbolic(name: &str) -> ParamValue {
    ParamValue::Expr(Expr::symbol(name))
}

fn capacitor() -> AtomicComponent {
    AtomicComponent::new("C", "C")
        .with_ports(1)
        .with_state("q_0")
        .with_param("c", symbolic("c"))
        .with_relations(RelationTemplate::Explicit(vec![e("q_0 - c*e_0"), e("dq_0 - f_0")]))
}

fn inductor() -> AtomicComponent {
    AtomicComponent::new("I", "I")
        .with_ports(1)
        .with_state("p_0")
        .with_param("l", symbolic("l"))
        .with_relations(RelationTemplate::Explicit(vec![e("p_0 - l*f_0"), e("dp_0 - e_0")]))
}

fn resistor() -> AtomicComponent {
    AtomicComponent::new("R", "R")
        .with_ports(1)
        .with_param("r", symbolic("r"))
        .with_relations(RelationTemplate::Explicit(vec![e("e_0 - r*f_0")]))
}

fn junction(template: RelationTemplate) -> AtomicComponent {
    AtomicComponent::new("0", "0")
        .with_dynamic_ports()
        .with_relations(template)
}

#[test]
fn closed_rlc_on_common_effort() {
    let mut g = BondGraph::new("rlc");
    let r = g.add(resistor());
    let l = g.add(inductor());
    let c = g.add(capacitor());
    let j = g.add(junction(RelationTemplate::CommonEffort));
    for comp in [r, l, c] {
        g.connect(comp, j).unwrap();
    }

    let basis = g.basis_vectors();
    assert_eq!(basis.tangent_space.len(), 2);
    assert!(basis.control_space.is_empty());
    assert!(basis.junction_space.is_empty());
    assert_eq!(g.internal_basis_vectors().junction_space.len(), 6);

    let relations = g.constitutive_relations().unwrap();
    assert_eq!(relations.len(), 2);
    // x_0 is the inductor momentum, x_1 the capacitor charge
    assert!(relations[0].is_equivalent(&e("dx_0 - x_1/c")));
    assert!(relations[1].is_equivalent(&e("dx_1 + x_0/l + x_1/(c*r)")));
}

#[test]
fn nested_composite_contributes_its_external_basis() {
    let mut inner = BondGraph::new("tank");
    inner.add(capacitor());
    assert_eq!(inner.port_ids(), vec![PortId::from_index(0)]);

    let mut outer = BondGraph::new("circuit");
    let tank = outer.add(inner);
    let r = outer.add(resistor());
    outer.connect(tank, r).unwrap();

    assert_eq!(outer.key(tank), Some("Composite_0"));
    assert_eq!(outer.state_vars().len(), 1);
    assert_eq!(outer.state_vars()[0].1.comp, tank);

    let relations = outer.constitutive_relations().unwrap();
    assert_eq!(relations.len(), 1);
    assert!(relations[0].is_equivalent(&e("dx_0 + x_0/(c*r)")));
    assert_eq!(relations[0].to_string(), "dx_0 + x_0/(c*r)");
}

#[test]
fn parameters_propagate_through_composites() {
    let mut inner = BondGraph::new("inner");
    inner.add(capacitor());
    inner.add(resistor());
    let names: Vec<String> = inner.parameters().iter().map(|s| s.to_string()).collect();
    assert_eq!(names, vec!["c", "r"]);

    let component = Component::from(inner);
    assert_eq!(component.type_name(), "Composite");
    assert_eq!(component.port_ids().len(), 2);
}

#[test]
fn mutation_keeps_bases_consistent() {
    let mut g = BondGraph::new("g");
    let j = g.add(junction(RelationTemplate::CommonFlow));
    let c = g.add(capacitor());
    let r = g.add(resistor());
    g.connect(c, j).unwrap();
    g.connect(r, j).unwrap();
    assert!(g.ports().is_empty());

    assert_eq!(g.disconnect(r, None).unwrap(), 1);
    assert_eq!(g.ports(), vec![PortRef::new(r, PortId::from_index(0))]);
    assert_eq!(g.internal_basis_vectors().junction_space.len(), 3);

    g.remove(c).unwrap();
    assert!(g.bonds().is_empty());
    let basis = g.basis_vectors();
    assert!(basis.tangent_space.is_empty());
    assert_eq!(basis.junction_space.len(), 1);
    assert_eq!(basis.junction_space[0].1.comp, r);
}

#[test]
fn disconnect_checks_membership() {
    let mut g = BondGraph::new("g");
    let c = g.add(capacitor());
    let ghost = CompId::from_index(7);

    assert_eq!(g.disconnect(c, None).unwrap(), 0);
    assert_eq!(
        g.disconnect(ghost, None).unwrap_err(),
        GraphError::InvalidComponent { comp: ghost }
    );
    assert!(matches!(
        g.disconnect((c, PortId::from_index(3)), None),
        Err(GraphError::InvalidPort { .. })
    ));
}
