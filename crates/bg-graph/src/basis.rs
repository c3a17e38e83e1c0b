//! Global coordinate basis of a composite graph.
//!
//! Every local quantity of every member gets a global symbol: states become
//! `x_i` (derivative `dx_i`), ports become `e_i`/`f_i`, controls become `u_i`
//! (derivative `du_i`). Members are walked in insertion order and each class
//! is numbered from zero, so the assignment is deterministic. The internal
//! basis also numbers the leftover internal variables of nested composites
//! as `v_i`.

use std::collections::HashMap;

use bg_algebra::{SparseMatrix, junction_constraints};
use bg_core::{CompId, PortId};
use bg_symbolic::Symbol;

use crate::component::{Model, effort, flow};
use crate::error::GraphResult;
use crate::graph::{BondGraph, PortRef};

/// The member and local identifier a global coordinate stands for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin<L> {
    pub comp: CompId,
    pub local: L,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TangentCoordinate {
    pub state: Symbol,
    pub derivative: Symbol,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortCoordinate {
    pub effort: Symbol,
    pub flow: Symbol,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ControlCoordinate {
    pub control: Symbol,
    pub derivative: Symbol,
}

/// Tangent, junction and control spaces of a graph. Position in each list
/// is the coordinate's global index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasisVectors {
    pub tangent_space: Vec<(TangentCoordinate, Origin<Symbol>)>,
    pub junction_space: Vec<(PortCoordinate, Origin<PortId>)>,
    pub control_space: Vec<(ControlCoordinate, Origin<Symbol>)>,
    /// Members' internal variables. Only filled in the internal basis.
    pub auxiliary_space: Vec<(Symbol, Origin<Symbol>)>,
}

impl BasisVectors {
    /// Global index of a member's port.
    pub fn port_index(&self, port: PortRef) -> Option<usize> {
        self.junction_space
            .iter()
            .position(|(_, o)| o.comp == port.comp && o.local == port.port)
    }

    pub(crate) fn port_map(&self) -> HashMap<PortRef, usize> {
        self.junction_space
            .iter()
            .enumerate()
            .map(|(i, (_, o))| (PortRef::new(o.comp, o.local), i))
            .collect()
    }
}

impl BondGraph {
    /// External basis: all states and controls, and only the exposed ports.
    pub fn basis_vectors(&self) -> BasisVectors {
        self.assemble_basis(false)
    }

    /// Basis over every member port, bonded or not.
    pub fn internal_basis_vectors(&self) -> BasisVectors {
        self.assemble_basis(true)
    }

    fn assemble_basis(&self, all_ports: bool) -> BasisVectors {
        let exposed = if all_ports { Vec::new() } else { self.ports() };
        let mut basis = BasisVectors::default();
        for (comp, member) in self.components() {
            for local in member.state_symbols() {
                let i = basis.tangent_space.len();
                basis.tangent_space.push((
                    TangentCoordinate {
                        state: Symbol::indexed("x", i),
                        derivative: Symbol::indexed("dx", i),
                    },
                    Origin { comp, local },
                ));
            }
            for local in member.port_ids() {
                if !all_ports && !exposed.contains(&PortRef::new(comp, local)) {
                    continue;
                }
                let i = basis.junction_space.len();
                basis.junction_space.push((
                    PortCoordinate {
                        effort: Symbol::indexed("e", i),
                        flow: Symbol::indexed("f", i),
                    },
                    Origin { comp, local },
                ));
            }
            for local in member.control_symbols() {
                let i = basis.control_space.len();
                basis.control_space.push((
                    ControlCoordinate {
                        control: Symbol::indexed("u", i),
                        derivative: Symbol::indexed("du", i),
                    },
                    Origin { comp, local },
                ));
            }
            if all_ports {
                for local in member.internal_symbols() {
                    let i = basis.auxiliary_space.len();
                    basis
                        .auxiliary_space
                        .push((Symbol::indexed("v", i), Origin { comp, local }));
                }
            }
        }
        basis
    }

    /// `(x_i, origin)` for every state of every member.
    pub fn state_vars(&self) -> Vec<(Symbol, Origin<Symbol>)> {
        self.basis_vectors()
            .tangent_space
            .into_iter()
            .map(|(c, o)| (c.state, o))
            .collect()
    }

    /// `(u_i, origin)` for every control of every member.
    pub fn control_vars(&self) -> Vec<(Symbol, Origin<Symbol>)> {
        self.basis_vectors()
            .control_space
            .into_iter()
            .map(|(c, o)| (c.control, o))
            .collect()
    }

    /// Bond constraints over the internal junction space, columns `2i`
    /// (effort) and `2i + 1` (flow) for internal port `i`.
    pub fn junction_structure(&self) -> GraphResult<SparseMatrix> {
        let index = self.internal_basis_vectors().port_map();
        let bonds: Vec<(PortRef, PortRef)> =
            self.bonds().iter().map(|b| (b.source, b.target)).collect();
        Ok(junction_constraints(&bonds, &index, 0)?)
    }

    /// Local symbol of each global coordinate owned by `comp`, as pairs
    /// `(local, global)`. Used to translate member relations.
    pub(crate) fn local_symbols(
        basis: &BasisVectors,
        comp: CompId,
    ) -> Vec<(Symbol, Symbol)> {
        let mut out = Vec::new();
        for (c, o) in basis.tangent_space.iter().filter(|(_, o)| o.comp == comp) {
            out.push((o.local.clone(), c.state.clone()));
            out.push((o.local.derivative(), c.derivative.clone()));
        }
        for (c, o) in basis.junction_space.iter().filter(|(_, o)| o.comp == comp) {
            out.push((effort(o.local), c.effort.clone()));
            out.push((flow(o.local), c.flow.clone()));
        }
        for (c, o) in basis.control_space.iter().filter(|(_, o)| o.comp == comp) {
            out.push((o.local.clone(), c.control.clone()));
            out.push((o.local.derivative(), c.derivative.clone()));
        }
        for (v, o) in basis.auxiliary_space.iter().filter(|(_, o)| o.comp == comp) {
            out.push((o.local.clone(), v.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{AtomicComponent, ParamValue, RelationTemplate};
    use bg_symbolic::Expr;

    fn storage(type_name: &str, state: &str) -> AtomicComponent {
        AtomicComponent::new(type_name, type_name)
            .with_ports(1)
            .with_state(state)
    }

    fn zero_junction() -> AtomicComponent {
        AtomicComponent::new("0", "0")
            .with_dynamic_ports()
            .with_relations(RelationTemplate::CommonEffort)
    }

    #[test]
    fn spaces_follow_insertion_order() {
        let mut g = BondGraph::new("g");
        let c = g.add(storage("C", "q_0"));
        let se = g.add(
            AtomicComponent::new("Se", "Se")
                .with_ports(1)
                .with_param("e", ParamValue::Control),
        );
        let i = g.add(storage("I", "p_0"));

        let basis = g.basis_vectors();
        assert_eq!(basis.tangent_space.len(), 2);
        assert_eq!(basis.tangent_space[0].0.state, Symbol::new("x_0"));
        assert_eq!(basis.tangent_space[0].1.comp, c);
        assert_eq!(basis.tangent_space[1].0.derivative, Symbol::new("dx_1"));
        assert_eq!(basis.tangent_space[1].1.comp, i);
        assert_eq!(basis.tangent_space[1].1.local, Symbol::new("p_0"));

        assert_eq!(basis.control_space.len(), 1);
        assert_eq!(basis.control_space[0].0.control, Symbol::new("u_0"));
        assert_eq!(basis.control_space[0].1.comp, se);

        let ports: Vec<CompId> = basis.junction_space.iter().map(|(_, o)| o.comp).collect();
        assert_eq!(ports, vec![c, se, i]);
    }

    #[test]
    fn bonded_ports_leave_the_external_basis() {
        let mut g = BondGraph::new("g");
        let j = g.add(zero_junction());
        let c = g.add(storage("C", "q_0"));
        let r = g.add(AtomicComponent::new("R", "R").with_ports(1));
        g.connect(c, j).unwrap();

        let external = g.basis_vectors();
        assert_eq!(external.junction_space.len(), 1);
        assert_eq!(external.junction_space[0].1.comp, r);
        assert_eq!(external.junction_space[0].0.effort, Symbol::new("e_0"));

        let internal = g.internal_basis_vectors();
        assert_eq!(internal.junction_space.len(), 3);
        assert_eq!(internal.port_index(PortRef::new(j, PortId::from_index(0))), Some(0));
        assert_eq!(internal.port_index(PortRef::new(r, PortId::from_index(0))), Some(2));
    }

    #[test]
    fn assignment_is_injective() {
        let mut g = BondGraph::new("g");
        for _ in 0..3 {
            g.add(storage("C", "q_0"));
        }
        let basis = g.internal_basis_vectors();
        let mut origins: Vec<_> = basis.tangent_space.iter().map(|(_, o)| o.clone()).collect();
        origins.dedup();
        assert_eq!(origins.len(), 3);
        let mut symbols: Vec<_> = basis
            .junction_space
            .iter()
            .flat_map(|(c, _)| [c.effort.clone(), c.flow.clone()])
            .collect();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), 6);
    }

    #[test]
    fn composite_leftovers_enter_the_internal_basis() {
        let mut inner = BondGraph::new("rc");
        let c = inner.add(storage("C", "q_0"));
        let r = inner.add(AtomicComponent::new("R", "R").with_ports(1));
        inner.connect(c, r).unwrap();
        assert_eq!(
            inner.internal_symbols(),
            ["e_int_0", "f_int_0", "e_int_1", "f_int_1"].map(Symbol::new)
        );
        assert!(storage("C", "q_0").internal_symbols().is_empty());

        let mut outer = BondGraph::new("outer");
        let tank = outer.add(inner);
        let internal = outer.internal_basis_vectors();
        assert_eq!(internal.auxiliary_space.len(), 4);
        assert_eq!(
            internal.auxiliary_space[3],
            (
                Symbol::new("v_3"),
                Origin {
                    comp: tank,
                    local: Symbol::new("f_int_1")
                }
            )
        );
        assert!(outer.basis_vectors().auxiliary_space.is_empty());

        let pairs = BondGraph::local_symbols(&internal, tank);
        assert!(pairs.contains(&(Symbol::new("f_int_1"), Symbol::new("v_3"))));
    }

    #[test]
    fn junction_structure_rows_per_bond() {
        let mut g = BondGraph::new("g");
        let c = g.add(storage("C", "q_0"));
        let r = g.add(AtomicComponent::new("R", "R").with_ports(1));
        g.connect(r, c).unwrap();

        let m = g.junction_structure().unwrap();
        // r owns internal port 1, c owns internal port 0
        assert_eq!(m[&(0, 2)], Expr::integer(-1));
        assert_eq!(m[&(0, 0)], Expr::one());
        assert_eq!(m[&(1, 3)], Expr::one());
        assert_eq!(m[&(1, 1)], Expr::one());
        assert_eq!(m.len(), 4);
    }

    #[test]
    fn local_symbols_cover_every_coordinate() {
        let mut g = BondGraph::new("g");
        let c = g.add(storage("C", "q_0"));
        let basis = g.internal_basis_vectors();
        let pairs = BondGraph::local_symbols(&basis, c);
        let names: Vec<(&str, &str)> =
            pairs.iter().map(|(l, g)| (l.name(), g.name())).collect();
        assert_eq!(
            names,
            vec![("q_0", "x_0"), ("dq_0", "dx_0"), ("e_0", "e_0"), ("f_0", "f_0")]
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::component::AtomicComponent;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn member(kind: u8) -> AtomicComponent {
        match kind {
            0 => AtomicComponent::new("C", "C").with_ports(1).with_state("q_0"),
            1 => AtomicComponent::new("TF", "TF").with_ports(2),
            _ => AtomicComponent::new("Se", "Se")
                .with_ports(1)
                .with_param("e", crate::component::ParamValue::Control),
        }
    }

    proptest! {
        #[test]
        fn internal_basis_is_injective(kinds in prop::collection::vec(0u8..3, 0..8)) {
            let mut g = BondGraph::new("g");
            for kind in &kinds {
                g.add(member(*kind));
            }
            let basis = g.internal_basis_vectors();

            let mut symbols = HashSet::new();
            for (c, _) in &basis.tangent_space {
                prop_assert!(symbols.insert(c.state.clone()));
                prop_assert!(symbols.insert(c.derivative.clone()));
            }
            for (c, _) in &basis.junction_space {
                prop_assert!(symbols.insert(c.effort.clone()));
                prop_assert!(symbols.insert(c.flow.clone()));
            }
            for (c, _) in &basis.control_space {
                prop_assert!(symbols.insert(c.control.clone()));
                prop_assert!(symbols.insert(c.derivative.clone()));
            }

            let origins: HashSet<PortRef> = basis
                .junction_space
                .iter()
                .map(|(_, o)| PortRef::new(o.comp, o.local))
                .collect();
            prop_assert_eq!(origins.len(), basis.junction_space.len());
            let expected_ports: usize = kinds.iter().map(|k| if *k == 1 { 2 } else { 1 }).sum();
            prop_assert_eq!(basis.junction_space.len(), expected_ports);
        }
    }
}
