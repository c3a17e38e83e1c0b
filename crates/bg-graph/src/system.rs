//! Assembly of the composite constraint system and its reduction.

use std::collections::{BTreeSet, HashMap};

use bg_algebra::{
    AlgebraError, Column, ColumnKind, LinearRow, LinearSystem, Relation, StructuralAnalysis,
    extract_coefficients, reduce,
};
use bg_core::PortId;
use bg_symbolic::{Expr, Symbol};
use tracing::debug;

use crate::basis::BasisVectors;
use crate::component::Model;
use crate::error::{GraphError, GraphResult};
use crate::graph::{BondGraph, PortRef};
use crate::validate::validate_bonds;

/// Internal junction indices, bonded ports first. Each keeps its relative
/// order from the internal basis.
fn junction_order(graph: &BondGraph, basis: &BasisVectors) -> Vec<(usize, bool)> {
    let (bonded, exposed): (Vec<usize>, Vec<usize>) = (0..basis.junction_space.len())
        .partition(|&i| {
            let (_, origin) = &basis.junction_space[i];
            graph.is_bonded(PortRef::new(origin.comp, origin.local))
        });
    bonded
        .into_iter()
        .map(|i| (i, true))
        .chain(exposed.into_iter().map(|i| (i, false)))
        .collect()
}

impl BondGraph {
    /// The stacked system: bond constraints, then every member relation split
    /// into a linear row and a residual.
    ///
    /// Columns are `dx_*`, junction pairs (bonded ports first), the members'
    /// internal variables `v_*`, `x_*`, `u_*`, `du_*` and the constant `1`.
    pub fn linear_system(&self) -> GraphResult<LinearSystem> {
        validate_bonds(self)?;
        let basis = self.internal_basis_vectors();
        let order = junction_order(self, &basis);

        let mut columns = Vec::new();
        for (i, (c, _)) in basis.tangent_space.iter().enumerate() {
            columns.push(Column::new(c.derivative.clone(), ColumnKind::Derivative(i)));
        }
        let junction_offset = columns.len();
        for &(i, bonded) in &order {
            let (c, _) = &basis.junction_space[i];
            for (symbol, is_flow) in [(&c.effort, false), (&c.flow, true)] {
                columns.push(Column::new(
                    symbol.clone(),
                    ColumnKind::Junction {
                        index: i,
                        flow: is_flow,
                        eliminate: bonded,
                    },
                ));
            }
        }
        for (i, (v, _)) in basis.auxiliary_space.iter().enumerate() {
            columns.push(Column::new(v.clone(), ColumnKind::Auxiliary(i)));
        }
        for (i, (c, _)) in basis.tangent_space.iter().enumerate() {
            columns.push(Column::new(c.state.clone(), ColumnKind::State(i)));
        }
        for (i, (c, _)) in basis.control_space.iter().enumerate() {
            columns.push(Column::new(c.control.clone(), ColumnKind::Control(i)));
        }
        for (i, (c, _)) in basis.control_space.iter().enumerate() {
            columns.push(Column::new(c.derivative.clone(), ColumnKind::ControlDerivative(i)));
        }
        columns.push(Column::constant());

        let mut system = LinearSystem::new(columns);

        let position: HashMap<PortRef, usize> = order
            .iter()
            .enumerate()
            .map(|(k, &(i, _))| {
                let (_, o) = &basis.junction_space[i];
                (PortRef::new(o.comp, o.local), k)
            })
            .collect();
        let bonds: Vec<(PortRef, PortRef)> =
            self.bonds().iter().map(|b| (b.source, b.target)).collect();
        let constraints = bg_algebra::junction_constraints(&bonds, &position, junction_offset)?;
        let mut rows = vec![LinearRow::new(); 2 * bonds.len()];
        for ((row, col), value) in constraints {
            rows[row].insert(col, value);
        }
        for row in rows {
            system.push(Relation::new(row, Expr::zero()));
        }

        let coordinates: Vec<Expr> = system.columns.iter().map(|c| c.symbol.clone()).collect();
        let column_of: HashMap<Symbol, usize> = system
            .columns
            .iter()
            .enumerate()
            .filter_map(|(j, c)| c.symbol.as_symbol().map(|s| (s.clone(), j)))
            .collect();

        for (comp, member) in self.components() {
            let key = self.key(comp).unwrap_or("?");
            let mut local_map = HashMap::new();
            for (local, global) in BondGraph::local_symbols(&basis, comp) {
                if let Some(&j) = column_of.get(&global) {
                    local_map.insert(local, j);
                }
            }
            let parameters = member.parameters();
            let relations = member.constitutive_relations().map_err(|err| {
                GraphError::ModelParsing {
                    what: format!("{key}: {err}"),
                }
            })?;
            for relation in relations {
                let (linear, nonlinear) =
                    extract_coefficients(&relation, &local_map, &coordinates, &parameters)
                        .map_err(|err| match err {
                            AlgebraError::UnmappedSymbol { symbol } => GraphError::ModelParsing {
                                what: format!(
                                    "{key}: symbol {symbol} in `{relation}` is not a coordinate or parameter"
                                ),
                            },
                            other => other.into(),
                        })?;
                system.push(Relation::new(linear, nonlinear));
            }
        }

        debug!(
            graph = %self.name,
            rows = system.rows.len(),
            cols = system.columns.len(),
            "linear system assembled"
        );
        Ok(system)
    }

    /// Rank of the derivative/junction/state block and the split of those
    /// columns into dependent and free ones.
    pub fn structural_analysis(&self) -> GraphResult<StructuralAnalysis> {
        Ok(self.linear_system()?.structural_analysis()?)
    }

    fn reduced_relations(&self) -> GraphResult<Vec<Expr>> {
        let system = self.linear_system()?;
        let reduction = reduce(&system, self.config())?;

        // internal junction symbols -> external names
        let internal = self.internal_basis_vectors();
        let external = self.basis_vectors();
        let mut rename = HashMap::new();
        for (i, (c, o)) in internal.junction_space.iter().enumerate() {
            let port = PortRef::new(o.comp, o.local);
            let (effort, flow) = match external.port_index(port) {
                Some(k) => (Symbol::indexed("e", k), Symbol::indexed("f", k)),
                None => (Symbol::indexed("e_int", i), Symbol::indexed("f_int", i)),
            };
            rename.insert(c.effort.clone(), Expr::symbol(effort));
            rename.insert(c.flow.clone(), Expr::symbol(flow));
        }

        let mut out = Vec::with_capacity(reduction.relations.len());
        for equation in reduction.equations(&system.columns) {
            out.push(equation.subs(&rename)?);
        }
        debug!(graph = %self.name, equations = out.len(), "constitutive relations derived");
        Ok(out)
    }
}

impl Model for BondGraph {
    fn type_name(&self) -> &str {
        "Composite"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn port_ids(&self) -> Vec<PortId> {
        (0..self.ports().len()).map(PortId::from_slot).collect()
    }

    fn state_symbols(&self) -> Vec<Symbol> {
        self.state_vars().into_iter().map(|(s, _)| s).collect()
    }

    fn control_symbols(&self) -> Vec<Symbol> {
        self.control_vars().into_iter().map(|(s, _)| s).collect()
    }

    fn parameters(&self) -> BTreeSet<Symbol> {
        self.components().flat_map(|(_, c)| c.parameters()).collect()
    }

    /// `e_int_i`/`f_int_i` for every bonded internal port `i`, then the
    /// members' own leftovers `v_*`. Listed whether or not they survive
    /// reduction; unused ones become empty columns in the parent.
    fn internal_symbols(&self) -> Vec<Symbol> {
        let internal = self.internal_basis_vectors();
        let mut out = Vec::new();
        for (i, (_, o)) in internal.junction_space.iter().enumerate() {
            if self.is_bonded(PortRef::new(o.comp, o.local)) {
                out.push(Symbol::indexed("e_int", i));
                out.push(Symbol::indexed("f_int", i));
            }
        }
        out.extend(internal.auxiliary_space.into_iter().map(|(v, _)| v));
        out
    }

    /// Minimal relations of the graph over its external coordinates.
    /// Bonded port variables that survive reduction appear as
    /// `e_int_i`/`f_int_i`, and surviving member leftovers keep their `v_*`
    /// names. See [`Model::internal_symbols`].
    fn constitutive_relations(&self) -> GraphResult<Vec<Expr>> {
        self.reduced_relations()
    }
}
