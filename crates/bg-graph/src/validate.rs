//! Graph validation logic.

use std::collections::HashSet;

use crate::component::Model;
use crate::error::{GraphError, GraphResult};
use crate::graph::BondGraph;

/// Validate the bond list: every endpoint names a live member and one of its
/// ports, and no port is consumed by two bonds.
pub(crate) fn validate_bonds(graph: &BondGraph) -> GraphResult<()> {
    let mut seen = HashSet::new();
    for bond in graph.bonds() {
        for port in bond.endpoints() {
            let Some(comp) = graph.component(port.comp) else {
                return Err(GraphError::ModelParsing {
                    what: format!("bond endpoint {port} names a removed component"),
                });
            };
            if !comp.port_ids().contains(&port.port) {
                return Err(GraphError::ModelParsing {
                    what: format!("bond endpoint {port} names a missing port"),
                });
            }
            if !seen.insert(port) {
                return Err(GraphError::ModelParsing {
                    what: format!("port {port} appears in more than one bond"),
                });
            }
        }
    }
    Ok(())
}
