//! The composite bond graph: an arena of components and the bonds between them.

use std::collections::HashSet;
use std::fmt;

use bg_algebra::ReduceConfig;
use bg_core::{CompId, PortId};
use tracing::debug;

use crate::component::{Component, Model};
use crate::error::{GraphError, GraphResult};

/// A port of a child component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub comp: CompId,
    pub port: PortId,
}

impl PortRef {
    pub fn new(comp: CompId, port: PortId) -> Self {
        Self { comp, port }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.comp, self.port)
    }
}

/// A power bond between two ports. `source` is the first endpoint passed to
/// `connect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bond {
    pub source: PortRef,
    pub target: PortRef,
}

impl Bond {
    pub fn touches(&self, comp: CompId) -> bool {
        self.source.comp == comp || self.target.comp == comp
    }

    pub fn endpoints(&self) -> [PortRef; 2] {
        [self.source, self.target]
    }
}

/// A connection target: a component and, optionally, one of its ports.
/// Without a port the free port is looked up (or created) automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub comp: CompId,
    pub port: Option<PortId>,
}

impl Endpoint {
    fn matches(&self, port: PortRef) -> bool {
        self.comp == port.comp && self.port.is_none_or(|p| p == port.port)
    }
}

impl From<CompId> for Endpoint {
    fn from(comp: CompId) -> Self {
        Self { comp, port: None }
    }
}

impl From<PortRef> for Endpoint {
    fn from(r: PortRef) -> Self {
        Self {
            comp: r.comp,
            port: Some(r.port),
        }
    }
}

impl From<(CompId, PortId)> for Endpoint {
    fn from((comp, port): (CompId, PortId)) -> Self {
        Self {
            comp,
            port: Some(port),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Slot {
    pub(crate) key: String,
    pub(crate) component: Component,
}

/// Port choice made before any mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PortPlan {
    Existing(PortRef),
    Fresh(CompId),
}

/// A composite bond graph.
///
/// Components live in an arena addressed by [`CompId`]; removed slots stay
/// empty so ids remain stable. Each component also gets a unique key
/// `<type>_<ordinal>`. Every derived artifact (bases, matrices, relations) is
/// recomputed from the current state on request.
#[derive(Clone, Debug, PartialEq)]
pub struct BondGraph {
    pub(crate) name: String,
    pub(crate) slots: Vec<Option<Slot>>,
    pub(crate) bonds: Vec<Bond>,
    config: ReduceConfig,
}

impl BondGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            bonds: Vec::new(),
            config: ReduceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReduceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReduceConfig {
        &self.config
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in insertion order.
    pub fn components(&self) -> impl Iterator<Item = (CompId, &Component)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .map(|s| (CompId::from_slot(i), &s.component))
        })
    }

    pub fn component(&self, id: CompId) -> Option<&Component> {
        self.slot(id).map(|s| &s.component)
    }

    /// Generated key of a member, e.g. `C_0`.
    pub fn key(&self, id: CompId) -> Option<&str> {
        self.slot(id).map(|s| s.key.as_str())
    }

    pub fn find(&self, key: &str) -> Option<CompId> {
        self.slots.iter().enumerate().find_map(|(i, slot)| {
            slot.as_ref()
                .filter(|s| s.key == key)
                .map(|_| CompId::from_slot(i))
        })
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    fn slot(&self, id: CompId) -> Option<&Slot> {
        self.slots.get(id.slot())?.as_ref()
    }

    fn member(&self, id: CompId) -> GraphResult<&Component> {
        self.component(id)
            .ok_or(GraphError::InvalidComponent { comp: id })
    }

    fn member_mut(&mut self, id: CompId) -> GraphResult<&mut Component> {
        self.slots
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .map(|s| &mut s.component)
            .ok_or(GraphError::InvalidComponent { comp: id })
    }

    /// Add a component; returns its id.
    pub fn add(&mut self, component: impl Into<Component>) -> CompId {
        let component = component.into();
        let key = self.next_key(component.type_name());
        let id = CompId::from_slot(self.slots.len());
        debug!(%key, comp = %id, "component added");
        self.slots.push(Some(Slot { key, component }));
        id
    }

    fn next_key(&self, type_name: &str) -> String {
        let prefix = format!("{type_name}_");
        let next = self
            .slots
            .iter()
            .flatten()
            .filter_map(|s| s.key.strip_prefix(&prefix)?.parse::<usize>().ok())
            .max()
            .map_or(0, |n| n + 1);
        format!("{prefix}{next}")
    }

    /// Remove a component and every bond touching it.
    pub fn remove(&mut self, id: CompId) -> GraphResult<Component> {
        self.member(id)?;
        let (touching, kept): (Vec<Bond>, Vec<Bond>) =
            self.bonds.iter().partition(|b| b.touches(id));
        self.bonds = kept;
        for bond in &touching {
            self.release(bond);
        }
        let slot = self.slots[id.slot()]
            .take()
            .ok_or(GraphError::InvalidComponent { comp: id })?;
        debug!(key = %slot.key, bonds = touching.len(), "component removed");
        Ok(slot.component)
    }

    pub fn is_bonded(&self, port: PortRef) -> bool {
        self.bonds
            .iter()
            .any(|b| b.source == port || b.target == port)
    }

    fn bonded_ports(&self) -> HashSet<PortRef> {
        self.bonds.iter().flat_map(Bond::endpoints).collect()
    }

    /// Ports of members not consumed by any bond.
    pub fn ports(&self) -> Vec<PortRef> {
        let bonded = self.bonded_ports();
        self.components()
            .flat_map(|(id, c)| c.port_ids().into_iter().map(move |p| PortRef::new(id, p)))
            .filter(|p| !bonded.contains(p))
            .collect()
    }

    fn plan(&self, endpoint: Endpoint) -> GraphResult<PortPlan> {
        let comp = self.member(endpoint.comp)?;
        let id = endpoint.comp;
        match endpoint.port {
            Some(port) => {
                if !comp.has_port(port) {
                    return Err(GraphError::invalid_port(id, format!("no port {port}")));
                }
                let port_ref = PortRef::new(id, port);
                if !self.is_bonded(port_ref) {
                    Ok(PortPlan::Existing(port_ref))
                } else if comp.has_dynamic_ports() {
                    Ok(PortPlan::Fresh(id))
                } else {
                    Err(GraphError::invalid_port(
                        id,
                        format!("port {port} is already bonded"),
                    ))
                }
            }
            None => {
                let free: Vec<PortId> = comp
                    .port_ids()
                    .into_iter()
                    .filter(|&p| !self.is_bonded(PortRef::new(id, p)))
                    .collect();
                match free.as_slice() {
                    [port] => Ok(PortPlan::Existing(PortRef::new(id, *port))),
                    [] if comp.has_dynamic_ports() => Ok(PortPlan::Fresh(id)),
                    [] => Err(GraphError::invalid_port(id, "no free port")),
                    _ => Err(GraphError::invalid_port(
                        id,
                        format!("{} free ports, choose one explicitly", free.len()),
                    )),
                }
            }
        }
    }

    fn materialize(&mut self, plan: PortPlan) -> GraphResult<PortRef> {
        match plan {
            PortPlan::Existing(port) => Ok(port),
            PortPlan::Fresh(id) => {
                let port = self
                    .member_mut(id)?
                    .make_port()
                    .ok_or_else(|| GraphError::invalid_port(id, "cannot create a port"))?;
                Ok(PortRef::new(id, port))
            }
        }
    }

    /// Bond two endpoints. Either both ports are resolved and the bond is
    /// added, or nothing changes.
    pub fn connect(
        &mut self,
        a: impl Into<Endpoint>,
        b: impl Into<Endpoint>,
    ) -> GraphResult<Bond> {
        let (a, b) = (a.into(), b.into());
        let plan_a = self.plan(a)?;
        let plan_b = self.plan(b)?;
        if let (PortPlan::Existing(pa), PortPlan::Existing(pb)) = (plan_a, plan_b) {
            if pa == pb {
                return Err(GraphError::invalid_port(
                    pa.comp,
                    format!("cannot bond port {} to itself", pa.port),
                ));
            }
        }

        let source = self.materialize(plan_a)?;
        let target = match self.materialize(plan_b) {
            Ok(target) => target,
            Err(err) => {
                if let PortPlan::Fresh(id) = plan_a {
                    if let Ok(c) = self.member_mut(id) {
                        c.release_port(source.port);
                    }
                }
                return Err(err);
            }
        };
        let bond = Bond { source, target };
        self.bonds.push(bond);
        debug!(%source, %target, "bond added");
        Ok(bond)
    }

    /// Remove bonds between `a` and `b` (or every bond of `a` when `b` is
    /// `None`). A missing port restricts nothing. Returns how many bonds went.
    pub fn disconnect(
        &mut self,
        a: impl Into<Endpoint>,
        b: Option<Endpoint>,
    ) -> GraphResult<usize> {
        let a = a.into();
        for endpoint in std::iter::once(&a).chain(b.as_ref()) {
            let comp = self.member(endpoint.comp)?;
            if let Some(port) = endpoint.port {
                if !comp.has_port(port) {
                    return Err(GraphError::invalid_port(
                        endpoint.comp,
                        format!("no port {port}"),
                    ));
                }
            }
        }

        let matches = |bond: &Bond| {
            let forward = a.matches(bond.source) && b.is_none_or(|b| b.matches(bond.target));
            let backward = a.matches(bond.target) && b.is_none_or(|b| b.matches(bond.source));
            forward || backward
        };
        let (removed, kept): (Vec<Bond>, Vec<Bond>) =
            self.bonds.iter().partition(|bond| matches(bond));
        self.bonds = kept;
        for bond in &removed {
            self.release(bond);
            debug!(source = %bond.source, target = %bond.target, "bond removed");
        }
        Ok(removed.len())
    }

    fn release(&mut self, bond: &Bond) {
        for port in bond.endpoints() {
            if let Some(Some(slot)) = self.slots.get_mut(port.comp.slot()) {
                slot.component.release_port(port.port);
            }
        }
    }
}
