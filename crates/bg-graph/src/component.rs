//! Components: atomic primitives and the shared model interface.

use std::collections::{BTreeSet, HashMap};

use bg_core::PortId;
use bg_symbolic::{BigRational, Expr, Symbol};

use crate::error::GraphResult;
use crate::graph::BondGraph;

/// Effort symbol of local port `port`: `e_<port>`.
pub fn effort(port: PortId) -> Symbol {
    Symbol::indexed("e", port.slot())
}

/// Flow symbol of local port `port`: `f_<port>`.
pub fn flow(port: PortId) -> Symbol {
    Symbol::indexed("f", port.slot())
}

/// Value bound to a component parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Number(BigRational),
    /// A symbolic value; may depend on time `t`.
    Expr(Expr),
    /// Left free as an input. The parameter name becomes a control variable.
    Control,
}

impl ParamValue {
    pub fn is_control(&self) -> bool {
        matches!(self, ParamValue::Control)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub value: ParamValue,
}

/// How an atomic component states its constitutive relations.
#[derive(Clone, Debug, PartialEq)]
pub enum RelationTemplate {
    /// Fixed relations over local symbols and parameter names.
    Explicit(Vec<Expr>),
    /// 0-junction: all efforts equal, flows sum to zero.
    CommonEffort,
    /// 1-junction: all flows equal, efforts sum to zero.
    CommonFlow,
}

/// Interface shared by atomic components and composite graphs.
///
/// Local symbols follow one scheme for every model: port `p` has `e_p`/`f_p`,
/// a state `s` has derivative `ds`, a control `u` has derivative `du`.
pub trait Model {
    fn type_name(&self) -> &str;

    fn name(&self) -> &str;

    /// Ports visible to a containing graph, ascending.
    fn port_ids(&self) -> Vec<PortId>;

    fn state_symbols(&self) -> Vec<Symbol>;

    fn control_symbols(&self) -> Vec<Symbol>;

    /// Symbols other than local coordinates that relations may contain.
    fn parameters(&self) -> BTreeSet<Symbol>;

    /// Internal variables the relations may still contain, such as bonded
    /// port variables a composite could not eliminate. A containing graph
    /// eliminates them like its own bonded ports.
    fn internal_symbols(&self) -> Vec<Symbol> {
        Vec::new()
    }

    /// Relations `expr = 0` over the local symbols.
    fn constitutive_relations(&self) -> GraphResult<Vec<Expr>>;
}

/// A primitive component built from a library template.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicComponent {
    type_name: String,
    name: String,
    ports: BTreeSet<PortId>,
    dynamic_ports: bool,
    states: Vec<Symbol>,
    params: Vec<Param>,
    relations: RelationTemplate,
}

impl AtomicComponent {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            ports: BTreeSet::new(),
            dynamic_ports: false,
            states: Vec::new(),
            params: Vec::new(),
            relations: RelationTemplate::Explicit(Vec::new()),
        }
    }

    /// Fixed ports `0..count`.
    pub fn with_ports(mut self, count: u32) -> Self {
        self.ports = (0..count).map(PortId::from_index).collect();
        self
    }

    /// Ports are created on demand by `connect` and released on disconnect.
    pub fn with_dynamic_ports(mut self) -> Self {
        self.dynamic_ports = true;
        self
    }

    pub fn with_state(mut self, state: impl Into<Symbol>) -> Self {
        self.states.push(state.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<Symbol>, value: ParamValue) -> Self {
        self.params.push(Param {
            name: name.into(),
            value,
        });
        self
    }

    pub fn with_relations(mut self, template: RelationTemplate) -> Self {
        self.relations = template;
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|p| p.name.name() == name)
            .map(|p| &p.value)
    }

    pub fn template(&self) -> &RelationTemplate {
        &self.relations
    }

    pub fn has_dynamic_ports(&self) -> bool {
        self.dynamic_ports
    }

    pub fn has_port(&self, port: PortId) -> bool {
        self.ports.contains(&port)
    }

    /// Allocate the smallest unused port id. `None` for fixed-port components.
    pub fn make_port(&mut self) -> Option<PortId> {
        if !self.dynamic_ports {
            return None;
        }
        let port = (0..)
            .map(PortId::from_index)
            .find(|p| !self.ports.contains(p))?;
        self.ports.insert(port);
        Some(port)
    }

    /// Drop a dynamic port. Fixed ports are never released.
    pub fn release_port(&mut self, port: PortId) -> bool {
        self.dynamic_ports && self.ports.remove(&port)
    }

    fn junction_relations(&self, shared_effort: bool) -> Vec<Expr> {
        let (shared, summed): (fn(PortId) -> Symbol, fn(PortId) -> Symbol) = if shared_effort {
            (effort, flow)
        } else {
            (flow, effort)
        };
        let mut ports = self.ports.iter().copied();
        let Some(first) = ports.next() else {
            return Vec::new();
        };
        let reference = Expr::symbol(shared(first));
        let mut relations: Vec<Expr> = ports
            .map(|p| Expr::symbol(shared(p)) - &reference)
            .collect();
        let total: Expr = self.ports.iter().map(|&p| Expr::symbol(summed(p))).sum();
        relations.push(total);
        relations
    }
}

impl Model for AtomicComponent {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn port_ids(&self) -> Vec<PortId> {
        self.ports.iter().copied().collect()
    }

    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn control_symbols(&self) -> Vec<Symbol> {
        self.params
            .iter()
            .filter(|p| p.value.is_control())
            .map(|p| p.name.clone())
            .collect()
    }

    fn parameters(&self) -> BTreeSet<Symbol> {
        self.params
            .iter()
            .filter_map(|p| match &p.value {
                ParamValue::Expr(e) => Some(e.free_symbols()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn constitutive_relations(&self) -> GraphResult<Vec<Expr>> {
        let templates = match &self.relations {
            RelationTemplate::Explicit(relations) => relations.clone(),
            RelationTemplate::CommonEffort => self.junction_relations(true),
            RelationTemplate::CommonFlow => self.junction_relations(false),
        };
        let values: HashMap<Symbol, Expr> = self
            .params
            .iter()
            .filter_map(|p| match &p.value {
                ParamValue::Number(q) => Some((p.name.clone(), Expr::rational(q.clone()))),
                ParamValue::Expr(e) => Some((p.name.clone(), e.clone())),
                ParamValue::Control => None,
            })
            .collect();

        let mut out = Vec::with_capacity(templates.len());
        for relation in templates {
            let relation = relation.subs(&values)?;
            if !relation.is_zero() {
                out.push(relation);
            }
        }
        Ok(out)
    }
}

/// A node of a bond graph.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    Atomic(AtomicComponent),
    Composite(BondGraph),
}

impl Component {
    pub fn as_atomic(&self) -> Option<&AtomicComponent> {
        match self {
            Component::Atomic(a) => Some(a),
            Component::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&BondGraph> {
        match self {
            Component::Composite(g) => Some(g),
            Component::Atomic(_) => None,
        }
    }

    pub fn has_dynamic_ports(&self) -> bool {
        matches!(self, Component::Atomic(a) if a.has_dynamic_ports())
    }

    pub fn has_port(&self, port: PortId) -> bool {
        self.port_ids().contains(&port)
    }

    pub(crate) fn make_port(&mut self) -> Option<PortId> {
        match self {
            Component::Atomic(a) => a.make_port(),
            Component::Composite(_) => None,
        }
    }

    pub(crate) fn release_port(&mut self, port: PortId) -> bool {
        match self {
            Component::Atomic(a) => a.release_port(port),
            Component::Composite(_) => false,
        }
    }

    fn model(&self) -> &dyn Model {
        match self {
            Component::Atomic(a) => a,
            Component::Composite(g) => g,
        }
    }
}

impl Model for Component {
    fn type_name(&self) -> &str {
        self.model().type_name()
    }

    fn name(&self) -> &str {
        self.model().name()
    }

    fn port_ids(&self) -> Vec<PortId> {
        self.model().port_ids()
    }

    fn state_symbols(&self) -> Vec<Symbol> {
        self.model().state_symbols()
    }

    fn control_symbols(&self) -> Vec<Symbol> {
        self.model().control_symbols()
    }

    fn parameters(&self) -> BTreeSet<Symbol> {
        self.model().parameters()
    }

    fn internal_symbols(&self) -> Vec<Symbol> {
        self.model().internal_symbols()
    }

    fn constitutive_relations(&self) -> GraphResult<Vec<Expr>> {
        self.model().constitutive_relations()
    }
}

impl From<AtomicComponent> for Component {
    fn from(a: AtomicComponent) -> Self {
        Component::Atomic(a)
    }
}

impl From<BondGraph> for Component {
    fn from(g: BondGraph) -> Self {
        Component::Composite(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_symbolic::parse;

    fn capacitor(value: ParamValue) -> AtomicComponent {
        AtomicComponent::new("C", "C")
            .with_ports(1)
            .with_state("q_0")
            .with_param("c", value)
            .with_relations(RelationTemplate::Explicit(vec![
                parse("q_0 - c*e_0").unwrap(),
                parse("dq_0 - f_0").unwrap(),
            ]))
    }

    fn junction(template: RelationTemplate, ports: usize) -> AtomicComponent {
        let mut j = AtomicComponent::new("0", "0")
            .with_dynamic_ports()
            .with_relations(template);
        for _ in 0..ports {
            j.make_port();
        }
        j
    }

    #[test]
    fn numeric_parameter_is_substituted() {
        let milli = parse("0.001").unwrap().as_rational().unwrap();
        let c = capacitor(ParamValue::Number(milli));
        let relations = c.constitutive_relations().unwrap();
        assert_eq!(
            relations,
            vec![
                parse("q_0 - 0.001*e_0").unwrap(),
                parse("dq_0 - f_0").unwrap()
            ]
        );
        assert!(c.parameters().is_empty());
    }

    #[test]
    fn symbolic_parameter_is_declared() {
        let c = capacitor(ParamValue::Expr(Expr::symbol("c")));
        assert_eq!(c.parameters(), BTreeSet::from([Symbol::new("c")]));
        assert_eq!(c.constitutive_relations().unwrap()[0], parse("q_0 - c*e_0").unwrap());
    }

    #[test]
    fn control_parameter_becomes_control_symbol() {
        let se = AtomicComponent::new("Se", "Se")
            .with_ports(1)
            .with_param("e", ParamValue::Control)
            .with_relations(RelationTemplate::Explicit(vec![parse("e_0 - e").unwrap()]));
        assert_eq!(se.control_symbols(), vec![Symbol::new("e")]);
        assert_eq!(se.constitutive_relations().unwrap(), vec![parse("e_0 - e").unwrap()]);
    }

    #[test]
    fn common_effort_relations() {
        let j = junction(RelationTemplate::CommonEffort, 3);
        let relations = j.constitutive_relations().unwrap();
        assert_eq!(
            relations,
            vec![
                parse("e_1 - e_0").unwrap(),
                parse("e_2 - e_0").unwrap(),
                parse("f_0 + f_1 + f_2").unwrap(),
            ]
        );
    }

    #[test]
    fn common_flow_relations() {
        let j = junction(RelationTemplate::CommonFlow, 2);
        let relations = j.constitutive_relations().unwrap();
        assert_eq!(
            relations,
            vec![parse("f_1 - f_0").unwrap(), parse("e_0 + e_1").unwrap()]
        );
    }

    #[test]
    fn dynamic_ports_reuse_smallest_free_id() {
        let mut j = junction(RelationTemplate::CommonEffort, 3);
        assert!(j.release_port(PortId::from_index(1)));
        assert_eq!(j.make_port(), Some(PortId::from_index(1)));
        assert_eq!(j.make_port(), Some(PortId::from_index(3)));
    }

    #[test]
    fn fixed_ports_are_not_made_or_released() {
        let mut c = capacitor(ParamValue::Control);
        assert_eq!(c.make_port(), None);
        assert!(!c.release_port(PortId::from_index(0)));
        assert!(c.has_port(PortId::from_index(0)));
    }
}
