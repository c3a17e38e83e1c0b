//! Construction of components from registry templates.

use bg_graph::{AtomicComponent, Component, ParamValue, RelationTemplate};
use bg_symbolic::{Expr, parse};
use tracing::debug;

use crate::error::{LibraryError, LibraryResult};
use crate::registry::{ParamDefault, PortSpec, RelationSpec, lookup};

/// Arguments for [`new`].
///
/// `values` bind the template's parameters positionally, in the order the
/// registry lists them. Missing trailing values fall back to each
/// parameter's default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildArgs {
    /// Display name. Defaults to the type id.
    pub name: Option<String>,
    pub values: Vec<ParamValue>,
}

impl BuildArgs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: ParamValue) -> Self {
        self.values.push(value);
        self
    }
}

/// Parse a parameter value: `control` leaves it free, a constant expression
/// becomes a number, anything else stays symbolic.
pub fn parse_value(text: &str) -> LibraryResult<ParamValue> {
    if text.trim() == "control" {
        return Ok(ParamValue::Control);
    }
    let expr = parse(text)?;
    Ok(match expr.as_rational() {
        Some(q) => ParamValue::Number(q),
        None => ParamValue::Expr(expr),
    })
}

/// Build a primitive from the registry.
pub fn new(id: &str, args: BuildArgs) -> LibraryResult<AtomicComponent> {
    let spec = lookup(id).ok_or_else(|| LibraryError::UnknownComponent { id: id.to_string() })?;
    if args.values.len() > spec.params.len() {
        return Err(LibraryError::TooManyValues {
            id: spec.id,
            expected: spec.params.len(),
            got: args.values.len(),
        });
    }

    let name = args.name.unwrap_or_else(|| spec.id.to_string());
    let mut component = AtomicComponent::new(spec.id, name);
    component = match spec.ports {
        PortSpec::Fixed(n) => component.with_ports(n),
        PortSpec::Dynamic => component.with_dynamic_ports(),
    };
    for &state in spec.states {
        component = component.with_state(state);
    }

    let mut values = args.values.into_iter();
    for param in spec.params {
        let value = values.next().unwrap_or_else(|| match param.default {
            ParamDefault::Symbol => ParamValue::Expr(Expr::symbol(param.name)),
            ParamDefault::Control => ParamValue::Control,
        });
        component = component.with_param(param.name, value);
    }

    let template = match spec.relations {
        RelationSpec::Explicit(relations) => RelationTemplate::Explicit(
            relations
                .iter()
                .map(|r| parse(r))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        RelationSpec::CommonEffort => RelationTemplate::CommonEffort,
        RelationSpec::CommonFlow => RelationTemplate::CommonFlow,
    };
    debug!(id = spec.id, "component built");
    Ok(component.with_relations(template))
}

/// Copy of `component` under a new name. Ports, states, parameter bindings
/// and nested members are kept; bonds belong to the containing graph and are
/// not copied.
pub fn clone_component(component: &Component, name: impl Into<String>) -> Component {
    let mut copy = component.clone();
    match &mut copy {
        Component::Atomic(a) => a.set_name(name),
        Component::Composite(g) => g.set_name(name),
    }
    copy
}
