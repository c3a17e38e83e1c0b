//! Static registry of primitive bond graph elements.

/// How many ports a primitive has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortSpec {
    Fixed(u32),
    /// Ports are created as bonds are made.
    Dynamic,
}

/// Value a parameter takes when the caller gives none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamDefault {
    /// Stays symbolic, named after the parameter.
    Symbol,
    /// Left free as an input.
    Control,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub default: ParamDefault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationSpec {
    Explicit(&'static [&'static str]),
    CommonEffort,
    CommonFlow,
}

/// Template of a primitive component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub ports: PortSpec,
    pub states: &'static [&'static str],
    pub params: &'static [ParamSpec],
    pub relations: RelationSpec,
}

const fn symbolic(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        description,
        default: ParamDefault::Symbol,
    }
}

const fn control(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        description,
        default: ParamDefault::Control,
    }
}

/// Every primitive, in listing order.
pub static REGISTRY: &[ComponentSpec] = &[
    ComponentSpec {
        id: "R",
        description: "Linear resistor",
        ports: PortSpec::Fixed(1),
        states: &[],
        params: &[symbolic("r", "Resistance")],
        relations: RelationSpec::Explicit(&["e_0 - r*f_0"]),
    },
    ComponentSpec {
        id: "C",
        description: "Linear capacitor",
        ports: PortSpec::Fixed(1),
        states: &["q_0"],
        params: &[symbolic("c", "Capacitance")],
        relations: RelationSpec::Explicit(&["q_0 - c*e_0", "dq_0 - f_0"]),
    },
    ComponentSpec {
        id: "I",
        description: "Linear inductor",
        ports: PortSpec::Fixed(1),
        states: &["p_0"],
        params: &[symbolic("l", "Inductance")],
        relations: RelationSpec::Explicit(&["p_0 - l*f_0", "dp_0 - e_0"]),
    },
    ComponentSpec {
        id: "Se",
        description: "Effort source",
        ports: PortSpec::Fixed(1),
        states: &[],
        params: &[control("e", "Source effort")],
        relations: RelationSpec::Explicit(&["e_0 - e"]),
    },
    ComponentSpec {
        id: "Sf",
        description: "Flow source",
        ports: PortSpec::Fixed(1),
        states: &[],
        params: &[control("f", "Source flow")],
        relations: RelationSpec::Explicit(&["f_0 - f"]),
    },
    ComponentSpec {
        id: "TF",
        description: "Transformer",
        ports: PortSpec::Fixed(2),
        states: &[],
        params: &[symbolic("n", "Modulus")],
        relations: RelationSpec::Explicit(&["e_1 - n*e_0", "f_0 + n*f_1"]),
    },
    ComponentSpec {
        id: "GY",
        description: "Gyrator",
        ports: PortSpec::Fixed(2),
        states: &[],
        params: &[symbolic("r", "Gyration ratio")],
        relations: RelationSpec::Explicit(&["e_1 - r*f_0", "e_0 + r*f_1"]),
    },
    ComponentSpec {
        id: "0",
        description: "Equal effort junction",
        ports: PortSpec::Dynamic,
        states: &[],
        params: &[],
        relations: RelationSpec::CommonEffort,
    },
    ComponentSpec {
        id: "1",
        description: "Equal flow junction",
        ports: PortSpec::Dynamic,
        states: &[],
        params: &[],
        relations: RelationSpec::CommonFlow,
    },
];

pub fn lookup(id: &str) -> Option<&'static ComponentSpec> {
    REGISTRY.iter().find(|spec| spec.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_symbolic::parse;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<_> = REGISTRY.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), REGISTRY.len());
    }

    #[test]
    fn templates_parse() {
        for spec in REGISTRY {
            if let RelationSpec::Explicit(relations) = spec.relations {
                for relation in relations {
                    assert!(parse(relation).is_ok(), "{}: {relation}", spec.id);
                }
            }
        }
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(lookup("TF").map(|s| s.ports), Some(PortSpec::Fixed(2)));
        assert_eq!(lookup("0").map(|s| s.relations), Some(RelationSpec::CommonEffort));
        assert!(lookup("tf").is_none());
    }
}
