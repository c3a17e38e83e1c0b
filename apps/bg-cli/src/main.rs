use bg_algebra::ReduceConfig;
use bg_core::{BgError, BgResult, PortId};
use bg_graph::{BondGraph, Endpoint, Model, ParamValue, RelationTemplate};
use bg_library::{BuildArgs, PortSpec, REGISTRY, new, parse_value};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "bg-cli")]
#[command(about = "Bond graph CLI - derive the equations of a bond graph model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the component library
    List,
    /// Show a component's ports, parameters and relations
    Describe {
        /// Component type id (e.g. C, R, 0)
        id: String,
        /// Positional parameter values; `control` leaves one free
        #[arg(long = "value")]
        values: Vec<String>,
    },
    /// Build a model and print its basis and reduced relations
    Reduce {
        /// Component to add, as TYPE or TYPE=V1,V2. Keys are TYPE_0, TYPE_1, ...
        #[arg(long = "add", required = true)]
        add: Vec<String>,
        /// Bond between two components, as KEY[.PORT]:KEY[.PORT]
        #[arg(long = "bond")]
        bonds: Vec<String>,
        /// Keep algebraic state constraints as they are
        #[arg(long)]
        no_differentiate: bool,
        /// Leave eliminated junction variables inside nonlinear terms
        #[arg(long)]
        no_substitute: bool,
    },
}

fn main() -> BgResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cmd_list(),
        Commands::Describe { id, values } => cmd_describe(&id, &values),
        Commands::Reduce {
            add,
            bonds,
            no_differentiate,
            no_substitute,
        } => cmd_reduce(
            &add,
            &bonds,
            ReduceConfig {
                differentiate_constraints: !no_differentiate,
                substitute_eliminated: !no_substitute,
            },
        ),
    }
}

fn cmd_list() -> BgResult<()> {
    println!("Components:");
    for spec in REGISTRY {
        let ports = match spec.ports {
            PortSpec::Fixed(n) => format!("{n} port{}", if n == 1 { "" } else { "s" }),
            PortSpec::Dynamic => "dynamic ports".to_string(),
        };
        println!("  {:<3} {} ({})", spec.id, spec.description, ports);
    }
    Ok(())
}

fn build_args(values: &[String]) -> BgResult<BuildArgs> {
    let mut args = BuildArgs::default();
    for value in values {
        args = args.with_value(parse_value(value)?);
    }
    Ok(args)
}

fn describe_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Number(q) => q.to_string(),
        ParamValue::Expr(e) => e.to_string(),
        ParamValue::Control => "control".to_string(),
    }
}

fn cmd_describe(id: &str, values: &[String]) -> BgResult<()> {
    let component = new(id, build_args(values)?)?;
    println!("Component: {}", component.type_name());

    let ports: Vec<String> = component.port_ids().iter().map(|p| p.to_string()).collect();
    if component.has_dynamic_ports() {
        println!("  Ports: dynamic");
    } else {
        println!("  Ports: {}", ports.join(", "));
    }
    for state in component.state_symbols() {
        println!("  State: {state}");
    }
    for param in component.params() {
        println!("  Param: {} = {}", param.name, describe_value(&param.value));
    }
    match component.template() {
        RelationTemplate::CommonEffort => println!("  Relations: common effort, flows sum to zero"),
        RelationTemplate::CommonFlow => println!("  Relations: common flow, efforts sum to zero"),
        RelationTemplate::Explicit(_) => {
            println!("  Relations:");
            for relation in component.constitutive_relations()? {
                println!("    {relation} = 0");
            }
        }
    }
    Ok(())
}

fn parse_endpoint(graph: &BondGraph, text: &str) -> BgResult<Endpoint> {
    let (key, port) = match text.rsplit_once('.') {
        Some((key, port)) => {
            let port: u32 = port
                .parse()
                .map_err(|_| BgError::invalid_port(format!("bad port in `{text}`")))?;
            (key, Some(PortId::from_index(port)))
        }
        None => (text, None),
    };
    let comp = graph
        .find(key)
        .ok_or_else(|| BgError::invalid_component(format!("no component with key `{key}`")))?;
    Ok(Endpoint { comp, port })
}

fn cmd_reduce(add: &[String], bonds: &[String], config: ReduceConfig) -> BgResult<()> {
    let mut graph = BondGraph::new("cli").with_config(config);
    for item in add {
        let (id, values): (&str, Vec<String>) = match item.split_once('=') {
            Some((id, values)) => (id, values.split(',').map(str::to_string).collect()),
            None => (item.as_str(), Vec::new()),
        };
        let component = new(id, build_args(&values)?)?;
        let comp = graph.add(component);
        println!("Added {}", graph.key(comp).unwrap_or(id));
    }
    for bond in bonds {
        let (a, b) = bond
            .split_once(':')
            .ok_or_else(|| BgError::model_parsing(format!("bond `{bond}` is not A:B")))?;
        let a = parse_endpoint(&graph, a)?;
        let b = parse_endpoint(&graph, b)?;
        let bond = graph.connect(a, b)?;
        println!("Bonded {} - {}", bond.source, bond.target);
    }

    let basis = graph.basis_vectors();
    let key = |comp| graph.key(comp).unwrap_or("?");
    println!();
    println!("States:");
    for (coord, origin) in &basis.tangent_space {
        println!("  {:<6} {}.{}", coord.state.name(), key(origin.comp), origin.local);
    }
    println!("Controls:");
    for (coord, origin) in &basis.control_space {
        println!("  {:<6} {}.{}", coord.control.name(), key(origin.comp), origin.local);
    }
    println!("Ports:");
    for (coord, origin) in &basis.junction_space {
        println!(
            "  {}/{}  {}.{}",
            coord.effort.name(),
            coord.flow.name(),
            key(origin.comp),
            origin.local
        );
    }

    let relations = graph.constitutive_relations()?;
    info!(
        components = graph.len(),
        bonds = graph.bonds().len(),
        relations = relations.len(),
        "model reduced"
    );
    println!("Relations ({}):", relations.len());
    for relation in relations {
        println!("  {relation} = 0");
    }
    Ok(())
}
