//! upbound CLI - Bound-driven join ordering
//!
//! Usage:
//!   upbound optimize <query.toml> [--config <path>] [--output text|json|hints]
//!   upbound evaluate <query.toml> --order a,b,c [--output text|json|hints]
//!   upbound validate <query.toml>
//!
//! Examples:
//!   upbound optimize demos/star.toml
//!   upbound optimize demos/star.toml --output hints
//!   upbound evaluate demos/star.toml --order customer,orders,lineitem

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use upbound::config::Settings;
use upbound::input::QueryFile;
use upbound::planner::{BoundOptimizer, JoinGraphBuilder, Plan};

#[derive(Parser)]
#[command(name = "upbound")]
#[command(about = "upbound - Join ordering driven by guaranteed cardinality upper bounds")]
#[command(version)]
struct Cli {
    /// Path to a settings file (defaults to UPBOUND_CONFIG, ./upbound.toml, user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of settings
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose a join order for a query
    Optimize {
        /// Path to the query file (.toml or .json)
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Compute bounds for a given left-deep join order
    Evaluate {
        /// Path to the query file (.toml or .json)
        file: PathBuf,

        /// Comma-separated relation names
        #[arg(long, value_delimiter = ',', required = true)]
        order: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Check a query file against its statistics without optimizing
    Validate {
        /// Path to the query file (.toml or .json)
        file: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable plan
    Text,
    /// Plan as JSON
    Json,
    /// pg_hint_plan comment
    Hints,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        settings.logging.level().unwrap_or(tracing::Level::WARN)
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Optimize { file, output } => cmd_optimize(&settings, file, output),
        Commands::Evaluate {
            file,
            order,
            output,
        } => cmd_evaluate(&settings, file, order, output),
        Commands::Validate { file } => cmd_validate(file),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, upbound::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn read_query(file: &Path) -> Option<QueryFile> {
    match QueryFile::from_file(file) {
        Ok(q) => Some(q),
        Err(e) => {
            eprintln!("Error reading query file '{}': {}", file.display(), e);
            None
        }
    }
}

fn cmd_optimize(settings: &Settings, file: PathBuf, output: OutputFormat) -> ExitCode {
    let Some(input) = read_query(&file) else {
        return ExitCode::FAILURE;
    };

    let provider = match settings.build_provider() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let optimizer =
        BoundOptimizer::new(provider.as_ref()).with_options(settings.optimizer_options());
    tracing::debug!(provider = optimizer.provider_name(), file = %file.display(), "optimizing");

    match optimizer.optimize_query(&input.query, &input.statistics) {
        Ok(plan) => print_plan(&plan, output),
        Err(e) => {
            eprintln!("Optimization error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_evaluate(
    settings: &Settings,
    file: PathBuf,
    order: Vec<String>,
    output: OutputFormat,
) -> ExitCode {
    let Some(input) = read_query(&file) else {
        return ExitCode::FAILURE;
    };

    let provider = match settings.build_provider() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let optimizer =
        BoundOptimizer::new(provider.as_ref()).with_options(settings.optimizer_options());

    let result = JoinGraphBuilder::new(&input.statistics)
        .build(&input.query)
        .and_then(|graph| optimizer.evaluate_order(&graph, &order));

    match result {
        Ok(plan) => print_plan(&plan, output),
        Err(e) => {
            eprintln!("Evaluation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(file: PathBuf) -> ExitCode {
    let Some(input) = read_query(&file) else {
        return ExitCode::FAILURE;
    };

    match JoinGraphBuilder::new(&input.statistics).build(&input.query) {
        Ok(graph) => {
            println!(
                "OK: {} is valid ({} relations, {} join edges, {} connected subgraph(s))",
                file.display(),
                graph.relation_count(),
                graph.edge_count(),
                graph.connected_subgraphs().len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Validation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_plan(plan: &Plan, output: OutputFormat) -> ExitCode {
    match output {
        OutputFormat::Text => print!("{}", plan),
        OutputFormat::Json => match plan.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize plan: {}", e);
                return ExitCode::FAILURE;
            }
        },
        OutputFormat::Hints => println!("{}", plan.to_hints()),
    }
    ExitCode::SUCCESS
}
