//! credo CLI: compare belief stores and query them.

use std::path::{Path as FsPath, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use serde::de::DeserializeOwned;

use credo::config::{ConsistencyConfig, CredoConfig};
use credo::consistency::{self, ConsistencyEngine};
use credo::document::{self, BeliefsDoc, LiteralDoc};
use credo::plan::{Guard, Selector};
use credo::term::{Literal, Path};
use credo::unify::Substitution;

#[derive(Parser)]
#[command(name = "credo", version, about = "Belief stores, unification and consistency for BDI agents")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct MetricArgs {
    /// discrete, weighted-difference, levenshtein or ncd.
    #[arg(long)]
    metric: Option<String>,

    /// deflate, zlib or gzip (ncd only).
    #[arg(long)]
    compression: Option<String>,

    /// all, positive or paths.
    #[arg(long)]
    filter: Option<String>,

    /// Path for the `paths` filter (repeatable).
    #[arg(long = "path")]
    paths: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Distance between two belief documents.
    Score {
        a: PathBuf,
        b: PathBuf,
        #[command(flatten)]
        metric: MetricArgs,
    },

    /// Pairwise distances and consistency values for several documents.
    Matrix {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        metric: MetricArgs,

        /// Power-iteration steps.
        #[arg(long)]
        iterations: Option<usize>,
    },

    /// Solve queries against a belief document.
    Query {
        beliefs: PathBuf,

        /// A literal as JSON; defaults to the document's own queries.
        #[arg(long)]
        query: Option<String>,
    },

    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = CredoConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Score { a, b, metric } => {
            apply_metric_args(&mut config.consistency, &metric)?;
            let left = document::load_store(&a, &config.beliefs)?;
            let right = document::load_store(&b, &config.beliefs)?;
            let distance = consistency::score(
                &left.snapshot(),
                &right.snapshot(),
                &config.consistency.metric(),
                &config.consistency.filter(),
            )?;
            println!("{distance:.6}");
        }

        Commands::Matrix {
            files,
            metric,
            iterations,
        } => {
            apply_metric_args(&mut config.consistency, &metric)?;
            if let Some(iterations) = iterations {
                config.consistency.iterations = iterations;
            }
            let mut engine = ConsistencyEngine::from_config(&config.consistency);
            for file in &files {
                let store = document::load_store(file, &config.beliefs)?;
                engine.register(store_name(file), store.snapshot());
            }
            let report = engine.compute()?;

            let width = report.names.iter().map(String::len).max().unwrap_or(0);
            print!("{:width$}", "");
            for name in &report.names {
                print!("  {name:>8}");
            }
            println!();
            for (name, row) in report.names.iter().zip(&report.matrix) {
                print!("{name:width$}");
                for d in row {
                    print!("  {d:>8.4}");
                }
                println!();
            }
            println!();
            for (name, value) in &report.values {
                println!("{name:width$}  consistency {value:.6}");
            }
            let s = report.statistics;
            println!(
                "mean {:.6}  min {:.6}  max {:.6}  variance {:.6}",
                s.mean, s.min, s.max, s.variance
            );
        }

        Commands::Query { beliefs, query } => {
            let doc = BeliefsDoc::load(&beliefs)?;
            let store = doc.to_store(&config.beliefs)?;
            let queries = match query {
                Some(json) => vec![LiteralDoc::from_json(&json)?.to_literal()?],
                None => doc.queries()?,
            };
            if queries.is_empty() {
                return Err(miette!("no query given and {} has none", beliefs.display()));
            }

            let selector = Selector::from_config(&config);
            let snapshot = store.snapshot();
            for goal in &queries {
                println!("?- {goal}");
                let mut found = 0;
                for solution in selector.solve(&[Guard::Holds(goal.clone())], &snapshot, &Substitution::new()) {
                    found += 1;
                    println!("   {}", render_solution(goal, &solution?));
                }
                if found == 0 {
                    println!("   no");
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml().map_err(|e| miette!("{e}"))?);
        }
    }

    Ok(())
}

fn apply_metric_args(config: &mut ConsistencyConfig, args: &MetricArgs) -> Result<()> {
    if let Some(metric) = &args.metric {
        config.metric = parse_kind(metric)?;
    }
    if let Some(compression) = &args.compression {
        config.compression = parse_kind(compression)?;
    }
    if let Some(filter) = &args.filter {
        config.filter = parse_kind(filter)?;
    }
    if !args.paths.is_empty() {
        config.paths = args
            .paths
            .iter()
            .map(|p| Path::parse(p))
            .collect::<std::result::Result<_, _>>()?;
    }
    Ok(())
}

/// Parse a kebab-case option the same way the config file does.
fn parse_kind<T: DeserializeOwned>(raw: &str) -> Result<T> {
    toml::Value::String(raw.to_string())
        .try_into()
        .into_diagnostic()
}

fn store_name(file: &FsPath) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

fn render_solution(goal: &Literal, solution: &Substitution) -> String {
    let bindings: Vec<String> = goal
        .variables()
        .iter()
        .filter(|v| !v.is_anonymous())
        .filter_map(|v| solution.value_of(v).map(|t| format!("{} = {t}", v.name())))
        .collect();
    if bindings.is_empty() {
        "yes".to_string()
    } else {
        bindings.join(", ")
    }
}
