use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use smeltcalc_schemas::file_formats::CalculationRequest;
use std::{fs, path::PathBuf};

mod config;
mod overrides;
mod workflow;

#[derive(Parser)]
#[command(name = "smeltcalc")]
#[command(version)]
#[command(about = "Works out the base metals needed to smelt an alloy", long_about = None)]
struct Cli {
    /// Directory of catalog YAML files (defaults to the built-in TFC set)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate base material requirements
    Calc {
        /// Material id to produce
        #[arg(required_unless_present = "request")]
        target: Option<String>,

        /// How much to produce
        #[arg(required_unless_present = "request", allow_negative_numbers = true)]
        amount: Option<f64>,

        /// mB or Ingots
        #[arg(short, long)]
        unit: Option<String>,

        /// Percentage override, e.g. --set brass:copper=92
        #[arg(long = "set", value_name = "ALLOY:INGREDIENT=PCT")]
        set: Vec<String>,

        /// Read the calculation from a YAML request file
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Levels of the ingredient tree to print
        #[arg(long)]
        tree_depth: Option<usize>,

        /// Write summary.csv and request.yaml into a run directory here
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the result as JSON instead of a tree and table
        #[arg(long)]
        json: bool,
    },

    /// List materials that can be calculated
    List,

    /// Show how a material is made
    Recipe {
        /// Material id
        id: String,
    },

    /// Check the catalog for inconsistent records
    Audit,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = config::Settings {
        catalog_dir: cli.catalog,
    };
    let catalog = settings.load_catalog()?;

    match cli.command {
        Commands::Calc {
            target,
            amount,
            unit,
            set,
            request,
            tree_depth,
            output_dir,
            json,
        } => {
            let request = build_request(target, amount, unit, &set, request)?;
            let mut options = workflow::CalcOptions {
                output_dir,
                json,
                ..Default::default()
            };
            if let Some(depth) = tree_depth {
                options.tree_depth = depth;
            }
            workflow::run_calc(&catalog, &request, &options)
        }
        Commands::List => {
            workflow::run_list(&catalog);
            Ok(())
        }
        Commands::Recipe { id } => workflow::run_recipe(&catalog, &id),
        Commands::Audit => workflow::run_audit(&catalog),
    }
}

/// Command-line values take precedence over the request file.
fn build_request(
    target: Option<String>,
    amount: Option<f64>,
    unit: Option<String>,
    set: &[String],
    request_path: Option<PathBuf>,
) -> Result<CalculationRequest> {
    let mut request = match request_path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read request file {:?}", path))?;
            serde_yaml::from_str::<CalculationRequest>(&content)
                .with_context(|| format!("Failed to parse request file {:?}", path))?
        }
        None => {
            let (Some(target), Some(amount)) = (target.clone(), amount) else {
                bail!("calc needs a target and an amount, or --request");
            };
            CalculationRequest {
                target,
                amount,
                unit: "Ingots".to_string(),
                overrides: Default::default(),
            }
        }
    };

    if let Some(target) = target {
        request.target = target;
    }
    if let Some(amount) = amount {
        request.amount = amount;
    }
    if let Some(unit) = unit {
        request.unit = unit;
    }
    overrides::merge_overrides(&mut request.overrides, overrides::parse_overrides(set)?);
    Ok(request)
}
