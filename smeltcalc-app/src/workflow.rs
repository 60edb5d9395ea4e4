use anyhow::{bail, Context, Result};
use serde::Serialize;
use smeltcalc_core::{
    breakdown::MAX_DEPTH,
    calculator::{calculate_request, Requirements},
    catalog::{Catalog, MaterialCatalog},
    percentages::{configurable_materials, default_percentages},
    report::SummaryWriter,
    tree::{build_tree, format_hierarchy, render_lines},
};
use smeltcalc_schemas::{
    file_formats::CalculationRequest,
    material::{MaterialKind, UserOverrideMap},
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CalcOptions {
    pub tree_depth: usize,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for CalcOptions {
    fn default() -> Self {
        Self {
            tree_depth: MAX_DEPTH,
            output_dir: None,
            json: false,
        }
    }
}

/// Machine-readable form of a calculation, printed by `calc --json`.
#[derive(Debug, Serialize)]
pub struct CalculationReport {
    pub target: String,
    pub target_name: String,
    pub amount: f64,
    pub unit: String,
    pub millibuckets: BTreeMap<String, f64>,
    pub ingots: BTreeMap<String, f64>,
    pub overrides: BTreeMap<String, BTreeMap<String, f64>>,
    pub warnings: Vec<String>,
}

impl CalculationReport {
    pub fn new(requirements: &Requirements, catalog: &dyn Catalog) -> Self {
        Self {
            target: requirements.target.clone(),
            target_name: catalog.display_name(&requirements.target),
            amount: requirements.amount,
            unit: requirements.unit.label().to_string(),
            millibuckets: requirements.fine.clone().into_iter().collect(),
            ingots: requirements.coarse.clone().into_iter().collect(),
            overrides: sorted_overrides(&requirements.overrides),
            warnings: requirements
                .diagnostics
                .iter()
                .map(|d| format!("{}: {}", catalog.display_name(&d.material), d.violation))
                .collect(),
        }
    }
}

fn sorted_overrides(overrides: &UserOverrideMap) -> BTreeMap<String, BTreeMap<String, f64>> {
    overrides
        .iter()
        .map(|(alloy, split)| (alloy.clone(), split.clone().into_iter().collect()))
        .collect()
}

/// Runs one calculation and prints its tree and summary (or JSON).
pub fn run_calc(
    catalog: &MaterialCatalog,
    request: &CalculationRequest,
    options: &CalcOptions,
) -> Result<()> {
    info!(target_id = %request.target, amount = request.amount, unit = %request.unit, "calculating");
    let requirements = calculate_request(catalog, request)
        .with_context(|| format!("Calculation for '{}' failed", request.target))?;

    if options.json {
        let report = CalculationReport::new(&requirements, catalog);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let root = build_tree(
            catalog,
            &requirements.target,
            requirements.unit.to_fine(requirements.amount),
            &requirements.overrides,
            options.tree_depth,
        )?;
        println!("\n--- Calculation Tree ---");
        println!("{}", render_lines(&format_hierarchy(std::slice::from_ref(&root))));
        print_summary(&requirements, catalog);
    }

    if let Some(dir) = &options.output_dir {
        let run_dir = write_run_outputs(dir, &requirements, catalog)?;
        println!("\nResults written to '{}'", run_dir.display());
    }
    Ok(())
}

fn print_summary(requirements: &Requirements, catalog: &dyn Catalog) {
    println!("\n--- Base Materials ---");
    println!(
        "Target: {} x {} {}",
        catalog.display_name(&requirements.target),
        requirements.amount,
        requirements.unit.label()
    );
    println!("========================================");
    for row in requirements.summary_rows(catalog) {
        println!(
            "  - {:<16} {:>10.2} mB {:>10.3} Ingots",
            row.name, row.millibuckets, row.ingots
        );
    }
    println!("----------------------------------------");
    println!("  Total: {:.2} mB", requirements.total_millibuckets());

    if !requirements.diagnostics.is_empty() {
        println!("\nDefault percentages were used for:");
        for d in &requirements.diagnostics {
            println!("  - {}: {}", catalog.display_name(&d.material), d.violation);
        }
    }
}

/// Writes `summary.csv` and the normalized request into a timestamped
/// directory under `output_dir`, returning that directory.
pub fn write_run_outputs(
    output_dir: &Path,
    requirements: &Requirements,
    catalog: &dyn Catalog,
) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!(
        "{}_{}",
        requirements.target,
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", run_dir))?;

    let summary_path = run_dir.join("summary.csv");
    let summary_path = summary_path
        .to_str()
        .with_context(|| format!("Output path is not valid UTF-8: {:?}", summary_path))?;
    let mut writer = SummaryWriter::create(summary_path)?;
    writer.write_requirements(requirements, catalog)?;

    // Overrides here are the completed ones, so the file reproduces this run.
    let request = CalculationRequest {
        target: requirements.target.clone(),
        amount: requirements.amount,
        unit: requirements.unit.label().to_string(),
        overrides: requirements.overrides.clone(),
    };
    fs::write(run_dir.join("request.yaml"), serde_yaml::to_string(&request)?)
        .context("Failed to write request.yaml")?;

    Ok(run_dir)
}

pub fn run_list(catalog: &MaterialCatalog) {
    println!("Selectable targets:");
    for record in catalog.selectable_targets() {
        println!("  - {:<24} {}", record.id, record.name);
    }
}

pub fn run_recipe(catalog: &MaterialCatalog, material_id: &str) -> Result<()> {
    let record = catalog.lookup(material_id)?;
    println!("{} ({}) - {}", record.name, record.id, record.kind);

    match &record.kind {
        MaterialKind::Base => println!("  Base material, smelted directly."),
        MaterialKind::SinglePass => match record.pass_through_target() {
            Some(source) => println!("  Worked 1:1 from {}", catalog.display_name(source)),
            None => warn!(material = %record.id, "single-pass material without a source"),
        },
        MaterialKind::Composite => match record.components() {
            Some((primary, extra)) => println!(
                "  Needs the full amount of both {} and {}",
                catalog.display_name(primary),
                catalog.display_name(extra)
            ),
            None => warn!(material = %record.id, "composite material missing a component"),
        },
        MaterialKind::SimpleAlloy => {
            let defaults = default_percentages(catalog, material_id)?;
            for ing in &record.ingredients {
                println!(
                    "  - {:<16} {:>5.1}-{:<5.1}%  default {:.2}%",
                    catalog.display_name(&ing.ingredient_id),
                    ing.min_pct,
                    ing.max_pct,
                    defaults.get(&ing.ingredient_id).copied().unwrap_or_default()
                );
            }
        }
        MaterialKind::Unrecognized(tag) => println!("  Unrecognized kind '{}'", tag),
    }

    let configurable = configurable_materials(catalog, material_id)?;
    if !configurable.is_empty() {
        let names: Vec<String> = configurable.iter().map(|id| catalog.display_name(id)).collect();
        println!("\nConfigurable alloys: {}", names.join(", "));
    }
    Ok(())
}

pub fn run_audit(catalog: &MaterialCatalog) -> Result<()> {
    let issues = catalog.audit();
    if issues.is_empty() {
        println!("Catalog OK ({} materials)", catalog.len());
        return Ok(());
    }
    for issue in &issues {
        println!("  - {}", issue);
    }
    bail!("{} catalog issue(s) found", issues.len());
}
