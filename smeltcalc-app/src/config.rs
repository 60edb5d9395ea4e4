use anyhow::{bail, Context, Result};
use smeltcalc_core::catalog::MaterialCatalog;
use smeltcalc_schemas::file_formats::CatalogFile;
use std::{fs, path::Path, path::PathBuf};
use tracing::info;

/// The TerraFirmaCraft alloy set, used when no catalog directory is given.
pub const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog/tfc_alloys.yaml");

/// Where the material catalog comes from for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub catalog_dir: Option<PathBuf>,
}

impl Settings {
    pub fn load_catalog(&self) -> Result<MaterialCatalog> {
        let catalog = match &self.catalog_dir {
            Some(dir) => {
                let records = load_yaml_files(dir, |file: CatalogFile| file.materials)?;
                if records.is_empty() {
                    bail!("No materials found in catalog directory {:?}", dir);
                }
                MaterialCatalog::from_records(records)
            }
            None => MaterialCatalog::from_yaml_str("embedded tfc_alloys.yaml", EMBEDDED_CATALOG)?,
        };
        info!(materials = catalog.len(), source = %self.source_label(), "catalog loaded");
        Ok(catalog)
    }

    fn source_label(&self) -> String {
        match &self.catalog_dir {
            Some(dir) => dir.display().to_string(),
            None => "embedded".to_string(),
        }
    }
}

/// Reads every YAML file in a directory, in file name order, and
/// concatenates the items each one holds.
fn load_yaml_files<P, F, E, T>(dir_path: P, extract_vec: E) -> Result<Vec<T>>
where
    P: AsRef<Path>,
    F: for<'de> serde::Deserialize<'de>,
    E: Fn(F) -> Vec<T>,
{
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir_path.as_ref())
        .with_context(|| format!("Failed to read directory: {:?}", dir_path.as_ref()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |s| s == "yaml" || s == "yml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::new();
    for path in paths {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let file_wrapper: F = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML from {:?}", path))?;
        items.extend(extract_vec(file_wrapper));
    }
    Ok(items)
}
