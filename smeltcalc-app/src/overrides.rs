use anyhow::{anyhow, bail, Context, Result};
use smeltcalc_schemas::material::UserOverrideMap;

/// Parses `--set` values of the form `alloy:ingredient=percent` into an
/// override map. Repeating the same pair keeps the last value.
pub fn parse_overrides<S: AsRef<str>>(entries: &[S]) -> Result<UserOverrideMap> {
    let mut overrides = UserOverrideMap::new();
    for entry in entries {
        let (alloy, ingredient, pct) = parse_entry(entry.as_ref())?;
        overrides
            .entry(alloy)
            .or_default()
            .insert(ingredient, pct);
    }
    Ok(overrides)
}

fn parse_entry(entry: &str) -> Result<(String, String, f64)> {
    let (path, value) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("Override '{}' is missing '=percent'", entry))?;
    let (alloy, ingredient) = path
        .split_once(':')
        .ok_or_else(|| anyhow!("Override '{}' must look like alloy:ingredient=percent", entry))?;
    let (alloy, ingredient) = (alloy.trim(), ingredient.trim());
    if alloy.is_empty() || ingredient.is_empty() {
        bail!("Override '{}' names an empty alloy or ingredient", entry);
    }
    let pct: f64 = value
        .trim()
        .trim_end_matches('%')
        .parse()
        .with_context(|| format!("Override '{}' has a non-numeric percentage", entry))?;
    if !pct.is_finite() {
        bail!("Override '{}' has a non-finite percentage", entry);
    }
    Ok((alloy.to_string(), ingredient.to_string(), pct))
}

/// Overlays `extra` onto `base`, ingredient by ingredient.
pub fn merge_overrides(base: &mut UserOverrideMap, extra: UserOverrideMap) {
    for (alloy, split) in extra {
        base.entry(alloy).or_default().extend(split);
    }
}
