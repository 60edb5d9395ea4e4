//! Percentage handling for recipes: centred defaults, validation of a
//! caller-supplied split, and resolution of partial overrides.

use crate::{
    catalog::Catalog,
    error::{PercentageViolation, SmeltError},
};
use smeltcalc_schemas::material::{MaterialKind, MaterialRecord, PercentageMap};
use std::collections::HashSet;
use tracing::warn;

/// Slack allowed around an ingredient's [min, max] bounds.
pub const RANGE_EPSILON: f64 = 0.001;

/// Allowed distance of a percentage sum from 100.
pub const SUM_TOLERANCE: f64 = 0.01;

/// Outcome of [`validate_percentages`] for a known material.
#[derive(Debug, Clone, PartialEq)]
pub enum PercentageCheck {
    Valid,
    Invalid(PercentageViolation),
}

impl PercentageCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, PercentageCheck::Valid)
    }

    pub fn into_result(self) -> Result<(), PercentageViolation> {
        match self {
            PercentageCheck::Valid => Ok(()),
            PercentageCheck::Invalid(violation) => Err(violation),
        }
    }
}

/// Percentages picked for a material, and the reason user input was
/// discarded if it was.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub percentages: PercentageMap,
    pub fallback: Option<PercentageViolation>,
}

/// Midpoint of each ingredient's range. Any rounding drift away from 100
/// is added in full to the first declared ingredient.
pub fn default_percentages(
    catalog: &dyn Catalog,
    material_id: &str,
) -> Result<PercentageMap, SmeltError> {
    let record = catalog.lookup(material_id)?;
    defaults_for(record)
}

fn defaults_for(record: &MaterialRecord) -> Result<PercentageMap, SmeltError> {
    let mut percentages = PercentageMap::new();
    let Some(first) = record.ingredients.first() else {
        return Ok(percentages);
    };

    let mut total = 0.0;
    for ing in &record.ingredients {
        let mid = ing.midpoint();
        percentages.insert(ing.ingredient_id.clone(), mid);
        total += mid;
    }

    if (total - 100.0).abs() > SUM_TOLERANCE {
        let first_share = percentages.get_mut(&first.ingredient_id).ok_or_else(|| {
            SmeltError::InternalInconsistency(format!(
                "first ingredient {} not found in percentage map of {} during adjustment",
                first.ingredient_id, record.id
            ))
        })?;
        *first_share += 100.0 - total;
    }
    Ok(percentages)
}

/// Checks a complete percentage map against a material's recipe.
///
/// An empty map is valid for any material: it means "use the defaults".
/// A non-empty map must name exactly the recipe's ingredients, keep each
/// value inside its range and sum to 100. Merging partial input is
/// [`resolve_percentages`]' job, not this function's.
pub fn validate_percentages(
    catalog: &dyn Catalog,
    material_id: &str,
    percentages: &PercentageMap,
) -> Result<PercentageCheck, SmeltError> {
    let record = catalog.lookup(material_id)?;
    Ok(check_against(catalog, record, percentages))
}

fn check_against(
    catalog: &dyn Catalog,
    record: &MaterialRecord,
    percentages: &PercentageMap,
) -> PercentageCheck {
    if record.ingredients.is_empty() {
        if percentages.is_empty() {
            return PercentageCheck::Valid;
        }
        return PercentageCheck::Invalid(PercentageViolation::UnexpectedEntries {
            material: record.name.clone(),
            count: percentages.len(),
        });
    }
    if percentages.is_empty() {
        return PercentageCheck::Valid;
    }

    if percentages.len() != record.ingredients.len() {
        return PercentageCheck::Invalid(PercentageViolation::CountMismatch {
            material: record.id.clone(),
            expected: record.ingredients.len(),
            got: percentages.len(),
        });
    }

    let mut total = 0.0;
    for ing in &record.ingredients {
        let Some(&value) = percentages.get(&ing.ingredient_id) else {
            return PercentageCheck::Invalid(PercentageViolation::MissingIngredient {
                material: record.id.clone(),
                ingredient: ing.ingredient_id.clone(),
            });
        };
        if value < ing.min_pct - RANGE_EPSILON || value > ing.max_pct + RANGE_EPSILON {
            return PercentageCheck::Invalid(PercentageViolation::OutOfRange {
                material: record.name.clone(),
                ingredient: catalog.display_name(&ing.ingredient_id),
                value,
                min: ing.min_pct,
                max: ing.max_pct,
            });
        }
        total += value;
    }

    if (total - 100.0).abs() > SUM_TOLERANCE {
        return PercentageCheck::Invalid(PercentageViolation::BadSum {
            material: record.name.clone(),
            total,
        });
    }
    PercentageCheck::Valid
}

/// Copies `user` and fills every ingredient it leaves out with the default.
pub fn fill_with_defaults(record: &MaterialRecord, user: &PercentageMap) -> PercentageMap {
    let mut filled = user.clone();
    let missing = record
        .ingredients
        .iter()
        .any(|ing| !filled.contains_key(&ing.ingredient_id));
    if !missing {
        return filled;
    }
    // Defaults only fail for a record without a first ingredient, in which
    // case there is nothing to fill.
    if let Ok(defaults) = defaults_for(record) {
        for ing in &record.ingredients {
            if let Some(&default) = defaults.get(&ing.ingredient_id) {
                filled.entry(ing.ingredient_id.clone()).or_insert(default);
            }
        }
    }
    filled
}

/// Merges a (possibly partial) user map with the defaults and validates
/// the result. Invalid input does not fail the call: the defaults are
/// returned instead and the violation is reported in `fallback`.
pub fn resolve_percentages(
    catalog: &dyn Catalog,
    material_id: &str,
    user: &PercentageMap,
) -> Result<Resolution, SmeltError> {
    let record = catalog.lookup(material_id)?;
    if record.ingredients.is_empty() {
        return Ok(Resolution {
            percentages: PercentageMap::new(),
            fallback: None,
        });
    }
    if user.is_empty() {
        return Ok(Resolution {
            percentages: defaults_for(record)?,
            fallback: None,
        });
    }

    let filled = fill_with_defaults(record, user);
    match check_against(catalog, record, &filled) {
        PercentageCheck::Valid => Ok(Resolution {
            percentages: filled,
            fallback: None,
        }),
        PercentageCheck::Invalid(violation) => {
            warn!(material = %material_id, %violation, "invalid user percentages, using defaults");
            Ok(Resolution {
                percentages: defaults_for(record)?,
                fallback: Some(violation),
            })
        }
    }
}

/// Ids of every alloy below `target_id` whose split a user can choose, in
/// the order they are first reached. Composites are configured through
/// their components.
pub fn configurable_materials(
    catalog: &dyn Catalog,
    target_id: &str,
) -> Result<Vec<String>, SmeltError> {
    catalog.lookup(target_id)?;

    let mut found = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![target_id.to_string()];

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Some(record) = catalog.material(&id) else {
            continue;
        };

        let mut next: Vec<&str> = Vec::new();
        match &record.kind {
            MaterialKind::SimpleAlloy if !record.ingredients.is_empty() => {
                found.push(id.clone());
                next.extend(record.ingredients.iter().map(|ing| ing.ingredient_id.as_str()));
            }
            MaterialKind::SinglePass => next.extend(record.pass_through_target()),
            MaterialKind::Composite => {
                if let Some((primary, extra)) = record.components() {
                    next.push(primary);
                    next.push(extra);
                }
            }
            _ => {}
        }
        // Reversed so the stack pops children in declaration order.
        stack.extend(next.into_iter().rev().map(str::to_string));
    }
    Ok(found)
}
