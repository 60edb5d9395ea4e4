//! Recursive expansion of a material into the base materials it is made of.

use crate::{
    catalog::Catalog,
    error::{PercentageViolation, SmeltError},
    percentages::{default_percentages, resolve_percentages, Resolution},
};
use smeltcalc_schemas::material::{MaterialAmounts, MaterialKind, MaterialRecord, UserOverrideMap};
use std::collections::HashMap;
use tracing::debug;

/// Deepest nesting followed before a recipe graph is assumed to be cyclic.
pub const MAX_DEPTH: usize = 20;

/// Quantities below this are pruned from expansion and from reports.
pub const NEGLIGIBLE_AMOUNT: f64 = 0.001;

/// User percentages for `material` were rejected somewhere in the tree and
/// the defaults were used in their place.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentageFallback {
    pub material: String,
    pub violation: PercentageViolation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakdown {
    pub materials: MaterialAmounts,
    /// At most one entry per material, however often it appears in the tree.
    pub diagnostics: Vec<PercentageFallback>,
}

impl Breakdown {
    pub fn merge(mut self, other: Breakdown) -> Breakdown {
        merge_into(&mut self.materials, &other.materials);
        for fallback in other.diagnostics {
            if !self.diagnostics.iter().any(|d| d.material == fallback.material) {
                self.diagnostics.push(fallback);
            }
        }
        self
    }
}

/// Union of both maps, summing the amounts of shared keys.
pub fn sum_materials(first: &MaterialAmounts, second: &MaterialAmounts) -> MaterialAmounts {
    let mut result = first.clone();
    merge_into(&mut result, second);
    result
}

fn merge_into(total: &mut MaterialAmounts, part: &MaterialAmounts) {
    for (id, amount) in part {
        *total.entry(id.clone()).or_insert(0.0) += amount;
    }
}

/// Expands `target_id` at `quantity` into terminal base materials.
///
/// `overrides` applies to every alloy in the tree, not only the target.
/// Invalid overrides for a nested alloy fall back to its defaults and are
/// listed in the returned diagnostics.
pub fn expand(
    catalog: &dyn Catalog,
    target_id: &str,
    quantity: f64,
    overrides: &UserOverrideMap,
    depth: usize,
) -> Result<Breakdown, SmeltError> {
    expand_all(catalog, &[target_id], quantity, overrides, depth)
}

/// Expands each of `target_ids` at the full `quantity` and sums the results.
/// Percentages are resolved once per alloy across all targets.
pub fn expand_all(
    catalog: &dyn Catalog,
    target_ids: &[&str],
    quantity: f64,
    overrides: &UserOverrideMap,
    depth: usize,
) -> Result<Breakdown, SmeltError> {
    let mut expander = Expander {
        catalog,
        overrides,
        resolved: HashMap::new(),
        diagnostics: Vec::new(),
    };
    let mut materials = MaterialAmounts::new();
    for target_id in target_ids {
        let part = expander.expand_node(target_id, quantity, depth)?;
        merge_into(&mut materials, &part);
    }
    Ok(Breakdown {
        materials,
        diagnostics: expander.diagnostics,
    })
}

/// Percentages used for one alloy node: the user's entry for it if there is
/// one (falling back to defaults when invalid), otherwise the defaults.
pub(crate) fn node_percentages(
    catalog: &dyn Catalog,
    record: &MaterialRecord,
    overrides: &UserOverrideMap,
) -> Result<Resolution, SmeltError> {
    let resolved = match overrides.get(&record.id) {
        Some(user) => resolve_percentages(catalog, &record.id, user),
        None => default_percentages(catalog, &record.id).map(|percentages| Resolution {
            percentages,
            fallback: None,
        }),
    };
    resolved.map_err(|e| SmeltError::PercentageUnavailable {
        material: record.name.clone(),
        source: Box::new(e),
    })
}

/// Resolved percentage of one ingredient. Resolution always covers every
/// ingredient, so a gap is an engine bug rather than bad input.
pub(crate) fn ingredient_share(
    resolution: &Resolution,
    record: &MaterialRecord,
    ingredient_id: &str,
) -> Result<f64, SmeltError> {
    resolution
        .percentages
        .get(ingredient_id)
        .copied()
        .ok_or_else(|| {
            SmeltError::InternalInconsistency(format!(
                "percentage not found for {} in alloy {} after validation",
                ingredient_id, record.id
            ))
        })
}

struct Expander<'a> {
    catalog: &'a dyn Catalog,
    overrides: &'a UserOverrideMap,
    resolved: HashMap<String, Resolution>,
    diagnostics: Vec<PercentageFallback>,
}

impl Expander<'_> {
    fn expand_node(
        &mut self,
        target_id: &str,
        quantity: f64,
        depth: usize,
    ) -> Result<MaterialAmounts, SmeltError> {
        if depth > MAX_DEPTH {
            return Err(SmeltError::CycleSuspected {
                material: target_id.to_string(),
                depth,
            });
        }
        let catalog = self.catalog;
        let record = catalog.lookup(target_id)?;
        debug!(material = %target_id, kind = %record.kind, quantity, depth, "expanding");

        match &record.kind {
            MaterialKind::Base => Ok(MaterialAmounts::from([(target_id.to_string(), quantity)])),
            MaterialKind::SinglePass => {
                let source = record
                    .pass_through_target()
                    .ok_or_else(|| SmeltError::IncompleteSinglePass(target_id.to_string()))?;
                self.expand_child(target_id, source, quantity, depth)
            }
            MaterialKind::Composite => {
                let (primary, extra) = record
                    .components()
                    .ok_or_else(|| SmeltError::IncompleteComposite(target_id.to_string()))?;
                let mut total = self.expand_child(target_id, primary, quantity, depth)?;
                let extra_part = self.expand_child(target_id, extra, quantity, depth)?;
                merge_into(&mut total, &extra_part);
                Ok(total)
            }
            MaterialKind::SimpleAlloy => self.expand_alloy(record, quantity, depth),
            MaterialKind::Unrecognized(kind) => Err(SmeltError::UnhandledKind {
                material: target_id.to_string(),
                kind: kind.clone(),
            }),
        }
    }

    fn expand_alloy(
        &mut self,
        record: &MaterialRecord,
        quantity: f64,
        depth: usize,
    ) -> Result<MaterialAmounts, SmeltError> {
        let mut total = MaterialAmounts::new();
        if record.ingredients.is_empty() {
            return Ok(total);
        }

        let resolution = match self.resolved.get(&record.id) {
            Some(known) => known.clone(),
            None => {
                let fresh = node_percentages(self.catalog, record, self.overrides)?;
                if let Some(violation) = &fresh.fallback {
                    self.diagnostics.push(PercentageFallback {
                        material: record.id.clone(),
                        violation: violation.clone(),
                    });
                }
                self.resolved.insert(record.id.clone(), fresh.clone());
                fresh
            }
        };

        for ing in &record.ingredients {
            let percentage = ingredient_share(&resolution, record, &ing.ingredient_id)?;
            let required = quantity * (percentage / 100.0);
            if required < NEGLIGIBLE_AMOUNT {
                continue;
            }
            let part = self.expand_child(&record.id, &ing.ingredient_id, required, depth)?;
            merge_into(&mut total, &part);
        }
        Ok(total)
    }

    fn expand_child(
        &mut self,
        parent_id: &str,
        child_id: &str,
        quantity: f64,
        depth: usize,
    ) -> Result<MaterialAmounts, SmeltError> {
        self.expand_node(child_id, quantity, depth + 1)
            .map_err(|e| SmeltError::Component {
                material: parent_id.to_string(),
                component: child_id.to_string(),
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MaterialCatalog;
    use crate::test_support::{amounts, assert_amounts_eq, ing, tfc_catalog};
    use smeltcalc_schemas::material::PercentageMap;

    fn no_overrides() -> UserOverrideMap {
        UserOverrideMap::new()
    }

    #[test]
    fn sum_materials_adds_shared_keys() {
        let m1 = amounts(&[("a", 10.0), ("b", 5.0)]);
        let m2 = amounts(&[("b", 2.5), ("c", 7.5)]);
        assert_eq!(
            sum_materials(&m1, &m2),
            amounts(&[("a", 10.0), ("b", 7.5), ("c", 7.5)])
        );
        assert_eq!(sum_materials(&m1, &m2), sum_materials(&m2, &m1));
    }

    #[test]
    fn base_material_is_itself() {
        let catalog = tfc_catalog();
        let result = expand(&catalog, "copper", 50.0, &no_overrides(), 0).unwrap();
        assert_eq!(result.materials, amounts(&[("copper", 50.0)]));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn simple_alloy_splits_by_defaults() {
        let catalog = tfc_catalog();
        let result = expand(&catalog, "brass", 100.0, &no_overrides(), 0).unwrap();
        assert_amounts_eq(&result.materials, &amounts(&[("copper", 90.0), ("zinc", 10.0)]), 1e-6);
    }

    #[test]
    fn single_pass_forwards_quantity() {
        let catalog = tfc_catalog();
        let result = expand(&catalog, "steel", 144.0, &no_overrides(), 0).unwrap();
        assert_eq!(result.materials, amounts(&[("pig_iron", 144.0)]));
    }

    #[test]
    fn composite_expands_both_components_in_full() {
        let catalog = tfc_catalog();
        let composite = expand(&catalog, "black_steel", 100.0, &no_overrides(), 0).unwrap();
        let raw = expand(&catalog, "raw_black_steel", 100.0, &no_overrides(), 0).unwrap();
        let extra = expand(&catalog, "pig_iron", 100.0, &no_overrides(), 0).unwrap();
        assert_amounts_eq(
            &composite.materials,
            &sum_materials(&raw.materials, &extra.materials),
            1e-9,
        );
        // 60 steel -> pig iron plus the extra 100.
        assert_amounts_eq(
            &composite.materials,
            &amounts(&[
                ("pig_iron", 160.0),
                ("nickel", 20.0),
                ("copper", 13.0),
                ("silver", 3.5),
                ("gold", 3.5),
            ]),
            1e-6,
        );
    }

    #[test]
    fn nested_overrides_apply_deep_in_the_tree() {
        let catalog = tfc_catalog();
        let mut overrides = no_overrides();
        overrides.insert(
            "black_bronze".to_string(),
            PercentageMap::from([
                ("copper".to_string(), 50.0),
                ("silver".to_string(), 25.0),
                ("gold".to_string(), 25.0),
            ]),
        );
        let result = expand(&catalog, "raw_black_steel", 100.0, &overrides, 0).unwrap();
        assert_amounts_eq(
            &result.materials,
            &amounts(&[
                ("pig_iron", 60.0),
                ("nickel", 20.0),
                ("copper", 10.0),
                ("silver", 5.0),
                ("gold", 5.0),
            ]),
            1e-6,
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn invalid_nested_override_falls_back_with_diagnostic() {
        let catalog = tfc_catalog();
        let mut overrides = no_overrides();
        overrides.insert(
            "brass".to_string(),
            PercentageMap::from([("copper".to_string(), 70.0), ("zinc".to_string(), 30.0)]),
        );
        let result = expand(&catalog, "brass", 100.0, &overrides, 0).unwrap();
        assert_amounts_eq(&result.materials, &amounts(&[("copper", 90.0), ("zinc", 10.0)]), 1e-6);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].material, "brass");
        assert!(matches!(
            result.diagnostics[0].violation,
            PercentageViolation::OutOfRange { .. }
        ));
    }

    #[test]
    fn repeated_alloy_reports_one_fallback() {
        let catalog = tfc_catalog();
        let mut overrides = no_overrides();
        overrides.insert(
            "black_bronze".to_string(),
            PercentageMap::from([("copper".to_string(), 10.0)]),
        );
        // black_bronze sits under both the raw form and the extra ingredient.
        let result = expand_all(&catalog, &["raw_blue_steel", "black_steel"], 100.0, &overrides, 0).unwrap();
        let flagged: Vec<&str> = result.diagnostics.iter().map(|d| d.material.as_str()).collect();
        assert_eq!(flagged, vec!["black_bronze"]);

        let split = expand(&catalog, "raw_blue_steel", 100.0, &overrides, 0)
            .unwrap()
            .merge(expand(&catalog, "black_steel", 100.0, &overrides, 0).unwrap());
        assert_eq!(split.diagnostics.len(), 1);
        assert_amounts_eq(&split.materials, &result.materials, 1e-9);
    }

    #[test]
    fn ingredient_share_requires_every_ingredient() {
        let catalog = tfc_catalog();
        let brass = catalog.lookup("brass").unwrap();
        let partial = Resolution {
            percentages: PercentageMap::from([("copper".to_string(), 90.0)]),
            fallback: None,
        };
        assert_eq!(ingredient_share(&partial, brass, "copper").unwrap(), 90.0);
        assert!(matches!(
            ingredient_share(&partial, brass, "zinc"),
            Err(SmeltError::InternalInconsistency(ref msg)) if msg.contains("zinc") && msg.contains("brass")
        ));
    }

    #[test]
    fn negligible_branches_are_pruned() {
        let catalog = MaterialCatalog::from_records(vec![
            MaterialRecord::base("a", "A"),
            MaterialRecord::base("b", "B"),
            MaterialRecord::alloy("ab", "AB", vec![ing("a", 99.0, 100.0), ing("b", 0.0, 1.0)]),
        ]);
        let overrides = UserOverrideMap::from([(
            "ab".to_string(),
            PercentageMap::from([("a".to_string(), 99.5), ("b".to_string(), 0.5)]),
        )]);
        // 0.1 * 0.5% = 0.0005, below the threshold.
        let result = expand(&catalog, "ab", 0.1, &overrides, 0).unwrap();
        assert_eq!(result.materials.len(), 1);
        assert!((result.materials["a"] - 0.0995).abs() < 1e-12);
    }

    #[test]
    fn alloy_results_conserve_quantity() {
        let catalog = tfc_catalog();
        for record in catalog.materials() {
            if record.kind != MaterialKind::SimpleAlloy {
                continue;
            }
            let result = expand(&catalog, &record.id, 1000.0, &no_overrides(), 0).unwrap();
            assert!(result.materials.values().all(|v| *v >= 0.0));

            // A composite ingredient needs both of its parts in full measure.
            let has_composite = record.ingredients.iter().any(|i| {
                catalog
                    .material(&i.ingredient_id)
                    .map_or(false, |m| m.kind == MaterialKind::Composite)
            });
            if !has_composite {
                let total: f64 = result.materials.values().sum();
                assert!((total - 1000.0).abs() < 1e-6, "{}: {}", record.id, total);
            }
        }
    }

    #[test]
    fn incomplete_composite_is_an_error() {
        let catalog = MaterialCatalog::from_records(vec![
            MaterialRecord::base("pig_iron", "Pig Iron"),
            MaterialRecord {
                primary_component: Some("pig_iron".to_string()),
                ..MaterialRecord::with_kind("half", "Half", MaterialKind::Composite)
            },
        ]);
        let err = expand(&catalog, "half", 10.0, &no_overrides(), 0).unwrap_err();
        assert!(matches!(err, SmeltError::IncompleteComposite(id) if id == "half"));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let catalog = MaterialCatalog::from_records(vec![MaterialRecord::with_kind(
            "ruby",
            "Ruby",
            MaterialKind::from("gemstone"),
        )]);
        let err = expand(&catalog, "ruby", 1.0, &no_overrides(), 0).unwrap_err();
        assert!(matches!(err, SmeltError::UnhandledKind { kind, .. } if kind == "gemstone"));
    }

    #[test]
    fn cycles_hit_the_depth_bound() {
        let catalog = MaterialCatalog::from_records(vec![
            MaterialRecord::single_pass("ouro", "Ouro", "boros"),
            MaterialRecord::single_pass("boros", "Boros", "ouro"),
        ]);
        let err = expand(&catalog, "ouro", 1.0, &no_overrides(), 0).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            SmeltError::CycleSuspected { depth, .. } if *depth == MAX_DEPTH + 1
        ));
    }

    #[test]
    fn missing_ingredient_reports_context() {
        let catalog = MaterialCatalog::from_records(vec![
            MaterialRecord::base("copper", "Copper"),
            MaterialRecord::alloy(
                "bronze",
                "Bronze",
                vec![ing("copper", 88.0, 92.0), ing("tin", 8.0, 12.0)],
            ),
        ]);
        let err = expand(&catalog, "bronze", 100.0, &no_overrides(), 0).unwrap_err();
        match &err {
            SmeltError::Component { material, component, source } => {
                assert_eq!(material, "bronze");
                assert_eq!(component, "tin");
                assert!(matches!(**source, SmeltError::NotFound(ref id) if id == "tin"));
            }
            other => panic!("expected component error, got {:?}", other),
        }
    }
}
