use crate::{
    breakdown::{expand_all, Breakdown, PercentageFallback, NEGLIGIBLE_AMOUNT},
    catalog::Catalog,
    error::SmeltError,
    percentages::{fill_with_defaults, validate_percentages},
};
use smeltcalc_schemas::{
    file_formats::CalculationRequest,
    material::{MaterialAmounts, MaterialKind, UserOverrideMap},
    unit::{QuantityUnit, FINE_PER_COARSE},
};

/// Result of a top-level calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirements {
    pub target: String,
    pub amount: f64,
    pub unit: QuantityUnit,
    /// Base material id -> millibuckets.
    pub fine: MaterialAmounts,
    /// Base material id -> ingots.
    pub coarse: MaterialAmounts,
    /// The caller's overrides with the top-level entry completed from
    /// defaults. Pass this back in to reproduce the calculation.
    pub overrides: UserOverrideMap,
    pub diagnostics: Vec<PercentageFallback>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub material_id: String,
    pub name: String,
    pub millibuckets: f64,
    pub ingots: f64,
}

impl Requirements {
    /// One row per base material, ordered by display name.
    pub fn summary_rows(&self, catalog: &dyn Catalog) -> Vec<SummaryRow> {
        let mut rows: Vec<SummaryRow> = self
            .fine
            .iter()
            .map(|(id, mb)| SummaryRow {
                material_id: id.clone(),
                name: catalog.display_name(id),
                millibuckets: *mb,
                ingots: self.coarse.get(id).copied().unwrap_or(mb / FINE_PER_COARSE),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.material_id.cmp(&b.material_id)));
        rows
    }

    pub fn total_millibuckets(&self) -> f64 {
        self.fine.values().sum()
    }
}

/// Same as [`calculate`], starting from a request whose unit is still text.
/// Checks run in the order amount, unit, target.
pub fn calculate_request(
    catalog: &dyn Catalog,
    request: &CalculationRequest,
) -> Result<Requirements, SmeltError> {
    ensure_positive(request.amount)?;
    let unit: QuantityUnit = request.unit.parse()?;
    calculate(catalog, &request.target, request.amount, unit, &request.overrides)
}

/// Computes the base materials needed for `amount` of `target_id`.
///
/// User percentages for the target itself are checked strictly: if they
/// cannot be completed into a valid split the whole call fails. For a
/// composite target that check applies to its primary component. Deeper
/// alloys fall back to defaults instead (see [`expand`]).
pub fn calculate(
    catalog: &dyn Catalog,
    target_id: &str,
    amount: f64,
    unit: QuantityUnit,
    overrides: &UserOverrideMap,
) -> Result<Requirements, SmeltError> {
    ensure_positive(amount)?;
    let target = catalog.lookup(target_id)?;

    let components = match target.kind {
        MaterialKind::Composite => Some(
            target
                .components()
                .ok_or_else(|| SmeltError::IncompleteComposite(target_id.to_string()))?,
        ),
        _ => None,
    };

    let validation_id = components.map_or(target_id, |(primary, _)| primary);
    let mut normalized = overrides.clone();
    if let Some(user) = overrides.get(validation_id).filter(|user| !user.is_empty()) {
        let record = catalog.lookup(validation_id)?;
        let filled = fill_with_defaults(record, user);
        validate_percentages(catalog, validation_id, &filled)?
            .into_result()
            .map_err(|violation| SmeltError::InvalidUserPercentages {
                material: catalog.display_name(validation_id),
                violation,
            })?;
        normalized.insert(validation_id.to_string(), filled);
    }

    let quantity = unit.to_fine(amount);
    let Breakdown {
        materials,
        diagnostics,
    } = match components {
        Some((primary, extra)) => expand_all(catalog, &[primary, extra], quantity, &normalized, 0)?,
        None => expand_all(catalog, &[target_id], quantity, &normalized, 0)?,
    };

    let mut fine = MaterialAmounts::new();
    let mut coarse = MaterialAmounts::new();
    for (id, mb) in materials {
        if mb > NEGLIGIBLE_AMOUNT {
            coarse.insert(id.clone(), mb / FINE_PER_COARSE);
            fine.insert(id, mb);
        }
    }

    if fine.is_empty() && target.is_base() && unit == QuantityUnit::Millibucket {
        fine.insert(target_id.to_string(), amount);
        coarse.insert(target_id.to_string(), amount / FINE_PER_COARSE);
    }

    Ok(Requirements {
        target: target_id.to_string(),
        amount,
        unit,
        fine,
        coarse,
        overrides: normalized,
        diagnostics,
    })
}

fn ensure_positive(amount: f64) -> Result<(), SmeltError> {
    // Written this way round so NaN is rejected too.
    if amount > 0.0 {
        Ok(())
    } else {
        Err(SmeltError::InvalidAmount(amount))
    }
}
