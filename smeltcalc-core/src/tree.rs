//! Ingredient tree of a calculation, for display.
//!
//! The tree follows the same expansion rules as [`crate::breakdown`] but
//! keeps every intermediate node with its amount instead of only the base
//! materials. Expansion stops at `max_depth` instead of failing.

use crate::{
    breakdown::{ingredient_share, node_percentages, NEGLIGIBLE_AMOUNT},
    catalog::Catalog,
    error::SmeltError,
    percentages::Resolution,
};
use smeltcalc_schemas::{
    material::{MaterialKind, UserOverrideMap},
    unit::FINE_PER_COARSE,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationNode {
    /// `<material>_lvl<depth>_<n>`, unique within one tree.
    pub uid: String,
    pub material_id: String,
    pub name: String,
    pub amount_fine: f64,
    pub amount_coarse: f64,
    pub is_base: bool,
    pub children: Vec<CalculationNode>,
}

impl CalculationNode {
    pub fn label(&self) -> String {
        format!(
            "{} ({:.2}mB | {:.3}Ing)",
            self.name, self.amount_fine, self.amount_coarse
        )
    }

    /// Every base-material leaf, in display order.
    pub fn leaves(&self) -> Vec<&CalculationNode> {
        if self.children.is_empty() {
            return vec![self];
        }
        self.children.iter().flat_map(|c| c.leaves()).collect()
    }
}

/// Builds the tree for `amount_fine` millibuckets of `target_id`. Nodes at
/// `max_depth` are kept but not expanded.
pub fn build_tree(
    catalog: &dyn Catalog,
    target_id: &str,
    amount_fine: f64,
    overrides: &UserOverrideMap,
    max_depth: usize,
) -> Result<CalculationNode, SmeltError> {
    let mut builder = TreeBuilder {
        catalog,
        overrides,
        visits: HashMap::new(),
        resolved: HashMap::new(),
        max_depth,
    };
    builder.node(target_id, amount_fine, 0)
}

struct TreeBuilder<'a> {
    catalog: &'a dyn Catalog,
    overrides: &'a UserOverrideMap,
    visits: HashMap<String, usize>,
    resolved: HashMap<String, Resolution>,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn node(&mut self, id: &str, amount: f64, level: usize) -> Result<CalculationNode, SmeltError> {
        let visit = self.visits.entry(id.to_string()).or_insert(0);
        let uid = format!("{}_lvl{}_{}", id, level, visit);
        *visit += 1;

        let catalog = self.catalog;
        let record = catalog.lookup(id)?;
        let mut node = CalculationNode {
            uid,
            material_id: id.to_string(),
            name: record.name.clone(),
            amount_fine: amount,
            amount_coarse: amount / FINE_PER_COARSE,
            is_base: record.is_base(),
            children: Vec::new(),
        };
        if level >= self.max_depth {
            return Ok(node);
        }

        match &record.kind {
            MaterialKind::Base => {}
            MaterialKind::SinglePass => {
                let source = record
                    .pass_through_target()
                    .ok_or_else(|| SmeltError::IncompleteSinglePass(id.to_string()))?;
                node.children.push(self.node(source, amount, level + 1)?);
            }
            MaterialKind::Composite => {
                let (primary, extra) = record
                    .components()
                    .ok_or_else(|| SmeltError::IncompleteComposite(id.to_string()))?;
                node.children.push(self.node(primary, amount, level + 1)?);
                node.children.push(self.node(extra, amount, level + 1)?);
            }
            MaterialKind::SimpleAlloy => {
                if record.ingredients.is_empty() {
                    return Ok(node);
                }
                let resolution = match self.resolved.get(id) {
                    Some(known) => known.clone(),
                    None => {
                        let fresh = node_percentages(catalog, record, self.overrides)?;
                        self.resolved.insert(id.to_string(), fresh.clone());
                        fresh
                    }
                };
                for ing in &record.ingredients {
                    let share = ingredient_share(&resolution, record, &ing.ingredient_id)?;
                    let child_amount = amount * (share / 100.0);
                    if child_amount < NEGLIGIBLE_AMOUNT {
                        continue;
                    }
                    node.children
                        .push(self.node(&ing.ingredient_id, child_amount, level + 1)?);
                }
                node.children.sort_by(|a, b| a.name.cmp(&b.name));
            }
            MaterialKind::Unrecognized(kind) => {
                return Err(SmeltError::UnhandledKind {
                    material: id.to_string(),
                    kind: kind.clone(),
                })
            }
        }
        Ok(node)
    }
}

/// One printable row of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLine {
    /// For each ancestor level, whether that ancestor was the last child.
    pub ancestors_last: Vec<bool>,
    pub is_last: bool,
    pub text: String,
}

impl TreeLine {
    pub fn depth(&self) -> usize {
        self.ancestors_last.len()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for &last in &self.ancestors_last {
            out.push_str(if last { "    " } else { "│   " });
        }
        out.push_str(if self.is_last { "└── " } else { "├── " });
        out.push_str(&self.text);
        out
    }
}

/// Flattens a forest into lines, depth first.
pub fn format_hierarchy(roots: &[CalculationNode]) -> Vec<TreeLine> {
    let mut lines = Vec::new();
    collect_lines(roots, &mut Vec::new(), &mut lines);
    lines
}

fn collect_lines(nodes: &[CalculationNode], ancestors: &mut Vec<bool>, out: &mut Vec<TreeLine>) {
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == nodes.len();
        out.push(TreeLine {
            ancestors_last: ancestors.clone(),
            is_last,
            text: node.label(),
        });
        if !node.children.is_empty() {
            ancestors.push(is_last);
            collect_lines(&node.children, ancestors, out);
            ancestors.pop();
        }
    }
}

pub fn render_lines(lines: &[TreeLine]) -> String {
    lines
        .iter()
        .map(TreeLine::render)
        .collect::<Vec<_>>()
        .join("\n")
}
