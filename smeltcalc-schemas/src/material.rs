use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Ingredient id -> percentage (0-100) for one material's recipe.
pub type PercentageMap = HashMap<String, f64>;

/// Material id -> user-chosen percentages for that material's ingredients.
pub type UserOverrideMap = HashMap<String, PercentageMap>;

/// Terminal material id -> quantity, always in the unit of the call.
pub type MaterialAmounts = HashMap<String, f64>;

/// How a material decomposes into other materials.
///
/// Catalog files may use the tags of the TerraFirmaCraft data set
/// (`alloy`, `processed`, `raw_steel`, `final_steel`); they map onto the
/// generic kinds below. Unknown tags are kept as `Unrecognized` so a
/// catalog still loads and the engine can refuse the node when it meets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MaterialKind {
    Base,
    SimpleAlloy,
    SinglePass,
    Composite,
    Unrecognized(String),
}

impl MaterialKind {
    pub fn as_str(&self) -> &str {
        match self {
            MaterialKind::Base => "base",
            MaterialKind::SimpleAlloy => "simple_alloy",
            MaterialKind::SinglePass => "single_pass",
            MaterialKind::Composite => "composite",
            MaterialKind::Unrecognized(tag) => tag,
        }
    }
}

impl From<&str> for MaterialKind {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "base" => MaterialKind::Base,
            "simple_alloy" | "alloy" | "processed" | "raw_steel" => MaterialKind::SimpleAlloy,
            "single_pass" => MaterialKind::SinglePass,
            "composite" | "final_steel" => MaterialKind::Composite,
            _ => MaterialKind::Unrecognized(tag.to_string()),
        }
    }
}

impl From<String> for MaterialKind {
    fn from(tag: String) -> Self {
        MaterialKind::from(tag.as_str())
    }
}

impl From<MaterialKind> for String {
    fn from(kind: MaterialKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a recipe: an ingredient and its allowed share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRange {
    #[serde(rename = "id")]
    pub ingredient_id: String,
    #[serde(rename = "min")]
    pub min_pct: f64,
    #[serde(rename = "max")]
    pub max_pct: f64,
}

impl IngredientRange {
    pub fn new(ingredient_id: impl Into<String>, min_pct: f64, max_pct: f64) -> Self {
        Self {
            ingredient_id: ingredient_id.into(),
            min_pct,
            max_pct,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_pct + self.max_pct) / 2.0
    }
}

/// A catalog entry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub id: String,
    pub name: String,
    pub kind: MaterialKind,
    /// Declaration order matters: rounding drift in the defaults is
    /// absorbed by the first entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<IngredientRange>,
    /// First part of a composite, e.g. the raw form of a final steel.
    #[serde(default, alias = "raw_form", skip_serializing_if = "Option::is_none")]
    pub primary_component: Option<String>,
    /// Second part of a composite, required in the same full quantity.
    #[serde(default, alias = "extra_ingredient", skip_serializing_if = "Option::is_none")]
    pub extra_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_through: Option<String>,
}

impl MaterialRecord {
    pub fn base(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(id, name, MaterialKind::Base)
    }

    pub fn alloy(
        id: impl Into<String>,
        name: impl Into<String>,
        ingredients: Vec<IngredientRange>,
    ) -> Self {
        Self {
            ingredients,
            ..Self::with_kind(id, name, MaterialKind::SimpleAlloy)
        }
    }

    pub fn single_pass(
        id: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            pass_through: Some(target.into()),
            ..Self::with_kind(id, name, MaterialKind::SinglePass)
        }
    }

    pub fn composite(
        id: impl Into<String>,
        name: impl Into<String>,
        primary: impl Into<String>,
        extra: impl Into<String>,
    ) -> Self {
        Self {
            primary_component: Some(primary.into()),
            extra_component: Some(extra.into()),
            ..Self::with_kind(id, name, MaterialKind::Composite)
        }
    }

    pub fn with_kind(id: impl Into<String>, name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            ingredients: Vec::new(),
            primary_component: None,
            extra_component: None,
            pass_through: None,
        }
    }

    pub fn is_base(&self) -> bool {
        self.kind == MaterialKind::Base
    }

    /// The material a single-pass record forwards to. Falls back to the
    /// sole ingredient for records written in the older "100% of X" style.
    pub fn pass_through_target(&self) -> Option<&str> {
        match (&self.pass_through, self.ingredients.as_slice()) {
            (Some(target), _) => Some(target.as_str()),
            (None, [only]) => Some(only.ingredient_id.as_str()),
            _ => None,
        }
    }

    /// Both components of a composite, or `None` if either is missing.
    pub fn components(&self) -> Option<(&str, &str)> {
        match (&self.primary_component, &self.extra_component) {
            (Some(primary), Some(extra)) if !primary.is_empty() && !extra.is_empty() => {
                Some((primary.as_str(), extra.as_str()))
            }
            _ => None,
        }
    }
}
