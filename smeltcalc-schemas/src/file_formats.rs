use crate::material::{MaterialRecord, UserOverrideMap};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub schema_version: String,
    pub materials: Vec<MaterialRecord>,
}

/// A calculation described in a file, as accepted by `smeltcalc calc --request`.
///
/// The unit stays a string here so that a bad value surfaces as the
/// calculator's unit error rather than a parse failure of the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub target: String,
    pub amount: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub overrides: UserOverrideMap,
}

fn default_unit() -> String {
    "Ingots".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_ingots_without_overrides() {
        let request: CalculationRequest =
            serde_yaml::from_str("target: brass\namount: 3\n").unwrap();
        assert_eq!(request.unit, "Ingots");
        assert!(request.overrides.is_empty());
        assert_eq!(request.amount, 3.0);
    }

    #[test]
    fn request_reads_nested_overrides() {
        let yaml = r#"
target: black_steel
amount: 1
unit: mB
overrides:
  raw_black_steel:
    steel: 60
    nickel: 20
"#;
        let request: CalculationRequest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.unit, "mB");
        assert_eq!(request.overrides["raw_black_steel"]["nickel"], 20.0);
    }

    #[test]
    fn catalog_file_lists_materials() {
        let yaml = r#"
schema_version: "1.0"
materials:
  - id: copper
    name: Copper
    kind: base
  - id: brass
    name: Brass
    kind: alloy
    ingredients:
      - { id: copper, min: 88, max: 92 }
      - { id: zinc, min: 8, max: 12 }
"#;
        let file: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.schema_version, "1.0");
        assert_eq!(file.materials.len(), 2);
        assert_eq!(file.materials[1].ingredients[1].min_pct, 8.0);
    }
}
