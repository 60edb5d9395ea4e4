use crate::error::SmeltError;
use smeltcalc_schemas::{
    file_formats::CatalogFile,
    material::{MaterialKind, MaterialRecord},
};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Read-only access to material definitions.
///
/// The engine only ever reads through this trait, so any storage that can
/// hand out records by id (an in-memory snapshot, a cached database view)
/// can sit behind it. Implementations own their own synchronisation.
pub trait Catalog: Send + Sync {
    fn material(&self, id: &str) -> Option<&MaterialRecord>;

    fn materials(&self) -> Vec<&MaterialRecord>;

    fn lookup(&self, id: &str) -> Result<&MaterialRecord, SmeltError> {
        self.material(id)
            .ok_or_else(|| SmeltError::NotFound(id.to_string()))
    }

    /// Never fails; unknown ids render as `Unknown[id]`.
    fn display_name(&self, id: &str) -> String {
        self.material(id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("Unknown[{}]", id))
    }
}

/// Immutable snapshot of a set of material records.
#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    records: HashMap<String, MaterialRecord>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = MaterialRecord>,
    {
        let mut catalog = Self::new();
        catalog.extend(records);
        catalog
    }

    /// Parses a single catalog file's contents. `origin` only labels errors.
    pub fn from_yaml_str(origin: &str, content: &str) -> Result<Self, SmeltError> {
        let file: CatalogFile = serde_yaml::from_str(content)
            .map_err(|e| SmeltError::YamlParsing(origin.to_string(), e))?;
        Ok(Self::from_records(file.materials))
    }

    /// Later records replace earlier ones with the same id.
    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = MaterialRecord>,
    {
        for record in records {
            if self.records.contains_key(&record.id) {
                warn!(material = %record.id, "duplicate material id in catalog, keeping the later definition");
            }
            self.records.insert(record.id.clone(), record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Materials a user would pick as a calculation target, sorted by name.
    pub fn selectable_targets(&self) -> Vec<&MaterialRecord> {
        let mut targets: Vec<&MaterialRecord> = self
            .records
            .values()
            .filter(|m| matches!(m.kind, MaterialKind::SimpleAlloy | MaterialKind::Composite))
            .filter(|m| !self.is_only_an_intermediate(m))
            .collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        targets
    }

    // Raw forms of composites are configured through the composite itself.
    fn is_only_an_intermediate(&self, record: &MaterialRecord) -> bool {
        self.records.values().any(|other| {
            other.kind == MaterialKind::Composite
                && other.primary_component.as_deref() == Some(record.id.as_str())
        })
    }

    /// Checks every record against the invariants the engine assumes.
    /// The engine still guards itself at run time; this is for reporting.
    pub fn audit(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        let mut ids: Vec<&String> = self.records.keys().collect();
        ids.sort();

        for id in ids {
            let record = &self.records[id];
            let mut report = |problem: IssueKind| {
                issues.push(CatalogIssue {
                    material: id.clone(),
                    problem,
                })
            };

            match &record.kind {
                MaterialKind::Base => {
                    if !record.ingredients.is_empty() {
                        report(IssueKind::BaseWithIngredients);
                    }
                }
                MaterialKind::SimpleAlloy => {
                    if record.ingredients.is_empty() {
                        report(IssueKind::AlloyWithoutIngredients);
                    }
                }
                MaterialKind::SinglePass => match record.pass_through_target() {
                    Some(target) if self.material(target).is_none() => {
                        report(IssueKind::DanglingReference(target.to_string()))
                    }
                    Some(_) => {}
                    None => report(IssueKind::MissingPassThrough),
                },
                MaterialKind::Composite => match record.components() {
                    Some((primary, extra)) => {
                        for part in [primary, extra] {
                            if self.material(part).is_none() {
                                report(IssueKind::DanglingReference(part.to_string()));
                            }
                        }
                    }
                    None => report(IssueKind::MissingComponent),
                },
                MaterialKind::Unrecognized(tag) => report(IssueKind::UnrecognizedKind(tag.clone())),
            }

            for ing in &record.ingredients {
                let in_bounds = (0.0..=100.0).contains(&ing.min_pct)
                    && (0.0..=100.0).contains(&ing.max_pct);
                if !in_bounds || ing.min_pct > ing.max_pct {
                    report(IssueKind::BadRange {
                        ingredient: ing.ingredient_id.clone(),
                        min: ing.min_pct,
                        max: ing.max_pct,
                    });
                }
                if self.material(&ing.ingredient_id).is_none() {
                    report(IssueKind::DanglingReference(ing.ingredient_id.clone()));
                }
            }
        }
        issues
    }
}

impl Catalog for MaterialCatalog {
    fn material(&self, id: &str) -> Option<&MaterialRecord> {
        self.records.get(id)
    }

    fn materials(&self) -> Vec<&MaterialRecord> {
        let mut all: Vec<&MaterialRecord> = self.records.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogIssue {
    pub material: String,
    pub problem: IssueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    BaseWithIngredients,
    AlloyWithoutIngredients,
    MissingPassThrough,
    MissingComponent,
    UnrecognizedKind(String),
    BadRange { ingredient: String, min: f64, max: f64 },
    DanglingReference(String),
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            IssueKind::BaseWithIngredients => {
                write!(f, "{}: base material lists ingredients", self.material)
            }
            IssueKind::AlloyWithoutIngredients => {
                write!(f, "{}: alloy has no ingredients", self.material)
            }
            IssueKind::MissingPassThrough => {
                write!(f, "{}: single-pass material has no target", self.material)
            }
            IssueKind::MissingComponent => {
                write!(f, "{}: composite is missing a component", self.material)
            }
            IssueKind::UnrecognizedKind(tag) => {
                write!(f, "{}: unrecognized kind '{}'", self.material, tag)
            }
            IssueKind::BadRange { ingredient, min, max } => write!(
                f,
                "{}: ingredient {} has invalid range [{}-{}]",
                self.material, ingredient, min, max
            ),
            IssueKind::DanglingReference(target) => {
                write!(f, "{}: refers to unknown material '{}'", self.material, target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tfc_catalog;
    use smeltcalc_schemas::material::IngredientRange;

    #[test]
    fn lookup_known_and_unknown() {
        let catalog = tfc_catalog();
        let brass = catalog.lookup("brass").unwrap();
        assert_eq!(brass.name, "Brass");
        assert_eq!(brass.kind, MaterialKind::SimpleAlloy);
        assert!(matches!(
            catalog.lookup("nonexistent_id"),
            Err(SmeltError::NotFound(id)) if id == "nonexistent_id"
        ));
    }

    #[test]
    fn display_name_falls_back() {
        let catalog = tfc_catalog();
        assert_eq!(catalog.display_name("brass"), "Brass");
        assert_eq!(catalog.display_name("does_not_exist"), "Unknown[does_not_exist]");
    }

    #[test]
    fn materials_returns_every_record_once() {
        let catalog = tfc_catalog();
        let all = catalog.materials();
        assert_eq!(all.len(), catalog.len());
        for record in all {
            assert!(catalog.material(&record.id).is_some());
        }
    }

    #[test]
    fn later_duplicate_wins() {
        let catalog = MaterialCatalog::from_records(vec![
            MaterialRecord::base("tin", "Tin"),
            MaterialRecord::base("tin", "Cassiterite Tin"),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.display_name("tin"), "Cassiterite Tin");
    }

    #[test]
    fn selectable_targets_hide_raw_forms() {
        let catalog = tfc_catalog();
        let names: Vec<&str> = catalog
            .selectable_targets()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Bismuth Bronze",
                "Black Bronze",
                "Black Steel",
                "Blue Steel",
                "Brass",
                "Red Steel",
                "Rose Gold",
                "Sterling Silver",
            ]
        );
    }

    #[test]
    fn tfc_data_passes_audit() {
        assert_eq!(tfc_catalog().audit(), Vec::new());
    }

    #[test]
    fn audit_reports_broken_records() {
        let catalog = MaterialCatalog::from_records(vec![
            MaterialRecord::base("copper", "Copper"),
            MaterialRecord::alloy("empty", "Empty", vec![]),
            MaterialRecord::alloy(
                "bad",
                "Bad",
                vec![IngredientRange::new("copper", 60.0, 40.0)],
            ),
            MaterialRecord::composite("final", "Final", "copper", "ghost"),
            MaterialRecord::with_kind("odd", "Odd", MaterialKind::from("gemstone")),
        ]);
        let issues = catalog.audit();
        let problems: Vec<&IssueKind> = issues.iter().map(|i| &i.problem).collect();
        assert!(problems.contains(&&IssueKind::AlloyWithoutIngredients));
        assert!(problems.contains(&&IssueKind::BadRange {
            ingredient: "copper".to_string(),
            min: 60.0,
            max: 40.0,
        }));
        assert!(problems.contains(&&IssueKind::DanglingReference("ghost".to_string())));
        assert!(problems.contains(&&IssueKind::UnrecognizedKind("gemstone".to_string())));
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn parses_yaml_catalog() {
        let yaml = r#"
schema_version: "1.0"
materials:
  - { id: copper, name: Copper, kind: base }
  - { id: zinc, name: Zinc, kind: base }
  - id: brass
    name: Brass
    kind: alloy
    ingredients:
      - { id: copper, min: 88, max: 92 }
      - { id: zinc, min: 8, max: 12 }
"#;
        let catalog = MaterialCatalog::from_yaml_str("inline", yaml).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("brass").unwrap().ingredients.len(), 2);

        let err = MaterialCatalog::from_yaml_str("broken.yaml", "materials: [").unwrap_err();
        assert!(matches!(err, SmeltError::YamlParsing(origin, _) if origin == "broken.yaml"));
    }
}
