use smeltcalc_schemas::unit::UnknownUnit;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmeltError {
    #[error("Material '{0}' not found in catalog")]
    NotFound(String),

    #[error("Amount must be positive (got {0})")]
    InvalidAmount(f64),

    #[error("Invalid quantity unit '{0}' (expected mB or Ingots)")]
    InvalidUnit(String),

    #[error("Incomplete data for composite '{0}' (missing primary or extra component)")]
    IncompleteComposite(String),

    #[error("Single-pass material '{0}' does not name the material it forwards to")]
    IncompleteSinglePass(String),

    #[error("Could not determine percentages for {material}: {source}")]
    PercentageUnavailable {
        material: String,
        #[source]
        source: Box<SmeltError>,
    },

    #[error("Invalid user percentages for {material}: {violation}")]
    InvalidUserPercentages {
        material: String,
        #[source]
        violation: PercentageViolation,
    },

    #[error("Maximum recursion depth {depth} exceeded at '{material}', check for cyclic recipes")]
    CycleSuspected { material: String, depth: usize },

    #[error("Unhandled material kind '{kind}' for '{material}'")]
    UnhandledKind { material: String, kind: String },

    #[error("Internal error: {0}")]
    InternalInconsistency(String),

    #[error("Error calculating component '{component}' of '{material}': {source}")]
    Component {
        material: String,
        component: String,
        #[source]
        source: Box<SmeltError>,
    },

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to write CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),
}

impl SmeltError {
    /// The innermost error once component context is peeled off.
    pub fn root_cause(&self) -> &SmeltError {
        match self {
            SmeltError::Component { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<UnknownUnit> for SmeltError {
    fn from(err: UnknownUnit) -> Self {
        SmeltError::InvalidUnit(err.0)
    }
}

/// Why a percentage map was rejected for a material.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PercentageViolation {
    #[error("{material} has no configurable ingredients but {count} percentages were given")]
    UnexpectedEntries { material: String, count: usize },

    #[error("incorrect number of ingredients for {material} (expected {expected}, got {got})")]
    CountMismatch {
        material: String,
        expected: usize,
        got: usize,
    },

    #[error("percentage for {ingredient} is missing in {material}")]
    MissingIngredient { material: String, ingredient: String },

    #[error("percentage for {ingredient} ({value:.2}%) is outside the allowed range [{min:.0}-{max:.0}%] in {material}")]
    OutOfRange {
        material: String,
        ingredient: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("sum of percentages for {material} ({total:.2}%) does not equal 100%")]
    BadSum { material: String, total: f64 },
}
