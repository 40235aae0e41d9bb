//! Cure step definitions.
use serde::{Deserialize, Serialize};

/// A checkable condition that, together with its chance roll, lowers a stage
/// or fully cures a disease (or treats a symptom).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CureStep {
    /// Probability the step succeeds once its condition is met.
    #[serde(default = "CureStep::default_chance")]
    pub chance: f64,
    /// Lower the stage by one instead of curing.
    #[serde(default)]
    pub lower_stage: bool,
    #[serde(flatten)]
    pub condition: CureCondition,
}

impl CureStep {
    const fn default_chance() -> f64 {
        1.0
    }

    #[must_use]
    pub const fn new(chance: f64, condition: CureCondition) -> Self {
        Self {
            chance,
            lower_stage: false,
            condition,
        }
    }

    #[must_use]
    pub const fn lowering(mut self) -> Self {
        self.lower_stage = true;
        self
    }
}

/// The specific check behind a cure step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CureCondition {
    /// The carrier's solution holds at least `quantity` of `reagent`.
    Reagent {
        reagent: String,
        quantity: f32,
        /// Remove the reagent when the check passes.
        #[serde(default = "default_consume")]
        consume: bool,
    },
    /// Accumulated sleep since infection reaches `required_secs`.
    Sleep { required_secs: f64 },
    /// Time since infection reaches `required_secs`.
    Elapsed { required_secs: f64 },
    /// Body temperature stays within `[min, max]` for `required_secs` in a row.
    Temperature {
        min: f32,
        max: f32,
        required_secs: f64,
    },
}

const fn default_consume() -> bool {
    true
}

impl CureCondition {
    /// Human readable description used by diagnostic reports.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Reagent {
                reagent, quantity, ..
            } => format!("administer {quantity}u of {reagent}"),
            Self::Sleep { required_secs } => format!("sleep for {required_secs:.0}s"),
            Self::Elapsed { required_secs } => format!("wait out {required_secs:.0}s"),
            Self::Temperature {
                min,
                max,
                required_secs,
            } => format!("hold body temperature at {min:.0}-{max:.0}K for {required_secs:.0}s"),
        }
    }
}
