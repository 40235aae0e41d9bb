//! Disease and stage definitions.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::cure::CureStep;

/// Mechanisms by which a disease transfers between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadVector {
    Contact,
    Airborne,
    Blood,
    Special,
}

/// Visibility suppression for diagnostic tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealthFlag {
    HiddenAnalyzer,
    HiddenDiagnoser,
    HiddenTreatment,
}

pub type SpreadVectors = SmallVec<[SpreadVector; 4]>;
pub type StealthFlags = SmallVec<[StealthFlag; 3]>;

/// Contact spread tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSpread {
    #[serde(default = "ContactSpread::default_infect_chance")]
    pub infect_chance: f64,
    /// Residue intensity left on a touched surface.
    #[serde(default = "ContactSpread::default_deposit")]
    pub deposit: f64,
}

impl ContactSpread {
    const fn default_infect_chance() -> f64 {
        0.25
    }

    const fn default_deposit() -> f64 {
        0.2
    }
}

impl Default for ContactSpread {
    fn default() -> Self {
        Self {
            infect_chance: Self::default_infect_chance(),
            deposit: Self::default_deposit(),
        }
    }
}

/// Airborne spread tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirborneSpread {
    #[serde(default = "AirborneSpread::default_infect_chance")]
    pub infect_chance: f64,
    #[serde(default = "AirborneSpread::default_range")]
    pub range: f32,
    /// Chance per progression tick that the carrier exhales an attempt.
    #[serde(default = "AirborneSpread::default_tick_chance")]
    pub tick_chance: f64,
}

impl AirborneSpread {
    const fn default_infect_chance() -> f64 {
        0.1
    }

    const fn default_range() -> f32 {
        2.0
    }

    const fn default_tick_chance() -> f64 {
        0.05
    }
}

impl Default for AirborneSpread {
    fn default() -> Self {
        Self {
            infect_chance: Self::default_infect_chance(),
            range: Self::default_range(),
            tick_chance: Self::default_tick_chance(),
        }
    }
}

/// A symptom slot within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomRef {
    pub id: String,
    /// Stage-local override; negative values fall back to the symptom's own probability.
    #[serde(default)]
    pub probability: Option<f64>,
}

impl SymptomRef {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            probability: None,
        }
    }

    #[must_use]
    pub const fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    /// Probability to roll given the symptom's base probability.
    #[must_use]
    pub fn effective_probability(&self, base: f64) -> f64 {
        match self.probability {
            Some(p) if p >= 0.0 => p,
            _ => base,
        }
    }
}

/// One ordinal step of a disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDef {
    pub stage: u32,
    #[serde(default)]
    pub stealth: StealthFlags,
    #[serde(default)]
    pub symptoms: Vec<SymptomRef>,
    /// Flavor popups with no mechanical effect.
    #[serde(default)]
    pub sensations: Vec<String>,
    #[serde(default)]
    pub sensation_chance: Option<f64>,
    /// Overrides the disease-level cure steps when non-empty.
    #[serde(default)]
    pub cures: Vec<CureStep>,
}

impl StageDef {
    #[must_use]
    pub fn new(stage: u32, symptoms: Vec<SymptomRef>) -> Self {
        Self {
            stage,
            stealth: StealthFlags::new(),
            symptoms,
            sensations: Vec::new(),
            sensation_chance: None,
            cures: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_hidden(&self, flag: StealthFlag) -> bool {
        self.stealth.contains(&flag)
    }
}

/// Immutable catalog entry describing one disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseDef {
    pub id: String,
    pub name: String,
    /// Scaled by the engine's per-tick scalar to give the stage-advance chance.
    #[serde(default = "DiseaseDef::default_stage_speed")]
    pub stage_speed: f64,
    #[serde(default)]
    pub beneficial: bool,
    pub stages: Vec<StageDef>,
    #[serde(default)]
    pub cures: Vec<CureStep>,
    #[serde(default)]
    pub post_cure_immunity: f64,
    #[serde(default)]
    pub spread: SpreadVectors,
    #[serde(default)]
    pub contact: ContactSpread,
    #[serde(default)]
    pub airborne: AirborneSpread,
    #[serde(default)]
    pub ignore_mask_ppe: bool,
    #[serde(default)]
    pub incubation_secs: Option<f64>,
}

impl DiseaseDef {
    const fn default_stage_speed() -> f64 {
        1.0
    }

    /// Minimal disease used by tests and programmatic catalogs.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, stages: Vec<StageDef>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stage_speed: Self::default_stage_speed(),
            beneficial: false,
            stages,
            cures: Vec::new(),
            post_cure_immunity: 0.0,
            spread: SpreadVectors::new(),
            contact: ContactSpread::default(),
            airborne: AirborneSpread::default(),
            ignore_mask_ppe: false,
            incubation_secs: None,
        }
    }

    /// Highest defined stage number; at least 1.
    #[must_use]
    pub fn max_stage(&self) -> u32 {
        u32::try_from(self.stages.len()).unwrap_or(u32::MAX).max(1)
    }

    /// Stage definition for a 1-indexed stage.
    #[must_use]
    pub fn stage(&self, stage: u32) -> Option<&StageDef> {
        let index = usize::try_from(stage.checked_sub(1)?).ok()?;
        self.stages.get(index)
    }

    #[must_use]
    pub fn spreads_by(&self, vector: SpreadVector) -> bool {
        self.spread.contains(&vector)
    }

    /// Cure steps that apply at `stage`: stage-local when present, else disease-level.
    #[must_use]
    pub fn cures_for_stage(&self, stage: u32) -> &[CureStep] {
        match self.stage(stage) {
            Some(def) if !def.cures.is_empty() => &def.cures,
            _ => &self.cures,
        }
    }
}
