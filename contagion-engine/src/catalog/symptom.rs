//! Symptom and behavior definitions.
use serde::{Deserialize, Serialize};

use super::cure::CureStep;

/// A named, independently triggerable bundle of behaviors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomDef {
    pub id: String,
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
    /// Base trigger probability per progression tick.
    #[serde(default = "SymptomDef::default_probability")]
    pub probability: f64,
    /// Run exactly one behavior, picked uniformly, instead of all of them.
    #[serde(default)]
    pub single_behavior: bool,
    #[serde(default = "SymptomDef::default_only_when_alive")]
    pub only_when_alive: bool,
    /// One-shot airborne pulse fired after the behaviors run.
    #[serde(default)]
    pub airborne_burst: Option<AirborneBurst>,
    /// How long a symptom-level cure keeps this symptom from firing.
    #[serde(default = "SymptomDef::default_cure_duration_secs")]
    pub cure_duration_secs: f64,
    #[serde(default)]
    pub cures: Vec<CureStep>,
}

impl SymptomDef {
    const fn default_probability() -> f64 {
        0.1
    }

    const fn default_only_when_alive() -> bool {
        true
    }

    const fn default_cure_duration_secs() -> f64 {
        60.0
    }

    /// Minimal symptom used by tests and programmatic catalogs.
    #[must_use]
    pub fn new(id: impl Into<String>, probability: f64, behaviors: Vec<Behavior>) -> Self {
        Self {
            id: id.into(),
            behaviors,
            probability,
            single_behavior: false,
            only_when_alive: Self::default_only_when_alive(),
            airborne_burst: None,
            cure_duration_secs: Self::default_cure_duration_secs(),
            cures: Vec::new(),
        }
    }
}

/// Scales applied to the parent disease's airborne parameters for a burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirborneBurst {
    #[serde(default = "default_multiplier_f32")]
    pub range_multiplier: f32,
    #[serde(default = "default_multiplier_f64")]
    pub chance_multiplier: f64,
    /// Leave a lingering cloud behind the burst.
    #[serde(default)]
    pub cloud: Option<CloudBurst>,
}

/// Overrides for a cloud left by a burst; unset fields use engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CloudBurst {
    #[serde(default)]
    pub range: Option<f32>,
    #[serde(default)]
    pub tick_interval_secs: Option<f64>,
    #[serde(default)]
    pub lifetime_secs: Option<f64>,
}

const fn default_multiplier_f32() -> f32 {
    1.0
}

const fn default_multiplier_f64() -> f64 {
    1.0
}

/// A named timed status applied as part of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedStatus {
    pub status: String,
    pub seconds: f64,
    #[serde(default = "default_refresh")]
    pub refresh: bool,
}

const fn default_refresh() -> bool {
    true
}

/// One side effect a symptom can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Behavior {
    /// Perform an emote visible to bystanders.
    Emote { emote: String },
    Vomit,
    Jitter {
        seconds: f64,
        #[serde(default = "default_refresh")]
        refresh: bool,
    },
    Damage {
        #[serde(default = "default_damage_type")]
        damage_type: String,
        amount: f32,
    },
    /// Nudge body temperature toward `target` by at most `max_step` kelvin.
    Temperature { target: f32, max_step: f32 },
    ForcedSleep { chance: f64, seconds: f64 },
    /// Say a random line from the dataset.
    Shout { lines: Vec<String> },
    /// Private popup for the carrier only.
    Sensation { message: String },
    /// Attach a component, rolled back when the disease is cured.
    AddComponent { component: String },
    /// Replace the current disease with another one.
    Transition {
        disease: String,
        #[serde(default = "default_stage")]
        stage: u32,
    },
    StatusBatch { effects: Vec<TimedStatus> },
}

fn default_damage_type() -> String {
    "Poison".to_string()
}

const fn default_stage() -> u32 {
    1
}

impl Behavior {
    /// Short label for logs and event records.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Emote { .. } => "emote",
            Self::Vomit => "vomit",
            Self::Jitter { .. } => "jitter",
            Self::Damage { .. } => "damage",
            Self::Temperature { .. } => "temperature",
            Self::ForcedSleep { .. } => "forced_sleep",
            Self::Shout { .. } => "shout",
            Self::Sensation { .. } => "sensation",
            Self::AddComponent { .. } => "add_component",
            Self::Transition { .. } => "transition",
            Self::StatusBatch { .. } => "status_batch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symptom_defaults_fill_in() {
        let symptom: SymptomDef = serde_json::from_str(
            r#"{ "id": "cough", "behaviors": [ { "kind": "emote", "emote": "coughs" } ] }"#,
        )
        .unwrap();
        assert!((symptom.probability - 0.1).abs() < f64::EPSILON);
        assert!(symptom.only_when_alive);
        assert!(!symptom.single_behavior);
        assert!(symptom.airborne_burst.is_none());
        assert_eq!(symptom.behaviors[0].label(), "emote");
    }

    #[test]
    fn behavior_variants_parse() {
        let behaviors: Vec<Behavior> = serde_json::from_str(
            r#"[
                { "kind": "vomit" },
                { "kind": "damage", "amount": 2.5 },
                { "kind": "transition", "disease": "zombie" },
                { "kind": "status_batch", "effects": [ { "status": "Stutter", "seconds": 4 } ] }
            ]"#,
        )
        .unwrap();
        assert_eq!(behaviors[0], Behavior::Vomit);
        assert_eq!(
            behaviors[1],
            Behavior::Damage {
                damage_type: "Poison".to_string(),
                amount: 2.5
            }
        );
        assert_eq!(
            behaviors[2],
            Behavior::Transition {
                disease: "zombie".to_string(),
                stage: 1
            }
        );
        let Behavior::StatusBatch { effects } = &behaviors[3] else {
            panic!("expected status batch");
        };
        assert!(effects[0].refresh);
    }
}
