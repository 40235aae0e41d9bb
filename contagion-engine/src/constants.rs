//! Centralized tuning constants for the disease engine.
//!
//! Values that a catalog or `EngineConfig` may override live here only as
//! defaults; everything else is fixed engine behaviour.

// Message keys -------------------------------------------------------------
pub(crate) const MSG_DISEASE_CURED: &str = "disease-cured";
pub(crate) const MSG_SYMPTOM_TREATED: &str = "disease-symptom-treated";
pub(crate) const MSG_STAGE_LOWERED: &str = "disease-stage-lowered";

// Status effect names ------------------------------------------------------
pub const STATUS_JITTER: &str = "Jitter";
pub const STATUS_FORCED_SLEEP: &str = "ForcedSleep";
pub const STATUS_STUTTER: &str = "Stutter";
/// Status the host reports while a carrier is asleep; feeds the sleep accumulator.
pub const STATUS_SLEEPING: &str = "Sleeping";

// Progression --------------------------------------------------------------
pub(crate) const DEFAULT_SEED: u64 = 0x00C0_FFEE;
pub(crate) const DEFAULT_TICK_INTERVAL_SECS: f64 = 2.0;
pub(crate) const DEFAULT_STAGE_SPEED_SCALAR: f64 = 0.1;
pub(crate) const DEFAULT_SENSATION_CHANCE: f64 = 0.05;
pub(crate) const FIRST_STAGE: u32 = 1;

// Personal protective equipment --------------------------------------------
pub(crate) const PPE_MASK_MULTIPLIER: f64 = 0.5;
pub(crate) const PPE_HEAD_MULTIPLIER: f64 = 0.75;
pub(crate) const PPE_INTERNALS_MULTIPLIER: f64 = 0.25;

// Residue ------------------------------------------------------------------
pub(crate) const RESIDUE_DECAY_PER_SECOND: f64 = 0.01;
pub(crate) const RESIDUE_CONTACT_REDUCTION: f64 = 0.1;
pub(crate) const RESIDUE_RANGE: f32 = 0.5;
pub(crate) const RESIDUE_TICK_INTERVAL_SECS: f64 = 2.0;
pub(crate) const RESIDUE_MAX_INTENSITY: f64 = 1.0;

// Clouds -------------------------------------------------------------------
pub(crate) const CLOUD_RANGE: f32 = 1.5;
pub(crate) const CLOUD_TICK_INTERVAL_SECS: f64 = 1.0;
pub(crate) const CLOUD_LIFETIME_SECS: f64 = 10.0;

// Roll stream domains --------------------------------------------------------
pub(crate) const DOMAIN_PROGRESSION: &str = "progression";
pub(crate) const DOMAIN_SYMPTOM: &str = "symptom";
pub(crate) const DOMAIN_CURE: &str = "cure";
pub(crate) const DOMAIN_INFECT: &str = "infect";
pub(crate) const DOMAIN_AIRBORNE: &str = "airborne";
