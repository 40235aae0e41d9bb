//! Engine configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    CLOUD_LIFETIME_SECS, CLOUD_RANGE, CLOUD_TICK_INTERVAL_SECS, DEFAULT_SEED,
    DEFAULT_SENSATION_CHANCE, DEFAULT_STAGE_SPEED_SCALAR, DEFAULT_TICK_INTERVAL_SECS,
    PPE_HEAD_MULTIPLIER, PPE_INTERNALS_MULTIPLIER, PPE_MASK_MULTIPLIER, RESIDUE_CONTACT_REDUCTION,
    RESIDUE_DECAY_PER_SECOND, RESIDUE_RANGE, RESIDUE_TICK_INTERVAL_SECS,
};

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum EngineConfigError {
    #[error("config JSON is malformed: {0}")]
    Parse(String),
    #[error("{field} must be greater than zero (got {value:.3})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be between 0 and 1 (got {value:.3})")]
    RangeViolation { field: &'static str, value: f64 },
    #[error("{field} must not be negative (got {value:.3})")]
    Negative { field: &'static str, value: f64 },
}

/// Airborne protection multipliers applied per occupied slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpeConfig {
    #[serde(default = "PpeConfig::default_mask")]
    pub mask_multiplier: f64,
    #[serde(default = "PpeConfig::default_head")]
    pub head_multiplier: f64,
    #[serde(default = "PpeConfig::default_internals")]
    pub internals_multiplier: f64,
}

impl PpeConfig {
    const fn default_mask() -> f64 {
        PPE_MASK_MULTIPLIER
    }

    const fn default_head() -> f64 {
        PPE_HEAD_MULTIPLIER
    }

    const fn default_internals() -> f64 {
        PPE_INTERNALS_MULTIPLIER
    }
}

impl Default for PpeConfig {
    fn default() -> Self {
        Self {
            mask_multiplier: Self::default_mask(),
            head_multiplier: Self::default_head(),
            internals_multiplier: Self::default_internals(),
        }
    }
}

/// Surface contamination tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidueConfig {
    #[serde(default = "ResidueConfig::default_decay")]
    pub decay_per_second: f64,
    /// Intensity removed from a disease entry by each contact.
    #[serde(default = "ResidueConfig::default_contact_reduction")]
    pub contact_reduction: f64,
    /// Mobs this close to a contaminated surface count as touching it.
    #[serde(default = "ResidueConfig::default_range")]
    pub range: f32,
    #[serde(default = "ResidueConfig::default_tick_interval")]
    pub tick_interval_secs: f64,
}

impl ResidueConfig {
    const fn default_decay() -> f64 {
        RESIDUE_DECAY_PER_SECOND
    }

    const fn default_contact_reduction() -> f64 {
        RESIDUE_CONTACT_REDUCTION
    }

    const fn default_range() -> f32 {
        RESIDUE_RANGE
    }

    const fn default_tick_interval() -> f64 {
        RESIDUE_TICK_INTERVAL_SECS
    }
}

impl Default for ResidueConfig {
    fn default() -> Self {
        Self {
            decay_per_second: Self::default_decay(),
            contact_reduction: Self::default_contact_reduction(),
            range: Self::default_range(),
            tick_interval_secs: Self::default_tick_interval(),
        }
    }
}

/// Defaults for transient airborne clouds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "CloudConfig::default_range")]
    pub range: f32,
    #[serde(default = "CloudConfig::default_tick_interval")]
    pub tick_interval_secs: f64,
    #[serde(default = "CloudConfig::default_lifetime")]
    pub lifetime_secs: f64,
}

impl CloudConfig {
    const fn default_range() -> f32 {
        CLOUD_RANGE
    }

    const fn default_tick_interval() -> f64 {
        CLOUD_TICK_INTERVAL_SECS
    }

    const fn default_lifetime() -> f64 {
        CLOUD_LIFETIME_SECS
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            range: Self::default_range(),
            tick_interval_secs: Self::default_tick_interval(),
            lifetime_secs: Self::default_lifetime(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_seed")]
    pub seed: u64,
    #[serde(default = "EngineConfig::default_tick_interval")]
    pub tick_interval_secs: f64,
    #[serde(default = "EngineConfig::default_stage_speed_scalar")]
    pub stage_speed_scalar: f64,
    #[serde(default = "EngineConfig::default_sensation_chance")]
    pub sensation_chance: f64,
    #[serde(default)]
    pub ppe: PpeConfig,
    #[serde(default)]
    pub residue: ResidueConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
}

impl EngineConfig {
    const fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    const fn default_tick_interval() -> f64 {
        DEFAULT_TICK_INTERVAL_SECS
    }

    const fn default_stage_speed_scalar() -> f64 {
        DEFAULT_STAGE_SPEED_SCALAR
    }

    const fn default_sensation_chance() -> f64 {
        DEFAULT_SENSATION_CHANCE
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, EngineConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| EngineConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every configuration invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        positive("tick_interval_secs", self.tick_interval_secs)?;
        positive("residue.tick_interval_secs", self.residue.tick_interval_secs)?;
        positive("cloud.tick_interval_secs", self.cloud.tick_interval_secs)?;
        non_negative("stage_speed_scalar", self.stage_speed_scalar)?;
        non_negative("residue.decay_per_second", self.residue.decay_per_second)?;
        non_negative("residue.contact_reduction", self.residue.contact_reduction)?;
        non_negative("residue.range", f64::from(self.residue.range))?;
        non_negative("cloud.range", f64::from(self.cloud.range))?;
        non_negative("cloud.lifetime_secs", self.cloud.lifetime_secs)?;
        unit("sensation_chance", self.sensation_chance)?;
        unit("ppe.mask_multiplier", self.ppe.mask_multiplier)?;
        unit("ppe.head_multiplier", self.ppe.head_multiplier)?;
        unit("ppe.internals_multiplier", self.ppe.internals_multiplier)?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: Self::default_seed(),
            tick_interval_secs: Self::default_tick_interval(),
            stage_speed_scalar: Self::default_stage_speed_scalar(),
            sensation_chance: Self::default_sensation_chance(),
            ppe: PpeConfig::default(),
            residue: ResidueConfig::default(),
            cloud: CloudConfig::default(),
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), EngineConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), EngineConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineConfigError::Negative { field, value })
    }
}

fn unit(field: &'static str, value: f64) -> Result<(), EngineConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineConfigError::RangeViolation { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = EngineConfig::from_json("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert!((cfg.tick_interval_secs - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = EngineConfig::from_json(r#"{ "ppe": { "mask_multiplier": 0.3 } }"#).unwrap();
        assert!((cfg.ppe.mask_multiplier - 0.3).abs() < f64::EPSILON);
        assert!((cfg.ppe.head_multiplier - PPE_HEAD_MULTIPLIER).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let err = EngineConfig::from_json(r#"{ "tick_interval_secs": 0 }"#).unwrap_err();
        assert_eq!(
            err,
            EngineConfigError::NotPositive {
                field: "tick_interval_secs",
                value: 0.0
            }
        );
    }

    #[test]
    fn rejects_multiplier_above_one() {
        let mut cfg = EngineConfig::default();
        cfg.ppe.internals_multiplier = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(EngineConfigError::RangeViolation {
                field: "ppe.internals_multiplier",
                ..
            })
        ));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            EngineConfig::from_json("[1,2"),
            Err(EngineConfigError::Parse(_))
        ));
    }
}
