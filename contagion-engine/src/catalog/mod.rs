//! Immutable disease, symptom and cure-step definitions.
//!
//! The catalog is loaded once (bundled JSON or a caller-provided document)
//! and shared read-only by every engine component through
//! [`DiseaseCatalog::disease`] and [`DiseaseCatalog::symptom`].

pub mod cure;
pub mod disease;
pub mod symptom;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use thiserror::Error;

pub use cure::{CureCondition, CureStep};
pub use disease::{
    AirborneSpread, ContactSpread, DiseaseDef, SpreadVector, SpreadVectors, StageDef, StealthFlag,
    StealthFlags, SymptomRef,
};
pub use symptom::{AirborneBurst, Behavior, CloudBurst, SymptomDef, TimedStatus};

const DEFAULT_CATALOG_DATA: &str = include_str!("../../assets/catalog.json");

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("disease `{id}` is defined more than once")]
    DuplicateDisease { id: String },
    #[error("symptom `{id}` is defined more than once")]
    DuplicateSymptom { id: String },
    #[error("disease `{disease}` has no stages")]
    NoStages { disease: String },
    #[error("disease `{disease}` stage slot {index} declares stage {found} (expected {expected})")]
    StageOrder {
        disease: String,
        index: usize,
        found: u32,
        expected: u32,
    },
    #[error("{owner}: {field} must be between 0 and 1 (got {value})")]
    Probability {
        owner: String,
        field: &'static str,
        value: f64,
    },
    #[error("disease `{disease}` stage {stage} references unknown symptom `{symptom}`")]
    UnknownSymptom {
        disease: String,
        stage: u32,
        symptom: String,
    },
    #[error("symptom `{symptom}` transitions to unknown disease `{disease}`")]
    UnknownTransition { symptom: String, disease: String },
    #[error("definition `{disease}` belongs to a shared catalog and cannot be changed in place")]
    SharedCatalog { disease: String },
}

/// The full set of definitions the engine resolves ids against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiseaseCatalog {
    #[serde(default)]
    pub diseases: Vec<DiseaseDef>,
    #[serde(default)]
    pub symptoms: Vec<SymptomDef>,
}

impl DiseaseCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_CATALOG_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<DiseaseCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates a catalog invariant.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    #[must_use]
    pub fn disease(&self, id: &str) -> Option<&DiseaseDef> {
        self.diseases.iter().find(|disease| disease.id == id)
    }

    #[must_use]
    pub fn symptom(&self, id: &str) -> Option<&SymptomDef> {
        self.symptoms.iter().find(|symptom| symptom.id == id)
    }

    /// Insert or replace a disease definition.
    pub fn upsert_disease(&mut self, def: DiseaseDef) {
        if let Some(slot) = self.diseases.iter_mut().find(|d| d.id == def.id) {
            *slot = def;
        } else {
            self.diseases.push(def);
        }
    }

    /// Insert or replace a symptom definition.
    pub fn upsert_symptom(&mut self, def: SymptomDef) {
        if let Some(slot) = self.symptoms.iter_mut().find(|s| s.id == def.id) {
            *slot = def;
        } else {
            self.symptoms.push(def);
        }
    }

    /// Check every structural invariant of the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for symptom in &self.symptoms {
            if !seen.insert(symptom.id.as_str()) {
                return Err(CatalogError::DuplicateSymptom {
                    id: symptom.id.clone(),
                });
            }
            check_probability(&symptom.id, "probability", symptom.probability)?;
            for step in &symptom.cures {
                check_probability(&symptom.id, "cure chance", step.chance)?;
            }
            for behavior in &symptom.behaviors {
                match behavior {
                    Behavior::Transition { disease, .. } if self.disease(disease).is_none() => {
                        return Err(CatalogError::UnknownTransition {
                            symptom: symptom.id.clone(),
                            disease: disease.clone(),
                        });
                    }
                    Behavior::ForcedSleep { chance, .. } => {
                        check_probability(&symptom.id, "forced sleep chance", *chance)?;
                    }
                    _ => {}
                }
            }
        }

        let mut seen = BTreeSet::new();
        for disease in &self.diseases {
            if !seen.insert(disease.id.as_str()) {
                return Err(CatalogError::DuplicateDisease {
                    id: disease.id.clone(),
                });
            }
            self.validate_disease(disease)?;
        }
        Ok(())
    }

    fn validate_disease(&self, disease: &DiseaseDef) -> Result<(), CatalogError> {
        if disease.stages.is_empty() {
            return Err(CatalogError::NoStages {
                disease: disease.id.clone(),
            });
        }
        check_probability(&disease.id, "post_cure_immunity", disease.post_cure_immunity)?;
        check_probability(&disease.id, "contact.infect_chance", disease.contact.infect_chance)?;
        check_probability(
            &disease.id,
            "airborne.infect_chance",
            disease.airborne.infect_chance,
        )?;
        check_probability(&disease.id, "airborne.tick_chance", disease.airborne.tick_chance)?;
        for step in &disease.cures {
            check_probability(&disease.id, "cure chance", step.chance)?;
        }
        for (index, stage) in disease.stages.iter().enumerate() {
            let expected = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if stage.stage != expected {
                return Err(CatalogError::StageOrder {
                    disease: disease.id.clone(),
                    index,
                    found: stage.stage,
                    expected,
                });
            }
            if let Some(chance) = stage.sensation_chance {
                check_probability(&disease.id, "sensation_chance", chance)?;
            }
            for step in &stage.cures {
                check_probability(&disease.id, "cure chance", step.chance)?;
            }
            for slot in &stage.symptoms {
                if self.symptom(&slot.id).is_none() {
                    return Err(CatalogError::UnknownSymptom {
                        disease: disease.id.clone(),
                        stage: stage.stage,
                        symptom: slot.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_probability(owner: &str, field: &'static str, value: f64) -> Result<(), CatalogError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CatalogError::Probability {
            owner: owner.to_string(),
            field,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_loads_and_validates() {
        let catalog = DiseaseCatalog::default_catalog();
        assert!(!catalog.diseases.is_empty());
        assert!(!catalog.symptoms.is_empty());
        catalog.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_order_stages() {
        let json = r#"{
            "diseases": [
                { "id": "bad", "name": "Bad", "stages": [ { "stage": 2 } ] }
            ]
        }"#;
        let err = DiseaseCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::StageOrder { found: 2, .. }));
    }

    #[test]
    fn rejects_unknown_symptom_reference() {
        let json = r#"{
            "diseases": [
                { "id": "d", "name": "D", "stages": [ { "stage": 1, "symptoms": [ { "id": "nope" } ] } ] }
            ]
        }"#;
        let err = DiseaseCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownSymptom { .. }));
    }

    #[test]
    fn rejects_duplicate_disease_and_bad_probability() {
        let dup = r#"{
            "diseases": [
                { "id": "d", "name": "D", "stages": [ { "stage": 1 } ] },
                { "id": "d", "name": "D2", "stages": [ { "stage": 1 } ] }
            ]
        }"#;
        assert!(matches!(
            DiseaseCatalog::from_json(dup).unwrap_err(),
            CatalogError::DuplicateDisease { .. }
        ));
        let bad = r#"{
            "diseases": [
                { "id": "d", "name": "D", "post_cure_immunity": 1.5, "stages": [ { "stage": 1 } ] }
            ]
        }"#;
        assert!(matches!(
            DiseaseCatalog::from_json(bad).unwrap_err(),
            CatalogError::Probability { field: "post_cure_immunity", .. }
        ));
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        assert!(matches!(
            DiseaseCatalog::from_json("{ not json").unwrap_err(),
            CatalogError::Parse(_)
        ));
    }

    #[test]
    fn upsert_replaces_existing_definition() {
        let mut catalog = DiseaseCatalog::default();
        catalog.upsert_disease(DiseaseDef::new("d", "First", vec![StageDef::new(1, vec![])]));
        catalog.upsert_disease(DiseaseDef::new("d", "Second", vec![StageDef::new(1, vec![])]));
        assert_eq!(catalog.diseases.len(), 1);
        assert_eq!(catalog.disease("d").map(|d| d.name.as_str()), Some("Second"));
    }
}
