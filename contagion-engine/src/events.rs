//! Records of what the engine did, for callers that narrate or replicate it.
use serde::{Deserialize, Serialize};

use crate::host::EntityId;
use crate::spread::cloud::CloudId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiseaseEvent {
    Infected {
        entity: EntityId,
        disease: String,
        stage: u32,
    },
    /// An infection roll succeeded but the target's immunity held.
    InfectionBlocked { entity: EntityId, disease: String },
    StageAdvanced {
        entity: EntityId,
        disease: String,
        stage: u32,
    },
    StageLowered {
        entity: EntityId,
        disease: String,
        stage: u32,
    },
    SymptomFired {
        entity: EntityId,
        disease: String,
        symptom: String,
    },
    SymptomTreated {
        entity: EntityId,
        disease: String,
        symptom: String,
        until: f64,
    },
    Cured { entity: EntityId, disease: String },
    Vaccinated { entity: EntityId, disease: String },
    Transitioned {
        entity: EntityId,
        from: String,
        to: String,
    },
    /// A stale catalog reference was dropped from a carrier.
    DroppedUnknown { entity: EntityId, disease: String },
    ResidueCleared { surface: EntityId },
    CloudSpawned { cloud: CloudId },
    CloudExpired { cloud: CloudId },
}

impl DiseaseEvent {
    /// The entity the event concerns, when there is one.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Infected { entity, .. }
            | Self::InfectionBlocked { entity, .. }
            | Self::StageAdvanced { entity, .. }
            | Self::StageLowered { entity, .. }
            | Self::SymptomFired { entity, .. }
            | Self::SymptomTreated { entity, .. }
            | Self::Cured { entity, .. }
            | Self::Vaccinated { entity, .. }
            | Self::Transitioned { entity, .. }
            | Self::DroppedUnknown { entity, .. } => Some(*entity),
            Self::ResidueCleared { surface } => Some(*surface),
            Self::CloudSpawned { .. } | Self::CloudExpired { .. } => None,
        }
    }
}

/// Counts for one call to `DiseaseEngine::update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: u64,
    pub carriers_ticked: usize,
    pub infections: usize,
    pub blocked: usize,
    pub stage_changes: usize,
    pub symptoms_fired: usize,
    pub cures: usize,
    pub clouds_expired: usize,
    pub residues_cleared: usize,
}

impl TickSummary {
    pub(crate) fn tally(&mut self, events: &[DiseaseEvent]) {
        for event in events {
            match event {
                DiseaseEvent::Infected { .. } => self.infections += 1,
                DiseaseEvent::InfectionBlocked { .. } => self.blocked += 1,
                DiseaseEvent::StageAdvanced { .. } | DiseaseEvent::StageLowered { .. } => {
                    self.stage_changes += 1;
                }
                DiseaseEvent::SymptomFired { .. } => self.symptoms_fired += 1,
                DiseaseEvent::Cured { .. } => self.cures += 1,
                DiseaseEvent::CloudExpired { .. } => self.clouds_expired += 1,
                DiseaseEvent::ResidueCleared { .. } => self.residues_cleared += 1,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_by_kind() {
        let e = EntityId::new(1);
        let events = vec![
            DiseaseEvent::Infected {
                entity: e,
                disease: "flu".into(),
                stage: 1,
            },
            DiseaseEvent::StageAdvanced {
                entity: e,
                disease: "flu".into(),
                stage: 2,
            },
            DiseaseEvent::Cured {
                entity: e,
                disease: "flu".into(),
            },
            DiseaseEvent::CloudExpired {
                cloud: CloudId::new(3),
            },
        ];
        let mut summary = TickSummary::default();
        summary.tally(&events);
        assert_eq!(summary.infections, 1);
        assert_eq!(summary.stage_changes, 1);
        assert_eq!(summary.cures, 1);
        assert_eq!(summary.clouds_expired, 1);
        assert_eq!(events[3].entity(), None);
    }
}
