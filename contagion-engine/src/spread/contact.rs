//! Direct contact and blood transfer between two entities.
use crate::catalog::SpreadVector;
use crate::constants::FIRST_STAGE;
use crate::engine::DiseaseEngine;
use crate::host::{EntityId, Vitals};

use super::is_susceptible;

impl DiseaseEngine {
    /// Two-way contact: each side's contact-flagged diseases roll against the other.
    ///
    /// Returns the number of new infections.
    pub fn contact<H>(&mut self, host: &H, first: EntityId, second: EntityId) -> usize
    where
        H: Vitals + ?Sized,
    {
        if first == second {
            return 0;
        }
        // Snapshot both sides so a disease passed one way is not passed straight back.
        let outgoing = self.transfer_candidates(first, SpreadVector::Contact);
        let incoming = self.transfer_candidates(second, SpreadVector::Contact);
        self.roll_transfers(host, second, &outgoing) + self.roll_transfers(host, first, &incoming)
    }

    /// One-way transfer of blood-borne diseases from `source` into `target`.
    pub fn transfer_blood<H>(&mut self, host: &H, source: EntityId, target: EntityId) -> usize
    where
        H: Vitals + ?Sized,
    {
        if source == target {
            return 0;
        }
        let candidates = self.transfer_candidates(source, SpreadVector::Blood);
        self.roll_transfers(host, target, &candidates)
    }

    fn transfer_candidates(&self, source: EntityId, vector: SpreadVector) -> Vec<(String, f64)> {
        let Some(carrier) = self.carrier(source) else {
            return Vec::new();
        };
        carrier
            .diseases
            .keys()
            .filter_map(|id| self.catalog().disease(id))
            .filter(|def| def.spreads_by(vector))
            .map(|def| (def.id.clone(), def.contact.infect_chance))
            .collect()
    }

    fn roll_transfers<H>(
        &mut self,
        host: &H,
        target: EntityId,
        candidates: &[(String, f64)],
    ) -> usize
    where
        H: Vitals + ?Sized,
    {
        let mut infected = 0;
        for (disease, chance) in candidates {
            if !is_susceptible(self, host, target, disease) {
                continue;
            }
            if self.try_infect_with_chance(host, target, disease, *chance, FIRST_STAGE) {
                infected += 1;
            }
        }
        infected
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{DiseaseCatalog, DiseaseDef, StageDef};
    use crate::config::EngineConfig;
    use crate::host::Position;
    use crate::rng::Dice;
    use crate::sandbox::SandboxWorld;

    fn disease(id: &str, vector: SpreadVector) -> DiseaseDef {
        let mut def = DiseaseDef::new(id, id, vec![StageDef::new(1, Vec::new())]);
        def.spread.push(vector);
        def
    }

    fn engine(dice: Dice) -> DiseaseEngine {
        let catalog = DiseaseCatalog {
            diseases: vec![
                disease("cold", SpreadVector::Contact),
                disease("pox", SpreadVector::Blood),
            ],
            symptoms: Vec::new(),
        };
        DiseaseEngine::new(Arc::new(catalog), EngineConfig::default()).with_dice(dice)
    }

    #[test]
    fn contact_spreads_both_ways() {
        let mut world = SandboxWorld::new();
        let a = world.spawn_mob("a", Position::new(0.0, 0.0));
        let b = world.spawn_mob("b", Position::new(1.0, 0.0));
        let mut engine = engine(Dice::fixed(0.0));
        engine.infect(&world, a, "cold", 1);
        engine.infect(&world, b, "pox", 1);
        assert_eq!(engine.contact(&world, a, b), 1);
        assert!(engine.is_infected(b, "cold"));
        assert!(!engine.is_infected(a, "pox"));
    }

    #[test]
    fn blood_transfer_only_moves_blood_diseases() {
        let mut world = SandboxWorld::new();
        let a = world.spawn_mob("a", Position::new(0.0, 0.0));
        let b = world.spawn_mob("b", Position::new(1.0, 0.0));
        let mut engine = engine(Dice::fixed(0.0));
        engine.infect(&world, a, "cold", 1);
        engine.infect(&world, a, "pox", 1);
        assert_eq!(engine.transfer_blood(&world, a, b), 1);
        assert!(engine.is_infected(b, "pox"));
        assert!(!engine.is_infected(b, "cold"));
    }

    #[test]
    fn failing_rolls_transfer_nothing() {
        let mut world = SandboxWorld::new();
        let a = world.spawn_mob("a", Position::new(0.0, 0.0));
        let b = world.spawn_mob("b", Position::new(1.0, 0.0));
        let mut engine = engine(Dice::fixed(1.0));
        engine.infect(&world, a, "cold", 1);
        assert_eq!(engine.contact(&world, a, b), 0);
        assert!(engine.carrier(b).is_none());
    }
}
