//! Surface contamination left behind by carriers.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ResidueConfig;
use crate::constants::{FIRST_STAGE, RESIDUE_MAX_INTENSITY};
use crate::engine::DiseaseEngine;
use crate::events::DiseaseEvent;
use crate::host::{EntityId, Host, Vitals};
use crate::numbers::clamp_probability;

use super::is_susceptible;

/// Contamination record attached to one surface entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residue {
    /// Disease id to intensity in `(0, 1]`; entries at zero are removed.
    pub diseases: BTreeMap<String, f64>,
    pub decay_per_second: f64,
    pub contact_reduction: f64,
    pub range: f32,
    pub tick_interval_secs: f64,
    pub next_tick: f64,
    pub last_decay: f64,
}

impl Residue {
    fn new(config: &ResidueConfig, now: f64) -> Self {
        Self {
            diseases: BTreeMap::new(),
            decay_per_second: config.decay_per_second,
            contact_reduction: config.contact_reduction,
            range: config.range,
            tick_interval_secs: config.tick_interval_secs,
            next_tick: now + config.tick_interval_secs,
            last_decay: now,
        }
    }

    #[must_use]
    pub fn intensity(&self, disease: &str) -> f64 {
        self.diseases.get(disease).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }

    fn deposit(&mut self, disease: &str, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        let entry = self.diseases.entry(disease.to_string()).or_insert(0.0);
        *entry = (*entry + amount).min(RESIDUE_MAX_INTENSITY);
    }

    /// Lower one entry, dropping it once it reaches zero.
    fn reduce(&mut self, disease: &str, amount: f64) {
        if let Some(intensity) = self.diseases.get_mut(disease) {
            *intensity -= amount.max(0.0);
            if *intensity <= 0.0 {
                self.diseases.remove(disease);
            }
        }
    }

    fn decay(&mut self, elapsed: f64) {
        let loss = self.decay_per_second * elapsed.max(0.0);
        if loss <= 0.0 {
            return;
        }
        for intensity in self.diseases.values_mut() {
            *intensity -= loss;
        }
        self.diseases.retain(|_, intensity| *intensity > 0.0);
    }
}

impl DiseaseEngine {
    #[must_use]
    pub fn residue(&self, surface: EntityId) -> Option<&Residue> {
        self.residues.get(&surface)
    }

    pub fn residues(&self) -> impl Iterator<Item = (EntityId, &Residue)> {
        self.residues.iter().map(|(id, residue)| (*id, residue))
    }

    /// Add `intensity` of `disease` to a surface directly, capped at 1.0.
    ///
    /// Non-positive intensities leave the surface untouched.
    pub fn contaminate(&mut self, surface: EntityId, disease: &str, intensity: f64) {
        if intensity.is_nan() || intensity <= 0.0 {
            return;
        }
        let now = self.now();
        let config = self.config().residue.clone();
        self.residues
            .entry(surface)
            .or_insert_with(|| Residue::new(&config, now))
            .deposit(disease, intensity);
    }

    /// A mob touches a surface: existing residue rolls against the mob, then
    /// the diseases the mob already carried are deposited.
    ///
    /// Returns the number of new infections.
    pub fn touch_surface<H>(&mut self, host: &H, mob: EntityId, surface: EntityId) -> usize
    where
        H: Vitals + ?Sized,
    {
        if mob == surface {
            return 0;
        }
        let deposits: Vec<(String, f64)> = self
            .carrier(mob)
            .map(|carrier| {
                carrier
                    .diseases
                    .keys()
                    .filter_map(|id| self.catalog().disease(id))
                    .map(|def| (def.id.clone(), def.contact.deposit))
                    .filter(|(_, amount)| *amount > 0.0)
                    .collect()
            })
            .unwrap_or_default();
        let infected = expose(self, host, mob, surface);
        for (disease, amount) in deposits {
            self.contaminate(surface, &disease, amount);
        }
        infected
    }
}

/// Roll every disease in a surface's residue against one mob.
fn expose<V>(engine: &mut DiseaseEngine, host: &V, mob: EntityId, surface: EntityId) -> usize
where
    V: Vitals + ?Sized,
{
    let Some(residue) = engine.residues.get(&surface) else {
        return 0;
    };
    let entries: Vec<(String, f64)> = residue
        .diseases
        .iter()
        .map(|(id, intensity)| (id.clone(), *intensity))
        .collect();
    let reduction = residue.contact_reduction;
    let catalog = engine.catalog_handle();

    let mut infected = 0;
    for (disease, intensity) in entries {
        let Some(def) = catalog.disease(&disease) else {
            continue;
        };
        if !is_susceptible(engine, host, mob, &disease) {
            continue;
        }
        let probability = clamp_probability(def.contact.infect_chance * intensity);
        if engine.try_infect_with_chance(host, mob, &disease, probability, FIRST_STAGE) {
            infected += 1;
        }
        if let Some(residue) = engine.residues.get_mut(&surface) {
            residue.reduce(&disease, reduction);
        }
    }
    clear_if_empty(engine, surface);
    infected
}

fn clear_if_empty(engine: &mut DiseaseEngine, surface: EntityId) {
    if engine.residues.get(&surface).is_some_and(Residue::is_empty) {
        engine.residues.remove(&surface);
        engine.push_event(DiseaseEvent::ResidueCleared { surface });
    }
}

/// Decay due residues and expose live mobs standing near them.
pub(crate) fn update<H>(engine: &mut DiseaseEngine, host: &mut H)
where
    H: Host + ?Sized,
{
    let now = engine.now();
    let due: Vec<EntityId> = engine
        .residues
        .iter()
        .filter(|(_, residue)| residue.next_tick <= now)
        .map(|(id, _)| *id)
        .collect();
    for surface in due {
        let Some(residue) = engine.residues.get_mut(&surface) else {
            continue;
        };
        residue.decay(now - residue.last_decay);
        residue.last_decay = now;
        residue.next_tick = now + residue.tick_interval_secs;
        let range = residue.range;
        if residue.is_empty() {
            clear_if_empty(engine, surface);
            continue;
        }
        let Some(origin) = host.position(surface) else {
            continue;
        };
        for mob in host.entities_in_range(origin, range) {
            if mob == surface || !engine.residues.contains_key(&surface) {
                continue;
            }
            expose(engine, &*host, mob, surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{DiseaseCatalog, DiseaseDef, SpreadVector, StageDef};
    use crate::config::EngineConfig;
    use crate::host::Position;
    use crate::rng::Dice;
    use crate::sandbox::SandboxWorld;

    fn engine(dice: Dice) -> DiseaseEngine {
        let mut def = DiseaseDef::new("cold", "Cold", vec![StageDef::new(1, Vec::new())]);
        def.spread.push(SpreadVector::Contact);
        def.contact.deposit = 0.3;
        let catalog = DiseaseCatalog {
            diseases: vec![def],
            symptoms: Vec::new(),
        };
        DiseaseEngine::new(Arc::new(catalog), EngineConfig::default()).with_dice(dice)
    }

    #[test]
    fn deposits_accumulate_and_cap() {
        let mut world = SandboxWorld::new();
        let mob = world.spawn_mob("kim", Position::new(0.0, 0.0));
        let table = world.spawn_surface("table", Position::new(0.0, 0.0));
        let mut engine = engine(Dice::fixed(1.0));
        engine.infect(&world, mob, "cold", 1);
        for _ in 0..5 {
            engine.touch_surface(&world, mob, table);
        }
        let residue = engine.residue(table).unwrap();
        assert!((residue.intensity("cold") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decay_removes_entry_and_record() {
        let mut world = SandboxWorld::new();
        let table = world.spawn_surface("table", Position::new(0.0, 0.0));
        let mut engine = engine(Dice::fixed(1.0));
        engine.contaminate(table, "cold", 0.03);
        engine.update(&mut world, 2.0);
        let left = engine.residue(table).unwrap().intensity("cold");
        assert!((left - 0.01).abs() < 1e-9);
        let summary = engine.update(&mut world, 4.0);
        assert_eq!(summary.residues_cleared, 1);
        assert!(engine.residue(table).is_none());
    }

    #[test]
    fn empty_contamination_creates_no_record() {
        let mut world = SandboxWorld::new();
        let table = world.spawn_surface("table", Position::new(0.0, 0.0));
        let mut engine = engine(Dice::fixed(1.0));
        engine.contaminate(table, "cold", 0.0);
        engine.contaminate(table, "cold", -0.5);
        assert!(engine.residue(table).is_none());
        assert_eq!(engine.residues().count(), 0);
        assert_eq!(engine.update(&mut world, 2.0).residues_cleared, 0);
    }

    #[test]
    fn attempted_contact_reduces_intensity_even_on_a_miss() {
        let mut world = SandboxWorld::new();
        let mob = world.spawn_mob("lee", Position::new(0.0, 0.0));
        let table = world.spawn_surface("table", Position::new(0.0, 0.0));
        let mut engine = engine(Dice::fixed(1.0));
        engine.contaminate(table, "cold", 0.5);
        assert_eq!(engine.touch_surface(&world, mob, table), 0);
        let left = engine.residue(table).unwrap().intensity("cold");
        assert!((left - 0.4).abs() < 1e-9);
    }

    #[test]
    fn nearby_mobs_are_exposed_on_residue_ticks() {
        let mut world = SandboxWorld::new();
        let table = world.spawn_surface("table", Position::new(0.0, 0.0));
        let near = world.spawn_mob("near", Position::new(0.4, 0.0));
        let far = world.spawn_mob("far", Position::new(3.0, 0.0));
        let mut engine = engine(Dice::fixed(0.0));
        engine.contaminate(table, "cold", 0.8);
        engine.update(&mut world, 2.0);
        assert!(engine.is_infected(near, "cold"));
        assert!(!engine.is_infected(far, "cold"));
    }
}
