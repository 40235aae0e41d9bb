//! Progression engine: the scheduler every other disease component hangs off.
//!
//! A [`DiseaseEngine`] owns per-entity [`CarrierState`] records plus the
//! residue and cloud instances created by the spread vectors. Callers drive
//! it with [`DiseaseEngine::update`] and hand in a [`Host`] that provides the
//! surrounding world; the engine never talks to the world any other way.

pub(crate) mod cure;
pub(crate) mod symptoms;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::carrier::CarrierState;
use crate::catalog::{CatalogError, DiseaseCatalog, DiseaseDef};
use crate::config::EngineConfig;
use crate::constants::{DOMAIN_INFECT, DOMAIN_PROGRESSION, DOMAIN_SYMPTOM, FIRST_STAGE};
use crate::events::{DiseaseEvent, TickSummary};
use crate::host::{EntityId, Host, Vitals};
use crate::numbers::clamp_probability;
use crate::report::{SampleEntry, SampleRecord};
use crate::rng::{Dice, RollStream};
use crate::spread::airborne;
use crate::spread::cloud::{Cloud, CloudId};
use crate::spread::residue::{self, Residue};

/// Tick-driven disease simulation over a shared, read-only catalog.
///
/// Events accumulate until the host calls [`DiseaseEngine::drain_events`];
/// long-running hosts are expected to drain after every update.
#[derive(Debug, Clone)]
pub struct DiseaseEngine {
    catalog: Arc<DiseaseCatalog>,
    config: EngineConfig,
    dice: Dice,
    carriers: BTreeMap<EntityId, CarrierState>,
    pub(crate) residues: BTreeMap<EntityId, Residue>,
    pub(crate) clouds: BTreeMap<CloudId, Cloud>,
    next_cloud: u64,
    now: f64,
    tick: u64,
    draws: BTreeMap<EntityId, u64>,
    dirty: BTreeSet<EntityId>,
    events: Vec<DiseaseEvent>,
}

impl DiseaseEngine {
    #[must_use]
    pub fn new(catalog: Arc<DiseaseCatalog>, config: EngineConfig) -> Self {
        let dice = Dice::seeded(config.seed);
        Self {
            catalog,
            config,
            dice,
            carriers: BTreeMap::new(),
            residues: BTreeMap::new(),
            clouds: BTreeMap::new(),
            next_cloud: 1,
            now: 0.0,
            tick: 0,
            draws: BTreeMap::new(),
            dirty: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// Engine over the bundled catalog with default tuning.
    #[must_use]
    pub fn with_default_catalog() -> Self {
        Self::new(
            Arc::new(DiseaseCatalog::default_catalog().clone()),
            EngineConfig::default(),
        )
    }

    /// Replace the roll source, e.g. with [`Dice::fixed`] to force outcomes.
    #[must_use]
    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &DiseaseCatalog {
        &self.catalog
    }

    /// Shared handle to the catalog.
    #[must_use]
    pub fn catalog_handle(&self) -> Arc<DiseaseCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Simulation time of the latest `update`.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn carrier(&self, entity: EntityId) -> Option<&CarrierState> {
        self.carriers.get(&entity)
    }

    pub fn carriers(&self) -> impl Iterator<Item = (EntityId, &CarrierState)> {
        self.carriers.iter().map(|(id, state)| (*id, state))
    }

    #[must_use]
    pub fn stage(&self, entity: EntityId, disease: &str) -> Option<u32> {
        self.carriers.get(&entity)?.stage(disease)
    }

    #[must_use]
    pub fn is_infected(&self, entity: EntityId, disease: &str) -> bool {
        self.stage(entity, disease).is_some()
    }

    #[must_use]
    pub fn immunity(&self, entity: EntityId, disease: &str) -> f64 {
        self.carriers
            .get(&entity)
            .map_or(0.0, |state| state.immunity(disease))
    }

    /// Replace a disease definition in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SharedCatalog`] while any other handle to the
    /// catalog is alive; shared definitions are never changed in place.
    pub fn replace_disease(&mut self, def: DiseaseDef) -> Result<(), CatalogError> {
        let Some(catalog) = Arc::get_mut(&mut self.catalog) else {
            log::error!(
                "refusing to replace disease `{}`: catalog is shared",
                def.id
            );
            return Err(CatalogError::SharedCatalog { disease: def.id });
        };
        catalog.upsert_disease(def);
        Ok(())
    }

    /// Entities whose replicated fields changed since the last call.
    pub fn take_dirty(&mut self) -> BTreeSet<EntityId> {
        std::mem::take(&mut self.dirty)
    }

    /// Take every event buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<DiseaseEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn events(&self) -> &[DiseaseEvent] {
        &self.events
    }

    /// Snapshot of an entity's active diseases for diagnostic reports.
    #[must_use]
    pub fn sample(&self, entity: EntityId, subject: Option<String>) -> SampleRecord {
        let diseases = self
            .carriers
            .get(&entity)
            .map(|state| {
                state
                    .diseases
                    .iter()
                    .map(|(disease, stage)| SampleEntry::new(disease.clone(), *stage))
                    .collect()
            })
            .unwrap_or_default();
        SampleRecord { subject, diseases }
    }

    /// Add `disease` to `target` at `start_stage`.
    ///
    /// Re-infecting an active disease leaves its stage and incubation alone but
    /// restarts the infection clock, cure timers and sleep accumulator.
    pub fn infect<H>(&mut self, host: &H, target: EntityId, disease: &str, start_stage: u32) -> bool
    where
        H: Vitals + ?Sized,
    {
        let Some(def) = self.catalog.disease(disease) else {
            log::debug!("infect {target}: unknown disease `{disease}`");
            return false;
        };
        if !host.can_carry(target) {
            return false;
        }
        let stage = start_stage.clamp(FIRST_STAGE, def.max_stage());
        let incubation = def.incubation_secs;
        let now = self.now;
        let interval = self.config.tick_interval_secs;

        let carrier = self.carriers.entry(target).or_default();
        let fresh = !carrier.is_infected(disease);
        if fresh {
            carrier.diseases.insert(disease.to_string(), stage);
            carrier.start_incubation(disease, now, incubation);
        }
        carrier.begin_infection(disease, now);
        if carrier.next_tick.is_none() {
            carrier.next_tick = Some(now + interval);
        }
        self.dirty.insert(target);
        if fresh {
            self.events.push(DiseaseEvent::Infected {
                entity: target,
                disease: disease.to_string(),
                stage,
            });
        }
        true
    }

    /// Roll `probability`, then the target's immunity, then [`Self::infect`].
    pub fn try_infect_with_chance<H>(
        &mut self,
        host: &H,
        target: EntityId,
        disease: &str,
        probability: f64,
        start_stage: u32,
    ) -> bool
    where
        H: Vitals + ?Sized,
    {
        if self.catalog.disease(disease).is_none()
            || !host.can_carry(target)
            || !host.is_alive(target)
        {
            return false;
        }
        let mut roll = self.stream(target, DOMAIN_INFECT);
        if !roll.chance(probability) {
            return false;
        }
        let immunity = self.immunity(target, disease);
        if roll.chance(immunity) {
            self.events.push(DiseaseEvent::InfectionBlocked {
                entity: target,
                disease: disease.to_string(),
            });
            return false;
        }
        self.infect(host, target, disease, start_stage)
    }

    /// Cure `disease` if active and grant its post-cure immunity either way.
    pub fn vaccinate<H>(&mut self, host: &mut H, target: EntityId, disease: &str) -> bool
    where
        H: Host + ?Sized,
    {
        let catalog = Arc::clone(&self.catalog);
        let Some(def) = catalog.disease(disease) else {
            return false;
        };
        if !host.can_carry(target) {
            return false;
        }
        if self.is_infected(target, disease) {
            self.cure_disease(host, target, def);
        } else {
            self.carriers
                .entry(target)
                .or_default()
                .raise_immunity(disease, def.post_cure_immunity);
            self.dirty.insert(target);
        }
        self.events.push(DiseaseEvent::Vaccinated {
            entity: target,
            disease: disease.to_string(),
        });
        true
    }

    /// Fire `symptom` on `carrier` outside the normal tick roll.
    ///
    /// Does nothing and returns `false` unless `carrier` has `disease` active.
    pub fn trigger_symptom<H>(
        &mut self,
        host: &mut H,
        carrier: EntityId,
        disease: &str,
        symptom: &str,
    ) -> bool
    where
        H: Host + ?Sized,
    {
        let catalog = Arc::clone(&self.catalog);
        let (Some(def), Some(symptom)) = (catalog.disease(disease), catalog.symptom(symptom))
        else {
            return false;
        };
        symptoms::trigger_symptom(self, host, carrier, def, symptom)
    }

    /// Run the cure evaluator for one active disease.
    pub fn trigger_cure_steps<H>(&mut self, host: &mut H, carrier: EntityId, disease: &str)
    where
        H: Host + ?Sized,
    {
        let catalog = Arc::clone(&self.catalog);
        if let Some(def) = catalog.disease(disease) {
            cure::trigger_cure_steps(self, host, carrier, def);
        }
    }

    /// Advance the simulation clock to `now` and process everything that is due.
    pub fn update<H>(&mut self, host: &mut H, now: f64) -> TickSummary
    where
        H: Host + ?Sized,
    {
        self.now = self.now.max(now);
        self.tick = self.tick.saturating_add(1);
        self.draws.clear();
        let first_event = self.events.len();

        let due: Vec<EntityId> = self
            .carriers
            .iter()
            .filter(|(_, state)| state.next_tick.is_some_and(|at| at <= self.now))
            .map(|(id, _)| *id)
            .collect();
        for entity in &due {
            self.tick_carrier(host, *entity);
        }

        residue::update(self, host);
        crate::spread::cloud::update(self, host);

        let mut summary = TickSummary {
            tick: self.tick,
            carriers_ticked: due.len(),
            ..TickSummary::default()
        };
        summary.tally(&self.events[first_event..]);
        summary
    }

    fn tick_carrier<H>(&mut self, host: &mut H, entity: EntityId)
    where
        H: Host + ?Sized,
    {
        let now = self.now;
        let interval = self.config.tick_interval_secs;
        let asleep = host.has_status(entity, crate::constants::STATUS_SLEEPING);
        let Some(carrier) = self.carriers.get_mut(&entity) else {
            return;
        };
        if !carrier.has_any_disease() {
            carrier.next_tick = None;
            return;
        }
        carrier.next_tick = Some(now + interval);
        if asleep {
            carrier.add_sleep(interval);
        }
        if carrier.prune_suppressions(now) > 0 {
            self.dirty.insert(entity);
        }
        carrier.prune_dormancy(now);
        let active: Vec<String> = carrier.diseases.keys().cloned().collect();

        let catalog = Arc::clone(&self.catalog);
        for disease in active {
            let Some(stage) = self.stage(entity, &disease) else {
                continue;
            };
            let Some(def) = catalog.disease(&disease).filter(|def| def.stage(stage).is_some())
            else {
                self.drop_unknown(entity, &disease);
                continue;
            };
            let dormant = self
                .carriers
                .get(&entity)
                .is_some_and(|state| state.is_dormant(&disease, now));
            if !dormant {
                self.roll_stage_advance(entity, def);
                symptoms::roll_stage_symptoms(self, host, entity, def);
                symptoms::roll_sensation(self, host, entity, def);
                airborne::tick(self, host, entity, def);
            }
            cure::trigger_cure_steps(self, host, entity, def);
        }

        if let Some(carrier) = self.carriers.get_mut(&entity) {
            if !carrier.has_any_disease() {
                carrier.next_tick = None;
            }
        }
    }

    fn roll_stage_advance(&mut self, entity: EntityId, def: &DiseaseDef) {
        let probability = clamp_probability(def.stage_speed * self.config.stage_speed_scalar);
        let mut roll = self.stream(entity, DOMAIN_PROGRESSION);
        if !roll.chance(probability) {
            return;
        }
        let Some(carrier) = self.carriers.get_mut(&entity) else {
            return;
        };
        let Some(stage) = carrier.diseases.get_mut(&def.id) else {
            return;
        };
        if *stage >= def.max_stage() {
            return;
        }
        *stage += 1;
        let stage = *stage;
        self.dirty.insert(entity);
        self.events.push(DiseaseEvent::StageAdvanced {
            entity,
            disease: def.id.clone(),
            stage,
        });
    }

    fn drop_unknown(&mut self, entity: EntityId, disease: &str) {
        log::debug!("dropping unknown disease `{disease}` from {entity}");
        if let Some(carrier) = self.carriers.get_mut(&entity) {
            carrier.clear_disease(disease);
        }
        self.dirty.insert(entity);
        self.events.push(DiseaseEvent::DroppedUnknown {
            entity,
            disease: disease.to_string(),
        });
    }

    /// Remove an active disease, grant immunity and roll back attached components.
    pub(crate) fn cure_disease<H>(&mut self, host: &mut H, entity: EntityId, def: &DiseaseDef)
    where
        H: Host + ?Sized,
    {
        let Some(carrier) = self.carriers.get_mut(&entity) else {
            return;
        };
        let attached = carrier.clear_disease(&def.id);
        carrier.raise_immunity(&def.id, def.post_cure_immunity);
        self.dirty.insert(entity);
        log::debug!("{entity} cured of `{}`", def.id);
        self.events.push(DiseaseEvent::Cured {
            entity,
            disease: def.id.clone(),
        });
        symptoms::on_disease_cured(host, entity, &def.id, attached);
    }

    /// Next roll stream for rolls concerning `entity` in the current tick.
    pub(crate) fn stream(&mut self, entity: EntityId, domain: &str) -> RollStream {
        let counter = self.draws.entry(entity).or_insert(0);
        let salt = *counter;
        *counter += 1;
        self.dice.stream(entity, self.tick, domain, salt)
    }

    pub(crate) fn carrier_mut(&mut self, entity: EntityId) -> Option<&mut CarrierState> {
        self.carriers.get_mut(&entity)
    }

    pub(crate) fn mark_dirty(&mut self, entity: EntityId) {
        self.dirty.insert(entity);
    }

    pub(crate) fn push_event(&mut self, event: DiseaseEvent) {
        self.events.push(event);
    }

    pub(crate) fn allocate_cloud_id(&mut self) -> CloudId {
        let id = CloudId::new(self.next_cloud);
        self.next_cloud += 1;
        id
    }

    /// Roll stream for symptom behavior picks; shares the symptom domain.
    pub(crate) fn symptom_stream(&mut self, entity: EntityId) -> RollStream {
        self.stream(entity, DOMAIN_SYMPTOM)
    }
}
