//! In-memory host world used by the console and the test-suite.
//!
//! Every side effect the engine asks for is applied to simple per-entity
//! records and appended to a journal, so callers can assert on exactly
//! what happened.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::STATUS_SLEEPING;
use crate::host::{
    Chemistry, Components, EntityId, MaskState, Messages, Position, Protection, Spatial,
    StatusEffects, Thermal, Vitals,
};

const BODY_TEMPERATURE: f32 = 310.15;
const BODY_HEAT_CAPACITY: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Mob,
    Surface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxEntity {
    pub name: String,
    pub kind: EntityKind,
    pub position: Position,
    pub alive: bool,
    pub reagents: BTreeMap<String, f32>,
    pub temperature: Option<f32>,
    pub heat_capacity: Option<f32>,
    /// Status name to remaining seconds.
    pub statuses: BTreeMap<String, f64>,
    pub mask: Option<MaskState>,
    pub head_covered: bool,
    pub internals: bool,
    pub components: BTreeSet<String>,
    pub damage: BTreeMap<String, f32>,
}

impl SandboxEntity {
    fn mob(name: &str, position: Position) -> Self {
        Self {
            name: name.to_string(),
            kind: EntityKind::Mob,
            position,
            alive: true,
            reagents: BTreeMap::new(),
            temperature: Some(BODY_TEMPERATURE),
            heat_capacity: Some(BODY_HEAT_CAPACITY),
            statuses: BTreeMap::new(),
            mask: None,
            head_covered: false,
            internals: false,
            components: BTreeSet::new(),
            damage: BTreeMap::new(),
        }
    }

    fn surface(name: &str, position: Position) -> Self {
        Self {
            kind: EntityKind::Surface,
            alive: false,
            temperature: None,
            heat_capacity: None,
            ..Self::mob(name, position)
        }
    }

    #[must_use]
    pub const fn is_mob(&self) -> bool {
        matches!(self.kind, EntityKind::Mob)
    }

    #[must_use]
    pub fn total_damage(&self) -> f32 {
        self.damage.values().sum()
    }
}

/// Side effect recorded by [`SandboxWorld`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum JournalEntry {
    Damage {
        entity: EntityId,
        damage_type: String,
        amount: f32,
    },
    Vomit { entity: EntityId },
    Heat { entity: EntityId, energy: f32 },
    Status {
        entity: EntityId,
        status: String,
        seconds: f64,
    },
    Popup { entity: EntityId, message: String },
    Emote { entity: EntityId, emote: String },
    Say { entity: EntityId, line: String },
    ComponentAdded { entity: EntityId, component: String },
    ComponentRemoved { entity: EntityId, component: String },
    ReagentConsumed {
        entity: EntityId,
        reagent: String,
        quantity: f32,
    },
    SymptomCured {
        entity: EntityId,
        disease: String,
        symptom: String,
    },
}

/// In-memory [`crate::Host`] whose journal keeps every side effect until
/// [`SandboxWorld::take_journal`] empties it.
#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    entities: BTreeMap<EntityId, SandboxEntity>,
    next_id: u64,
    journal: Vec<JournalEntry>,
    occluded: BTreeSet<(EntityId, EntityId)>,
    symptom_cures: Vec<(EntityId, String, String)>,
}

impl SandboxWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn spawn_mob(&mut self, name: &str, position: Position) -> EntityId {
        self.insert(SandboxEntity::mob(name, position))
    }

    pub fn spawn_surface(&mut self, name: &str, position: Position) -> EntityId {
        self.insert(SandboxEntity::surface(name, position))
    }

    fn insert(&mut self, entity: SandboxEntity) -> EntityId {
        let id = EntityId::new(self.next_id.max(1));
        self.next_id = id.raw() + 1;
        self.entities.insert(id, entity);
        id
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&SandboxEntity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut SandboxEntity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &SandboxEntity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    pub fn mobs(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .filter(|(_, entity)| entity.is_mob())
            .map(|(id, _)| *id)
    }

    /// First entity with the given name, in id order.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, entity)| entity.name == name)
            .map(|(id, _)| *id)
    }

    #[must_use]
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).map(|entity| entity.name.as_str())
    }

    #[must_use]
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.journal)
    }

    #[must_use]
    pub fn symptom_cures(&self) -> &[(EntityId, String, String)] {
        &self.symptom_cures
    }

    pub fn set_alive(&mut self, id: EntityId, alive: bool) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.alive = alive;
        }
    }

    pub fn set_position(&mut self, id: EntityId, position: Position) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = position;
        }
    }

    pub fn set_temperature(&mut self, id: EntityId, temperature: f32, heat_capacity: f32) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.temperature = Some(temperature);
            entity.heat_capacity = Some(heat_capacity);
        }
    }

    pub fn add_reagent(&mut self, id: EntityId, reagent: &str, quantity: f32) {
        if let Some(entity) = self.entities.get_mut(&id) {
            *entity.reagents.entry(reagent.to_string()).or_insert(0.0) += quantity;
        }
    }

    #[must_use]
    pub fn reagent(&self, id: EntityId, reagent: &str) -> f32 {
        self.entities
            .get(&id)
            .and_then(|entity| entity.reagents.get(reagent).copied())
            .unwrap_or(0.0)
    }

    pub fn set_mask(&mut self, id: EntityId, mask: Option<MaskState>) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.mask = mask;
        }
    }

    pub fn set_head_covered(&mut self, id: EntityId, covered: bool) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.head_covered = covered;
        }
    }

    pub fn set_internals(&mut self, id: EntityId, active: bool) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.internals = active;
        }
    }

    /// Put a status on an entity without journalling it.
    pub fn apply_status_for(&mut self, id: EntityId, status: &str, seconds: f64) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.statuses.insert(status.to_string(), seconds);
        }
    }

    pub fn set_sleeping(&mut self, id: EntityId, seconds: f64) {
        self.apply_status_for(id, STATUS_SLEEPING, seconds);
    }

    /// Block line of sight between two entities, both ways.
    pub fn block_sight(&mut self, a: EntityId, b: EntityId) {
        self.occluded.insert((a, b));
        self.occluded.insert((b, a));
    }

    #[must_use]
    pub fn has_component(&self, id: EntityId, component: &str) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|entity| entity.components.contains(component))
    }

    /// Count statuses down by `seconds`, dropping the ones that run out.
    pub fn advance(&mut self, seconds: f64) {
        for entity in self.entities.values_mut() {
            for remaining in entity.statuses.values_mut() {
                *remaining -= seconds;
            }
            entity.statuses.retain(|_, remaining| *remaining > 0.0);
        }
    }
}

impl Vitals for SandboxWorld {
    fn can_carry(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).is_some_and(SandboxEntity::is_mob)
    }

    fn is_alive(&self, entity: EntityId) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|e| e.is_mob() && e.alive)
    }

    fn apply_damage(&mut self, entity: EntityId, damage_type: &str, amount: f32) {
        if let Some(record) = self.entities.get_mut(&entity) {
            *record.damage.entry(damage_type.to_string()).or_insert(0.0) += amount;
            self.journal.push(JournalEntry::Damage {
                entity,
                damage_type: damage_type.to_string(),
                amount,
            });
        }
    }

    fn vomit(&mut self, entity: EntityId) {
        self.journal.push(JournalEntry::Vomit { entity });
    }
}

impl Chemistry for SandboxWorld {
    fn reagent_quantity(&self, entity: EntityId, reagent: &str) -> Option<f32> {
        let record = self.entities.get(&entity).filter(|e| e.is_mob())?;
        Some(record.reagents.get(reagent).copied().unwrap_or(0.0))
    }

    fn try_consume_reagent(&mut self, entity: EntityId, reagent: &str, quantity: f32) -> bool {
        let Some(present) = self
            .entities
            .get_mut(&entity)
            .and_then(|e| e.reagents.get_mut(reagent))
        else {
            return false;
        };
        if *present < quantity {
            return false;
        }
        *present -= quantity;
        self.journal.push(JournalEntry::ReagentConsumed {
            entity,
            reagent: reagent.to_string(),
            quantity,
        });
        true
    }
}

impl Thermal for SandboxWorld {
    fn temperature(&self, entity: EntityId) -> Option<f32> {
        self.entities.get(&entity)?.temperature
    }

    fn heat_capacity(&self, entity: EntityId) -> Option<f32> {
        self.entities.get(&entity)?.heat_capacity
    }

    fn change_heat(&mut self, entity: EntityId, energy: f32) {
        let Some(record) = self.entities.get_mut(&entity) else {
            return;
        };
        let capacity = record.heat_capacity.unwrap_or(0.0);
        if let Some(temperature) = record.temperature.as_mut() {
            if capacity > 0.0 {
                *temperature += energy / capacity;
            }
        }
        self.journal.push(JournalEntry::Heat { entity, energy });
    }
}

impl StatusEffects for SandboxWorld {
    fn apply_status(&mut self, entity: EntityId, status: &str, seconds: f64, refresh: bool) {
        let Some(record) = self.entities.get_mut(&entity) else {
            return;
        };
        let remaining = record.statuses.entry(status.to_string()).or_insert(0.0);
        *remaining = if refresh {
            (*remaining).max(seconds)
        } else {
            *remaining + seconds
        };
        self.journal.push(JournalEntry::Status {
            entity,
            status: status.to_string(),
            seconds,
        });
    }

    fn has_status(&self, entity: EntityId, status: &str) -> bool {
        self.entities
            .get(&entity)
            .and_then(|e| e.statuses.get(status))
            .is_some_and(|remaining| *remaining > 0.0)
    }
}

impl Protection for SandboxWorld {
    fn mask(&self, entity: EntityId) -> Option<MaskState> {
        self.entities.get(&entity)?.mask
    }

    fn head_covered(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).is_some_and(|e| e.head_covered)
    }

    fn internals_active(&self, entity: EntityId) -> bool {
        self.entities.get(&entity).is_some_and(|e| e.internals)
    }
}

impl Spatial for SandboxWorld {
    fn position(&self, entity: EntityId) -> Option<Position> {
        self.entities.get(&entity).map(|e| e.position)
    }

    fn entities_in_range(&self, center: Position, range: f32) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.position.distance(center) <= range)
            .map(|(id, _)| *id)
            .collect()
    }

    fn line_of_sight(&self, from: EntityId, to: EntityId) -> bool {
        !self.occluded.contains(&(from, to))
    }
}

impl Messages for SandboxWorld {
    fn popup(&mut self, entity: EntityId, message: &str) {
        self.journal.push(JournalEntry::Popup {
            entity,
            message: message.to_string(),
        });
    }

    fn emote(&mut self, entity: EntityId, emote: &str) {
        self.journal.push(JournalEntry::Emote {
            entity,
            emote: emote.to_string(),
        });
    }

    fn say(&mut self, entity: EntityId, line: &str) {
        self.journal.push(JournalEntry::Say {
            entity,
            line: line.to_string(),
        });
    }
}

impl Components for SandboxWorld {
    fn add_component(&mut self, entity: EntityId, component: &str) -> bool {
        let Some(record) = self.entities.get_mut(&entity) else {
            return false;
        };
        if !record.components.insert(component.to_string()) {
            return false;
        }
        self.journal.push(JournalEntry::ComponentAdded {
            entity,
            component: component.to_string(),
        });
        true
    }

    fn remove_component(&mut self, entity: EntityId, component: &str) {
        let removed = self
            .entities
            .get_mut(&entity)
            .is_some_and(|record| record.components.remove(component));
        if removed {
            self.journal.push(JournalEntry::ComponentRemoved {
                entity,
                component: component.to_string(),
            });
        }
    }

    fn symptom_cured(&mut self, entity: EntityId, disease: &str, symptom: &str) {
        self.symptom_cures
            .push((entity, disease.to_string(), symptom.to_string()));
        self.journal.push(JournalEntry::SymptomCured {
            entity,
            disease: disease.to_string(),
            symptom: symptom.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaces_cannot_carry() {
        let mut world = SandboxWorld::new();
        let table = world.spawn_surface("table", Position::new(0.0, 0.0));
        let mob = world.spawn_mob("mo", Position::new(0.0, 0.0));
        assert!(!world.can_carry(table));
        assert!(world.can_carry(mob));
        assert_eq!(world.reagent_quantity(table, "Water"), None);
        assert_eq!(world.reagent_quantity(mob, "Water"), Some(0.0));
        assert_eq!(world.find("mo"), Some(mob));
    }

    #[test]
    fn statuses_refresh_or_extend() {
        let mut world = SandboxWorld::new();
        let mob = world.spawn_mob("mo", Position::new(0.0, 0.0));
        world.apply_status(mob, "Jitter", 5.0, true);
        world.apply_status(mob, "Jitter", 3.0, true);
        world.apply_status(mob, "Stutter", 5.0, false);
        world.apply_status(mob, "Stutter", 3.0, false);
        let statuses = &world.entity(mob).unwrap().statuses;
        assert!((statuses["Jitter"] - 5.0).abs() < f64::EPSILON);
        assert!((statuses["Stutter"] - 8.0).abs() < f64::EPSILON);
        world.advance(6.0);
        assert!(!world.has_status(mob, "Jitter"));
        assert!(world.has_status(mob, "Stutter"));
    }

    #[test]
    fn range_query_is_inclusive() {
        let mut world = SandboxWorld::new();
        let a = world.spawn_mob("a", Position::new(0.0, 0.0));
        let b = world.spawn_mob("b", Position::new(2.0, 0.0));
        let hits = world.entities_in_range(Position::new(0.0, 0.0), 2.0);
        assert_eq!(hits, vec![a, b]);
    }

    #[test]
    fn consuming_more_than_present_fails() {
        let mut world = SandboxWorld::new();
        let mob = world.spawn_mob("mo", Position::new(0.0, 0.0));
        world.add_reagent(mob, "Water", 2.0);
        assert!(!world.try_consume_reagent(mob, "Water", 3.0));
        assert!(world.try_consume_reagent(mob, "Water", 2.0));
        assert!(world.reagent(mob, "Water").abs() < f32::EPSILON);
    }
}
