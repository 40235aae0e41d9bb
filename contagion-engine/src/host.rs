//! Collaborator interfaces the engine reads from and writes into.
//!
//! The engine never owns mob life-state, chemistry, temperature, inventory or
//! chat. It reaches them through these traits, which a host world implements.
//! Every call is synchronous and made from inside a tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a simulated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// World-space position in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// State of whatever occupies the mask slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskState {
    /// Worn and sealed.
    Protective,
    /// Worn but pulled down or opened.
    Lowered,
}

/// Mob life-state and the bodily side effects symptoms apply.
pub trait Vitals {
    /// Whether the entity can hold carrier state at all.
    fn can_carry(&self, entity: EntityId) -> bool;

    fn is_alive(&self, entity: EntityId) -> bool;

    fn is_dead(&self, entity: EntityId) -> bool {
        !self.is_alive(entity)
    }

    fn apply_damage(&mut self, entity: EntityId, damage_type: &str, amount: f32);

    fn vomit(&mut self, entity: EntityId);
}

/// The carrier's chemical solution.
pub trait Chemistry {
    /// Quantity of `reagent` present, or `None` when the entity has no solution container.
    fn reagent_quantity(&self, entity: EntityId, reagent: &str) -> Option<f32>;

    /// Remove `quantity` of `reagent`; `false` leaves the solution untouched.
    fn try_consume_reagent(&mut self, entity: EntityId, reagent: &str, quantity: f32) -> bool;
}

/// Body temperature.
pub trait Thermal {
    /// Current temperature in kelvin, `None` without temperature state.
    fn temperature(&self, entity: EntityId) -> Option<f32>;

    /// Heat capacity in joules per kelvin.
    fn heat_capacity(&self, entity: EntityId) -> Option<f32>;

    fn change_heat(&mut self, entity: EntityId, energy: f32);
}

/// Timed status effects (jitter, stutter, forced sleep).
pub trait StatusEffects {
    /// Apply or refresh a named effect for `seconds`.
    fn apply_status(&mut self, entity: EntityId, status: &str, seconds: f64, refresh: bool);

    fn has_status(&self, entity: EntityId, status: &str) -> bool;
}

/// Inventory slots relevant to airborne protection.
pub trait Protection {
    fn mask(&self, entity: EntityId) -> Option<MaskState>;

    fn head_covered(&self, entity: EntityId) -> bool;

    fn internals_active(&self, entity: EntityId) -> bool;
}

/// Spatial lookups used by airborne, residue and cloud spread.
pub trait Spatial {
    fn position(&self, entity: EntityId) -> Option<Position>;

    /// Every entity within `range` of `center`, in a stable order.
    fn entities_in_range(&self, center: Position, range: f32) -> Vec<EntityId>;

    /// Whether nothing blocks the path between two entities.
    fn line_of_sight(&self, _from: EntityId, _to: EntityId) -> bool {
        true
    }
}

/// Chat, emote and popup output. Messages are localization keys or literal lines.
pub trait Messages {
    /// Private popup only the entity sees.
    fn popup(&mut self, entity: EntityId, message: &str);

    fn emote(&mut self, entity: EntityId, emote: &str);

    fn say(&mut self, entity: EntityId, line: &str);
}

/// Named components behaviors attach to a carrier, plus cure hooks.
pub trait Components {
    /// Attach a component by name. `false` when the host cannot attach it.
    fn add_component(&mut self, entity: EntityId, component: &str) -> bool;

    fn remove_component(&mut self, entity: EntityId, component: &str);

    /// Extension point run after a symptom-level cure.
    fn symptom_cured(&mut self, _entity: EntityId, _disease: &str, _symptom: &str) {}
}

/// Everything the engine needs from its surrounding world.
pub trait Host:
    Vitals + Chemistry + Thermal + StatusEffects + Protection + Spatial + Messages + Components
{
}

impl<T> Host for T where
    T: Vitals + Chemistry + Thermal + StatusEffects + Protection + Spatial + Messages + Components
{
}
