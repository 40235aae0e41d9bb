//! Airborne spread: the per-tick exhale roll and symptom-driven bursts.
use crate::catalog::{AirborneBurst, DiseaseDef, SpreadVector};
use crate::constants::{DOMAIN_AIRBORNE, FIRST_STAGE};
use crate::engine::DiseaseEngine;
use crate::host::{EntityId, Host};
use crate::numbers::clamp_probability;

use super::{cloud::CloudSpec, is_susceptible, ppe_factor};

/// Continuous per-tick attempt for one airborne disease on `source`.
pub(crate) fn tick<H>(engine: &mut DiseaseEngine, host: &mut H, source: EntityId, def: &DiseaseDef)
where
    H: Host + ?Sized,
{
    if !def.spreads_by(SpreadVector::Airborne) {
        return;
    }
    let mut roll = engine.stream(source, DOMAIN_AIRBORNE);
    if !roll.chance(def.airborne.tick_chance) {
        return;
    }
    exhale(
        engine,
        &*host,
        source,
        def,
        def.airborne.range,
        def.airborne.infect_chance,
    );
}

/// One-shot pulse fired by a symptom; may leave a cloud behind.
pub(crate) fn burst<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    source: EntityId,
    def: &DiseaseDef,
    pulse: &AirborneBurst,
) where
    H: Host + ?Sized,
{
    let range = def.airborne.range * pulse.range_multiplier;
    let chance = def.airborne.infect_chance * pulse.chance_multiplier;
    exhale(engine, &*host, source, def, range, chance);

    if let Some(cloud) = &pulse.cloud {
        if let Some(position) = host.position(source) {
            let spec = CloudSpec::from_burst(engine.config(), cloud);
            engine.spawn_cloud(position, vec![def.id.clone()], spec);
        }
    }
}

/// Roll `chance`, reduced by each target's gear, against everyone in range.
///
/// Returns the number of new infections.
pub(crate) fn exhale<H>(
    engine: &mut DiseaseEngine,
    host: &H,
    source: EntityId,
    def: &DiseaseDef,
    range: f32,
    chance: f64,
) -> usize
where
    H: Host + ?Sized,
{
    let Some(origin) = host.position(source) else {
        return 0;
    };
    let mut infected = 0;
    for target in host.entities_in_range(origin, range) {
        if target == source || !is_susceptible(engine, host, target, &def.id) {
            continue;
        }
        if !host.line_of_sight(source, target) {
            continue;
        }
        let factor = ppe_factor(&engine.config().ppe, host, target, def);
        let probability = clamp_probability(chance * factor);
        if engine.try_infect_with_chance(host, target, &def.id, probability, FIRST_STAGE) {
            infected += 1;
        }
    }
    infected
}

impl DiseaseEngine {
    /// Fire a disease's airborne burst from `source` immediately, as a sneeze would.
    pub fn airborne_burst<H>(
        &mut self,
        host: &mut H,
        source: EntityId,
        disease: &str,
        pulse: &AirborneBurst,
    ) -> bool
    where
        H: Host + ?Sized,
    {
        let catalog = self.catalog_handle();
        let Some(def) = catalog.disease(disease) else {
            return false;
        };
        if !def.spreads_by(SpreadVector::Airborne) {
            return false;
        }
        burst(self, host, source, def, pulse);
        true
    }
}
