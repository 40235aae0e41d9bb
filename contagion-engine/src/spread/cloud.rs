//! Transient, position-anchored infectious clouds.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::CloudBurst;
use crate::config::EngineConfig;
use crate::constants::FIRST_STAGE;
use crate::engine::DiseaseEngine;
use crate::events::DiseaseEvent;
use crate::host::{Host, Position};
use crate::numbers::clamp_probability;

use super::{is_susceptible, ppe_factor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CloudId(u64);

impl CloudId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CloudId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cloud-{}", self.0)
    }
}

/// Shape and lifetime of a cloud about to be spawned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudSpec {
    pub range: f32,
    pub tick_interval_secs: f64,
    pub lifetime_secs: f64,
}

impl CloudSpec {
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            range: config.cloud.range,
            tick_interval_secs: config.cloud.tick_interval_secs,
            lifetime_secs: config.cloud.lifetime_secs,
        }
    }

    #[must_use]
    pub fn from_burst(config: &EngineConfig, burst: &CloudBurst) -> Self {
        let base = Self::from_config(config);
        Self {
            range: burst.range.unwrap_or(base.range),
            tick_interval_secs: burst
                .tick_interval_secs
                .filter(|secs| *secs > 0.0)
                .unwrap_or(base.tick_interval_secs),
            lifetime_secs: burst.lifetime_secs.unwrap_or(base.lifetime_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cloud {
    pub diseases: Vec<String>,
    pub position: Position,
    pub range: f32,
    pub tick_interval_secs: f64,
    pub next_tick: f64,
    pub expires_at: f64,
}

impl Cloud {
    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at
    }
}

impl DiseaseEngine {
    /// Anchor a cloud at `position`; it first rolls one interval from now.
    pub fn spawn_cloud(
        &mut self,
        position: Position,
        diseases: Vec<String>,
        spec: CloudSpec,
    ) -> CloudId {
        let id = self.allocate_cloud_id();
        let now = self.now();
        let interval = if spec.tick_interval_secs > 0.0 {
            spec.tick_interval_secs
        } else {
            self.config().cloud.tick_interval_secs
        };
        self.clouds.insert(
            id,
            Cloud {
                diseases,
                position,
                range: spec.range.max(0.0),
                tick_interval_secs: interval,
                next_tick: now + interval,
                expires_at: now + spec.lifetime_secs.max(0.0),
            },
        );
        self.push_event(DiseaseEvent::CloudSpawned { cloud: id });
        id
    }

    #[must_use]
    pub fn cloud(&self, id: CloudId) -> Option<&Cloud> {
        self.clouds.get(&id)
    }

    pub fn clouds(&self) -> impl Iterator<Item = (CloudId, &Cloud)> {
        self.clouds.iter().map(|(id, cloud)| (*id, cloud))
    }
}

/// Expire clouds past their lifetime, then roll the ones that are due.
pub(crate) fn update<H>(engine: &mut DiseaseEngine, host: &mut H)
where
    H: Host + ?Sized,
{
    let now = engine.now();
    let ids: Vec<CloudId> = engine.clouds.keys().copied().collect();
    for id in ids {
        let Some(cloud) = engine.clouds.get_mut(&id) else {
            continue;
        };
        if cloud.is_expired(now) {
            engine.clouds.remove(&id);
            engine.push_event(DiseaseEvent::CloudExpired { cloud: id });
            continue;
        }
        if now < cloud.next_tick {
            continue;
        }
        cloud.next_tick = now + cloud.tick_interval_secs;
        let position = cloud.position;
        let range = cloud.range;
        let diseases = cloud.diseases.clone();
        roll_cloud(engine, &*host, position, range, &diseases);
    }
}

fn roll_cloud<H>(
    engine: &mut DiseaseEngine,
    host: &H,
    position: Position,
    range: f32,
    diseases: &[String],
) where
    H: Host + ?Sized,
{
    let catalog = engine.catalog_handle();
    let targets = host.entities_in_range(position, range);
    for disease in diseases {
        let Some(def) = catalog.disease(disease) else {
            continue;
        };
        for target in &targets {
            if !is_susceptible(engine, host, *target, disease) {
                continue;
            }
            let factor = ppe_factor(&engine.config().ppe, host, *target, def);
            let probability = clamp_probability(def.airborne.infect_chance * factor);
            engine.try_infect_with_chance(host, *target, disease, probability, FIRST_STAGE);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{DiseaseCatalog, DiseaseDef, StageDef};
    use crate::rng::Dice;
    use crate::sandbox::SandboxWorld;

    fn engine() -> DiseaseEngine {
        let def = DiseaseDef::new("flu", "Flu", vec![StageDef::new(1, Vec::new())]);
        let catalog = DiseaseCatalog {
            diseases: vec![def],
            symptoms: Vec::new(),
        };
        DiseaseEngine::new(Arc::new(catalog), EngineConfig::default()).with_dice(Dice::fixed(0.0))
    }

    fn spec(lifetime_secs: f64) -> CloudSpec {
        CloudSpec {
            range: 1.5,
            tick_interval_secs: 1.0,
            lifetime_secs,
        }
    }

    #[test]
    fn burst_overrides_fall_back_to_config() {
        let config = EngineConfig::default();
        let burst = CloudBurst {
            range: Some(3.0),
            tick_interval_secs: Some(0.0),
            lifetime_secs: None,
        };
        let spec = CloudSpec::from_burst(&config, &burst);
        assert!((spec.range - 3.0).abs() < f32::EPSILON);
        assert!((spec.tick_interval_secs - config.cloud.tick_interval_secs).abs() < f64::EPSILON);
        assert!((spec.lifetime_secs - config.cloud.lifetime_secs).abs() < f64::EPSILON);
    }

    #[test]
    fn cloud_infects_on_its_interval() {
        let mut world = SandboxWorld::new();
        let mob = world.spawn_mob("ivy", Position::new(1.0, 0.0));
        let mut engine = engine();
        engine.spawn_cloud(Position::new(0.0, 0.0), vec!["flu".into()], spec(10.0));
        engine.update(&mut world, 0.5);
        assert!(!engine.is_infected(mob, "flu"));
        engine.update(&mut world, 1.0);
        assert!(engine.is_infected(mob, "flu"));
    }

    #[test]
    fn zero_lifetime_cloud_never_rolls() {
        let mut world = SandboxWorld::new();
        let mob = world.spawn_mob("jon", Position::new(0.0, 0.0));
        let mut engine = engine();
        let id = engine.spawn_cloud(Position::new(0.0, 0.0), vec!["flu".into()], spec(0.0));
        let summary = engine.update(&mut world, 5.0);
        assert_eq!(summary.clouds_expired, 1);
        assert!(engine.cloud(id).is_none());
        assert!(!engine.is_infected(mob, "flu"));
    }
}
