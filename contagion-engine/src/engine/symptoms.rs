//! Symptom dispatcher: rolls stage symptoms and runs their behaviors.
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::{Behavior, DiseaseDef, SpreadVector, SymptomDef};
use crate::constants::{
    MSG_DISEASE_CURED, MSG_SYMPTOM_TREATED, STATUS_FORCED_SLEEP, STATUS_JITTER,
};
use crate::events::DiseaseEvent;
use crate::host::{EntityId, Host};
use crate::numbers::clamp_probability;
use crate::rng::RollStream;
use crate::spread::airborne;

use super::DiseaseEngine;

/// Roll every symptom slot of the carrier's current stage.
pub(crate) fn roll_stage_symptoms<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    def: &DiseaseDef,
) where
    H: Host + ?Sized,
{
    let catalog = engine.catalog_handle();
    let Some(stage) = engine.stage(entity, &def.id) else {
        return;
    };
    let Some(stage_def) = def.stage(stage) else {
        return;
    };
    let now = engine.now();
    let mut roll = engine.symptom_stream(entity);
    for slot in &stage_def.symptoms {
        // A transition behavior may have replaced this disease mid-loop.
        if !engine.is_infected(entity, &def.id) {
            break;
        }
        let Some(symptom) = catalog.symptom(&slot.id) else {
            log::warn!("disease `{}` references unknown symptom `{}`", def.id, slot.id);
            continue;
        };
        let suppressed = engine
            .carrier(entity)
            .is_some_and(|state| state.is_suppressed(&def.id, &slot.id, now));
        if suppressed {
            continue;
        }
        let probability = clamp_probability(slot.effective_probability(symptom.probability));
        if roll.chance(probability) {
            trigger_symptom(engine, host, entity, def, symptom);
        }
    }
}

/// Flavor popup drawn from the stage's sensation list.
pub(crate) fn roll_sensation<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    def: &DiseaseDef,
) where
    H: Host + ?Sized,
{
    let Some(stage_def) = engine.stage(entity, &def.id).and_then(|stage| def.stage(stage)) else {
        return;
    };
    if stage_def.sensations.is_empty() {
        return;
    }
    let probability = stage_def
        .sensation_chance
        .unwrap_or(engine.config().sensation_chance);
    let mut roll = engine.symptom_stream(entity);
    if roll.chance(probability) {
        let line = &stage_def.sensations[roll.index(stage_def.sensations.len())];
        host.popup(entity, line);
    }
}

/// Run a symptom's behaviors, then its airborne burst if the disease allows it.
///
/// Behaviors stop as soon as one of them clears `def` from the carrier.
pub(crate) fn trigger_symptom<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    def: &DiseaseDef,
    symptom: &SymptomDef,
) -> bool
where
    H: Host + ?Sized,
{
    if !engine.is_infected(entity, &def.id) {
        return false;
    }
    if symptom.only_when_alive && host.is_dead(entity) {
        return false;
    }
    let mut roll = engine.symptom_stream(entity);
    if symptom.single_behavior {
        if !symptom.behaviors.is_empty() {
            let pick = roll.index(symptom.behaviors.len());
            run_behavior(engine, host, entity, def, &symptom.behaviors[pick], &mut roll);
        }
    } else {
        for behavior in &symptom.behaviors {
            run_behavior(engine, host, entity, def, behavior, &mut roll);
            if !engine.is_infected(entity, &def.id) {
                break;
            }
        }
    }
    engine.push_event(DiseaseEvent::SymptomFired {
        entity,
        disease: def.id.clone(),
        symptom: symptom.id.clone(),
    });

    if let Some(burst) = &symptom.airborne_burst {
        if def.spreads_by(SpreadVector::Airborne) && engine.is_infected(entity, &def.id) {
            airborne::burst(engine, host, entity, def, burst);
        }
    }
    true
}

fn run_behavior<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    def: &DiseaseDef,
    behavior: &Behavior,
    roll: &mut RollStream,
) where
    H: Host + ?Sized,
{
    match behavior {
        Behavior::Emote { emote } => host.emote(entity, emote),
        Behavior::Vomit => host.vomit(entity),
        Behavior::Jitter { seconds, refresh } => {
            host.apply_status(entity, STATUS_JITTER, *seconds, *refresh);
        }
        Behavior::Damage {
            damage_type,
            amount,
        } => host.apply_damage(entity, damage_type, *amount),
        Behavior::Temperature { target, max_step } => {
            nudge_temperature(host, entity, *target, *max_step);
        }
        Behavior::ForcedSleep { chance, seconds } => {
            if roll.chance(*chance) {
                host.apply_status(entity, STATUS_FORCED_SLEEP, *seconds, true);
            }
        }
        Behavior::Shout { lines } => {
            if !lines.is_empty() {
                host.say(entity, &lines[roll.index(lines.len())]);
            }
        }
        Behavior::Sensation { message } => host.popup(entity, message),
        Behavior::AddComponent { component } => {
            if host.add_component(entity, component) {
                if let Some(carrier) = engine.carrier_mut(entity) {
                    carrier.record_attachment(&def.id, component);
                }
            }
        }
        Behavior::Transition { disease, stage } => {
            transition(engine, host, entity, def, disease, *stage);
        }
        Behavior::StatusBatch { effects } => {
            for effect in effects {
                host.apply_status(entity, &effect.status, effect.seconds, effect.refresh);
            }
        }
    }
}

fn nudge_temperature<H>(host: &mut H, entity: EntityId, target: f32, max_step: f32)
where
    H: Host + ?Sized,
{
    let (Some(current), Some(capacity)) = (host.temperature(entity), host.heat_capacity(entity))
    else {
        return;
    };
    let step = max_step.abs();
    let delta = (target - current).clamp(-step, step);
    if delta != 0.0 {
        host.change_heat(entity, delta * capacity);
    }
}

fn transition<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    from: &DiseaseDef,
    to: &str,
    stage: u32,
) where
    H: Host + ?Sized,
{
    let catalog: Arc<_> = engine.catalog_handle();
    if catalog.disease(to).is_none() {
        log::warn!("symptom transition from `{}` to unknown disease `{to}`", from.id);
        return;
    }
    if !engine.is_infected(entity, &from.id) {
        return;
    }
    let attached = engine
        .carrier_mut(entity)
        .map(|carrier| carrier.clear_disease(&from.id))
        .unwrap_or_default();
    engine.mark_dirty(entity);
    for component in &attached {
        host.remove_component(entity, component);
    }
    log::debug!("{entity} transitions from `{}` to `{to}`", from.id);
    engine.push_event(DiseaseEvent::Transitioned {
        entity,
        from: from.id.clone(),
        to: to.to_string(),
    });
    engine.infect(&*host, entity, to, stage);
}

/// Roll back every component the disease attached and tell the carrier.
pub(crate) fn on_disease_cured<H>(
    host: &mut H,
    entity: EntityId,
    _disease: &str,
    attached: BTreeSet<String>,
) where
    H: Host + ?Sized,
{
    for component in &attached {
        host.remove_component(entity, component);
    }
    host.popup(entity, MSG_DISEASE_CURED);
}

pub(crate) fn on_symptom_cured<H>(host: &mut H, entity: EntityId, disease: &str, symptom: &str)
where
    H: Host + ?Sized,
{
    host.symptom_cured(entity, disease, symptom);
    host.popup(entity, MSG_SYMPTOM_TREATED);
}
