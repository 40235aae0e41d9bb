//! Cure evaluator: disease-level steps first, then symptom-level treatments.
use crate::carrier::CureSlot;
use crate::catalog::{CureCondition, CureStep, DiseaseDef};
use crate::constants::{DOMAIN_CURE, FIRST_STAGE, MSG_STAGE_LOWERED};
use crate::events::DiseaseEvent;
use crate::host::{EntityId, Host};
use crate::rng::RollStream;

use super::{DiseaseEngine, symptoms};

pub(crate) fn trigger_cure_steps<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    def: &DiseaseDef,
) where
    H: Host + ?Sized,
{
    let Some(stage) = engine.stage(entity, &def.id) else {
        return;
    };
    let mut roll = engine.stream(entity, DOMAIN_CURE);

    for (index, step) in def.cures_for_stage(stage).iter().enumerate() {
        let slot = CureSlot::Disease { step: index };
        if !evaluate_step(engine, host, entity, &def.id, slot, step, &mut roll) {
            continue;
        }
        if step.lower_stage {
            lower_stage(engine, host, entity, def);
            break;
        }
        engine.cure_disease(host, entity, def);
        return;
    }

    treat_symptoms(engine, host, entity, def, &mut roll);
}

fn treat_symptoms<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    def: &DiseaseDef,
    roll: &mut RollStream,
) where
    H: Host + ?Sized,
{
    let catalog = engine.catalog_handle();
    let Some(stage_def) = engine.stage(entity, &def.id).and_then(|stage| def.stage(stage)) else {
        return;
    };
    let now = engine.now();
    for slot in &stage_def.symptoms {
        let Some(symptom) = catalog.symptom(&slot.id) else {
            continue;
        };
        if symptom.cures.is_empty() {
            continue;
        }
        let suppressed = engine
            .carrier(entity)
            .is_some_and(|state| state.is_suppressed(&def.id, &symptom.id, now));
        if suppressed {
            continue;
        }
        for (index, step) in symptom.cures.iter().enumerate() {
            let cure_slot = CureSlot::Symptom {
                symptom: &symptom.id,
                step: index,
            };
            if !evaluate_step(engine, host, entity, &def.id, cure_slot, step, roll) {
                continue;
            }
            let until = now + symptom.cure_duration_secs;
            if let Some(carrier) = engine.carrier_mut(entity) {
                carrier.suppress(&def.id, &symptom.id, until);
            }
            engine.mark_dirty(entity);
            engine.push_event(DiseaseEvent::SymptomTreated {
                entity,
                disease: def.id.clone(),
                symptom: symptom.id.clone(),
                until,
            });
            symptoms::on_symptom_cured(host, entity, &def.id, &symptom.id);
            break;
        }
    }
}

/// Roll the step's chance and run its check; `true` when both pass.
fn evaluate_step<H>(
    engine: &mut DiseaseEngine,
    host: &mut H,
    entity: EntityId,
    disease: &str,
    slot: CureSlot<'_>,
    step: &CureStep,
    roll: &mut RollStream,
) -> bool
where
    H: Host + ?Sized,
{
    let now = engine.now();
    match &step.condition {
        CureCondition::Reagent {
            reagent,
            quantity,
            consume,
        } => {
            if !roll.chance(step.chance) {
                return false;
            }
            let Some(present) = host.reagent_quantity(entity, reagent) else {
                return false;
            };
            if present < *quantity {
                return false;
            }
            !*consume || host.try_consume_reagent(entity, reagent, *quantity)
        }
        CureCondition::Sleep { required_secs } => {
            if !roll.chance(step.chance) {
                return false;
            }
            let Some(carrier) = engine.carrier_mut(entity) else {
                return false;
            };
            if carrier.slept(disease) < *required_secs {
                return false;
            }
            carrier.reset_sleep(disease);
            true
        }
        CureCondition::Elapsed { required_secs } => {
            if !roll.chance(step.chance) {
                return false;
            }
            engine
                .carrier(entity)
                .and_then(|carrier| carrier.infected_for(disease, now))
                .is_some_and(|elapsed| elapsed >= *required_secs)
        }
        CureCondition::Temperature {
            min,
            max,
            required_secs,
        } => {
            let temperature = host.temperature(entity);
            let Some(carrier) = engine.carrier_mut(entity) else {
                return false;
            };
            let inside = temperature.is_some_and(|t| t >= *min && t <= *max);
            if !inside {
                carrier.clear_window(disease, slot);
                return false;
            }
            let start = carrier.window_start(disease, slot).unwrap_or_else(|| {
                carrier.set_window_start(disease, slot, now);
                now
            });
            if now - start < *required_secs {
                return false;
            }
            if roll.chance(step.chance) {
                carrier.clear_window(disease, slot);
                true
            } else {
                carrier.set_window_start(disease, slot, now);
                false
            }
        }
    }
}

fn lower_stage<H>(engine: &mut DiseaseEngine, host: &mut H, entity: EntityId, def: &DiseaseDef)
where
    H: Host + ?Sized,
{
    let Some(carrier) = engine.carrier_mut(entity) else {
        return;
    };
    let Some(stage) = carrier.diseases.get_mut(&def.id) else {
        return;
    };
    if *stage <= FIRST_STAGE {
        return;
    }
    *stage -= 1;
    let stage = *stage;
    engine.mark_dirty(entity);
    engine.push_event(DiseaseEvent::StageLowered {
        entity,
        disease: def.id.clone(),
        stage,
    });
    host.popup(entity, MSG_STAGE_LOWERED);
}
