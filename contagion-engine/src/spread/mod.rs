//! The four infection transfer vectors.
//!
//! Every vector funnels through [`DiseaseEngine::try_infect_with_chance`], so
//! immunity and eligibility are checked in one place.

pub mod airborne;
pub mod cloud;
pub mod contact;
pub mod residue;

use crate::catalog::DiseaseDef;
use crate::config::PpeConfig;
use crate::engine::DiseaseEngine;
use crate::host::{EntityId, MaskState, Protection, Vitals};

/// Multiplier applied to a respiratory infection chance by the target's gear.
#[must_use]
pub fn ppe_factor<P>(ppe: &PpeConfig, host: &P, target: EntityId, def: &DiseaseDef) -> f64
where
    P: Protection + ?Sized,
{
    if def.ignore_mask_ppe {
        return 1.0;
    }
    let mut factor = 1.0;
    if matches!(host.mask(target), Some(MaskState::Protective)) {
        factor *= ppe.mask_multiplier;
    }
    if host.head_covered(target) {
        factor *= ppe.head_multiplier;
    }
    if host.internals_active(target) {
        factor *= ppe.internals_multiplier;
    }
    factor
}

/// Living carriers that do not already have the disease.
pub(crate) fn is_susceptible<V>(
    engine: &DiseaseEngine,
    host: &V,
    target: EntityId,
    disease: &str,
) -> bool
where
    V: Vitals + ?Sized,
{
    host.can_carry(target) && host.is_alive(target) && !engine.is_infected(target, disease)
}
