//! Per-entity infection state.
//!
//! A `CarrierState` is created the first time an entity is infected (or
//! vaccinated) and then persists, possibly empty, for as long as the entity
//! does. Every timer it holds is keyed by disease so that curing a disease
//! removes its timers outright instead of leaving stale entries behind.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifies one cure step's timer within a disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CureSlot<'a> {
    Disease { step: usize },
    Symptom { symptom: &'a str, step: usize },
}

impl CureSlot<'_> {
    /// Stable string key, independent of any object identity.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Disease { step } => format!("disease/{step}"),
            Self::Symptom { symptom, step } => format!("symptom/{symptom}/{step}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CarrierState {
    /// Active disease id to current stage (always `1..=max_stage`).
    #[serde(default)]
    pub diseases: BTreeMap<String, u32>,
    /// When this carrier's next progression tick is due.
    #[serde(default)]
    pub next_tick: Option<f64>,
    /// Disease id to probability of blocking re-infection.
    #[serde(default)]
    pub immunities: BTreeMap<String, f64>,
    /// Disease id to symptom id to suppression expiry.
    #[serde(default)]
    pub suppressed: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub infected_at: BTreeMap<String, f64>,
    /// Disease id to cure-slot key to temperature window start.
    #[serde(default)]
    pub cure_timers: BTreeMap<String, BTreeMap<String, f64>>,
    /// Disease id to accumulated sleep seconds.
    #[serde(default)]
    pub sleep: BTreeMap<String, f64>,
    /// Disease id to components its behaviors attached.
    #[serde(default)]
    pub attached: BTreeMap<String, BTreeSet<String>>,
    /// Disease id to the end of its incubation period.
    #[serde(default)]
    pub dormant_until: BTreeMap<String, f64>,
}

impl CarrierState {
    #[must_use]
    pub fn stage(&self, disease: &str) -> Option<u32> {
        self.diseases.get(disease).copied()
    }

    #[must_use]
    pub fn is_infected(&self, disease: &str) -> bool {
        self.diseases.contains_key(disease)
    }

    #[must_use]
    pub fn has_any_disease(&self) -> bool {
        !self.diseases.is_empty()
    }

    #[must_use]
    pub fn immunity(&self, disease: &str) -> f64 {
        self.immunities.get(disease).copied().unwrap_or(0.0)
    }

    /// Raise immunity to `strength` if it is stronger than what is held.
    pub fn raise_immunity(&mut self, disease: &str, strength: f64) {
        let entry = self.immunities.entry(disease.to_string()).or_insert(0.0);
        *entry = entry.max(strength.clamp(0.0, 1.0));
    }

    /// Reset infection bookkeeping for a (re-)infection at `now`.
    ///
    /// Dormancy is left alone; see [`CarrierState::start_incubation`].
    pub fn begin_infection(&mut self, disease: &str, now: f64) {
        self.infected_at.insert(disease.to_string(), now);
        self.cure_timers.remove(disease);
        self.sleep.remove(disease);
    }

    /// Hold `disease` dormant for `incubation` seconds from `now`.
    pub fn start_incubation(&mut self, disease: &str, now: f64, incubation: Option<f64>) {
        match incubation {
            Some(secs) if secs > 0.0 => {
                self.dormant_until.insert(disease.to_string(), now + secs);
            }
            _ => {
                self.dormant_until.remove(disease);
            }
        }
    }

    /// Remove a disease and every timer tied to it, returning the components
    /// its behaviors attached.
    pub fn clear_disease(&mut self, disease: &str) -> BTreeSet<String> {
        self.diseases.remove(disease);
        self.infected_at.remove(disease);
        self.cure_timers.remove(disease);
        self.sleep.remove(disease);
        self.suppressed.remove(disease);
        self.dormant_until.remove(disease);
        self.attached.remove(disease).unwrap_or_default()
    }

    #[must_use]
    pub fn is_dormant(&self, disease: &str, now: f64) -> bool {
        self.dormant_until
            .get(disease)
            .is_some_and(|until| now < *until)
    }

    /// Drop incubation entries that have lapsed.
    pub fn prune_dormancy(&mut self, now: f64) {
        self.dormant_until.retain(|_, until| now < *until);
    }

    #[must_use]
    pub fn is_suppressed(&self, disease: &str, symptom: &str, now: f64) -> bool {
        self.suppressed
            .get(disease)
            .and_then(|symptoms| symptoms.get(symptom))
            .is_some_and(|expiry| now < *expiry)
    }

    pub fn suppress(&mut self, disease: &str, symptom: &str, until: f64) {
        self.suppressed
            .entry(disease.to_string())
            .or_default()
            .insert(symptom.to_string(), until);
    }

    /// Remove suppression windows that have lapsed. Returns how many were removed.
    pub fn prune_suppressions(&mut self, now: f64) -> usize {
        let mut removed = 0;
        for symptoms in self.suppressed.values_mut() {
            let before = symptoms.len();
            symptoms.retain(|_, expiry| now < *expiry);
            removed += before - symptoms.len();
        }
        self.suppressed.retain(|_, symptoms| !symptoms.is_empty());
        removed
    }

    #[must_use]
    pub fn window_start(&self, disease: &str, slot: CureSlot<'_>) -> Option<f64> {
        self.cure_timers
            .get(disease)
            .and_then(|timers| timers.get(&slot.key()))
            .copied()
    }

    pub fn set_window_start(&mut self, disease: &str, slot: CureSlot<'_>, start: f64) {
        self.cure_timers
            .entry(disease.to_string())
            .or_default()
            .insert(slot.key(), start);
    }

    pub fn clear_window(&mut self, disease: &str, slot: CureSlot<'_>) {
        if let Some(timers) = self.cure_timers.get_mut(disease) {
            timers.remove(&slot.key());
            if timers.is_empty() {
                self.cure_timers.remove(disease);
            }
        }
    }

    #[must_use]
    pub fn slept(&self, disease: &str) -> f64 {
        self.sleep.get(disease).copied().unwrap_or(0.0)
    }

    /// Credit sleep time to every active disease.
    pub fn add_sleep(&mut self, seconds: f64) {
        if seconds <= 0.0 {
            return;
        }
        for disease in self.diseases.keys() {
            *self.sleep.entry(disease.clone()).or_insert(0.0) += seconds;
        }
    }

    pub fn reset_sleep(&mut self, disease: &str) {
        self.sleep.remove(disease);
    }

    /// Record a component attached on behalf of `disease`.
    pub fn record_attachment(&mut self, disease: &str, component: &str) {
        self.attached
            .entry(disease.to_string())
            .or_default()
            .insert(component.to_string());
    }

    #[must_use]
    pub fn infected_for(&self, disease: &str, now: f64) -> Option<f64> {
        self.infected_at.get(disease).map(|start| now - *start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infected(disease: &str) -> CarrierState {
        let mut state = CarrierState::default();
        state.diseases.insert(disease.to_string(), 1);
        state.begin_infection(disease, 0.0);
        state
    }

    #[test]
    fn immunity_only_rises() {
        let mut state = CarrierState::default();
        state.raise_immunity("flu", 0.6);
        state.raise_immunity("flu", 0.4);
        assert!((state.immunity("flu") - 0.6).abs() < f64::EPSILON);
        state.raise_immunity("flu", 0.9);
        assert!((state.immunity("flu") - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn clearing_removes_all_timers() {
        let mut state = infected("flu");
        state.suppress("flu", "cough", 50.0);
        state.set_window_start("flu", CureSlot::Disease { step: 0 }, 3.0);
        state.add_sleep(4.0);
        state.record_attachment("flu", "Hunger");
        let attached = state.clear_disease("flu");
        assert!(attached.contains("Hunger"));
        assert!(state.suppressed.is_empty());
        assert!(state.cure_timers.is_empty());
        assert!(state.sleep.is_empty());
        assert!(state.infected_at.is_empty());
        assert!(!state.is_infected("flu"));
    }

    #[test]
    fn expired_suppressions_are_removed() {
        let mut state = infected("flu");
        state.suppress("flu", "cough", 10.0);
        state.suppress("flu", "fever", 30.0);
        assert!(state.is_suppressed("flu", "cough", 9.9));
        assert_eq!(state.prune_suppressions(10.0), 1);
        assert!(!state.is_suppressed("flu", "cough", 10.0));
        assert!(state.suppressed["flu"].contains_key("fever"));
        assert_eq!(state.prune_suppressions(30.0), 1);
        assert!(state.suppressed.is_empty());
    }

    #[test]
    fn reinfection_resets_bookkeeping() {
        let mut state = infected("flu");
        state.add_sleep(20.0);
        state.set_window_start("flu", CureSlot::Disease { step: 1 }, 2.0);
        state.begin_infection("flu", 40.0);
        assert!(state.slept("flu").abs() < f64::EPSILON);
        assert!(state.window_start("flu", CureSlot::Disease { step: 1 }).is_none());
        assert_eq!(state.infected_for("flu", 45.0), Some(5.0));
        assert!(!state.is_dormant("flu", 45.0));
    }

    #[test]
    fn incubation_is_separate_from_bookkeeping() {
        let mut state = infected("flu");
        state.start_incubation("flu", 40.0, Some(10.0));
        assert!(state.is_dormant("flu", 45.0));
        state.begin_infection("flu", 45.0);
        assert!(state.is_dormant("flu", 49.0));
        assert!(!state.is_dormant("flu", 50.0));
        state.start_incubation("flu", 60.0, Some(0.0));
        assert!(!state.is_dormant("flu", 60.0));
    }

    #[test]
    fn slot_keys_are_distinct() {
        let a = CureSlot::Disease { step: 0 }.key();
        let b = CureSlot::Symptom {
            symptom: "cough",
            step: 0,
        }
        .key();
        assert_ne!(a, b);
    }
}
