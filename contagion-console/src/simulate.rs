use contagion_engine::{DiseaseEngine, DiseaseEvent, EntityId, Position};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::commands::{CommandError, Session, Target};

/// Parameters for one seeded outbreak run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    pub seed: u64,
    pub duration_secs: f64,
    /// Mobs per side of the square grid.
    pub grid: u16,
    pub spacing: f32,
    pub disease: String,
    pub stage: u32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            seed: 1337,
            duration_secs: 600.0,
            grid: 5,
            spacing: 1.0,
            disease: "common_cold".to_string(),
            stage: 1,
        }
    }
}

/// Outcome counts for one disease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiseaseTally {
    pub disease: String,
    pub name: String,
    /// Carriers still infected when the run ends.
    pub active: usize,
    /// Distinct entities infected at any point.
    pub ever_infected: usize,
    pub cures: usize,
    pub blocked: usize,
    /// Stage to number of carriers currently at it.
    pub stages: BTreeMap<u32, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub duration_secs: f64,
    pub population: usize,
    pub patient_zero: EntityId,
    pub ticks: u64,
    pub diseases: Vec<DiseaseTally>,
}

#[derive(Default)]
struct Observed {
    infected: BTreeMap<String, BTreeSet<EntityId>>,
    cures: BTreeMap<String, usize>,
    blocked: BTreeMap<String, usize>,
}

impl Observed {
    fn record(&mut self, event: &DiseaseEvent) {
        match event {
            DiseaseEvent::Infected {
                entity, disease, ..
            } => {
                self.infected
                    .entry(disease.clone())
                    .or_default()
                    .insert(*entity);
            }
            DiseaseEvent::Cured { disease, .. } => {
                *self.cures.entry(disease.clone()).or_default() += 1;
            }
            DiseaseEvent::InfectionBlocked { disease, .. } => {
                *self.blocked.entry(disease.clone()).or_default() += 1;
            }
            _ => {}
        }
    }
}

/// Spawn a grid of mobs, infect one of them and run the engine for the requested time.
///
/// # Errors
///
/// Returns an error if the patient-zero disease is not in the engine's catalog.
pub fn run_simulation(
    engine: DiseaseEngine,
    options: &SimulationOptions,
) -> Result<SimulationReport, CommandError> {
    let mut session = Session::new(engine);
    let side = options.grid.max(1);
    let mut mobs = Vec::with_capacity(usize::from(side) * usize::from(side));
    for row in 0..side {
        for col in 0..side {
            let position = Position::new(
                f32::from(col) * options.spacing,
                f32::from(row) * options.spacing,
            );
            let id = session
                .world_mut()
                .spawn_mob(&format!("mob-{row}-{col}"), position);
            mobs.push(id);
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let patient_zero = mobs[rng.gen_range(0..mobs.len())];
    log::info!(
        "patient zero {patient_zero} infected with {} (seed {})",
        options.disease,
        options.seed
    );
    session.infect(
        &Target::Id(patient_zero),
        &options.disease,
        Some(options.stage),
    )?;

    let mut observed = Observed::default();
    let totals = session.advance_with(options.duration_secs, |_, event| observed.record(event));

    Ok(SimulationReport {
        seed: options.seed,
        duration_secs: options.duration_secs,
        population: mobs.len(),
        patient_zero,
        ticks: totals.ticks,
        diseases: tally(&session, &observed),
    })
}

fn tally(session: &Session, observed: &Observed) -> Vec<DiseaseTally> {
    let engine = session.engine();
    let mut tallies: BTreeMap<String, DiseaseTally> = BTreeMap::new();
    for (_, carrier) in engine.carriers() {
        for (disease, stage) in &carrier.diseases {
            let entry = tallies.entry(disease.clone()).or_default();
            entry.active += 1;
            *entry.stages.entry(*stage).or_default() += 1;
        }
    }
    for (disease, entities) in &observed.infected {
        tallies.entry(disease.clone()).or_default().ever_infected = entities.len();
    }
    for (disease, cures) in &observed.cures {
        tallies.entry(disease.clone()).or_default().cures = *cures;
    }
    for (disease, blocked) in &observed.blocked {
        tallies.entry(disease.clone()).or_default().blocked = *blocked;
    }
    tallies
        .into_iter()
        .map(|(id, mut entry)| {
            entry.name = engine
                .catalog()
                .disease(&id)
                .map_or_else(|| id.clone(), |def| def.name.clone());
            entry.disease = id;
            entry
        })
        .collect()
}
