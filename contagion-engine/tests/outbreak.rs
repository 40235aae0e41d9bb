use contagion_engine::{
    BundledData, DiseaseEngine, EngineConfig, EngineFactory, EntityId, JournalEntry, Position,
    ReportKind, SandboxWorld, render_report,
};

fn grid(world: &mut SandboxWorld, side: u16) -> Vec<EntityId> {
    let mut mobs = Vec::new();
    for row in 0..side {
        for col in 0..side {
            let position = Position::new(f32::from(col), f32::from(row));
            mobs.push(world.spawn_mob(&format!("mob-{row}-{col}"), position));
        }
    }
    mobs
}

fn run(seed: u64) -> (DiseaseEngine, SandboxWorld) {
    let mut world = SandboxWorld::new();
    let mobs = grid(&mut world, 5);
    let mut engine = EngineFactory::new(BundledData).build_seeded(seed).unwrap();
    engine.infect(&world, mobs[12], "common_cold", 3);
    engine.infect(&world, mobs[0], "space_flu", 2);
    let mut now = 0.0;
    while now < 300.0 {
        now += 1.0;
        engine.update(&mut world, now);
        world.advance(1.0);
    }
    (engine, world)
}

#[test]
fn same_seed_replays_identically() {
    let (mut first, first_world) = run(0xC0FFEE);
    let (mut second, second_world) = run(0xC0FFEE);
    assert_eq!(first.drain_events(), second.drain_events());
    let a: Vec<_> = first.carriers().map(|(id, c)| (id, c.clone())).collect();
    let b: Vec<_> = second.carriers().map(|(id, c)| (id, c.clone())).collect();
    assert_eq!(a, b);
    assert_eq!(first_world.journal(), second_world.journal());
}

#[test]
fn outbreak_keeps_stages_in_bounds() {
    let (engine, _) = run(7);
    for (_, carrier) in engine.carriers() {
        for (disease, stage) in &carrier.diseases {
            let def = engine.catalog().disease(disease).unwrap();
            assert!(*stage >= 1 && *stage <= def.max_stage());
        }
        for immunity in carrier.immunities.values() {
            assert!((0.0..=1.0).contains(immunity));
        }
    }
}

#[test]
fn sampled_carrier_renders_report() {
    let mut world = SandboxWorld::new();
    let mob = world.spawn_mob("patient", Position::new(0.0, 0.0));
    let mut engine = DiseaseEngine::with_default_catalog();
    engine.infect(&world, mob, "space_flu", 2);
    let sample = engine.sample(mob, world.name(mob).map(str::to_string));
    let text = render_report(engine.catalog(), &sample, ReportKind::Diagnoser);
    assert!(text.contains("Subject: patient"));
    assert!(text.contains("Space Flu (space_flu), stage 2 of 3"));
    assert!(text.contains("Spaceacillin"));

    assert!(engine.vaccinate(&mut world, mob, "space_flu"));
    assert!(matches!(
        world.journal().last(),
        Some(JournalEntry::Popup { .. })
    ));
    let cleared = render_report(engine.catalog(), &engine.sample(mob, None), ReportKind::Analyzer);
    assert!(cleared.contains("No pathogens detected."));
}

#[test]
fn config_overrides_flow_into_engine() {
    let config = EngineConfig::from_json(r#"{ "seed": 42, "tick_interval_secs": 1.0 }"#).unwrap();
    let engine = DiseaseEngine::new(
        std::sync::Arc::new(contagion_engine::DiseaseCatalog::default_catalog().clone()),
        config,
    );
    assert_eq!(engine.config().seed, 42);
    assert!((engine.config().tick_interval_secs - 1.0).abs() < f64::EPSILON);
}
