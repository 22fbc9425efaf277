//! End-to-end scenarios across agents, water and the frame driver.

use glam::{Mat4, Vec3};
use reefsim::prelude::*;

// ============================================================================
// Flocking
// ============================================================================

#[test]
fn test_school_stays_inside_walls() {
    let bounds = Bounds::cube(10.0);
    let margin = 2.0;
    let config = SchoolConfig {
        count: 5,
        bounds,
        spawn_center: Vec3::ZERO,
        spawn_radius: 5.0,
        initial_speed: 4.0,
        wall_margin: margin,
        wall_gain: 10.0,
        max_speed: 4.0,
        behaviors: SchoolBehaviors {
            walls: true,
            speed_clamp: true,
            ..SchoolBehaviors::NONE
        },
        ..SchoolConfig::default()
    };
    let allowed = bounds.expanded(margin);

    for seed in 0..4 {
        let mut school = FishSchool::new(config.clone(), seed);
        for tick in 0..1000 {
            school.tick(&[], Vec3::splat(1000.0), 0.01);
            for p in school.positions() {
                assert!(allowed.contains(p), "seed {seed} tick {tick}: {p} escaped");
            }
        }
    }
}

#[test]
fn test_full_pipeline_stays_finite() {
    let mut school = FishSchool::new(SchoolConfig::default(), 11);
    let predators = [(AgentId(1), Vec3::new(0.0, -7.0, 0.0))];
    for _ in 0..2000 {
        school.tick(&predators, Vec3::new(0.0, -7.0, 2.0), 1.0 / 60.0);
    }
    for transform in school.transforms() {
        assert!(transform.is_finite());
    }
}

// ============================================================================
// Crabs
// ============================================================================

#[test]
fn test_crab_path_is_seeded_and_closed() {
    let config = CrabConfig {
        spawn: Vec3::new(2.0, -12.0, -3.0),
        seed: 1234,
        ..CrabConfig::default()
    };
    let a = Crab::generate_path(&config).unwrap();
    let b = Crab::generate_path(&config).unwrap();
    assert_eq!(a, b);

    assert_eq!(a.position(0.0).unwrap(), config.spawn);
    assert_eq!(a.position(1.0).unwrap(), config.spawn);

    let other = Crab::generate_path(&CrabConfig {
        seed: 4321,
        ..config.clone()
    })
    .unwrap();
    assert_ne!(a, other);
}

#[test]
fn test_crabs_with_same_seed_move_identically() {
    let config = CrabConfig::default();
    let mut a = Crab::new(config.clone());
    let mut b = Crab::new(config);
    for _ in 0..500 {
        a.tick(1.0 / 60.0).unwrap();
        b.tick(1.0 / 60.0).unwrap();
        assert_eq!(a.transform(), b.transform());
    }
}

#[test]
fn test_crab_returns_to_spawn_after_one_loop() {
    let config = CrabConfig {
        spawn: Vec3::new(-4.0, -12.0, 6.0),
        seed: 99,
        ..CrabConfig::default()
    };
    let mut crab = Crab::new(config.clone());
    crab.tick(0.0).unwrap();
    assert_eq!(crab.position(), config.spawn);

    let period = match crab.state() {
        CrabState::Following { speed_scale, .. } => *speed_scale,
        CrabState::Uninitialized => panic!("path not generated"),
    };
    let steps = 200;
    let dt = period / steps as f32;
    let mut farthest = 0.0f32;
    for _ in 0..steps {
        crab.tick(dt).unwrap();
        farthest = farthest.max(crab.position().distance(config.spawn));
    }
    assert!(farthest > 0.1, "crab never left spawn");
    // Crossing the wrap point lands back on the pinned spawn point.
    assert!(crab.position().distance(config.spawn) < 1e-2);

    // A second lap retraces the first.
    let lap_start = crab.position();
    for _ in 0..steps {
        crab.tick(dt).unwrap();
    }
    assert!(crab.position().distance(lap_start) < 1e-2);
}

#[test]
fn test_scene_survives_unvalidated_crab_extent() {
    let config = SceneConfig {
        crabs: vec![CrabConfig {
            path_extent: -1.0,
            ..CrabConfig::default()
        }],
        ..SceneConfig::default()
    };
    assert!(config.validate().is_err());

    // Building without validation must still not panic mid-frame.
    let mut scene = Scene::from_config(&config).unwrap();
    let mut uniforms = FrameUniforms::default();
    for _ in 0..10 {
        scene.frame(1.0 / 30.0, &mut uniforms);
    }
    let mut sink = RecordingSink::new();
    scene.draw(&mut sink, &uniforms);
    assert_eq!(sink.count(RenderTarget::GBuffer, Material::Crab), 1);
}

// ============================================================================
// Springs and integrators
// ============================================================================

#[test]
fn test_spring_pair_conserves_momentum() {
    let mut particles = vec![
        Particle::new(1.0, Vec3::ZERO, Integrator::SymplecticEuler),
        Particle::new(1.0, Vec3::new(2.0, 0.0, 0.0), Integrator::SymplecticEuler),
    ];
    let spring = SpringDamper::new(&particles, 0, 1, 20.0, 2.0, 1.0).unwrap();

    for _ in 0..500 {
        spring.apply(&mut particles);
        for p in &mut particles {
            p.update(0.01);
        }
        let momentum = particles[0].velocity() + particles[1].velocity();
        assert!(momentum.length() < 1e-4);
    }
    // Damping settles the pair near rest length.
    let length = particles[0].position().distance(particles[1].position());
    assert!((length - 1.0).abs() < 0.05);
}

// ============================================================================
// Scene
// ============================================================================

#[test]
fn test_scene_runs_with_cpu_water() {
    let config = SceneConfig {
        water_resolution: 32,
        ..SceneConfig::default()
    };
    let mut scene = Scene::from_config(&config).unwrap();
    scene.set_water(Box::new(CpuWaterSim::new(config.water_resolution)));

    let mut uniforms = FrameUniforms::new(
        Mat4::from_translation(Vec3::new(0.0, 4.0, 30.0)),
        Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0),
    );
    // Uneven frame times, including a stall.
    let frame_times = [1.0 / 60.0, 1.0 / 30.0, 1.0 / 144.0, 0.5, 1.0 / 60.0];
    let mut total_substeps = 0;
    for frame in 0..300 {
        let stats = scene.frame(frame_times[frame % frame_times.len()], &mut uniforms);
        assert!(stats.substeps <= config.max_substeps);
        total_substeps += stats.substeps;
    }
    assert!(total_substeps > 0);

    let mut sink = RecordingSink::new();
    scene.draw(&mut sink, &uniforms);
    assert!(!sink.calls.is_empty());
    for call in &sink.calls {
        assert!(call.transform.is_finite());
    }

    let steps = u64::from(config.water_steps_per_frame + 1) * 300;
    assert_eq!(
        scene.water().map(|w| w.operations()),
        Some(u64::from(config.initial_drops) + steps)
    );
}

#[test]
fn test_scene_from_json_config() {
    let config = SceneConfig::from_json(
        r#"{
            "fixed_dt": 0.01,
            "seed": 9,
            "schools": [{ "count": 8 }, { "count": 4, "spawn_center": [5.0, -6.0, 5.0] }],
            "predators": [],
            "crabs": [{ "seed": 77 }],
            "kelp": []
        }"#,
    )
    .unwrap();
    let mut scene = Scene::from_config(&config).unwrap();
    assert_eq!(scene.len(), 3);

    let mut uniforms = FrameUniforms::default();
    let stats = scene.frame(0.0501, &mut uniforms);
    assert_eq!(stats.substeps, 5);

    let mut sink = RecordingSink::new();
    scene.draw(&mut sink, &uniforms);
    assert_eq!(sink.count(RenderTarget::GBuffer, Material::Fish), 12);
    assert_eq!(sink.count(RenderTarget::GBuffer, Material::Crab), 1);
}
