//! Flocking fish school.
//!
//! A [`FishSchool`] owns its particles and runs a fixed pipeline of steering
//! behaviors every tick: cohesion, home pull, separation, alignment, camera
//! avoidance, predator avoidance, wall avoidance, then a post-hoc speed clamp
//! before symplectic integration.

use glam::{Mat4, Quat, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{AgentId, AgentKind, SceneAgent, SceneRegistry, FORWARD, MAX_TICK_DT};
use crate::orientation::rotation_between;
use crate::particle::{Integrator, Particle};
use crate::render::{DrawSink, FrameUniforms, Material, RenderTarget, Topology};
use crate::steering::{self, Bounds};

/// Which behaviors contribute to the force pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolBehaviors {
    pub cohesion: bool,
    pub home: bool,
    pub separation: bool,
    pub alignment: bool,
    pub camera: bool,
    pub predators: bool,
    pub walls: bool,
    pub speed_clamp: bool,
}

impl SchoolBehaviors {
    /// Every behavior enabled.
    pub const ALL: Self = Self {
        cohesion: true,
        home: true,
        separation: true,
        alignment: true,
        camera: true,
        predators: true,
        walls: true,
        speed_clamp: true,
    };

    /// Every behavior disabled.
    pub const NONE: Self = Self {
        cohesion: false,
        home: false,
        separation: false,
        alignment: false,
        camera: false,
        predators: false,
        walls: false,
        speed_clamp: false,
    };
}

impl Default for SchoolBehaviors {
    fn default() -> Self {
        Self::ALL
    }
}

/// Population size, geometry and gains of a school.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolConfig {
    pub count: usize,
    pub bounds: Bounds,
    /// Home point the school is pulled back toward.
    pub spawn_center: Vec3,
    pub spawn_radius: f32,
    pub initial_speed: f32,
    pub mass: f32,
    pub cohesion_gain: f32,
    pub home_gain: f32,
    pub separation_radius: f32,
    pub separation_gain: f32,
    pub alignment_gain: f32,
    pub camera_radius: f32,
    pub camera_gain: f32,
    pub predator_radius: f32,
    pub predator_gain: f32,
    pub wall_margin: f32,
    pub wall_gain: f32,
    /// Multiplier on `wall_gain` for the vertical axis.
    pub vertical_wall_multiplier: f32,
    pub max_speed: f32,
    pub chased_max_speed: f32,
    /// Uniform scale of each fish mesh.
    pub fish_scale: f32,
    pub behaviors: SchoolBehaviors,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            count: 30,
            bounds: Bounds::new(Vec3::new(-20.0, -12.0, -20.0), Vec3::new(20.0, -2.0, 20.0)),
            spawn_center: Vec3::new(0.0, -7.0, 0.0),
            spawn_radius: 3.0,
            initial_speed: 1.0,
            mass: 1.0,
            cohesion_gain: 0.3,
            home_gain: 0.05,
            separation_radius: 1.0,
            separation_gain: 2.0,
            alignment_gain: 0.5,
            camera_radius: 3.0,
            camera_gain: 8.0,
            predator_radius: 8.0,
            predator_gain: 15.0,
            wall_margin: 2.0,
            wall_gain: 4.0,
            vertical_wall_multiplier: 5.0,
            max_speed: 3.0,
            chased_max_speed: 6.0,
            fish_scale: 0.3,
            behaviors: SchoolBehaviors::ALL,
        }
    }
}

/// A population of fish steered as one flock.
#[derive(Clone, Debug)]
pub struct FishSchool {
    id: Option<AgentId>,
    config: SchoolConfig,
    particles: Vec<Particle>,
    centroid: Vec3,
    chased: bool,
}

impl FishSchool {
    /// Spawn `config.count` fish around the spawn center with random headings.
    pub fn new(config: SchoolConfig, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let particles = (0..config.count)
            .map(|_| {
                let offset = random_unit(&mut rng) * config.spawn_radius * rng.gen::<f32>().cbrt();
                let mut p = Particle::new(
                    config.mass,
                    config.spawn_center + offset,
                    Integrator::SymplecticEuler,
                );
                p.set_velocity(random_unit(&mut rng) * config.initial_speed);
                p
            })
            .collect();
        Self::from_particles(config, particles)
    }

    /// Build a school from explicit starting states.
    pub fn from_states(config: SchoolConfig, states: &[(Vec3, Vec3)]) -> Self {
        let particles = states
            .iter()
            .map(|&(position, velocity)| {
                let mut p = Particle::new(config.mass, position, Integrator::SymplecticEuler);
                p.set_velocity(velocity);
                p
            })
            .collect();
        Self::from_particles(config, particles)
    }

    fn from_particles(config: SchoolConfig, particles: Vec<Particle>) -> Self {
        let positions: Vec<Vec3> = particles.iter().map(Particle::position).collect();
        Self {
            id: None,
            centroid: steering::centroid(&positions),
            config,
            particles,
            chased: false,
        }
    }

    /// Configuration the school was built with.
    pub fn config(&self) -> &SchoolConfig {
        &self.config
    }

    /// One particle per fish, in spawn order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Centroid computed at the start of the last tick.
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    /// Whether a predator was inside the avoidance radius last tick.
    pub fn is_chased(&self) -> bool {
        self.chased
    }

    /// Fish positions, in particle order.
    pub fn positions(&self) -> Vec<Vec3> {
        self.particles.iter().map(Particle::position).collect()
    }

    /// Run one tick of the behavior pipeline and integrate.
    pub fn tick(&mut self, predators: &[(AgentId, Vec3)], camera: Vec3, dt: f32) {
        let dt = dt.min(MAX_TICK_DT);
        if dt <= 0.0 || self.particles.is_empty() {
            return;
        }

        let cfg = &self.config;
        let on = cfg.behaviors;
        let positions = self.positions();
        let velocities: Vec<Vec3> = self.particles.iter().map(Particle::velocity).collect();

        self.centroid = steering::centroid(&positions);
        self.chased = false;

        let mut forces = vec![Vec3::ZERO; positions.len()];
        if on.cohesion {
            steering::accumulate(
                &mut forces,
                &steering::cohesion(&positions, self.centroid, cfg.cohesion_gain),
            );
        }
        if on.home {
            steering::accumulate(
                &mut forces,
                &steering::seek(&positions, cfg.spawn_center, cfg.home_gain),
            );
        }
        if on.separation {
            steering::accumulate(
                &mut forces,
                &steering::separation(&positions, cfg.separation_radius, cfg.separation_gain),
            );
        }
        if on.alignment {
            steering::accumulate(&mut forces, &steering::alignment(&velocities, cfg.alignment_gain));
        }
        if on.camera {
            let (push, _) =
                steering::avoid_point(&positions, camera, cfg.camera_radius, cfg.camera_gain);
            steering::accumulate(&mut forces, &push);
        }
        if on.predators {
            for &(_, predator) in predators {
                let (push, hit) = steering::avoid_point(
                    &positions,
                    predator,
                    cfg.predator_radius,
                    cfg.predator_gain,
                );
                steering::accumulate(&mut forces, &push);
                self.chased |= hit;
            }
        }
        if on.walls {
            let gain = Vec3::new(
                cfg.wall_gain,
                cfg.wall_gain * cfg.vertical_wall_multiplier,
                cfg.wall_gain,
            );
            steering::accumulate(
                &mut forces,
                &steering::avoid_walls(&positions, &cfg.bounds, cfg.wall_margin, gain),
            );
        }

        let max_speed = if self.chased {
            cfg.chased_max_speed
        } else {
            cfg.max_speed
        };
        for (particle, force) in self.particles.iter_mut().zip(forces) {
            particle.add_force(force);
            if on.speed_clamp && particle.velocity().length() > max_speed {
                particle.set_velocity(steering::clamp_speed(particle.velocity(), max_speed));
            }
            particle.update(dt);
        }
    }

    /// Per-fish orientation: the rotation taking [`FORWARD`] onto the velocity.
    pub fn orientations(&self) -> Vec<Quat> {
        self.particles
            .iter()
            .map(|p| rotation_between(FORWARD, p.velocity()))
            .collect()
    }
}

fn random_unit(rng: &mut SmallRng) -> Vec3 {
    let theta = rng.gen_range(0.0..std::f32::consts::TAU);
    let z: f32 = rng.gen_range(-1.0..1.0);
    let r = (1.0 - z * z).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

impl SceneAgent for FishSchool {
    fn kind(&self) -> AgentKind {
        AgentKind::School
    }

    fn attach(&mut self, id: AgentId) {
        self.id = Some(id);
    }

    fn publish(&self, registry: &mut SceneRegistry) {
        if let Some(id) = self.id {
            registry.publish_school(id, self.centroid);
        }
    }

    fn update(&mut self, registry: &SceneRegistry, uniforms: &FrameUniforms, dt: f32) {
        self.tick(registry.predators(), uniforms.camera_position(), dt);
    }

    fn draw(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        sink.draw_instanced(
            RenderTarget::GBuffer,
            uniforms,
            &self.transforms(),
            Material::Fish,
            Topology::TriangleList,
        );
    }

    fn draw_shadow(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        sink.draw_instanced(
            RenderTarget::Shadow,
            uniforms,
            &self.transforms(),
            Material::ShadowCaster,
            Topology::TriangleList,
        );
    }

    fn transforms(&self) -> Vec<Mat4> {
        let scale = Vec3::splat(self.config.fish_scale);
        self.particles
            .iter()
            .zip(self.orientations())
            .map(|(p, rotation)| Mat4::from_scale_rotation_translation(scale, rotation, p.position()))
            .collect()
    }
}
