//! Single hunting predator.
//!
//! A [`Predator`] chases the nearest prey school, is weakly pulled back to the
//! origin, keeps off the walls and away from other predators, and turns
//! smoothly by slerping a fixed fraction toward its direction of travel each
//! tick.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{AgentId, AgentKind, SceneAgent, SceneRegistry, FORWARD, MAX_TICK_DT};
use crate::orientation::{rotation_between, slerp};
use crate::particle::{Integrator, Particle};
use crate::render::{DrawSink, FrameUniforms, Material, RenderTarget, Topology};
use crate::steering::{self, Bounds};

/// Fraction of the remaining turn taken each tick.
pub const TURN_FRACTION: f32 = 0.05;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredatorConfig {
    pub spawn: Vec3,
    pub mass: f32,
    pub bounds: Bounds,
    pub hunt_gain: f32,
    pub origin_gain: f32,
    pub wall_margin: f32,
    pub wall_gain: f32,
    pub separation_radius: f32,
    pub separation_gain: f32,
    pub max_speed: f32,
    pub scale: f32,
}

impl Default for PredatorConfig {
    fn default() -> Self {
        Self {
            spawn: Vec3::new(15.0, -6.0, 15.0),
            mass: 4.0,
            bounds: Bounds::new(Vec3::new(-25.0, -12.0, -25.0), Vec3::new(25.0, -2.0, 25.0)),
            hunt_gain: 6.0,
            origin_gain: 0.02,
            wall_margin: 3.0,
            wall_gain: 4.0,
            separation_radius: 6.0,
            separation_gain: 3.0,
            max_speed: 4.0,
            scale: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Predator {
    id: Option<AgentId>,
    config: PredatorConfig,
    body: Particle,
    orientation: Quat,
}

impl Predator {
    /// A predator at rest at its spawn point.
    pub fn new(config: PredatorConfig) -> Self {
        let body = Particle::new(config.mass, config.spawn, Integrator::SymplecticEuler);
        Self {
            id: None,
            config,
            body,
            orientation: Quat::IDENTITY,
        }
    }

    /// Configuration the predator was built with.
    pub fn config(&self) -> &PredatorConfig {
        &self.config
    }

    /// The predator's particle.
    pub fn body(&self) -> &Particle {
        &self.body
    }

    /// Current position.
    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    /// Smoothed heading.
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Override the current velocity.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.body.set_velocity(velocity);
    }

    /// Sum of this tick's forces, in pipeline order.
    fn steering_force(&self, registry: &SceneRegistry) -> Vec3 {
        let cfg = &self.config;
        let here = [self.body.position()];
        let mut force = Vec3::ZERO;

        if let Some(target) = registry.nearest_school(here[0]) {
            force += (target - here[0]).normalize_or_zero() * cfg.hunt_gain;
        }
        force += steering::seek(&here, Vec3::ZERO, cfg.origin_gain)[0];
        force += steering::avoid_walls(&here, &cfg.bounds, cfg.wall_margin, Vec3::splat(cfg.wall_gain))[0];

        for &(other_id, other) in registry.predators() {
            if Some(other_id) == self.id {
                continue;
            }
            if here[0].distance(other) <= cfg.separation_radius {
                force += (here[0] - other) * cfg.separation_gain;
            }
        }
        force
    }

    /// Run one tick of hunting, avoidance and integration against `registry`.
    pub fn tick(&mut self, registry: &SceneRegistry, dt: f32) {
        let dt = dt.min(MAX_TICK_DT);
        if dt <= 0.0 {
            return;
        }

        let force = self.steering_force(registry);
        self.body.add_force(force);
        if self.body.velocity().length() > self.config.max_speed {
            self.body
                .set_velocity(steering::clamp_speed(self.body.velocity(), self.config.max_speed));
        }
        self.body.update(dt);

        if self.body.velocity().length_squared() > f32::EPSILON {
            let target = rotation_between(FORWARD, self.body.velocity());
            self.orientation = slerp(self.orientation, target, TURN_FRACTION);
        }
    }
}

impl SceneAgent for Predator {
    fn kind(&self) -> AgentKind {
        AgentKind::Predator
    }

    fn attach(&mut self, id: AgentId) {
        self.id = Some(id);
    }

    fn publish(&self, registry: &mut SceneRegistry) {
        if let Some(id) = self.id {
            registry.publish_predator(id, self.body.position());
        }
    }

    fn update(&mut self, registry: &SceneRegistry, _uniforms: &FrameUniforms, dt: f32) {
        self.tick(registry, dt);
    }

    fn draw(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        for transform in self.transforms() {
            sink.draw(
                RenderTarget::GBuffer,
                uniforms,
                transform,
                Material::Shark,
                Topology::TriangleList,
            );
        }
    }

    fn draw_shadow(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        for transform in self.transforms() {
            sink.draw(
                RenderTarget::Shadow,
                uniforms,
                transform,
                Material::ShadowCaster,
                Topology::TriangleList,
            );
        }
    }

    fn transforms(&self) -> Vec<Mat4> {
        vec![Mat4::from_scale_rotation_translation(
            Vec3::splat(self.config.scale),
            self.orientation,
            self.body.position(),
        )]
    }
}
