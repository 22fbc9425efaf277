//! Swaying kelp strand.
//!
//! A strand is a vertical chain of particles anchored at the sea floor and
//! joined by spring-dampers. Buoyancy keeps it upright while a time-varying
//! Perlin current pushes it sideways. After every tick the particle positions
//! are copied into a [`Curve`] that the tube-mesh collaborator sweeps.

use glam::{Mat4, Vec3};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::{AgentKind, SceneAgent, SceneRegistry, MAX_TICK_DT};
use crate::curve::Curve;
use crate::error::SimError;
use crate::particle::{Integrator, Particle};
use crate::render::{DrawSink, FrameUniforms, Material, RenderTarget, Topology};
use crate::spring::SpringDamper;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KelpConfig {
    /// Anchor point on the sea floor.
    pub base: Vec3,
    /// Number of springs in the chain; the strand has one more particle.
    pub segments: usize,
    pub segment_length: f32,
    /// Mass of each free particle.
    pub mass: f32,
    pub stiffness: f32,
    pub damping: f32,
    /// Upward acceleration applied to every free particle.
    pub buoyancy: f32,
    /// Linear water drag on every free particle.
    pub drag: f32,
    /// Spatial frequency of the current.
    pub noise_scale: f32,
    /// Temporal frequency of the current.
    pub noise_speed: f32,
    pub noise_strength: f32,
    pub seed: u32,
}

impl Default for KelpConfig {
    fn default() -> Self {
        Self {
            base: Vec3::new(3.0, -14.0, 2.0),
            segments: 8,
            segment_length: 1.0,
            mass: 0.2,
            stiffness: 40.0,
            damping: 0.8,
            buoyancy: 2.0,
            drag: 0.3,
            noise_scale: 0.15,
            noise_speed: 0.3,
            noise_strength: 1.5,
            seed: 7,
        }
    }
}

/// Two decorrelated Perlin fields, one per horizontal axis.
#[derive(Clone, Debug)]
struct Current {
    noise_x: Perlin,
    noise_z: Perlin,
}

impl Current {
    fn new(seed: u32) -> Self {
        Self {
            noise_x: Perlin::new(seed),
            noise_z: Perlin::new(seed.wrapping_add(1)),
        }
    }

    fn sample(&self, point: [f64; 3]) -> Vec3 {
        Vec3::new(
            self.noise_x.get(point) as f32,
            0.0,
            self.noise_z.get(point) as f32,
        )
    }
}

#[derive(Clone, Debug)]
pub struct Kelp {
    config: KelpConfig,
    particles: Vec<Particle>,
    springs: Vec<SpringDamper>,
    current: Current,
    curve: Curve,
    time: f32,
}

impl Kelp {
    /// Build an upright strand of `segments + 1` particles above `config.base`.
    pub fn new(config: KelpConfig) -> Result<Self, SimError> {
        let segments = config.segments.max(1);

        let mut particles = Vec::with_capacity(segments + 1);
        for i in 0..=segments {
            let position = config.base + Vec3::Y * (i as f32 * config.segment_length);
            let particle = Particle::new(config.mass, position, Integrator::SymplecticEuler);
            particles.push(if i == 0 { particle.anchored() } else { particle });
        }

        let springs = (0..segments)
            .map(|i| SpringDamper::new(&particles, i, i + 1, config.stiffness, config.damping, -1.0))
            .collect::<Result<Vec<_>, _>>()?;

        let curve = Curve::from_positions(particles.iter().map(Particle::position));
        let current = Current::new(config.seed);

        Ok(Self {
            config,
            particles,
            springs,
            current,
            curve,
            time: 0.0,
        })
    }

    /// Configuration the strand was built with.
    pub fn config(&self) -> &KelpConfig {
        &self.config
    }

    /// Chain particles from base to tip.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Centerline through the particles, refreshed every tick.
    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    /// Free end of the strand.
    pub fn tip(&self) -> Vec3 {
        self.particles
            .last()
            .map_or(self.config.base, Particle::position)
    }

    /// Seconds of current simulated so far.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Apply buoyancy, current and springs, integrate, then refresh the centerline.
    pub fn tick(&mut self, dt: f32) -> Result<(), SimError> {
        let dt = dt.min(MAX_TICK_DT);
        if dt <= 0.0 {
            return Ok(());
        }
        self.time += dt;

        let cfg = &self.config;
        let scale = f64::from(cfg.noise_scale);
        let t = f64::from(self.time * cfg.noise_speed);

        for particle in self.particles.iter_mut().filter(|p| !p.is_anchored()) {
            particle.add_acceleration(Vec3::Y * cfg.buoyancy);
            let p = particle.position();
            let sway = self.current.sample([
                f64::from(p.x) * scale,
                f64::from(p.y) * scale,
                t,
            ]);
            particle.add_force(sway * cfg.noise_strength - particle.velocity() * cfg.drag);
        }

        for spring in &self.springs {
            spring.apply(&mut self.particles);
        }

        for (i, particle) in self.particles.iter_mut().enumerate() {
            particle.update(dt);
            self.curve.set_point(i, particle.position())?;
        }
        Ok(())
    }
}

impl SceneAgent for Kelp {
    fn kind(&self) -> AgentKind {
        AgentKind::Kelp
    }

    fn update(&mut self, _registry: &SceneRegistry, _uniforms: &FrameUniforms, dt: f32) {
        if let Err(err) = self.tick(dt) {
            tracing::warn!(%err, "kelp centerline out of sync with particles");
        }
    }

    // Positions are already in world space; the mesh is swept along the curve.
    fn draw(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        sink.draw(
            RenderTarget::GBuffer,
            uniforms,
            Mat4::IDENTITY,
            Material::Kelp,
            Topology::TriangleStrip,
        );
    }

    fn draw_shadow(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        sink.draw(
            RenderTarget::Shadow,
            uniforms,
            Mat4::IDENTITY,
            Material::ShadowCaster,
            Topology::TriangleStrip,
        );
    }

    fn transforms(&self) -> Vec<Mat4> {
        vec![Mat4::IDENTITY]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingSink;

    fn still_water() -> KelpConfig {
        KelpConfig {
            noise_strength: 0.0,
            ..KelpConfig::default()
        }
    }

    #[test]
    fn test_chain_layout() {
        let kelp = Kelp::new(KelpConfig::default()).unwrap();
        let cfg = kelp.config();
        assert_eq!(kelp.particles().len(), cfg.segments + 1);
        assert_eq!(kelp.curve().len(), cfg.segments + 1);
        assert!(kelp.particles()[0].is_anchored());
        assert!(kelp.particles()[1..].iter().all(|p| !p.is_anchored()));
        assert_eq!(
            kelp.tip(),
            cfg.base + Vec3::Y * (cfg.segments as f32 * cfg.segment_length)
        );
    }

    #[test]
    fn test_zero_segments_still_builds_a_strand() {
        let kelp = Kelp::new(KelpConfig {
            segments: 0,
            ..KelpConfig::default()
        })
        .unwrap();
        assert_eq!(kelp.particles().len(), 2);
        assert!(kelp.curve().position(0.5).is_ok());
    }

    #[test]
    fn test_base_stays_anchored() {
        let mut kelp = Kelp::new(KelpConfig::default()).unwrap();
        let base = kelp.config().base;
        for _ in 0..300 {
            kelp.tick(0.02).unwrap();
        }
        assert_eq!(kelp.particles()[0].position(), base);
        assert_eq!(kelp.curve().points()[0].position, base);
    }

    #[test]
    fn test_still_water_stays_upright() {
        let mut kelp = Kelp::new(still_water()).unwrap();
        let base = kelp.config().base;
        for _ in 0..300 {
            kelp.tick(0.02).unwrap();
        }
        for particle in kelp.particles() {
            assert_eq!(particle.position().x, base.x);
            assert_eq!(particle.position().z, base.z);
            assert!(particle.position().y >= base.y);
        }
    }

    #[test]
    fn test_current_sways_the_tip() {
        let mut kelp = Kelp::new(KelpConfig::default()).unwrap();
        let base = kelp.config().base;
        for _ in 0..200 {
            kelp.tick(0.02).unwrap();
        }
        let tip = kelp.tip();
        let sway = Vec3::new(tip.x - base.x, 0.0, tip.z - base.z).length();
        assert!(sway > 1e-4);
    }

    #[test]
    fn test_sway_stays_bounded() {
        let mut kelp = Kelp::new(KelpConfig::default()).unwrap();
        let cfg = kelp.config().clone();
        let reach = cfg.segments as f32 * cfg.segment_length;
        for _ in 0..3000 {
            kelp.tick(1.0 / 60.0).unwrap();
        }
        for particle in kelp.particles() {
            assert!(particle.position().is_finite());
            assert!(particle.position().distance(cfg.base) < reach * 2.0);
        }
    }

    #[test]
    fn test_curve_tracks_particles() {
        let mut kelp = Kelp::new(KelpConfig::default()).unwrap();
        for _ in 0..50 {
            kelp.tick(0.02).unwrap();
        }
        for (particle, point) in kelp.particles().iter().zip(kelp.curve().points()) {
            assert_eq!(particle.position(), point.position);
        }
    }

    #[test]
    fn test_same_seed_same_motion() {
        let mut a = Kelp::new(KelpConfig::default()).unwrap();
        let mut b = Kelp::new(KelpConfig::default()).unwrap();
        for _ in 0..100 {
            a.tick(0.02).unwrap();
            b.tick(0.02).unwrap();
        }
        assert_eq!(a.tip(), b.tip());
    }

    #[test]
    fn test_draws_a_strip() {
        let kelp = Kelp::new(KelpConfig::default()).unwrap();
        let mut sink = RecordingSink::new();
        let uniforms = FrameUniforms::default();
        kelp.draw(&mut sink, &uniforms);
        kelp.draw_shadow(&mut sink, &uniforms);
        assert_eq!(sink.count(RenderTarget::GBuffer, Material::Kelp), 1);
        assert_eq!(sink.count(RenderTarget::Shadow, Material::ShadowCaster), 1);
        assert_eq!(sink.calls[0].topology, Topology::TriangleStrip);
    }
}
