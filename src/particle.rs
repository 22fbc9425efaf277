//! Point masses and their integrators.
//!
//! A [`Particle`] accumulates forces during a tick and consumes them in
//! [`Particle::update`], which advances the state by one of three
//! [`Integrator`] policies and then clears the force.
//!
//! ```ignore
//! use reefsim::particle::{Integrator, Particle};
//!
//! let mut p = Particle::new(1.0, Vec3::ZERO, Integrator::SymplecticEuler);
//! p.add_force(Vec3::new(0.0, -9.8, 0.0));
//! p.update(0.01);
//! ```

use glam::Vec3;

/// Step used to back-fill `prev_position` after an external state change,
/// so Verlet sees a consistent implicit velocity.
pub const REFERENCE_DT: f32 = 0.01;

/// Integration policy used by [`Particle::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Integrator {
    /// Explicit Euler: position first, then velocity.
    Euler,
    /// Velocity first, then position. Stable for springs and steering.
    #[default]
    SymplecticEuler,
    /// Position Verlet using the previous position.
    Verlet,
}

/// A point mass with an ownership-free integration state.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    inv_mass: f32,
    position: Vec3,
    prev_position: Vec3,
    velocity: Vec3,
    force: Vec3,
    integrator: Integrator,
    anchored: bool,
}

impl Particle {
    /// Create a particle at rest.
    ///
    /// A non-positive `mass` gives an inverse mass of zero: forces are still
    /// accepted but produce no acceleration.
    pub fn new(mass: f32, position: Vec3, integrator: Integrator) -> Self {
        let inv_mass = if mass > f32::EPSILON { 1.0 / mass } else { 0.0 };
        Self {
            inv_mass,
            position,
            prev_position: position,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            integrator,
            anchored: false,
        }
    }

    /// Builder-style anchoring.
    pub fn anchored(mut self) -> Self {
        self.anchored = true;
        self
    }

    /// Current position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Position before the last update.
    #[inline]
    pub fn prev_position(&self) -> Vec3 {
        self.prev_position
    }

    /// Current velocity.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Force accumulated since the last update.
    #[inline]
    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Inverse mass; zero means immovable.
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Mass, or infinity when the inverse mass is zero.
    pub fn mass(&self) -> f32 {
        if self.inv_mass > 0.0 {
            1.0 / self.inv_mass
        } else {
            f32::INFINITY
        }
    }

    /// Integration scheme used by [`update`](Self::update).
    #[inline]
    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    /// Whether integration is skipped.
    #[inline]
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Pin or release the particle. Position and velocity are left as they are.
    pub fn set_anchored(&mut self, anchored: bool) {
        self.anchored = anchored;
    }

    /// Switch integration scheme for subsequent updates.
    pub fn set_integrator(&mut self, integrator: Integrator) {
        self.integrator = integrator;
    }

    /// Move the particle, keeping the current velocity.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.prev_position = position - self.velocity * REFERENCE_DT;
    }

    /// Replace the velocity, keeping the current position.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.prev_position = self.position - velocity * REFERENCE_DT;
    }

    /// Replace the accumulated force.
    pub fn set_force(&mut self, force: Vec3) {
        self.force = force;
    }

    /// Add to the accumulated force.
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Add the force that would produce `acceleration` on this particle.
    pub fn add_acceleration(&mut self, acceleration: Vec3) {
        if self.anchored || self.inv_mass == 0.0 {
            return;
        }
        self.force += acceleration * self.mass();
    }

    /// Advance by `dt` and clear the accumulated force.
    pub fn update(&mut self, dt: f32) {
        if !self.anchored && dt > 0.0 {
            let accel = self.force * self.inv_mass;
            match self.integrator {
                Integrator::Euler => {
                    self.prev_position = self.position;
                    self.position += self.velocity * dt;
                    self.velocity += accel * dt;
                }
                Integrator::SymplecticEuler => {
                    self.prev_position = self.position;
                    self.velocity += accel * dt;
                    self.position += self.velocity * dt;
                }
                Integrator::Verlet => {
                    let next = 2.0 * self.position - self.prev_position + accel * dt * dt;
                    self.velocity = (self.position - self.prev_position) / dt;
                    self.prev_position = self.position;
                    self.position = next;
                }
            }
        }
        self.force = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3, eps: f32) -> bool {
        (a - b).abs().max_element() <= eps
    }

    #[test]
    fn test_symplectic_inertial_drift() {
        let mut p = Particle::new(2.0, Vec3::new(1.0, 2.0, 3.0), Integrator::SymplecticEuler);
        let v = Vec3::new(0.5, -1.0, 2.0);
        p.set_velocity(v);

        let dt = 0.02;
        let mut expected = p.position();
        for _ in 0..50 {
            p.update(dt);
            expected += v * dt;
            assert_eq!(p.velocity(), v);
            assert!(approx(p.position(), expected, 1e-5));
        }
    }

    #[test]
    fn test_verlet_constant_force_matches_closed_form() {
        let start = Vec3::new(0.0, 10.0, 0.0);
        let mut p = Particle::new(2.0, start, Integrator::Verlet);
        let f = Vec3::new(1.0, -4.0, 0.5);
        let dt = 0.01;
        let n = 100;

        for _ in 0..n {
            p.add_force(f);
            p.update(dt);
        }

        // Position Verlet from rest reaches 0.5 a t^2 up to an O(dt) start-up term.
        let t = n as f32 * dt;
        let expected = start + 0.5 * f * p.inv_mass() * t * t;
        let tolerance = (f * p.inv_mass()).length() * dt * t;
        assert!(approx(p.position(), expected, tolerance));
    }

    #[test]
    fn test_euler_updates_position_before_velocity() {
        let mut p = Particle::new(1.0, Vec3::ZERO, Integrator::Euler);
        p.add_force(Vec3::X);
        p.update(1.0);
        assert_eq!(p.position(), Vec3::ZERO);
        assert_eq!(p.velocity(), Vec3::X);
    }

    #[test]
    fn test_symplectic_updates_velocity_before_position() {
        let mut p = Particle::new(1.0, Vec3::ZERO, Integrator::SymplecticEuler);
        p.add_force(Vec3::X);
        p.update(1.0);
        assert_eq!(p.position(), Vec3::X);
        assert_eq!(p.velocity(), Vec3::X);
    }

    #[test]
    fn test_force_cleared_after_update() {
        let mut p = Particle::new(1.0, Vec3::ZERO, Integrator::SymplecticEuler);
        p.add_force(Vec3::ONE);
        p.add_force(Vec3::ONE);
        assert_eq!(p.force(), Vec3::splat(2.0));
        p.update(0.1);
        assert_eq!(p.force(), Vec3::ZERO);
    }

    #[test]
    fn test_anchored_particle_discards_force() {
        let start = Vec3::new(3.0, 0.0, 0.0);
        let mut p = Particle::new(1.0, start, Integrator::Verlet).anchored();
        p.add_force(Vec3::new(100.0, 0.0, 0.0));
        p.update(0.1);
        assert_eq!(p.position(), start);
        assert_eq!(p.velocity(), Vec3::ZERO);
        assert_eq!(p.force(), Vec3::ZERO);
    }

    #[test]
    fn test_add_acceleration_scales_by_mass() {
        let mut p = Particle::new(4.0, Vec3::ZERO, Integrator::SymplecticEuler);
        p.add_acceleration(Vec3::Y);
        assert_eq!(p.force(), Vec3::new(0.0, 4.0, 0.0));

        let mut anchored = Particle::new(4.0, Vec3::ZERO, Integrator::SymplecticEuler).anchored();
        anchored.add_acceleration(Vec3::Y);
        assert_eq!(anchored.force(), Vec3::ZERO);
    }

    #[test]
    fn test_set_velocity_backfills_prev_position() {
        let mut p = Particle::new(1.0, Vec3::ZERO, Integrator::Verlet);
        p.set_velocity(Vec3::new(2.0, 0.0, 0.0));
        assert!(approx(p.prev_position(), Vec3::new(-2.0 * REFERENCE_DT, 0.0, 0.0), 1e-7));

        // Verlet without force continues with the imposed velocity.
        p.update(REFERENCE_DT);
        assert!(approx(p.position(), Vec3::new(2.0 * REFERENCE_DT, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_zero_mass_is_infinite() {
        let mut p = Particle::new(0.0, Vec3::ZERO, Integrator::SymplecticEuler);
        assert_eq!(p.inv_mass(), 0.0);
        assert!(p.mass().is_infinite());
        p.add_force(Vec3::ONE);
        p.update(1.0);
        assert_eq!(p.position(), Vec3::ZERO);
    }

    #[test]
    fn test_non_positive_dt_only_clears_force() {
        let mut p = Particle::new(1.0, Vec3::ONE, Integrator::Euler);
        p.set_velocity(Vec3::X);
        p.add_force(Vec3::Y);
        p.update(0.0);
        assert_eq!(p.position(), Vec3::ONE);
        assert_eq!(p.velocity(), Vec3::X);
        assert_eq!(p.force(), Vec3::ZERO);
    }
}
