//! Spring-damper force law between two particles.
//!
//! A [`SpringDamper`] refers to its two ends by index into the population that
//! owns them, so the same element can be reapplied every tick without
//! borrowing the particles for longer than one call.

use glam::Vec3;

use crate::error::SimError;
use crate::particle::Particle;

/// Below this separation the spring direction is undefined and the element
/// applies no force.
pub const MIN_SPRING_LENGTH: f32 = 1e-6;

/// A binary spring plus damper between particles `a` and `b`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpringDamper {
    a: usize,
    b: usize,
    stiffness: f32,
    damping: f32,
    rest_length: f32,
}

impl SpringDamper {
    /// Connect `particles[a]` and `particles[b]`.
    ///
    /// A negative `rest_length` resolves to the current distance between the
    /// two particles.
    pub fn new(
        particles: &[Particle],
        a: usize,
        b: usize,
        stiffness: f32,
        damping: f32,
        rest_length: f32,
    ) -> Result<Self, SimError> {
        let len = particles.len();
        for index in [a, b] {
            if index >= len {
                return Err(SimError::ParticleIndex { index, len });
            }
        }

        let rest_length = if rest_length < 0.0 {
            particles[a].position().distance(particles[b].position())
        } else {
            rest_length
        };

        Ok(Self {
            a,
            b,
            stiffness,
            damping,
            rest_length,
        })
    }

    /// Particle indices of ends `a` and `b`.
    #[inline]
    pub fn ends(&self) -> (usize, usize) {
        (self.a, self.b)
    }

    /// Length at which the spring exerts no force.
    #[inline]
    pub fn rest_length(&self) -> f32 {
        self.rest_length
    }

    /// Change the rest length, clamped to be non-negative.
    pub fn set_rest_length(&mut self, rest_length: f32) {
        self.rest_length = rest_length.max(0.0);
    }

    /// Spring constant.
    #[inline]
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Damping constant along the spring axis.
    #[inline]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Force acting on end `b`. End `a` receives the negation.
    pub fn compute_force(&self, particles: &[Particle]) -> Vec3 {
        let p1 = &particles[self.a];
        let p2 = &particles[self.b];

        let d = p2.position() - p1.position();
        let length = d.length();
        if length < MIN_SPRING_LENGTH {
            return Vec3::ZERO;
        }
        let n = d / length;

        let spring = n * self.stiffness * (length - self.rest_length);
        let damper = n * self.damping * (p2.velocity() - p1.velocity()).dot(n);
        // Pulls b back toward a when stretched or separating.
        -(spring + damper)
    }

    /// Add the element's equal and opposite forces to both ends.
    pub fn apply(&self, particles: &mut [Particle]) {
        let force = self.compute_force(particles);
        particles[self.b].add_force(force);
        particles[self.a].add_force(-force);
    }
}
