//! Steering behaviors as pure force contributions.
//!
//! Every behavior takes read-only population state and returns one force per
//! particle, in particle order. Callers sum the contributions in a fixed
//! order and hand the total to the integrator, so each behavior can be tested
//! on its own.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An axis-aligned box, one `[min, max]` pair per axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// A box from `min` to `max`.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// A cube from `-half_extent` to `+half_extent` on every axis.
    pub fn cube(half_extent: f32) -> Self {
        Self {
            min: Vec3::splat(-half_extent),
            max: Vec3::splat(half_extent),
        }
    }

    /// Midpoint of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Whether `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Whether `point` lies inside or on the boundary.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// This box grown by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }
}

/// Arithmetic mean of `points`, or zero for an empty slice.
pub fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

/// Pull toward `target`, proportional to the offset.
pub fn seek(positions: &[Vec3], target: Vec3, gain: f32) -> Vec<Vec3> {
    positions.iter().map(|&p| (target - p) * gain).collect()
}

/// Pull toward the population centroid.
pub fn cohesion(positions: &[Vec3], centroid: Vec3, gain: f32) -> Vec<Vec3> {
    seek(positions, centroid, gain)
}

/// Push every particle away from each other particle closer than `radius`.
///
/// Quadratic in the population size.
pub fn separation(positions: &[Vec3], radius: f32, gain: f32) -> Vec<Vec3> {
    let radius_sq = radius * radius;
    positions
        .iter()
        .enumerate()
        .map(|(i, &pi)| {
            positions
                .iter()
                .enumerate()
                .filter(|&(j, &pj)| i != j && pi.distance_squared(pj) <= radius_sq)
                .map(|(_, &pj)| (pi - pj) * gain)
                .sum::<Vec3>()
        })
        .collect()
}

/// Pull every velocity toward the population's mean velocity.
pub fn alignment(velocities: &[Vec3], gain: f32) -> Vec<Vec3> {
    let mean = centroid(velocities);
    velocities.iter().map(|&v| (mean - v) * gain).collect()
}

/// Push particles within `radius` of `point` directly away from it.
///
/// Returns the forces and whether any particle was inside the radius.
/// A particle exactly at `point` gets no force.
pub fn avoid_point(positions: &[Vec3], point: Vec3, radius: f32, gain: f32) -> (Vec<Vec3>, bool) {
    let radius_sq = radius * radius;
    let mut triggered = false;
    let forces = positions
        .iter()
        .map(|&p| {
            let away = p - point;
            if away.length_squared() > radius_sq {
                return Vec3::ZERO;
            }
            triggered = true;
            away.normalize_or_zero() * gain
        })
        .collect();
    (forces, triggered)
}

/// Push particles back inside `bounds` once they come within `margin` of a
/// face, proportional to how deep they are into the margin.
///
/// Each axis is handled independently with its own gain.
pub fn avoid_walls(positions: &[Vec3], bounds: &Bounds, margin: f32, axis_gain: Vec3) -> Vec<Vec3> {
    let inner_min = bounds.min + Vec3::splat(margin);
    let inner_max = bounds.max - Vec3::splat(margin);
    positions
        .iter()
        .map(|&p| {
            let below = (inner_min - p).max(Vec3::ZERO);
            let above = (p - inner_max).max(Vec3::ZERO);
            (below - above) * axis_gain
        })
        .collect()
}

/// Clamp a velocity's magnitude to `max_speed`.
pub fn clamp_speed(velocity: Vec3, max_speed: f32) -> Vec3 {
    velocity.clamp_length_max(max_speed.max(0.0))
}

/// Add `contribution` to `total` element-wise.
pub fn accumulate(total: &mut [Vec3], contribution: &[Vec3]) {
    for (t, c) in total.iter_mut().zip(contribution) {
        *t += *c;
    }
}
