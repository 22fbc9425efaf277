//! Path-following crab.
//!
//! A crab does not integrate forces. On its first tick it generates a closed,
//! level Hermite loop through its spawn point; afterwards it samples that loop
//! by elapsed time and faces along the path.

use glam::{Mat4, Quat, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{AgentKind, SceneAgent, SceneRegistry};
use crate::curve::{Curve, ARC_LENGTH_SAMPLES};
use crate::error::CurveError;
use crate::orientation::yaw_between;
use crate::render::{DrawSink, FrameUniforms, Material, RenderTarget, Topology};

/// Model-space heading of the crab mesh.
pub const HEADING: Vec3 = Vec3::Z;

/// Below this speed scale the path is treated as a point.
const MIN_SPEED_SCALE: f32 = 1e-4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabConfig {
    pub spawn: Vec3,
    /// Interior control points are placed within this horizontal offset.
    /// Negative values act as their magnitude; non-finite values as zero.
    pub path_extent: f32,
    /// Divisor of the path's arc length. The quotient is the loop period in
    /// seconds, so a budget of 1 walks the loop at one unit per second and
    /// larger budgets loop faster.
    pub loop_time_budget: f32,
    pub seed: u64,
    pub scale: f32,
}

impl Default for CrabConfig {
    fn default() -> Self {
        Self {
            spawn: Vec3::new(0.0, -12.0, 0.0),
            path_extent: 6.0,
            loop_time_budget: 1.0,
            seed: 0x00C0_FFEE,
            scale: 0.5,
        }
    }
}

/// Lifecycle of a crab's path.
#[derive(Clone, Debug, PartialEq)]
pub enum CrabState {
    /// No path generated yet.
    Uninitialized,
    /// Looping over `path`.
    Following {
        path: Curve,
        /// Path arc length divided by the loop time budget; the loop period
        /// in seconds.
        speed_scale: f32,
        /// Seconds spent following.
        elapsed: f32,
    },
}

#[derive(Clone, Debug)]
pub struct Crab {
    config: CrabConfig,
    state: CrabState,
    yaw: f32,
    transform: Mat4,
}

impl Crab {
    /// A crab resting at its spawn point. The path is generated on the first tick.
    pub fn new(config: CrabConfig) -> Self {
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(config.scale),
            Quat::IDENTITY,
            config.spawn,
        );
        Self {
            config,
            state: CrabState::Uninitialized,
            yaw: 0.0,
            transform,
        }
    }

    /// Path lifecycle state.
    pub fn state(&self) -> &CrabState {
        &self.state
    }

    /// World transform from the last tick.
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// World position from the last tick.
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// Heading angle about +Y, in radians.
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Generate the closed loop: 3 to 6 points, first and last pinned to the
    /// spawn point, tangents flattened onto the horizontal plane.
    pub fn generate_path(config: &CrabConfig) -> Result<Curve, CurveError> {
        let extent = if config.path_extent.is_finite() {
            config.path_extent.abs()
        } else {
            0.0
        };
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let count: usize = rng.gen_range(3..=6);

        let mut path = Curve::new();
        path.add_point(config.spawn);
        for _ in 1..count - 1 {
            let offset = Vec3::new(
                rng.gen_range(-extent..=extent),
                0.0,
                rng.gen_range(-extent..=extent),
            );
            path.add_point(config.spawn + offset);
        }
        path.add_point(config.spawn);

        for i in 0..path.len() {
            let tangent = path.point_tangent(i)?;
            path.set_tangent(i, Some(Vec3::new(tangent.x, 0.0, tangent.z)))?;
        }
        Ok(path)
    }

    fn start_following(&mut self) -> Result<(), CurveError> {
        let path = Self::generate_path(&self.config)?;
        let speed_scale = path.arc_length(ARC_LENGTH_SAMPLES)? / self.config.loop_time_budget;
        tracing::debug!(points = path.len(), speed_scale, "crab path generated");
        self.state = CrabState::Following {
            path,
            speed_scale,
            elapsed: 0.0,
        };
        Ok(())
    }

    /// Advance along the loop by `dt` seconds, generating the path first if needed.
    ///
    /// On error the transform keeps its previous value.
    pub fn tick(&mut self, dt: f32) -> Result<(), CurveError> {
        if matches!(self.state, CrabState::Uninitialized) {
            self.start_following()?;
        }
        let CrabState::Following {
            path,
            speed_scale,
            elapsed,
        } = &mut self.state
        else {
            return Ok(());
        };

        if *speed_scale < MIN_SPEED_SCALE {
            return Ok(());
        }
        *elapsed += dt.max(0.0);

        let t = (*elapsed / *speed_scale).rem_euclid(1.0);
        let here = path.position(t)?;
        // The loop is closed, so the lookahead may wrap past t = 1.
        let ahead = path.position((t + dt.max(0.0) / *speed_scale).rem_euclid(1.0))?;
        let forward = ahead - here;
        if forward.length_squared() > f32::EPSILON * f32::EPSILON {
            self.yaw = yaw_between(HEADING, forward);
        }

        self.transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(self.config.scale),
            Quat::from_rotation_y(self.yaw),
            here,
        );
        Ok(())
    }
}

impl SceneAgent for Crab {
    fn kind(&self) -> AgentKind {
        AgentKind::Crab
    }

    fn update(&mut self, _registry: &SceneRegistry, _uniforms: &FrameUniforms, dt: f32) {
        if let Err(err) = self.tick(dt) {
            tracing::warn!(%err, "crab path unavailable, holding position");
        }
    }

    fn draw(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        sink.draw(
            RenderTarget::GBuffer,
            uniforms,
            self.transform,
            Material::Crab,
            Topology::TriangleList,
        );
    }

    fn draw_shadow(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        sink.draw(
            RenderTarget::Shadow,
            uniforms,
            self.transform,
            Material::ShadowCaster,
            Topology::TriangleList,
        );
    }

    fn transforms(&self) -> Vec<Mat4> {
        vec![self.transform]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_generates_path() {
        let mut crab = Crab::new(CrabConfig::default());
        assert_eq!(crab.state(), &CrabState::Uninitialized);
        crab.tick(0.01).unwrap();
        match crab.state() {
            CrabState::Following { path, speed_scale, .. } => {
                assert!((3..=6).contains(&path.len()));
                assert!(*speed_scale > 0.0);
            }
            CrabState::Uninitialized => panic!("path not generated"),
        }
    }

    #[test]
    fn test_path_is_level_and_pinned() {
        let config = CrabConfig::default();
        let path = Crab::generate_path(&config).unwrap();
        let points = path.points();
        assert_eq!(points[0].position, config.spawn);
        assert_eq!(points[points.len() - 1].position, config.spawn);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.position.y, config.spawn.y);
            assert_eq!(path.point_tangent(i).unwrap().y, 0.0);
        }
        for k in 0..=50 {
            let p = path.position(k as f32 / 50.0).unwrap();
            assert!((p.y - config.spawn.y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_crab_stays_near_floor_and_moves() {
        let config = CrabConfig::default();
        let mut crab = Crab::new(config.clone());
        let start = crab.position();
        let mut moved = false;
        for _ in 0..200 {
            crab.tick(0.05).unwrap();
            assert!((crab.position().y - config.spawn.y).abs() < 1e-4);
            moved |= crab.position().distance(start) > 0.1;
        }
        assert!(moved);
    }

    #[test]
    fn test_degenerate_path_freezes() {
        let config = CrabConfig {
            path_extent: 0.0,
            ..CrabConfig::default()
        };
        let mut crab = Crab::new(config.clone());
        crab.tick(0.1).unwrap();
        crab.tick(0.1).unwrap();
        assert_eq!(crab.position(), config.spawn);
        assert!(!crab.transform().is_nan());
    }

    #[test]
    fn test_bad_extent_does_not_panic() {
        for path_extent in [-3.0, f32::NAN, f32::INFINITY] {
            let config = CrabConfig {
                path_extent,
                ..CrabConfig::default()
            };
            let path = Crab::generate_path(&config).unwrap();
            assert!(path.points().iter().all(|p| p.position.is_finite()));

            let mut crab = Crab::new(config);
            for _ in 0..10 {
                crab.tick(0.1).unwrap();
            }
            assert!(crab.transform().is_finite());
        }
    }

    #[test]
    fn test_negative_extent_mirrors_positive() {
        let positive = CrabConfig::default();
        let negative = CrabConfig {
            path_extent: -positive.path_extent,
            ..positive.clone()
        };
        assert_eq!(
            Crab::generate_path(&positive).unwrap(),
            Crab::generate_path(&negative).unwrap()
        );
    }

    #[test]
    fn test_loop_period_is_speed_scale() {
        let mut crab = Crab::new(CrabConfig::default());
        crab.tick(0.0).unwrap();
        let period = match crab.state() {
            CrabState::Following { speed_scale, .. } => *speed_scale,
            CrabState::Uninitialized => panic!("path not generated"),
        };
        let length = Crab::generate_path(&CrabConfig::default())
            .unwrap()
            .arc_length(ARC_LENGTH_SAMPLES)
            .unwrap();
        // Default budget walks one unit of path per second.
        assert!((period - length).abs() < 1e-4);
        assert!(period > 0.1);
    }
}
