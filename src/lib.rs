//! # reefsim - underwater scene core
//!
//! Simulation state for an underwater scene: a GPU ping-pong water surface and
//! a population of steered agents (fish schools, predators, crabs and kelp).
//! Rendering is left to a collaborator reached through the traits in
//! [`render`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use reefsim::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SceneConfig::default();
//!     let mut scene = Scene::from_config(&config)?;
//!     scene.set_water(Box::new(CpuWaterSim::new(config.water_resolution)));
//!
//!     let mut uniforms = FrameUniforms::default();
//!     let mut sink = RecordingSink::new();
//!     for _ in 0..600 {
//!         scene.frame(1.0 / 60.0, &mut uniforms);
//!         scene.draw(&mut sink, &uniforms);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lanes
//!
//! Each frame advances two independently clocked lanes:
//!
//! - **Agents** tick in fixed sub-steps. Every sub-step starts from a
//!   [`SceneRegistry`](agents::SceneRegistry) snapshot so agents react to each
//!   other's start-of-step state regardless of update order.
//! - **Water** runs a fixed count of `step` operators per frame followed by
//!   one `normals` pass, on the GPU ([`water::WaterSim`]) or the CPU
//!   ([`water::CpuWaterSim`]).
//!
//! The lanes are not resynchronized. [`time::LaneDrift`] reports how far
//! apart they are.
//!
//! ## Building Blocks
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`particle`] | Point masses with Euler, symplectic Euler and Verlet integration |
//! | [`spring`] | Spring-dampers between particles of one population |
//! | [`steering`] | Flocking and avoidance forces as pure functions |
//! | [`curve`] | Hermite splines with automatic tangents |
//! | [`orientation`] | Rotation-between-vectors and guarded slerp |
//! | [`agents`] | Fish schools, predators, crabs, kelp |
//! | [`water`] | Ping-pong wave simulation |

pub mod agents;
pub mod config;
pub mod curve;
pub mod error;
pub mod orientation;
pub mod particle;
pub mod render;
pub mod scene;
pub mod spring;
pub mod steering;
pub mod time;
pub mod water;

pub use glam::{Mat4, Quat, Vec2, Vec3};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use reefsim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agents::{
        AgentId, AgentKind, Crab, CrabConfig, CrabState, FishSchool, Kelp, KelpConfig,
        Predator, PredatorConfig, SceneAgent, SceneRegistry, SchoolBehaviors, SchoolConfig,
    };
    pub use crate::config::SceneConfig;
    pub use crate::curve::Curve;
    pub use crate::error::{ConfigError, CurveError, GpuError, SimError};
    pub use crate::particle::{Integrator, Particle};
    pub use crate::render::{
        DrawSink, FrameUniforms, Material, RecordingSink, RenderTarget, TextureHandle, Topology,
    };
    pub use crate::scene::{FrameStats, Scene};
    pub use crate::spring::SpringDamper;
    pub use crate::steering::Bounds;
    pub use crate::time::{Clock, FixedStep, LaneDrift};
    pub use crate::water::{CpuWaterSim, GpuWaterLane, PingPong, WaterSim, WaveOperators};
    pub use crate::{Mat4, Quat, Vec2, Vec3};
}
