//! Water surface height-field simulation.
//!
//! The surface is a grid of texels holding `(height, velocity, normal.x,
//! normal.z)`. Three operators advance it, each reading the current buffer
//! and writing the other one of a [`PingPong`] pair:
//!
//! - **drop** adds a cosine-shaped bump to the height,
//! - **step** propagates waves by pulling each texel toward its neighbor
//!   average,
//! - **normals** recomputes the surface normal from height differences.
//!
//! [`WaterSim`] runs the operators as full-screen render passes on the GPU.
//! [`CpuWaterSim`] runs the same arithmetic on the CPU for headless scenes.

mod cpu;
mod gpu;
mod ping_pong;

pub use cpu::CpuWaterSim;
pub use gpu::{GpuWaterLane, WaterParams, WaterSim, WATER_FORMAT, WATER_SHADER};
pub use ping_pong::PingPong;

/// Gain applied to the neighbor-average difference each step.
pub const WAVE_SPEED: f32 = 2.0;

/// Velocity retained per step.
pub const WAVE_DAMPING: f32 = 0.995;

/// Operators shared by the GPU and CPU simulators, as driven by a scene.
///
/// Each operator reads the current buffer, writes the other one and swaps.
pub trait WaveOperators {
    /// Add a bump centered at `(x, y)` in `[-1, 1]` surface coordinates.
    fn add_drop(&mut self, x: f32, y: f32, radius: f32, strength: f32);

    /// Advance the wave equation by one step.
    fn step(&mut self);

    /// Recompute surface normals from the current heights.
    fn normals(&mut self);

    /// Total operators issued so far.
    fn operations(&self) -> u64;

    /// Hand recorded work to the device. A no-op for immediate simulators.
    fn submit(&mut self) {}
}
