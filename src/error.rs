//! Error types for reefsim.
//!
//! Curve and particle errors are recoverable: agents log them and keep their
//! previous state. GPU errors are fatal to [`WaterSim`](crate::water::WaterSim)
//! construction and are reported once to the caller.

use thiserror::Error;

/// Invalid-state errors raised by [`Curve`](crate::curve::Curve) queries and edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveError {
    /// Position and tangent queries need at least two control points.
    #[error("curve needs at least 2 control points, has {count}")]
    TooFewPoints { count: usize },
    /// An edit addressed a control point that does not exist.
    #[error("control point index {index} out of range for curve of {len} points")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors raised while wiring up CPU-side simulation objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A spring-damper referenced a particle outside its population.
    #[error("particle index {index} out of range for population of {len}")]
    ParticleIndex { index: usize, len: usize },
    /// A curve operation failed.
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// Errors that can occur during GPU setup and readback.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The adapter cannot render into or sample from the simulation format.
    #[error("texture format {0:?} is not renderable and sampleable on this adapter")]
    UnsupportedFormat(wgpu::TextureFormat),
    /// Texture, pipeline or buffer creation was rejected by the device.
    #[error("failed to allocate GPU resources: {0}")]
    ResourceAllocation(String),
    /// Failed to map buffer for reading.
    #[error("failed to map GPU buffer: {0}")]
    BufferMapping(String),
}

/// Errors that can occur while loading a [`SceneConfig`](crate::config::SceneConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for a scene config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of its valid range.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
