//! Scene configuration.
//!
//! A [`SceneConfig`] describes every tunable of a scene: the fixed agent
//! timestep, the water lane, and the population of agents. Every field has a
//! default, so a JSON file only needs the values it changes:
//!
//! ```json
//! {
//!     "fixed_dt": 0.01,
//!     "water_resolution": 128,
//!     "schools": [{ "count": 50 }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agents::{CrabConfig, KelpConfig, PredatorConfig, SchoolConfig};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Agent sub-step length in seconds.
    pub fixed_dt: f32,
    /// Most agent sub-steps run in one frame; excess time is dropped.
    pub max_substeps: u32,
    /// Edge length of the square water grid, in texels.
    pub water_resolution: u32,
    /// Water `step` operators issued per frame, regardless of frame time.
    pub water_steps_per_frame: u32,
    /// Random drops seeded onto the surface when the water lane attaches.
    pub initial_drops: u32,
    pub drop_radius: f32,
    pub drop_strength: f32,
    /// Lane drift in seconds above which a debug event is logged.
    pub drift_threshold: f32,
    /// Base seed; school `i` spawns with `seed + i`.
    pub seed: u64,
    pub schools: Vec<SchoolConfig>,
    pub predators: Vec<PredatorConfig>,
    pub crabs: Vec<CrabConfig>,
    pub kelp: Vec<KelpConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_substeps: 8,
            water_resolution: 256,
            water_steps_per_frame: 2,
            initial_drops: 20,
            drop_radius: 0.03,
            drop_strength: 0.01,
            drift_threshold: 0.5,
            seed: 1,
            schools: vec![SchoolConfig::default()],
            predators: vec![PredatorConfig::default()],
            crabs: vec![
                CrabConfig::default(),
                CrabConfig {
                    spawn: glam::Vec3::new(-8.0, -12.0, 5.0),
                    seed: 0x0000_BEEF,
                    ..CrabConfig::default()
                },
            ],
            kelp: vec![KelpConfig::default()],
        }
    }
}

impl SceneConfig {
    /// Load and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded scene config");
        Ok(config)
    }

    /// Parse and validate a JSON config string.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Nominal simulated seconds covered by one water step.
    pub fn water_step_seconds(&self) -> f32 {
        if self.water_steps_per_frame == 0 {
            return 0.0;
        }
        self.fixed_dt / self.water_steps_per_frame as f32
    }

    /// Reject values that would make the scene degenerate or panic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(ConfigError::Invalid("fixed_dt must be positive"));
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::Invalid("max_substeps must be at least 1"));
        }
        if self.water_resolution == 0 {
            return Err(ConfigError::Invalid("water_resolution must be non-zero"));
        }
        if self.drop_radius <= 0.0 {
            return Err(ConfigError::Invalid("drop_radius must be positive"));
        }
        if self.schools.iter().any(|s| !s.bounds.is_valid()) {
            return Err(ConfigError::Invalid("school bounds are inverted"));
        }
        if self.schools.iter().any(|s| s.wall_margin < 0.0 || s.max_speed <= 0.0) {
            return Err(ConfigError::Invalid(
                "school wall_margin must be non-negative and max_speed positive",
            ));
        }
        if self.predators.iter().any(|p| !p.bounds.is_valid()) {
            return Err(ConfigError::Invalid("predator bounds are inverted"));
        }
        if self
            .crabs
            .iter()
            .any(|c| !(c.loop_time_budget.is_finite() && c.loop_time_budget > 0.0))
        {
            return Err(ConfigError::Invalid("crab loop_time_budget must be positive"));
        }
        if self
            .crabs
            .iter()
            .any(|c| !(c.path_extent.is_finite() && c.path_extent >= 0.0))
        {
            return Err(ConfigError::Invalid("crab path_extent must be non-negative"));
        }
        if self.kelp.iter().any(|k| k.segment_length <= 0.0) {
            return Err(ConfigError::Invalid("kelp segment_length must be positive"));
        }
        Ok(())
    }
}
