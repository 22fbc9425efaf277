//! Scene agents and the registry they coordinate through.
//!
//! Every agent implements [`SceneAgent`]. Once per tick the scene asks each
//! agent to [`publish`](SceneAgent::publish) what others may react to into a
//! [`SceneRegistry`], then updates every agent against that snapshot. Agents
//! therefore see each other's state from the start of the tick, independent
//! of update order.

mod crab;
mod kelp;
mod predator;
mod school;

pub use crab::{Crab, CrabConfig, CrabState};
pub use kelp::{Kelp, KelpConfig};
pub use predator::{Predator, PredatorConfig};
pub use school::{FishSchool, SchoolBehaviors, SchoolConfig};

use glam::{Mat4, Vec3};

use crate::render::{DrawSink, FrameUniforms};

/// Largest step a single agent tick integrates.
pub const MAX_TICK_DT: f32 = 1.0 / 30.0;

/// Model-space forward axis of fish and shark meshes.
pub const FORWARD: Vec3 = Vec3::Z;

/// Stable identity of an agent within a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

/// Category tag used to resolve avoidance and hunt targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentKind {
    School,
    Predator,
    Crab,
    Kelp,
}

/// Start-of-tick snapshot of everything agents react to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneRegistry {
    schools: Vec<(AgentId, Vec3)>,
    predators: Vec<(AgentId, Vec3)>,
}

impl SceneRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything published so far.
    pub fn clear(&mut self) {
        self.schools.clear();
        self.predators.clear();
    }

    /// Record the centroid of a prey school.
    pub fn publish_school(&mut self, id: AgentId, centroid: Vec3) {
        self.schools.push((id, centroid));
    }

    /// Record the position of a predator.
    pub fn publish_predator(&mut self, id: AgentId, position: Vec3) {
        self.predators.push((id, position));
    }

    /// Prey school centroids in publish order.
    pub fn schools(&self) -> &[(AgentId, Vec3)] {
        &self.schools
    }

    /// Predator positions in publish order.
    pub fn predators(&self) -> &[(AgentId, Vec3)] {
        &self.predators
    }

    /// Nearest school centroid to `point`; ties go to the first published.
    pub fn nearest_school(&self, point: Vec3) -> Option<Vec3> {
        let mut best: Option<(f32, Vec3)> = None;
        for &(_, centroid) in &self.schools {
            let d = point.distance_squared(centroid);
            if best.map_or(true, |(best_d, _)| d < best_d) {
                best = Some((d, centroid));
            }
        }
        best.map(|(_, centroid)| centroid)
    }
}

/// Capabilities every scene object provides to the frame driver.
pub trait SceneAgent {
    fn kind(&self) -> AgentKind;

    /// Called once after the agent is added to a scene.
    fn attach(&mut self, _id: AgentId) {}

    /// Contribute to the start-of-tick snapshot.
    fn publish(&self, _registry: &mut SceneRegistry) {}

    /// Advance the agent by `dt` seconds.
    fn update(&mut self, registry: &SceneRegistry, uniforms: &FrameUniforms, dt: f32);

    /// Submit geometry for the main passes.
    fn draw(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms);

    /// Submit geometry for the shadow pass.
    fn draw_shadow(&self, _sink: &mut dyn DrawSink, _uniforms: &FrameUniforms) {}

    /// Current world transforms, one per rendered instance.
    fn transforms(&self) -> Vec<Mat4>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_school_ties_go_to_first() {
        let mut registry = SceneRegistry::new();
        registry.publish_school(AgentId(3), Vec3::new(2.0, 0.0, 0.0));
        registry.publish_school(AgentId(1), Vec3::new(-2.0, 0.0, 0.0));
        registry.publish_school(AgentId(2), Vec3::new(0.0, 5.0, 0.0));

        assert_eq!(registry.nearest_school(Vec3::ZERO), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(
            registry.nearest_school(Vec3::new(0.0, 4.0, 0.0)),
            Some(Vec3::new(0.0, 5.0, 0.0))
        );
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = SceneRegistry::new();
        assert_eq!(registry.nearest_school(Vec3::ZERO), None);
        registry.publish_predator(AgentId(0), Vec3::ONE);
        assert_eq!(registry.predators().len(), 1);
        registry.clear();
        assert!(registry.predators().is_empty());
    }
}
