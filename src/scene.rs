//! Frame driver.
//!
//! A [`Scene`] owns every agent and the optional water lane and advances
//! them once per frame:
//!
//! 1. the [`Clock`] turns the host's frame delta into animation time,
//! 2. a [`FixedStep`] accumulator slices it into agent sub-steps, each run
//!    against a fresh [`SceneRegistry`] snapshot,
//! 3. the water lane runs a fixed number of steps plus one normals pass,
//!    independent of how many agent sub-steps ran,
//! 4. [`LaneDrift`] records how far the two lanes have drifted apart.
//!
//! Drawing is a separate call so hosts can render at their own cadence.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::agents::{
    AgentId, Crab, FishSchool, Kelp, Predator, SceneAgent, SceneRegistry,
};
use crate::config::SceneConfig;
use crate::error::SimError;
use crate::render::{DrawSink, FrameUniforms};
use crate::time::{Clock, FixedStep, LaneDrift};
use crate::water::WaveOperators;

/// What one call to [`Scene::frame`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Agent sub-steps run.
    pub substeps: u32,
    /// Seconds discarded by the sub-step cap.
    pub dropped: f32,
    /// Water `step` operators issued.
    pub water_steps: u32,
    /// Agent seconds minus water seconds after this frame.
    pub drift: f32,
}

pub struct Scene {
    agents: Vec<(AgentId, Box<dyn SceneAgent>)>,
    next_id: u32,
    registry: SceneRegistry,
    clock: Clock,
    fixed: FixedStep,
    water: Option<Box<dyn WaveOperators>>,
    water_steps_per_frame: u32,
    initial_drops: u32,
    drop_radius: f32,
    drop_strength: f32,
    drift: LaneDrift,
    rng: SmallRng,
}

impl Scene {
    /// An empty scene with the timing and water settings of `config`.
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            agents: Vec::new(),
            next_id: 0,
            registry: SceneRegistry::new(),
            clock: Clock::new(),
            fixed: FixedStep::new(config.fixed_dt, config.max_substeps),
            water: None,
            water_steps_per_frame: config.water_steps_per_frame,
            initial_drops: config.initial_drops,
            drop_radius: config.drop_radius,
            drop_strength: config.drop_strength,
            drift: LaneDrift::new(config.water_step_seconds(), config.drift_threshold),
            rng: SmallRng::seed_from_u64(config.seed),
        }
    }

    /// A scene populated with every agent `config` lists.
    pub fn from_config(config: &SceneConfig) -> Result<Self, SimError> {
        let mut scene = Self::new(config);
        for (i, school) in config.schools.iter().enumerate() {
            scene.add(FishSchool::new(school.clone(), config.seed.wrapping_add(i as u64)));
        }
        for predator in &config.predators {
            scene.add(Predator::new(predator.clone()));
        }
        for crab in &config.crabs {
            scene.add(Crab::new(crab.clone()));
        }
        for kelp in &config.kelp {
            scene.add(Kelp::new(kelp.clone())?);
        }
        tracing::info!(agents = scene.agents.len(), "scene populated");
        Ok(scene)
    }

    /// Take ownership of `agent` and return its id.
    pub fn add(&mut self, agent: impl SceneAgent + 'static) -> AgentId {
        self.add_boxed(Box::new(agent))
    }

    /// Like [`add`](Self::add) for an already boxed agent.
    pub fn add_boxed(&mut self, mut agent: Box<dyn SceneAgent>) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        agent.attach(id);
        tracing::debug!(?id, kind = ?agent.kind(), "agent added");
        self.agents.push((id, agent));
        id
    }

    /// Attach a water lane and seed it with random drops.
    pub fn set_water(&mut self, mut water: Box<dyn WaveOperators>) {
        for _ in 0..self.initial_drops {
            let x = self.rng.gen_range(-1.0..1.0);
            let y = self.rng.gen_range(-1.0..1.0);
            let strength = if self.rng.gen_bool(0.5) {
                self.drop_strength
            } else {
                -self.drop_strength
            };
            water.add_drop(x, y, self.drop_radius, strength);
        }
        water.submit();
        self.water = Some(water);
    }

    /// The attached water lane, if any.
    pub fn water(&self) -> Option<&dyn WaveOperators> {
        self.water.as_deref()
    }

    /// Mutable access to the water lane, for interactive drops.
    pub fn water_mut(&mut self) -> Option<&mut (dyn WaveOperators + 'static)> {
        self.water.as_deref_mut()
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the scene holds no agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Look up an agent by id.
    pub fn agent(&self, id: AgentId) -> Option<&dyn SceneAgent> {
        self.agents
            .iter()
            .find(|(agent_id, _)| *agent_id == id)
            .map(|(_, agent)| agent.as_ref())
    }

    /// Every agent with its id, in insertion order.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &dyn SceneAgent)> {
        self.agents.iter().map(|(id, agent)| (*id, agent.as_ref()))
    }

    /// Snapshot taken before the last agent sub-step.
    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    /// Animation clock.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Agent and water lane drift statistics.
    pub fn drift(&self) -> &LaneDrift {
        &self.drift
    }

    /// Freeze or resume the clock. A paused scene advances neither lane.
    pub fn set_paused(&mut self, paused: bool) {
        self.clock.set_paused(paused);
    }

    /// Whether the clock is paused.
    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Scale applied to host frame time.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.clock.set_time_scale(scale);
    }

    /// Advance both lanes by one host frame of `frame_dt` seconds.
    ///
    /// Writes the clock's elapsed and delta time into `uniforms`.
    pub fn frame(&mut self, frame_dt: f32, uniforms: &mut FrameUniforms) -> FrameStats {
        let dt = self.clock.advance(frame_dt);
        uniforms.elapsed = self.clock.elapsed();
        uniforms.delta = dt;
        if self.clock.is_paused() {
            return FrameStats {
                drift: self.drift.drift(),
                ..FrameStats::default()
            };
        }

        let substeps = self.fixed.advance(dt);
        let step = self.fixed.step();
        for _ in 0..substeps.count {
            self.tick_agents(uniforms, step);
        }

        let mut water_steps = 0;
        if let Some(water) = self.water.as_mut() {
            if self.water_steps_per_frame > 0 {
                for _ in 0..self.water_steps_per_frame {
                    water.step();
                }
                water.normals();
                water.submit();
                water_steps = self.water_steps_per_frame;
            }
        }

        let drift = self
            .drift
            .record(substeps.count as f32 * step, water_steps);

        FrameStats {
            substeps: substeps.count,
            dropped: substeps.dropped,
            water_steps,
            drift,
        }
    }

    fn tick_agents(&mut self, uniforms: &FrameUniforms, dt: f32) {
        self.registry.clear();
        for (_, agent) in &self.agents {
            agent.publish(&mut self.registry);
        }
        for (_, agent) in &mut self.agents {
            agent.update(&self.registry, uniforms, dt);
        }
    }

    /// Submit every agent to the main and shadow passes.
    pub fn draw(&self, sink: &mut dyn DrawSink, uniforms: &FrameUniforms) {
        for (_, agent) in &self.agents {
            agent.draw(sink, uniforms);
            agent.draw_shadow(sink, uniforms);
        }
    }
}
