//! Time facilities for the frame driver.
//!
//! - [`Clock`] is the pausable, scalable animation clock. It is advanced by
//!   the frame delta the host measured, so runs are reproducible.
//! - [`FixedStep`] slices a variable frame delta into fixed sub-steps for the
//!   agent lane.
//! - [`LaneDrift`] measures how far the water lane has drifted from the agent
//!   lane in simulated seconds.
//!
//! # Example
//!
//! ```ignore
//! use reefsim::time::{Clock, FixedStep};
//!
//! let mut clock = Clock::new();
//! let mut fixed = FixedStep::new(1.0 / 60.0, 8);
//!
//! let dt = clock.advance(frame_delta);
//! for _ in 0..fixed.advance(dt).count {
//!     // tick agents by fixed.step()
//! }
//! ```

/// Animation clock with pause and time scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Clock {
    /// Scaled seconds since start, excluding paused time.
    elapsed_secs: f32,
    /// Scaled delta of the last advance.
    delta_secs: f32,
    /// Total frames advanced, paused frames included.
    frame_count: u64,
    paused: bool,
    /// Time scale multiplier (1.0 = normal speed).
    time_scale: f32,
}

impl Clock {
    /// A running clock at zero with a time scale of 1.
    pub fn new() -> Self {
        Self {
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            paused: false,
            time_scale: 1.0,
        }
    }

    /// Advance by a measured frame delta. Call once per frame.
    ///
    /// Returns the scaled delta, zero while paused. Negative input is
    /// treated as zero.
    pub fn advance(&mut self, raw_delta: f32) -> f32 {
        self.frame_count += 1;

        if self.paused {
            self.delta_secs = 0.0;
            return 0.0;
        }

        self.delta_secs = raw_delta.max(0.0) * self.time_scale;
        self.elapsed_secs += self.delta_secs;
        self.delta_secs
    }

    /// Scaled seconds since start, excluding paused time.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Scaled seconds covered by the last advance.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Number of advances, paused or not.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Whether the clock is paused.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Multiplier applied to raw frame time.
    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// While paused, `advance` returns 0 and `elapsed()` stops increasing.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Pause or resume.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flip the paused state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Set time scale multiplier.
    ///
    /// - `1.0` = normal speed
    /// - `0.5` = half speed (slow motion)
    /// - `2.0` = double speed
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Zero elapsed time and frame count. The time scale is kept.
    pub fn reset(&mut self) {
        *self = Self {
            time_scale: self.time_scale,
            ..Self::new()
        };
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of feeding one frame delta to a [`FixedStep`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Substeps {
    /// Fixed steps to run this frame.
    pub count: u32,
    /// Seconds discarded because the frame exceeded the sub-step cap.
    pub dropped: f32,
}

/// Fixed-timestep accumulator.
///
/// Leftover time below one step carries over to the next frame. Time beyond
/// `max_substeps` steps is dropped so a long stall cannot cause a spiral of
/// ever longer frames.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedStep {
    step: f32,
    max_substeps: u32,
    accumulator: f32,
    total_dropped: f32,
}

impl FixedStep {
    /// An empty accumulator. `max_substeps` is raised to at least 1.
    pub fn new(step: f32, max_substeps: u32) -> Self {
        Self {
            step,
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
            total_dropped: 0.0,
        }
    }

    /// Length of one sub-step in seconds.
    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Most sub-steps returned by one advance.
    #[inline]
    pub fn max_substeps(&self) -> u32 {
        self.max_substeps
    }

    /// Time waiting for the next step.
    #[inline]
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    /// Seconds dropped over the accumulator's lifetime.
    #[inline]
    pub fn total_dropped(&self) -> f32 {
        self.total_dropped
    }

    /// Add `dt` seconds and return how many steps to run now.
    pub fn advance(&mut self, dt: f32) -> Substeps {
        if self.step <= 0.0 {
            return Substeps::default();
        }
        self.accumulator += dt.max(0.0);

        let mut count = 0;
        while self.accumulator >= self.step && count < self.max_substeps {
            self.accumulator -= self.step;
            count += 1;
        }

        let mut dropped = 0.0;
        if self.accumulator >= self.step {
            dropped = self.accumulator - self.accumulator % self.step;
            self.accumulator -= dropped;
            self.total_dropped += dropped;
            tracing::debug!(
                dropped,
                max_substeps = self.max_substeps,
                "frame exceeded sub-step cap, dropping time"
            );
        }

        Substeps { count, dropped }
    }
}

/// Drift between agent simulated time and water simulated time.
///
/// Water time is counted as operator steps times a nominal step length.
/// The lanes are never resynchronized; drift is only reported.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneDrift {
    nominal_step: f32,
    threshold: f32,
    agent_seconds: f64,
    water_steps: u64,
    over_threshold: bool,
}

impl LaneDrift {
    /// Track drift with `nominal_step` seconds per water step.
    pub fn new(nominal_step: f32, threshold: f32) -> Self {
        Self {
            nominal_step,
            threshold,
            agent_seconds: 0.0,
            water_steps: 0,
            over_threshold: false,
        }
    }

    /// Account for one frame's work on both lanes and return the drift.
    pub fn record(&mut self, agent_seconds: f32, water_steps: u32) -> f32 {
        self.agent_seconds += f64::from(agent_seconds);
        self.water_steps += u64::from(water_steps);

        let drift = self.drift();
        let over = drift.abs() > self.threshold;
        if over != self.over_threshold {
            self.over_threshold = over;
            tracing::debug!(
                drift,
                threshold = self.threshold,
                agent_seconds = self.agent_seconds,
                water_steps = self.water_steps,
                "lane drift {}",
                if over { "exceeded threshold" } else { "back within threshold" }
            );
        }
        drift
    }

    /// Agent seconds minus water seconds. Positive when water lags.
    pub fn drift(&self) -> f32 {
        (self.agent_seconds - self.water_seconds()) as f32
    }

    /// Total simulated agent time.
    pub fn agent_seconds(&self) -> f64 {
        self.agent_seconds
    }

    /// Water steps times the nominal step length.
    pub fn water_seconds(&self) -> f64 {
        self.water_steps as f64 * f64::from(self.nominal_step)
    }

    /// Total water steps recorded.
    pub fn water_steps(&self) -> u64 {
        self.water_steps
    }

    /// Whether the last recorded drift exceeded the threshold.
    pub fn is_over_threshold(&self) -> bool {
        self.over_threshold
    }
}
