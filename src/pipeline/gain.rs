//! Two-level output gain state and its actuation.
//!
//! # Single writer
//!
//! `GainController` is owned by the consumer thread and mutated only through
//! `&mut self`. Nothing else holds the state, so no lock guards it. A second
//! writer (for example a manual override from another thread) must go through
//! a channel into the consumer thread rather than share the controller.

use crate::pipeline::stats::PipelineStats;
use crate::volume::VolumeActuator;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GainState {
    /// Hold music or announcements.
    #[default]
    Low,
    /// A person is speaking.
    High,
}

impl fmt::Display for GainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GainState::Low => write!(f, "LOW"),
            GainState::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainLevels {
    pub low: u8,
    pub high: u8,
}

impl GainLevels {
    pub fn level_for(&self, state: GainState) -> u8 {
        match state {
            GainState::Low => self.low,
            GainState::High => self.high,
        }
    }
}

impl Default for GainLevels {
    fn default() -> Self {
        Self {
            low: crate::defaults::VOLUME_LOW,
            high: crate::defaults::VOLUME_HIGH,
        }
    }
}

pub struct GainController {
    state: GainState,
    levels: GainLevels,
    actuator: Box<dyn VolumeActuator>,
    stats: Arc<PipelineStats>,
}

impl GainController {
    pub fn new(
        levels: GainLevels,
        actuator: Box<dyn VolumeActuator>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            state: GainState::default(),
            levels,
            actuator,
            stats,
        }
    }

    pub fn state(&self) -> GainState {
        self.state
    }

    pub fn levels(&self) -> GainLevels {
        self.levels
    }

    /// Records `state` and drives the actuator to its level.
    ///
    /// The actuator is called on every request, including repeats of the
    /// current state, so an external change to the volume is corrected by the
    /// next matching chunk. Actuation errors are logged and swallowed.
    pub fn apply(&mut self, state: GainState) {
        if state != self.state {
            log::info!("Gain {} -> {}", self.state, state);
            self.stats.record_transition();
        }
        self.state = state;

        let level = self.levels.level_for(state);
        if let Err(e) = self.actuator.set_level(level) {
            log::warn!(
                "Failed to set volume to {} via {}: {}",
                level,
                self.actuator.name(),
                e
            );
        }
    }
}

impl fmt::Debug for GainController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GainController")
            .field("state", &self.state)
            .field("levels", &self.levels)
            .field("actuator", &self.actuator.name())
            .finish()
    }
}
