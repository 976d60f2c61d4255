use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of both simulated phases.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Upload phase timing.
    pub upload: PhaseSettings,
    /// Convert phase timing.
    pub convert: PhaseSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            upload: PhaseSettings {
                tick_ms: 150,
                ticks: 10,
                max_step: 20,
            },
            convert: PhaseSettings {
                tick_ms: 100,
                ticks: 20,
                max_step: 10,
            },
        }
    }
}

/// Timing of one simulated phase: `ticks` increments, `tick_ms` apart, each
/// at most `max_step` points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseSettings {
    /// Interval between progress ticks in milliseconds.
    pub tick_ms: u64,
    /// Number of ticks in the phase.
    pub ticks: u32,
    /// Upper bound of a single random increment.
    pub max_step: u8,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        PipelineSettings::default().upload
    }
}

impl PhaseSettings {
    /// Tick interval as a [`Duration`].
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub(crate) fn validate(&mut self, name: &str) {
        if self.tick_ms == 0 {
            tracing::warn!("{name} tick_ms is 0, clamped to 1");
            self.tick_ms = 1;
        }
        if self.ticks == 0 {
            tracing::warn!("{name} ticks is 0, clamped to 1");
            self.ticks = 1;
        }
        let clamped = self.max_step.clamp(1, 100);
        if clamped != self.max_step {
            tracing::warn!("{name} max_step out of range ({}), clamped to {clamped}", self.max_step);
            self.max_step = clamped;
        }
    }
}
