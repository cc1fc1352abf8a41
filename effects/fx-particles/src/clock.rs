//! Update throttling

/// Caps how often an effect performs a logical update
///
/// Time passed to skipped calls is not lost: it accumulates and is handed
/// to the next call that does update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UpdateClock {
    interval: f32,
    accumulated: f32,
}

impl UpdateClock {
    /// Create a clock; 0 updates per second means every call updates
    pub fn new(updates_per_second: u32) -> Self {
        let mut clock = Self::default();
        clock.set_updates_per_second(updates_per_second);
        clock
    }

    /// Change the cap, keeping any accumulated time
    pub fn set_updates_per_second(&mut self, updates_per_second: u32) {
        self.interval = if updates_per_second == 0 {
            0.0
        } else {
            1.0 / updates_per_second as f32
        };
    }

    /// Whether every call updates
    pub fn is_uncapped(&self) -> bool {
        self.interval == 0.0
    }

    /// Seconds between logical updates (0.0 when uncapped)
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Seconds accumulated since the last logical update
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    /// Account for `seconds` of real time
    ///
    /// Returns the seconds the logical update should cover, or `None` when
    /// not enough time has passed yet.
    pub fn tick(&mut self, seconds: f32) -> Option<f32> {
        if self.is_uncapped() {
            return Some(seconds);
        }

        self.accumulated += seconds;
        if self.accumulated + f32::EPSILON >= self.interval {
            Some(std::mem::take(&mut self.accumulated))
        } else {
            None
        }
    }

    /// Drop any accumulated time
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}
