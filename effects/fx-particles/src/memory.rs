//! Automatic pool capacity management

use crate::pool::CapacityGrowth;

/// Which capacity changes the memory manager may make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(rename_all = "kebab-case"))]
pub enum MemoryMode {
    /// Capacity only changes when the user resizes the pool
    Disabled,
    /// Grow when the pool runs out of free slots
    IncreaseOnly,
    /// Shrink once peak usage has been stable for a while
    DecreaseOnly,
    /// Both of the above
    #[default]
    IncreaseAndDecrease,
}

impl MemoryMode {
    /// Whether the pool may grow
    pub fn can_increase(self) -> bool {
        matches!(self, Self::IncreaseOnly | Self::IncreaseAndDecrease)
    }

    /// Whether the pool may shrink
    pub fn can_decrease(self) -> bool {
        matches!(self, Self::DecreaseOnly | Self::IncreaseAndDecrease)
    }
}

/// Tuning knobs of the memory manager
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct MemorySettings {
    /// Allowed capacity changes
    pub mode: MemoryMode,
    /// Capacity multiplier on growth, clamped to `[1.01, 10.0]`
    pub increase_factor: f32,
    /// Headroom over the observed peak on shrink, clamped to `[1.0, 2.0]`
    pub reduce_factor: f32,
    /// Capacity is never reduced below this
    pub absolute_min: usize,
    /// Simulation seconds the peak must stay unchanged before shrinking
    pub stable_seconds: f32,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            mode: MemoryMode::IncreaseAndDecrease,
            increase_factor: 1.5,
            reduce_factor: 1.1,
            absolute_min: 10,
            stable_seconds: 3.0,
        }
    }
}

const INCREASE_FACTOR_RANGE: (f32, f32) = (1.01, 10.0);
const REDUCE_FACTOR_RANGE: (f32, f32) = (1.0, 2.0);

impl MemorySettings {
    /// Copy of these settings with every knob inside its legal range
    pub fn clamped(self) -> Self {
        Self {
            mode: self.mode,
            increase_factor: clamp_logged(
                "memory.increase_factor",
                self.increase_factor,
                INCREASE_FACTOR_RANGE,
            ),
            reduce_factor: clamp_logged(
                "memory.reduce_factor",
                self.reduce_factor,
                REDUCE_FACTOR_RANGE,
            ),
            absolute_min: self.absolute_min.max(1),
            stable_seconds: self.stable_seconds.max(0.0),
        }
    }
}

fn clamp_logged(name: &str, value: f32, (min, max): (f32, f32)) -> f32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("{name} {value} clamped to {clamped}");
    }
    clamped
}

/// Grows the pool on exhaustion and shrinks it to fit stable peak usage
#[derive(Debug, Clone, PartialEq)]
pub struct AutoMemoryManager {
    settings: MemorySettings,
    peak: usize,
    stable_for: f32,
}

impl Default for AutoMemoryManager {
    fn default() -> Self {
        Self::new(MemorySettings::default())
    }
}

impl AutoMemoryManager {
    /// Create a manager; the settings are clamped first
    pub fn new(settings: MemorySettings) -> Self {
        Self {
            settings: settings.clamped(),
            peak: 0,
            stable_for: 0.0,
        }
    }

    /// Current (clamped) settings
    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Replace the settings, restarting peak observation
    pub fn set_settings(&mut self, settings: MemorySettings) {
        self.settings = settings.clamped();
        self.reset();
    }

    /// Highest active count seen in the current observation window
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Seconds the current peak has gone unchanged
    pub fn stable_for(&self) -> f32 {
        self.stable_for
    }

    /// Forget the observed peak
    pub fn reset(&mut self) {
        self.peak = 0;
        self.stable_for = 0.0;
    }

    /// Record one frame of usage
    ///
    /// Returns the capacity the pool should shrink to once the peak has been
    /// stable for `stable_seconds`. Shrinking never goes below
    /// `absolute_min` or below `active`.
    ///
    /// `seconds` is simulation time, already scaled by the effect's speed
    /// factors, so the stability window does not advance while the effect
    /// is paused at speed 0.
    pub fn observe(&mut self, active: usize, capacity: usize, seconds: f32) -> Option<usize> {
        if active > self.peak {
            self.peak = active;
            self.stable_for = 0.0;
            return None;
        }

        self.stable_for += seconds.max(0.0);
        if !self.settings.mode.can_decrease() || self.stable_for < self.settings.stable_seconds {
            return None;
        }

        let target = scaled(self.peak, self.settings.reduce_factor).max(self.settings.absolute_min);
        self.peak = active;
        self.stable_for = 0.0;

        (target < capacity && target >= active).then_some(target)
    }
}

impl CapacityGrowth for AutoMemoryManager {
    fn grown_capacity(&mut self, capacity: usize, max_allowed: usize) -> Option<usize> {
        if !self.settings.mode.can_increase() || capacity >= max_allowed {
            return None;
        }
        let grown = scaled(capacity, self.settings.increase_factor)
            .max(capacity + 1)
            .min(max_allowed);
        log::debug!("Growing particle pool {capacity} -> {grown}");
        Some(grown)
    }
}

fn scaled(value: usize, factor: f32) -> usize {
    (value as f32 * factor).ceil() as usize
}
