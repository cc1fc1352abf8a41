//! Age tracking shared by particles and effects

/// Elapsed-time bookkeeping for anything with a finite or infinite life
///
/// Particles and the effect itself both carry one of these, which lets the
/// event list evaluate timed registrations against either subject with the
/// same crossing test.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Lifetime {
    /// Total life in seconds, 0.0 means the owner never expires
    pub lifetime: f32,
    /// Seconds lived so far
    pub elapsed: f32,
    /// Value of `elapsed` before the most recent advance
    pub last_elapsed: f32,
    /// `elapsed / lifetime` clamped to `[0, 1]` (0.0 for infinite lifetimes)
    pub normalized: f32,
    /// Value of `normalized` before the most recent advance
    pub last_normalized: f32,
    /// Number of advances since the record was last reset
    pub steps: u32,
}

impl Lifetime {
    /// Create a fresh record with the given lifetime
    pub fn new(lifetime: f32) -> Self {
        Self {
            lifetime: lifetime.max(0.0),
            ..Self::default()
        }
    }

    /// Whether the owner is still alive
    #[inline]
    pub fn is_active(&self) -> bool {
        self.lifetime == 0.0 || self.elapsed < self.lifetime
    }

    /// Whether the owner never expires
    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.lifetime == 0.0
    }

    /// Move time forward, remembering the previous values
    pub fn advance(&mut self, seconds: f32) {
        self.last_elapsed = self.elapsed;
        self.last_normalized = self.normalized;
        self.elapsed += seconds;
        self.normalized = self.normalize(self.elapsed);
        self.steps = self.steps.saturating_add(1);
    }

    /// Whether `threshold` seconds was passed during the most recent advance
    ///
    /// The window is `(last_elapsed, elapsed]`. On the first advance after a
    /// reset the lower bound is pulled below zero so a threshold of exactly
    /// 0.0 is reached once, even by a zero-length step.
    pub fn crossed(&self, threshold: f32) -> bool {
        crossed(self.window_start(self.last_elapsed), self.elapsed, threshold)
    }

    /// Same as [`Lifetime::crossed`], against the normalized values
    pub fn crossed_normalized(&self, threshold: f32) -> bool {
        crossed(
            self.window_start(self.last_normalized),
            self.normalized,
            threshold,
        )
    }

    fn window_start(&self, last: f32) -> f32 {
        if last == 0.0 && self.steps <= 1 {
            BEFORE_START
        } else {
            last
        }
    }

    /// Overwrite the current elapsed time without touching the `last_*` values
    pub fn set_elapsed(&mut self, elapsed: f32) {
        self.elapsed = elapsed;
        self.normalized = self.normalize(elapsed);
    }

    /// Change the lifetime, keeping the normalized value consistent
    pub fn set_lifetime(&mut self, lifetime: f32) {
        self.lifetime = lifetime.max(0.0);
        self.normalized = self.normalize(self.elapsed);
        self.last_normalized = self.normalize(self.last_elapsed);
    }

    /// Clear all elapsed-time values, keeping the lifetime
    pub fn reset(&mut self) {
        *self = Self::new(self.lifetime);
    }

    /// Seconds left before the owner expires (infinite lifetimes report `f32::INFINITY`)
    pub fn remaining(&self) -> f32 {
        if self.is_infinite() {
            f32::INFINITY
        } else {
            (self.lifetime - self.elapsed).max(0.0)
        }
    }

    fn normalize(&self, elapsed: f32) -> f32 {
        if self.lifetime > 0.0 {
            (elapsed / self.lifetime).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Lower bound used for the first crossing window after a reset
const BEFORE_START: f32 = -0.1;

#[inline]
fn crossed(last: f32, current: f32, threshold: f32) -> bool {
    last < threshold && threshold <= current
}

/// Access to the age record of an event subject
pub trait Aging {
    /// The subject's age record
    fn age(&self) -> &Lifetime;

    /// Mutable access to the subject's age record
    fn age_mut(&mut self) -> &mut Lifetime;
}

impl Aging for Lifetime {
    fn age(&self) -> &Lifetime {
        self
    }

    fn age_mut(&mut self) -> &mut Lifetime {
        self
    }
}
