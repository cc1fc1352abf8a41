//! Particle emission state

use glam::{Quat, Vec3};

use crate::particle::SpawnPlacement;

/// Emitter defaults applied when an effect is initialized
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct EmitterSettings {
    /// Emission rate, negative values clamp to 0
    pub particles_per_second: f32,
    /// Master switch; a disabled emitter spawns nothing, bursts included
    pub enabled: bool,
    /// Emit continuously at `particles_per_second`
    pub auto_emit: bool,
    /// Spread particles spawned in one update along the emitter's path
    pub interpolate: bool,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            particles_per_second: 0.0,
            enabled: true,
            auto_emit: true,
            interpolate: true,
        }
    }
}

/// Converts an emission rate into whole particles per update
#[derive(Debug, Clone, PartialEq)]
pub struct Emitter {
    particles_per_second: f32,
    burst: u32,
    /// Master switch
    pub enabled: bool,
    /// Emit continuously at the configured rate
    pub auto_emit: bool,
    /// Interpolate spawn placements between the previous and current transform
    pub interpolate: bool,
    position: Vec3,
    orientation: Quat,
    previous: SpawnPlacement,
    owed: f32,
    teleported: bool,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(&EmitterSettings::default())
    }
}

impl Emitter {
    /// Create an emitter at the origin
    pub fn new(settings: &EmitterSettings) -> Self {
        let mut emitter = Self {
            particles_per_second: 0.0,
            burst: 0,
            enabled: settings.enabled,
            auto_emit: settings.auto_emit,
            interpolate: settings.interpolate,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            previous: SpawnPlacement::IDENTITY,
            owed: 0.0,
            teleported: false,
        };
        emitter.set_particles_per_second(settings.particles_per_second);
        emitter
    }

    /// Emission rate
    pub fn particles_per_second(&self) -> f32 {
        self.particles_per_second
    }

    /// Set the emission rate; negative or non-finite rates clamp to 0
    pub fn set_particles_per_second(&mut self, rate: f32) {
        self.particles_per_second = if rate.is_finite() && rate >= 0.0 {
            rate
        } else {
            log::warn!("Emission rate {rate} clamped to 0.0");
            0.0
        };
    }

    /// Particles waiting to be spawned by the next update
    pub fn pending_burst(&self) -> u32 {
        self.burst
    }

    /// Fraction of a particle carried over from earlier updates
    pub fn owed(&self) -> f32 {
        self.owed
    }

    /// Queue `count` particles to be spawned by the next update
    pub fn burst_particles(&mut self, count: u32) {
        self.burst = self.burst.saturating_add(count);
    }

    /// Number of particles to spawn for an update covering `seconds`
    ///
    /// A pending burst is consumed whole and takes the place of rate based
    /// emission for this call. Otherwise the rate accumulates and the
    /// fractional remainder is kept for the next call.
    pub fn update_and_get_spawn_count(&mut self, seconds: f32) -> u32 {
        if !self.enabled {
            return 0;
        }

        if self.burst > 0 {
            return std::mem::take(&mut self.burst);
        }

        if !self.auto_emit || self.particles_per_second <= 0.0 {
            return 0;
        }

        self.owed += seconds.max(0.0) * self.particles_per_second;
        let whole = self.owed.floor();
        self.owed -= whole;
        whole as u32
    }

    /// Current position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current orientation
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Transform at the end of the previous update
    pub fn previous_transform(&self) -> SpawnPlacement {
        self.previous
    }

    /// Move the emitter; particles spawned next update are spread along the move
    pub fn set_transform(&mut self, position: Vec3, orientation: Quat) {
        self.position = position;
        self.orientation = orientation.normalize();
    }

    /// Move the emitter without interpolating from the old transform
    pub fn teleport(&mut self, position: Vec3, orientation: Quat) {
        self.set_transform(position, orientation);
        self.previous = SpawnPlacement::new(self.position, self.orientation);
        self.teleported = true;
    }

    /// Placement of the `index`-th of `count` particles spawned this update
    ///
    /// Index 0 is the oldest particle and sits closest to the previous
    /// transform; the last one sits on the current transform.
    pub fn placement(&self, index: u32, count: u32) -> SpawnPlacement {
        let current = SpawnPlacement::new(self.position, self.orientation);
        if !self.interpolate || self.teleported || count <= 1 {
            return current;
        }

        let t = spawn_fraction(index, count);
        SpawnPlacement::new(
            self.previous.position.lerp(self.position, t),
            self.previous.orientation.slerp(self.orientation, t),
        )
    }

    /// Remember the current transform as the start of the next interpolation
    pub fn commit_transform(&mut self) {
        self.previous = SpawnPlacement::new(self.position, self.orientation);
        self.teleported = false;
    }
}

/// Where within the update the `index`-th of `count` spawns was born, in `(0, 1]`
#[inline]
pub fn spawn_fraction(index: u32, count: u32) -> f32 {
    if count == 0 {
        1.0
    } else {
        (index + 1) as f32 / count as f32
    }
}

/// Seconds of the current update a freshly spawned particle still has to live through
#[inline]
pub fn spawn_catch_up(seconds: f32, index: u32, count: u32) -> f32 {
    seconds * (1.0 - spawn_fraction(index, count))
}
