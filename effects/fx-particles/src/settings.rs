//! Effect configuration

use crate::emitter::EmitterSettings;
use crate::error::{FxError, Result};
use crate::memory::MemorySettings;

/// What an effect does when its own lifetime runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(rename_all = "kebab-case"))]
pub enum EndOfLife {
    /// Keep running; the elapsed time simply grows past the lifetime
    #[default]
    Nothing,
    /// Restart the effect's age at zero
    Repeat,
    /// Tear the effect down
    Destroy,
}

/// Everything an effect can be configured with
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct EffectSettings {
    /// Ceiling on the number of simultaneously active particles
    pub max_particles_allowed: usize,
    /// Initial pool capacity
    pub particles_allocated: usize,
    /// Logical updates per second, 0 = update on every call
    pub updates_per_second: u32,
    /// Time scale applied by the user
    pub simulation_speed: f32,
    /// Time scale applied by the effect itself
    pub internal_simulation_speed: f32,
    /// Effect lifetime in seconds, 0 = infinite
    pub lifetime: f32,
    /// Behaviour once the lifetime is reached
    pub end_of_life: EndOfLife,
    /// Only authoritative update calls advance the effect
    pub host_driven: bool,
    /// Emitter defaults
    pub emitter: EmitterSettings,
    /// Pool capacity management
    pub memory: MemorySettings,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            max_particles_allowed: 100,
            particles_allocated: 100,
            updates_per_second: 0,
            simulation_speed: 1.0,
            internal_simulation_speed: 1.0,
            lifetime: 0.0,
            end_of_life: EndOfLife::Nothing,
            host_driven: false,
            emitter: EmitterSettings::default(),
            memory: MemorySettings::default(),
        }
    }
}

impl EffectSettings {
    /// Reject values that can not be clamped into something sensible
    pub fn validate(&self) -> Result<()> {
        let floats = [
            ("simulation_speed", self.simulation_speed),
            ("internal_simulation_speed", self.internal_simulation_speed),
            ("lifetime", self.lifetime),
            ("emitter.particles_per_second", self.emitter.particles_per_second),
            ("memory.increase_factor", self.memory.increase_factor),
            ("memory.reduce_factor", self.memory.reduce_factor),
            ("memory.stable_seconds", self.memory.stable_seconds),
        ];

        for (name, value) in floats {
            if !value.is_finite() {
                return Err(FxError::InvalidConfiguration(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }

        if self.memory.absolute_min == 0 {
            return Err(FxError::InvalidConfiguration(
                "memory.absolute_min must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate, then clamp every numeric setting into its legal range
    pub fn sanitized(mut self) -> Result<Self> {
        self.validate()?;
        self.simulation_speed = clamp_speed("simulation_speed", self.simulation_speed);
        self.internal_simulation_speed =
            clamp_speed("internal_simulation_speed", self.internal_simulation_speed);
        self.lifetime = self.lifetime.max(0.0);
        self.emitter.particles_per_second = self.emitter.particles_per_second.max(0.0);
        self.memory = self.memory.clamped();
        Ok(self)
    }
}

/// Negative speeds pause the simulation instead of running it backwards
pub(crate) fn clamp_speed(name: &str, speed: f32) -> f32 {
    if speed < 0.0 {
        log::warn!("{name} {speed} clamped to 0.0");
        0.0
    } else {
        speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(EffectSettings::default().validate().is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        let settings = EffectSettings {
            simulation_speed: f32::NAN,
            ..EffectSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(FxError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_absolute_min_rejected() {
        let mut settings = EffectSettings::default();
        settings.memory.absolute_min = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_sanitized_clamps() {
        let mut settings = EffectSettings {
            simulation_speed: -2.0,
            lifetime: -1.0,
            ..EffectSettings::default()
        };
        settings.memory.increase_factor = 100.0;
        settings.memory.reduce_factor = 0.5;

        let settings = settings.sanitized().unwrap();
        assert_eq!(settings.simulation_speed, 0.0);
        assert_eq!(settings.lifetime, 0.0);
        assert_eq!(settings.memory.increase_factor, 10.0);
        assert_eq!(settings.memory.reduce_factor, 1.0);
    }
}
