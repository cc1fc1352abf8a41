//! Particle lifecycle and event-scheduling runtime
//!
//! `fx-particles` keeps a recyclable pool of particles, ages them frame by
//! frame, fires user callbacks at well defined points of a particle's or an
//! effect's life, and turns an emission rate into spawned particles placed
//! along the emitter's path.
//!
//! ```
//! use fx_particles::{Effect, EffectId, EffectSettings, UpdateOutcome};
//! use fx_particles::emitter::EmitterSettings;
//!
//! let mut effect: Effect = Effect::new(EffectId::new(1));
//! effect.initialize(EffectSettings {
//!     emitter: EmitterSettings {
//!         particles_per_second: 20.0,
//!         ..EmitterSettings::default()
//!     },
//!     ..EffectSettings::default()
//! })?;
//!
//! let outcome = effect.update(0.5, true)?;
//! assert!(matches!(outcome, UpdateOutcome::Updated { spawned: 10, .. }));
//! assert_eq!(effect.particles_to_draw().len(), 10);
//! # Ok::<(), fx_particles::FxError>(())
//! ```

pub mod clock;
pub mod effect;
pub mod emitter;
pub mod error;
pub mod events;
pub mod lifetime;
pub mod manager;
pub mod memory;
pub mod particle;
pub mod pool;
pub mod settings;

// Re-export common types
pub use clock::UpdateClock;
pub use effect::{DrawList, Effect, EffectCore, EffectId, EffectState, UpdateOutcome};
pub use emitter::{Emitter, EmitterSettings};
pub use error::{FxError, Result};
pub use events::{EventCallback, EventKind, EventList, Registration, Trigger};
pub use lifetime::{Aging, Lifetime};
pub use manager::{EffectManager, FrameStats, IdGenerator, ManagedEffect};
pub use memory::{AutoMemoryManager, MemoryMode, MemorySettings};
pub use particle::{Particle, SpawnPlacement};
pub use pool::{CapacityGrowth, NoGrowth, ParticleHandle, ParticlePool, Spawn};
pub use settings::{EffectSettings, EndOfLife};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
