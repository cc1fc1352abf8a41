//! Event scheduling for particles and effects
//!
//! The same [`EventList`] drives both levels: particle-level lists are
//! evaluated once per particle per frame, the effect-level list once per
//! frame against the effect's own age.
//!
//! # Usage
//!
//! ```rust
//! use fx_particles::events::{EventCallback, EventList};
//! use fx_particles::Particle;
//!
//! let mut events: EventList<Particle> = EventList::new();
//! events.add_timed(
//!     0.5,
//!     EventCallback::new(|particle: &mut Particle, _, _| {
//!         particle.visible = false;
//!         Ok(())
//!     }),
//!     0,
//!     0,
//! );
//!
//! let mut particle = Particle::new(1.0);
//! particle.age.advance(0.6);
//! events.update(&mut particle, 0.6).unwrap();
//! assert!(!particle.visible);
//! ```

mod list;
mod registration;

pub use list::{EventList, LifetimeOutcome};
pub use registration::{EventCallback, EventFn, EventKind, Registration, Trigger};
