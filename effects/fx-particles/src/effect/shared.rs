//! State shared with effect-level callbacks

use crate::emitter::Emitter;
use crate::events::EventList;
use crate::lifetime::{Aging, Lifetime};
use crate::memory::AutoMemoryManager;
use crate::particle::Particle;
use crate::pool::ParticlePool;
use crate::settings::EndOfLife;

/// Everything an effect owns apart from its effect-level event list
///
/// Effect-level callbacks receive this as their subject, so they can burst
/// the emitter, register particle events or ask for the effect to be torn
/// down while it is updating.
#[derive(Debug)]
pub struct EffectCore<A = ()> {
    /// Particle storage
    pub pool: ParticlePool<A>,
    /// Spawn rate and placement
    pub emitter: Emitter,
    /// Events run for every particle on every update
    pub particle_events: EventList<Particle<A>>,
    /// Capacity policy
    pub memory: AutoMemoryManager,
    /// The effect's own age
    pub age: Lifetime,
    /// What happens when `age` reaches its lifetime
    pub end_of_life: EndOfLife,
    destroy_requested: bool,
}

impl<A: Default> Default for EffectCore<A> {
    fn default() -> Self {
        Self {
            pool: ParticlePool::default(),
            emitter: Emitter::default(),
            particle_events: EventList::new(),
            memory: AutoMemoryManager::default(),
            age: Lifetime::default(),
            end_of_life: EndOfLife::Nothing,
            destroy_requested: false,
        }
    }
}

impl<A> EffectCore<A> {
    /// Ask for the effect to be destroyed
    ///
    /// The current update stops after the step that made the request.
    pub fn request_destroy(&mut self) {
        self.destroy_requested = true;
    }

    /// Whether destruction has been requested
    pub fn destroy_requested(&self) -> bool {
        self.destroy_requested
    }
}

impl<A> Aging for EffectCore<A> {
    fn age(&self) -> &Lifetime {
        &self.age
    }

    fn age_mut(&mut self) -> &mut Lifetime {
        &mut self.age
    }
}
