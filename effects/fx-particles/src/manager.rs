//! Registry of running effects

use crate::effect::{Effect, EffectId, UpdateOutcome};
use crate::error::Result;
use crate::settings::{EffectSettings, clamp_speed};

/// Hands out effect ids, starting at 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    /// Create a generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused id
    pub fn next_id(&mut self) -> EffectId {
        let id = EffectId::new(self.next);
        self.next += 1;
        id
    }
}

/// What the manager needs from an effect, independent of its particle type
pub trait ManagedEffect {
    /// Identifier
    fn id(&self) -> EffectId;

    /// Run one host frame
    fn update(&mut self, seconds: f32, authoritative: bool) -> Result<UpdateOutcome>;

    /// Tear the effect down
    fn destroy(&mut self);

    /// Whether the effect has been torn down
    fn is_destroyed(&self) -> bool;

    /// Number of active particles
    fn active_particles(&self) -> usize;

    /// Number of particles in the draw list
    fn drawn_particles(&self) -> usize;

    /// Pool capacity
    fn capacity(&self) -> usize;
}

impl<A: Default + Clone> ManagedEffect for Effect<A> {
    fn id(&self) -> EffectId {
        Effect::id(self)
    }

    fn update(&mut self, seconds: f32, authoritative: bool) -> Result<UpdateOutcome> {
        Effect::update(self, seconds, authoritative)
    }

    fn destroy(&mut self) {
        Effect::destroy(self);
    }

    fn is_destroyed(&self) -> bool {
        Effect::is_destroyed(self)
    }

    fn active_particles(&self) -> usize {
        Effect::active_particles(self)
    }

    fn drawn_particles(&self) -> usize {
        self.particles_to_draw().len()
    }

    fn capacity(&self) -> usize {
        Effect::capacity(self)
    }
}

/// Totals from one [`EffectManager::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameStats {
    /// Effects that ran a frame
    pub updated: usize,
    /// Effects that skipped this frame
    pub skipped: usize,
    /// Effects destroyed and dropped this frame
    pub destroyed: usize,
    /// Particles spawned across all effects
    pub spawned: usize,
    /// Particles reclaimed across all effects
    pub reclaimed: usize,
    /// Particles drawn across all effects
    pub drawn: usize,
    /// Active particles after the update
    pub active: usize,
    /// Combined pool capacity after the update
    pub capacity: usize,
}

/// Owns a set of effects and updates them together
///
/// Effects are updated in insertion order. Destroyed effects are dropped at
/// the end of the update that destroyed them.
pub struct EffectManager {
    ids: IdGenerator,
    effects: Vec<Box<dyn ManagedEffect>>,
    simulation_speed: f32,
}

impl Default for EffectManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EffectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectManager")
            .field("ids", &self.ids)
            .field("effects", &self.effects.len())
            .field("simulation_speed", &self.simulation_speed)
            .finish()
    }
}

impl EffectManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            ids: IdGenerator::new(),
            effects: Vec::new(),
            simulation_speed: 1.0,
        }
    }

    /// Reserve an id for an effect built by hand
    pub fn next_id(&mut self) -> EffectId {
        self.ids.next_id()
    }

    /// Create, initialize and configure an effect, then take ownership of it
    pub fn create<A, F>(&mut self, settings: EffectSettings, configure: F) -> Result<EffectId>
    where
        A: Default + Clone + 'static,
        F: FnOnce(&mut Effect<A>) -> Result<()>,
    {
        let mut effect = Effect::new(self.next_id());
        effect.initialize(settings)?;
        configure(&mut effect)?;
        Ok(self.insert(effect))
    }

    /// Take ownership of an effect
    pub fn insert<E: ManagedEffect + 'static>(&mut self, effect: E) -> EffectId {
        let id = effect.id();
        log::debug!("Managing {id}");
        self.effects.push(Box::new(effect));
        id
    }

    /// Stop managing an effect and hand it back
    pub fn remove(&mut self, id: EffectId) -> Option<Box<dyn ManagedEffect>> {
        let index = self.effects.iter().position(|e| e.id() == id)?;
        Some(self.effects.remove(index))
    }

    /// The effect with the given id
    pub fn get(&self, id: EffectId) -> Option<&dyn ManagedEffect> {
        self.effects
            .iter()
            .find(|e| e.id() == id)
            .map(|e| e.as_ref())
    }

    /// Destroy the effect with the given id; it is dropped on the next update
    pub fn destroy(&mut self, id: EffectId) -> bool {
        match self.effects.iter_mut().find(|e| e.id() == id) {
            Some(effect) => {
                effect.destroy();
                true
            }
            None => false,
        }
    }

    /// Destroy and drop every effect
    pub fn clear(&mut self) {
        for effect in &mut self.effects {
            effect.destroy();
        }
        self.effects.clear();
    }

    /// Number of managed effects
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no effect is managed
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Ids of the managed effects, in update order
    pub fn ids(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.effects.iter().map(|e| e.id())
    }

    /// Time scale applied to every effect
    pub fn simulation_speed(&self) -> f32 {
        self.simulation_speed
    }

    /// Set the manager-wide time scale; negative values pause
    pub fn set_simulation_speed(&mut self, speed: f32) {
        self.simulation_speed = clamp_speed("simulation_speed", speed);
    }

    /// Active particles across all effects
    pub fn active_particles(&self) -> usize {
        self.effects.iter().map(|e| e.active_particles()).sum()
    }

    /// Run one authoritative frame on every effect
    ///
    /// A callback error stops the update and is returned; effects later in
    /// the order are not updated this frame.
    pub fn update(&mut self, seconds: f32) -> Result<FrameStats> {
        let scaled = seconds * self.simulation_speed;
        let mut stats = FrameStats::default();

        for effect in &mut self.effects {
            if effect.is_destroyed() {
                continue;
            }
            match effect.update(scaled, true)? {
                UpdateOutcome::Updated {
                    spawned,
                    reclaimed,
                    ..
                } => {
                    stats.updated += 1;
                    stats.spawned += spawned;
                    stats.reclaimed += reclaimed;
                }
                UpdateOutcome::Skipped => stats.skipped += 1,
                UpdateOutcome::Destroyed => {}
            }
        }

        let before = self.effects.len();
        self.effects.retain(|e| !e.is_destroyed());
        stats.destroyed = before - self.effects.len();

        for effect in &self.effects {
            stats.drawn += effect.drawn_particles();
            stats.active += effect.active_particles();
            stats.capacity += effect.capacity();
        }

        Ok(stats)
    }
}
