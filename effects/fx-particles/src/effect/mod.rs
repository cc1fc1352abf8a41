//! Effect controller
//!
//! An [`Effect`] owns one particle pool, one emitter, a particle-level and an
//! effect-level event list, and the memory manager that sizes the pool. One
//! call to [`Effect::update`] runs a whole frame:
//!
//! 1. effect-level events (the effect's own age, including repeat wraps)
//! 2. the emitter, which decides how many particles to spawn
//! 3. spawning, with each new particle placed along the emitter's path and
//!    caught up to the end of the frame
//! 4. aging every older particle through the particle-level events and
//!    reclaiming the ones that expired
//! 5. the memory manager, which may shrink the pool
//!
//! Destruction requested by a callback stops the frame after the step that
//! requested it.

mod draw;
mod shared;

pub use self::draw::DrawList;
pub use self::shared::EffectCore;

use std::fmt;

use crate::clock::UpdateClock;
use crate::emitter::{Emitter, spawn_catch_up};
use crate::error::{FxError, Result};
use crate::events::EventList;
use crate::lifetime::Lifetime;
use crate::memory::AutoMemoryManager;
use crate::particle::{Particle, SpawnPlacement};
use crate::pool::{Initializer, ParticleHandle, ParticlePool, Spawn};
use crate::settings::{EffectSettings, clamp_speed};

/// Identifier of an effect instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Wrap a raw id
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// Lifecycle of an effect
///
/// A disabled but active effect is suspended: updates are skipped and the
/// draw list stays as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    /// Created, waiting for [`Effect::initialize`]
    Uninitialized,
    /// Running
    Active,
    /// Torn down; terminal
    Destroyed,
}

/// Result of one [`Effect::update`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A frame ran
    Updated {
        /// Particles created this frame
        spawned: usize,
        /// Particles returned to the pool this frame
        reclaimed: usize,
        /// Particles in the draw list
        drawn: usize,
    },
    /// Nothing ran: suspended, throttled, or not the authoritative call
    Skipped,
    /// The effect was destroyed during this call
    Destroyed,
}

/// A particle effect
pub struct Effect<A = ()> {
    id: EffectId,
    state: EffectState,
    /// Suspends updates when false
    pub enabled: bool,
    settings: EffectSettings,
    core: EffectCore<A>,
    events: EventList<EffectCore<A>>,
    clock: UpdateClock,
    draw: Vec<ParticleHandle>,
}

impl<A: fmt::Debug> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("enabled", &self.enabled)
            .field("settings", &self.settings)
            .field("core", &self.core)
            .field("events", &self.events)
            .field("drawn", &self.draw.len())
            .finish()
    }
}

impl<A> Effect<A> {
    /// Identifier
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Lifecycle state
    pub fn state(&self) -> EffectState {
        self.state
    }

    /// Whether the effect is initialized and not destroyed
    pub fn is_alive(&self) -> bool {
        self.state == EffectState::Active
    }

    /// Whether the effect has been torn down
    pub fn is_destroyed(&self) -> bool {
        self.state == EffectState::Destroyed
    }

    /// Settings in use (clamped)
    pub fn settings(&self) -> &EffectSettings {
        &self.settings
    }

    /// Pool, emitter, particle events and the effect's age
    pub fn core(&self) -> &EffectCore<A> {
        &self.core
    }

    /// Mutable access to the core
    pub fn core_mut(&mut self) -> &mut EffectCore<A> {
        &mut self.core
    }

    /// Effect-level events
    pub fn events(&self) -> &EventList<EffectCore<A>> {
        &self.events
    }

    /// Mutable access to the effect-level events
    pub fn events_mut(&mut self) -> &mut EventList<EffectCore<A>> {
        &mut self.events
    }

    /// Particle-level events
    pub fn particle_events_mut(&mut self) -> &mut EventList<Particle<A>> {
        &mut self.core.particle_events
    }

    /// The emitter
    pub fn emitter_mut(&mut self) -> &mut Emitter {
        &mut self.core.emitter
    }

    /// The effect's own age
    pub fn age(&self) -> &Lifetime {
        &self.core.age
    }

    /// Install or clear the callback run on every emitted particle
    pub fn set_initializer(&mut self, initializer: Option<Initializer<A>>) {
        self.core.pool.set_initializer(initializer);
    }

    /// Number of active particles
    pub fn active_particles(&self) -> usize {
        self.core.pool.active_count()
    }

    /// Pool capacity
    pub fn capacity(&self) -> usize {
        self.core.pool.capacity()
    }

    /// Set the user time scale; negative values pause
    pub fn set_simulation_speed(&mut self, speed: f32) {
        self.settings.simulation_speed = clamp_speed("simulation_speed", speed);
    }

    /// Set the effect's own time scale; negative values pause
    pub fn set_internal_simulation_speed(&mut self, speed: f32) {
        self.settings.internal_simulation_speed =
            clamp_speed("internal_simulation_speed", speed);
    }

    /// Change the logical update cap (0 = every call)
    pub fn set_updates_per_second(&mut self, updates_per_second: u32) {
        self.settings.updates_per_second = updates_per_second;
        self.clock.set_updates_per_second(updates_per_second);
    }

    /// Change the active-particle ceiling
    pub fn set_max_particles_allowed(&mut self, max: usize) {
        self.settings.max_particles_allowed = max;
        self.core.pool.set_max_allowed(max);
    }

    /// The particles to draw after the most recent update
    pub fn particles_to_draw(&self) -> DrawList<'_, A> {
        DrawList::new(&self.core.pool, &self.draw)
    }

    /// Fill `out` with one renderer-specific entry per particle to draw
    ///
    /// `out` is cleared first; returns the number of entries written.
    pub fn fill_draw_buffer<V, F>(&self, out: &mut Vec<V>, extract: F) -> usize
    where
        F: FnMut(&Particle<A>) -> V,
    {
        out.clear();
        out.extend(self.particles_to_draw().iter().map(extract));
        out.len()
    }

    /// Tear the effect down, releasing every particle and event
    pub fn destroy(&mut self) {
        if self.state == EffectState::Destroyed {
            return;
        }
        let released = self.core.pool.release_all();
        self.core.particle_events.remove_all();
        self.events.remove_all();
        self.draw.clear();
        self.state = EffectState::Destroyed;
        log::debug!("{} destroyed, {released} particles released", self.id);
    }

    fn check_alive(&self) -> Result<()> {
        match self.state {
            EffectState::Active => Ok(()),
            EffectState::Uninitialized => Err(FxError::NotInitialized(self.id.get())),
            EffectState::Destroyed => Err(FxError::Destroyed(self.id.get())),
        }
    }

    fn rebuild_draw_list(&mut self) {
        self.draw.clear();
        let visible = self
            .core
            .pool
            .iter_active()
            .filter(|(_, particle)| particle.visible)
            .map(|(handle, _)| handle);
        self.draw.extend(visible);
    }
}

impl<A: Default + Clone> Effect<A> {
    /// Create an uninitialized effect
    pub fn new(id: EffectId) -> Self {
        Self {
            id,
            state: EffectState::Uninitialized,
            enabled: true,
            settings: EffectSettings::default(),
            core: EffectCore::default(),
            events: EventList::new(),
            clock: UpdateClock::default(),
            draw: Vec::new(),
        }
    }

    /// Allocate the pool and apply `settings`
    ///
    /// Settings are validated and clamped first; on error nothing changes.
    /// Re-initializing a live effect releases its particles but keeps the
    /// registered events and the initializer.
    pub fn initialize(&mut self, settings: EffectSettings) -> Result<()> {
        if self.state == EffectState::Destroyed {
            return Err(FxError::Destroyed(self.id.get()));
        }
        let settings = settings.sanitized()?;

        let mut pool =
            ParticlePool::new(settings.particles_allocated, settings.max_particles_allowed);
        pool.set_initializer(self.core.pool.take_initializer());

        self.core.pool = pool;
        self.core.emitter = Emitter::new(&settings.emitter);
        self.core.memory = AutoMemoryManager::new(settings.memory);
        self.core.age = Lifetime::new(settings.lifetime);
        self.core.end_of_life = settings.end_of_life;
        self.clock = UpdateClock::new(settings.updates_per_second);
        self.draw.clear();
        self.settings = settings;
        self.state = EffectState::Active;

        log::debug!(
            "{} initialized: {} slots, {} allowed",
            self.id,
            self.settings.particles_allocated,
            self.settings.max_particles_allowed
        );
        Ok(())
    }

    /// Advance the effect by `seconds` of real time
    ///
    /// `authoritative` marks the host's once-per-frame call; with
    /// `host_driven` set every other call is skipped. A failing callback
    /// aborts the frame and its error is returned; steps that already
    /// completed stay applied.
    pub fn update(&mut self, seconds: f32, authoritative: bool) -> Result<UpdateOutcome> {
        self.check_alive()?;

        if (self.settings.host_driven && !authoritative) || !self.enabled {
            return Ok(UpdateOutcome::Skipped);
        }

        let Some(elapsed) = self.clock.tick(seconds.max(0.0)) else {
            return Ok(UpdateOutcome::Skipped);
        };
        let scaled =
            elapsed * self.settings.simulation_speed * self.settings.internal_simulation_speed;

        self.run_frame(scaled)
    }

    fn run_frame(&mut self, seconds: f32) -> Result<UpdateOutcome> {
        let end_of_life = self.core.end_of_life;
        let lifetime = self
            .events
            .update_with_lifetime(&mut self.core, seconds, end_of_life)?;
        if self.core.destroy_requested() {
            self.destroy();
            return Ok(UpdateOutcome::Destroyed);
        }

        let count = self.core.emitter.update_and_get_spawn_count(seconds);
        if self.core.destroy_requested() {
            self.destroy();
            return Ok(UpdateOutcome::Destroyed);
        }

        self.core.particle_events.begin_frame();
        let (spawned, fresh, mut reclaimed) = self.spawn(count, seconds)?;
        reclaimed += self.age_particles(fresh, seconds)?;
        self.core.particle_events.purge_one_shots();

        let pool = &mut self.core.pool;
        if let Some(capacity) =
            self.core
                .memory
                .observe(pool.active_count(), pool.capacity(), seconds)
        {
            pool.resize_capacity(capacity);
        }

        if lifetime.expired || self.core.destroy_requested() {
            self.destroy();
            return Ok(UpdateOutcome::Destroyed);
        }

        self.rebuild_draw_list();
        log::trace!(
            "{}: spawned {spawned}, reclaimed {reclaimed}, drawing {}",
            self.id,
            self.draw.len()
        );

        Ok(UpdateOutcome::Updated {
            spawned,
            reclaimed,
            drawn: self.draw.len(),
        })
    }

    // Returns (created, still active, reclaimed). Spawns that survive their
    // catch-up step end up at the front of the active list.
    fn spawn(&mut self, count: u32, seconds: f32) -> Result<(usize, usize, usize)> {
        let core = &mut self.core;
        let (mut spawned, mut fresh, mut reclaimed) = (0, 0, 0);

        for index in 0..count {
            let placement = core.emitter.placement(index, count);
            let Some(handle) = core
                .pool
                .try_acquire(Spawn::Initialize(placement), &mut core.memory)
            else {
                break;
            };
            spawned += 1;

            let catch_up = spawn_catch_up(seconds, index, count);
            if advance_particle(&mut core.pool, &mut core.particle_events, handle, catch_up)? {
                fresh += 1;
            } else {
                reclaimed += 1;
            }
        }

        core.emitter.commit_transform();
        Ok((spawned, fresh, reclaimed))
    }

    fn age_particles(&mut self, skip: usize, seconds: f32) -> Result<usize> {
        let core = &mut self.core;
        let mut reclaimed = 0;

        let mut cursor = core.pool.first_active();
        for _ in 0..skip {
            cursor = cursor.and_then(|handle| core.pool.next_active(handle));
        }

        while let Some(handle) = cursor {
            cursor = core.pool.next_active(handle);
            if !advance_particle(&mut core.pool, &mut core.particle_events, handle, seconds)? {
                reclaimed += 1;
            }
        }

        Ok(reclaimed)
    }

    /// Insert one particle outside the emitter
    ///
    /// Runs the initializer like an emitted particle. Returns `Ok(None)` when
    /// the pool is at its ceiling and may not grow.
    pub fn add_particle(&mut self, placement: SpawnPlacement) -> Result<Option<ParticleHandle>> {
        self.check_alive()?;
        let core = &mut self.core;
        Ok(core
            .pool
            .try_acquire(Spawn::Initialize(placement), &mut core.memory))
    }

    /// Insert a copy of `particle` outside the emitter
    pub fn add_particle_copy(&mut self, particle: &Particle<A>) -> Result<Option<ParticleHandle>> {
        self.check_alive()?;
        let core = &mut self.core;
        Ok(core
            .pool
            .try_acquire(Spawn::CopyFrom(particle), &mut core.memory))
    }

    /// Resize the pool by hand; the oldest particles are dropped if needed
    pub fn resize_capacity(&mut self, capacity: usize) -> Result<()> {
        self.check_alive()?;
        self.core.pool.resize_capacity(capacity);
        self.core.memory.reset();
        self.rebuild_draw_list();
        Ok(())
    }
}

// Ages one particle and runs its events; reclaims it if it expired. An
// expired particle is reclaimed even when one of its callbacks failed.
fn advance_particle<A>(
    pool: &mut ParticlePool<A>,
    events: &mut EventList<Particle<A>>,
    handle: ParticleHandle,
    seconds: f32,
) -> Result<bool> {
    let Some(particle) = pool.get_mut(handle) else {
        return Ok(false);
    };
    particle.age.advance(seconds);
    let fired = events.update(particle, seconds);

    if particle.is_active() {
        fired.map(|()| true)
    } else {
        pool.release(handle);
        fired.map(|()| false)
    }
}
