//! Renderer-facing view of the particles to draw

use crate::particle::Particle;
use crate::pool::{ParticleHandle, ParticlePool};

/// The particles to draw after the most recent update, newest first
///
/// Only particles that were active and visible when the update finished
/// are listed.
#[derive(Debug)]
pub struct DrawList<'a, A> {
    pool: &'a ParticlePool<A>,
    handles: &'a [ParticleHandle],
}

impl<A> Clone for DrawList<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for DrawList<'_, A> {}

impl<'a, A> DrawList<'a, A> {
    pub(crate) fn new(pool: &'a ParticlePool<A>, handles: &'a [ParticleHandle]) -> Self {
        Self { pool, handles }
    }

    /// Number of particles to draw
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing is drawn
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The `index`-th particle to draw
    pub fn get(&self, index: usize) -> Option<&'a Particle<A>> {
        let pool = self.pool;
        self.handles
            .get(index)
            .and_then(|handle| pool.get(*handle))
    }

    /// Handles of the particles to draw
    pub fn handles(&self) -> &'a [ParticleHandle] {
        self.handles
    }

    /// Particles to draw, in draw order
    pub fn iter(self) -> impl Iterator<Item = &'a Particle<A>> {
        let pool = self.pool;
        self.handles
            .iter()
            .filter_map(move |handle| pool.get(*handle))
    }
}
