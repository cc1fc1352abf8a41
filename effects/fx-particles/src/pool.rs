//! Recyclable particle storage
//!
//! The pool owns a fixed number of slots. Every slot is either on the active
//! list (an index-linked list, newest first) or on the free stack, so the two
//! always partition the capacity. Capacity changes move the surviving active
//! particles into fresh storage and keep their relative order.

use std::mem;

use crate::particle::{Particle, SpawnPlacement};

/// Index of a slot holding an active particle
///
/// Handles stay valid until the particle is released or the pool is
/// resized; a resize renumbers every slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleHandle(usize);

impl ParticleHandle {
    /// Slot index this handle refers to
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a freshly acquired slot is filled
#[derive(Debug)]
pub enum Spawn<'a, A> {
    /// Reset, apply the placement, then run the pool's initializer
    Initialize(SpawnPlacement),
    /// Reset, then copy every field from the given particle
    CopyFrom(&'a Particle<A>),
}

impl<A> Clone for Spawn<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Spawn<'_, A> {}

/// Callback run on every particle created through [`Spawn::Initialize`]
pub type Initializer<A> = Box<dyn FnMut(&mut Particle<A>) + Send>;

/// Decides whether an exhausted pool may grow
pub trait CapacityGrowth {
    /// New capacity for a pool with no free slots, or `None` to refuse
    fn grown_capacity(&mut self, capacity: usize, max_allowed: usize) -> Option<usize>;
}

/// Growth policy that never grows
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGrowth;

impl CapacityGrowth for NoGrowth {
    fn grown_capacity(&mut self, _capacity: usize, _max_allowed: usize) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, Default)]
struct Slot<A> {
    particle: Particle<A>,
    prev: Option<usize>,
    next: Option<usize>,
    active: bool,
}

/// Fixed-capacity particle storage with active/free partitioning
pub struct ParticlePool<A = ()> {
    slots: Vec<Slot<A>>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
    active_count: usize,
    max_allowed: usize,
    initializer: Option<Initializer<A>>,
}

impl<A> std::fmt::Debug for ParticlePool<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticlePool")
            .field("capacity", &self.slots.len())
            .field("active", &self.active_count)
            .field("max_allowed", &self.max_allowed)
            .field("has_initializer", &self.initializer.is_some())
            .finish()
    }
}

impl<A: Default> Default for ParticlePool<A> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<A: Default> ParticlePool<A> {
    /// Create a pool with `capacity` free slots
    pub fn new(capacity: usize, max_allowed: usize) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            head: None,
            tail: None,
            free: Vec::new(),
            active_count: 0,
            max_allowed,
            initializer: None,
        };
        pool.allocate(capacity);
        pool
    }

    fn allocate(&mut self, capacity: usize) {
        self.slots = (0..capacity).map(|_| Slot::default()).collect();
        self.free = (0..capacity).rev().collect();
        self.head = None;
        self.tail = None;
        self.active_count = 0;
    }

    /// Take a free slot and make it the newest active particle
    ///
    /// Returns `None` without touching the pool when the active count has
    /// reached `max_allowed`, or when no slot is free and `growth` refuses
    /// to add one.
    pub fn try_acquire(
        &mut self,
        spawn: Spawn<'_, A>,
        growth: &mut dyn CapacityGrowth,
    ) -> Option<ParticleHandle>
    where
        A: Clone,
    {
        if self.active_count >= self.max_allowed {
            return None;
        }

        if self.free.is_empty() {
            let capacity = self.capacity();
            match growth.grown_capacity(capacity, self.max_allowed) {
                Some(grown) if grown > capacity => self.resize_capacity(grown),
                _ => return None,
            }
        }

        let index = self.free.pop()?;
        let particle = &mut self.slots[index].particle;
        particle.reset();
        match spawn {
            Spawn::Initialize(placement) => {
                particle.place(&placement);
                if let Some(initializer) = self.initializer.as_mut() {
                    initializer(particle);
                }
            }
            Spawn::CopyFrom(source) => particle.copy_from(source),
        }

        self.link_front(index);
        Some(ParticleHandle(index))
    }

    /// Change the number of slots
    ///
    /// Growing appends free slots and leaves every existing handle valid.
    /// Shrinking moves the surviving active particles into the low slots,
    /// keeping their relative order and dropping the oldest when there are
    /// more of them than `capacity`; handles taken before a shrink are stale.
    pub fn resize_capacity(&mut self, capacity: usize) {
        let previous = self.capacity();
        if capacity >= previous {
            self.slots.resize_with(capacity, Slot::default);
            self.free.extend((previous..capacity).rev());
            log::debug!(
                "Particle pool grown {previous} -> {capacity} ({} active)",
                self.active_count
            );
            return;
        }

        let oldest_first: Vec<usize> = self.active_indices_oldest_first();
        let dropped = oldest_first.len().saturating_sub(capacity);
        let mut old = mem::take(&mut self.slots);

        self.allocate(capacity);
        self.free.clear();
        for &index in &oldest_first[dropped..] {
            let target = self.active_count;
            self.slots[target].particle = mem::take(&mut old[index].particle);
            self.link_front(target);
        }
        self.free.extend((self.active_count..capacity).rev());

        log::debug!(
            "Particle pool resized {previous} -> {capacity} ({} active, {dropped} dropped)",
            self.active_count
        );
    }
}

impl<A> ParticlePool<A> {
    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active particles
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Number of free slots
    pub fn inactive_count(&self) -> usize {
        self.free.len()
    }

    /// Ceiling on the number of active particles
    pub fn max_allowed(&self) -> usize {
        self.max_allowed
    }

    /// Change the active-particle ceiling; existing particles are kept
    pub fn set_max_allowed(&mut self, max_allowed: usize) {
        self.max_allowed = max_allowed;
    }

    /// Install the callback run on every initialized particle
    pub fn set_initializer(&mut self, initializer: Option<Initializer<A>>) {
        self.initializer = initializer;
    }

    pub(crate) fn take_initializer(&mut self) -> Option<Initializer<A>> {
        self.initializer.take()
    }

    /// Whether an initializer is installed
    pub fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }

    /// Return one particle to the free stack
    ///
    /// Returns false if the handle does not refer to an active particle.
    pub fn release(&mut self, handle: ParticleHandle) -> bool {
        match self.slots.get(handle.0) {
            Some(slot) if slot.active => {
                self.unlink(handle.0);
                self.free.push(handle.0);
                true
            }
            _ => false,
        }
    }

    /// Return every active particle to the free stack
    pub fn release_all(&mut self) -> usize {
        let released = self.active_count;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let slot = &mut self.slots[index];
            cursor = slot.next;
            slot.prev = None;
            slot.next = None;
            slot.active = false;
            self.free.push(index);
        }
        self.head = None;
        self.tail = None;
        self.active_count = 0;
        released
    }

    /// The particle behind an active handle
    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle<A>> {
        self.slots
            .get(handle.0)
            .filter(|slot| slot.active)
            .map(|slot| &slot.particle)
    }

    /// Mutable access to the particle behind an active handle
    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle<A>> {
        self.slots
            .get_mut(handle.0)
            .filter(|slot| slot.active)
            .map(|slot| &mut slot.particle)
    }

    /// Newest active particle
    pub fn first_active(&self) -> Option<ParticleHandle> {
        self.head.map(ParticleHandle)
    }

    /// The active particle after `handle` (the next older one)
    pub fn next_active(&self, handle: ParticleHandle) -> Option<ParticleHandle> {
        self.slots
            .get(handle.0)
            .filter(|slot| slot.active)
            .and_then(|slot| slot.next)
            .map(ParticleHandle)
    }

    /// Active particles, newest first
    pub fn iter_active(&self) -> ActiveIter<'_, A> {
        ActiveIter {
            pool: self,
            cursor: self.head,
            remaining: self.active_count,
        }
    }

    /// Handles of the active particles, newest first
    pub fn active_handles(&self) -> impl Iterator<Item = ParticleHandle> + '_ {
        self.iter_active().map(|(handle, _)| handle)
    }

    fn active_indices_oldest_first(&self) -> Vec<usize> {
        let mut indices = Vec::with_capacity(self.active_count);
        let mut cursor = self.tail;
        while let Some(index) = cursor {
            indices.push(index);
            cursor = self.slots[index].prev;
        }
        indices
    }

    fn link_front(&mut self, index: usize) {
        let old_head = self.head;
        {
            let slot = &mut self.slots[index];
            slot.prev = None;
            slot.next = old_head;
            slot.active = true;
        }
        match old_head {
            Some(head) => self.slots[head].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.active_count += 1;
    }

    fn unlink(&mut self, index: usize) {
        let (prev, next) = {
            let slot = &mut self.slots[index];
            let links = (slot.prev, slot.next);
            slot.prev = None;
            slot.next = None;
            slot.active = false;
            links
        };
        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }
        self.active_count -= 1;
    }
}

/// Iterator over active particles, newest first
pub struct ActiveIter<'a, A> {
    pool: &'a ParticlePool<A>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, A> Iterator for ActiveIter<'a, A> {
    type Item = (ParticleHandle, &'a Particle<A>);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.pool.slots[index];
        self.cursor = slot.next;
        self.remaining -= 1;
        Some((ParticleHandle(index), &slot.particle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<A> ExactSizeIterator for ActiveIter<'_, A> {}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tag(u32);

    struct Grow(usize);

    impl CapacityGrowth for Grow {
        fn grown_capacity(&mut self, capacity: usize, max_allowed: usize) -> Option<usize> {
            Some((capacity + self.0).min(max_allowed))
        }
    }

    fn spawn_tagged(pool: &mut ParticlePool<Tag>, tag: u32) -> Option<ParticleHandle> {
        let mut source = Particle::new(1.0);
        source.attributes = Tag(tag);
        pool.try_acquire(Spawn::CopyFrom(&source), &mut NoGrowth)
    }

    fn tags(pool: &ParticlePool<Tag>) -> Vec<u32> {
        pool.iter_active().map(|(_, p)| p.attributes.0).collect()
    }

    fn assert_partitioned<A>(pool: &ParticlePool<A>) {
        assert_eq!(pool.active_count() + pool.inactive_count(), pool.capacity());
        assert_eq!(pool.iter_active().count(), pool.active_count());
    }

    #[test]
    fn test_new_pool_is_all_free() {
        let pool: ParticlePool = ParticlePool::new(8, 8);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.inactive_count(), 8);
        assert!(pool.first_active().is_none());
    }

    #[test]
    fn test_acquire_is_newest_first() {
        let mut pool = ParticlePool::new(4, 4);
        for tag in 1..=3 {
            spawn_tagged(&mut pool, tag).unwrap();
        }
        assert_eq!(tags(&pool), vec![3, 2, 1]);
        assert_partitioned(&pool);
    }

    #[test]
    fn test_acquire_respects_max_allowed() {
        let mut pool = ParticlePool::new(4, 2);
        assert!(spawn_tagged(&mut pool, 1).is_some());
        assert!(spawn_tagged(&mut pool, 2).is_some());
        assert!(spawn_tagged(&mut pool, 3).is_none());
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn test_exhausted_pool_without_growth_fails() {
        let mut pool = ParticlePool::new(1, 10);
        assert!(spawn_tagged(&mut pool, 1).is_some());
        assert!(spawn_tagged(&mut pool, 2).is_none());
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn test_exhausted_pool_grows() {
        let mut pool = ParticlePool::new(1, 3);
        let mut growth = Grow(5);
        let source: Particle<Tag> = Particle::new(1.0);
        for _ in 0..3 {
            assert!(
                pool.try_acquire(Spawn::CopyFrom(&source), &mut growth)
                    .is_some()
            );
        }
        assert_eq!(pool.capacity(), 3);
        assert!(
            pool.try_acquire(Spawn::CopyFrom(&source), &mut growth)
                .is_none()
        );
    }

    #[test]
    fn test_initializer_runs_after_placement() {
        let mut pool: ParticlePool<Tag> = ParticlePool::new(2, 2);
        pool.set_initializer(Some(Box::new(|particle: &mut Particle<Tag>| {
            particle.attributes = Tag(7);
            particle.position += Vec3::Y;
        })));

        let placement = SpawnPlacement::new(Vec3::X, glam::Quat::IDENTITY);
        let handle = pool
            .try_acquire(Spawn::Initialize(placement), &mut NoGrowth)
            .unwrap();
        let particle = pool.get(handle).unwrap();
        assert_eq!(particle.attributes, Tag(7));
        assert_eq!(particle.position, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_acquire_resets_recycled_slot() {
        let mut pool: ParticlePool<Tag> = ParticlePool::new(1, 1);
        let handle = spawn_tagged(&mut pool, 9).unwrap();
        pool.get_mut(handle).unwrap().visible = false;
        assert!(pool.release(handle));

        let handle = pool
            .try_acquire(Spawn::Initialize(SpawnPlacement::IDENTITY), &mut NoGrowth)
            .unwrap();
        let particle = pool.get(handle).unwrap();
        assert!(particle.visible);
        assert_eq!(particle.attributes, Tag(0));
    }

    #[test]
    fn test_release_middle_keeps_order() {
        let mut pool = ParticlePool::new(4, 4);
        spawn_tagged(&mut pool, 1).unwrap();
        let middle = spawn_tagged(&mut pool, 2).unwrap();
        spawn_tagged(&mut pool, 3).unwrap();

        assert!(pool.release(middle));
        assert!(!pool.release(middle));
        assert_eq!(tags(&pool), vec![3, 1]);
        assert!(pool.get(middle).is_none());
        assert_partitioned(&pool);
    }

    #[test]
    fn test_release_all_then_reuse() {
        let mut pool = ParticlePool::new(3, 3);
        for tag in 0..3 {
            spawn_tagged(&mut pool, tag).unwrap();
        }
        assert_eq!(pool.release_all(), 3);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.inactive_count(), 3);

        assert!(spawn_tagged(&mut pool, 4).is_some());
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn test_resize_preserves_order() {
        let mut pool = ParticlePool::new(4, 10);
        for tag in 1..=4 {
            spawn_tagged(&mut pool, tag).unwrap();
        }

        pool.resize_capacity(8);
        assert_eq!(tags(&pool), vec![4, 3, 2, 1]);
        assert_eq!(pool.inactive_count(), 4);
        assert_partitioned(&pool);
    }

    #[test]
    fn test_growth_keeps_handles_valid() {
        let mut pool = ParticlePool::new(3, 10);
        let first = spawn_tagged(&mut pool, 1).unwrap();
        let second = spawn_tagged(&mut pool, 2).unwrap();
        let third = spawn_tagged(&mut pool, 3).unwrap();
        assert!(pool.release(first));
        spawn_tagged(&mut pool, 4).unwrap();

        let mut source = Particle::new(1.0);
        source.attributes = Tag(5);
        assert!(
            pool.try_acquire(Spawn::CopyFrom(&source), &mut Grow(2))
                .is_some()
        );

        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.get(second).unwrap().attributes, Tag(2));
        assert_eq!(pool.get(third).unwrap().attributes, Tag(3));
        assert_eq!(tags(&pool), vec![5, 4, 3, 2]);
        assert_partitioned(&pool);
    }

    #[test]
    fn test_resize_drops_oldest() {
        let mut pool = ParticlePool::new(4, 10);
        for tag in 1..=4 {
            spawn_tagged(&mut pool, tag).unwrap();
        }

        pool.resize_capacity(2);
        assert_eq!(tags(&pool), vec![4, 3]);
        assert_eq!(pool.inactive_count(), 0);

        pool.resize_capacity(0);
        assert_eq!(pool.active_count(), 0);
        assert_partitioned(&pool);
    }

    #[test]
    fn test_cursor_walk() {
        let mut pool = ParticlePool::new(3, 3);
        for tag in 1..=3 {
            spawn_tagged(&mut pool, tag).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = pool.first_active();
        while let Some(handle) = cursor {
            cursor = pool.next_active(handle);
            seen.push(pool.get(handle).unwrap().attributes.0);
        }
        assert_eq!(seen, vec![3, 2, 1]);
    }
}
