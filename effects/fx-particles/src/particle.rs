//! Individual particle representation

use glam::{Quat, Vec3};

use crate::lifetime::{Aging, Lifetime};

/// Where a particle is placed when it is spawned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlacement {
    /// Spawn position
    pub position: Vec3,
    /// Spawn orientation
    pub orientation: Quat,
}

impl SpawnPlacement {
    /// Create a placement from a position and orientation
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Placement at the origin with no rotation
    pub const IDENTITY: Self = Self::new(Vec3::ZERO, Quat::IDENTITY);
}

impl Default for SpawnPlacement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A single particle slot
///
/// The fixed fields cover what the runtime itself needs (age, visibility,
/// transform). Anything effect specific lives in `attributes`, so effects
/// specialise particles by choosing `A` rather than by wrapping the type.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle<A = ()> {
    /// Age bookkeeping, drives activity and timed events
    pub age: Lifetime,
    /// Whether the particle should be handed to the renderer
    pub visible: bool,
    /// World-space position
    pub position: Vec3,
    /// World-space orientation
    pub orientation: Quat,
    /// Velocity vector
    pub velocity: Vec3,
    /// Effect specific data
    pub attributes: A,
}

impl<A: Default> Default for Particle<A> {
    fn default() -> Self {
        Self {
            age: Lifetime::default(),
            visible: true,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            attributes: A::default(),
        }
    }
}

impl<A: Default> Particle<A> {
    /// Create a particle with the given lifetime (0.0 = never expires)
    pub fn new(lifetime: f32) -> Self {
        Self {
            age: Lifetime::new(lifetime),
            ..Self::default()
        }
    }

    /// Return the particle to its freshly allocated state
    pub fn reset(&mut self) {
        self.age = Lifetime::default();
        self.visible = true;
        self.position = Vec3::ZERO;
        self.orientation = Quat::IDENTITY;
        self.velocity = Vec3::ZERO;
        self.attributes = A::default();
    }
}

impl<A: Clone> Particle<A> {
    /// Overwrite this particle with a copy of `other`
    pub fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }
}

impl<A> Particle<A> {
    /// Check if the particle is still alive
    #[inline]
    pub fn is_active(&self) -> bool {
        self.age.is_active()
    }

    /// Apply a spawn placement
    pub fn place(&mut self, placement: &SpawnPlacement) {
        self.position = placement.position;
        self.orientation = placement.orientation;
    }

    /// Integrate velocity and position
    ///
    /// # Arguments
    /// * `dt` - Delta time in seconds
    /// * `force` - Combined acceleration (gravity, wind, ...)
    /// * `drag` - Drag coefficient (0.0 = no drag, 1.0 = full drag)
    pub fn integrate(&mut self, dt: f32, force: Vec3, drag: f32) {
        self.velocity += force * dt;

        if drag > 0.0 {
            self.velocity *= (1.0 - drag.min(1.0)).powf(dt);
        }

        self.position += self.velocity * dt;
    }
}

impl<A> Aging for Particle<A> {
    fn age(&self) -> &Lifetime {
        &self.age
    }

    fn age_mut(&mut self) -> &mut Lifetime {
        &mut self.age
    }
}
