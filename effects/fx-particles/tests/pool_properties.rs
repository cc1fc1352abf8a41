//! Partitioning, resizing and growth of the particle pool

mod common;

use fx_particles::{
    AutoMemoryManager, Effect, EffectId, EffectSettings, MemoryMode, MemorySettings, NoGrowth,
    Particle, ParticlePool, Spawn, SpawnPlacement,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Acquire,
    Release(usize),
    ReleaseAll,
    Resize(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Acquire),
        3 => (0usize..64).prop_map(Op::Release),
        1 => Just(Op::ReleaseAll),
        1 => (0usize..48).prop_map(Op::Resize),
    ]
}

fn tagged(tag: u32) -> Particle<u32> {
    let mut particle = Particle::new(0.0);
    particle.attributes = tag;
    particle
}

fn tags(pool: &ParticlePool<u32>) -> Vec<u32> {
    pool.iter_active().map(|(_, p)| p.attributes).collect()
}

proptest! {
    #[test]
    fn test_active_and_inactive_partition_capacity(
        capacity in 0usize..32,
        max_allowed in 0usize..48,
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let mut pool: ParticlePool<u32> = ParticlePool::new(capacity, max_allowed);
        let mut growth = AutoMemoryManager::new(MemorySettings {
            mode: MemoryMode::IncreaseOnly,
            ..MemorySettings::default()
        });
        let mut next_tag = 0;

        for op in ops {
            match op {
                Op::Acquire => {
                    let source = tagged(next_tag);
                    next_tag += 1;
                    pool.try_acquire(Spawn::CopyFrom(&source), &mut growth);
                }
                Op::Release(n) => {
                    let victim = pool.active_handles().nth(n);
                    if let Some(handle) = victim {
                        prop_assert!(pool.release(handle));
                    }
                }
                Op::ReleaseAll => {
                    pool.release_all();
                }
                Op::Resize(n) => pool.resize_capacity(n),
            }

            prop_assert_eq!(pool.active_count() + pool.inactive_count(), pool.capacity());
            prop_assert_eq!(pool.iter_active().count(), pool.active_count());
            prop_assert!(pool.active_count() <= pool.max_allowed().max(pool.capacity()));
        }
    }

    #[test]
    fn test_resize_round_trip_keeps_survivors(
        spawned in 0usize..20,
        n in 0usize..24,
        m in 0usize..24,
    ) {
        let mut pool: ParticlePool<u32> = ParticlePool::new(20, 20);
        for tag in 0..spawned as u32 {
            pool.try_acquire(Spawn::CopyFrom(&tagged(tag)), &mut NoGrowth);
        }
        let before = tags(&pool);

        pool.resize_capacity(n);
        pool.resize_capacity(m);
        pool.resize_capacity(n);

        let kept = before.len().min(n).min(m);
        prop_assert_eq!(tags(&pool), before[..kept].to_vec());
    }
}

#[test]
fn test_release_all_round_trip() {
    let mut pool: ParticlePool<u32> = ParticlePool::new(6, 6);
    for tag in 0..4 {
        assert!(
            pool.try_acquire(Spawn::CopyFrom(&tagged(tag)), &mut NoGrowth)
                .is_some()
        );
    }

    pool.release_all();
    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.inactive_count(), pool.capacity());

    assert!(
        pool.try_acquire(Spawn::Initialize(SpawnPlacement::IDENTITY), &mut NoGrowth)
            .is_some()
    );
    assert_eq!(pool.capacity(), 6);
}

#[test]
fn test_auto_growth_stops_at_ceiling() {
    common::init_logging();
    let mut effect: Effect = Effect::new(EffectId::new(1));
    effect
        .initialize(EffectSettings {
            particles_allocated: 10,
            max_particles_allowed: 15,
            memory: MemorySettings {
                mode: MemoryMode::IncreaseOnly,
                increase_factor: 2.0,
                ..MemorySettings::default()
            },
            ..EffectSettings::default()
        })
        .unwrap();

    let mut capacities = Vec::new();
    for _ in 0..15 {
        assert!(effect.add_particle(SpawnPlacement::IDENTITY).unwrap().is_some());
        capacities.push(effect.capacity());
    }

    assert_eq!(capacities[9], 10);
    assert_eq!(capacities[10], 15);
    assert!(effect.add_particle(SpawnPlacement::IDENTITY).unwrap().is_none());
    assert_eq!(effect.capacity(), 15);
}

#[test]
fn test_growth_disabled_fails_on_exhaustion() {
    let mut effect: Effect = Effect::new(EffectId::new(1));
    effect.initialize(common::fixed_pool(3)).unwrap();
    effect.set_max_particles_allowed(10);

    for _ in 0..3 {
        assert!(effect.add_particle(SpawnPlacement::IDENTITY).unwrap().is_some());
    }
    assert!(effect.add_particle(SpawnPlacement::IDENTITY).unwrap().is_none());
    assert_eq!(effect.capacity(), 3);
}

#[test]
fn test_stable_peak_shrinks_pool() {
    let mut effect: Effect = Effect::new(EffectId::new(1));
    effect
        .initialize(EffectSettings {
            particles_allocated: 100,
            max_particles_allowed: 100,
            memory: MemorySettings {
                mode: MemoryMode::DecreaseOnly,
                reduce_factor: 1.5,
                absolute_min: 4,
                stable_seconds: 1.0,
                ..MemorySettings::default()
            },
            ..EffectSettings::default()
        })
        .unwrap();
    effect.emitter_mut().burst_particles(8);

    for _ in 0..4 {
        effect.update(0.5, true).unwrap();
    }

    assert_eq!(effect.capacity(), 12);
    assert_eq!(effect.active_particles(), 8);
    assert_eq!(effect.particles_to_draw().len(), 8);
}
