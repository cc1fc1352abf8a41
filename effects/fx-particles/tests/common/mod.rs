//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fx_particles::{EffectSettings, EventCallback, MemoryMode, MemorySettings};

/// Names recorded by callbacks, in firing order
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that records `name` every time it fires
    pub fn callback<S: 'static>(&self, name: &str) -> EventCallback<S> {
        let log = Arc::clone(&self.0);
        let name = name.to_string();
        EventCallback::new(move |_, _, _| {
            log.lock().unwrap().push(name.clone());
            Ok(())
        })
    }

    pub fn fired(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|n| *n == name).count()
    }
}

/// Settings with a fixed pool and no automatic capacity changes
pub fn fixed_pool(capacity: usize) -> EffectSettings {
    EffectSettings {
        particles_allocated: capacity,
        max_particles_allowed: capacity,
        memory: MemorySettings {
            mode: MemoryMode::Disabled,
            ..MemorySettings::default()
        },
        ..EffectSettings::default()
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
