// Optional hooks for counting and inspecting generate/identify calls.
// Nothing in the core depends on an observer being present.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives notifications from the generator and the matcher
pub trait ProximityObserver: Send + Sync {
    /// An advertisement was requested for `device_id`
    fn on_advertisement_generated(&self, _device_id: &str, _produced: bool) {}

    /// An identify call finished with `matched` (the device id, if any)
    fn on_identify(&self, _matched: Option<&str>) {}
}

/// Observer that counts calls
#[derive(Debug, Default)]
pub struct CallCounter {
    generate_calls: AtomicUsize,
    advertisements_produced: AtomicUsize,
    identify_calls: AtomicUsize,
    identify_matches: AtomicUsize,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::Relaxed)
    }

    pub fn advertisements_produced(&self) -> usize {
        self.advertisements_produced.load(Ordering::Relaxed)
    }

    pub fn identify_calls(&self) -> usize {
        self.identify_calls.load(Ordering::Relaxed)
    }

    pub fn identify_matches(&self) -> usize {
        self.identify_matches.load(Ordering::Relaxed)
    }
}

impl ProximityObserver for CallCounter {
    fn on_advertisement_generated(&self, _device_id: &str, produced: bool) {
        self.generate_calls.fetch_add(1, Ordering::Relaxed);
        if produced {
            self.advertisements_produced.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_identify(&self, matched: Option<&str>) {
        self.identify_calls.fetch_add(1, Ordering::Relaxed);
        if matched.is_some() {
            self.identify_matches.fetch_add(1, Ordering::Relaxed);
        }
    }
}
