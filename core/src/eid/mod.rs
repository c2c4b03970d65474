//! Ephemeral ID derivation
//!
//! - **raw**: keyed one-way derivation of EID bytes from seed material
//! - **profile**: foreground/background rotation configurations
//! - **engine**: seed selection, window alignment and nearest-window sets
//! - **scan_filter**: current + adjacent EIDs for the local device's own seeds

pub mod engine;
pub mod profile;
pub mod raw;
pub mod scan_filter;

pub use engine::{EidEngine, EidGenerator};
pub use profile::{
    ProfileError, RotationMode, RotationProfile, DEFAULT_BACKGROUND_NEAREST_RADIUS,
    DEFAULT_BACKGROUND_PERIOD_MINUTES, DEFAULT_FOREGROUND_NEAREST_RADIUS,
    DEFAULT_FOREGROUND_PERIOD_MINUTES, MAX_NEAREST_RADIUS,
};
pub use raw::{Blake3RawEidGenerator, RawEidGenerator, EID_LEN, EID_SALT};
pub use scan_filter::{AdjacentEid, AdjacentKind, EidData};

#[cfg(test)]
pub use engine::MockEidGenerator;
