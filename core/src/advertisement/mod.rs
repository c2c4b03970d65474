//! BLE proximity advertisements
//!
//! - **format**: versioned wire layout (marker, mode tag, public key, EID)
//! - **generator**: builds the advertisement a local device broadcasts
//! - **matcher**: maps observed advertisements back to known devices
//!
//! Radio transmission and scanning live in the platform layer; this module
//! only defines and interprets the bytes.

pub mod format;
pub mod generator;
pub mod matcher;

pub use format::{
    encoded_len, Advertisement, AdvertisementError, ADVERTISEMENT_VERSION, FORMAT_MARKER,
    HEADER_LEN, MAX_PUBLIC_KEY_LEN,
};
pub use generator::BleAdvertisementGenerator;
pub use matcher::AdvertisementMatcher;
