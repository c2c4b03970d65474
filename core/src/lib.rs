// proxid core — rotating BLE proximity identifiers
//
// Two devices that want a proximity-authenticated link recognize each other
// through short-lived EIDs derived from time-windowed beacon seeds. Nothing
// stable or trackable ever goes over the air.

pub mod advertisement;
pub mod clock;
pub mod config;
pub mod eid;
pub mod instrumentation;
pub mod model;
pub mod registry;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use advertisement::{
    Advertisement, AdvertisementError, AdvertisementMatcher, BleAdvertisementGenerator,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ProximityConfig};
pub use eid::{
    EidData, EidEngine, EidGenerator, ProfileError, RawEidGenerator, RotationMode,
    RotationProfile, EID_LEN,
};
pub use instrumentation::{CallCounter, ProximityObserver};
pub use model::{BeaconSeed, DataWithTimestamp, RemoteDevice};
pub use registry::{DeviceRegistry, RegistrySnapshot};
