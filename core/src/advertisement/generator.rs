// Builds the advertisement a local device broadcasts to a remote device

use crate::advertisement::format::{Advertisement, MAX_PUBLIC_KEY_LEN};
use crate::clock::Clock;
use crate::eid::{EidEngine, EidGenerator, EID_LEN};
use crate::instrumentation::ProximityObserver;
use crate::model::{DataWithTimestamp, RemoteDevice};
use std::sync::Arc;
use tracing::{debug, warn};

/// Stateless advertisement generator.
///
/// Every call derives a fresh EID for "now" from the remote device's seeds;
/// nothing is cached between calls.
pub struct BleAdvertisementGenerator {
    eid_generator: Arc<dyn EidGenerator>,
    clock: Arc<dyn Clock>,
    observer: Option<Arc<dyn ProximityObserver>>,
}

impl BleAdvertisementGenerator {
    /// Create a generator using the default foreground engine
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_eid_generator(Arc::new(EidEngine::foreground()), clock)
    }

    /// Create a generator with an explicit EID engine
    pub fn with_eid_generator(eid_generator: Arc<dyn EidGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            eid_generator,
            clock,
            observer: None,
        }
    }

    /// Attach an observer notified after every call
    pub fn with_observer(mut self, observer: Arc<dyn ProximityObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the advertisement `local_device_public_key`'s owner broadcasts so
    /// that `remote_device` can recognize it.
    ///
    /// Returns `None` if the key is empty or too long, the remote device has no
    /// usable beacon seeds, or no seed covers the current time.
    ///
    /// # Panics
    ///
    /// Panics if the EID engine returns an EID that is not [`EID_LEN`] bytes.
    pub fn generate_advertisement(
        &self,
        remote_device: &RemoteDevice,
        local_device_public_key: &[u8],
    ) -> Option<DataWithTimestamp> {
        let advertisement = self.build_advertisement(remote_device, local_device_public_key);
        if let Some(observer) = &self.observer {
            observer.on_advertisement_generated(remote_device.device_id(), advertisement.is_some());
        }
        advertisement
    }

    fn build_advertisement(
        &self,
        remote_device: &RemoteDevice,
        local_device_public_key: &[u8],
    ) -> Option<DataWithTimestamp> {
        if local_device_public_key.is_empty() {
            debug!("Cannot generate advertisement: local public key is empty");
            return None;
        }

        if !remote_device.has_usable_beacon_seeds() {
            debug!(
                device_id = remote_device.device_id(),
                "Cannot generate advertisement: remote device has no beacon seeds"
            );
            return None;
        }

        if local_device_public_key.len() > MAX_PUBLIC_KEY_LEN {
            warn!(
                key_len = local_device_public_key.len(),
                "Cannot generate advertisement: local public key too long"
            );
            return None;
        }

        let now = self.clock.now_millis();
        let Some(eid) = self.eid_generator.derive_eid(
            remote_device.beacon_seeds(),
            now,
            local_device_public_key,
        ) else {
            debug!(
                device_id = remote_device.device_id(),
                now,
                "Cannot generate advertisement: no beacon seed covers the current time"
            );
            return None;
        };

        assert_eq!(
            eid.data.len(),
            EID_LEN,
            "EID generator returned a malformed EID"
        );

        let mode = self.eid_generator.profile().mode();
        let advertisement = Advertisement::new(mode, local_device_public_key, &eid.data).ok()?;

        Some(DataWithTimestamp::new(
            advertisement.encode(),
            eid.start_timestamp_ms,
            eid.end_timestamp_ms,
        ))
    }
}
