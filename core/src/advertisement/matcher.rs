// Maps an observed advertisement back to the remote device that produced it

use crate::advertisement::format::Advertisement;
use crate::clock::Clock;
use crate::eid::{EidEngine, EidGenerator, RotationMode, EID_LEN};
use crate::instrumentation::ProximityObserver;
use crate::model::{DataWithTimestamp, RemoteDevice};
use std::sync::Arc;
use tracing::debug;

/// Length of a flags byte that may trail bare background service data
const SERVICE_DATA_FLAGS_LEN: usize = 1;

/// Identifies advertisements against a list of candidate devices.
///
/// Framed advertisements are checked with the engine named by their mode tag.
/// Bare service data (an EID, optionally followed by one flags byte) is
/// checked against background EIDs.
pub struct AdvertisementMatcher {
    foreground: Arc<dyn EidGenerator>,
    background: Arc<dyn EidGenerator>,
    clock: Arc<dyn Clock>,
    observer: Option<Arc<dyn ProximityObserver>>,
}

impl AdvertisementMatcher {
    /// Create a matcher with the default foreground and background engines
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_eid_generators(
            Arc::new(EidEngine::foreground()),
            Arc::new(EidEngine::background()),
            clock,
        )
    }

    pub fn with_eid_generators(
        foreground: Arc<dyn EidGenerator>,
        background: Arc<dyn EidGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            foreground,
            background,
            clock,
            observer: None,
        }
    }

    /// Attach an observer notified after every identify call
    pub fn with_observer(mut self, observer: Arc<dyn ProximityObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn engine_for(&self, mode: RotationMode) -> &dyn EidGenerator {
        match mode {
            RotationMode::Foreground => self.foreground.as_ref(),
            RotationMode::Background => self.background.as_ref(),
        }
    }

    /// Find which candidate produced `observed`.
    ///
    /// Candidates are tried in slice order and the first match wins. Returns
    /// `None` when nothing matches or `observed` is malformed.
    pub fn identify_device_by_advertisement<'a>(
        &self,
        observed: &[u8],
        candidates: &'a [RemoteDevice],
    ) -> Option<&'a str> {
        let matched = self.find_device(observed, candidates).map(RemoteDevice::device_id);
        if matched.is_none() {
            debug!(
                len = observed.len(),
                candidates = candidates.len(),
                "No candidate matches advertisement"
            );
        }
        if let Some(observer) = &self.observer {
            observer.on_identify(matched);
        }
        matched
    }

    fn find_device<'a>(
        &self,
        observed: &[u8],
        candidates: &'a [RemoteDevice],
    ) -> Option<&'a RemoteDevice> {
        let now = self.clock.now_millis();

        match Advertisement::parse(observed) {
            Ok(advertisement) => self.find_by_eid(
                self.engine_for(advertisement.mode()),
                advertisement.eid(),
                advertisement.public_key(),
                candidates,
                now,
            ),
            Err(_) if is_service_data(observed) => self.find_by_eid(
                self.background.as_ref(),
                &observed[..EID_LEN],
                &[],
                candidates,
                now,
            ),
            Err(e) => {
                debug!("Ignoring malformed advertisement: {}", e);
                None
            }
        }
    }

    fn find_by_eid<'a>(
        &self,
        engine: &dyn EidGenerator,
        eid: &[u8],
        extra_entropy: &[u8],
        candidates: &'a [RemoteDevice],
        now: i64,
    ) -> Option<&'a RemoteDevice> {
        candidates.iter().find(|device| {
            engine
                .generate_nearest_eids(device.beacon_seeds(), now, extra_entropy)
                .iter()
                .any(|candidate| candidate.data == eid)
        })
    }

    /// Every framed advertisement the owner of `public_key` could currently
    /// be broadcasting to `device`, one per nearest window.
    pub fn expected_advertisements(
        &self,
        device: &RemoteDevice,
        public_key: &[u8],
        mode: RotationMode,
    ) -> Vec<DataWithTimestamp> {
        let now = self.clock.now_millis();
        self.engine_for(mode)
            .generate_nearest_eids(device.beacon_seeds(), now, public_key)
            .into_iter()
            .filter_map(|eid| {
                let advertisement = Advertisement::new(mode, public_key, &eid.data).ok()?;
                Some(DataWithTimestamp::new(
                    advertisement.encode(),
                    eid.start_timestamp_ms,
                    eid.end_timestamp_ms,
                ))
            })
            .collect()
    }
}

fn is_service_data(observed: &[u8]) -> bool {
    observed.len() == EID_LEN || observed.len() == EID_LEN + SERVICE_DATA_FLAGS_LEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::generator::BleAdvertisementGenerator;
    use crate::clock::ManualClock;
    use crate::eid::MockEidGenerator;
    use crate::instrumentation::CallCounter;
    use crate::model::BeaconSeed;

    const MINUTE: i64 = 60 * 1000;
    const NOW: i64 = 90 * MINUTE;
    const LOCAL_KEY: &[u8] = b"localDevicePublicKey";

    fn device(id: &str) -> RemoteDevice {
        RemoteDevice::new(id, format!("{}-public-key", id).into_bytes()).with_beacon_seeds(vec![
            BeaconSeed::new(format!("{}-seed-1", id).into_bytes(), 0, 60 * MINUTE),
            BeaconSeed::new(format!("{}-seed-2", id).into_bytes(), 60 * MINUTE, 600 * MINUTE),
        ])
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(NOW))
    }

    #[test]
    fn test_identifies_generated_advertisement() {
        let clock = clock();
        let generator = BleAdvertisementGenerator::new(clock.clone());
        let matcher = AdvertisementMatcher::new(clock);

        let candidates = vec![device("alpha"), device("beta"), device("gamma")];
        let advertisement = generator
            .generate_advertisement(&candidates[1], LOCAL_KEY)
            .unwrap();

        assert_eq!(
            matcher.identify_device_by_advertisement(&advertisement.data, &candidates),
            Some("beta")
        );
    }

    #[test]
    fn test_no_match_without_device() {
        let clock = clock();
        let generator = BleAdvertisementGenerator::new(clock.clone());
        let matcher = AdvertisementMatcher::new(clock);

        let advertisement = generator
            .generate_advertisement(&device("beta"), LOCAL_KEY)
            .unwrap();
        let candidates = vec![device("alpha"), device("gamma")];

        assert_eq!(
            matcher.identify_device_by_advertisement(&advertisement.data, &candidates),
            None
        );
        assert_eq!(
            matcher.identify_device_by_advertisement(&advertisement.data, &[]),
            None
        );
    }

    #[test]
    fn test_swapped_public_key_does_not_match() {
        let clock = clock();
        let generator = BleAdvertisementGenerator::new(clock.clone());
        let matcher = AdvertisementMatcher::new(clock);

        let candidates = vec![device("alpha")];
        let advertisement = generator
            .generate_advertisement(&candidates[0], LOCAL_KEY)
            .unwrap();

        let parsed = Advertisement::parse(&advertisement.data).unwrap();
        let forged = Advertisement::new(parsed.mode(), b"someoneElsesKey".to_vec(), parsed.eid())
            .unwrap()
            .encode();

        assert_eq!(
            matcher.identify_device_by_advertisement(&forged, &candidates),
            None
        );
    }

    #[test]
    fn test_first_candidate_wins_on_duplicates() {
        let clock = clock();
        let generator = BleAdvertisementGenerator::new(clock.clone());
        let matcher = AdvertisementMatcher::new(clock);

        let original = device("alpha");
        let duplicate = RemoteDevice::new("alpha-copy", original.public_key().to_vec())
            .with_beacon_seeds(original.beacon_seeds().to_vec());
        let candidates = vec![duplicate, original];

        let advertisement = generator
            .generate_advertisement(&candidates[1], LOCAL_KEY)
            .unwrap();
        assert_eq!(
            matcher.identify_device_by_advertisement(&advertisement.data, &candidates),
            Some("alpha-copy")
        );
    }

    #[test]
    fn test_identifies_bare_service_data() {
        let clock = clock();
        let matcher = AdvertisementMatcher::new(clock);
        let candidates = vec![device("alpha"), device("beta")];

        let eid = EidEngine::background()
            .derive_eid(candidates[1].beacon_seeds(), NOW, &[])
            .unwrap();
        assert_eq!(
            matcher.identify_device_by_advertisement(&eid.data, &candidates),
            Some("beta")
        );

        let mut with_flags = eid.data.clone();
        with_flags.push(0x01);
        assert_eq!(
            matcher.identify_device_by_advertisement(&with_flags, &candidates),
            Some("beta")
        );
    }

    #[test]
    fn test_malformed_input_is_not_found() {
        let matcher = AdvertisementMatcher::new(clock());
        let candidates = vec![device("alpha")];

        assert_eq!(matcher.identify_device_by_advertisement(&[], &candidates), None);
        assert_eq!(
            matcher.identify_device_by_advertisement(&[0xE1, 0x00], &candidates),
            None
        );
        assert_eq!(
            matcher.identify_device_by_advertisement(&[0u8; 30], &candidates),
            None
        );
    }

    #[test]
    fn test_uses_engine_named_by_mode_tag() {
        let mut foreground = MockEidGenerator::new();
        foreground.expect_generate_nearest_eids().times(0);

        let mut background = MockEidGenerator::new();
        background
            .expect_generate_nearest_eids()
            .times(2)
            .returning(|seeds, _, extra| {
                assert_eq!(extra, LOCAL_KEY);
                if seeds.is_empty() {
                    Vec::new()
                } else {
                    vec![DataWithTimestamp::new(vec![3u8; EID_LEN], 0, 10)]
                }
            });

        let matcher = AdvertisementMatcher::with_eid_generators(
            Arc::new(foreground),
            Arc::new(background),
            clock(),
        );
        let observed = Advertisement::new(RotationMode::Background, LOCAL_KEY, &[3u8; EID_LEN])
            .unwrap()
            .encode();
        let candidates = vec![
            RemoteDevice::new("unsynced", b"k".to_vec()),
            RemoteDevice::new("synced", b"k".to_vec())
                .with_beacon_seeds(vec![BeaconSeed::new(b"s".to_vec(), 0, 10)]),
        ];

        assert_eq!(
            matcher.identify_device_by_advertisement(&observed, &candidates),
            Some("synced")
        );
    }

    #[test]
    fn test_expected_advertisements_cover_nearest_windows() {
        let clock = clock();
        let generator = BleAdvertisementGenerator::new(clock.clone());
        let matcher = AdvertisementMatcher::new(clock);
        let target = device("alpha");

        let expected = matcher.expected_advertisements(&target, LOCAL_KEY, RotationMode::Foreground);
        assert_eq!(expected.len(), 3);

        let actual = generator.generate_advertisement(&target, LOCAL_KEY).unwrap();
        assert_eq!(expected[1], actual);
    }

    #[test]
    fn test_observer_counts_identify_calls() {
        let counter = Arc::new(CallCounter::new());
        let clock = clock();
        let generator = BleAdvertisementGenerator::new(clock.clone());
        let matcher = AdvertisementMatcher::new(clock).with_observer(counter.clone());

        let candidates = vec![device("alpha")];
        let advertisement = generator
            .generate_advertisement(&candidates[0], LOCAL_KEY)
            .unwrap();

        matcher.identify_device_by_advertisement(&advertisement.data, &candidates);
        matcher.identify_device_by_advertisement(&[1, 2, 3], &candidates);

        assert_eq!(counter.identify_calls(), 2);
        assert_eq!(counter.identify_matches(), 1);
    }
}
