// Property tests for EID derivation and advertisement round trips

use proptest::prelude::*;
use proxid_core::advertisement::encoded_len;
use proxid_core::{
    AdvertisementMatcher, BeaconSeed, BleAdvertisementGenerator, EidEngine, EidGenerator,
    ManualClock, RemoteDevice, EID_LEN,
};
use std::sync::Arc;

const MINUTE: i64 = 60 * 1000;
const SEED_LEN: i64 = 14 * 24 * 60 * MINUTE;

fn seeds(secret: &[u8], start: i64) -> Vec<BeaconSeed> {
    vec![
        BeaconSeed::new(secret.to_vec(), start, start + SEED_LEN),
        BeaconSeed::new([secret, &b"-next"[..]].concat(), start + SEED_LEN, start + 2 * SEED_LEN),
    ]
}

proptest! {
    #[test]
    fn prop_derivation_is_deterministic(
        secret in prop::collection::vec(any::<u8>(), 1..64),
        start_minutes in 0i64..10_000_000,
        offset in 0i64..SEED_LEN,
        background in any::<bool>(),
    ) {
        let start = start_minutes * MINUTE;
        let engine = if background { EidEngine::background() } else { EidEngine::foreground() };
        let seeds = seeds(&secret, start);

        let a = engine.derive_eid(&seeds, start + offset, &[]).unwrap();
        let b = engine.derive_eid(&seeds, start + offset, &[]).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.data.len(), EID_LEN);
    }

    #[test]
    fn prop_window_contains_query_time(
        secret in prop::collection::vec(any::<u8>(), 1..64),
        start in 0i64..1_000_000_000_000,
        offset in 0i64..(2 * SEED_LEN),
    ) {
        let engine = EidEngine::foreground();
        let seeds = seeds(&secret, start);
        let at = start + offset;

        let eid = engine.derive_eid(&seeds, at, &[]).unwrap();
        prop_assert!(eid.contains_time(at));
        prop_assert!(eid.end_timestamp_ms - eid.start_timestamp_ms <= engine.profile().period_ms());
    }

    #[test]
    fn prop_nearest_eids_are_ordered_windows(
        secret in prop::collection::vec(any::<u8>(), 1..64),
        offset in 0i64..(2 * SEED_LEN),
    ) {
        let engine = EidEngine::background();
        let seeds = seeds(&secret, 0);
        let eids = engine.generate_nearest_eids(&seeds, offset, &[]);

        prop_assert!(!eids.is_empty());
        prop_assert!(eids.len() <= 5);
        prop_assert!(eids.iter().any(|eid| eid.contains_time(offset)));
        for pair in eids.windows(2) {
            prop_assert!(pair[0].end_timestamp_ms <= pair[1].start_timestamp_ms);
        }
    }

    #[test]
    fn prop_generated_advertisement_is_identified(
        secret in prop::collection::vec(any::<u8>(), 1..64),
        local_key in prop::collection::vec(any::<u8>(), 1..=255),
        offset_minutes in 0i64..(2 * SEED_LEN / MINUTE),
    ) {
        let now = offset_minutes * MINUTE;
        let clock = Arc::new(ManualClock::new(now));
        let device = RemoteDevice::new("target", vec![1u8; 32])
            .with_beacon_seeds(seeds(&secret, 0));

        let generator = BleAdvertisementGenerator::new(clock.clone());
        let advertisement = generator.generate_advertisement(&device, &local_key).unwrap();
        prop_assert_eq!(advertisement.data.len(), encoded_len(local_key.len()));

        let matcher = AdvertisementMatcher::new(clock);
        prop_assert_eq!(
            matcher.identify_device_by_advertisement(&advertisement.data, std::slice::from_ref(&device)),
            Some("target")
        );
    }
}
