// EID engine: seed selection, window alignment and nearest-window sets

use crate::eid::profile::RotationProfile;
use crate::eid::raw::{Blake3RawEidGenerator, RawEidGenerator};
use crate::model::{select_beacon_seed, BeaconSeed, DataWithTimestamp};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Derives the EIDs of one rotation profile.
///
/// Implementations are pure: results depend only on the arguments. Missing
/// or expired seeds yield `None` / an empty `Vec`, never an error.
#[cfg_attr(test, mockall::automock)]
pub trait EidGenerator: Send + Sync {
    /// The profile whose windows this generator produces
    fn profile(&self) -> RotationProfile;

    /// EID for the window containing `at_ms`, if a seed covers it
    fn derive_eid(
        &self,
        seeds: &[BeaconSeed],
        at_ms: i64,
        extra_entropy: &[u8],
    ) -> Option<DataWithTimestamp>;

    /// EIDs for the window containing `now_ms` and its neighbours, oldest first
    fn generate_nearest_eids(
        &self,
        seeds: &[BeaconSeed],
        now_ms: i64,
        extra_entropy: &[u8],
    ) -> Vec<DataWithTimestamp>;
}

/// Production [`EidGenerator`]
#[derive(Clone)]
pub struct EidEngine {
    profile: RotationProfile,
    raw: Arc<dyn RawEidGenerator>,
}

impl EidEngine {
    /// Create an engine using the blake3 derivation
    pub fn new(profile: RotationProfile) -> Self {
        Self::with_raw_generator(profile, Arc::new(Blake3RawEidGenerator))
    }

    /// Create an engine with a custom raw derivation
    pub fn with_raw_generator(profile: RotationProfile, raw: Arc<dyn RawEidGenerator>) -> Self {
        Self { profile, raw }
    }

    /// Engine with the default foreground profile
    pub fn foreground() -> Self {
        Self::new(RotationProfile::foreground())
    }

    /// Engine with the default background profile
    pub fn background() -> Self {
        Self::new(RotationProfile::background())
    }

    /// EIDs for the window containing `now_ms` plus `window_count` windows on
    /// each side.
    ///
    /// Neighbours are found by stepping from window edge to window edge, so
    /// a short window left where one seed hands over to the next is counted
    /// like any other. Uncovered stretches are skipped one period at a time,
    /// so the result may be shorter than `2 * window_count + 1` and is empty
    /// when no seed covers the vicinity.
    pub fn eids_around(
        &self,
        seeds: &[BeaconSeed],
        now_ms: i64,
        window_count: u32,
        extra_entropy: &[u8],
    ) -> Vec<DataWithTimestamp> {
        let current = self.derive_eid(seeds, now_ms, extra_entropy);

        let walk = |step| {
            self.walk(seeds, now_ms, current.as_ref(), window_count, extra_entropy, step)
        };

        let mut eids = walk(Step::Back);
        eids.reverse();
        eids.extend(current.clone());
        eids.extend(walk(Step::Forward));

        eids.sort_by_key(|eid| eid.start_timestamp_ms);
        eids.dedup();

        if eids.is_empty() {
            debug!(
                mode = ?self.profile.mode(),
                now_ms,
                "No beacon seed covers the nearest windows"
            );
        }
        eids
    }

    /// Up to `steps` windows on one side of `from`, nearest first
    fn walk(
        &self,
        seeds: &[BeaconSeed],
        now_ms: i64,
        from: Option<&DataWithTimestamp>,
        steps: u32,
        extra_entropy: &[u8],
        step: Step,
    ) -> Vec<DataWithTimestamp> {
        let period_ms = self.profile.period_ms();
        let mut cursor = now_ms;
        let mut last = from.cloned();
        let mut found = Vec::new();

        for _ in 0..steps {
            cursor = match (&last, step) {
                (Some(window), Step::Back) => window.start_timestamp_ms.saturating_sub(1),
                (Some(window), Step::Forward) => window.end_timestamp_ms,
                (None, Step::Back) => cursor.saturating_sub(period_ms),
                (None, Step::Forward) => cursor.saturating_add(period_ms),
            };
            last = self.derive_eid(seeds, cursor, extra_entropy);
            found.extend(last.clone());
        }
        found
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Back,
    Forward,
}

impl EidGenerator for EidEngine {
    fn profile(&self) -> RotationProfile {
        self.profile
    }

    fn derive_eid(
        &self,
        seeds: &[BeaconSeed],
        at_ms: i64,
        extra_entropy: &[u8],
    ) -> Option<DataWithTimestamp> {
        let seed = select_beacon_seed(seeds, at_ms)?;

        // Windows are aligned to the seed start and cut off at the seed end.
        let period_ms = self.profile.period_ms();
        let offset = at_ms.saturating_sub(seed.start_time_millis());
        let period_start = at_ms - offset.rem_euclid(period_ms);
        let mut period_end = period_start
            .saturating_add(period_ms)
            .min(seed.end_time_millis());

        // A seed starting later in the window takes over from its start.
        if let Some(takeover) = seeds
            .iter()
            .filter(|s| !s.is_empty() && s.start_time_millis() < s.end_time_millis())
            .map(BeaconSeed::start_time_millis)
            .filter(|&start| start > at_ms && start < period_end)
            .min()
        {
            period_end = takeover;
        }

        let eid = self.raw.generate_eid(
            seed.data(),
            period_start,
            self.profile.mode(),
            extra_entropy,
        );
        trace!(
            mode = ?self.profile.mode(),
            period_start,
            period_end,
            eid = %hex::encode(eid),
            "Derived EID"
        );

        Some(DataWithTimestamp::new(eid.to_vec(), period_start, period_end))
    }

    fn generate_nearest_eids(
        &self,
        seeds: &[BeaconSeed],
        now_ms: i64,
        extra_entropy: &[u8],
    ) -> Vec<DataWithTimestamp> {
        self.eids_around(seeds, now_ms, self.profile.nearest_radius(), extra_entropy)
    }
}

impl fmt::Debug for EidEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EidEngine")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}
