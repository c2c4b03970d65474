// Scan filter for the local device's own EIDs: the current window plus the
// neighbour most likely to be in use by a peer with a skewed clock.

use crate::eid::engine::{EidEngine, EidGenerator};
use crate::model::{BeaconSeed, DataWithTimestamp};

/// Which neighbour of the current window an adjacent EID belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacentKind {
    Past,
    Future,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacentEid {
    pub kind: AdjacentKind,
    pub data: DataWithTimestamp,
}

/// Current EID plus at most one neighbour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EidData {
    pub current: DataWithTimestamp,
    pub adjacent: Option<AdjacentEid>,
}

impl EidData {
    /// All EIDs in chronological order
    pub fn all(&self) -> Vec<&DataWithTimestamp> {
        match &self.adjacent {
            Some(AdjacentEid {
                kind: AdjacentKind::Past,
                data,
            }) => vec![data, &self.current],
            Some(AdjacentEid {
                kind: AdjacentKind::Future,
                data,
            }) => vec![&self.current, data],
            None => vec![&self.current],
        }
    }
}

impl EidEngine {
    /// Build the scan filter for `seeds` at `now_ms`.
    ///
    /// During the first quarter of a window the previous window is the
    /// neighbour, afterwards the next one.
    pub fn generate_scan_filter(&self, seeds: &[BeaconSeed], now_ms: i64) -> Option<EidData> {
        let current = self.derive_eid(seeds, now_ms, &[])?;

        let into_window = now_ms - current.start_timestamp_ms;
        let (kind, probe_ms) = if into_window < self.profile().period_ms() / 4 {
            (AdjacentKind::Past, current.start_timestamp_ms - 1)
        } else {
            (AdjacentKind::Future, current.end_timestamp_ms)
        };

        let adjacent = self
            .derive_eid(seeds, probe_ms, &[])
            .map(|data| AdjacentEid { kind, data });

        Some(EidData { current, adjacent })
    }
}
