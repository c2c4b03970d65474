// Data model shared by the EID engine, the generator and the matcher
//
// Beacon seeds and remote devices are produced by the device sync layer and
// are read-only here.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Time-windowed secret material from which EIDs are derived.
///
/// A seed is active for `start_time_millis <= t < end_time_millis`. The secret
/// bytes are wiped when the seed is dropped and never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct BeaconSeed {
    #[serde(with = "hex_bytes")]
    data: Vec<u8>,
    start_time_millis: i64,
    end_time_millis: i64,
}

impl BeaconSeed {
    pub fn new(data: impl Into<Vec<u8>>, start_time_millis: i64, end_time_millis: i64) -> Self {
        Self {
            data: data.into(),
            start_time_millis,
            end_time_millis,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn start_time_millis(&self) -> i64 {
        self.start_time_millis
    }

    pub fn end_time_millis(&self) -> i64 {
        self.end_time_millis
    }

    /// True if the seed carries no secret material
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if `timestamp_ms` falls in `[start, end)`
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.start_time_millis <= timestamp_ms && timestamp_ms < self.end_time_millis
    }
}

impl fmt::Debug for BeaconSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeaconSeed")
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("start_time_millis", &self.start_time_millis)
            .field("end_time_millis", &self.end_time_millis)
            .finish()
    }
}

/// Pick the seed active at `timestamp_ms`.
///
/// Empty seeds are ignored. When windows overlap, the most recently started
/// seed wins; among equal starts the later entry wins.
pub fn select_beacon_seed(seeds: &[BeaconSeed], timestamp_ms: i64) -> Option<&BeaconSeed> {
    seeds
        .iter()
        .filter(|seed| !seed.is_empty() && seed.contains(timestamp_ms))
        .max_by_key(|seed| seed.start_time_millis)
}

/// Bytes tagged with the window `[start, end)` in which they are valid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataWithTimestamp {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub start_timestamp_ms: i64,
    pub end_timestamp_ms: i64,
}

impl DataWithTimestamp {
    pub fn new(data: impl Into<Vec<u8>>, start_timestamp_ms: i64, end_timestamp_ms: i64) -> Self {
        Self {
            data: data.into(),
            start_timestamp_ms,
            end_timestamp_ms,
        }
    }

    pub fn contains_time(&self, timestamp_ms: i64) -> bool {
        self.start_timestamp_ms <= timestamp_ms && timestamp_ms < self.end_timestamp_ms
    }

    pub fn data_in_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

impl fmt::Display for DataWithTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{hex: {}, start: {}, end: {}}}",
            self.data_in_hex(),
            self.start_timestamp_ms,
            self.end_timestamp_ms
        )
    }
}

/// A device we may advertise to or recognize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDevice {
    device_id: String,
    #[serde(default)]
    name: String,
    #[serde(with = "hex_bytes")]
    public_key: Vec<u8>,
    #[serde(default)]
    beacon_seeds: Vec<BeaconSeed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paired_local_device_id: Option<String>,
}

impl RemoteDevice {
    pub fn new(device_id: impl Into<String>, public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            device_id: device_id.into(),
            name: String::new(),
            public_key: public_key.into(),
            beacon_seeds: Vec::new(),
            paired_local_device_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_beacon_seeds(mut self, beacon_seeds: Vec<BeaconSeed>) -> Self {
        self.beacon_seeds = beacon_seeds;
        self
    }

    pub fn with_paired_local_device(mut self, local_device_id: impl Into<String>) -> Self {
        self.paired_local_device_id = Some(local_device_id.into());
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn beacon_seeds(&self) -> &[BeaconSeed] {
        &self.beacon_seeds
    }

    pub fn paired_local_device_id(&self) -> Option<&str> {
        self.paired_local_device_id.as_deref()
    }

    /// True if at least one seed carries secret material
    pub fn has_usable_beacon_seeds(&self) -> bool {
        self.beacon_seeds.iter().any(|seed| !seed.is_empty())
    }
}

/// Serde adapter storing byte strings as lowercase hex
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_window_is_half_open() {
        let seed = BeaconSeed::new(b"seed".to_vec(), 1_000, 2_000);
        assert!(!seed.contains(999));
        assert!(seed.contains(1_000));
        assert!(seed.contains(1_999));
        assert!(!seed.contains(2_000));
    }

    #[test]
    fn test_seed_debug_hides_secret() {
        let seed = BeaconSeed::new(b"super-secret".to_vec(), 0, 10);
        let rendered = format!("{:?}", seed);
        assert!(!rendered.contains("super"));
        assert!(rendered.contains("<12 bytes>"));
    }

    #[test]
    fn test_select_prefers_most_recently_started() {
        let seeds = vec![
            BeaconSeed::new(b"old".to_vec(), 0, 10_000),
            BeaconSeed::new(b"new".to_vec(), 5_000, 15_000),
        ];
        assert_eq!(select_beacon_seed(&seeds, 4_000).unwrap().data(), b"old");
        assert_eq!(select_beacon_seed(&seeds, 6_000).unwrap().data(), b"new");
        assert_eq!(select_beacon_seed(&seeds, 12_000).unwrap().data(), b"new");
        assert!(select_beacon_seed(&seeds, 15_000).is_none());
    }

    #[test]
    fn test_select_skips_empty_seeds() {
        let seeds = vec![
            BeaconSeed::new(b"real".to_vec(), 0, 10_000),
            BeaconSeed::new(Vec::new(), 5_000, 10_000),
        ];
        assert_eq!(select_beacon_seed(&seeds, 6_000).unwrap().data(), b"real");
    }

    #[test]
    fn test_data_with_timestamp_equality_is_structural() {
        let a = DataWithTimestamp::new(vec![1, 2], 10, 20);
        assert_eq!(a, DataWithTimestamp::new(vec![1, 2], 10, 20));
        assert_ne!(a, DataWithTimestamp::new(vec![1, 2], 10, 21));
        assert_ne!(a, DataWithTimestamp::new(vec![1, 3], 10, 20));
    }

    #[test]
    fn test_data_with_timestamp_display() {
        let data = DataWithTimestamp::new(vec![0xab, 0x01], 10, 20);
        assert!(data.contains_time(10));
        assert!(!data.contains_time(20));
        assert_eq!(data.to_string(), "{hex: ab01, start: 10, end: 20}");
    }

    #[test]
    fn test_remote_device_usable_seeds() {
        let device = RemoteDevice::new("device-1", vec![1u8; 32]);
        assert!(!device.has_usable_beacon_seeds());

        let device = device.with_beacon_seeds(vec![BeaconSeed::new(Vec::new(), 0, 10)]);
        assert!(!device.has_usable_beacon_seeds());

        let device = device.with_beacon_seeds(vec![BeaconSeed::new(b"s".to_vec(), 0, 10)]);
        assert!(device.has_usable_beacon_seeds());
    }

    #[test]
    fn test_remote_device_json_uses_hex() {
        let device = RemoteDevice::new("phone", vec![0xde, 0xad])
            .with_name("Phone")
            .with_beacon_seeds(vec![BeaconSeed::new(vec![0xbe, 0xef], 0, 60_000)])
            .with_paired_local_device("laptop");

        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"dead\""));
        assert!(json.contains("\"beef\""));

        let restored: RemoteDevice = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, device);
        assert_eq!(restored.paired_local_device_id(), Some("laptop"));
    }
}
