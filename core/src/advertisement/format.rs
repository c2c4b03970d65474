//! Advertisement wire format
//!
//! Layout (version 1):
//! - Byte 0: format marker, `0xE0 | version`
//! - Byte 1: rotation mode tag (0x00 foreground, 0x01 background)
//! - Byte 2: public key length N (1..=255)
//! - Bytes 3..3+N: advertising device's public key
//! - Bytes 3+N..: EID ([`EID_LEN`] bytes)

use crate::eid::{RotationMode, EID_LEN};
use thiserror::Error;

/// Current advertisement format version
pub const ADVERTISEMENT_VERSION: u8 = 1;

/// High nibble of the first byte of every framed advertisement
pub const FORMAT_MARKER: u8 = 0xE0;

/// Marker + mode tag + key length prefix
pub const HEADER_LEN: usize = 3;

/// Longest public key the one-byte length prefix can describe
pub const MAX_PUBLIC_KEY_LEN: usize = u8::MAX as usize;

/// Errors for advertisement encoding and parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvertisementError {
    #[error("Advertisement too short: {0} bytes")]
    TooShort(usize),
    #[error("Unknown format marker: {0:#04x}")]
    UnknownMarker(u8),
    #[error("Unsupported advertisement version: {0}")]
    UnsupportedVersion(u8),
    #[error("Unknown rotation mode tag: {0:#04x}")]
    UnknownMode(u8),
    #[error("Public key is empty")]
    EmptyPublicKey,
    #[error("Public key too long: {0} bytes")]
    PublicKeyTooLong(usize),
    #[error("Invalid EID length: {0} bytes")]
    InvalidEidLength(usize),
    #[error("Length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Total encoded length for a public key of `key_len` bytes
pub fn encoded_len(key_len: usize) -> usize {
    HEADER_LEN + key_len + EID_LEN
}

/// A framed advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    mode: RotationMode,
    public_key: Vec<u8>,
    eid: [u8; EID_LEN],
}

impl Advertisement {
    /// Create an advertisement, validating the key and EID lengths
    pub fn new(
        mode: RotationMode,
        public_key: impl Into<Vec<u8>>,
        eid: &[u8],
    ) -> Result<Self, AdvertisementError> {
        let public_key = public_key.into();
        if public_key.is_empty() {
            return Err(AdvertisementError::EmptyPublicKey);
        }
        if public_key.len() > MAX_PUBLIC_KEY_LEN {
            return Err(AdvertisementError::PublicKeyTooLong(public_key.len()));
        }
        let eid: [u8; EID_LEN] = eid
            .try_into()
            .map_err(|_| AdvertisementError::InvalidEidLength(eid.len()))?;

        Ok(Self {
            mode,
            public_key,
            eid,
        })
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn eid(&self) -> &[u8; EID_LEN] {
        &self.eid
    }

    /// Size of the encoded advertisement in bytes
    pub fn size(&self) -> usize {
        encoded_len(self.public_key.len())
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.push(FORMAT_MARKER | ADVERTISEMENT_VERSION);
        bytes.push(self.mode.tag());
        // Length fits: checked in `new` and `parse`.
        bytes.push(self.public_key.len() as u8);
        bytes.extend_from_slice(&self.public_key);
        bytes.extend_from_slice(&self.eid);
        bytes
    }

    /// Parse wire bytes
    pub fn parse(data: &[u8]) -> Result<Self, AdvertisementError> {
        if data.len() < HEADER_LEN {
            return Err(AdvertisementError::TooShort(data.len()));
        }

        let marker = data[0];
        if marker & 0xF0 != FORMAT_MARKER {
            return Err(AdvertisementError::UnknownMarker(marker));
        }
        let version = marker & 0x0F;
        if version != ADVERTISEMENT_VERSION {
            return Err(AdvertisementError::UnsupportedVersion(version));
        }

        let mode = RotationMode::from_tag(data[1]).ok_or(AdvertisementError::UnknownMode(data[1]))?;

        let key_len = data[2] as usize;
        if key_len == 0 {
            return Err(AdvertisementError::EmptyPublicKey);
        }
        let expected = encoded_len(key_len);
        if data.len() != expected {
            return Err(AdvertisementError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }

        let key_end = HEADER_LEN + key_len;
        Self::new(mode, &data[HEADER_LEN..key_end], &data[key_end..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Advertisement {
        Advertisement::new(RotationMode::Foreground, b"localDevicePublicKey".to_vec(), &[9u8; EID_LEN])
            .unwrap()
    }

    #[test]
    fn test_encoded_layout() {
        let adv = sample();
        let bytes = adv.encode();

        assert_eq!(bytes.len(), encoded_len(20));
        assert_eq!(bytes.len(), adv.size());
        assert_eq!(bytes[0], 0xE1);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[2], 20);
        assert_eq!(&bytes[3..23], b"localDevicePublicKey");
        assert_eq!(&bytes[23..], &[9u8; EID_LEN]);
    }

    #[test]
    fn test_parse_recovers_fields() {
        let adv = Advertisement::new(RotationMode::Background, vec![0xaa; 32], &[1u8; EID_LEN]).unwrap();
        let parsed = Advertisement::parse(&adv.encode()).unwrap();

        assert_eq!(parsed.mode(), RotationMode::Background);
        assert_eq!(parsed.public_key(), &[0xaa; 32][..]);
        assert_eq!(parsed.eid(), &[1u8; EID_LEN]);
    }

    #[test]
    fn test_new_rejects_bad_inputs() {
        assert_eq!(
            Advertisement::new(RotationMode::Foreground, Vec::new(), &[0u8; EID_LEN]),
            Err(AdvertisementError::EmptyPublicKey)
        );
        assert_eq!(
            Advertisement::new(RotationMode::Foreground, vec![1u8; 256], &[0u8; EID_LEN]),
            Err(AdvertisementError::PublicKeyTooLong(256))
        );
        assert_eq!(
            Advertisement::new(RotationMode::Foreground, vec![1u8; 4], &[0u8; 3]),
            Err(AdvertisementError::InvalidEidLength(3))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let good = sample().encode();

        assert_eq!(Advertisement::parse(&good[..2]), Err(AdvertisementError::TooShort(2)));

        let mut bad_marker = good.clone();
        bad_marker[0] = 0x41;
        assert_eq!(
            Advertisement::parse(&bad_marker),
            Err(AdvertisementError::UnknownMarker(0x41))
        );

        let mut bad_version = good.clone();
        bad_version[0] = 0xE2;
        assert_eq!(
            Advertisement::parse(&bad_version),
            Err(AdvertisementError::UnsupportedVersion(2))
        );

        let mut bad_mode = good.clone();
        bad_mode[1] = 0x05;
        assert_eq!(
            Advertisement::parse(&bad_mode),
            Err(AdvertisementError::UnknownMode(0x05))
        );

        let mut zero_key = good.clone();
        zero_key[2] = 0;
        assert_eq!(
            Advertisement::parse(&zero_key),
            Err(AdvertisementError::EmptyPublicKey)
        );

        assert_eq!(
            Advertisement::parse(&good[..good.len() - 1]),
            Err(AdvertisementError::LengthMismatch {
                expected: good.len(),
                actual: good.len() - 1,
            })
        );
    }
}
