// Raw EID derivation: seed material + period start -> fixed-length EID

use crate::eid::profile::RotationMode;
use zeroize::Zeroize;

/// Length of every EID in bytes
pub const EID_LEN: usize = 8;

/// Salt mixed into every EID derivation (versioned with the wire format)
pub const EID_SALT: &[u8] = b"proxid.eid.v1";

/// blake3 key-derivation context for turning seed material into a MAC key
const EID_KEY_CONTEXT: &str = "proxid 2026-01 beacon-seed eid key";

/// One-way keyed derivation of EID bytes
pub trait RawEidGenerator: Send + Sync {
    /// Derive the EID for the window starting at `period_start_ms`.
    ///
    /// `extra_entropy` may be empty.
    fn generate_eid(
        &self,
        seed: &[u8],
        period_start_ms: i64,
        mode: RotationMode,
        extra_entropy: &[u8],
    ) -> [u8; EID_LEN];
}

/// Keyed blake3 derivation.
///
/// The seed is stretched into a 32-byte key with `blake3::derive_key`, then
/// `salt || mode || len(extra) || extra || period_start` is hashed under that
/// key and truncated to [`EID_LEN`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3RawEidGenerator;

impl RawEidGenerator for Blake3RawEidGenerator {
    fn generate_eid(
        &self,
        seed: &[u8],
        period_start_ms: i64,
        mode: RotationMode,
        extra_entropy: &[u8],
    ) -> [u8; EID_LEN] {
        let mut key = blake3::derive_key(EID_KEY_CONTEXT, seed);

        let mut hasher = blake3::Hasher::new_keyed(&key);
        hasher.update(EID_SALT);
        hasher.update(&[mode.tag()]);
        hasher.update(&(extra_entropy.len() as u32).to_be_bytes());
        hasher.update(extra_entropy);
        hasher.update(&period_start_ms.to_be_bytes());
        let hash = hasher.finalize();
        key.zeroize();

        let mut eid = [0u8; EID_LEN];
        eid.copy_from_slice(&hash.as_bytes()[..EID_LEN]);
        eid
    }
}
