// Rotation profiles: foreground and background are the same derivation with
// different bucket sizes and skew tolerance.

use crate::clock::MILLIS_PER_MINUTE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default foreground rotation period in minutes
pub const DEFAULT_FOREGROUND_PERIOD_MINUTES: u32 = 5;

/// Default background rotation period in minutes
pub const DEFAULT_BACKGROUND_PERIOD_MINUTES: u32 = 15;

/// Default number of neighbouring windows checked on each side (foreground)
pub const DEFAULT_FOREGROUND_NEAREST_RADIUS: u32 = 1;

/// Default number of neighbouring windows checked on each side (background)
pub const DEFAULT_BACKGROUND_NEAREST_RADIUS: u32 = 2;

/// Upper bound on the nearest radius, keeps matching cost bounded
pub const MAX_NEAREST_RADIUS: u32 = 16;

/// Errors for profile configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Rotation period must be at least one minute")]
    ZeroPeriod,
    #[error("Nearest radius {0} is above the allowed maximum")]
    RadiusTooLarge(u32),
}

/// Which rotation an EID or advertisement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Fine rotation for active proximity checks
    Foreground,
    /// Coarse rotation for low-power scanning
    Background,
}

impl RotationMode {
    /// Wire tag used in advertisements and in the derivation input
    pub fn tag(self) -> u8 {
        match self {
            RotationMode::Foreground => 0x00,
            RotationMode::Background => 0x01,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(RotationMode::Foreground),
            0x01 => Some(RotationMode::Background),
            _ => None,
        }
    }
}

/// Bucket size and skew tolerance for one rotation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProfileRepr", into = "ProfileRepr")]
pub struct RotationProfile {
    mode: RotationMode,
    period_minutes: u32,
    nearest_radius: u32,
}

impl RotationProfile {
    pub fn new(
        mode: RotationMode,
        period_minutes: u32,
        nearest_radius: u32,
    ) -> Result<Self, ProfileError> {
        if period_minutes == 0 {
            return Err(ProfileError::ZeroPeriod);
        }
        if nearest_radius > MAX_NEAREST_RADIUS {
            return Err(ProfileError::RadiusTooLarge(nearest_radius));
        }
        Ok(Self {
            mode,
            period_minutes,
            nearest_radius,
        })
    }

    /// Foreground defaults: 5 minute windows, previous/current/next
    pub fn foreground() -> Self {
        Self {
            mode: RotationMode::Foreground,
            period_minutes: DEFAULT_FOREGROUND_PERIOD_MINUTES,
            nearest_radius: DEFAULT_FOREGROUND_NEAREST_RADIUS,
        }
    }

    /// Background defaults: 15 minute windows, two on each side
    pub fn background() -> Self {
        Self {
            mode: RotationMode::Background,
            period_minutes: DEFAULT_BACKGROUND_PERIOD_MINUTES,
            nearest_radius: DEFAULT_BACKGROUND_NEAREST_RADIUS,
        }
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    pub fn period_minutes(&self) -> u32 {
        self.period_minutes
    }

    pub fn period_ms(&self) -> i64 {
        i64::from(self.period_minutes) * MILLIS_PER_MINUTE
    }

    pub fn nearest_radius(&self) -> u32 {
        self.nearest_radius
    }

    /// Largest clock skew the nearest-EID set still covers
    pub fn tolerance_ms(&self) -> i64 {
        self.period_ms() * i64::from(self.nearest_radius)
    }
}

#[derive(Serialize, Deserialize)]
struct ProfileRepr {
    mode: RotationMode,
    period_minutes: u32,
    nearest_radius: u32,
}

impl TryFrom<ProfileRepr> for RotationProfile {
    type Error = ProfileError;

    fn try_from(repr: ProfileRepr) -> Result<Self, Self::Error> {
        RotationProfile::new(repr.mode, repr.period_minutes, repr.nearest_radius)
    }
}

impl From<RotationProfile> for ProfileRepr {
    fn from(profile: RotationProfile) -> Self {
        Self {
            mode: profile.mode,
            period_minutes: profile.period_minutes,
            nearest_radius: profile.nearest_radius,
        }
    }
}
