// Rotation configuration and factories for the generator and matcher

use crate::advertisement::{AdvertisementMatcher, BleAdvertisementGenerator};
use crate::clock::Clock;
use crate::eid::{EidEngine, ProfileError, RotationMode, RotationProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Profiles used for foreground and background rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityConfig {
    pub foreground: RotationProfile,
    pub background: RotationProfile,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            foreground: RotationProfile::foreground(),
            background: RotationProfile::background(),
        }
    }
}

impl ProximityConfig {
    /// Build from period lengths (minutes) and nearest radii
    pub fn from_minutes(
        foreground_period_minutes: u32,
        foreground_nearest_radius: u32,
        background_period_minutes: u32,
        background_nearest_radius: u32,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            foreground: RotationProfile::new(
                RotationMode::Foreground,
                foreground_period_minutes,
                foreground_nearest_radius,
            )?,
            background: RotationProfile::new(
                RotationMode::Background,
                background_period_minutes,
                background_nearest_radius,
            )?,
        })
    }

    /// Check that each profile sits in the slot for its mode
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.foreground.mode() != RotationMode::Foreground {
            return Err(ConfigError::ModeMismatch("foreground"));
        }
        if self.background.mode() != RotationMode::Background {
            return Err(ConfigError::ModeMismatch("background"));
        }
        Ok(())
    }

    pub fn foreground_engine(&self) -> EidEngine {
        EidEngine::new(self.foreground)
    }

    pub fn background_engine(&self) -> EidEngine {
        EidEngine::new(self.background)
    }

    /// Generator using the foreground profile
    pub fn build_generator(&self, clock: Arc<dyn Clock>) -> BleAdvertisementGenerator {
        BleAdvertisementGenerator::with_eid_generator(Arc::new(self.foreground_engine()), clock)
    }

    /// Matcher using both profiles
    pub fn build_matcher(&self, clock: Arc<dyn Clock>) -> AdvertisementMatcher {
        AdvertisementMatcher::with_eid_generators(
            Arc::new(self.foreground_engine()),
            Arc::new(self.background_engine()),
            clock,
        )
    }
}

/// Errors for proximity configuration
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Profile in the {0} slot has the wrong rotation mode")]
    ModeMismatch(&'static str),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}
