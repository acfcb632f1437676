/// Sequencer configuration, loadable from RON
use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;
use crate::sequencer::note::{MAX_OCTAVE, MAX_VOLUME};

/// Largest accepted number of steps per track
pub const MAX_GRID_SIZE: usize = 256;
/// Largest accepted track limit
pub const MAX_TRACKS: usize = 64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Steps per track
    pub grid_size: usize,
    pub max_tracks: usize,
    /// Beats per minute, clamped into 50..=300 when applied
    pub initial_tempo: u32,
    /// Octave of a freshly initialized step
    pub default_octave: u8,
    /// Volume of a freshly initialized step
    pub default_volume: u8,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            grid_size: 16,
            max_tracks: 8,
            initial_tempo: 120,
            default_octave: 4,
            default_volume: 80,
        }
    }
}

impl SequencerConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&source)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(ConfigError::Invalid(format!(
                "grid_size {} outside 1..={}",
                self.grid_size, MAX_GRID_SIZE
            )));
        }
        if !(1..=MAX_TRACKS).contains(&self.max_tracks) {
            return Err(ConfigError::Invalid(format!(
                "max_tracks {} outside 1..={}",
                self.max_tracks, MAX_TRACKS
            )));
        }
        if self.default_octave > MAX_OCTAVE {
            return Err(ConfigError::Invalid(format!(
                "default_octave {} exceeds {}",
                self.default_octave, MAX_OCTAVE
            )));
        }
        if self.default_volume > MAX_VOLUME {
            return Err(ConfigError::Invalid(format!(
                "default_volume {} exceeds {}",
                self.default_volume, MAX_VOLUME
            )));
        }
        Ok(())
    }
}
