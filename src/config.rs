//! Configuration for the band activity detector
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling retuning of the band registry without recompilation. The set of
//! band profiles and the registered ambiguity pairs are both supplied here
//! at initialization; nothing in the detection core hardcodes band names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::profile::{self, AmbiguityPair, BandProfile};

/// Complete detector configuration
///
/// Constructed once and shared read-only (typically behind an `Arc`) by every
/// tracker instance. Mutating band definitions at runtime is not supported;
/// build a new configuration and a new tracker instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Band registry to track
    pub bands: Vec<BandProfile>,
    /// Pairs with known frequency overlap, checked during resolution
    #[serde(default)]
    pub ambiguity_pairs: Vec<AmbiguityPair>,
}

impl Default for DetectorConfig {
    /// Real-time defaults: instrument-shaped overlapping bands plus the
    /// bass/guitar ambiguity pair
    fn default() -> Self {
        Self {
            bands: profile::realtime_defaults().to_vec(),
            ambiguity_pairs: profile::default_ambiguity_pairs(),
        }
    }
}

impl DetectorConfig {
    /// Batch defaults: six non-overlapping spectrum slices, no ambiguity pairs
    pub fn batch() -> Self {
        Self {
            bands: profile::batch_defaults().to_vec(),
            ambiguity_pairs: Vec::new(),
        }
    }

    /// Load configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the real-time defaults if the file is
    /// missing or malformed (logged as a warning, never fatal).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded band registry from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Look up a band profile by name
    pub fn band(&self, name: &str) -> Option<&BandProfile> {
        self.bands.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::BandKind;

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.bands.len(), 7);
        assert_eq!(config.ambiguity_pairs.len(), 1);
        assert!(config.band("vocals").is_some());
        assert_eq!(config.band("kick").unwrap().kind, BandKind::Percussive);
    }

    #[test]
    fn test_batch_config() {
        let config = DetectorConfig::batch();
        assert_eq!(config.bands.len(), 6);
        assert!(config.ambiguity_pairs.is_empty());
        assert_eq!(config.band("sub_bass").unwrap().low_hz, 20.0);
        assert_eq!(config.band("highs").unwrap().high_hz, 20000.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = DetectorConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: DetectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = DetectorConfig::load_from_file("/nonexistent/band_config.json");
        assert_eq!(config, DetectorConfig::default());
    }

    #[test]
    fn test_pairs_field_optional_in_json() {
        let json = r#"{
            "bands": [{
                "name": "bass",
                "low_hz": 60.0,
                "high_hz": 250.0,
                "activity_threshold": 0.3,
                "kind": "Sustained"
            }]
        }"#;
        let config: DetectorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.bands.len(), 1);
        assert!(config.ambiguity_pairs.is_empty());
    }
}
