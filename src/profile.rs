// Band profiles - named frequency bands and their detection parameters
//
// A BandProfile describes one candidate instrument (or instrument component)
// as a frequency range with an activity threshold. Profiles are built once at
// startup and treated as read-only afterwards; the tracker never mutates them.
//
// Percussion sub-bands (kick, snare, hihat) carry a `group` so the overlap
// resolver can aggregate them into a single composite "drums" result.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Acoustic character of a band, selecting the confidence heuristic
///
/// Percussive bands are judged by energy transients (sudden jumps between
/// consecutive samples); sustained bands are judged by level stability
/// (variance of recent samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandKind {
    /// Transient-driven band (kick, snare, hihat)
    Percussive,
    /// Level-stability-driven band (vocals, bass, guitar, synth)
    Sustained,
}

/// Immutable configuration for one named frequency band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandProfile {
    /// Band name, unique within a registry (e.g. "vocals", "kick")
    pub name: String,
    /// Lower edge of the band in Hz (inclusive)
    pub low_hz: f32,
    /// Upper edge of the band in Hz (exclusive)
    pub high_hz: f32,
    /// Normalized energy above which the band counts as active (0.0-1.0)
    pub activity_threshold: f32,
    /// Confidence heuristic to apply
    pub kind: BandKind,
    /// Composite group this band contributes to (e.g. "drums")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl BandProfile {
    /// Create a standalone band profile
    pub fn new(
        name: impl Into<String>,
        low_hz: f32,
        high_hz: f32,
        activity_threshold: f32,
        kind: BandKind,
    ) -> Self {
        Self {
            name: name.into(),
            low_hz,
            high_hz,
            activity_threshold,
            kind,
            group: None,
        }
    }

    /// Create a band profile that contributes to a composite group
    pub fn grouped(
        name: impl Into<String>,
        low_hz: f32,
        high_hz: f32,
        activity_threshold: f32,
        kind: BandKind,
        group: impl Into<String>,
    ) -> Self {
        Self {
            group: Some(group.into()),
            ..Self::new(name, low_hz, high_hz, activity_threshold, kind)
        }
    }
}

/// A registered pair of bands with known frequency overlap
///
/// Only registered pairs are checked during overlap resolution; unrelated
/// bands never suppress each other. When both bands of a pair are active and
/// one band's energy exceeds the other's by `dominance_ratio`, the weaker
/// band's confidence is multiplied by `damping`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityPair {
    /// First band name
    pub a: String,
    /// Second band name
    pub b: String,
    /// Energy ratio at which one band dominates the other
    #[serde(default = "default_dominance_ratio")]
    pub dominance_ratio: f32,
    /// Confidence multiplier applied to the dominated band
    #[serde(default = "default_damping")]
    pub damping: f32,
}

impl AmbiguityPair {
    /// Register an ambiguous pair with the default ratio and damping
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            dominance_ratio: default_dominance_ratio(),
            damping: default_damping(),
        }
    }
}

fn default_dominance_ratio() -> f32 {
    1.2
}

fn default_damping() -> f32 {
    0.7
}

/// Built-in instrument-shaped registry for real-time tracking
///
/// Ranges overlap deliberately (vocals vs. guitar, synth vs. nearly
/// everything); the overlap resolver handles the declared ambiguities.
static REALTIME_PROFILES: Lazy<Vec<BandProfile>> = Lazy::new(|| {
    vec![
        BandProfile::new("vocals", 300.0, 3500.0, 0.25, BandKind::Sustained),
        BandProfile::new("guitar", 300.0, 4000.0, 0.25, BandKind::Sustained),
        BandProfile::new("bass", 60.0, 250.0, 0.3, BandKind::Sustained),
        BandProfile::grouped("kick", 30.0, 100.0, 0.35, BandKind::Percussive, "drums"),
        BandProfile::grouped("snare", 200.0, 800.0, 0.3, BandKind::Percussive, "drums"),
        BandProfile::grouped("hihat", 5000.0, 12000.0, 0.25, BandKind::Percussive, "drums"),
        BandProfile::new("synth", 100.0, 8000.0, 0.2, BandKind::Sustained),
    ]
});

/// Built-in six-band registry for batch (file-level) classification
///
/// Non-overlapping bands covering the audible spectrum; the batch rule layer
/// maps their energies onto instrument flags.
static BATCH_PROFILES: Lazy<Vec<BandProfile>> = Lazy::new(|| {
    vec![
        BandProfile::new("sub_bass", 20.0, 60.0, 0.5, BandKind::Sustained),
        BandProfile::new("bass", 60.0, 250.0, 0.5, BandKind::Sustained),
        BandProfile::new("low_mids", 250.0, 500.0, 0.5, BandKind::Sustained),
        BandProfile::new("mids", 500.0, 2000.0, 0.5, BandKind::Sustained),
        BandProfile::new("high_mids", 2000.0, 4000.0, 0.5, BandKind::Sustained),
        BandProfile::new("highs", 4000.0, 20000.0, 0.5, BandKind::Sustained),
    ]
});

/// Default real-time band registry (instrument-shaped, overlapping ranges)
pub fn realtime_defaults() -> &'static [BandProfile] {
    &REALTIME_PROFILES
}

/// Default batch band registry (six non-overlapping spectrum slices)
pub fn batch_defaults() -> &'static [BandProfile] {
    &BATCH_PROFILES
}

/// Default ambiguous pairs for the real-time registry
pub fn default_ambiguity_pairs() -> Vec<AmbiguityPair> {
    vec![AmbiguityPair::new("bass", "guitar")]
}
