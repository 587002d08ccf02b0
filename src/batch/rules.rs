// Instrument rule layer - fixed-threshold flags over six band energies
//
// The batch classifier is deliberately non-temporal: one set of band
// energies per file, one pass of threshold rules. Confidences come straight
// from the band energies that triggered each rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical batch band names
pub const SUB_BASS: &str = "sub_bass";
pub const BASS: &str = "bass";
pub const LOW_MIDS: &str = "low_mids";
pub const MIDS: &str = "mids";
pub const HIGH_MIDS: &str = "high_mids";
pub const HIGHS: &str = "highs";

/// Instruments the rule layer reports on
pub const INSTRUMENTS: [&str; 5] = ["vocals", "guitar", "bass", "drums", "synth"];

/// Detected/confidence verdict for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentFlag {
    pub detected: bool,
    /// Energy-derived confidence; 0.0 when not detected
    pub confidence: f32,
}

impl InstrumentFlag {
    fn detected(confidence: f32) -> Self {
        Self {
            detected: true,
            confidence,
        }
    }

    fn absent() -> Self {
        Self {
            detected: false,
            confidence: 0.0,
        }
    }
}

/// Apply the fixed instrument rules to the six band energies
///
/// Rules:
/// - bass: bass > 0.6, confidence = bass energy
/// - drums: sub_bass > 0.6 or highs > 0.7, confidence = max of the two
/// - vocals: mids > 0.7, confidence = mids energy
/// - guitar: low_mids > 0.6 and mids > 0.5, confidence = their average
/// - synth: high_mids > 0.7 and highs > 0.6, confidence = their average
pub fn classify(bands: &BTreeMap<String, f32>) -> BTreeMap<String, InstrumentFlag> {
    let energy = |name: &str| bands.get(name).copied().unwrap_or(0.0);

    let sub_bass = energy(SUB_BASS);
    let bass = energy(BASS);
    let low_mids = energy(LOW_MIDS);
    let mids = energy(MIDS);
    let high_mids = energy(HIGH_MIDS);
    let highs = energy(HIGHS);

    let mut flags = BTreeMap::new();

    flags.insert(
        "bass".to_string(),
        if bass > 0.6 {
            InstrumentFlag::detected(bass)
        } else {
            InstrumentFlag::absent()
        },
    );

    flags.insert(
        "drums".to_string(),
        if sub_bass > 0.6 || highs > 0.7 {
            InstrumentFlag::detected(sub_bass.max(highs))
        } else {
            InstrumentFlag::absent()
        },
    );

    flags.insert(
        "vocals".to_string(),
        if mids > 0.7 {
            InstrumentFlag::detected(mids)
        } else {
            InstrumentFlag::absent()
        },
    );

    flags.insert(
        "guitar".to_string(),
        if low_mids > 0.6 && mids > 0.5 {
            InstrumentFlag::detected((low_mids + mids) / 2.0)
        } else {
            InstrumentFlag::absent()
        },
    );

    flags.insert(
        "synth".to_string(),
        if high_mids > 0.7 && highs > 0.6 {
            InstrumentFlag::detected((high_mids + highs) / 2.0)
        } else {
            InstrumentFlag::absent()
        },
    );

    flags
}
