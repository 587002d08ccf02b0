// Confidence estimation - temporal heuristics per band kind
//
// Percussive bands are judged by transients: a sudden jump between
// consecutive energy samples marks percussive activity, so mean/variance of
// the window carries no signal. Sustained bands are judged the opposite way:
// a stable level is more likely a genuine instrument than a fluctuating one,
// so confidence falls as variance rises.

use crate::analysis::history::TemporalHistory;
use crate::profile::BandKind;

/// Samples examined by both confidence heuristics
pub const CONFIDENCE_WINDOW: usize = 5;

/// Confidence reported while the history holds fewer than
/// [`CONFIDENCE_WINDOW`] samples
pub const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// A sample exceeding this multiple of its predecessor counts as a transient
const TRANSIENT_RATIO: f32 = 1.5;

/// Percussive confidence when a transient is present in the window
const TRANSIENT_CONFIDENCE: f32 = 0.8;

/// Percussive confidence when the window is transient-free
const NO_TRANSIENT_CONFIDENCE: f32 = 0.4;

/// Sustained confidence floor and cap
const SUSTAINED_FLOOR: f32 = 0.3;
const SUSTAINED_CAP: f32 = 0.9;

/// Weight applied to variance in the sustained heuristic
const VARIANCE_WEIGHT: f32 = 5.0;

/// Confidence in [0, 1] that a band's recent history reflects real activity
///
/// With fewer than [`CONFIDENCE_WINDOW`] samples the history cannot support
/// either heuristic and the neutral 0.5 is returned; this is a defined edge
/// case, not an error.
pub fn estimate(kind: BandKind, history: &TemporalHistory) -> f32 {
    let window = history.recent(CONFIDENCE_WINDOW);
    if window.len() < CONFIDENCE_WINDOW {
        return NEUTRAL_CONFIDENCE;
    }

    match kind {
        BandKind::Percussive => {
            if has_transient(&window) {
                TRANSIENT_CONFIDENCE
            } else {
                NO_TRANSIENT_CONFIDENCE
            }
        }
        BandKind::Sustained => {
            let variance = variance(&window);
            (1.0 - variance * VARIANCE_WEIGHT).clamp(SUSTAINED_FLOOR, SUSTAINED_CAP)
        }
    }
}

/// True when any sample exceeds `TRANSIENT_RATIO` times its immediate
/// predecessor
fn has_transient(window: &[f32]) -> bool {
    window
        .windows(2)
        .any(|pair| pair[1] > pair[0] * TRANSIENT_RATIO)
}

/// Population variance of the window
fn variance(window: &[f32]) -> f32 {
    let n = window.len() as f32;
    let mean = window.iter().sum::<f32>() / n;
    window.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / n
}
