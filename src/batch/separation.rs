// Stem separation collaborator - optional, best-effort input signal
//
// Source separation is an external process with its own failure modes and
// timeouts. The analyzer treats it as a capability-checked collaborator:
// when a separator is present and succeeds, its per-stem energies enrich the
// batch report; when it is absent or fails, detection proceeds on band
// energies alone.

use std::collections::BTreeMap;

use crate::analysis::rms_energy;

/// One set of separated stems for a source signal
#[derive(Debug, Clone, Default)]
pub struct StemSet {
    /// Stem name (e.g. "vocals", "drums") -> isolated waveform
    pub stems: BTreeMap<String, Vec<f32>>,
}

/// Best-effort source separation collaborator
///
/// Implementations typically shell out to an external tool. Failures are
/// expected and recoverable; callers must never treat an `Err` as fatal.
pub trait StemSeparator: Send + Sync {
    /// Whether the separator can run at all (binary installed, model
    /// downloaded, ...). Checked before any work is attempted.
    fn is_available(&self) -> bool;

    /// Separate a source signal into stems
    fn separate(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<StemSet>;
}

/// Separator used when no external tool is configured; never available
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSeparator;

impl StemSeparator for NullSeparator {
    fn is_available(&self) -> bool {
        false
    }

    fn separate(&self, _samples: &[f32], _sample_rate: u32) -> anyhow::Result<StemSet> {
        anyhow::bail!("no stem separator configured")
    }
}

/// Per-stem RMS energies from a separator, or an empty map on any failure
///
/// All failure paths are logged and recovered locally; absence of stems
/// never blocks band-energy detection.
pub fn stem_energies(
    separator: &dyn StemSeparator,
    samples: &[f32],
    sample_rate: u32,
    source_peak: f32,
) -> BTreeMap<String, f32> {
    if !separator.is_available() {
        log::debug!("[Separation] No separator available, skipping stems");
        return BTreeMap::new();
    }

    match separator.separate(samples, sample_rate) {
        Ok(stem_set) => stem_set
            .stems
            .iter()
            .map(|(name, waveform)| (name.clone(), rms_energy(waveform, source_peak)))
            .collect(),
        Err(err) => {
            log::warn!("[Separation] Separator failed, proceeding without stems: {}", err);
            BTreeMap::new()
        }
    }
}
