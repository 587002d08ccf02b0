// Analysis module - per-tick band activity detection pipeline
//
// This module orchestrates the detection pipeline for one stream: band
// energy extraction -> temporal history update -> confidence estimation ->
// overlap resolution, in that fixed order, producing a full band -> result
// mapping every tick.
//
// The tracker owns all mutable per-band state (the temporal histories);
// calling `tick` is the only way that state advances. There is no background
// timer and no shared mutable context between calls.

use std::collections::BTreeMap;
use std::sync::Arc;

pub mod confidence;
pub mod energy;
pub mod history;
pub mod overlap;

pub use energy::{rms_energy, BandEnergyExtractor, SpectralFrame};
pub use history::{TemporalHistory, HISTORY_CAPACITY};
pub use overlap::OverlapResolver;

use crate::config::DetectorConfig;
use crate::error::DetectionError;

/// Detection outcome for one band in one tick
///
/// Recomputed every tick; composite (group) entries additionally carry their
/// constituents' individual results in `components`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionResult {
    /// Normalized band energy (0.0-1.0)
    pub energy: f32,
    /// Whether energy exceeds the band's activity threshold
    pub active: bool,
    /// Heuristic confidence that the activity is real (0.0-1.0)
    pub confidence: f32,
    /// Per-member results for composite group entries, empty otherwise
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, DetectionResult>,
}

/// Per-stream band activity tracker
///
/// One tracker per stream: each owns its band histories exclusively and
/// shares only the read-only configuration. Tearing a stream down is
/// dropping its tracker; there is no in-flight work to cancel because ticks
/// are short, synchronous, and non-blocking.
pub struct BandTracker {
    config: Arc<DetectorConfig>,
    extractor: BandEnergyExtractor,
    resolver: OverlapResolver,
    /// Parallel to `config.bands`
    histories: Vec<TemporalHistory>,
    latest: BTreeMap<String, DetectionResult>,
    ticks: u64,
}

impl BandTracker {
    /// Create a tracker for frames of the given geometry
    ///
    /// # Arguments
    /// * `config` - Band registry and ambiguity pairs (shared, read-only)
    /// * `sample_rate` - Sample rate of the frame source in Hz
    /// * `buffer_length` - Number of magnitude bins per frame
    pub fn new(config: Arc<DetectorConfig>, sample_rate: u32, buffer_length: usize) -> Self {
        let extractor = BandEnergyExtractor::new(sample_rate, buffer_length);
        let resolver = OverlapResolver::new(&config.bands, &config.ambiguity_pairs);
        let histories = config
            .bands
            .iter()
            .map(|_| TemporalHistory::new())
            .collect();

        Self {
            config,
            extractor,
            resolver,
            histories,
            latest: BTreeMap::new(),
            ticks: 0,
        }
    }

    /// Run one detection tick against a spectral frame
    ///
    /// Pipeline order is fixed: extraction, history update, confidence,
    /// overlap resolution. The returned mapping covers every configured band
    /// plus any complete composite groups.
    ///
    /// # Returns
    /// * `Ok(results)` - Full band -> result mapping for this tick
    /// * `Err(DetectionError)` - Malformed frame; the tick is skipped, no
    ///   history is updated, and [`latest`](Self::latest) keeps serving the
    ///   previous mapping
    pub fn tick(
        &mut self,
        frame: &SpectralFrame,
    ) -> Result<BTreeMap<String, DetectionResult>, DetectionError> {
        self.extractor.validate(frame)?;

        let mut results = BTreeMap::new();
        for (profile, history) in self.config.bands.iter().zip(self.histories.iter_mut()) {
            let band_energy = self.extractor.band_energy(frame, profile);
            history.push(band_energy);

            let band_confidence = confidence::estimate(profile.kind, history);

            results.insert(
                profile.name.clone(),
                DetectionResult {
                    energy: band_energy,
                    active: band_energy > profile.activity_threshold,
                    confidence: band_confidence,
                    components: BTreeMap::new(),
                },
            );
        }

        self.resolver.resolve(&mut results);

        self.latest = results.clone();
        self.ticks += 1;
        Ok(results)
    }

    /// Most recent successful tick's results (held over across skipped ticks)
    pub fn latest(&self) -> &BTreeMap<String, DetectionResult> {
        &self.latest
    }

    /// Number of successful ticks since construction
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The shared configuration this tracker was built from
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}
