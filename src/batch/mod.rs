// Batch module - offline six-band file-level classification
//
// The offline path runs once per uploaded file: six non-overlapping band
// energies (precomputed readings, or RMS over externally band-limited
// waveforms) feed a fixed-threshold rule layer that flags instruments.
//
// Band RMS computations are independent reads over disjoint outputs, so
// they fan out across scoped threads; classification waits on the join
// barrier. Per-file analysis can be wrapped in a timeout, after which the
// file is treated as permanently failed. Stem separation, when configured,
// is awaited separately and never blocks band-energy detection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod rules;
pub mod separation;

pub use rules::{classify, InstrumentFlag};
pub use separation::{NullSeparator, StemSet, StemSeparator};

use crate::analysis::rms_energy;
use crate::config::DetectorConfig;
use crate::error::BatchError;

/// Precomputed energy for one band, supplied by an external filter stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandEnergyReading {
    pub name: String,
    pub low_hz: f32,
    pub high_hz: f32,
    /// Normalized band energy (0.0-1.0)
    pub energy: f32,
}

/// Band-limited waveform for one band, filtered by an external collaborator
#[derive(Debug, Clone)]
pub struct BandWaveform {
    pub name: String,
    pub samples: Vec<f32>,
}

/// Result of one file-level analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Normalized energy per analyzed band
    pub bands: BTreeMap<String, f32>,
    /// Instrument verdicts from the rule layer
    pub instruments: BTreeMap<String, InstrumentFlag>,
    /// Per-stem RMS energies when separation was available, empty otherwise
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stems: BTreeMap<String, f32>,
}

/// File-level analyzer over a fixed band registry
#[derive(Debug, Clone)]
pub struct BatchAnalyzer {
    config: Arc<DetectorConfig>,
}

impl BatchAnalyzer {
    /// Analyzer over the standard six-band batch registry
    pub fn new() -> Self {
        Self {
            config: Arc::new(DetectorConfig::batch()),
        }
    }

    /// Analyzer over an explicit band registry
    pub fn with_config(config: Arc<DetectorConfig>) -> Self {
        Self { config }
    }

    /// Classify a file from precomputed per-band energy readings
    ///
    /// Every band in the registry must have a reading; extra readings are
    /// ignored. Energies are clamped to [0, 1] before classification.
    pub fn analyze_readings(
        &self,
        readings: &[BandEnergyReading],
    ) -> Result<BatchReport, BatchError> {
        let mut bands = BTreeMap::new();
        for profile in &self.config.bands {
            let reading = readings
                .iter()
                .find(|r| r.name == profile.name)
                .ok_or_else(|| BatchError::MissingBand {
                    name: profile.name.clone(),
                })?;
            bands.insert(profile.name.clone(), reading.energy.clamp(0.0, 1.0));
        }

        Ok(self.report_from_bands(bands))
    }

    /// Classify a file from externally band-limited waveforms
    ///
    /// RMS energies for the bands are computed concurrently; the rule layer
    /// runs only after every band has completed.
    ///
    /// # Arguments
    /// * `source_peak` - Maximum absolute sample amplitude of the unfiltered
    ///   source signal, the normalization reference for every band
    /// * `waveforms` - One band-limited waveform per registered band
    pub fn analyze_waveforms(
        &self,
        source_peak: f32,
        waveforms: &[BandWaveform],
    ) -> Result<BatchReport, BatchError> {
        // Resolve registry order up front so a missing band fails before
        // any worker is spawned
        let mut ordered = Vec::with_capacity(self.config.bands.len());
        for profile in &self.config.bands {
            let waveform = waveforms
                .iter()
                .find(|w| w.name == profile.name)
                .ok_or_else(|| BatchError::MissingBand {
                    name: profile.name.clone(),
                })?;
            ordered.push(waveform);
        }

        let mut bands = BTreeMap::new();
        std::thread::scope(|scope| {
            let handles: Vec<_> = ordered
                .iter()
                .map(|waveform| {
                    let samples = &waveform.samples;
                    (
                        waveform.name.clone(),
                        scope.spawn(move || rms_energy(samples, source_peak)),
                    )
                })
                .collect();

            // Join barrier: classification never starts on partial energies
            for (name, handle) in handles {
                match handle.join() {
                    Ok(energy) => {
                        bands.insert(name, energy);
                    }
                    Err(_) => {
                        return Err(BatchError::Worker {
                            reason: format!("band \"{}\" energy worker panicked", name),
                        })
                    }
                }
            }
            Ok(())
        })?;

        Ok(self.report_from_bands(bands))
    }

    /// Waveform analysis with a hard per-file time limit
    ///
    /// Expiry is a permanent failure for the file; the stale computation is
    /// abandoned and never retried.
    pub async fn analyze_waveforms_with_timeout(
        &self,
        source_peak: f32,
        waveforms: Vec<BandWaveform>,
        limit: Duration,
    ) -> Result<BatchReport, BatchError> {
        let analyzer = self.clone();
        let analysis =
            tokio::task::spawn_blocking(move || analyzer.analyze_waveforms(source_peak, &waveforms));

        match tokio::time::timeout(limit, analysis).await {
            Ok(joined) => joined?,
            Err(_) => {
                log::warn!(
                    "[Batch] Band analysis exceeded {} ms, treating file as failed",
                    limit.as_millis()
                );
                Err(BatchError::Timeout {
                    limit_ms: limit.as_millis() as u64,
                })
            }
        }
    }

    /// Full file analysis: band energies plus best-effort stems
    ///
    /// Band analysis and stem separation run concurrently, each under the
    /// same time limit. Separation failure or timeout only costs the stems;
    /// the band report is returned regardless.
    pub async fn analyze_file(
        &self,
        source: Vec<f32>,
        sample_rate: u32,
        waveforms: Vec<BandWaveform>,
        separator: Arc<dyn StemSeparator>,
        limit: Duration,
    ) -> Result<BatchReport, BatchError> {
        let source_peak = source.iter().fold(0.0f32, |peak, &s| peak.max(s.abs()));

        let bands_task = self.analyze_waveforms_with_timeout(source_peak, waveforms, limit);
        let stems_task = async {
            let separation = tokio::task::spawn_blocking(move || {
                separation::stem_energies(separator.as_ref(), &source, sample_rate, source_peak)
            });
            match tokio::time::timeout(limit, separation).await {
                Ok(Ok(stems)) => stems,
                Ok(Err(err)) => {
                    log::warn!("[Batch] Stem separation worker failed: {}", err);
                    BTreeMap::new()
                }
                Err(_) => {
                    log::warn!(
                        "[Batch] Stem separation exceeded {} ms, proceeding without stems",
                        limit.as_millis()
                    );
                    BTreeMap::new()
                }
            }
        };

        let (report, stems) = futures::join!(bands_task, stems_task);
        let mut report = report?;
        report.stems = stems;
        Ok(report)
    }

    fn report_from_bands(&self, bands: BTreeMap<String, f32>) -> BatchReport {
        let instruments = rules::classify(&bands);
        BatchReport {
            bands,
            instruments,
            stems: BTreeMap::new(),
        }
    }
}

impl Default for BatchAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
