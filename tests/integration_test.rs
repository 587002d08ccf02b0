//! Integration tests for the band activity detector
//!
//! These tests exercise the public API end-to-end:
//! - Threshold/activity invariant across ticks
//! - Percussive and sustained confidence behavior through real frame feeds
//! - Temporal history bounds
//! - Composite groups and pairwise overlap suppression
//! - The all-zero round trip
//! - Batch six-band classification

use std::sync::Arc;

use bandtracker::analysis::{BandTracker, SpectralFrame, TemporalHistory};
use bandtracker::batch::{BandEnergyReading, BatchAnalyzer};
use bandtracker::config::DetectorConfig;
use bandtracker::profile::{self, AmbiguityPair, BandKind, BandProfile};

const SAMPLE_RATE: u32 = 48000;
const BUFFER_LENGTH: usize = 512;
const NYQUIST: f32 = SAMPLE_RATE as f32 / 2.0;

/// Frame with a flat magnitude across the whole spectrum
fn flat_frame(level: f32) -> SpectralFrame {
    SpectralFrame::new(vec![level; BUFFER_LENGTH], SAMPLE_RATE)
}

/// Frame holding `level` inside [low_hz, high_hz) and zero elsewhere
fn shaped_frame(regions: &[(f32, f32, f32)]) -> SpectralFrame {
    let mut magnitudes = vec![0.0; BUFFER_LENGTH];
    for &(low_hz, high_hz, level) in regions {
        let low = ((low_hz / NYQUIST) * BUFFER_LENGTH as f32).floor() as usize;
        let high = ((high_hz / NYQUIST) * BUFFER_LENGTH as f32).floor() as usize;
        for mag in &mut magnitudes[low.min(BUFFER_LENGTH)..high.min(BUFFER_LENGTH)] {
            *mag = level;
        }
    }
    SpectralFrame::new(magnitudes, SAMPLE_RATE)
}

fn tracker(config: DetectorConfig) -> BandTracker {
    BandTracker::new(Arc::new(config), SAMPLE_RATE, BUFFER_LENGTH)
}

/// Every tick output satisfies active == (energy > threshold)
#[test]
fn test_activity_invariant_across_ticks() {
    let config = DetectorConfig::default();
    let thresholds: Vec<(String, f32)> = config
        .bands
        .iter()
        .map(|p| (p.name.clone(), p.activity_threshold))
        .collect();
    let mut tracker = tracker(config);

    for step in 0..30 {
        // Sweep energy up and down across ticks
        let level = (step % 10) as f32 / 10.0;
        let results = tracker.tick(&flat_frame(level)).unwrap();

        for (name, threshold) in &thresholds {
            let result = &results[name];
            assert_eq!(
                result.active,
                result.energy > *threshold,
                "tick {}: band {} violated the activity invariant",
                step,
                name
            );
        }
    }
}

/// A 1.5x energy jump within the last 5 samples yields percussive
/// confidence 0.8; a flat history yields 0.4
#[test]
fn test_percussive_confidence_through_ticks() {
    let config = DetectorConfig {
        bands: vec![BandProfile::new(
            "perc",
            0.0,
            NYQUIST,
            0.3,
            BandKind::Percussive,
        )],
        ambiguity_pairs: Vec::new(),
    };
    let mut tracker = tracker(config);

    // Flat feed: no transient once the window is full
    for _ in 0..5 {
        tracker.tick(&flat_frame(0.4)).unwrap();
    }
    assert_eq!(tracker.latest()["perc"].confidence, 0.4);

    // Jump 0.4 -> 0.7 exceeds 1.5 * 0.4 = 0.6
    let results = tracker.tick(&flat_frame(0.7)).unwrap();
    assert_eq!(results["perc"].confidence, 0.8);
}

/// Constant-energy history caps sustained confidence at exactly 0.9; a
/// high-variance history floors it at exactly 0.3
#[test]
fn test_sustained_confidence_extremes() {
    let config = DetectorConfig {
        bands: vec![BandProfile::new(
            "pad",
            0.0,
            NYQUIST,
            0.3,
            BandKind::Sustained,
        )],
        ambiguity_pairs: Vec::new(),
    };

    let mut steady = tracker(config.clone());
    for _ in 0..10 {
        steady.tick(&flat_frame(0.6)).unwrap();
    }
    assert_eq!(steady.latest()["pad"].confidence, 0.9);

    let mut noisy = tracker(config);
    for step in 0..10 {
        let level = if step % 2 == 0 { 1.0 } else { 0.0 };
        noisy.tick(&flat_frame(level)).unwrap();
    }
    assert_eq!(noisy.latest()["pad"].confidence, 0.3);
}

/// History is bounded at 20 samples and preserves FIFO order
#[test]
fn test_history_capacity_and_order() {
    let mut history = TemporalHistory::new();
    for i in 0..25 {
        history.push(i as f32 / 25.0);
    }

    assert_eq!(history.len(), 20);
    let recent = history.recent(20);
    let expected: Vec<f32> = (5..25).map(|i| i as f32 / 25.0).collect();
    assert_eq!(recent, expected);
}

/// Composite groups appear in tick output with max-energy aggregation
#[test]
fn test_drums_composite_in_tick_output() {
    let mut tracker = tracker(DetectorConfig::default());

    // Energy in kick and hihat ranges only
    let frame = shaped_frame(&[(30.0, 100.0, 0.7), (5000.0, 12000.0, 0.5)]);
    let results = tracker.tick(&frame).unwrap();

    let drums = results.get("drums").expect("composite for complete group");
    assert!((drums.energy - 0.7).abs() < 1e-6, "max of constituents");
    assert!(drums.active);
    assert_eq!(drums.components.len(), 3);
    assert!(
        drums.components["snare"].energy < 1e-6,
        "snare sits outside the excited regions"
    );
}

/// Registered-pair suppression damps only the dominated band, and only
/// when the dominance ratio is exceeded
#[test]
fn test_overlap_suppression_end_to_end() {
    let config = DetectorConfig {
        bands: vec![
            BandProfile::new("bass", 60.0, 250.0, 0.3, BandKind::Sustained),
            BandProfile::new("guitar", 300.0, 4000.0, 0.25, BandKind::Sustained),
        ],
        ambiguity_pairs: vec![AmbiguityPair::new("bass", "guitar")],
    };

    // Dominant bass: guitar confidence is damped to 0.7x its raw value
    let mut dominated = tracker(config.clone());
    let frame = shaped_frame(&[(60.0, 250.0, 0.9), (300.0, 4000.0, 0.5)]);
    for _ in 0..6 {
        dominated.tick(&frame).unwrap();
    }
    let results = dominated.latest();
    // Raw sustained confidence is 0.9 (constant feed); suppression: 0.63
    assert!((results["guitar"].confidence - 0.63).abs() < 1e-6);
    assert_eq!(results["bass"].confidence, 0.9);

    // Comparable energies: nobody dominates, nobody is damped
    let mut balanced = tracker(config);
    let frame = shaped_frame(&[(60.0, 250.0, 0.55), (300.0, 4000.0, 0.5)]);
    for _ in 0..6 {
        balanced.tick(&frame).unwrap();
    }
    let results = balanced.latest();
    assert_eq!(results["bass"].confidence, 0.9);
    assert_eq!(results["guitar"].confidence, 0.9);
}

/// Twenty all-zero frames drive every band to silence: energy 0, inactive,
/// percussive confidence 0.4, sustained confidence 0.9
#[test]
fn test_all_zero_round_trip() {
    let config = DetectorConfig::default();
    let kinds: Vec<(String, BandKind)> = config
        .bands
        .iter()
        .map(|p| (p.name.clone(), p.kind))
        .collect();
    let mut tracker = tracker(config);

    let mut last = None;
    for _ in 0..20 {
        last = Some(tracker.tick(&flat_frame(0.0)).unwrap());
    }
    let results = last.unwrap();

    for (name, kind) in kinds {
        let result = &results[name.as_str()];
        assert_eq!(result.energy, 0.0, "band {} should be silent", name);
        assert!(!result.active, "band {} should be inactive", name);
        match kind {
            BandKind::Percussive => assert_eq!(result.confidence, 0.4),
            BandKind::Sustained => assert_eq!(result.confidence, 0.9),
        }
    }

    // The composite reflects its silent members
    let drums = &results["drums"];
    assert_eq!(drums.energy, 0.0);
    assert!(!drums.active);
    assert_eq!(drums.confidence, 0.4);
}

/// Reference batch vector: drums and vocals detected, everything else not
#[test]
fn test_batch_classification_vector() {
    let energies = [0.65, 0.3, 0.2, 0.75, 0.2, 0.2];
    let readings: Vec<BandEnergyReading> = profile::batch_defaults()
        .iter()
        .zip(energies)
        .map(|(p, energy)| BandEnergyReading {
            name: p.name.clone(),
            low_hz: p.low_hz,
            high_hz: p.high_hz,
            energy,
        })
        .collect();

    let report = BatchAnalyzer::new().analyze_readings(&readings).unwrap();

    let drums = report.instruments["drums"];
    assert!(drums.detected);
    assert!((drums.confidence - 0.65).abs() < 1e-6);

    let vocals = report.instruments["vocals"];
    assert!(vocals.detected);
    assert!((vocals.confidence - 0.75).abs() < 1e-6);

    for name in ["bass", "guitar", "synth"] {
        assert!(!report.instruments[name].detected, "{} detected", name);
    }
}

/// Energies and confidences stay in range under random spectra
#[test]
fn test_outputs_bounded_under_noise() {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let mut tracker = tracker(DetectorConfig::default());

    for _ in 0..50 {
        let magnitudes: Vec<f32> = (0..BUFFER_LENGTH)
            .map(|_| rng.gen_range(0.0..1.0))
            .collect();
        let results = tracker
            .tick(&SpectralFrame::new(magnitudes, SAMPLE_RATE))
            .unwrap();

        for (name, result) in &results {
            assert!(
                (0.0..=1.0).contains(&result.energy),
                "band {} energy {} out of range",
                name,
                result.energy
            );
            assert!(
                (0.0..=1.0).contains(&result.confidence),
                "band {} confidence {} out of range",
                name,
                result.confidence
            );
        }
    }
}

/// Streamed detection delivers snapshots for every pushed frame
#[tokio::test]
async fn test_stream_snapshot_delivery() {
    use bandtracker::stream::StreamDetector;
    use futures::StreamExt;

    let (mut producer, consumer) = rtrb::RingBuffer::new(8);
    let detector = StreamDetector::spawn(
        Arc::new(DetectorConfig::default()),
        SAMPLE_RATE,
        BUFFER_LENGTH,
        consumer,
    );
    let mut snapshots = detector.snapshot_stream();

    producer.push(flat_frame(0.5)).unwrap();
    producer.push(flat_frame(0.5)).unwrap();
    producer.push(flat_frame(0.5)).unwrap();

    for expected_tick in 1..=3u64 {
        let snapshot = snapshots
            .next()
            .await
            .expect("stream open")
            .expect("no lag at this rate");
        assert_eq!(snapshot.tick, expected_tick);
        assert!(snapshot.results.contains_key("drums"));
    }

    detector.stop();
}
