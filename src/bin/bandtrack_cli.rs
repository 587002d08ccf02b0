use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use bandtracker::analysis::{BandEnergyExtractor, BandTracker, SpectralFrame};
use bandtracker::batch::{BandEnergyReading, BatchAnalyzer};
use bandtracker::config::DetectorConfig;
use clap::{Parser, Subcommand};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "bandtrack_cli",
    about = "Offline driver for the multi-band instrument activity detector"
)]
struct Cli {
    /// Band registry JSON (defaults to assets/band_config.json, then
    /// built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tick the real-time tracker over a WAV file and summarize per band
    Track {
        /// Input WAV file
        input: PathBuf,
        /// FFT window size in samples
        #[arg(long, default_value_t = 1024)]
        window: usize,
        /// Hop size between consecutive frames
        #[arg(long, default_value_t = 512)]
        hop: usize,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the six-band batch classifier over a WAV file
    Classify {
        /// Input WAV file
        input: PathBuf,
        /// FFT window size in samples
        #[arg(long, default_value_t = 1024)]
        window: usize,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Per-band summary over a whole tracked file
#[derive(Debug, Default, Serialize)]
struct BandSummary {
    active_ticks: u64,
    active_ratio: f32,
    mean_energy: f32,
    last_confidence: f32,
}

#[derive(Debug, Serialize)]
struct TrackReport {
    ticks: u64,
    bands: BTreeMap<String, BandSummary>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Track {
            input,
            window,
            hop,
            output,
        } => {
            let config = match &cli.config {
                Some(path) => DetectorConfig::load_from_file(path),
                None => DetectorConfig::load_from_file("assets/band_config.json"),
            };
            run_track(&input, config, window, hop, output)
        }
        Commands::Classify {
            input,
            window,
            output,
        } => run_classify(&input, window, output),
    }
}

fn run_track(
    input: &PathBuf,
    config: DetectorConfig,
    window: usize,
    hop: usize,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let (samples, sample_rate) = read_mono(input)?;
    let frames = magnitude_frames(&samples, sample_rate, window, hop);

    let buffer_length = window / 2;
    let mut tracker = BandTracker::new(Arc::new(config), sample_rate, buffer_length);

    let mut summaries: BTreeMap<String, (u64, f64, f32)> = BTreeMap::new();
    for frame in &frames {
        let results = tracker
            .tick(frame)
            .context("frame geometry diverged from tracker configuration")?;
        for (name, result) in results {
            let entry = summaries.entry(name).or_insert((0, 0.0, 0.0));
            if result.active {
                entry.0 += 1;
            }
            entry.1 += result.energy as f64;
            entry.2 = result.confidence;
        }
    }

    let ticks = tracker.ticks();
    let report = TrackReport {
        ticks,
        bands: summaries
            .into_iter()
            .map(|(name, (active_ticks, energy_sum, last_confidence))| {
                (
                    name,
                    BandSummary {
                        active_ticks,
                        active_ratio: if ticks > 0 {
                            active_ticks as f32 / ticks as f32
                        } else {
                            0.0
                        },
                        mean_energy: if ticks > 0 {
                            (energy_sum / ticks as f64) as f32
                        } else {
                            0.0
                        },
                        last_confidence,
                    },
                )
            })
            .collect(),
    };

    emit_json(&report, output)?;
    Ok(ExitCode::from(0))
}

fn run_classify(input: &PathBuf, window: usize, output: Option<PathBuf>) -> Result<ExitCode> {
    let (samples, sample_rate) = read_mono(input)?;
    let frames = magnitude_frames(&samples, sample_rate, window, window / 2);

    // File-level band energy: mean of per-frame band energies over the six
    // fixed batch bands
    let batch_config = DetectorConfig::batch();
    let mut extractor = BandEnergyExtractor::new(sample_rate, window / 2);
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for frame in &frames {
        for profile in &batch_config.bands {
            *sums.entry(profile.name.clone()).or_insert(0.0) +=
                extractor.band_energy(frame, profile) as f64;
        }
    }

    let frame_count = frames.len().max(1) as f64;
    let readings: Vec<BandEnergyReading> = batch_config
        .bands
        .iter()
        .map(|profile| BandEnergyReading {
            name: profile.name.clone(),
            low_hz: profile.low_hz,
            high_hz: profile.high_hz,
            energy: (sums.get(&profile.name).copied().unwrap_or(0.0) / frame_count) as f32,
        })
        .collect();

    let report = BatchAnalyzer::new()
        .analyze_readings(&readings)
        .context("batch classification failed")?;

    emit_json(&report, output)?;
    Ok(ExitCode::from(0))
}

/// Decode a WAV file to a mono f32 signal
fn read_mono(path: &PathBuf) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("opening WAV file {}", path.display()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("decoding float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("decoding integer samples")?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}

/// Hann-windowed magnitude frames, normalized so a full-scale sine reads
/// near 1.0 (its windowed peak bin magnitude is about N/4)
fn magnitude_frames(
    samples: &[f32],
    sample_rate: u32,
    fft_size: usize,
    hop: usize,
) -> Vec<SpectralFrame> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let hann: Vec<f32> = (0..fft_size)
        .map(|i| {
            0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / (fft_size as f32 - 1.0)).cos())
        })
        .collect();

    let max_magnitude = fft_size as f32 / 4.0;
    let hop = hop.max(1);

    let mut frames = Vec::new();
    let mut pos = 0;
    while pos + fft_size <= samples.len() {
        let mut buffer: Vec<Complex<f32>> = samples[pos..pos + fft_size]
            .iter()
            .zip(hann.iter())
            .map(|(sample, window_val)| Complex::new(sample * window_val, 0.0))
            .collect();
        fft.process(&mut buffer);

        let magnitudes: Vec<f32> = buffer[..fft_size / 2].iter().map(|c| c.norm()).collect();
        frames.push(
            SpectralFrame::new(magnitudes, sample_rate).with_max_magnitude(max_magnitude),
        );

        pos += hop;
    }

    frames
}

fn emit_json<T: Serialize>(value: &T, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}
