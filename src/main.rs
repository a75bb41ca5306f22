//! Command-line tool printing the frequency-intensity tuning curve of a recording as JSON.
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use tuning_curves::detector::{Polarity, SpikeDetector, ThresholdMode};
use tuning_curves::error::AnalysisError;
use tuning_curves::recording::JsonRecording;
use tuning_curves::sampler::SyntheticRecording;
use tuning_curves::stimulus::StimulusDescriptor;
use tuning_curves::threshold::estimate_threshold;
use tuning_curves::trial::TrialBlock;
use tuning_curves::tuning::{
    build_tuning_curve, DuplicatePolicy, MissingPolicy, TuningCurve, TuningOptions,
};
use tuning_curves::{AUTO_THRESHOLD_FRACTION, DEFAULT_REFRACTORY_PERIOD};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Abs,
    Signed,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Duplicates {
    Overwrite,
    Average,
    Error,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Missing {
    Error,
    Nan,
}

#[derive(Parser, Debug)]
#[command(about = "Compute the frequency-intensity tuning curve of a recording")]
struct Args {
    /// The JSON recording to analyze
    #[arg(long, required_unless_present = "synthetic")]
    input: Option<String>,
    /// Analyze a random recording instead of a file
    #[arg(long, conflicts_with = "input")]
    synthetic: bool,
    /// The seed used for sampling the random recording
    #[arg(long, default_value = "0")]
    seed: u64,
    /// The channel to analyze
    #[arg(long, default_value = "0")]
    channel: usize,
    /// The detection threshold (estimated from the recording if omitted)
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f64>,
    /// The trace used to estimate the threshold (the first non-silence trace if omitted)
    #[arg(long)]
    auto_threshold_trace: Option<usize>,
    /// The fraction of the average peak amplitude used as estimated threshold
    #[arg(long, default_value_t = AUTO_THRESHOLD_FRACTION)]
    fraction: f64,
    /// How samples are compared to the threshold
    #[arg(long, value_enum, default_value = "abs")]
    mode: Mode,
    /// Invert the polarity of the traces before detection
    #[arg(long)]
    invert: bool,
    /// The minimum time (in seconds) between two spikes
    #[arg(long, default_value_t = DEFAULT_REFRACTORY_PERIOD)]
    refractory: f64,
    /// What to do with stimulus conditions presented on several traces
    #[arg(long, value_enum, default_value = "overwrite")]
    duplicates: Duplicates,
    /// What to do with stimulus conditions missing from the grid
    #[arg(long, value_enum, default_value = "error")]
    missing: Missing,
    /// The logging level
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Serialize)]
struct Report<'a> {
    comment: Option<&'a str>,
    channel: usize,
    threshold: f64,
    tuning_curve: &'a TuningCurve,
}

/// Returns the threshold given on the command line, or estimates it from the recording.
fn resolve_threshold(
    args: &Args,
    block: &TrialBlock,
    stimuli: &[StimulusDescriptor],
) -> Result<f64, AnalysisError> {
    if let Some(threshold) = args.threshold {
        return Ok(threshold);
    }

    let trace = match args.auto_threshold_trace {
        Some(trace) => trace,
        None => stimuli
            .iter()
            .position(|stimulus| !stimulus.is_silence())
            .ok_or_else(|| {
                AnalysisError::InvalidParameter(
                    "No tone trace to estimate the threshold from".to_string(),
                )
            })?,
    };
    let threshold = estimate_threshold(block, trace, args.channel, args.fraction)?;
    log::info!("Estimated threshold from trace {}: {}", trace, threshold);
    Ok(threshold)
}

fn main() -> Result<(), AnalysisError> {
    let args = Args::parse();

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(args.log_level))
        .map_err(|e| AnalysisError::IOError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| AnalysisError::IOError(e.to_string()))?;

    log::debug!("{:?}", args);

    let (block, stimuli, comment) = match &args.input {
        Some(path) => {
            let recording = JsonRecording::from_path(path)?;
            log::info!("Recording loading: done! Read from {}", path);
            recording.into_parts()
        }
        None => {
            let mut rng = StdRng::seed_from_u64(args.seed);
            let design = SyntheticRecording::new(
                vec![2_000.0, 4_000.0, 8_000.0, 16_000.0, 32_000.0],
                vec![20.0, 40.0, 60.0, 80.0],
            );
            // Spontaneous activity plus a response with best frequency at 8 kHz, growing with intensity
            let (block, stimuli) = design.rand(
                |frequency, intensity| {
                    let octaves = (frequency / 8.0).log2();
                    1.0 + (intensity / 20.0) * (-octaves * octaves).exp()
                },
                &mut rng,
            )?;
            log::info!("Recording sampling: done!");
            (block, stimuli, Some("synthetic recording".to_string()))
        }
    };

    let threshold = resolve_threshold(&args, &block, &stimuli)?;

    let detector = SpikeDetector::build(threshold)?
        .with_mode(match args.mode {
            Mode::Abs => ThresholdMode::Absolute,
            Mode::Signed => ThresholdMode::Signed,
        })
        .with_polarity(match args.invert {
            true => Polarity::Inverted,
            false => Polarity::Normal,
        })
        .with_refractory(args.refractory)?;

    let options = TuningOptions {
        duplicates: match args.duplicates {
            Duplicates::Overwrite => DuplicatePolicy::Overwrite,
            Duplicates::Average => DuplicatePolicy::Average,
            Duplicates::Error => DuplicatePolicy::Error,
        },
        missing: match args.missing {
            Missing::Error => MissingPolicy::Error,
            Missing::Nan => MissingPolicy::Nan,
        },
    };

    let tuning_curve = build_tuning_curve(&block, &stimuli, args.channel, &detector, options)?;
    log::info!("Tuning curve: done!");

    let report = Report {
        comment: comment.as_deref(),
        channel: args.channel,
        threshold,
        tuning_curve: &tuning_curve,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
