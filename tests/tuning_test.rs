use approx::assert_relative_eq;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;

use tuning_curves::detector::SpikeDetector;
use tuning_curves::error::AnalysisError;
use tuning_curves::recording::{JsonLayout, JsonRecording, RecordingSource};
use tuning_curves::sampler::SyntheticRecording;
use tuning_curves::stats::{bin_spikes, firing_rate, Psth};
use tuning_curves::stimulus::{StimulusComponent, TraceStimulus};
use tuning_curves::threshold::estimate_threshold;
use tuning_curves::trial::{detect_repetitions, summarize_trace};
use tuning_curves::tuning::TuningCurve;
use tuning_curves::AUTO_THRESHOLD_FRACTION;

const SEED: u64 = 42;

fn component(stim_type: &str, frequency: Option<f64>, intensity: Option<f64>) -> TraceStimulus {
    TraceStimulus {
        components: vec![StimulusComponent {
            stim_type: stim_type.to_string(),
            frequency,
            intensity,
        }],
    }
}

#[test]
fn test_tuning_curve_from_json_file() {
    // 5 traces (silence + 2x2 tones), 2 repetitions, 2 channels, 100 samples at 1 kHz
    // Channel 1 carries (trace index) pulses per repetition, channel 0 is silent
    let mut data = vec![];
    for trace in 0..5 {
        for _ in 0..2 {
            data.extend(vec![0.0; 100]);
            let mut samples = vec![0.0; 100];
            (0..trace).for_each(|k| samples[10 + 20 * k] = -2.0);
            data.extend(samples);
        }
    }
    let layout = JsonLayout {
        sample_rate: 1000.0,
        shape: vec![5, 2, 2, 100],
        data,
        stim: vec![
            component("silence", None, Some(0.0)),
            component("Pure Tone", Some(1000.0), Some(10.0)),
            component("Pure Tone", Some(2000.0), Some(10.0)),
            component("Pure Tone", Some(1000.0), Some(20.0)),
            component("Pure Tone", Some(2000.0), Some(20.0)),
        ],
        comment: Some("synthetic pulses".to_string()),
    };

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&layout).unwrap().as_bytes())
        .unwrap();
    let recording = JsonRecording::from_path(file.path()).unwrap();
    assert_eq!(recording.comment(), Some("synthetic pulses"));

    let block = recording.trial_block();
    let threshold = estimate_threshold(block, 1, 1, AUTO_THRESHOLD_FRACTION).unwrap();
    assert_relative_eq!(threshold, 1.4);

    let detector = SpikeDetector::build(threshold).unwrap();
    let curve = TuningCurve::build(block, recording.stimuli(), 1, &detector).unwrap();
    assert_eq!(curve.frequencies(), &[1.0, 2.0]);
    assert_eq!(curve.intensities(), &[10.0, 20.0]);
    assert_eq!(curve.get(1.0, 10.0), Some(1.0));
    assert_eq!(curve.get(2.0, 10.0), Some(2.0));
    assert_eq!(curve.get(1.0, 20.0), Some(3.0));
    assert_eq!(curve.get(2.0, 20.0), Some(4.0));

    // Channel 0 is silent everywhere: a complete grid of zeros
    let curve = TuningCurve::build(block, recording.stimuli(), 0, &detector).unwrap();
    assert!(curve.grid().iter().all(|&count| count == 0.0));

    // The tuning curve serializes for the presentation layer
    let json = serde_json::to_value(&curve).unwrap();
    assert_eq!(json["frequencies"], serde_json::json!([1.0, 2.0]));
}

#[test]
fn test_synthetic_recording_tuning_curve() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let recording = SyntheticRecording::new(vec![1_000.0, 4_000.0, 16_000.0], vec![20.0, 60.0])
        .with_repetitions(30)
        .with_noise(0.02);
    // Strong response to 4 kHz at 60 dB only
    let (block, stimuli) = recording
        .rand(
            |frequency, intensity| match frequency == 4.0 && intensity == 60.0 {
                true => 8.0,
                false => 0.5,
            },
            &mut rng,
        )
        .unwrap();

    let detector = SpikeDetector::build(0.6).unwrap();
    let curve = TuningCurve::build(&block, &stimuli, 0, &detector).unwrap();
    assert_eq!(curve.grid().shape(), (2, 3));

    let best = curve.get(4.0, 60.0).unwrap();
    assert!(best > 6.0 && best < 10.0);
    for (&frequency, &intensity) in curve.frequencies().iter().cartesian_product(curve.intensities()) {
        if (frequency, intensity) != (4.0, 60.0) {
            assert!(curve.get(frequency, intensity).unwrap() < 1.5);
        }
    }
}

#[test]
fn test_detected_spikes_invariants() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let recording = SyntheticRecording::new(vec![2_000.0], vec![40.0])
        .with_repetitions(10)
        .with_channels(2)
        .with_noise(0.3);
    let (block, _) = recording.rand(|_, _| 10.0, &mut rng).unwrap();

    // A low threshold on noisy traces: many crossings, some within the refractory period
    let detector = SpikeDetector::build(0.5).unwrap();
    for channel in 0..2 {
        let spike_trains = detect_repetitions(&block, 1, channel, &detector).unwrap();
        assert_eq!(spike_trains.len(), 10);
        assert_eq!(
            spike_trains,
            detect_repetitions(&block, 1, channel, &detector).unwrap()
        );
        for times in spike_trains.iter() {
            assert!(times
                .iter()
                .tuple_windows()
                .all(|(t1, t2)| t1 < t2 && t2 - t1 >= detector.refractory() - 1e-9));
        }
    }
}

#[test]
fn test_trace_summary_histogram_keeps_every_spike() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let recording = SyntheticRecording::new(vec![8_000.0], vec![70.0])
        .with_repetitions(12)
        .with_noise(0.0);
    let (block, _) = recording.rand(|_, _| 6.0, &mut rng).unwrap();
    let detector = SpikeDetector::build(0.5).unwrap();

    let response = summarize_trace(&block, 1, 0, &detector, 0.01).unwrap();
    assert_eq!(response.spike_counts.len(), 12);
    assert_eq!(
        response.psth.total(),
        response.spike_counts.iter().sum::<usize>()
    );
    for (count, latency) in response.spike_counts.iter().zip(response.latencies.iter()) {
        assert_eq!(*count == 0, latency.is_nan());
    }

    // A short histogram saturates into its last bin without dropping spikes
    let spike_trains = detect_repetitions(&block, 1, 0, &detector).unwrap();
    let mut psth = Psth::new(0.01, 3).unwrap();
    spike_trains
        .iter()
        .for_each(|times| psth.append(times).unwrap());
    let num_spikes = spike_trains.iter().map(|times| times.len()).sum::<usize>();
    assert_eq!(psth.total(), num_spikes);
    let late = spike_trains
        .iter()
        .flatten()
        .filter(|&&time| bin_spikes(&[time], 0.01, 3).unwrap()[0] == 2)
        .count();
    assert_eq!(psth.counts()[2], late);
}

#[test]
fn test_silent_trace_statistics() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let recording = SyntheticRecording::new(vec![1_000.0], vec![10.0])
        .with_repetitions(3)
        .with_noise(0.0);
    let (block, stimuli) = recording.rand(|_, _| 0.0, &mut rng).unwrap();
    assert!(stimuli[0].is_silence());

    let detector = SpikeDetector::build(0.5).unwrap();
    for trace in 0..2 {
        let spike_trains = detect_repetitions(&block, trace, 0, &detector).unwrap();
        for times in spike_trains.iter() {
            assert!(times.is_empty());
            assert_eq!(firing_rate(times, block.duration()), Ok(0.0));
        }
    }

    assert_eq!(
        firing_rate(&[], 0.0),
        Err(AnalysisError::DegenerateWindow(0.0))
    );
}
