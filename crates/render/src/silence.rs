//! Energy-based voice activity detection and silence removal.

use trackline_transport::{AudioArc, SilenceDetection, SilenceOptions, TimeRange};

/// Frames voted over when smoothing the speech/silence decision.
const SMOOTHING_WINDOW: usize = 5;
const DEFAULT_ZCR_THRESHOLD: f32 = 0.4;
const MAX_ZCR_THRESHOLD: f32 = 0.5;

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Fraction of neighbouring sample pairs that change sign.
fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

fn percentile(sorted: &[f32], fraction: f64) -> f32 {
    let idx = ((sorted.len() as f64 * fraction) as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn mono_mixdown(audio: &AudioArc) -> Vec<f32> {
    let channels = audio.channels() as usize;
    audio
        .samples()
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Split `audio` into speech and silence.
///
/// Frames overlap by half. A frame counts as speech when its RMS clears an
/// adaptive threshold placed `energy_threshold` of the way from the noise
/// floor (10th percentile) to the peak (95th percentile) and its zero
/// crossing rate stays below 1.5x the median of loud frames. Decisions are
/// smoothed by majority vote, speech is padded and merged, and silence is
/// whatever speech does not cover.
pub fn detect_silence(audio: &AudioArc, options: &SilenceOptions) -> SilenceDetection {
    let mono = mono_mixdown(audio);
    let sample_rate = audio.sample_rate() as f64;
    let total_duration = audio.duration_secs();

    let frame_size = ((options.frame_size_ms as f64 / 1000.0) * sample_rate) as usize;
    let frame_size = frame_size.max(2);
    let hop_size = (frame_size / 2).max(1);

    let mut energies = Vec::new();
    let mut zcrs = Vec::new();
    let mut times = Vec::new();
    let mut pos = 0;
    while pos + frame_size <= mono.len() {
        let frame = &mono[pos..pos + frame_size];
        energies.push(rms(frame));
        zcrs.push(zero_crossing_rate(frame));
        times.push(pos as f64 / sample_rate);
        pos += hop_size;
    }

    if energies.is_empty() {
        log::debug!("audio shorter than one analysis frame, nothing detected");
        return SilenceDetection::default();
    }

    let mut sorted = energies.clone();
    sorted.sort_by(f32::total_cmp);
    let noise_floor = percentile(&sorted, 0.1);
    let peak = percentile(&sorted, 0.95);
    let threshold = noise_floor + (peak - noise_floor) * options.energy_threshold;

    let mut loud_zcrs: Vec<f32> = energies
        .iter()
        .zip(&zcrs)
        .filter(|(energy, _)| **energy > threshold)
        .map(|(_, zcr)| *zcr)
        .collect();
    let zcr_threshold = if loud_zcrs.is_empty() {
        DEFAULT_ZCR_THRESHOLD
    } else {
        loud_zcrs.sort_by(f32::total_cmp);
        (loud_zcrs[loud_zcrs.len() / 2] * 1.5).min(MAX_ZCR_THRESHOLD)
    };

    let raw: Vec<bool> = energies
        .iter()
        .zip(&zcrs)
        .map(|(&energy, &zcr)| energy > threshold && zcr < zcr_threshold)
        .collect();

    let half = SMOOTHING_WINDOW / 2;
    let smoothed: Vec<bool> = (0..raw.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(raw.len());
            let votes = raw[start..end].iter().filter(|&&speech| speech).count();
            votes > (end - start) / 2
        })
        .collect();

    // Runs of equal decisions, dropping runs shorter than the minimum.
    let mut runs: Vec<(TimeRange, bool)> = Vec::new();
    let mut current = smoothed[0];
    let mut run_start = 0.0;
    for (i, &speech) in smoothed.iter().enumerate() {
        if speech != current {
            let time = times[i];
            if time - run_start >= options.min_segment_duration {
                runs.push((TimeRange::new(run_start, time), current));
            }
            run_start = time;
            current = speech;
        }
    }
    if total_duration - run_start >= options.min_segment_duration {
        runs.push((TimeRange::new(run_start, total_duration), current));
    }

    let mut speech_segments: Vec<TimeRange> = Vec::new();
    for (range, _) in runs.iter().filter(|(_, speech)| *speech) {
        let padded = TimeRange::new(
            (range.start - options.padding).max(0.0),
            (range.end + options.padding).min(total_duration),
        );
        match speech_segments.last_mut() {
            Some(last) if padded.start <= last.end => last.end = last.end.max(padded.end),
            _ => speech_segments.push(padded),
        }
    }

    let mut silence_segments = Vec::new();
    let mut prev_end = 0.0;
    for speech in &speech_segments {
        if speech.start > prev_end {
            silence_segments.push(TimeRange::new(prev_end, speech.start));
        }
        prev_end = speech.end;
    }
    if prev_end < total_duration {
        silence_segments.push(TimeRange::new(prev_end, total_duration));
    }

    log::debug!(
        "detected {} speech and {} silence segments over {:.2}s",
        speech_segments.len(),
        silence_segments.len(),
        total_duration
    );

    SilenceDetection {
        speech_segments,
        silence_segments,
    }
}

/// Concatenate the `keep` segments of `audio` into a new buffer.
pub fn cut_silence(audio: &AudioArc, keep: &[TimeRange]) -> AudioArc {
    let channels = audio.channels() as usize;
    let mut samples = Vec::new();
    for range in keep {
        let start = audio.frame_at(range.start);
        let end = audio.frame_at(range.end);
        if end <= start {
            continue;
        }
        samples.extend_from_slice(&audio.samples()[start * channels..end * channels]);
    }
    AudioArc::new(samples, audio.sample_rate(), audio.channels())
}
