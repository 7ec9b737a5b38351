use trackline_transport::{AudioArc, CleanOptions, TimeRange};

/// Downward expander: attenuates gradually below the threshold instead of gating.
#[derive(Debug, Clone)]
pub struct DownwardExpander {
    threshold_linear: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl DownwardExpander {
    pub fn new(sample_rate: f32, threshold_db: f32, ratio: f32, attack_ms: f32, release_ms: f32) -> Self {
        let attack_samples = (attack_ms * sample_rate / 1000.0).max(1.0);
        let release_samples = (release_ms * sample_rate / 1000.0).max(1.0);
        Self {
            threshold_linear: db_to_gain(threshold_db),
            ratio: ratio.max(1.0),
            attack_coeff: (-2.2 / attack_samples).exp(),
            release_coeff: (-2.2 / release_samples).exp(),
            envelope: 0.0,
        }
    }

    pub fn from_options(sample_rate: u32, options: &CleanOptions) -> Self {
        Self::new(
            sample_rate as f32,
            options.threshold_db,
            options.ratio,
            options.attack_ms,
            options.release_ms,
        )
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample *= self.next_gain(sample.abs());
        }
    }

    fn next_gain(&mut self, input_abs: f32) -> f32 {
        let coeff = if input_abs > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = self.envelope * coeff + input_abs * (1.0 - coeff);

        if self.envelope > 0.0 && self.envelope < self.threshold_linear {
            let db_below = 20.0 * (self.envelope / self.threshold_linear).log10();
            db_to_gain(db_below * (1.0 - 1.0 / self.ratio))
        } else {
            1.0
        }
    }
}

fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Clean `range` of `audio` into a new buffer.
///
/// Each channel runs through its own [`DownwardExpander`]; samples inside any
/// of `silence_hints` (source time) are further attenuated by
/// `hint_attenuation_db`.
pub fn clean(
    audio: &AudioArc,
    range: TimeRange,
    options: &CleanOptions,
    silence_hints: Option<&[TimeRange]>,
) -> AudioArc {
    let start = audio.frame_at(range.start);
    let end = audio.frame_at(range.end);
    let slice = audio.slice_frames(start, end);
    let channels = slice.channels() as usize;
    let rate = slice.sample_rate() as f64;

    let mut samples = slice.samples().to_vec();
    let mut expanders = vec![DownwardExpander::from_options(slice.sample_rate(), options); channels];
    let hint_gain = db_to_gain(options.hint_attenuation_db);
    let hints = silence_hints.unwrap_or(&[]);

    for (frame_idx, frame) in samples.chunks_exact_mut(channels).enumerate() {
        let t = range.start + frame_idx as f64 / rate;
        let in_hint = hints.iter().any(|hint| t >= hint.start && t < hint.end);
        for (sample, expander) in frame.iter_mut().zip(expanders.iter_mut()) {
            *sample *= expander.next_gain(sample.abs());
            if in_hint {
                *sample *= hint_gain;
            }
        }
    }

    log::debug!(
        "cleaned {:.3}s..{:.3}s ({} hints)",
        range.start,
        range.end,
        hints.len()
    );
    AudioArc::new(samples, slice.sample_rate(), slice.channels())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum()
    }

    #[test]
    fn test_loud_signal_passes() {
        let mut expander = DownwardExpander::new(44100.0, -40.0, 2.0, 5.0, 50.0);
        let mut samples: Vec<f32> = (0..1000).map(|i| 0.5 * (i as f32 * 0.1).sin()).collect();
        let before = energy(&samples);
        expander.process(&mut samples);
        assert!(energy(&samples) > before * 0.8);
    }

    #[test]
    fn test_quiet_signal_is_reduced() {
        let mut expander = DownwardExpander::new(44100.0, -20.0, 4.0, 1.0, 50.0);
        let mut samples: Vec<f32> = (0..1000).map(|i| 0.001 * (i as f32 * 0.1).sin()).collect();
        let before = energy(&samples);
        expander.process(&mut samples);
        assert!(energy(&samples) < before);
    }

    #[test]
    fn test_clean_returns_only_range() {
        let audio = AudioArc::new(vec![0.5; 2000], 1000, 2);
        let cleaned = clean(
            &audio,
            TimeRange::new(0.25, 0.75),
            &CleanOptions::default(),
            None,
        );
        assert_eq!(cleaned.frames(), 500);
        assert_eq!(cleaned.channels(), 2);
    }

    #[test]
    fn test_silence_hints_attenuate() {
        let audio = AudioArc::new(vec![0.5; 1000], 1000, 1);
        let hints = [TimeRange::new(0.5, 1.0)];
        let cleaned = clean(
            &audio,
            TimeRange::new(0.0, 1.0),
            &CleanOptions::default(),
            Some(&hints),
        );
        let head = energy(&cleaned.samples()[100..500]);
        let tail = energy(&cleaned.samples()[500..900]);
        assert!(tail < head * 0.01);
    }
}
