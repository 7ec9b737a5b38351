use crate::{AudioArc, Seconds};

/// Number of `(min, max)` buckets in every waveform summary.
pub const WAVEFORM_BUCKETS: usize = 1000;

/// Guards bucket index math against float error at exact bucket edges.
const EDGE_EPSILON: f64 = 1e-9;

/// Fixed-size min/max overview of a span of audio, mixed down to mono.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveformSummary {
    peaks: Vec<(f32, f32)>,
}

/// One placed summary, as input to [`WaveformSummary::compose`].
#[derive(Debug, Clone, Copy)]
pub struct WaveformSpan<'a> {
    pub start: Seconds,
    pub duration: Seconds,
    pub summary: &'a WaveformSummary,
}

impl WaveformSummary {
    pub fn from_peaks(peaks: Vec<(f32, f32)>) -> Self {
        Self { peaks }
    }

    pub fn silent(buckets: usize) -> Self {
        Self {
            peaks: vec![(0.0, 0.0); buckets],
        }
    }

    /// Generate a summary over the whole buffer.
    ///
    /// ```
    /// use trackline_transport::{AudioArc, WaveformSummary};
    ///
    /// let audio = AudioArc::new(vec![0.0; 44100 * 2], 44100, 2);
    /// let waveform = WaveformSummary::from_audio(&audio, 100);
    /// assert_eq!(waveform.bucket_count(), 100);
    /// ```
    pub fn from_audio(audio: &AudioArc, buckets: usize) -> Self {
        Self::from_audio_range(audio, 0, audio.frames(), buckets)
    }

    /// Generate a summary over frames `[start, end)` of `audio`.
    ///
    /// Every summary has exactly `buckets` entries; when the range holds fewer
    /// frames than buckets, neighbouring buckets repeat the same frame.
    pub fn from_audio_range(audio: &AudioArc, start: usize, end: usize, buckets: usize) -> Self {
        let end = end.min(audio.frames());
        let start = start.min(end);
        let frames = end - start;
        let channels = audio.channels() as usize;
        let samples = audio.samples();
        let mut peaks = Vec::with_capacity(buckets);

        for bucket_idx in 0..buckets {
            if frames == 0 {
                peaks.push((0.0, 0.0));
                continue;
            }
            let bucket_start = start + bucket_idx * frames / buckets;
            let bucket_end = (start + (bucket_idx + 1) * frames / buckets)
                .max(bucket_start + 1)
                .min(end);

            let mut min_val: f32 = 0.0;
            let mut max_val: f32 = 0.0;

            for frame_idx in bucket_start..bucket_end {
                // Mix down to mono
                let frame = &samples[frame_idx * channels..(frame_idx + 1) * channels];
                let mono_sample = frame.iter().sum::<f32>() / channels as f32;
                min_val = min_val.min(mono_sample);
                max_val = max_val.max(mono_sample);
            }

            peaks.push((min_val, max_val));
        }

        Self { peaks }
    }

    pub fn peaks(&self) -> &[(f32, f32)] {
        &self.peaks
    }

    pub fn bucket_count(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Compose several placed summaries into one summary covering
    /// `[span_start, span_start + span_duration)` with `buckets` entries.
    ///
    /// Each output bucket takes the min/max over every source bucket it
    /// overlaps, so composing a single summary onto its own span at the same
    /// bucket count reproduces it exactly. Gaps between parts read as silence.
    pub fn compose(
        parts: &[WaveformSpan<'_>],
        span_start: Seconds,
        span_duration: Seconds,
        buckets: usize,
    ) -> Self {
        if span_duration <= 0.0 {
            return Self::silent(buckets);
        }
        let bucket_len = span_duration / buckets as f64;
        let mut peaks = Vec::with_capacity(buckets);

        for bucket_idx in 0..buckets {
            let t0 = span_start + bucket_idx as f64 * bucket_len;
            let t1 = t0 + bucket_len;
            let mut min_val: f32 = 0.0;
            let mut max_val: f32 = 0.0;

            for part in parts {
                let source_buckets = part.summary.bucket_count();
                if part.duration <= 0.0 || source_buckets == 0 {
                    continue;
                }
                let part_end = part.start + part.duration;
                let lo = t0.max(part.start);
                let hi = t1.min(part_end);
                if hi <= lo {
                    continue;
                }

                let scale = source_buckets as f64 / part.duration;
                let first = (((lo - part.start) * scale) + EDGE_EPSILON).floor() as usize;
                let last = (((hi - part.start) * scale) - EDGE_EPSILON).ceil() as usize;
                let first = first.min(source_buckets - 1);
                let last = last.clamp(first + 1, source_buckets);

                for &(lo_peak, hi_peak) in &part.summary.peaks[first..last] {
                    min_val = min_val.min(lo_peak);
                    max_val = max_val.max(hi_peak);
                }
            }

            peaks.push((min_val, max_val));
        }

        Self { peaks }
    }
}
