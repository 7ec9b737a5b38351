use std::fmt;
use std::sync::Arc;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::Seconds;

/// Decoded, interleaved audio held behind a shared slice.
///
/// A track, its clips, any undo snapshot and the clipboard may all name the
/// same recording; they share one allocation. New sample memory is only
/// produced by `slice_frames`, `resample` and `from_channels`.
///
/// ```
/// use trackline_transport::AudioArc;
///
/// let take = AudioArc::new(vec![0.0, 0.5, 1.0, 0.5], 44100, 2);
/// let shared = take.clone();
/// assert!(take.ptr_eq(&shared));
/// assert_eq!(shared.frames(), 2);
/// ```
#[derive(Clone)]
pub struct AudioArc {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioArc {
    /// Wrap interleaved samples.
    ///
    /// # Panics
    ///
    /// If `channels` is zero or the sample count is not a whole number of frames.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self::from_arc(samples.into(), sample_rate, channels)
    }

    /// Same as [`AudioArc::new`] but reuses an existing allocation.
    pub fn from_arc(samples: Arc<[f32]>, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channels must be greater than 0");
        assert!(
            samples.len() % usize::from(channels) == 0,
            "samples.len() must be divisible by channels"
        );
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Interleave per-channel vectors. Short channels are padded with zeros,
    /// and no channels at all gives an empty mono buffer.
    ///
    /// ```
    /// use trackline_transport::AudioArc;
    ///
    /// let audio = AudioArc::from_channels(vec![vec![1.0, 2.0], vec![3.0]], 8000);
    /// assert_eq!(audio.samples(), &[1.0, 3.0, 2.0, 0.0]);
    /// ```
    pub fn from_channels(planar: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        if planar.is_empty() {
            return Self::new(Vec::new(), sample_rate, 1);
        }
        let frames = planar.iter().map(Vec::len).max().unwrap_or(0);
        let samples = (0..frames)
            .flat_map(|frame| {
                planar
                    .iter()
                    .map(move |ch| ch.get(frame).copied().unwrap_or(0.0))
            })
            .collect();
        Self::new(samples, sample_rate, planar.len() as u16)
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_arc(&self) -> &Arc<[f32]> {
        &self.samples
    }

    /// Identity, not content: two decodes of one file are not `ptr_eq`.
    #[inline]
    pub fn ptr_eq(&self, other: &AudioArc) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Interleaved sample count.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> Seconds {
        match self.sample_rate {
            0 => 0.0,
            rate => self.frames() as f64 / f64::from(rate),
        }
    }

    /// Nearest frame to `seconds`, clamped to `[0, frames]`.
    pub fn frame_at(&self, seconds: Seconds) -> usize {
        if seconds <= 0.0 {
            0
        } else {
            ((seconds * f64::from(self.sample_rate)).round() as usize).min(self.frames())
        }
    }

    /// One sample; zero past the end or on a missing channel.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let width = usize::from(self.channels);
        if channel >= width {
            return 0.0;
        }
        self.samples
            .get(frame * width + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Walk one channel.
    ///
    /// # Panics
    ///
    /// If `channel` is out of range.
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        let width = usize::from(self.channels);
        assert!(channel < width, "channel index out of bounds");
        self.samples.iter().skip(channel).step_by(width).copied()
    }

    /// Owned copy of frames `[start, end)`, clamped to the buffer.
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioArc {
        let width = usize::from(self.channels);
        let start = start.min(self.frames());
        let end = end.clamp(start, self.frames());
        AudioArc::new(
            self.samples[start * width..end * width].to_vec(),
            self.sample_rate,
            self.channels,
        )
    }

    /// Convert to `target_sample_rate`. A matching rate hands back a shared clone.
    pub fn resample(&self, target_sample_rate: u32) -> anyhow::Result<Self> {
        resample_audio_arc(self, target_sample_rate)
    }
}

impl fmt::Debug for AudioArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioArc")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_secs", &self.duration_secs())
            .finish()
    }
}

/// Band-limited sample rate conversion through rubato's sinc resampler.
pub fn resample_audio_arc(audio: &AudioArc, target_sample_rate: u32) -> anyhow::Result<AudioArc> {
    if audio.sample_rate == target_sample_rate {
        return Ok(audio.clone());
    }
    if audio.is_empty() {
        return Ok(AudioArc::new(Vec::new(), target_sample_rate, audio.channels));
    }

    let width = usize::from(audio.channels);
    let ratio = f64::from(target_sample_rate) / f64::from(audio.sample_rate);
    let planar: Vec<Vec<f32>> = (0..width).map(|ch| audio.channel(ch).collect()).collect();

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, audio.frames(), width)?;
    let converted = resampler.process(&planar, None)?;

    Ok(AudioArc::from_channels(converted, target_sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn tone(hz: f32, sample_rate: u32, seconds: f32, channels: u16) -> AudioArc {
        let frames = (sample_rate as f32 * seconds) as usize;
        let samples = (0..frames)
            .flat_map(|i| {
                let value = (TAU * hz * i as f32 / sample_rate as f32).sin();
                std::iter::repeat_n(value, channels as usize)
            })
            .collect();
        AudioArc::new(samples, sample_rate, channels)
    }

    #[test]
    fn test_shape_accessors() {
        let audio = AudioArc::new(vec![0.0, 0.1, 0.2, 0.3], 44100, 2);
        assert_eq!(audio.sample_rate(), 44100);
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.frames(), 2);
        assert_eq!(audio.len(), 4);
        assert!(!audio.is_empty());
    }

    #[test]
    #[should_panic(expected = "channels must be greater than 0")]
    fn test_rejects_zero_channels() {
        AudioArc::new(vec![0.0], 44100, 0);
    }

    #[test]
    #[should_panic(expected = "samples.len() must be divisible by channels")]
    fn test_rejects_partial_frame() {
        AudioArc::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], 44100, 2);
    }

    #[test]
    fn test_clones_share_samples() {
        let audio = AudioArc::new(vec![0.0; 1024], 44100, 2);
        let other = audio.clone();
        assert!(audio.ptr_eq(&other));
        assert_eq!(Arc::strong_count(audio.samples_arc()), 2);
    }

    #[test]
    fn test_equal_content_is_not_identity() {
        let a = AudioArc::new(vec![0.5; 8], 44100, 2);
        let b = AudioArc::new(vec![0.5; 8], 44100, 2);
        assert_eq!(a.samples(), b.samples());
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_from_channels_pads_short_channel() {
        let audio = AudioArc::from_channels(vec![vec![0.1, 0.2, 0.3], vec![0.9]], 48000);
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.frames(), 3);
        assert_eq!(audio.samples(), &[0.1, 0.9, 0.2, 0.0, 0.3, 0.0]);
    }

    #[test]
    fn test_frame_at_clamps() {
        let audio = AudioArc::new(vec![0.0; 1000], 1000, 1);
        assert_eq!(audio.frame_at(-1.0), 0);
        assert_eq!(audio.frame_at(0.25), 250);
        assert_eq!(audio.frame_at(5.0), 1000);
    }

    #[test]
    fn test_sample_out_of_range_is_silence() {
        let audio = AudioArc::new(vec![1.0, 2.0], 44100, 2);
        assert_eq!(audio.sample(0, 1), 2.0);
        assert_eq!(audio.sample(1, 0), 0.0);
        assert_eq!(audio.sample(0, 5), 0.0);
    }

    #[test]
    fn test_slice_frames_copies() {
        let audio = AudioArc::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 44100, 2);
        let slice = audio.slice_frames(1, 10);
        assert_eq!(slice.samples(), &[2.0, 3.0, 4.0, 5.0]);
        assert!(!slice.ptr_eq(&audio));
    }

    #[test]
    fn test_channel_walks_one_lane() {
        let audio = AudioArc::new(vec![0.0, 1.0, 0.5, 1.5, 0.25, 1.25], 44100, 2);

        let left: Vec<f32> = audio.channel(0).collect();
        assert_eq!(left, vec![0.0, 0.5, 0.25]);

        let right: Vec<f32> = audio.channel(1).collect();
        assert_eq!(right, vec![1.0, 1.5, 1.25]);
    }

    #[test]
    fn test_resample_same_rate_shares() {
        let audio = tone(440.0, 44100, 0.1, 2);
        let resampled = audio.resample(44100).unwrap();

        assert!(resampled.ptr_eq(&audio));
        assert_eq!(Arc::strong_count(audio.samples_arc()), 2);
    }

    #[test]
    fn test_resample_up_to_48k() {
        let audio = tone(440.0, 44100, 0.1, 2);
        let original_frames = audio.frames();

        let resampled = audio.resample(48000).unwrap();

        assert_eq!(resampled.sample_rate(), 48000);
        assert_eq!(resampled.channels(), 2);

        let expected_frames = (original_frames as f64 * 48000.0 / 44100.0) as usize;
        let tolerance = (expected_frames as f64 * 0.03) as i32;
        assert!(
            (resampled.frames() as i32 - expected_frames as i32).abs() <= tolerance,
            "expected ~{} frames, got {}",
            expected_frames,
            resampled.frames()
        );
        assert_eq!(Arc::strong_count(resampled.samples_arc()), 1);
    }

    #[test]
    fn test_debug_format() {
        let audio = AudioArc::new(vec![0.0; 44100], 44100, 1);
        let debug_str = format!("{audio:?}");

        assert!(debug_str.contains("AudioArc"));
        assert!(debug_str.contains("duration_secs"));
    }
}
