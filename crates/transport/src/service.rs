//! Contracts for the decode and processing collaborators.
//!
//! Both services work on files: the editor hands them a path and gets paths or
//! plain data back, so an implementation is free to run out of process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{AudioArc, Seconds, WaveformSummary};

/// Result of decoding a file: planar channels plus a waveform summary.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
    pub waveform: WaveformSummary,
}

impl DecodedAudio {
    pub fn into_audio_arc(self) -> AudioArc {
        AudioArc::from_channels(self.channels, self.sample_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Seconds,
    pub end: Seconds,
}

impl TimeRange {
    pub fn new(start: Seconds, end: Seconds) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Seconds {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanOptions {
    /// Expander threshold in dBFS.
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    /// Gain applied inside silence hints, in dB.
    pub hint_attenuation_db: f32,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            threshold_db: -45.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 80.0,
            hint_attenuation_db: -30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SilenceOptions {
    /// Fraction of the way from noise floor to peak energy a frame must reach.
    pub energy_threshold: f32,
    pub min_segment_duration: Seconds,
    pub frame_size_ms: u32,
    /// Speech segments are widened by this much on both sides.
    pub padding: Seconds,
}

impl Default for SilenceOptions {
    fn default() -> Self {
        Self {
            energy_threshold: 0.01,
            min_segment_duration: 0.1,
            frame_size_ms: 30,
            padding: 0.15,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceDetection {
    pub speech_segments: Vec<TimeRange>,
    pub silence_segments: Vec<TimeRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanOutput {
    pub output_path: PathBuf,
    pub duration: Seconds,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Wav,
    Mp3,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Wav => "wav",
            ExportFormat::Mp3 => "mp3",
        }
    }
}

/// Turns a file into samples and a waveform summary.
#[allow(async_fn_in_trait)]
pub trait AudioDecodeService {
    async fn decode(&self, path: &Path, buckets: usize) -> anyhow::Result<DecodedAudio>;
}

/// Offline processing on files.
#[allow(async_fn_in_trait)]
pub trait AudioProcessingService {
    /// Clean `range` of `source`, attenuating inside `silence_hints` if given.
    async fn clean(
        &self,
        source: &Path,
        range: TimeRange,
        options: &CleanOptions,
        silence_hints: Option<&[TimeRange]>,
    ) -> anyhow::Result<CleanOutput>;

    async fn detect_silence(
        &self,
        source: &Path,
        options: &SilenceOptions,
    ) -> anyhow::Result<SilenceDetection>;

    /// Write a file holding only `keep` segments of `source`, back to back.
    async fn cut_silence(&self, source: &Path, keep: &[TimeRange]) -> anyhow::Result<PathBuf>;

    async fn export(
        &self,
        source: &Path,
        range: TimeRange,
        format: ExportFormat,
        bitrate: Option<u32>,
    ) -> anyhow::Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_audio_interleaves() {
        let decoded = DecodedAudio {
            sample_rate: 8000,
            channels: vec![vec![1.0, 2.0], vec![-1.0, -2.0]],
            waveform: WaveformSummary::default(),
        };
        let audio = decoded.into_audio_arc();
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.samples(), &[1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_silence_options_defaults() {
        let options = SilenceOptions::default();
        assert_eq!(options.frame_size_ms, 30);
        assert_eq!(options.padding, 0.15);
    }
}
