//! Test doubles for the output and the two services.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use trackline_transport::{
    AudioArc, AudioDecodeService, AudioProcessingService, CleanOptions, CleanOutput, DecodedAudio,
    ExportFormat, PlaybackSource, Seconds, SilenceDetection, SilenceOptions, SourceOutput,
    TimeRange, TrackId, WaveformSummary,
};

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Start {
        track_id: TrackId,
        offset: Seconds,
        speed: f64,
    },
    Stop,
}

#[derive(Debug, Default)]
pub struct RecordingOutput {
    pub calls: Vec<OutputCall>,
    pub current: Option<PlaybackSource>,
}

impl SourceOutput for RecordingOutput {
    fn start(&mut self, source: PlaybackSource) {
        self.calls.push(OutputCall::Start {
            track_id: source.track_id,
            offset: source.offset,
            speed: source.speed,
        });
        self.current = Some(source);
    }

    fn stop(&mut self) {
        self.calls.push(OutputCall::Stop);
        self.current = None;
    }
}

/// `frames` of a constant `value` at 100 Hz.
pub fn constant(value: f32, frames: usize, channels: u16) -> AudioArc {
    AudioArc::new(vec![value; frames * channels as usize], 100, channels)
}

/// Serves audio registered per path.
#[derive(Default)]
pub struct ScriptedDecoder {
    files: HashMap<PathBuf, AudioArc>,
}

impl ScriptedDecoder {
    pub fn with_file(mut self, path: impl Into<PathBuf>, audio: AudioArc) -> Self {
        self.files.insert(path.into(), audio);
        self
    }
}

impl AudioDecodeService for ScriptedDecoder {
    async fn decode(&self, path: &Path, buckets: usize) -> anyhow::Result<DecodedAudio> {
        let audio = self
            .files
            .get(path)
            .ok_or_else(|| anyhow!("no such file: {}", path.display()))?;
        Ok(DecodedAudio {
            sample_rate: audio.sample_rate(),
            channels: (0..audio.channels() as usize)
                .map(|c| audio.channel(c).collect())
                .collect(),
            waveform: WaveformSummary::from_audio(audio, buckets),
        })
    }
}

/// Returns canned results and records what it was asked.
#[derive(Default)]
pub struct ScriptedProcessor {
    pub detection: SilenceDetection,
    pub fail: bool,
    pub calls: RefCell<Vec<String>>,
    pub keep_requests: RefCell<Vec<Vec<TimeRange>>>,
}

impl ScriptedProcessor {
    fn record(&self, call: &str) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(call.to_string());
        if self.fail {
            bail!("{call} failed");
        }
        Ok(())
    }
}

impl AudioProcessingService for ScriptedProcessor {
    async fn clean(
        &self,
        _source: &Path,
        range: TimeRange,
        _options: &CleanOptions,
        _silence_hints: Option<&[TimeRange]>,
    ) -> anyhow::Result<CleanOutput> {
        self.record("clean")?;
        Ok(CleanOutput {
            output_path: PathBuf::from("clean.wav"),
            duration: range.duration(),
            sample_rate: 100,
        })
    }

    async fn detect_silence(
        &self,
        _source: &Path,
        _options: &SilenceOptions,
    ) -> anyhow::Result<SilenceDetection> {
        self.record("detect_silence")?;
        Ok(self.detection.clone())
    }

    async fn cut_silence(&self, _source: &Path, keep: &[TimeRange]) -> anyhow::Result<PathBuf> {
        self.record("cut_silence")?;
        self.keep_requests.borrow_mut().push(keep.to_vec());
        Ok(PathBuf::from("cut.wav"))
    }

    async fn export(
        &self,
        _source: &Path,
        _range: TimeRange,
        format: ExportFormat,
        _bitrate: Option<u32>,
    ) -> anyhow::Result<PathBuf> {
        self.record("export")?;
        Ok(PathBuf::from(format!("export.{}", format.extension())))
    }
}
