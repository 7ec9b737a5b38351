//! Shared vocabulary for the trackline crates: audio buffers, waveform
//! summaries, the track/clip data model and the service contracts the editor
//! core talks to.

mod audio;
mod model;
mod output;
mod service;
mod waveform;

pub use audio::{AudioArc, resample_audio_arc};
pub use model::{
    BufferArena, BufferId, Clip, ClipId, ProcessKind, Track, TrackId, TrackOrigin,
};
pub use output::{NullOutput, PlaybackSource, SourceOutput};
pub use service::{
    AudioDecodeService, AudioProcessingService, CleanOptions, CleanOutput, DecodedAudio,
    ExportFormat, SilenceDetection, SilenceOptions, TimeRange,
};
pub use waveform::{WAVEFORM_BUCKETS, WaveformSpan, WaveformSummary};

/// Timeline time in seconds.
pub type Seconds = f64;
