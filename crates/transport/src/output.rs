use crate::{AudioArc, Seconds, TimeRange, TrackId};

/// What the playback engine asks an output to render.
#[derive(Debug, Clone)]
pub struct PlaybackSource {
    pub track_id: TrackId,
    pub audio: AudioArc,
    /// Position in `audio` to start from.
    pub offset: Seconds,
    /// Part of `audio` that belongs to the clip. Nothing outside it sounds,
    /// even when the buffer is shared with audio cut from the timeline.
    pub window: TimeRange,
    /// Signed; negative plays backwards.
    pub speed: f64,
    pub volume: f32,
}

/// Something that can sound one source at a time.
///
/// Starting a new source replaces the old one; the playback engine always
/// calls `stop` before switching, but implementations must not rely on it.
pub trait SourceOutput {
    fn start(&mut self, source: PlaybackSource);
    fn stop(&mut self);
}

/// Discards everything. Used for headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl SourceOutput for NullOutput {
    fn start(&mut self, _source: PlaybackSource) {}
    fn stop(&mut self) {}
}
