use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{AudioArc, Seconds, WaveformSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub u64);

impl ClipId {
    /// Id of the implicit clip of a track that has never been split.
    pub const IMPLICIT: ClipId = ClipId(0);
}

/// Key into a [`BufferArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Owner of every audio buffer in a session.
///
/// Tracks, clips, history snapshots and the clipboard refer to audio by
/// [`BufferId`]; the arena is the only place an [`AudioArc`] is stored, so
/// sharing a buffer is sharing an id and duplicating one means inserting a
/// new entry on purpose.
#[derive(Debug, Default)]
pub struct BufferArena {
    buffers: HashMap<BufferId, AudioArc>,
    next_id: u64,
}

impl BufferArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, audio: AudioArc) -> BufferId {
        self.next_id += 1;
        let id = BufferId(self.next_id);
        self.buffers.insert(id, audio);
        id
    }

    pub fn get(&self, id: BufferId) -> Option<&AudioArc> {
        self.buffers.get(&id)
    }

    pub fn contains(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Drop every buffer for which `keep` returns false. Returns how many were released.
    pub fn retain(&mut self, mut keep: impl FnMut(BufferId) -> bool) -> usize {
        let before = self.buffers.len();
        self.buffers.retain(|id, _| keep(*id));
        before - self.buffers.len()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

/// A contiguous placed region of audio within a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub id: ClipId,
    pub buffer: BufferId,
    pub waveform: Arc<WaveformSummary>,
    /// Absolute timeline position.
    pub clip_start: Seconds,
    pub duration: Seconds,
    /// Where in `buffer` this clip's audio begins.
    pub buffer_offset: Seconds,
}

impl Clip {
    pub fn end(&self) -> Seconds {
        self.clip_start + self.duration
    }

    /// Half-open containment: `[clip_start, end)`.
    pub fn contains(&self, time: Seconds) -> bool {
        time >= self.clip_start && time < self.end()
    }

    pub fn overlaps(&self, other: &Clip) -> bool {
        self.clip_start < other.end() && self.end() > other.clip_start
    }

    /// Offset into `buffer` for a timeline instant inside this clip.
    pub fn buffer_position(&self, time: Seconds) -> Seconds {
        self.buffer_offset + (time - self.clip_start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    Cleaned,
    SilenceCut,
}

/// How a track came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOrigin {
    /// A whole imported file; spans the full source timeline.
    Import,
    Recording,
    Paste,
    /// Extracted from another track's in/out range.
    Extract,
    Processed { source: TrackId, kind: ProcessKind },
}

/// A horizontal lane on the timeline holding one or more clips.
///
/// A track whose clip list is empty behaves as a single implicit clip over
/// `[track_start, track_start + duration)` reading `buffer` from its start.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub color: String,
    pub track_start: Seconds,
    pub duration: Seconds,
    pub muted: bool,
    pub solo: bool,
    pub volume: f32,
    pub buffer: BufferId,
    pub waveform: Arc<WaveformSummary>,
    pub source_path: Option<PathBuf>,
    pub origin: TrackOrigin,
    /// Sorted by `clip_start`.
    clips: Vec<Clip>,
}

impl Track {
    pub fn new(
        id: TrackId,
        name: String,
        buffer: BufferId,
        waveform: Arc<WaveformSummary>,
        track_start: Seconds,
        duration: Seconds,
    ) -> Self {
        Self {
            id,
            name,
            color: String::new(),
            track_start,
            duration,
            muted: false,
            solo: false,
            volume: 1.0,
            buffer,
            waveform,
            source_path: None,
            origin: TrackOrigin::Import,
            clips: Vec::new(),
        }
    }

    pub fn end(&self) -> Seconds {
        self.track_start + self.duration
    }

    /// Explicit clips only; empty for an unsplit track.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn has_explicit_clips(&self) -> bool {
        !self.clips.is_empty()
    }

    /// The implicit whole-track clip.
    pub fn implicit_clip(&self) -> Clip {
        Clip {
            id: ClipId::IMPLICIT,
            buffer: self.buffer,
            waveform: self.waveform.clone(),
            clip_start: self.track_start,
            duration: self.duration,
            buffer_offset: 0.0,
        }
    }

    /// Explicit clips, or the implicit clip when the track was never split.
    pub fn effective_clips(&self) -> Vec<Clip> {
        if self.clips.is_empty() {
            vec![self.implicit_clip()]
        } else {
            self.clips.clone()
        }
    }

    /// Replace the clip set; keeps it ordered by start.
    pub fn set_clips(&mut self, mut clips: Vec<Clip>) {
        clips.sort_by(|a, b| a.clip_start.total_cmp(&b.clip_start));
        self.clips = clips;
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.id == id)
    }

    /// Move one clip without touching track bounds. The list is re-sorted.
    pub fn move_clip(&mut self, id: ClipId, clip_start: Seconds) -> bool {
        let Some(clip) = self.clips.iter_mut().find(|clip| clip.id == id) else {
            return false;
        };
        clip.clip_start = clip_start;
        self.clips
            .sort_by(|a, b| a.clip_start.total_cmp(&b.clip_start));
        true
    }

    /// Recompute `track_start`/`duration` as the span of the explicit clips.
    pub fn recompute_bounds(&mut self) {
        if self.clips.is_empty() {
            return;
        }
        let start = self
            .clips
            .iter()
            .map(|clip| clip.clip_start)
            .fold(f64::INFINITY, f64::min);
        let end = self
            .clips
            .iter()
            .map(Clip::end)
            .fold(f64::NEG_INFINITY, f64::max);
        self.track_start = start;
        self.duration = end - start;
    }

    /// First clip sounding at `time`.
    pub fn clip_at(&self, time: Seconds) -> Option<Clip> {
        if self.clips.is_empty() {
            let clip = self.implicit_clip();
            return clip.contains(time).then_some(clip);
        }
        self.clips.iter().find(|clip| clip.contains(time)).cloned()
    }

    pub fn is_processed(&self) -> bool {
        matches!(self.origin, TrackOrigin::Processed { .. })
    }

    /// Buffers this track keeps alive.
    pub fn buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        std::iter::once(self.buffer).chain(self.clips.iter().map(|clip| clip.buffer))
    }
}
