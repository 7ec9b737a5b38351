//! The editing session: arrangement, history, selection and transport
//! behind one facade.
//!
//! Every mutating operation captures a snapshot before it changes anything,
//! so each one is a single undo step. Snapshots hold buffer ids, never
//! samples; the arena keeps a buffer alive for as long as live state, any
//! snapshot, the clipboard or a processed entry still names it.

mod edit;
mod processing;
mod transport;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use trackline_transport::{
    AudioArc, BufferArena, BufferId, ClipId, NullOutput, Seconds, SourceOutput, Track, TrackId,
    WaveformSummary,
};

use crate::arrangement::Arrangement;
use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus};
use crate::history::History;
use crate::playback::{PlaybackContext, PlaybackEngine};
use crate::processing::{ProcessedAudioEntry, ProcessedStore};
use crate::selection::{InOutPoints, TrackSelection};
use crate::silence::SilenceRegions;
use crate::time::{TIME_EPSILON, TimeSpan};

/// Audio most recently cut or copied.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardEntry {
    pub buffer: BufferId,
    pub waveform: Arc<WaveformSummary>,
    pub duration: Seconds,
}

/// Structural copy of everything undo restores.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    tracks: Vec<Track>,
    selection: TrackSelection,
    time_selection: Option<TimeSpan>,
    in_out: InOutPoints,
    silence: HashMap<TrackId, SilenceRegions>,
    processed: Vec<ProcessedAudioEntry>,
}

impl Snapshot {
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.tracks
            .iter()
            .flat_map(|track| track.buffers())
            .chain(self.processed.iter().map(|entry| entry.buffer))
    }
}

/// While `Restoring`, history pushes and event emission are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Live,
    Restoring,
}

#[derive(Debug, Clone, Copy)]
struct ClipDrag {
    track: TrackId,
    clip: ClipId,
}

struct EditState {
    arrangement: Arrangement,
    arena: BufferArena,
    selection: TrackSelection,
    time_selection: Option<TimeSpan>,
    in_out: InOutPoints,
    silence: HashMap<TrackId, SilenceRegions>,
    processed: ProcessedStore,
    clipboard: Option<ClipboardEntry>,
}

impl EditState {
    fn new() -> Self {
        Self {
            arrangement: Arrangement::new(),
            arena: BufferArena::new(),
            selection: TrackSelection::None,
            time_selection: None,
            in_out: InOutPoints::default(),
            silence: HashMap::new(),
            processed: ProcessedStore::default(),
            clipboard: None,
        }
    }

    fn playback_context(&self) -> PlaybackContext<'_> {
        PlaybackContext {
            arrangement: &self.arrangement,
            arena: &self.arena,
            selected: self.selection.track_id(),
            time_selection: self.time_selection,
            in_out: self.in_out,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            tracks: self.arrangement.tracks().to_vec(),
            selection: self.selection,
            time_selection: self.time_selection,
            in_out: self.in_out,
            silence: self.silence.clone(),
            processed: self.processed.entries().to_vec(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.arrangement.set_tracks(snapshot.tracks);
        self.selection = snapshot.selection;
        self.time_selection = snapshot.time_selection;
        self.in_out = snapshot.in_out;
        self.silence = snapshot.silence;
        self.processed.set_entries(snapshot.processed);
    }

    fn live_buffers(&self) -> HashSet<BufferId> {
        let mut live: HashSet<BufferId> = self
            .arrangement
            .tracks()
            .iter()
            .flat_map(|track| track.buffers())
            .collect();
        live.extend(self.processed.entries().iter().map(|entry| entry.buffer));
        live.extend(self.clipboard.iter().map(|entry| entry.buffer));
        live
    }

    /// Playhead position on `to` that plays the same audio as `time` on
    /// `from`, when the two are a silence-cut pair.
    fn remap_playhead(&self, from: TrackId, to: TrackId, time: Seconds) -> Option<Seconds> {
        let (entry, into_cut) = self.processed.entries().iter().find_map(|entry| {
            if entry.source == from && entry.output == to {
                Some((entry, true))
            } else if entry.source == to && entry.output == from {
                Some((entry, false))
            } else {
                None
            }
        })?;
        let remap = entry.remap.as_ref()?;
        let source = self.arrangement.track(entry.source)?;
        let output = self.arrangement.track(entry.output)?;
        Some(if into_cut {
            output.track_start + remap.to_cut(time - source.track_start)
        } else {
            source.track_start + remap.to_original(time - output.track_start)
        })
    }
}

pub struct Session<O = NullOutput> {
    config: EngineConfig,
    state: EditState,
    history: History<Snapshot>,
    playback: PlaybackEngine<O>,
    events: EventBus,
    mode: SessionMode,
    drag: Option<ClipDrag>,
}

impl Default for Session<NullOutput> {
    fn default() -> Self {
        Self::new(NullOutput, EngineConfig::default())
    }
}

impl<O: SourceOutput> Session<O> {
    pub fn new(output: O, config: EngineConfig) -> Self {
        Self {
            history: History::new(config.history_depth),
            config,
            state: EditState::new(),
            playback: PlaybackEngine::new(output),
            events: EventBus::default(),
            mode: SessionMode::Live,
            drag: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracks(&self) -> &[Track] {
        self.state.arrangement.tracks()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.state.arrangement.track(id)
    }

    pub fn arena(&self) -> &BufferArena {
        &self.state.arena
    }

    pub fn audio(&self, buffer: BufferId) -> Option<&AudioArc> {
        self.state.arena.get(buffer)
    }

    pub fn selection(&self) -> TrackSelection {
        self.state.selection
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.state
            .selection
            .track_id()
            .and_then(|id| self.state.arrangement.track(id))
    }

    pub fn time_selection(&self) -> Option<TimeSpan> {
        self.state.time_selection
    }

    pub fn in_out(&self) -> InOutPoints {
        self.state.in_out
    }

    pub fn silence_regions(&self, track: TrackId) -> Option<&SilenceRegions> {
        self.state.silence.get(&track)
    }

    pub fn processed_entries(&self) -> &[ProcessedAudioEntry] {
        self.state.processed.entries()
    }

    pub fn clipboard(&self) -> Option<&ClipboardEntry> {
        self.state.clipboard.as_ref()
    }

    pub fn timeline_duration(&self) -> Seconds {
        self.state.arrangement.timeline_duration()
    }

    pub fn active_region(&self) -> TimeSpan {
        self.state.arrangement.active_region()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) {
        self.events.subscribe(listener);
    }

    fn emit(&mut self, event: EngineEvent) {
        if self.mode == SessionMode::Live {
            self.events.emit(&event);
        }
    }

    fn emit_history(&mut self) {
        let event = EngineEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        };
        self.emit(event);
    }

    // History

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Record the current state as an undo step. Ignored while restoring and
    /// inside a batch, whose opening snapshot already covers the change.
    pub fn push_state(&mut self, label: &str) -> bool {
        if self.mode == SessionMode::Restoring || self.history.in_batch() {
            return false;
        }
        self.history.push(label, self.state.snapshot());
        log::debug!("history: push {label:?}");
        self.collect_garbage();
        self.emit_history();
        true
    }

    /// Group everything until the matching [`Session::end_batch`] into one
    /// undo step. Batches nest.
    pub fn begin_batch(&mut self, label: &str) {
        if self.mode == SessionMode::Restoring {
            return;
        }
        let state = &self.state;
        let opened = !self.history.in_batch();
        self.history.begin_batch(label, || state.snapshot());
        if opened {
            log::debug!("history: begin batch {label:?}");
            self.collect_garbage();
            self.emit_history();
        }
    }

    pub fn end_batch(&mut self) -> bool {
        self.history.end_batch()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn undo(&mut self) -> bool {
        if self.mode == SessionMode::Restoring {
            return false;
        }
        match self.history.undo(self.state.snapshot()) {
            Some(previous) => {
                log::debug!("history: undo");
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.mode == SessionMode::Restoring {
            return false;
        }
        match self.history.redo(self.state.snapshot()) {
            Some(next) => {
                log::debug!("history: redo");
                self.restore(next);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.mode = SessionMode::Restoring;
        self.drag = None;
        self.state.restore(snapshot);
        if let Some(id) = self.state.selection.track_id()
            && self.state.arrangement.track(id).is_none()
        {
            self.state.selection = TrackSelection::None;
        }
        self.mode = SessionMode::Live;

        self.restart_playback();
        self.emit(EngineEvent::Restored);
        self.emit_history();
    }

    /// Release buffers nothing refers to any more. Returns how many went.
    pub fn collect_garbage(&mut self) -> usize {
        let mut live = self.state.live_buffers();
        for snapshot in self.history.states() {
            live.extend(snapshot.buffers());
        }
        let released = self.state.arena.retain(|id| live.contains(&id));
        if released > 0 {
            log::debug!("released {released} unreferenced buffers");
        }
        released
    }

    // Selection

    /// Change the selected track. Moving between a source and its silence-cut
    /// output carries the playhead across the cut.
    pub fn select_track(&mut self, selection: TrackSelection) -> bool {
        if let TrackSelection::Track(id) = selection
            && self.state.arrangement.track(id).is_none()
        {
            return false;
        }
        if selection == self.state.selection {
            return false;
        }

        let previous = self.state.selection.track_id();
        self.state.selection = selection;
        if let (Some(from), Some(to)) = (previous, selection.track_id())
            && let Some(time) = self
                .state
                .remap_playhead(from, to, self.playback.current_time())
        {
            self.playback.set_time(time);
            self.emit(EngineEvent::PositionChanged(time));
        }

        self.restart_playback();
        self.emit(EngineEvent::SelectionChanged(selection));
        true
    }

    /// `None` (and no change) for an empty span.
    pub fn set_time_selection(&mut self, start: Seconds, end: Seconds) -> Option<TimeSpan> {
        let start = start.max(0.0);
        if end - start <= TIME_EPSILON {
            log::debug!("rejected empty time selection {start:.3}..{end:.3}");
            return None;
        }
        let span = TimeSpan::new(start, end);
        self.state.time_selection = Some(span);
        self.restart_playback();
        self.emit(EngineEvent::TimeSelectionChanged);
        Some(span)
    }

    pub fn clear_time_selection(&mut self) {
        if self.state.time_selection.take().is_some() {
            self.restart_playback();
            self.emit(EngineEvent::TimeSelectionChanged);
        }
    }

    pub fn set_in_point(&mut self, time: Option<Seconds>) {
        self.state.in_out.set_in(time.map(|t| t.max(0.0)));
        self.emit(EngineEvent::InOutChanged);
    }

    pub fn set_out_point(&mut self, time: Option<Seconds>) {
        self.state.in_out.set_out(time.map(|t| t.max(0.0)));
        self.emit(EngineEvent::InOutChanged);
    }

    pub fn clear_in_out(&mut self) {
        self.state.in_out.clear();
        self.emit(EngineEvent::InOutChanged);
    }
}
