use std::path::PathBuf;
use std::sync::Arc;

use trackline_transport::{
    AudioArc, Clip, ClipId, Seconds, SourceOutput, TrackId, TrackOrigin, WaveformSummary,
};

use super::{ClipDrag, ClipboardEntry, Session};
use crate::clip_ops::{self, ClipPiece};
use crate::error::EditError;
use crate::events::EngineEvent;
use crate::selection::TrackSelection;
use crate::silence::RegionId;
use crate::time::TIME_EPSILON;

impl<O: SourceOutput> Session<O> {
    // Tracks

    /// Add a track holding `audio`. One undo step.
    pub fn create_track(
        &mut self,
        audio: AudioArc,
        name: impl Into<String>,
        start: Seconds,
        source_path: Option<PathBuf>,
    ) -> TrackId {
        self.push_state("Add track");
        let waveform = WaveformSummary::from_audio(&audio, self.config.waveform_buckets);
        self.insert_track(audio, waveform, name.into(), start, source_path, TrackOrigin::Import)
    }

    /// Put `audio` in the arena and a track on it. Callers push history.
    pub(super) fn insert_track(
        &mut self,
        audio: AudioArc,
        waveform: WaveformSummary,
        name: String,
        start: Seconds,
        source_path: Option<PathBuf>,
        origin: TrackOrigin,
    ) -> TrackId {
        let duration = audio.duration_secs();
        let buffer = self.state.arena.insert(audio);
        let arrangement = &mut self.state.arrangement;
        let id = arrangement.create_track(buffer, Arc::new(waveform), name, start, duration, source_path);
        arrangement.set_origin(id, origin);
        arrangement.set_volume(id, self.config.default_volume);
        log::info!("created {id}: {duration:.3}s at {start:.3}s");
        self.emit(EngineEvent::TrackAdded(id));
        id
    }

    pub fn delete_track(&mut self, id: TrackId) -> bool {
        if self.state.arrangement.track(id).is_none() {
            return false;
        }
        self.push_state("Delete track");
        self.remove_track(id);
        self.restart_playback();
        true
    }

    fn remove_track(&mut self, id: TrackId) {
        if self.state.arrangement.delete_track(id).is_none() {
            return;
        }
        self.state.silence.remove(&id);
        self.state.processed.forget_track(id);
        if self.drag.is_some_and(|drag| drag.track == id) {
            self.drag = None;
        }
        log::info!("deleted {id}");
        self.emit(EngineEvent::TrackRemoved(id));
        if self.state.selection == TrackSelection::Track(id) {
            self.state.selection = TrackSelection::None;
            self.emit(EngineEvent::SelectionChanged(TrackSelection::None));
        }
    }

    pub fn set_track_muted(&mut self, id: TrackId, muted: bool) -> bool {
        if self.track(id).is_none_or(|track| track.muted == muted) {
            return false;
        }
        self.push_state(if muted { "Mute" } else { "Unmute" });
        self.state.arrangement.set_muted(id, muted);
        self.restart_playback();
        self.emit(EngineEvent::TrackChanged(id));
        true
    }

    /// Solo is exclusive; every track whose flag flips gets an event.
    pub fn set_track_solo(&mut self, id: TrackId, solo: bool) -> bool {
        if self.track(id).is_none_or(|track| track.solo == solo) {
            return false;
        }
        self.push_state(if solo { "Solo" } else { "Unsolo" });
        let before: Vec<(TrackId, bool)> = self.tracks().iter().map(|t| (t.id, t.solo)).collect();
        self.state.arrangement.set_solo(id, solo);
        self.restart_playback();
        for (track, was_solo) in before {
            if self.track(track).is_some_and(|t| t.solo != was_solo) {
                self.emit(EngineEvent::TrackChanged(track));
            }
        }
        true
    }

    pub fn set_track_volume(&mut self, id: TrackId, volume: f32) -> bool {
        if self.track(id).is_none() {
            return false;
        }
        self.push_state("Volume");
        self.state.arrangement.set_volume(id, volume);
        self.restart_playback();
        self.emit(EngineEvent::TrackChanged(id));
        true
    }

    pub fn set_track_name(&mut self, id: TrackId, name: impl Into<String>) -> bool {
        if self.track(id).is_none() {
            return false;
        }
        self.push_state("Rename");
        self.state.arrangement.set_name(id, name);
        self.emit(EngineEvent::TrackChanged(id));
        true
    }

    pub fn reorder_tracks(&mut self, from: usize, to: usize) -> bool {
        let len = self.tracks().len();
        if from >= len || to >= len || from == to {
            return false;
        }
        self.push_state("Reorder tracks");
        self.state.arrangement.reorder(from, to);
        self.restart_playback();
        self.emit(EngineEvent::TracksReordered);
        true
    }

    // Clipboard

    /// Cut `[in_point, out_point)` out of a track, rippling later audio left.
    /// The removed audio becomes the clipboard. Cutting the whole track
    /// deletes it.
    pub fn cut_region(
        &mut self,
        id: TrackId,
        in_point: Seconds,
        out_point: Seconds,
    ) -> Option<ClipboardEntry> {
        let track = self.track(id)?.clone();
        let arrangement = &mut self.state.arrangement;
        let Some(plan) = clip_ops::cut_region(
            &self.state.arena,
            &track,
            in_point,
            out_point,
            self.config.min_remainder,
            self.config.waveform_buckets,
            || arrangement.alloc_clip_id(),
        ) else {
            log::debug!("rejected cut {in_point:.3}..{out_point:.3} on {id}");
            return None;
        };

        self.push_state("Cut");
        let clipboard = self.fill_clipboard(&plan.removed, plan.removed_duration);
        if plan.clips.is_empty() {
            self.remove_track(id);
        } else {
            if let Some(track) = self.state.arrangement.track_mut(id) {
                track.set_clips(plan.clips);
                track.recompute_bounds();
            }
            self.emit(EngineEvent::TrackChanged(id));
        }
        self.restart_playback();
        clipboard
    }

    /// Copy `[in_point, out_point)` of a track to the clipboard.
    pub fn copy_region(
        &mut self,
        id: TrackId,
        in_point: Seconds,
        out_point: Seconds,
    ) -> Option<ClipboardEntry> {
        let (span, pieces) = clip_ops::extract_range(self.track(id)?, in_point, out_point)?;
        self.fill_clipboard(&pieces, span.duration())
    }

    fn fill_clipboard(&mut self, pieces: &[ClipPiece], duration: Seconds) -> Option<ClipboardEntry> {
        let audio = clip_ops::render_pieces(&self.state.arena, pieces, duration)?;
        let waveform = Arc::new(WaveformSummary::from_audio(&audio, self.config.waveform_buckets));
        let entry = ClipboardEntry {
            buffer: self.state.arena.insert(audio),
            waveform,
            duration,
        };
        self.state.clipboard = Some(entry.clone());
        self.emit(EngineEvent::ClipboardChanged);
        Some(entry)
    }

    /// New track holding a fresh copy of the clipboard, at `at` or the
    /// playhead.
    pub fn paste(&mut self, at: Option<Seconds>) -> Option<TrackId> {
        let entry = self.state.clipboard.clone()?;
        let audio = self.state.arena.get(entry.buffer)?;
        let copy = AudioArc::new(audio.samples().to_vec(), audio.sample_rate(), audio.channels());
        let at = at.unwrap_or_else(|| self.playback.current_time());
        let name = format!("Clip {}", self.tracks().len() + 1);

        self.push_state("Paste");
        Some(self.insert_track(
            copy,
            (*entry.waveform).clone(),
            name,
            at,
            None,
            TrackOrigin::Paste,
        ))
    }

    /// Replace a track's audio with itself followed by `audio`. Returns true
    /// when the channel counts differed and the narrower side was padded.
    pub fn append_to_track(&mut self, id: TrackId, audio: &AudioArc) -> Result<bool, EditError> {
        let track = self.track(id).ok_or(EditError::TrackNotFound(id))?;
        let existing = if track.has_explicit_clips() {
            clip_ops::extract_range(track, track.track_start, track.end()).and_then(
                |(span, pieces)| clip_ops::render_pieces(&self.state.arena, &pieces, span.duration()),
            )
        } else {
            self.state.arena.get(track.buffer).cloned()
        }
        .ok_or_else(|| anyhow::anyhow!("{id} has no audio to append to"))?;

        let outcome = clip_ops::append_audio(&existing, audio)?;
        if outcome.channel_mismatch {
            log::warn!(
                "appending {} channel(s) onto {} channel(s) of {id}; missing channels are silent",
                audio.channels(),
                existing.channels()
            );
        }
        let waveform = WaveformSummary::from_audio(&outcome.audio, self.config.waveform_buckets);
        let duration = outcome.audio.duration_secs();

        self.push_state("Append");
        let buffer = self.state.arena.insert(outcome.audio);
        if let Some(track) = self.state.arrangement.track_mut(id) {
            track.buffer = buffer;
            track.waveform = Arc::new(waveform);
            track.set_clips(Vec::new());
            track.duration = duration;
        }
        self.restart_playback();
        self.emit(EngineEvent::TrackChanged(id));
        Ok(outcome.channel_mismatch)
    }

    /// New track from the in/out range of `source` (or the time selection
    /// when in/out is unset), placed at the start of that range.
    pub fn create_clip_from_selection(&mut self, source: TrackId) -> Option<TrackId> {
        let range = self.state.in_out.span().or(self.state.time_selection)?;
        let track = self.track(source)?;
        let name = format!("{} clip", track.name);
        let Some((span, pieces)) = clip_ops::extract_range(track, range.start, range.end) else {
            log::debug!("selection {:.3}..{:.3} misses {source}", range.start, range.end);
            return None;
        };
        let audio = clip_ops::render_pieces(&self.state.arena, &pieces, span.duration())?;
        let waveform = WaveformSummary::from_audio(&audio, self.config.waveform_buckets);

        self.push_state("Create clip");
        Some(self.insert_track(audio, waveform, name, span.start, None, TrackOrigin::Extract))
    }

    // Clips

    /// Split the clip under `at` in two. Returns the id of the right half.
    pub fn split_clip(&mut self, id: TrackId, at: Seconds) -> Option<ClipId> {
        let track = self.track(id)?.clone();
        let arrangement = &mut self.state.arrangement;
        let (clips, right) = clip_ops::split_clip(
            &self.state.arena,
            &track,
            at,
            self.config.min_remainder,
            self.config.waveform_buckets,
            || arrangement.alloc_clip_id(),
        )?;

        self.push_state("Split");
        if let Some(track) = self.state.arrangement.track_mut(id) {
            track.set_clips(clips);
        }
        self.emit(EngineEvent::TrackChanged(id));
        Some(right)
    }

    fn is_clip_of(&self, track: TrackId, clip: ClipId) -> bool {
        self.track(track).is_some_and(|t| {
            (clip == ClipId::IMPLICIT && !t.has_explicit_clips()) || t.clip(clip).is_some()
        })
    }

    /// Turn the implicit clip into an explicit one so it can move on its
    /// own. Explicit ids pass through.
    fn materialize_clip(&mut self, track: TrackId, clip: ClipId) -> Option<ClipId> {
        let has_explicit = self.track(track)?.has_explicit_clips();
        if clip != ClipId::IMPLICIT || has_explicit {
            return Some(clip);
        }
        let id = self.state.arrangement.alloc_clip_id();
        let track = self.state.arrangement.track_mut(track)?;
        let materialized = Clip {
            id,
            ..track.implicit_clip()
        };
        track.set_clips(vec![materialized]);
        Some(id)
    }

    fn resolve_position(&self, track: TrackId, clip: ClipId, desired: Seconds, snap: bool) -> Option<Seconds> {
        let track = self.track(track)?;
        let moving = if clip == ClipId::IMPLICIT && !track.has_explicit_clips() {
            track.implicit_clip()
        } else {
            track.clip(clip)?.clone()
        };
        let others: Vec<Clip> = track
            .clips()
            .iter()
            .filter(|other| other.id != moving.id)
            .cloned()
            .collect();
        Some(clip_ops::resolve_clip_position(
            &others,
            desired,
            moving.duration,
            snap,
            self.config.snap_threshold,
        ))
    }

    /// Move one clip and finalize the track. Returns where it landed.
    pub fn set_clip_start(
        &mut self,
        track: TrackId,
        clip: ClipId,
        desired: Seconds,
        snap: bool,
    ) -> Option<Seconds> {
        let position = self.resolve_position(track, clip, desired, snap)?;
        self.push_state("Move clip");
        let clip = self.materialize_clip(track, clip)?;
        let moved = self.state.arrangement.track_mut(track)?;
        moved.move_clip(clip, position);
        moved.recompute_bounds();
        self.restart_playback();
        self.emit(EngineEvent::TrackChanged(track));
        Some(position)
    }

    /// Start dragging a clip. The whole drag is one undo step. Returns the
    /// id being dragged, which differs from `clip` for an implicit clip.
    pub fn begin_clip_drag(&mut self, track: TrackId, clip: ClipId) -> Option<ClipId> {
        if !self.is_clip_of(track, clip) {
            return None;
        }
        self.push_state("Move clip");
        let clip = self.materialize_clip(track, clip)?;
        self.drag = Some(ClipDrag { track, clip });
        Some(clip)
    }

    /// Move the dragged clip. Track bounds stay put until the drag ends.
    pub fn drag_clip(&mut self, desired: Seconds, snap: bool) -> Option<Seconds> {
        let drag = self.drag?;
        let position = self.resolve_position(drag.track, drag.clip, desired, snap)?;
        self.state
            .arrangement
            .track_mut(drag.track)?
            .move_clip(drag.clip, position);
        self.emit(EngineEvent::TrackChanged(drag.track));
        Some(position)
    }

    pub fn end_clip_drag(&mut self) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        if !self.state.arrangement.finalize(drag.track) {
            return false;
        }
        self.restart_playback();
        self.emit(EngineEvent::TrackChanged(drag.track));
        true
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Recompute track bounds from its clips.
    pub fn finalize_track(&mut self, id: TrackId) -> bool {
        if !self.state.arrangement.finalize(id) {
            return false;
        }
        self.emit(EngineEvent::TrackChanged(id));
        true
    }

    pub fn compose_track_waveform(&self, id: TrackId) -> Option<WaveformSummary> {
        self.track(id)
            .map(|track| clip_ops::compose_track_waveform(track, self.config.waveform_buckets))
    }

    // Silence regions

    pub fn add_silence_region(&mut self, track: TrackId, start: Seconds, end: Seconds) -> Option<RegionId> {
        self.track(track)?;
        if end - start.max(0.0) <= TIME_EPSILON {
            log::debug!("rejected empty silence region {start:.3}..{end:.3}");
            return None;
        }
        self.push_state("Add silence region");
        let id = self.state.silence.entry(track).or_default().add(start, end);
        self.emit(EngineEvent::SilenceRegionsChanged(track));
        id
    }

    pub fn set_silence_region_enabled(&mut self, track: TrackId, region: RegionId, enabled: bool) -> bool {
        let unchanged = self
            .state
            .silence
            .get(&track)
            .and_then(|regions| regions.get(region))
            .is_none_or(|r| r.enabled == enabled);
        if unchanged {
            return false;
        }
        self.push_state(if enabled { "Enable silence region" } else { "Disable silence region" });
        if let Some(regions) = self.state.silence.get_mut(&track) {
            regions.set_enabled(region, enabled);
        }
        self.emit(EngineEvent::SilenceRegionsChanged(track));
        true
    }

    pub fn remove_silence_region(&mut self, track: TrackId, region: RegionId) -> bool {
        let exists = self
            .state
            .silence
            .get(&track)
            .is_some_and(|regions| regions.get(region).is_some());
        if !exists {
            return false;
        }
        self.push_state("Remove silence region");
        if let Some(regions) = self.state.silence.get_mut(&track) {
            regions.remove(region);
        }
        self.emit(EngineEvent::SilenceRegionsChanged(track));
        true
    }

    pub fn clear_silence_regions(&mut self, track: TrackId) -> bool {
        if self.state.silence.get(&track).is_none_or(|regions| regions.is_empty()) {
            return false;
        }
        self.push_state("Clear silence regions");
        self.state.silence.remove(&track);
        self.emit(EngineEvent::SilenceRegionsChanged(track));
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::session::Session;
    use crate::test_support::constant;
    use approx::assert_relative_eq;
    use trackline_transport::{AudioArc, ClipId, TrackId, TrackOrigin};

    /// Ten seconds of mono at 100 Hz where each sample holds its own time.
    fn ramp() -> AudioArc {
        AudioArc::new((0..1000).map(|i| i as f32 / 100.0).collect(), 100, 1)
    }

    #[test]
    fn test_cut_ripples_and_fills_clipboard() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);

        let clipboard = session.cut_region(id, 3.0, 5.0).unwrap();
        assert_relative_eq!(clipboard.duration, 2.0);
        let removed = session.audio(clipboard.buffer).unwrap();
        assert_relative_eq!(removed.sample(0, 0), 3.0);

        let track = session.track(id).unwrap();
        let clips = track.clips();
        assert_eq!(clips.len(), 2);
        assert_relative_eq!(clips[1].clip_start, 3.0);
        assert_relative_eq!(clips[1].buffer_offset, 5.0);
        assert_relative_eq!(track.duration, 8.0);
        assert_relative_eq!(session.timeline_duration(), 8.0);
    }

    #[test]
    fn test_cut_whole_track_deletes_it() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 2.0, None);
        assert!(session.cut_region(id, 0.0, 20.0).is_some());
        assert!(session.track(id).is_none());
        assert!(session.clipboard().is_some());
    }

    #[test]
    fn test_cut_outside_track_is_noop() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        assert!(session.cut_region(id, 12.0, 14.0).is_none());
        assert!(session.cut_region(id, 5.0, 5.0).is_none());
        assert!(session.cut_region(TrackId(42), 0.0, 1.0).is_none());
        assert_eq!(session.undo_label(), Some("Add track"));
    }

    #[test]
    fn test_cut_in_gap_leaves_track_and_history_alone() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        let right = session.split_clip(id, 5.0).unwrap();
        session.set_clip_start(id, right, 8.0, false).unwrap();
        let label = session.undo_label().map(str::to_owned);

        assert!(session.cut_region(id, 6.0, 7.0).is_none());
        assert_relative_eq!(session.track(id).unwrap().duration, 13.0);
        assert_eq!(session.undo_label().map(str::to_owned), label);
        assert!(session.clipboard().is_none());
    }

    #[test]
    fn test_copy_then_paste_makes_independent_buffer() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        let entry = session.copy_region(id, 1.0, 2.0).unwrap();
        assert_eq!(session.track(id).unwrap().duration, 10.0);

        let pasted = session.paste(Some(20.0)).unwrap();
        let track = session.track(pasted).unwrap();
        assert_eq!(track.origin, TrackOrigin::Paste);
        assert_relative_eq!(track.track_start, 20.0);
        assert_relative_eq!(track.duration, 1.0);
        assert_ne!(track.buffer, entry.buffer);
        let copy = session.audio(track.buffer).unwrap();
        assert!(!copy.ptr_eq(session.audio(entry.buffer).unwrap()));
        assert_relative_eq!(copy.sample(0, 0), 1.0);
    }

    #[test]
    fn test_paste_defaults_to_playhead() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        session.copy_region(id, 0.0, 1.0).unwrap();
        session.seek(4.0);
        let pasted = session.paste(None).unwrap();
        assert_relative_eq!(session.track(pasted).unwrap().track_start, 4.0);
    }

    #[test]
    fn test_append_pads_channels_and_reports_mismatch() {
        let mut session = Session::default();
        let id = session.create_track(constant(0.5, 100, 1), "A", 0.0, None);
        let mismatch = session.append_to_track(id, &constant(0.25, 100, 2)).unwrap();
        assert!(mismatch);

        let track = session.track(id).unwrap();
        assert_relative_eq!(track.duration, 2.0);
        let audio = session.audio(track.buffer).unwrap();
        assert_eq!(audio.channels(), 2);
        assert_relative_eq!(audio.sample(0, 1), 0.0);
        assert_relative_eq!(audio.sample(150, 1), 0.25);
    }

    #[test]
    fn test_append_to_missing_track_fails() {
        let mut session = Session::default();
        let err = session.append_to_track(TrackId(5), &constant(0.1, 10, 1)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::State);
    }

    #[test]
    fn test_create_clip_from_in_out() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "Voice", 1.0, None);
        session.set_in_point(Some(0.0));
        session.set_out_point(Some(3.0));

        let clip = session.create_clip_from_selection(id).unwrap();
        let track = session.track(clip).unwrap();
        assert_eq!(track.name, "Voice clip");
        assert_relative_eq!(track.track_start, 1.0);
        assert_relative_eq!(track.duration, 2.0);
        assert_eq!(track.origin, TrackOrigin::Extract);
    }

    #[test]
    fn test_create_clip_outside_track_is_rejected() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "Voice", 0.0, None);
        session.set_in_point(Some(11.0));
        session.set_out_point(Some(12.0));
        assert!(session.create_clip_from_selection(id).is_none());
        assert_eq!(session.tracks().len(), 1);
    }

    #[test]
    fn test_drag_keeps_bounds_until_end() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        let right = session.split_clip(id, 5.0).unwrap();

        assert_eq!(session.begin_clip_drag(id, right), Some(right));
        session.drag_clip(12.0, false).unwrap();
        assert_relative_eq!(session.track(id).unwrap().duration, 10.0);

        assert!(session.end_clip_drag());
        assert_relative_eq!(session.track(id).unwrap().duration, 17.0);
        assert!(!session.is_dragging());

        assert!(session.undo());
        assert_relative_eq!(session.track(id).unwrap().duration, 10.0);
        assert_relative_eq!(session.track(id).unwrap().clips()[1].clip_start, 5.0);
    }

    #[test]
    fn test_drag_implicit_clip_materializes_it() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        let clip = session.begin_clip_drag(id, ClipId::IMPLICIT).unwrap();
        assert_ne!(clip, ClipId::IMPLICIT);
        session.drag_clip(3.0, true);
        session.end_clip_drag();
        assert_relative_eq!(session.track(id).unwrap().track_start, 3.0);
    }

    #[test]
    fn test_set_clip_start_snaps_against_neighbour() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        let right = session.split_clip(id, 5.0).unwrap();
        session.set_clip_start(id, right, 12.0, false).unwrap();

        let landed = session.set_clip_start(id, right, 4.0, true).unwrap();
        let track = session.track(id).unwrap();
        let clips = track.clips();
        assert!(clips[0].end() <= clips[1].clip_start + 1e-9);
        assert_relative_eq!(landed, 5.0);
        assert_relative_eq!(track.duration, 10.0);
    }

    #[test]
    fn test_silence_region_lifecycle() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        let region = session.add_silence_region(id, 1.0, 2.0).unwrap();
        assert!(session.add_silence_region(id, 3.0, 3.0).is_none());
        assert!(session.set_silence_region_enabled(id, region, false));
        assert!(!session.set_silence_region_enabled(id, region, false));
        assert_eq!(session.silence_regions(id).unwrap().regions().len(), 1);
        assert!(session.remove_silence_region(id, region));
        assert!(session.silence_regions(id).unwrap().is_empty());

        session.undo();
        assert_eq!(session.silence_regions(id).unwrap().regions().len(), 1);
    }

    #[test]
    fn test_solo_is_exclusive() {
        let mut session = Session::default();
        let a = session.create_track(ramp(), "A", 0.0, None);
        let b = session.create_track(ramp(), "B", 0.0, None);
        session.set_track_solo(a, true);
        session.set_track_solo(b, true);
        let soloed: Vec<TrackId> = session.tracks().iter().filter(|t| t.solo).map(|t| t.id).collect();
        assert_eq!(soloed, vec![b]);
    }

    #[test]
    fn test_delete_selected_track_clears_selection() {
        let mut session = Session::default();
        let id = session.create_track(ramp(), "A", 0.0, None);
        session.select_track(crate::TrackSelection::Track(id));
        assert!(session.delete_track(id));
        assert_eq!(session.selection(), crate::TrackSelection::None);
        assert!(!session.delete_track(id));
    }
}
