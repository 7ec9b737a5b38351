//! Tracks on the shared timeline and the geometry questions asked of them.

use std::path::PathBuf;
use std::sync::Arc;

use trackline_transport::{
    BufferId, ClipId, Seconds, Track, TrackId, TrackOrigin, WaveformSummary,
};

use crate::time::TimeSpan;

const TRACK_COLORS: [&str; 8] = [
    "#e8a33d", "#4fa3d1", "#7cc46a", "#d9534f", "#a779d6", "#3fbfad", "#e07ab8", "#b5b84a",
];

/// The ordered set of tracks plus id allocation.
///
/// Id counters only ever grow, so ids handed out before an undo are never
/// reused after it.
#[derive(Debug, Default)]
pub struct Arrangement {
    tracks: Vec<Track>,
    next_track_id: u64,
    next_clip_id: u64,
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Replace every track, e.g. when restoring a snapshot.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    pub fn alloc_clip_id(&mut self) -> ClipId {
        self.next_clip_id += 1;
        ClipId(self.next_clip_id)
    }

    pub fn create_track(
        &mut self,
        buffer: BufferId,
        waveform: Arc<WaveformSummary>,
        name: impl Into<String>,
        start: Seconds,
        duration: Seconds,
        source_path: Option<PathBuf>,
    ) -> TrackId {
        self.next_track_id += 1;
        let id = TrackId(self.next_track_id);
        let mut track = Track::new(id, name.into(), buffer, waveform, start.max(0.0), duration);
        track.color = TRACK_COLORS[(self.next_track_id as usize - 1) % TRACK_COLORS.len()].to_string();
        track.source_path = source_path;
        self.tracks.push(track);
        id
    }

    pub fn delete_track(&mut self, id: TrackId) -> Option<Track> {
        let index = self.index_of(id)?;
        Some(self.tracks.remove(index))
    }

    pub fn set_muted(&mut self, id: TrackId, muted: bool) -> bool {
        match self.track_mut(id) {
            Some(track) => {
                track.muted = muted;
                true
            }
            None => false,
        }
    }

    /// Solo is exclusive: enabling it on one track clears it everywhere else.
    pub fn set_solo(&mut self, id: TrackId, solo: bool) -> bool {
        if self.track(id).is_none() {
            return false;
        }
        for track in &mut self.tracks {
            if track.id == id {
                track.solo = solo;
            } else if solo {
                track.solo = false;
            }
        }
        true
    }

    pub fn set_volume(&mut self, id: TrackId, volume: f32) -> bool {
        match self.track_mut(id) {
            Some(track) => {
                track.volume = volume.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    pub fn set_name(&mut self, id: TrackId, name: impl Into<String>) -> bool {
        match self.track_mut(id) {
            Some(track) => {
                track.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn set_origin(&mut self, id: TrackId, origin: TrackOrigin) -> bool {
        match self.track_mut(id) {
            Some(track) => {
                track.origin = origin;
                true
            }
            None => false,
        }
    }

    /// Move the track at `from` so it ends up at index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tracks.len() || to >= self.tracks.len() || from == to {
            return false;
        }
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        true
    }

    /// Recompute track bounds from its clips.
    pub fn finalize(&mut self, id: TrackId) -> bool {
        match self.track_mut(id) {
            Some(track) => {
                track.recompute_bounds();
                true
            }
            None => false,
        }
    }

    /// End of the last track, `0.0` when empty.
    pub fn timeline_duration(&self) -> Seconds {
        self.tracks.iter().map(Track::end).fold(0.0, f64::max)
    }

    /// Tracks that would be heard: the soloed ones if any solo is set,
    /// otherwise all; muted tracks never.
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        let any_solo = self.tracks.iter().any(|t| t.solo);
        self.tracks
            .iter()
            .filter(move |t| !t.muted && (!any_solo || t.solo))
    }

    /// Union bounds of the active tracks; the whole timeline if an imported
    /// (full-length) track is among them or nothing is active.
    pub fn active_region(&self) -> TimeSpan {
        let full = TimeSpan::new(0.0, self.timeline_duration());
        let mut region: Option<TimeSpan> = None;
        for track in self.active_tracks() {
            if track.origin == TrackOrigin::Import {
                return full;
            }
            let span = TimeSpan::new(track.track_start, track.end());
            region = Some(match region {
                Some(r) => r.union(&span),
                None => span,
            });
        }
        region.unwrap_or(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrangement_with(spans: &[(Seconds, Seconds)]) -> (Arrangement, Vec<TrackId>) {
        let mut arrangement = Arrangement::new();
        let ids = spans
            .iter()
            .enumerate()
            .map(|(i, &(start, duration))| {
                arrangement.create_track(
                    BufferId(i as u64 + 1),
                    Arc::new(WaveformSummary::silent(4)),
                    format!("Track {}", i + 1),
                    start,
                    duration,
                    None,
                )
            })
            .collect();
        (arrangement, ids)
    }

    #[test]
    fn test_timeline_duration() {
        let (arrangement, _) = arrangement_with(&[(0.0, 4.0), (3.0, 5.0)]);
        assert_eq!(arrangement.timeline_duration(), 8.0);
        assert_eq!(Arrangement::new().timeline_duration(), 0.0);
    }

    #[test]
    fn test_solo_is_exclusive() {
        let (mut arrangement, ids) = arrangement_with(&[(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)]);
        arrangement.set_solo(ids[0], true);
        arrangement.set_solo(ids[2], true);

        let soloed: Vec<_> = arrangement.tracks().iter().filter(|t| t.solo).map(|t| t.id).collect();
        assert_eq!(soloed, vec![ids[2]]);

        arrangement.set_solo(ids[2], false);
        assert!(arrangement.tracks().iter().all(|t| !t.solo));
    }

    #[test]
    fn test_active_tracks_respect_mute_and_solo() {
        let (mut arrangement, ids) = arrangement_with(&[(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)]);
        arrangement.set_muted(ids[1], true);
        let active: Vec<_> = arrangement.active_tracks().map(|t| t.id).collect();
        assert_eq!(active, vec![ids[0], ids[2]]);

        arrangement.set_solo(ids[1], true);
        assert_eq!(arrangement.active_tracks().count(), 0);

        arrangement.set_solo(ids[2], true);
        let active: Vec<_> = arrangement.active_tracks().map(|t| t.id).collect();
        assert_eq!(active, vec![ids[2]]);
    }

    #[test]
    fn test_active_region_unions_non_import_tracks() {
        let (mut arrangement, ids) = arrangement_with(&[(1.0, 2.0), (5.0, 1.0), (0.0, 10.0)]);
        for id in &ids {
            arrangement.set_origin(*id, TrackOrigin::Paste);
        }
        arrangement.set_muted(ids[2], true);
        assert_eq!(arrangement.active_region(), TimeSpan::new(1.0, 6.0));

        arrangement.set_origin(ids[0], TrackOrigin::Import);
        assert_eq!(arrangement.active_region(), TimeSpan::new(0.0, 10.0));
    }

    #[test]
    fn test_reorder() {
        let (mut arrangement, ids) = arrangement_with(&[(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)]);
        assert!(arrangement.reorder(0, 2));
        let order: Vec<_> = arrangement.tracks().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![ids[1], ids[2], ids[0]]);
        assert!(!arrangement.reorder(0, 3));
    }

    #[test]
    fn test_volume_is_clamped() {
        let (mut arrangement, ids) = arrangement_with(&[(0.0, 1.0)]);
        arrangement.set_volume(ids[0], 1.7);
        assert_eq!(arrangement.track(ids[0]).unwrap().volume, 1.0);
        assert!(!arrangement.set_volume(TrackId(99), 0.5));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let (mut arrangement, ids) = arrangement_with(&[(0.0, 1.0)]);
        arrangement.delete_track(ids[0]);
        let again = arrangement.create_track(
            BufferId(9),
            Arc::new(WaveformSummary::silent(1)),
            "Again",
            0.0,
            1.0,
            None,
        );
        assert_ne!(again, ids[0]);
    }
}
