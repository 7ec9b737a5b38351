//! Pure functions for clip geometry, designed to be testable without the
//! session or the audio engine.

use std::sync::Arc;

use trackline_render::{RenderPart, render_span};
use trackline_transport::{
    AudioArc, BufferArena, BufferId, Clip, ClipId, Seconds, Track, WaveformSpan, WaveformSummary,
};

use crate::time::{TIME_EPSILON, TimeSpan};

/// A stretch of one buffer, placed relative to some reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPiece {
    pub buffer: BufferId,
    pub start: Seconds,
    pub duration: Seconds,
    /// Where in `buffer` the piece begins.
    pub offset: Seconds,
}

/// Result of cutting a range out of a track.
#[derive(Debug, Clone)]
pub struct CutPlan {
    /// Clips left on the track, already rippled. Empty means the track
    /// should be deleted.
    pub clips: Vec<Clip>,
    /// The removed audio, relative to the cut start.
    pub removed: Vec<ClipPiece>,
    /// Length of the cut range after clamping to the track.
    pub removed_duration: Seconds,
}

/// Summary for `duration` seconds of `buffer` starting at `offset`.
///
/// Falls back to silence when the buffer is gone from the arena.
pub fn piece_waveform(
    arena: &BufferArena,
    buffer: BufferId,
    offset: Seconds,
    duration: Seconds,
    buckets: usize,
) -> WaveformSummary {
    match arena.get(buffer) {
        Some(audio) => {
            let start = audio.frame_at(offset);
            let end = audio.frame_at(offset + duration);
            WaveformSummary::from_audio_range(audio, start, end, buckets)
        }
        None => WaveformSummary::silent(buckets),
    }
}

fn sub_clip(
    arena: &BufferArena,
    clip: &Clip,
    id: ClipId,
    from: Seconds,
    to: Seconds,
    place_at: Seconds,
    buckets: usize,
) -> Clip {
    let buffer_offset = clip.buffer_offset + (from - clip.clip_start);
    let duration = to - from;
    Clip {
        id,
        buffer: clip.buffer,
        waveform: Arc::new(piece_waveform(arena, clip.buffer, buffer_offset, duration, buckets)),
        clip_start: place_at,
        duration,
        buffer_offset,
    }
}

/// Cut timeline range `[in_point, out_point)` out of `track`.
///
/// The range is clamped to the track. Audio before the range stays put,
/// audio after it moves left to close the gap, and remainders shorter than
/// `min_remainder` are dropped. Buffers are shared, never copied: the
/// surviving clips point into the same buffers at new offsets.
///
/// Returns `None` when the clamped range is empty or holds no audio, as when
/// it falls in a gap between clips.
pub fn cut_region(
    arena: &BufferArena,
    track: &Track,
    in_point: Seconds,
    out_point: Seconds,
    min_remainder: Seconds,
    buckets: usize,
    mut alloc_id: impl FnMut() -> ClipId,
) -> Option<CutPlan> {
    let relative_in = (in_point - track.track_start).clamp(0.0, track.duration);
    let relative_out = (out_point - track.track_start).clamp(0.0, track.duration);
    if relative_out - relative_in <= TIME_EPSILON {
        return None;
    }
    let cut_start = track.track_start + relative_in;
    let cut_end = track.track_start + relative_out;
    let shift = cut_end - cut_start;

    let mut clips = Vec::new();
    let mut removed = Vec::new();

    for clip in track.effective_clips() {
        let implicit = clip.id == ClipId::IMPLICIT;
        let before_end = clip.end().min(cut_start);
        let has_before = before_end - clip.clip_start >= min_remainder;
        if has_before {
            let id = if implicit { alloc_id() } else { clip.id };
            clips.push(sub_clip(arena, &clip, id, clip.clip_start, before_end, clip.clip_start, buckets));
        }

        let after_start = clip.clip_start.max(cut_end);
        if clip.end() - after_start >= min_remainder {
            let id = if implicit || has_before { alloc_id() } else { clip.id };
            clips.push(sub_clip(
                arena,
                &clip,
                id,
                after_start,
                clip.end(),
                after_start - shift,
                buckets,
            ));
        }

        let inside_start = clip.clip_start.max(cut_start);
        let inside_end = clip.end().min(cut_end);
        if inside_end > inside_start {
            removed.push(ClipPiece {
                buffer: clip.buffer,
                start: inside_start - cut_start,
                duration: inside_end - inside_start,
                offset: clip.buffer_offset + (inside_start - clip.clip_start),
            });
        }
    }

    if removed.is_empty() {
        return None;
    }
    clips.sort_by(|a, b| a.clip_start.total_cmp(&b.clip_start));
    Some(CutPlan {
        clips,
        removed,
        removed_duration: shift,
    })
}

/// Pieces of `track` inside `[in_point, out_point)` clamped to the track,
/// relative to the clamped start. `None` if nothing is left after clamping.
pub fn extract_range(
    track: &Track,
    in_point: Seconds,
    out_point: Seconds,
) -> Option<(TimeSpan, Vec<ClipPiece>)> {
    let start = in_point.max(track.track_start);
    let end = out_point.min(track.end());
    if end - start <= TIME_EPSILON {
        return None;
    }
    let pieces = track
        .effective_clips()
        .iter()
        .filter_map(|clip| {
            let from = clip.clip_start.max(start);
            let to = clip.end().min(end);
            (to > from).then(|| ClipPiece {
                buffer: clip.buffer,
                start: from - start,
                duration: to - from,
                offset: clip.buffer_offset + (from - clip.clip_start),
            })
        })
        .collect();
    Some((TimeSpan::new(start, end), pieces))
}

/// The clips of `track` laid back to back, gaps dropped.
pub fn contiguous_pieces(track: &Track) -> Vec<ClipPiece> {
    let mut cursor = 0.0;
    track
        .effective_clips()
        .iter()
        .map(|clip| {
            let piece = ClipPiece {
                buffer: clip.buffer,
                start: cursor,
                duration: clip.duration,
                offset: clip.buffer_offset,
            };
            cursor += clip.duration;
            piece
        })
        .collect()
}

/// Render pieces into one new buffer `duration` long.
///
/// The output takes the sample rate of the first piece and the widest
/// channel count; gaps are silent. `None` if no piece's buffer is present.
pub fn render_pieces(arena: &BufferArena, pieces: &[ClipPiece], duration: Seconds) -> Option<AudioArc> {
    let resolved: Vec<(&AudioArc, &ClipPiece)> = pieces
        .iter()
        .filter_map(|piece| arena.get(piece.buffer).map(|audio| (audio, piece)))
        .collect();
    let (first, _) = resolved.first()?;
    let sample_rate = first.sample_rate();
    let channels = resolved.iter().map(|(audio, _)| audio.channels()).max()?;
    let parts: Vec<RenderPart<'_>> = resolved
        .iter()
        .map(|(audio, piece)| RenderPart {
            audio,
            start: piece.start,
            duration: piece.duration,
            offset: piece.offset,
        })
        .collect();
    Some(render_span(&parts, 0.0, duration, sample_rate, channels))
}

/// Outcome of [`append_audio`].
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub audio: AudioArc,
    pub channel_mismatch: bool,
}

/// Concatenate `appended` after `existing` into a new buffer.
///
/// `appended` is resampled to the rate of `existing` when they differ. The
/// result has the wider channel count; the narrower operand is silent on the
/// channels it lacks.
pub fn append_audio(existing: &AudioArc, appended: &AudioArc) -> anyhow::Result<AppendOutcome> {
    let appended = appended.resample(existing.sample_rate())?;
    let channels = existing.channels().max(appended.channels());
    let channel_mismatch = existing.channels() != appended.channels();
    let width = channels as usize;

    let mut samples = Vec::with_capacity((existing.frames() + appended.frames()) * width);
    for audio in [existing, &appended] {
        let source_channels = audio.channels() as usize;
        for frame in audio.samples().chunks_exact(source_channels) {
            samples.extend_from_slice(frame);
            samples.extend(std::iter::repeat_n(0.0, width - source_channels));
        }
    }

    Ok(AppendOutcome {
        audio: AudioArc::new(samples, existing.sample_rate(), channels),
        channel_mismatch,
    })
}

/// Where a clip of `duration` asked to start at `desired` actually lands
/// among `others` (the other clips of its track).
///
/// Without snap the position is only clamped to zero and overlap is allowed.
/// With snap the start is pulled within `threshold` of a neighbour edge,
/// preferring after-other, then before-other, then start-to-start; any
/// overlap left is resolved by moving to the closest free gap.
pub fn resolve_clip_position(
    others: &[Clip],
    desired: Seconds,
    duration: Seconds,
    snap: bool,
    threshold: Seconds,
) -> Seconds {
    let mut position = desired.max(0.0);
    if !snap || others.is_empty() {
        return position;
    }

    let closest = |target: &dyn Fn(&Clip) -> Seconds| {
        others
            .iter()
            .map(|other| target(other))
            .filter(|candidate| (candidate - position).abs() <= threshold)
            .min_by(|a, b| (a - position).abs().total_cmp(&(b - position).abs()))
    };

    if let Some(snapped) = closest(&|other| other.end())
        .or_else(|| closest(&|other| other.clip_start - duration))
        .or_else(|| closest(&|other| other.clip_start))
    {
        position = snapped.max(0.0);
    }

    let mut occupied: Vec<TimeSpan> = others
        .iter()
        .map(|other| TimeSpan::new(other.clip_start, other.end()))
        .collect();
    occupied.sort_by(|a, b| a.start.total_cmp(&b.start));

    let overlaps = occupied
        .iter()
        .any(|span| position < span.end - TIME_EPSILON && position + duration > span.start + TIME_EPSILON);
    if !overlaps {
        return position;
    }

    // Merge occupied spans, then try every gap wide enough to hold the clip.
    let mut merged: Vec<TimeSpan> = Vec::new();
    for span in occupied {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }

    let mut best = merged.last().map(|s| s.end).unwrap_or(position);
    let mut gap_start = 0.0;
    for span in merged.iter().chain(std::iter::once(&TimeSpan::new(f64::INFINITY, f64::INFINITY))) {
        let gap_end = span.start;
        if gap_end - gap_start >= duration - TIME_EPSILON {
            let candidate = position.clamp(gap_start, (gap_end - duration).max(gap_start));
            if (candidate - position).abs() < (best - position).abs() {
                best = candidate;
            }
        }
        gap_start = gap_start.max(span.end);
    }
    best.max(0.0)
}

/// Split the clip under `at` into two clips sharing its buffer.
///
/// Returns the new clip list and the id of the right-hand half, or `None`
/// if no clip covers `at` with at least `min_remainder` on both sides.
pub fn split_clip(
    arena: &BufferArena,
    track: &Track,
    at: Seconds,
    min_remainder: Seconds,
    buckets: usize,
    mut alloc_id: impl FnMut() -> ClipId,
) -> Option<(Vec<Clip>, ClipId)> {
    let target = track.clip_at(at)?;
    if at - target.clip_start < min_remainder || target.end() - at < min_remainder {
        return None;
    }

    let left_id = if target.id == ClipId::IMPLICIT {
        alloc_id()
    } else {
        target.id
    };
    let right_id = alloc_id();
    let left = sub_clip(arena, &target, left_id, target.clip_start, at, target.clip_start, buckets);
    let right = sub_clip(arena, &target, right_id, at, target.end(), at, buckets);

    let mut clips: Vec<Clip> = track
        .clips()
        .iter()
        .filter(|clip| clip.id != target.id)
        .cloned()
        .collect();
    clips.push(left);
    clips.push(right);
    clips.sort_by(|a, b| a.clip_start.total_cmp(&b.clip_start));
    Some((clips, right_id))
}

/// One summary across the whole track span, composed from its clips.
pub fn compose_track_waveform(track: &Track, buckets: usize) -> WaveformSummary {
    let clips = track.effective_clips();
    let parts: Vec<WaveformSpan<'_>> = clips
        .iter()
        .map(|clip| WaveformSpan {
            start: clip.clip_start,
            duration: clip.duration,
            summary: &clip.waveform,
        })
        .collect();
    WaveformSummary::compose(&parts, track.track_start, track.duration, buckets)
}
