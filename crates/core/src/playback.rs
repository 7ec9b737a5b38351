//! Transport state machine and source scheduling.
//!
//! The engine does not own a clock. Whoever drives it calls
//! [`PlaybackEngine::on_frame`] once per frame with the elapsed time and the
//! token from the previous call; stopping invalidates outstanding tokens so a
//! late frame callback cannot resurrect playback.

use trackline_transport::{
    BufferArena, Clip, ClipId, PlaybackSource, Seconds, SourceOutput, TimeRange, Track, TrackId,
};

use crate::arrangement::Arrangement;
use crate::selection::InOutPoints;
use crate::time::TimeSpan;

pub const MAX_SPEED: i8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Full,
    /// The current time selection.
    Zoom,
    /// In/out points, or the full timeline if either is unset.
    InOut,
    /// Bounds of the audible tracks.
    Active,
    /// The selected processed track.
    Clip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    /// The user is dragging the playhead; `resume` restarts playback after.
    Scrubbing { resume: bool },
}

/// Handle for the next scheduled frame. Stale once playback stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken {
    generation: u64,
}

/// Everything the engine reads from the session on each call.
#[derive(Clone, Copy)]
pub struct PlaybackContext<'a> {
    pub arrangement: &'a Arrangement,
    pub arena: &'a BufferArena,
    pub selected: Option<TrackId>,
    pub time_selection: Option<TimeSpan>,
    pub in_out: InOutPoints,
}

impl<'a> PlaybackContext<'a> {
    /// The track and clip that sound at `time`: the selected track if it is
    /// audible there, else the first audible track in order.
    pub fn track_at_time(&self, time: Seconds) -> Option<(&'a Track, Clip)> {
        let arrangement: &'a Arrangement = self.arrangement;
        if let Some(selected) = self.selected {
            let hit = arrangement
                .active_tracks()
                .find(|t| t.id == selected)
                .and_then(|t| t.clip_at(time).map(|clip| (t, clip)));
            if hit.is_some() {
                return hit;
            }
        }
        arrangement
            .active_tracks()
            .find_map(|t| t.clip_at(time).map(|clip| (t, clip)))
    }

    fn full_span(&self) -> TimeSpan {
        TimeSpan::new(0.0, self.arrangement.timeline_duration())
    }
}

pub struct PlaybackEngine<O> {
    output: O,
    state: TransportState,
    current_time: Seconds,
    speed: i8,
    loop_enabled: bool,
    loop_mode: LoopMode,
    sounding: Option<(TrackId, ClipId)>,
    generation: u64,
}

/// What a call to [`PlaybackEngine::on_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Still playing; call again next frame with this token.
    Continue(FrameToken),
    /// Wrapped to the start of the loop region.
    Looped(FrameToken),
    /// Hit the region boundary and stopped.
    Ended,
    /// The token was stale or the engine is not playing.
    Ignored,
}

impl<O: SourceOutput> PlaybackEngine<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            state: TransportState::Stopped,
            current_time: 0.0,
            speed: 1,
            loop_enabled: false,
            loop_mode: LoopMode::Full,
            sounding: None,
            generation: 0,
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn current_time(&self) -> Seconds {
        self.current_time
    }

    pub fn speed(&self) -> i8 {
        self.speed
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    /// Track currently feeding the output, if any.
    pub fn sounding_track(&self) -> Option<TrackId> {
        self.sounding.map(|(track, _)| track)
    }

    /// Region playback stays inside: the loop region when looping, otherwise
    /// the bounds of the audible tracks.
    pub fn loop_region(&self, ctx: &PlaybackContext<'_>) -> TimeSpan {
        if !self.loop_enabled {
            return ctx.arrangement.active_region();
        }
        match self.loop_mode {
            LoopMode::Full => ctx.full_span(),
            LoopMode::Zoom => ctx.time_selection.unwrap_or_else(|| ctx.full_span()),
            LoopMode::InOut => ctx.in_out.span().unwrap_or_else(|| ctx.full_span()),
            LoopMode::Active => ctx.arrangement.active_region(),
            LoopMode::Clip => ctx
                .selected
                .and_then(|id| ctx.arrangement.track(id))
                .filter(|t| t.is_processed())
                .map(|t| TimeSpan::new(t.track_start, t.end()))
                .unwrap_or_else(|| ctx.full_span()),
        }
    }

    fn forward(&self) -> bool {
        self.speed > 0
    }

    fn token(&self) -> FrameToken {
        FrameToken {
            generation: self.generation,
        }
    }

    /// Start playing from the current time. A playhead outside the region is
    /// moved to the region edge playback runs away from. `None` if there is
    /// nothing to play.
    pub fn play(&mut self, ctx: &PlaybackContext<'_>) -> Option<FrameToken> {
        if self.state == TransportState::Playing {
            return Some(self.token());
        }
        let region = self.loop_region(ctx);
        if region.duration() <= 0.0 {
            log::debug!("nothing to play");
            return None;
        }
        if self.forward() {
            if self.current_time < region.start || self.current_time >= region.end {
                self.current_time = region.start;
            }
        } else if self.current_time <= region.start || self.current_time > region.end {
            self.current_time = region.end;
        }

        self.generation += 1;
        self.state = TransportState::Playing;
        self.sync_source(ctx, true);
        Some(self.token())
    }

    /// Halt playback, keeping the current time. False if already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state == TransportState::Stopped {
            return false;
        }
        self.silence();
        self.generation += 1;
        self.state = TransportState::Stopped;
        true
    }

    fn silence(&mut self) {
        if self.sounding.take().is_some() {
            self.output.stop();
        }
    }

    /// Advance by `dt` seconds of wall time.
    pub fn on_frame(&mut self, token: FrameToken, dt: Seconds, ctx: &PlaybackContext<'_>) -> FrameOutcome {
        if token != self.token() || self.state != TransportState::Playing {
            return FrameOutcome::Ignored;
        }

        let region = self.loop_region(ctx);
        let next = self.current_time + dt * self.speed as f64;
        let past_end = if self.forward() {
            next >= region.end
        } else {
            next <= region.start
        };

        if !past_end {
            self.current_time = next;
            self.sync_source(ctx, false);
            return FrameOutcome::Continue(token);
        }

        if self.loop_enabled && region.duration() > 0.0 {
            self.current_time = if self.forward() { region.start } else { region.end };
            self.sync_source(ctx, true);
            log::debug!("looped to {:.3}", self.current_time);
            return FrameOutcome::Looped(token);
        }

        self.current_time = if self.forward() { region.end } else { region.start };
        self.stop();
        FrameOutcome::Ended
    }

    /// Point the output at whatever should sound now. With `force` the
    /// source restarts even if it did not change.
    fn sync_source(&mut self, ctx: &PlaybackContext<'_>, force: bool) {
        let target = ctx.track_at_time(self.current_time);
        let key = target.as_ref().map(|(track, clip)| (track.id, clip.id));
        if !force && key == self.sounding {
            return;
        }

        self.silence();
        let Some((track, clip)) = target else {
            return;
        };
        let Some(audio) = ctx.arena.get(clip.buffer) else {
            log::warn!("{} refers to a missing buffer", track.id);
            return;
        };
        self.output.start(PlaybackSource {
            track_id: track.id,
            audio: audio.clone(),
            offset: clip.buffer_position(self.current_time),
            window: TimeRange::new(clip.buffer_offset, clip.buffer_offset + clip.duration),
            speed: self.speed as f64,
            volume: track.volume,
        });
        self.sounding = key;
    }

    /// Restart the source at the current time so it reflects changed
    /// mute/solo/selection state. No-op unless playing.
    pub fn restart_in_place(&mut self, ctx: &PlaybackContext<'_>) {
        if self.state == TransportState::Playing {
            self.sync_source(ctx, true);
        }
    }

    pub fn seek(&mut self, time: Seconds, ctx: &PlaybackContext<'_>) {
        self.current_time = time.clamp(0.0, ctx.arrangement.timeline_duration());
        self.restart_in_place(ctx);
    }

    /// Set the current time without touching the output.
    pub fn set_time(&mut self, time: Seconds) {
        self.current_time = time.max(0.0);
    }

    /// Set speed, snapping to a valid resting value. Returns the new speed.
    pub fn set_speed(&mut self, speed: i8, ctx: &PlaybackContext<'_>) -> i8 {
        let speed = match speed.clamp(-MAX_SPEED, MAX_SPEED) {
            0 => 1,
            s => s,
        };
        if speed != self.speed {
            self.speed = speed;
            self.restart_in_place(ctx);
        }
        self.speed
    }

    /// One step faster forward; from -1 this flips to 1.
    pub fn speed_up(&mut self, ctx: &PlaybackContext<'_>) -> i8 {
        let next = if self.speed == -1 { 1 } else { self.speed + 1 };
        self.set_speed(next.min(MAX_SPEED), ctx)
    }

    /// One step towards reverse; from 1 this flips to -1.
    pub fn speed_down(&mut self, ctx: &PlaybackContext<'_>) -> i8 {
        let next = if self.speed == 1 { -1 } else { self.speed - 1 };
        self.set_speed(next.max(-MAX_SPEED), ctx)
    }

    /// Move the playhead `ms` milliseconds in the playback direction,
    /// clamped to the audible region.
    pub fn nudge(&mut self, ms: f64, ctx: &PlaybackContext<'_>) -> Seconds {
        let direction = self.speed.signum() as f64;
        let region = ctx.arrangement.active_region();
        self.current_time = region.clamp(self.current_time + ms / 1000.0 * direction);
        self.restart_in_place(ctx);
        self.current_time
    }

    pub fn begin_scrub(&mut self) {
        if let TransportState::Scrubbing { .. } = self.state {
            return;
        }
        let resume = self.state == TransportState::Playing;
        self.silence();
        self.generation += 1;
        self.state = TransportState::Scrubbing { resume };
    }

    pub fn scrub_to(&mut self, time: Seconds, ctx: &PlaybackContext<'_>) {
        if let TransportState::Scrubbing { .. } = self.state {
            self.current_time = time.clamp(0.0, ctx.arrangement.timeline_duration());
        }
    }

    /// Leave scrubbing, resuming playback if it was running before.
    pub fn end_scrub(&mut self, ctx: &PlaybackContext<'_>) -> Option<FrameToken> {
        let TransportState::Scrubbing { resume } = self.state else {
            return None;
        };
        self.state = TransportState::Stopped;
        if resume { self.play(ctx) } else { None }
    }
}
