use trackline_transport::{Seconds, SourceOutput};

use super::Session;
use crate::events::EngineEvent;
use crate::playback::{FrameOutcome, FrameToken, LoopMode, PlaybackEngine, TransportState};
use crate::time::TimeSpan;

impl<O: SourceOutput> Session<O> {
    pub fn playback(&self) -> &PlaybackEngine<O> {
        &self.playback
    }

    pub fn output_mut(&mut self) -> &mut O {
        self.playback.output_mut()
    }

    pub fn current_time(&self) -> Seconds {
        self.playback.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn transport_state(&self) -> TransportState {
        self.playback.state()
    }

    pub fn speed(&self) -> i8 {
        self.playback.speed()
    }

    pub(super) fn restart_playback(&mut self) {
        self.playback.restart_in_place(&self.state.playback_context());
    }

    fn emit_transport(&mut self, before: TransportState) {
        let after = self.playback.state();
        if after != before {
            self.emit(EngineEvent::TransportChanged(after));
        }
    }

    /// Start playback. The returned token drives [`Session::on_frame`].
    pub fn play(&mut self) -> Option<FrameToken> {
        let before = self.playback.state();
        let token = self.playback.play(&self.state.playback_context());
        self.emit_transport(before);
        token
    }

    pub fn stop(&mut self) -> bool {
        let stopped = self.playback.stop();
        if stopped {
            self.emit(EngineEvent::TransportChanged(TransportState::Stopped));
        }
        stopped
    }

    pub fn toggle_playback(&mut self) -> Option<FrameToken> {
        if self.playback.is_playing() {
            self.stop();
            None
        } else {
            self.play()
        }
    }

    /// Advance playback by `dt` seconds. Call once per frame while the
    /// outcome carries a token.
    pub fn on_frame(&mut self, token: FrameToken, dt: Seconds) -> FrameOutcome {
        let outcome = self
            .playback
            .on_frame(token, dt, &self.state.playback_context());
        match outcome {
            FrameOutcome::Ignored => {}
            FrameOutcome::Continue(_) | FrameOutcome::Looped(_) => {
                self.emit(EngineEvent::PositionChanged(self.playback.current_time()));
            }
            FrameOutcome::Ended => {
                self.emit(EngineEvent::PositionChanged(self.playback.current_time()));
                self.emit(EngineEvent::TransportChanged(TransportState::Stopped));
            }
        }
        outcome
    }

    pub fn seek(&mut self, time: Seconds) {
        self.playback.seek(time, &self.state.playback_context());
        self.emit(EngineEvent::PositionChanged(self.playback.current_time()));
    }

    fn emit_speed(&mut self, before: i8) -> i8 {
        let speed = self.playback.speed();
        if speed != before {
            self.emit(EngineEvent::SpeedChanged(speed));
        }
        speed
    }

    pub fn set_speed(&mut self, speed: i8) -> i8 {
        let before = self.playback.speed();
        self.playback.set_speed(speed, &self.state.playback_context());
        self.emit_speed(before)
    }

    pub fn speed_up(&mut self) -> i8 {
        let before = self.playback.speed();
        self.playback.speed_up(&self.state.playback_context());
        self.emit_speed(before)
    }

    pub fn speed_down(&mut self) -> i8 {
        let before = self.playback.speed();
        self.playback.speed_down(&self.state.playback_context());
        self.emit_speed(before)
    }

    /// Nudge by `ms` in the playback direction.
    pub fn nudge(&mut self, ms: f64) -> Seconds {
        let time = self.playback.nudge(ms, &self.state.playback_context());
        self.emit(EngineEvent::PositionChanged(time));
        time
    }

    /// Nudge by the configured step.
    pub fn nudge_step(&mut self) -> Seconds {
        self.nudge(self.config.nudge_ms)
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.playback.set_loop_enabled(enabled);
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.playback.set_loop_mode(mode);
    }

    pub fn loop_region(&self) -> TimeSpan {
        self.playback.loop_region(&self.state.playback_context())
    }

    pub fn begin_scrub(&mut self) {
        let before = self.playback.state();
        self.playback.begin_scrub();
        self.emit_transport(before);
    }

    pub fn scrub_to(&mut self, time: Seconds) {
        self.playback.scrub_to(time, &self.state.playback_context());
        self.emit(EngineEvent::PositionChanged(self.playback.current_time()));
    }

    pub fn end_scrub(&mut self) -> Option<FrameToken> {
        let before = self.playback.state();
        let token = self.playback.end_scrub(&self.state.playback_context());
        self.emit_transport(before);
        token
    }
}
