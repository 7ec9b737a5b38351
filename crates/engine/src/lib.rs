//! Audio output for the playback engine.
//!
//! The editor thread owns an [`OutputHandle`] and the audio thread owns the
//! matching [`Renderer`]. Sources travel over a lock-free ring as
//! [`basedrop::Shared`] pointers, so when the audio thread drops a source the
//! buffer is reclaimed later by [`OutputHandle::collect`], never on the audio
//! thread.

use basedrop::{Collector, Handle, Shared};
use trackline_transport::{AudioArc, PlaybackSource, Seconds, SourceOutput, TimeRange, TrackId};

#[cfg(feature = "device")]
mod device;

#[cfg(feature = "device")]
pub use device::{DeviceStream, start_device};

const COMMAND_CAPACITY: usize = 64;
const STATUS_CAPACITY: usize = 64;

pub enum Command {
    Start {
        track_id: TrackId,
        audio: Shared<AudioArc>,
        offset: Seconds,
        window: TimeRange,
        speed: f64,
        volume: f32,
    },
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    /// Source position after the last rendered block.
    Position { track_id: TrackId, seconds: Seconds },
    /// The source ran off either end of its window.
    Finished { track_id: TrackId },
}

struct Voice {
    track_id: TrackId,
    audio: Shared<AudioArc>,
    /// Fractional frame index into `audio`.
    position: f64,
    /// Playable frames `[first, end)`.
    first: f64,
    end: f64,
    /// Source frames advanced per output frame.
    step: f64,
    volume: f32,
}

pub struct OutputHandle {
    commands: rtrb::Producer<Command>,
    status: rtrb::Consumer<Status>,
    collector: Collector,
    handle: Handle,
}

pub struct Renderer {
    commands: rtrb::Consumer<Command>,
    status: rtrb::Producer<Status>,
    sample_rate: u32,
    channels: u16,
    voice: Option<Voice>,
}

/// Create a connected handle/renderer pair for an output running at
/// `sample_rate` with `channels` interleaved channels.
pub fn output_channel(sample_rate: u32, channels: u16) -> (OutputHandle, Renderer) {
    let collector = Collector::new();
    let handle = collector.handle();

    let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(COMMAND_CAPACITY);
    let (status_tx, status_rx) = rtrb::RingBuffer::<Status>::new(STATUS_CAPACITY);

    (
        OutputHandle {
            commands: command_tx,
            status: status_rx,
            collector,
            handle,
        },
        Renderer {
            commands: command_rx,
            status: status_tx,
            sample_rate,
            channels: channels.max(1),
            voice: None,
        },
    )
}

impl OutputHandle {
    fn send(&mut self, command: Command) {
        if self.commands.push(command).is_err() {
            log::warn!("output command queue full, dropping command");
        }
    }

    /// Drain status messages reported by the renderer.
    pub fn poll_status(&mut self) -> Vec<Status> {
        let mut out = Vec::new();
        while let Ok(status) = self.status.pop() {
            out.push(status);
        }
        out
    }

    /// Free buffers the renderer has let go of.
    pub fn collect(&mut self) {
        self.collector.collect();
    }
}

impl SourceOutput for OutputHandle {
    fn start(&mut self, source: PlaybackSource) {
        let audio = Shared::new(&self.handle, source.audio);
        self.send(Command::Start {
            track_id: source.track_id,
            audio,
            offset: source.offset,
            window: source.window,
            speed: source.speed,
            volume: source.volume,
        });
    }

    fn stop(&mut self) {
        self.send(Command::Stop);
    }
}

impl Renderer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Fill `out` (interleaved, `channels` wide) from the current source.
    pub fn process(&mut self, out: &mut [f32]) {
        while let Ok(command) = self.commands.pop() {
            match command {
                Command::Start {
                    track_id,
                    audio,
                    offset,
                    window,
                    speed,
                    volume,
                } => {
                    let source_rate = audio.sample_rate() as f64;
                    let frames = audio.frames() as f64;
                    self.voice = Some(Voice {
                        track_id,
                        position: offset * source_rate,
                        first: (window.start * source_rate).max(0.0),
                        end: (window.end * source_rate).min(frames),
                        step: speed * source_rate / self.sample_rate as f64,
                        volume,
                        audio,
                    });
                }
                Command::Stop => self.voice = None,
            }
        }

        let output_channels = self.channels as usize;
        let mut finished = None;

        for frame in out.chunks_mut(output_channels) {
            let Some(voice) = self.voice.as_mut() else {
                frame.fill(0.0);
                continue;
            };

            if voice.position < voice.first || voice.position >= voice.end {
                finished = Some(voice.track_id);
                self.voice = None;
                frame.fill(0.0);
                continue;
            }

            let frame_idx = voice.position as usize;
            let source_channels = voice.audio.channels() as usize;
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = voice.audio.sample(frame_idx, ch % source_channels) * voice.volume;
            }
            voice.position += voice.step;
        }

        if let Some(track_id) = finished {
            let _ = self.status.push(Status::Finished { track_id });
        }
        if let Some(voice) = &self.voice {
            let _ = self.status.push(Status::Position {
                track_id: voice.track_id,
                seconds: voice.position / voice.audio.sample_rate() as f64,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(samples: Vec<f32>, rate: u32, offset: Seconds, speed: f64) -> PlaybackSource {
        PlaybackSource {
            track_id: TrackId(1),
            window: TimeRange::new(0.0, samples.len() as f64 / rate as f64),
            audio: AudioArc::new(samples, rate, 1),
            offset,
            speed,
            volume: 1.0,
        }
    }

    fn ramp() -> Vec<f32> {
        (0..10).map(|i| i as f32).collect()
    }

    #[test]
    fn test_silent_without_source() {
        let (_handle, mut renderer) = output_channel(10, 2);
        let mut out = [1.0; 4];
        renderer.process(&mut out);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_plays_from_offset() {
        let (mut handle, mut renderer) = output_channel(10, 1);
        handle.start(source(ramp(), 10, 0.2, 1.0));

        let mut out = [0.0; 4];
        renderer.process(&mut out);
        assert_eq!(out, [2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_reverse_speed_reads_backwards() {
        let (mut handle, mut renderer) = output_channel(10, 1);
        handle.start(source(ramp(), 10, 0.5, -1.0));

        let mut out = [0.0; 4];
        renderer.process(&mut out);
        assert_eq!(out, [5.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_speed_and_rate_scale_step() {
        let (mut handle, mut renderer) = output_channel(10, 1);
        handle.start(source(ramp(), 20, 0.0, 1.0));

        let mut out = [0.0; 3];
        renderer.process(&mut out);
        assert_eq!(out, [0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_mono_source_fills_all_channels() {
        let (mut handle, mut renderer) = output_channel(10, 2);
        let mut src = source(ramp(), 10, 0.1, 1.0);
        src.volume = 0.5;
        handle.start(src);

        let mut out = [0.0; 4];
        renderer.process(&mut out);
        assert_eq!(out, [0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_stop_silences_and_reports_finish_at_end() {
        let (mut handle, mut renderer) = output_channel(10, 1);
        handle.start(source(ramp(), 10, 0.8, 1.0));

        let mut out = [0.0; 4];
        renderer.process(&mut out);
        assert_eq!(out, [8.0, 9.0, 0.0, 0.0]);
        assert!(handle
            .poll_status()
            .contains(&Status::Finished { track_id: TrackId(1) }));

        handle.start(source(ramp(), 10, 0.0, 1.0));
        handle.stop();
        renderer.process(&mut out);
        assert_eq!(out, [0.0; 4]);
        handle.collect();
    }

    #[test]
    fn test_window_end_silences_shared_buffer() {
        let (mut handle, mut renderer) = output_channel(10, 1);
        let mut src = source(ramp(), 10, 0.2, 1.0);
        src.window = TimeRange::new(0.0, 0.5);
        handle.start(src);

        let mut out = [9.0; 5];
        renderer.process(&mut out);
        assert_eq!(out, [2.0, 3.0, 4.0, 0.0, 0.0]);
        assert!(handle
            .poll_status()
            .contains(&Status::Finished { track_id: TrackId(1) }));
    }

    #[test]
    fn test_window_start_bounds_reverse_play() {
        let (mut handle, mut renderer) = output_channel(10, 1);
        let mut src = source(ramp(), 10, 0.7, -1.0);
        src.window = TimeRange::new(0.5, 1.0);
        handle.start(src);

        let mut out = [9.0; 4];
        renderer.process(&mut out);
        assert_eq!(out, [7.0, 6.0, 5.0, 0.0]);
    }

    #[test]
    fn test_reports_position() {
        let (mut handle, mut renderer) = output_channel(10, 1);
        handle.start(source(ramp(), 10, 0.0, 1.0));
        let mut out = [0.0; 5];
        renderer.process(&mut out);

        let status = handle.poll_status();
        assert_eq!(
            status.last(),
            Some(&Status::Position {
                track_id: TrackId(1),
                seconds: 0.5
            })
        );
    }
}
