//! Offline rendering and processing of audio buffers.

use std::path::Path;

use trackline_transport::{AudioArc, Seconds};

mod clean;
mod mp3;
mod processor;
mod silence;

pub use clean::{DownwardExpander, clean};
pub use mp3::{DEFAULT_MP3_BITRATE, write_mp3};
pub use processor::LocalProcessor;
pub use silence::{cut_silence, detect_silence};

/// One placed piece of audio for [`render_span`].
#[derive(Debug, Clone, Copy)]
pub struct RenderPart<'a> {
    pub audio: &'a AudioArc,
    /// Timeline position of the first rendered frame.
    pub start: Seconds,
    pub duration: Seconds,
    /// Where in `audio` rendering begins.
    pub offset: Seconds,
}

/// Render `[start, end)` of a timeline made of `parts` into one new buffer.
///
/// Parts are summed where they overlap; gaps render as silence. Narrower parts
/// repeat their channels round-robin across the output channels.
pub fn render_span(
    parts: &[RenderPart<'_>],
    start: Seconds,
    end: Seconds,
    sample_rate: u32,
    channels: u16,
) -> AudioArc {
    let output_channels = channels.max(1) as usize;
    let total_frames = ((end - start).max(0.0) * sample_rate as f64).round() as usize;
    let mut samples = vec![0.0f32; total_frames * output_channels];

    for part in parts {
        let part_channels = part.audio.channels() as usize;
        let source = part.audio.samples();
        let source_frames = part.audio.frames();
        let rate = part.audio.sample_rate() as f64;

        let first = (((part.start - start) * sample_rate as f64).round().max(0.0)) as usize;
        let last = (((part.start + part.duration - start) * sample_rate as f64).round() as usize)
            .min(total_frames);

        for frame_idx in first..last {
            let t = start + frame_idx as f64 / sample_rate as f64;
            let source_frame = ((t - part.start + part.offset) * rate).round();
            if source_frame < 0.0 {
                continue;
            }
            let source_frame = source_frame as usize;
            if source_frame >= source_frames {
                break;
            }
            for ch in 0..output_channels {
                let src_idx = source_frame * part_channels + ch % part_channels;
                samples[frame_idx * output_channels + ch] += source[src_idx];
            }
        }
    }

    AudioArc::new(samples, sample_rate, output_channels as u16)
}

pub fn write_wav(audio: &AudioArc, path: &Path) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels(),
        sample_rate: audio.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;

    for &sample in audio.samples() {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    log::debug!("wrote {} ({:.3}s)", path.display(), audio.duration_secs());
    Ok(())
}
