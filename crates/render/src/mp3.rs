use std::mem::MaybeUninit;
use std::path::Path;

use anyhow::{Context, anyhow};
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, Quality};
use trackline_transport::AudioArc;

/// Used when the caller does not ask for a bitrate.
pub const DEFAULT_MP3_BITRATE: u32 = 192;

/// Nearest LAME bitrate at or above `kbps`, capped at 320.
fn lame_bitrate(kbps: u32) -> Bitrate {
    match kbps {
        0..=32 => Bitrate::Kbps32,
        33..=40 => Bitrate::Kbps40,
        41..=48 => Bitrate::Kbps48,
        49..=64 => Bitrate::Kbps64,
        65..=80 => Bitrate::Kbps80,
        81..=96 => Bitrate::Kbps96,
        97..=112 => Bitrate::Kbps112,
        113..=128 => Bitrate::Kbps128,
        129..=160 => Bitrate::Kbps160,
        161..=192 => Bitrate::Kbps192,
        193..=224 => Bitrate::Kbps224,
        225..=256 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

/// Interleaved stereo i16 for LAME. Mono is doubled onto both sides and
/// channels past the second are dropped.
fn stereo_pcm(audio: &AudioArc) -> Vec<i16> {
    let channels = audio.channels() as usize;
    let mut pcm = Vec::with_capacity(audio.frames() * 2);
    for frame in 0..audio.frames() {
        let left = audio.sample(frame, 0);
        let right = if channels > 1 { audio.sample(frame, 1) } else { left };
        for sample in [left, right] {
            pcm.push((sample.clamp(-1.0, 1.0) * 32767.0) as i16);
        }
    }
    pcm
}

/// Encode `audio` as constant-bitrate MP3 at `path`.
pub fn write_mp3(audio: &AudioArc, path: &Path, bitrate: Option<u32>) -> anyhow::Result<()> {
    let kbps = bitrate.unwrap_or(DEFAULT_MP3_BITRATE);
    if audio.channels() > 2 {
        log::warn!(
            "MP3 holds at most two channels; dropping {} of {}",
            audio.channels() - 2,
            audio.channels()
        );
    }

    let mut builder = Builder::new().ok_or_else(|| anyhow!("cannot create LAME encoder"))?;
    builder
        .set_num_channels(2)
        .map_err(|e| anyhow!("invalid channel count: {e:?}"))?;
    builder
        .set_sample_rate(audio.sample_rate())
        .map_err(|e| anyhow!("unsupported MP3 sample rate {}: {e:?}", audio.sample_rate()))?;
    builder
        .set_brate(lame_bitrate(kbps))
        .map_err(|e| anyhow!("invalid bitrate {kbps}: {e:?}"))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| anyhow!("invalid quality: {e:?}"))?;
    let mut encoder = builder
        .build()
        .map_err(|e| anyhow!("cannot build LAME encoder: {e:?}"))?;

    let pcm = stereo_pcm(audio);
    let mut buffer = vec![MaybeUninit::<u8>::uninit(); pcm.len() * 5 / 4 + 7200];
    let encoded = encoder
        .encode(InterleavedPcm(&pcm), &mut buffer)
        .map_err(|e| anyhow!("MP3 encoding failed: {e:?}"))?;
    let flushed = encoder
        .flush::<FlushNoGap>(&mut buffer[encoded..])
        .map_err(|e| anyhow!("MP3 flush failed: {e:?}"))?;

    // The encoder initialised every byte it reported.
    let bytes: Vec<u8> = buffer[..encoded + flushed]
        .iter()
        .map(|b| unsafe { b.assume_init() })
        .collect();
    std::fs::write(path, &bytes).with_context(|| format!("cannot write {}", path.display()))?;
    log::info!("wrote {} ({kbps} kbps, {} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(sample_rate: u32, channels: u16, seconds: f64) -> AudioArc {
        let frames = (sample_rate as f64 * seconds) as usize;
        let samples = (0..frames * channels as usize)
            .map(|i| ((i / channels as usize) as f32 * 0.06).sin() * 0.4)
            .collect();
        AudioArc::new(samples, sample_rate, channels)
    }

    #[test]
    fn test_bitrate_rounds_up_to_lame_step() {
        assert!(matches!(lame_bitrate(100), Bitrate::Kbps112));
        assert!(matches!(lame_bitrate(128), Bitrate::Kbps128));
        assert!(matches!(lame_bitrate(1000), Bitrate::Kbps320));
        assert!(matches!(lame_bitrate(0), Bitrate::Kbps32));
    }

    #[test]
    fn test_mono_is_doubled_to_stereo() {
        let audio = AudioArc::new(vec![0.5, -0.5, 2.0], 44100, 1);
        assert_eq!(stereo_pcm(&audio), vec![16383, 16383, -16383, -16383, 32767, 32767]);
    }

    #[test]
    fn test_writes_mpeg_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.mp3");
        write_mp3(&tone(44100, 1, 0.5), &path, Some(128)).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > 1000, "only {} bytes", bytes.len());
        assert!(bytes.windows(2).any(|w| w[0] == 0xFF && w[1] & 0xE0 == 0xE0));
    }

    #[test]
    fn test_higher_bitrate_writes_more() {
        let dir = tempfile::tempdir().unwrap();
        let low = dir.path().join("low.mp3");
        let high = dir.path().join("high.mp3");
        let audio = tone(44100, 2, 1.0);
        write_mp3(&audio, &low, Some(64)).unwrap();
        write_mp3(&audio, &high, Some(256)).unwrap();
        let size = |p: &Path| std::fs::metadata(p).unwrap().len();
        assert!(size(&high) > size(&low));
    }
}
