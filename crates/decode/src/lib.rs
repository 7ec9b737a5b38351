use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use trackline_transport::{AudioArc, AudioDecodeService, DecodedAudio, WaveformSummary};

fn probe(path: &Path) -> anyhow::Result<Box<dyn FormatReader>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("unrecognised audio format: {}", path.display()))?;
    Ok(probed.format)
}

/// Decode a whole file into interleaved `f32` samples.
pub fn decode_file(path: &Path) -> anyhow::Result<AudioArc> {
    let mut format = probe(path)?;
    let track = format
        .default_track()
        .with_context(|| format!("{} has no audio track", path.display()))?;

    let params = &track.codec_params;
    let mut sample_rate = params.sample_rate.unwrap_or(44100);
    let mut channels = params.channels.map_or(2, |c| c.count()) as u16;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs().make(params, &DecoderOptions::default())?;
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("skipping corrupt packet in {}: {msg}", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        interleaved.copy_interleaved_ref(decoded);
        samples.extend_from_slice(interleaved.samples());
    }

    log::debug!(
        "decoded {}: {} samples, {} Hz, {} channels",
        path.display(),
        samples.len(),
        sample_rate,
        channels
    );

    Ok(AudioArc::new(samples, sample_rate, channels.max(1)))
}

/// Decode `path` into planar channels plus a `buckets`-wide waveform summary.
pub fn decode_with_waveform(path: &Path, buckets: usize) -> anyhow::Result<DecodedAudio> {
    let audio = decode_file(path)?;
    let waveform = WaveformSummary::from_audio(&audio, buckets);
    let channels = (0..audio.channels() as usize)
        .map(|ch| audio.channel(ch).collect())
        .collect();
    Ok(DecodedAudio {
        sample_rate: audio.sample_rate(),
        channels,
        waveform,
    })
}

/// [`AudioDecodeService`] backed by symphonia on the blocking thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl AudioDecodeService for SymphoniaDecoder {
    async fn decode(&self, path: &Path, buckets: usize) -> anyhow::Result<DecodedAudio> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || decode_with_waveform(&path, buckets)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_stereo_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-16384i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_stereo_wav(&path, 2205);

        let audio = decode_file(&path).unwrap();
        assert_eq!(audio.sample_rate(), 22050);
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.frames(), 2205);
        assert!((audio.sample(10, 0) - 0.5).abs() < 1e-3);
        assert!((audio.sample(10, 1) + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode_file(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(err.to_string().contains("cannot open"));
    }

    #[tokio::test]
    async fn test_service_returns_planar_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_stereo_wav(&path, 1000);

        let decoded = SymphoniaDecoder.decode(&path, 50).await.unwrap();
        assert_eq!(decoded.channels.len(), 2);
        assert_eq!(decoded.channels[0].len(), 1000);
        assert_eq!(decoded.waveform.bucket_count(), 50);
    }
}
