use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use trackline_transport::{
    AudioProcessingService, CleanOptions, CleanOutput, ExportFormat, SilenceDetection,
    SilenceOptions, TimeRange,
};

use crate::{clean, cut_silence, detect_silence, write_mp3, write_wav};

/// In-process [`AudioProcessingService`] writing into one directory. Processed
/// audio is always WAV; exports may also be MP3.
///
/// Work runs on the blocking thread pool so callers on an async runtime stay
/// responsive.
#[derive(Debug, Clone)]
pub struct LocalProcessor {
    output_dir: PathBuf,
    counter: Arc<AtomicU64>,
}

impl LocalProcessor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<stem>_<suffix>_<n>.<ext>` inside the output directory.
    fn output_path(&self, source: &Path, suffix: &str, ext: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.output_dir.join(format!("{stem}_{suffix}_{n}.{ext}"))
    }
}

async fn blocking<T: Send + 'static>(
    job: impl FnOnce() -> anyhow::Result<T> + Send + 'static,
) -> anyhow::Result<T> {
    tokio::task::spawn_blocking(job).await?
}

impl AudioProcessingService for LocalProcessor {
    async fn clean(
        &self,
        source: &Path,
        range: TimeRange,
        options: &CleanOptions,
        silence_hints: Option<&[TimeRange]>,
    ) -> anyhow::Result<CleanOutput> {
        let source = source.to_path_buf();
        let output_path = self.output_path(&source, "clean", "wav");
        let options = options.clone();
        let hints = silence_hints.map(<[TimeRange]>::to_vec);
        blocking(move || {
            let audio = trackline_decode::decode_file(&source)?;
            let cleaned = clean(&audio, range, &options, hints.as_deref());
            write_wav(&cleaned, &output_path)?;
            log::info!("cleaned {} -> {}", source.display(), output_path.display());
            Ok(CleanOutput {
                output_path,
                duration: cleaned.duration_secs(),
                sample_rate: cleaned.sample_rate(),
            })
        })
        .await
    }

    async fn detect_silence(
        &self,
        source: &Path,
        options: &SilenceOptions,
    ) -> anyhow::Result<SilenceDetection> {
        let source = source.to_path_buf();
        let options = options.clone();
        blocking(move || {
            let audio = trackline_decode::decode_file(&source)?;
            Ok(detect_silence(&audio, &options))
        })
        .await
    }

    async fn cut_silence(&self, source: &Path, keep: &[TimeRange]) -> anyhow::Result<PathBuf> {
        let source = source.to_path_buf();
        let output_path = self.output_path(&source, "cut", "wav");
        let keep = keep.to_vec();
        blocking(move || {
            let audio = trackline_decode::decode_file(&source)?;
            let cut = cut_silence(&audio, &keep);
            write_wav(&cut, &output_path)?;
            log::info!(
                "cut silence {} -> {} ({:.2}s kept)",
                source.display(),
                output_path.display(),
                cut.duration_secs()
            );
            Ok(output_path)
        })
        .await
    }

    async fn export(
        &self,
        source: &Path,
        range: TimeRange,
        format: ExportFormat,
        bitrate: Option<u32>,
    ) -> anyhow::Result<PathBuf> {
        if format == ExportFormat::Wav
            && let Some(bitrate) = bitrate
        {
            log::debug!("ignoring bitrate {bitrate} for uncompressed export");
        }
        let source = source.to_path_buf();
        let output_path = self.output_path(&source, "export", format.extension());
        blocking(move || {
            let audio = trackline_decode::decode_file(&source)?;
            let slice = audio.slice_frames(audio.frame_at(range.start), audio.frame_at(range.end));
            match format {
                ExportFormat::Wav => write_wav(&slice, &output_path)?,
                ExportFormat::Mp3 => write_mp3(&slice, &output_path, bitrate)?,
            }
            log::info!("exported {} -> {}", source.display(), output_path.display());
            Ok(output_path)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackline_transport::AudioArc;

    fn source_file(dir: &Path) -> PathBuf {
        let path = dir.join("voice.wav");
        let audio = AudioArc::new((0..8000).map(|i| (i as f32 * 0.05).sin() * 0.5).collect(), 8000, 1);
        write_wav(&audio, &path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_cut_silence_writes_kept_audio() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());
        let processor = LocalProcessor::new(dir.path());

        let out = processor
            .cut_silence(&source, &[TimeRange::new(0.0, 0.25), TimeRange::new(0.5, 0.75)])
            .await
            .unwrap();
        let audio = trackline_decode::decode_file(&out).unwrap();
        assert_eq!(audio.frames(), 4000);
    }

    #[tokio::test]
    async fn test_clean_reports_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());
        let processor = LocalProcessor::new(dir.path());

        let out = processor
            .clean(&source, TimeRange::new(0.0, 0.5), &CleanOptions::default(), None)
            .await
            .unwrap();
        assert!(out.output_path.exists());
        assert_eq!(out.sample_rate, 8000);
        assert!((out.duration - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_outputs_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());
        let processor = LocalProcessor::new(dir.path());
        let range = TimeRange::new(0.0, 0.1);

        let a = processor.export(&source, range, ExportFormat::Wav, None).await.unwrap();
        let b = processor.export(&source, range, ExportFormat::Wav, None).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_mp3_export_encodes_range() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("voice.wav");
        let audio = AudioArc::new((0..44100).map(|i| (i as f32 * 0.05).sin() * 0.5).collect(), 44100, 1);
        write_wav(&audio, &source).unwrap();
        let processor = LocalProcessor::new(dir.path());

        let out = processor
            .export(&source, TimeRange::new(0.0, 0.5), ExportFormat::Mp3, Some(128))
            .await
            .unwrap();
        assert_eq!(out.extension().and_then(|e| e.to_str()), Some("mp3"));
        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.windows(2).any(|w| w[0] == 0xFF && w[1] & 0xE0 == 0xE0));
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let processor = LocalProcessor::new(dir.path());
        let result = processor
            .detect_silence(&dir.path().join("nope.wav"), &SilenceOptions::default())
            .await;
        assert!(result.is_err());
    }
}
