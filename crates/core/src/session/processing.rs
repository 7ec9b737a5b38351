//! Processing jobs: ticketed slots per source track and the async flows that
//! drive the decode and processing services.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use trackline_transport::{
    AudioArc, AudioDecodeService, AudioProcessingService, CleanOptions, DecodedAudio,
    ExportFormat, ProcessKind, SilenceDetection, SilenceOptions, SourceOutput, TimeRange, TrackId,
    TrackOrigin, WaveformSummary,
};

use super::Session;
use crate::error::EditError;
use crate::events::EngineEvent;
use crate::processing::{JobKind, ProcessedAudioEntry, ProcessingTicket};
use crate::remap::TimeRemap;

impl<O: SourceOutput> Session<O> {
    /// Claim the processing slot of `track`.
    pub fn begin_processing(&mut self, track: TrackId, kind: JobKind) -> Result<ProcessingTicket, EditError> {
        if self.track(track).is_none() {
            return Err(EditError::TrackNotFound(track));
        }
        let ticket = self
            .state
            .processed
            .reserve(track, kind)
            .ok_or(EditError::Busy(track))?;
        log::info!("{kind:?} started on {track}");
        Ok(ticket)
    }

    /// Give up a job. The arrangement is left exactly as it was.
    pub fn cancel_processing(&mut self, ticket: &ProcessingTicket) -> bool {
        let released = self.state.processed.release(ticket);
        if released {
            log::info!("{:?} on {} cancelled", ticket.kind, ticket.track);
        }
        released
    }

    pub fn is_processing(&self, track: TrackId) -> bool {
        self.state.processed.is_pending(track)
    }

    /// Consume `ticket` before applying its result.
    fn finish(&mut self, ticket: &ProcessingTicket, kind: JobKind) -> Result<(), EditError> {
        if ticket.kind != kind || !self.state.processed.release(ticket) {
            return Err(EditError::StaleTicket);
        }
        if self.track(ticket.track).is_none() {
            return Err(EditError::TrackNotFound(ticket.track));
        }
        log::info!("{kind:?} finished on {}", ticket.track);
        Ok(())
    }

    /// Add cleaned audio as a new track linked to its source.
    pub fn apply_cleaned(
        &mut self,
        ticket: ProcessingTicket,
        audio: AudioArc,
        output_path: Option<PathBuf>,
    ) -> Result<TrackId, EditError> {
        self.finish(&ticket, JobKind::Clean)?;
        Ok(self.add_processed(ticket.track, ProcessKind::Cleaned, audio, output_path, None))
    }

    /// Add silence-cut audio as a new track. The source's enabled silence
    /// regions are frozen into the entry for later time mapping.
    pub fn apply_silence_cut(
        &mut self,
        ticket: ProcessingTicket,
        audio: AudioArc,
        output_path: Option<PathBuf>,
    ) -> Result<TrackId, EditError> {
        self.finish(&ticket, JobKind::CutSilence)?;
        let remap = self.enabled_remap(ticket.track)?;
        Ok(self.add_processed(
            ticket.track,
            ProcessKind::SilenceCut,
            audio,
            output_path,
            Some(remap),
        ))
    }

    /// Replace the silence regions of the ticket's track with the detected
    /// silence. Returns how many regions resulted.
    pub fn apply_silence_detection(
        &mut self,
        ticket: ProcessingTicket,
        detection: &SilenceDetection,
    ) -> Result<usize, EditError> {
        self.finish(&ticket, JobKind::DetectSilence)?;
        self.push_state("Detect silence");
        let regions = self.state.silence.entry(ticket.track).or_default();
        regions.replace(&detection.silence_segments);
        let count = regions.regions().len();
        log::info!("{count} silence regions on {}", ticket.track);
        self.emit(EngineEvent::SilenceRegionsChanged(ticket.track));
        Ok(count)
    }

    fn enabled_remap(&self, track: TrackId) -> Result<TimeRemap, EditError> {
        self.state
            .silence
            .get(&track)
            .map(|regions| regions.to_remap())
            .filter(|remap| !remap.is_empty())
            .ok_or(EditError::NoSilence(track))
    }

    fn add_processed(
        &mut self,
        source: TrackId,
        kind: ProcessKind,
        audio: AudioArc,
        output_path: Option<PathBuf>,
        remap: Option<TimeRemap>,
    ) -> TrackId {
        let (name, start) = match self.track(source) {
            Some(track) => (track.name.clone(), track.track_start),
            None => (String::new(), 0.0),
        };
        let suffix = match kind {
            ProcessKind::Cleaned => "cleaned",
            ProcessKind::SilenceCut => "cut",
        };
        let waveform = WaveformSummary::from_audio(&audio, self.config.waveform_buckets);
        let duration = audio.duration_secs();

        self.push_state(match kind {
            ProcessKind::Cleaned => "Clean",
            ProcessKind::SilenceCut => "Cut silence",
        });
        let output = self.insert_track(
            audio,
            waveform,
            format!("{name} ({suffix})"),
            start,
            output_path,
            TrackOrigin::Processed { source, kind },
        );
        if let Some(track) = self.track(output) {
            let entry = ProcessedAudioEntry {
                source,
                output,
                kind,
                buffer: track.buffer,
                waveform: Arc::clone(&track.waveform),
                duration,
                remap,
            };
            self.state.processed.push(entry);
        }
        // The output replaces the source audibly; unmuting brings it back.
        if self.track(source).is_some_and(|track| !track.muted) {
            self.state.arrangement.set_muted(source, true);
            self.emit(EngineEvent::TrackChanged(source));
        }
        self.restart_playback();
        output
    }

    fn source_path(&self, track: TrackId) -> Result<PathBuf, EditError> {
        self.track(track)
            .ok_or(EditError::TrackNotFound(track))?
            .source_path
            .clone()
            .ok_or(EditError::MissingSource(track))
    }

    // Async flows

    /// Decode a file into a new track at the start of the timeline.
    pub async fn import_audio<D: AudioDecodeService>(
        &mut self,
        decoder: &D,
        path: &Path,
    ) -> Result<TrackId, EditError> {
        let DecodedAudio {
            sample_rate,
            channels,
            waveform,
        } = decoder.decode(path, self.config.waveform_buckets).await?;
        let audio = AudioArc::from_channels(channels, sample_rate);
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());

        self.push_state("Import");
        Ok(self.insert_track(
            audio,
            waveform,
            name,
            0.0,
            Some(path.to_path_buf()),
            TrackOrigin::Import,
        ))
    }

    /// Clean a track's source file into a new processed track. Enabled
    /// silence regions go along as attenuation hints.
    pub async fn clean_track<D, P>(
        &mut self,
        decoder: &D,
        processor: &P,
        track: TrackId,
        options: &CleanOptions,
    ) -> Result<TrackId, EditError>
    where
        D: AudioDecodeService,
        P: AudioProcessingService,
    {
        let path = self.source_path(track)?;
        let range = TimeRange::new(0.0, self.track(track).map_or(0.0, |t| t.duration));
        let hints: Vec<TimeRange> = self
            .state
            .silence
            .get(&track)
            .map(|regions| {
                regions
                    .enabled()
                    .map(|r| TimeRange::new(r.start, r.end))
                    .collect()
            })
            .unwrap_or_default();
        let buckets = self.config.waveform_buckets;
        let ticket = self.begin_processing(track, JobKind::Clean)?;

        let result = async {
            let hints = (!hints.is_empty()).then_some(hints.as_slice());
            let cleaned = processor.clean(&path, range, options, hints).await?;
            let decoded = decoder.decode(&cleaned.output_path, buckets).await?;
            anyhow::Ok((cleaned.output_path, decoded))
        }
        .await;

        match result {
            Ok((output_path, decoded)) => {
                self.apply_cleaned(ticket, decoded.into_audio_arc(), Some(output_path))
            }
            Err(err) => {
                log::warn!("clean failed on {track}: {err:#}");
                self.cancel_processing(&ticket);
                Err(err.into())
            }
        }
    }

    /// Remove the enabled silence regions of a track's source file into a
    /// new processed track.
    pub async fn cut_silence<D, P>(
        &mut self,
        decoder: &D,
        processor: &P,
        track: TrackId,
    ) -> Result<TrackId, EditError>
    where
        D: AudioDecodeService,
        P: AudioProcessingService,
    {
        let path = self.source_path(track)?;
        let remap = self.enabled_remap(track)?;
        let keep = remap.keep_segments(self.track(track).map_or(0.0, |t| t.duration));
        let buckets = self.config.waveform_buckets;
        let ticket = self.begin_processing(track, JobKind::CutSilence)?;

        let result = async {
            let output_path = processor.cut_silence(&path, &keep).await?;
            let decoded = decoder.decode(&output_path, buckets).await?;
            anyhow::Ok((output_path, decoded))
        }
        .await;

        match result {
            Ok((output_path, decoded)) => {
                self.apply_silence_cut(ticket, decoded.into_audio_arc(), Some(output_path))
            }
            Err(err) => {
                log::warn!("silence cut failed on {track}: {err:#}");
                self.cancel_processing(&ticket);
                Err(err.into())
            }
        }
    }

    /// Run silence detection on a track's source file and adopt the result
    /// as its silence regions.
    pub async fn detect_silence<P: AudioProcessingService>(
        &mut self,
        processor: &P,
        track: TrackId,
        options: &SilenceOptions,
    ) -> Result<usize, EditError> {
        let path = self.source_path(track)?;
        let ticket = self.begin_processing(track, JobKind::DetectSilence)?;
        match processor.detect_silence(&path, options).await {
            Ok(detection) => self.apply_silence_detection(ticket, &detection),
            Err(err) => {
                log::warn!("silence detection failed on {track}: {err:#}");
                self.cancel_processing(&ticket);
                Err(err.into())
            }
        }
    }

    /// Export a track's source file, limited to the in/out range when set.
    pub async fn export_track<P: AudioProcessingService>(
        &self,
        processor: &P,
        track: TrackId,
        format: ExportFormat,
        bitrate: Option<u32>,
    ) -> Result<PathBuf, EditError> {
        let path = self.source_path(track)?;
        let (start, duration) = self
            .track(track)
            .map(|t| (t.track_start, t.duration))
            .ok_or(EditError::TrackNotFound(track))?;
        let range = match self.state.in_out.span() {
            Some(span) => {
                let local = TimeRange::new(
                    (span.start - start).max(0.0),
                    (span.end - start).min(duration),
                );
                if local.is_empty() {
                    return Err(EditError::InvalidRange {
                        start: span.start,
                        end: span.end,
                    });
                }
                local
            }
            None => TimeRange::new(0.0, duration),
        };

        let output = processor.export(&path, range, format, bitrate).await?;
        log::info!("exported {track} to {}", output.display());
        Ok(output)
    }
}
