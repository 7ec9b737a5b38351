use std::path::Path;

use anyhow::{Context, bail};
use trackline_core::{
    AudioArc, CleanOptions, EngineConfig, ExportFormat, FrameOutcome, NullOutput, Session,
    SilenceOptions, SourceOutput, SymphoniaDecoder, Timecode, TrackId, TrackSelection, write_wav,
};
use trackline_engine::output_channel;
use trackline_render::LocalProcessor;

use crate::TransportArgs;

const PREVIEW_RATE: u32 = 44100;
const PREVIEW_CHANNELS: u16 = 2;
/// 10 ms of output per transport frame.
const PREVIEW_BLOCK: usize = PREVIEW_RATE as usize / 100;

async fn open<O: SourceOutput>(session: &mut Session<O>, file: &Path) -> anyhow::Result<TrackId> {
    let id = session
        .import_audio(&SymphoniaDecoder, file)
        .await
        .with_context(|| format!("failed to load {}", file.display()))?;
    session.select_track(TrackSelection::Track(id));
    Ok(id)
}

fn headless(config: EngineConfig) -> Session {
    Session::new(NullOutput, config)
}

pub async fn inspect(config: EngineConfig, file: &Path) -> anyhow::Result<()> {
    let mut session = headless(config);
    let id = open(&mut session, file).await?;
    let Some(track) = session.track(id) else {
        bail!("{id} vanished after import");
    };
    let Some(audio) = session.audio(track.buffer) else {
        bail!("{id} has no audio");
    };
    println!(
        "{}: {} Hz, {} channel(s), {}",
        file.display(),
        audio.sample_rate(),
        audio.channels(),
        Timecode::from_seconds(track.duration)
    );
    Ok(())
}

pub async fn silence(config: EngineConfig, file: &Path, options: &SilenceOptions) -> anyhow::Result<()> {
    let mut session = headless(config);
    let id = open(&mut session, file).await?;
    let processor = LocalProcessor::new(std::env::temp_dir());
    let count = session.detect_silence(&processor, id, options).await?;

    println!("{count} silent region(s)");
    if let Some(regions) = session.silence_regions(id) {
        for region in regions.regions() {
            println!(
                "  {} - {}  ({:.3}s)",
                Timecode::from_seconds(region.start),
                Timecode::from_seconds(region.end),
                region.duration()
            );
        }
    }
    Ok(())
}

pub async fn cut_silence(
    config: EngineConfig,
    file: &Path,
    options: &SilenceOptions,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let mut session = headless(config);
    let id = open(&mut session, file).await?;
    let processor = LocalProcessor::new(out_dir);
    session.detect_silence(&processor, id, options).await?;
    let output = session.cut_silence(&SymphoniaDecoder, &processor, id).await?;

    let before = session.track(id).map_or(0.0, |t| t.duration);
    let Some(track) = session.track(output) else {
        bail!("silence cut produced no track");
    };
    println!(
        "{} ({} -> {})",
        track
            .source_path
            .as_deref()
            .unwrap_or(Path::new("?"))
            .display(),
        Timecode::from_seconds(before),
        Timecode::from_seconds(track.duration)
    );
    Ok(())
}

pub async fn clean(
    config: EngineConfig,
    file: &Path,
    options: &CleanOptions,
    hint_silence: bool,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let mut session = headless(config);
    let id = open(&mut session, file).await?;
    let processor = LocalProcessor::new(out_dir);
    if hint_silence {
        session
            .detect_silence(&processor, id, &SilenceOptions::default())
            .await?;
    }
    let output = session
        .clean_track(&SymphoniaDecoder, &processor, id, options)
        .await?;

    if let Some(path) = session.track(output).and_then(|t| t.source_path.as_deref()) {
        println!("{}", path.display());
    }
    Ok(())
}

pub async fn export(
    config: EngineConfig,
    file: &Path,
    (in_point, out_point): (Option<f64>, Option<f64>),
    format: ExportFormat,
    bitrate: Option<u32>,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let mut session = headless(config);
    let id = open(&mut session, file).await?;
    let duration = session.timeline_duration();
    if in_point.is_some() || out_point.is_some() {
        session.set_in_point(Some(in_point.unwrap_or(0.0)));
        session.set_out_point(Some(out_point.unwrap_or(duration)));
    }

    let processor = LocalProcessor::new(out_dir);
    let path = session
        .export_track(&processor, id, format, bitrate)
        .await?;
    println!("{}", path.display());
    Ok(())
}

/// Drive the transport over a file and capture what the renderer produces.
pub async fn preview(
    config: EngineConfig,
    file: &Path,
    output: &Path,
    transport: &TransportArgs,
) -> anyhow::Result<()> {
    let (handle, mut renderer) = output_channel(PREVIEW_RATE, PREVIEW_CHANNELS);
    let mut session = Session::new(handle, config);
    open(&mut session, file).await?;
    session.set_speed(transport.speed);
    session.seek(transport.start);
    let Some(mut token) = session.play() else {
        bail!("nothing to play in {}", file.display());
    };

    let dt = PREVIEW_BLOCK as f64 / PREVIEW_RATE as f64;
    let limit = transport.seconds.unwrap_or(f64::INFINITY);
    let mut block = vec![0.0; PREVIEW_BLOCK * PREVIEW_CHANNELS as usize];
    let mut rendered = Vec::new();
    let mut elapsed = 0.0;

    while elapsed < limit {
        renderer.process(&mut block);
        rendered.extend_from_slice(&block);
        elapsed += dt;
        match session.on_frame(token, dt) {
            FrameOutcome::Continue(next) | FrameOutcome::Looped(next) => token = next,
            FrameOutcome::Ended | FrameOutcome::Ignored => break,
        }
        session.output_mut().collect();
    }
    session.stop();

    let audio = AudioArc::new(rendered, PREVIEW_RATE, PREVIEW_CHANNELS);
    write_wav(&audio, output)?;
    log::info!(
        "preview of {} at speed {} written to {}",
        file.display(),
        session.speed(),
        output.display()
    );
    Ok(())
}

#[cfg(feature = "device")]
pub async fn play(config: EngineConfig, file: &Path, transport: &TransportArgs) -> anyhow::Result<()> {
    use std::time::{Duration, Instant};

    let (handle, stream) = trackline_engine::start_device()?;
    let mut session = Session::new(handle, config);
    open(&mut session, file).await?;
    session.set_speed(transport.speed);
    session.seek(transport.start);
    let Some(mut token) = session.play() else {
        bail!("nothing to play in {}", file.display());
    };

    let started = Instant::now();
    let limit = transport.seconds.unwrap_or(f64::INFINITY);
    let mut last = started;
    while started.elapsed().as_secs_f64() < limit {
        tokio::time::sleep(Duration::from_millis(16)).await;
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;
        match session.on_frame(token, dt) {
            FrameOutcome::Continue(next) | FrameOutcome::Looped(next) => token = next,
            FrameOutcome::Ended | FrameOutcome::Ignored => break,
        }
        for status in session.output_mut().poll_status() {
            log::trace!("{status:?}");
        }
        session.output_mut().collect();
    }
    session.stop();
    drop(stream);
    Ok(())
}
