mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use trackline_core::{CleanOptions, EngineConfig, ExportFormat, SilenceOptions};

/// Headless front end for the trackline editing core.
#[derive(Parser, Debug)]
#[command(name = "trackline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine config file; defaults to the user config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print format and length of an audio file
    Inspect { file: PathBuf },

    /// List detected silence
    Silence {
        file: PathBuf,
        #[command(flatten)]
        detect: DetectArgs,
    },

    /// Detect silence and write a copy without it
    #[command(name = "cut-silence")]
    CutSilence {
        file: PathBuf,
        #[command(flatten)]
        detect: DetectArgs,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Write a cleaned copy
    Clean {
        file: PathBuf,
        /// Expander threshold in dBFS
        #[arg(long)]
        threshold_db: Option<f32>,
        #[arg(long)]
        ratio: Option<f32>,
        /// Attenuate detected silence as well
        #[arg(long)]
        hint_silence: bool,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Export a range of a file
    Export {
        file: PathBuf,
        /// In point in seconds
        #[arg(long = "in")]
        in_point: Option<f64>,
        /// Out point in seconds
        #[arg(long = "out")]
        out_point: Option<f64>,
        #[arg(long, value_enum, default_value_t = Format::Wav)]
        format: Format,
        /// MP3 bitrate in kbps
        #[arg(long)]
        bitrate: Option<u32>,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Render transport playback of a file to WAV
    Preview {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        transport: TransportArgs,
    },

    /// Play a file on the default output device
    #[cfg(feature = "device")]
    Play {
        file: PathBuf,
        #[command(flatten)]
        transport: TransportArgs,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Wav,
    Mp3,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Wav => ExportFormat::Wav,
            Format::Mp3 => ExportFormat::Mp3,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct DetectArgs {
    /// Energy threshold between noise floor and peak
    #[arg(long)]
    pub threshold: Option<f32>,
    /// Shortest speech or silence run kept, in seconds
    #[arg(long)]
    pub min_segment: Option<f64>,
    #[arg(long)]
    pub frame_ms: Option<u32>,
    /// Padding around speech, in seconds
    #[arg(long)]
    pub padding: Option<f64>,
}

impl DetectArgs {
    pub fn options(&self) -> SilenceOptions {
        let defaults = SilenceOptions::default();
        SilenceOptions {
            energy_threshold: self.threshold.unwrap_or(defaults.energy_threshold),
            min_segment_duration: self.min_segment.unwrap_or(defaults.min_segment_duration),
            frame_size_ms: self.frame_ms.unwrap_or(defaults.frame_size_ms),
            padding: self.padding.unwrap_or(defaults.padding),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Start position in seconds
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,
    /// Signed playback speed, 1..5 or -1..-5
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub speed: i8,
    /// Stop after this many seconds of wall time
    #[arg(long)]
    pub seconds: Option<f64>,
}

fn clean_options(threshold_db: Option<f32>, ratio: Option<f32>) -> CleanOptions {
    let defaults = CleanOptions::default();
    CleanOptions {
        threshold_db: threshold_db.unwrap_or(defaults.threshold_db),
        ratio: ratio.unwrap_or(defaults.ratio),
        ..defaults
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };

    match cli.command {
        Commands::Inspect { file } => commands::inspect(config, &file).await,
        Commands::Silence { file, detect } => {
            commands::silence(config, &file, &detect.options()).await
        }
        Commands::CutSilence {
            file,
            detect,
            out_dir,
        } => commands::cut_silence(config, &file, &detect.options(), &out_dir).await,
        Commands::Clean {
            file,
            threshold_db,
            ratio,
            hint_silence,
            out_dir,
        } => {
            let options = clean_options(threshold_db, ratio);
            commands::clean(config, &file, &options, hint_silence, &out_dir).await
        }
        Commands::Export {
            file,
            in_point,
            out_point,
            format,
            bitrate,
            out_dir,
        } => {
            let range = (in_point, out_point);
            commands::export(config, &file, range, format.into(), bitrate, &out_dir).await
        }
        Commands::Preview {
            file,
            output,
            transport,
        } => commands::preview(config, &file, &output, &transport).await,
        #[cfg(feature = "device")]
        Commands::Play { file, transport } => commands::play(config, &file, &transport).await,
    }
}
