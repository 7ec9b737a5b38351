pub mod arrangement;
pub mod clip_ops;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod playback;
pub mod processing;
pub mod remap;
pub mod selection;
pub mod session;
pub mod silence;
pub mod time;

#[cfg(test)]
mod test_support;

pub use arrangement::Arrangement;
pub use config::EngineConfig;
pub use error::{EditError, ErrorKind};
pub use events::{EngineEvent, EventBus};
pub use history::History;
pub use playback::{FrameOutcome, FrameToken, LoopMode, PlaybackContext, PlaybackEngine, TransportState};
pub use processing::{JobKind, ProcessedAudioEntry, ProcessingTicket};
pub use remap::{CutRegion, TimeRemap};
pub use selection::{InOutPoints, TrackSelection};
pub use session::{ClipboardEntry, Session, SessionMode, Snapshot};
pub use silence::{RegionId, SilenceRegion, SilenceRegions};
pub use time::{TimeSpan, Timecode};

pub use trackline_decode::{SymphoniaDecoder, decode_file};
pub use trackline_render::{LocalProcessor, write_wav};
pub use trackline_transport::{
    AudioArc, BufferArena, BufferId, CleanOptions, Clip, ClipId, ExportFormat, NullOutput,
    PlaybackSource, Seconds, SilenceDetection, SilenceOptions, SourceOutput, TimeRange, Track,
    TrackId, TrackOrigin, WaveformSummary,
};
