use thiserror::Error;
use trackline_transport::{Seconds, TrackId};

/// Broad class of an edit failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Zero/negative-length or out-of-bounds region.
    Geometry,
    /// Something outside the arrangement is missing or failed.
    Resource,
    /// The arrangement moved on under the caller (deleted track, busy track).
    State,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("invalid range {start:.3}s..{end:.3}s")]
    InvalidRange { start: Seconds, end: Seconds },

    #[error("{0} not found")]
    TrackNotFound(TrackId),

    #[error("{0} has no source file")]
    MissingSource(TrackId),

    #[error("{0} has no enabled silence regions")]
    NoSilence(TrackId),

    #[error("{0} already has a processing job in flight")]
    Busy(TrackId),

    #[error("processing ticket is no longer valid")]
    StaleTicket,

    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

impl EditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::InvalidRange { .. } => ErrorKind::Geometry,
            EditError::MissingSource(_) | EditError::NoSilence(_) | EditError::Service(_) => {
                ErrorKind::Resource
            }
            EditError::TrackNotFound(_) | EditError::Busy(_) | EditError::StaleTicket => {
                ErrorKind::State
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            EditError::InvalidRange { start: 1.0, end: 1.0 }.kind(),
            ErrorKind::Geometry
        );
        assert_eq!(EditError::Busy(TrackId(1)).kind(), ErrorKind::State);
        assert_eq!(
            EditError::from(anyhow::anyhow!("decoder exploded")).kind(),
            ErrorKind::Resource
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            EditError::MissingSource(TrackId(3)).to_string(),
            "track#3 has no source file"
        );
        assert_eq!(
            EditError::from(anyhow::anyhow!("decoder exploded")).to_string(),
            "decoder exploded"
        );
    }
}
