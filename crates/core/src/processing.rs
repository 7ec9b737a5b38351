//! Bookkeeping for derived (cleaned / silence-cut) audio and for jobs in flight.

use std::collections::HashMap;
use std::sync::Arc;

use trackline_transport::{BufferId, ProcessKind, Seconds, TrackId, WaveformSummary};

use crate::remap::TimeRemap;

/// Links a processed output track back to its source.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedAudioEntry {
    pub source: TrackId,
    pub output: TrackId,
    pub kind: ProcessKind,
    pub buffer: BufferId,
    pub waveform: Arc<WaveformSummary>,
    pub duration: Seconds,
    /// Frozen silence regions; present only for silence-cut output.
    pub remap: Option<TimeRemap>,
}

/// Kinds of job that hold a source track's processing slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Clean,
    CutSilence,
    DetectSilence,
}

/// Proof that a job owns the processing slot of `track`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingTicket {
    id: u64,
    pub track: TrackId,
    pub kind: JobKind,
}

#[derive(Debug, Default)]
pub struct ProcessedStore {
    entries: Vec<ProcessedAudioEntry>,
    pending: HashMap<TrackId, ProcessingTicket>,
    next_ticket: u64,
}

impl ProcessedStore {
    pub fn entries(&self) -> &[ProcessedAudioEntry] {
        &self.entries
    }

    pub fn set_entries(&mut self, entries: Vec<ProcessedAudioEntry>) {
        self.entries = entries;
    }

    pub fn push(&mut self, entry: ProcessedAudioEntry) {
        self.entries.push(entry);
    }

    pub fn by_output(&self, output: TrackId) -> Option<&ProcessedAudioEntry> {
        self.entries.iter().find(|e| e.output == output)
    }

    /// Drop entries that mention `track` on either side.
    pub fn forget_track(&mut self, track: TrackId) {
        self.entries.retain(|e| e.output != track && e.source != track);
    }

    /// Reserve the slot for `track`; `None` if a job is already running on it.
    pub fn reserve(&mut self, track: TrackId, kind: JobKind) -> Option<ProcessingTicket> {
        if self.pending.contains_key(&track) {
            return None;
        }
        self.next_ticket += 1;
        let ticket = ProcessingTicket {
            id: self.next_ticket,
            track,
            kind,
        };
        self.pending.insert(track, ticket);
        Some(ticket)
    }

    /// Release the slot held by `ticket`. False if the ticket is not current.
    pub fn release(&mut self, ticket: &ProcessingTicket) -> bool {
        if self.pending.get(&ticket.track) == Some(ticket) {
            self.pending.remove(&ticket.track);
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self, track: TrackId) -> bool {
        self.pending.contains_key(&track)
    }

    pub fn is_current(&self, ticket: &ProcessingTicket) -> bool {
        self.pending.get(&ticket.track) == Some(ticket)
    }
}
