use trackline_transport::{Seconds, TrackId};

use crate::playback::TransportState;
use crate::selection::TrackSelection;

/// Something observable changed in a session.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TrackAdded(TrackId),
    TrackRemoved(TrackId),
    TrackChanged(TrackId),
    TracksReordered,
    SelectionChanged(TrackSelection),
    TimeSelectionChanged,
    InOutChanged,
    SilenceRegionsChanged(TrackId),
    ClipboardChanged,
    TransportChanged(TransportState),
    PositionChanged(Seconds),
    SpeedChanged(i8),
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// A snapshot was restored; everything may have changed.
    Restored,
}

type Listener = Box<dyn FnMut(&EngineEvent)>;

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: &EngineEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_every_listener_sees_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();
        for _ in 0..2 {
            let seen = seen.clone();
            bus.subscribe(move |event| seen.borrow_mut().push(event.clone()));
        }
        bus.emit(&EngineEvent::TrackAdded(TrackId(1)));
        assert_eq!(seen.borrow().len(), 2);
    }
}
