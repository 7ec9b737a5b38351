use trackline_transport::{Seconds, TrackId};

use crate::time::TimeSpan;

/// Which track(s) the user is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackSelection {
    Track(TrackId),
    All,
    #[default]
    None,
}

impl TrackSelection {
    pub fn track_id(&self) -> Option<TrackId> {
        match self {
            TrackSelection::Track(id) => Some(*id),
            _ => None,
        }
    }
}

/// Timeline markers for clip creation and in/out looping.
///
/// The points never cross: moving one past the other clears the other.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InOutPoints {
    in_point: Option<Seconds>,
    out_point: Option<Seconds>,
}

impl InOutPoints {
    pub fn in_point(&self) -> Option<Seconds> {
        self.in_point
    }

    pub fn out_point(&self) -> Option<Seconds> {
        self.out_point
    }

    pub fn set_in(&mut self, time: Option<Seconds>) {
        self.in_point = time.map(|t| t.max(0.0));
        if let (Some(i), Some(o)) = (self.in_point, self.out_point) {
            if i > o {
                self.out_point = None;
            }
        }
    }

    pub fn set_out(&mut self, time: Option<Seconds>) {
        self.out_point = time.map(|t| t.max(0.0));
        if let (Some(i), Some(o)) = (self.in_point, self.out_point) {
            if o < i {
                self.in_point = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.in_point = None;
        self.out_point = None;
    }

    /// Both points, when set and forming a non-empty span.
    pub fn span(&self) -> Option<TimeSpan> {
        match (self.in_point, self.out_point) {
            (Some(i), Some(o)) if o > i => Some(TimeSpan::new(i, o)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_past_out_clears_out() {
        let mut points = InOutPoints::default();
        points.set_out(Some(4.0));
        points.set_in(Some(5.0));
        assert_eq!(points.in_point(), Some(5.0));
        assert_eq!(points.out_point(), None);
    }

    #[test]
    fn test_out_before_in_clears_in() {
        let mut points = InOutPoints::default();
        points.set_in(Some(3.0));
        points.set_out(Some(1.0));
        assert_eq!(points.in_point(), None);
        assert_eq!(points.out_point(), Some(1.0));
    }

    #[test]
    fn test_span_needs_both_points() {
        let mut points = InOutPoints::default();
        points.set_in(Some(1.0));
        assert!(points.span().is_none());
        points.set_out(Some(2.5));
        assert_eq!(points.span(), Some(TimeSpan::new(1.0, 2.5)));
    }

    #[test]
    fn test_selection_track_id() {
        assert_eq!(TrackSelection::Track(TrackId(4)).track_id(), Some(TrackId(4)));
        assert_eq!(TrackSelection::All.track_id(), None);
    }
}
