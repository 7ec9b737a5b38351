use trackline_transport::Seconds;

/// Tolerance for comparing timeline positions.
pub const TIME_EPSILON: Seconds = 1e-9;

/// A half-open `[start, end)` span on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start: Seconds,
    pub end: Seconds,
}

impl TimeSpan {
    pub fn new(start: Seconds, end: Seconds) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Seconds {
        (self.end - self.start).max(0.0)
    }

    pub fn contains(&self, time: Seconds) -> bool {
        time >= self.start && time < self.end
    }

    pub fn clamp(&self, time: Seconds) -> Seconds {
        time.clamp(self.start, self.end.max(self.start))
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &TimeSpan) -> TimeSpan {
        TimeSpan::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Wall-clock style position for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub millis: u32,
}

impl Timecode {
    pub fn from_seconds(time: Seconds) -> Self {
        let total_millis = (time.max(0.0) * 1000.0).round() as u64;
        Self {
            hours: (total_millis / 3_600_000) as u32,
            minutes: ((total_millis / 60_000) % 60) as u32,
            seconds: ((total_millis / 1000) % 60) as u32,
            millis: (total_millis % 1000) as u32,
        }
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hours > 0 {
            write!(
                f,
                "{}:{:02}:{:02}.{:03}",
                self.hours, self.minutes, self.seconds, self.millis
            )
        } else {
            write!(f, "{:02}:{:02}.{:03}", self.minutes, self.seconds, self.millis)
        }
    }
}
