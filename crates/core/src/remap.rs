//! Mapping between silence-cut audio time and original track time.
//!
//! A silence-cut track holds the original audio with every cut region
//! removed. The table below converts positions between the two. The
//! conversions are deliberately not exact inverses: an original instant that
//! falls inside a removed region collapses onto that region's start.

use trackline_transport::{Seconds, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutRegion {
    pub start: Seconds,
    pub end: Seconds,
}

impl CutRegion {
    pub fn duration(&self) -> Seconds {
        self.end - self.start
    }
}

/// Frozen, sorted, non-overlapping cut regions in original track-local time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeRemap {
    regions: Vec<CutRegion>,
}

impl TimeRemap {
    pub fn new(mut regions: Vec<CutRegion>) -> Self {
        regions.retain(|r| r.end > r.start);
        regions.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self { regions }
    }

    pub fn regions(&self) -> &[CutRegion] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Where `cut_time` would sit had nothing been removed. A cut time on a
    /// cut point maps past the removed region, onto the audio that follows.
    pub fn to_original(&self, cut_time: Seconds) -> Seconds {
        let mut offset = 0.0;
        for region in &self.regions {
            if region.start <= cut_time + offset {
                offset += region.duration();
            } else {
                break;
            }
        }
        cut_time + offset
    }

    /// Position of `original_time` in the cut audio. Instants inside a
    /// removed region map to where that region was cut.
    pub fn to_cut(&self, original_time: Seconds) -> Seconds {
        let mut removed = 0.0;
        for region in &self.regions {
            if original_time >= region.end {
                removed += region.duration();
            } else if original_time >= region.start {
                return region.start - removed;
            } else {
                break;
            }
        }
        original_time - removed
    }

    /// Spans of `[0, duration)` that survive the cut.
    pub fn keep_segments(&self, duration: Seconds) -> Vec<TimeRange> {
        let mut keep = Vec::new();
        let mut cursor: Seconds = 0.0;
        for region in &self.regions {
            let start = region.start.min(duration);
            if start > cursor {
                keep.push(TimeRange::new(cursor, start));
            }
            cursor = cursor.max(region.end);
        }
        if duration > cursor {
            keep.push(TimeRange::new(cursor, duration));
        }
        keep
    }

    /// Length of `duration` seconds of original audio after the cut.
    pub fn cut_duration(&self, duration: Seconds) -> Seconds {
        self.keep_segments(duration).iter().map(TimeRange::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn remap() -> TimeRemap {
        TimeRemap::new(vec![
            CutRegion { start: 1.0, end: 2.0 },
            CutRegion { start: 4.0, end: 4.5 },
        ])
    }

    #[test]
    fn test_cut_to_original_skips_passed_regions() {
        let remap = remap();
        assert_relative_eq!(remap.to_original(0.5), 0.5);
        assert_relative_eq!(remap.to_original(2.5), 3.5);
        assert_relative_eq!(remap.to_original(3.5), 5.0);
    }

    #[test]
    fn test_cut_point_maps_past_removed_region() {
        let remap = remap();
        assert_relative_eq!(remap.to_original(1.0), 2.0);
        assert_relative_eq!(remap.to_original(3.0), 4.5);
        assert_relative_eq!(remap.to_original(0.999), 0.999);
    }

    #[test]
    fn test_original_inside_region_snaps_to_cut_point() {
        let remap = remap();
        assert_relative_eq!(remap.to_cut(4.2), 3.0);
        assert_relative_eq!(remap.to_cut(1.5), 1.0);
        assert_relative_eq!(remap.to_cut(6.0), 4.5);
    }

    #[test]
    fn test_to_original_is_monotonic() {
        let remap = remap();
        let mut last = f64::NEG_INFINITY;
        for i in 0..=800 {
            let mapped = remap.to_original(i as f64 * 0.01);
            assert!(mapped >= last, "{} mapped below {}", i, last);
            last = mapped;
        }
    }

    #[test]
    fn test_to_cut_is_monotonic() {
        let remap = remap();
        let mut last = f64::NEG_INFINITY;
        for i in 0..=1000 {
            let mapped = remap.to_cut(i as f64 * 0.01);
            assert!(mapped >= last);
            last = mapped;
        }
    }

    #[test]
    fn test_inside_region_round_trip_snaps_to_region_start() {
        let remap = remap();
        for region in remap.regions() {
            let start_in_cut = remap.to_cut(region.start);
            for step in 1..10 {
                let t = region.start + region.duration() * step as f64 / 10.0;
                assert_relative_eq!(remap.to_cut(t), start_in_cut);
                assert_relative_eq!(remap.to_cut(remap.to_original(remap.to_cut(t))), start_in_cut);
            }
        }
    }

    #[test]
    fn test_outside_boundaries_round_trip() {
        let remap = remap();
        for cut_time in [0.25, 1.5, 2.75, 3.9] {
            assert_relative_eq!(remap.to_cut(remap.to_original(cut_time)), cut_time);
        }
    }

    #[test]
    fn test_keep_segments_complement_regions() {
        let keep = remap().keep_segments(10.0);
        assert_eq!(
            keep,
            vec![
                TimeRange::new(0.0, 1.0),
                TimeRange::new(2.0, 4.0),
                TimeRange::new(4.5, 10.0)
            ]
        );
        assert_relative_eq!(remap().cut_duration(10.0), 8.5);
    }

    #[test]
    fn test_empty_remap_is_identity() {
        let remap = TimeRemap::default();
        assert_eq!(remap.to_original(3.3), 3.3);
        assert_eq!(remap.to_cut(3.3), 3.3);
    }
}
