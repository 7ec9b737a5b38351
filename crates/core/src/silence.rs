//! Per-track silence regions in original track-local time.

use trackline_transport::{Seconds, TimeRange};

use crate::remap::{CutRegion, TimeRemap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceRegion {
    pub id: RegionId,
    pub start: Seconds,
    pub end: Seconds,
    /// Disabled regions are kept so they can be turned back on.
    pub enabled: bool,
}

impl SilenceRegion {
    pub fn duration(&self) -> Seconds {
        self.end - self.start
    }
}

/// Sorted, non-overlapping silence regions of one track.
///
/// Regions that overlap or touch are merged on insert; the merged region
/// keeps the earliest id and stays enabled if either side was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilenceRegions {
    regions: Vec<SilenceRegion>,
    next_id: u64,
}

impl SilenceRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> &[SilenceRegion] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, id: RegionId) -> Option<&SilenceRegion> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Insert `[start, end)`. Returns the id of the region now covering it,
    /// or `None` for an empty span.
    pub fn add(&mut self, start: Seconds, end: Seconds) -> Option<RegionId> {
        let start = start.max(0.0);
        if end <= start {
            return None;
        }
        self.next_id += 1;
        let mut merged = SilenceRegion {
            id: RegionId(self.next_id),
            start,
            end,
            enabled: true,
        };

        let mut kept = Vec::with_capacity(self.regions.len() + 1);
        for region in self.regions.drain(..) {
            if region.start <= merged.end && merged.start <= region.end {
                merged.start = merged.start.min(region.start);
                merged.end = merged.end.max(region.end);
                merged.id = merged.id.min(region.id);
                merged.enabled |= region.enabled;
            } else {
                kept.push(region);
            }
        }
        let id = merged.id;
        kept.push(merged);
        kept.sort_by(|a, b| a.start.total_cmp(&b.start));
        self.regions = kept;
        Some(id)
    }

    pub fn set_enabled(&mut self, id: RegionId, enabled: bool) -> bool {
        match self.regions.iter_mut().find(|r| r.id == id) {
            Some(region) if region.enabled != enabled => {
                region.enabled = enabled;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: RegionId) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r.id != id);
        self.regions.len() != before
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Replace all regions with `ranges`, all enabled.
    pub fn replace(&mut self, ranges: &[TimeRange]) {
        self.regions.clear();
        for range in ranges {
            self.add(range.start, range.end);
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SilenceRegion> {
        self.regions.iter().filter(|r| r.enabled)
    }

    /// Freeze the enabled regions into a remap table.
    pub fn to_remap(&self) -> TimeRemap {
        TimeRemap::new(
            self.enabled()
                .map(|r| CutRegion {
                    start: r.start,
                    end: r.end,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_regions_merge() {
        let mut regions = SilenceRegions::new();
        let first = regions.add(1.0, 2.0).unwrap();
        regions.add(4.0, 5.0);
        let merged = regions.add(1.5, 3.0).unwrap();

        assert_eq!(merged, first);
        assert_eq!(regions.regions().len(), 2);
        assert_eq!(regions.regions()[0].start, 1.0);
        assert_eq!(regions.regions()[0].end, 3.0);
    }

    #[test]
    fn test_touching_regions_merge() {
        let mut regions = SilenceRegions::new();
        regions.add(1.0, 2.0);
        regions.add(3.0, 4.0);
        regions.add(2.0, 3.0);
        assert_eq!(regions.regions().len(), 1);
        assert_eq!(regions.regions()[0].end, 4.0);
    }

    #[test]
    fn test_insert_keeps_sorted() {
        let mut regions = SilenceRegions::new();
        regions.add(5.0, 6.0);
        regions.add(1.0, 2.0);
        regions.add(3.0, 3.5);
        let starts: Vec<_> = regions.regions().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_disabled_region_is_kept_and_excluded() {
        let mut regions = SilenceRegions::new();
        let a = regions.add(1.0, 2.0).unwrap();
        regions.add(4.0, 4.5);
        assert!(regions.set_enabled(a, false));
        assert!(!regions.set_enabled(a, false));

        assert_eq!(regions.regions().len(), 2);
        assert_eq!(regions.enabled().count(), 1);
        assert_eq!(regions.to_remap().regions().len(), 1);
    }

    #[test]
    fn test_merge_with_disabled_stays_enabled() {
        let mut regions = SilenceRegions::new();
        let a = regions.add(1.0, 2.0).unwrap();
        regions.set_enabled(a, false);
        regions.add(1.5, 2.5);
        assert!(regions.regions()[0].enabled);
    }

    #[test]
    fn test_empty_span_rejected() {
        let mut regions = SilenceRegions::new();
        assert!(regions.add(2.0, 2.0).is_none());
        assert!(regions.add(3.0, 1.0).is_none());
        assert!(regions.is_empty());
    }
}
