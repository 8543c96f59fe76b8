//! Latest-value slots for incoming frames and point clouds.
//!
//! Setters only swap an `Arc`, so they never wait on a running inference:
//! a detection cycle works on the snapshot it took when it started.

use std::sync::Arc;
use parking_lot::Mutex;
use crate::common::{BvrImage, SourceCloud};
use crate::data::{SourceId, MAX_SOURCES};

#[derive(Debug, Default)]
struct Latest<T> {
    value: Option<Arc<T>>,
    seq: u64,
}

/// Holds only the newest camera frame; older unconsumed frames are dropped.
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Mutex<Latest<BvrImage>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `frame` as the current frame and returns its sequence number.
    pub fn store(&self, frame: BvrImage) -> u64 {
        let mut latest = self.latest.lock();
        latest.seq += 1;
        let seq = latest.seq;
        latest.value = Some(Arc::new(frame.with_seq(seq)));
        seq
    }

    pub fn snapshot(&self) -> Option<Arc<BvrImage>> {
        self.latest.lock().value.clone()
    }

    /// Sequence number of the newest frame, 0 before the first one.
    pub fn latest_seq(&self) -> u64 {
        self.latest.lock().seq
    }
}

/// One independent latest-cloud slot per robot.
#[derive(Debug)]
pub struct CloudSlots {
    slots: [Mutex<Option<Arc<SourceCloud>>>; MAX_SOURCES],
    enabled: u8,
    seq: Mutex<u64>,
}

impl CloudSlots {
    /// Accepts clouds for sources `1..=enabled` only.
    pub fn new(enabled: u8) -> Self {
        Self {
            slots: std::array::from_fn(|_| Mutex::new(None)),
            enabled: enabled.min(MAX_SOURCES as u8),
            seq: Mutex::new(0),
        }
    }

    pub fn is_enabled(&self, source: SourceId) -> bool {
        source.get() <= self.enabled
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = SourceId> {
        SourceId::first(self.enabled)
    }

    /// Replaces the stored cloud of `source`. Returns false when the source
    /// is not enabled or the cloud's grid does not match its point count,
    /// and the cloud was dropped.
    pub fn store(&self, source: SourceId, mut cloud: SourceCloud) -> bool {
        if !self.is_enabled(source) {
            log::debug!("bvr_perception: dropping cloud from disabled source {}", source);
            return false;
        }
        if !cloud.is_consistent() {
            log::warn!(
                "bvr_perception: dropping malformed cloud from {}: {}x{} grid with {} points",
                source, cloud.width, cloud.height, cloud.points.len()
            );
            return false;
        }
        cloud.seq = {
            let mut seq = self.seq.lock();
            *seq += 1;
            *seq
        };
        *self.slots[source.index()].lock() = Some(Arc::new(cloud));
        true
    }

    pub fn latest(&self, source: SourceId) -> Option<Arc<SourceCloud>> {
        self.slots[source.index()].lock().clone()
    }

    /// Removes and returns the stored cloud, so it is fused at most once.
    pub fn take(&self, source: SourceId) -> Option<Arc<SourceCloud>> {
        self.slots[source.index()].lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use crate::common::PointXYZ;

    #[test]
    fn newest_frame_wins() {
        let slot = FrameSlot::new();
        assert!(slot.snapshot().is_none());
        slot.store(BvrImage::new(RgbImage::new(2, 2)));
        let held = slot.snapshot().unwrap();
        assert_eq!(slot.store(BvrImage::new(RgbImage::new(4, 4))), 2);

        // An earlier snapshot is unaffected by later stores.
        assert_eq!(held.seq, 1);
        assert_eq!(held.img_width, 2);
        assert_eq!(slot.snapshot().unwrap().img_width, 4);
        assert_eq!(slot.latest_seq(), 2);
    }

    #[test]
    fn cloud_slots_are_independent() {
        let clouds = CloudSlots::new(2);
        let one = SourceId::new(1).unwrap();
        let two = SourceId::new(2).unwrap();
        let three = SourceId::new(3).unwrap();

        assert!(clouds.store(one, SourceCloud::unorganized(vec![PointXYZ::default()])));
        assert!(!clouds.store(three, SourceCloud::unorganized(vec![])));
        assert!(clouds.latest(two).is_none());
        assert!(clouds.latest(three).is_none());

        assert_eq!(clouds.latest(one).unwrap().seq, 1);
        assert!(clouds.take(one).is_some());
        assert!(clouds.take(one).is_none());
        assert_eq!(clouds.enabled_sources().count(), 2);
    }
}
