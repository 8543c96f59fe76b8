//! Point cloud types
//!
//! Depth data from the robots' RGB-D sensors, stored as an organized grid
//! (row-major, one point per depth pixel) so a 2D box can be mapped onto it.

use std::time::SystemTime;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Basic 3D point (XYZ only), meters in the sensor frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointXYZ {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl PointXYZ {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Invalid depth returns are stored as NaN.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceCloud {
    pub width: u32,
    pub height: u32,
    pub points: Vec<PointXYZ>,
    /// Ingestion sequence number, assigned by `CloudSlots`.
    pub seq: u64,
    pub stamp: SystemTime,
}

impl SourceCloud {
    /// Builds a `width` x `height` grid; `points` must be row-major and complete.
    pub fn organized(width: u32, height: u32, points: Vec<PointXYZ>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if points.len() != expected {
            anyhow::bail!(
                "Organized cloud of {}x{} needs {} points, got {}",
                width, height, expected, points.len()
            );
        }
        Ok(Self {
            width,
            height,
            points,
            seq: 0,
            stamp: SystemTime::now(),
        })
    }

    /// A flat cloud without pixel correspondence (height 1).
    pub fn unorganized(points: Vec<PointXYZ>) -> Self {
        Self {
            width: points.len() as u32,
            height: 1,
            points,
            seq: 0,
            stamp: SystemTime::now(),
        }
    }

    /// True when `points` holds exactly `width * height` entries. Fields are
    /// public, so a hand-built cloud may violate this.
    pub fn is_consistent(&self) -> bool {
        self.points.len() == self.width as usize * self.height as usize
    }

    pub fn is_organized(&self) -> bool {
        self.height > 1 && self.is_consistent()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn at(&self, u: u32, v: u32) -> Option<&PointXYZ> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.points.get(v as usize * self.width as usize + u as usize)
    }

    /// Finite points in columns `u0..u1` and rows `v0..v1` (exclusive ends,
    /// clipped to the grid).
    pub fn region(&self, u0: u32, v0: u32, u1: u32, v1: u32) -> Vec<PointXYZ> {
        let (u1, v1) = (u1.min(self.width), v1.min(self.height));
        (v0..v1)
            .flat_map(|v| (u0..u1).map(move |u| (u, v)))
            .filter_map(|(u, v)| self.at(u, v))
            .filter(|p| p.is_finite())
            .copied()
            .collect()
    }
}
