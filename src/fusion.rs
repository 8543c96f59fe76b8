//! Association of 2D detections with a source's organized point cloud.
//!
//! Best effort: any detection that cannot be mapped onto the cloud passes
//! through unenriched.

use rayon::prelude::*;
use crate::common::{BvrBox, BvrDetection, CloudRegion, FusedDetection, PointXYZ, SourceCloud};

/// Enriches every detection with the cloud points inside its box.
///
/// Boxes are in pixels of a `frame_width` x `frame_height` frame and are
/// rescaled onto the cloud grid, so the depth sensor may run at a different
/// resolution than the camera.
pub fn fuse_with_cloud(
    detections: &[BvrDetection],
    cloud: Option<&SourceCloud>,
    frame_width: u32,
    frame_height: u32,
) -> Vec<FusedDetection> {
    let cloud = match cloud {
        Some(cloud) if cloud.is_organized() && frame_width > 0 && frame_height > 0 => cloud,
        Some(_) => {
            log::debug!("bvr_perception: cloud is not organized, passing detections through");
            return detections.iter().cloned().map(FusedDetection::unenriched).collect();
        }
        None => return detections.iter().cloned().map(FusedDetection::unenriched).collect(),
    };

    detections
        .par_iter()
        .map(|detection| FusedDetection {
            detection: detection.clone(),
            region: cloud_region(&detection.bbox, cloud, frame_width, frame_height),
        })
        .collect()
}

/// Finite points of `cloud` under `bbox`, `None` when there are none.
pub fn cloud_region(bbox: &BvrBox, cloud: &SourceCloud, frame_width: u32, frame_height: u32) -> Option<CloudRegion> {
    let sx = cloud.width as f32 / frame_width as f32;
    let sy = cloud.height as f32 / frame_height as f32;
    let grid = bbox.scaled(sx, sy).clamped(cloud.width as f32, cloud.height as f32);

    let u0 = grid.x1.floor().max(0.) as u32;
    let v0 = grid.y1.floor().max(0.) as u32;
    let u1 = grid.x2.ceil().max(0.) as u32;
    let v1 = grid.y2.ceil().max(0.) as u32;

    let points = cloud.region(u0, v0, u1, v1);
    let centroid = centroid(&points)?;
    Some(CloudRegion { points, centroid })
}

fn centroid(points: &[PointXYZ]) -> Option<PointXYZ> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (x, y, z) = points
        .iter()
        .fold((0., 0., 0.), |(x, y, z), p| (x + p.x, y + p.y, z + p.z));
    Some(PointXYZ::new(x / n, y / n, z / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_points() {
        let c = centroid(&[PointXYZ::new(0., 0., 1.), PointXYZ::new(2., 2., 3.)]).unwrap();
        assert_eq!(c, PointXYZ::new(1., 1., 2.));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn box_is_rescaled_to_cloud_grid() {
        // 4x4 cloud for an 8x8 frame; z encodes the column.
        let points = (0..16)
            .map(|i| PointXYZ::new(0., 0., (i % 4) as f32))
            .collect();
        let cloud = SourceCloud::organized(4, 4, points).unwrap();
        let bbox = BvrBox::default().with_x1y1_wh(4., 0., 4., 2.);

        let region = cloud_region(&bbox, &cloud, 8, 8).unwrap();
        assert_eq!(region.points.len(), 2);
        assert_eq!(region.centroid.z, 2.5);
    }
}
