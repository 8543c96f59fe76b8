
mod bvr_box;
mod bvr_detection;
mod bvr_image;
mod bounding_boxes;
mod class_bucket;
mod colour_table;
mod dispatch_config;
mod inference_device;
mod point_cloud;

pub use bvr_box::*;
pub use bvr_detection::*;
pub use bvr_image::*;
pub use bounding_boxes::*;
pub use class_bucket::*;
pub use colour_table::*;
pub use dispatch_config::*;
pub use inference_device::*;
pub use point_cloud::*;
