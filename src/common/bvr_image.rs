use std::time::SystemTime;
use image::{DynamicImage, RgbImage};

/// A decoded camera frame as handed to the engine.
#[derive(Debug, Clone)]
pub struct BvrImage {
    pub image: RgbImage,
    pub img_width: u32,
    pub img_height: u32,
    /// Ingestion sequence number, 0 until the frame passes through a `FrameSlot`.
    pub seq: u64,
    pub stamp: SystemTime,
}

impl Default for BvrImage {
    fn default() -> Self {
        Self::new(RgbImage::default())
    }
}

impl std::ops::Deref for BvrImage {
    type Target = RgbImage;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}

impl From<DynamicImage> for BvrImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image.to_rgb8())
    }
}

impl From<RgbImage> for BvrImage {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}

impl From<BvrImage> for RgbImage {
    fn from(image: BvrImage) -> Self {
        image.image
    }
}

impl BvrImage {
    pub fn new(image: RgbImage) -> Self {
        let (img_width, img_height) = image.dimensions();
        Self {
            image,
            img_width,
            img_height,
            seq: 0,
            stamp: SystemTime::now(),
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.img_width == 0 || self.img_height == 0
    }

    pub fn clone_image(&self) -> RgbImage {
        self.image.clone()
    }
}
