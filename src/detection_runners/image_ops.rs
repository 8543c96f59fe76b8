//! Functions to preprocess frames for the network.

use anyhow::{bail, Result};
use fast_image_resize::{
    images::Image as FirImage,
    pixels::PixelType,
    FilterType, ResizeAlg, ResizeOptions, Resizer,
};
use ndarray::{Array, IxDyn};
use rayon::prelude::*;
use crate::common::{BvrBox, BvrImage};

/// Grey used to fill the unused part of the network input.
const PAD_VALUE: u8 = 114;

/// How a frame was fitted into the network input: scaled uniformly and
/// placed in the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub src_width: u32,
    pub src_height: u32,
    pub net_width: u32,
    pub net_height: u32,
}

impl Letterbox {
    pub fn new(src_width: u32, src_height: u32, net_width: u32, net_height: u32) -> Self {
        let scale = (net_width as f32 / src_width as f32).min(net_height as f32 / src_height as f32);
        Self {
            scale,
            src_width,
            src_height,
            net_width,
            net_height,
        }
    }

    /// Size of the resized frame inside the network input.
    pub fn resized_dims(&self) -> (u32, u32) {
        let w = ((self.src_width as f32 * self.scale).round() as u32).clamp(1, self.net_width);
        let h = ((self.src_height as f32 * self.scale).round() as u32).clamp(1, self.net_height);
        (w, h)
    }

    /// Maps a box from network coordinates back onto the source frame.
    pub fn to_frame(&self, bbox: &BvrBox) -> BvrBox {
        let inv = 1. / self.scale;
        bbox.scaled(inv, inv)
            .clamped(self.src_width as f32, self.src_height as f32)
    }
}

/// Letterboxes `frame` into a `[1, 3, net_height, net_width]` tensor in `[0, 1]`.
pub fn letterbox_tensor(frame: &BvrImage, net_width: u32, net_height: u32) -> Result<(Array<f32, IxDyn>, Letterbox)> {
    if frame.is_empty() {
        bail!("Cannot preprocess an empty frame");
    }
    let letterbox = Letterbox::new(frame.img_width, frame.img_height, net_width, net_height);
    let (new_w, new_h) = letterbox.resized_dims();

    let src = FirImage::from_vec_u8(frame.img_width, frame.img_height, frame.image.as_raw().clone(), PixelType::U8x3)?;
    let mut dst = FirImage::new(new_w, new_h, PixelType::U8x3);
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    let mut resizer = Resizer::new();
    resizer.resize(&src, &mut dst, &options)?;

    let padded = pad_top_left(dst.buffer(), new_w, new_h, net_width, net_height);
    let flat = nchw_normalize_flat(&padded, net_width as usize, net_height as usize)?;
    let tensor = Array::from_shape_vec((1, 3, net_height as usize, net_width as usize), flat)?.into_dyn();
    Ok((tensor, letterbox))
}

fn pad_top_left(buf: &[u8], w: u32, h: u32, net_width: u32, net_height: u32) -> Vec<u8> {
    let (w, h, nw) = (w as usize, h as usize, net_width as usize);
    let mut padded = vec![PAD_VALUE; nw * net_height as usize * 3];
    for row in 0..h {
        let src = &buf[row * w * 3..(row + 1) * w * 3];
        padded[row * nw * 3..row * nw * 3 + w * 3].copy_from_slice(src);
    }
    padded
}

fn nchw_normalize_flat(buf: &[u8], w: usize, h: usize) -> Result<Vec<f32>> {
    if buf.len() != w * h * 3 {
        bail!("Unexpected buffer size: got {}, expected {}", buf.len(), w * h * 3);
    }

    let planes: Vec<Vec<f32>> = (0..3usize)
        .into_par_iter()
        .map(|c| buf.iter().skip(c).step_by(3).map(|&v| v as f32 / 255.0).collect())
        .collect();

    Ok(planes.concat())
}
