// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraError, Rational, Size};
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage, imageops};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Bgra8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Bgra8 => 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub pixel_format: PixelFormat,
    pub timestamp_ns: u64,
}

impl Frame {
    pub fn new_rgb8(data: Bytes, width: u32, height: u32, stride: u32) -> Self {
        Self {
            data,
            width,
            height,
            stride,
            pixel_format: PixelFormat::Rgb8,
            timestamp_ns: 0,
        }
    }

    pub fn new_bgra(data: Bytes, width: u32, height: u32, stride: u32) -> Self {
        Self {
            data,
            width,
            height,
            stride,
            pixel_format: PixelFormat::Bgra8,
            timestamp_ns: 0,
        }
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new_rgb8(Bytes::from(img.into_raw()), width, height, width * 3)
    }

    pub fn with_timestamp_ns(mut self, ts: u64) -> Self {
        self.timestamp_ns = ts;
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Copies the frame into a tightly packed RGB image, dropping row padding
    /// and converting BGRA if needed.
    pub fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        let bpp = self.pixel_format.bytes_per_pixel();
        let row_len = self.width as usize * bpp;
        let stride = self.stride as usize;
        if row_len == 0 || self.height == 0 {
            return Ok(RgbImage::new(self.width, self.height));
        }
        if stride < row_len || self.data.len() < stride * self.height as usize {
            return Err(CameraError::other(format!(
                "frame buffer too small for {}x{} (stride {}, {} bytes)",
                self.width,
                self.height,
                self.stride,
                self.data.len()
            )));
        }

        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in self.data.chunks(stride).take(self.height as usize) {
            let row = &row[..row_len];
            match self.pixel_format {
                PixelFormat::Rgb8 => out.extend_from_slice(row),
                PixelFormat::Bgra8 => {
                    for px in row.chunks_exact(4) {
                        out.extend_from_slice(&[px[2], px[1], px[0]]);
                    }
                },
            }
        }

        ImageBuffer::<Rgb<u8>, _>::from_raw(self.width, self.height, out)
            .ok_or_else(|| CameraError::other("frame dimensions do not match pixel data"))
    }

    /// Center-crops the frame to the largest region with the given aspect ratio.
    pub fn crop_to_aspect(&self, aspect: Rational) -> Result<Frame, CameraError> {
        let region = aspect.fit_within(self.size());
        if region == self.size() && self.pixel_format == PixelFormat::Rgb8 {
            return Ok(self.clone());
        }
        let img = self.to_rgb_image()?;
        let x = (self.width - region.width) / 2;
        let y = (self.height - region.height) / 2;
        let cropped = imageops::crop_imm(&img, x, y, region.width, region.height).to_image();
        Ok(Frame::from_rgb_image(cropped).with_timestamp_ns(self.timestamp_ns))
    }

    pub fn resize_to(&self, target: Size) -> Result<Frame, CameraError> {
        if target == self.size() && self.pixel_format == PixelFormat::Rgb8 {
            return Ok(self.clone());
        }
        if target.is_empty() {
            return Err(CameraError::invalid_config(format!(
                "cannot resize frame to {target}"
            )));
        }
        let img = self.to_rgb_image()?;
        let resized = imageops::resize(
            &img,
            target.width,
            target.height,
            imageops::FilterType::Triangle,
        );
        Ok(Frame::from_rgb_image(resized).with_timestamp_ns(self.timestamp_ns))
    }

    pub fn to_dynamic_image(&self) -> Result<DynamicImage, CameraError> {
        Ok(DynamicImage::ImageRgb8(self.to_rgb_image()?))
    }
}
