// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraError, DisplayRotation, Frame, OrientationTransform, Size};
use image::imageops;

/// Source of the raw display rotation code.
///
/// Codes outside `0..=3` can show up while the display is mid-turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VirtualDisplay {
    rotation_code: i32,
}

impl VirtualDisplay {
    pub fn new(rotation: DisplayRotation) -> Self {
        Self {
            rotation_code: rotation.code(),
        }
    }

    pub fn rotation_code(&self) -> i32 {
        self.rotation_code
    }

    pub fn set_rotation_code(&mut self, code: i32) {
        self.rotation_code = code;
    }
}

/// The view the live preview is drawn into.
#[derive(Clone, Debug, Default)]
pub struct PreviewSurface {
    size: Size,
    transform: OrientationTransform,
    attached: bool,
    displayed: Option<Frame>,
}

impl PreviewSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn transform(&self) -> OrientationTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: OrientationTransform) {
        self.transform = transform;
    }

    /// Recomputes the corrective transform for the current size and the given
    /// raw rotation code. Unrecognized codes leave the current transform alone
    /// and return `false`.
    pub fn update_transform(&mut self, rotation_code: i32) -> bool {
        let Some(rotation) = DisplayRotation::from_code(rotation_code) else {
            return false;
        };
        self.transform =
            OrientationTransform::for_rotation(self.size.width, self.size.height, rotation);
        true
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Marks a new preview output as attached; previously displayed content
    /// belonged to the old output and is discarded.
    pub fn attach_output(&mut self) {
        self.attached = true;
        self.displayed = None;
    }

    pub fn detach_output(&mut self) {
        self.attached = false;
        self.displayed = None;
    }

    /// Applies the current transform to a preview frame.
    pub fn render(&self, frame: &Frame) -> Result<Frame, CameraError> {
        let turns = self.transform.quarter_turns().unwrap_or(0);
        if turns == 0 {
            return Ok(frame.clone());
        }
        let img = frame.to_rgb_image()?;
        let rotated = match turns {
            1 => imageops::rotate90(&img),
            2 => imageops::rotate180(&img),
            _ => imageops::rotate270(&img),
        };
        Ok(Frame::from_rgb_image(rotated).with_timestamp_ns(frame.timestamp_ns))
    }

    /// Renders and keeps the frame as the surface's current content.
    pub fn present(&mut self, frame: &Frame) -> Result<&Frame, CameraError> {
        let rendered = self.render(frame)?;
        Ok(self.displayed.insert(rendered))
    }

    pub fn displayed(&self) -> Option<&Frame> {
        self.displayed.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn recognized_codes_replace_the_transform() {
        let mut surface = PreviewSurface::new(Size::new(640, 480));
        assert!(surface.update_transform(1));
        assert_eq!(
            surface.transform(),
            OrientationTransform {
                rotation_degrees: -90.0,
                pivot_x: 320.0,
                pivot_y: 240.0,
            }
        );
    }

    #[test]
    fn unrecognized_codes_keep_the_previous_transform() {
        let mut surface = PreviewSurface::new(Size::new(640, 480));
        assert!(surface.update_transform(2));
        let before = surface.transform();
        for code in [-1, 4, 7, 270] {
            assert!(!surface.update_transform(code));
            assert_eq!(surface.transform(), before);
        }
    }

    #[test]
    fn transform_tracks_layout_changes() {
        let mut surface = PreviewSurface::new(Size::new(640, 640));
        surface.update_transform(3);
        surface.set_size(Size::new(1080, 720));
        surface.update_transform(3);
        assert_eq!(surface.transform().pivot(), (540.0, 360.0));
        assert_eq!(surface.transform().rotation_degrees, -270.0);
    }

    #[test]
    fn rendering_a_quarter_turn_swaps_dimensions() {
        let mut surface = PreviewSurface::new(Size::new(64, 32));
        surface.update_transform(1);
        let mut img = RgbImage::new(64, 32);
        img.put_pixel(32, 0, Rgb([255, 0, 0]));
        let frame = Frame::from_rgb_image(img);

        let rendered = surface.render(&frame).unwrap();
        assert_eq!((rendered.width, rendered.height), (32, 64));

        // Counter-clockwise: the top edge ends up on the left edge.
        let out = rendered.to_rgb_image().unwrap();
        assert_eq!(out.get_pixel(0, 31), &Rgb([255, 0, 0]));
    }

    #[test]
    fn present_keeps_the_latest_frame_until_detached() {
        let mut surface = PreviewSurface::new(Size::new(8, 8));
        surface.attach_output();
        let frame = Frame::from_rgb_image(RgbImage::new(8, 8));
        surface.present(&frame).unwrap();
        assert!(surface.displayed().is_some());
        surface.detach_output();
        assert!(surface.displayed().is_none());
    }
}
