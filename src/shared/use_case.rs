// This is free and unencumbered software released into the public domain.

//! Preview and still-capture use-case descriptions.
//!
//! These carry configuration only. A [`CameraProvider`](crate::shared::CameraProvider)
//! turns them into running streams when they are bound to a lifecycle.

use core::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{width}x{height}")]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().replace('×', "x");
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("Invalid format '{s}'. Use WxH (e.g., 640x640)"))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("Invalid width: {}", w.trim()))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("Invalid height: {}", h.trim()))?;
        Ok(Size::new(width, height))
    }
}

/// Aspect ratio as `numerator:denominator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
#[display("{numerator}:{denominator}")]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const SQUARE: Rational = Rational::new(1, 1);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    /// Largest size with this aspect ratio that fits inside `bounds`.
    pub fn fit_within(&self, bounds: Size) -> Size {
        if !self.is_valid() || bounds.is_empty() {
            return bounds;
        }
        let (n, d) = (self.numerator as u64, self.denominator as u64);
        let (bw, bh) = (bounds.width as u64, bounds.height as u64);
        if bw * d <= bh * n {
            Size::new(bounds.width, (bw * d / n) as u32)
        } else {
            Size::new((bh * n / d) as u32, bounds.height)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, derive_more::Display)]
pub enum CaptureMode {
    /// Save whatever frame is already at hand.
    #[default]
    #[display("min-latency")]
    MinLatency,
    /// Wait for a fresh frame before saving.
    #[display("max-quality")]
    MaxQuality,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewConfig {
    pub target_aspect_ratio: Rational,
    pub target_resolution: Option<Size>,
}

impl PreviewConfig {
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct PreviewConfigBuilder {
    target_aspect_ratio: Option<Rational>,
    target_resolution: Option<Size>,
}

impl PreviewConfigBuilder {
    pub fn target_aspect_ratio(mut self, ratio: Rational) -> Self {
        self.target_aspect_ratio = Some(ratio);
        self
    }

    pub fn target_resolution(mut self, size: Size) -> Self {
        self.target_resolution = Some(size);
        self
    }

    pub fn build(self) -> PreviewConfig {
        PreviewConfig {
            target_aspect_ratio: self.target_aspect_ratio.unwrap_or(Rational::new(4, 3)),
            target_resolution: self.target_resolution,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCaptureConfig {
    pub target_aspect_ratio: Rational,
    pub capture_mode: CaptureMode,
}

impl ImageCaptureConfig {
    pub fn builder() -> ImageCaptureConfigBuilder {
        ImageCaptureConfigBuilder::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImageCaptureConfigBuilder {
    target_aspect_ratio: Option<Rational>,
    capture_mode: CaptureMode,
}

impl ImageCaptureConfigBuilder {
    pub fn target_aspect_ratio(mut self, ratio: Rational) -> Self {
        self.target_aspect_ratio = Some(ratio);
        self
    }

    pub fn capture_mode(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    pub fn build(self) -> ImageCaptureConfig {
        ImageCaptureConfig {
            target_aspect_ratio: self.target_aspect_ratio.unwrap_or(Rational::new(4, 3)),
            capture_mode: self.capture_mode,
        }
    }
}

/// Continuous viewfinder stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub config: PreviewConfig,
}

impl Preview {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    /// Size of the frames handed to the preview surface for a given camera
    /// output size.
    pub fn output_size(&self, camera: Size) -> Size {
        self.config
            .target_resolution
            .unwrap_or_else(|| self.config.target_aspect_ratio.fit_within(camera))
    }
}

/// Single still-image capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCapture {
    pub config: ImageCaptureConfig,
}

impl ImageCapture {
    pub fn new(config: ImageCaptureConfig) -> Self {
        Self { config }
    }

    /// Without an explicit resolution the capture keeps the largest crop of
    /// the camera output that matches the aspect ratio.
    pub fn output_size(&self, camera: Size) -> Size {
        self.config.target_aspect_ratio.fit_within(camera)
    }
}
