// This is free and unencumbered software released into the public domain.

use crate::shared::{DisplayRotation, Locale, MediaDirs, PermissionPolicy, PixelFormat, Size};
use std::{path::PathBuf, time::Duration};

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pixel_format: Option<PixelFormat>,
    pub buffer_frames: usize,
    pub diagnostics: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: 640,
            height: 480,
            fps: 30.0,
            pixel_format: None,
            buffer_frames: 2,
            diagnostics: false,
        }
    }
}

impl CameraConfig {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            ..Default::default()
        }
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_buffer_frames(mut self, n: usize) -> Self {
        self.buffer_frames = n.max(1);
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn input_size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Everything the screen needs besides its collaborators.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub surface: Size,
    pub rotation: DisplayRotation,
    pub media_dirs: MediaDirs,
    pub data_dir: Option<PathBuf>,
    pub locale: Locale,
    pub permission_policy: PermissionPolicy,
    pub preview_out: Option<PathBuf>,
    pub preview_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            surface: Size::new(640, 640),
            rotation: DisplayRotation::Rotation0,
            media_dirs: MediaDirs::default(),
            data_dir: None,
            locale: Locale::En,
            permission_policy: PermissionPolicy::Prompt,
            preview_out: None,
            preview_interval: Duration::from_secs(1),
        }
    }
}

impl AppConfig {
    /// Defaults filled in from the environment: media and data directories,
    /// and the locale.
    pub fn from_env() -> Self {
        Self {
            media_dirs: MediaDirs::from_env(),
            data_dir: default_data_dir(),
            locale: Locale::from_env(),
            ..Default::default()
        }
    }

    pub fn device(&self) -> &str {
        self.camera.device.as_deref().unwrap_or("")
    }

    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dirs = MediaDirs::new([dir.into()]);
        self
    }
}

/// `$VIEWFINDER_DATA_DIR`, else `$HOME/.local/share/viewfinder`.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("VIEWFINDER_DATA_DIR").filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    std::env::var_os("HOME")
        .filter(|d| !d.is_empty())
        .map(|home| PathBuf::from(home).join(".local/share/viewfinder"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_square_preview() {
        let config = AppConfig::default();
        assert_eq!(config.surface, Size::new(640, 640));
        assert_eq!(config.camera.input_size(), Size::new(640, 480));
        assert_eq!(config.permission_policy, PermissionPolicy::Prompt);
        assert!(config.media_dirs.first().is_none());
    }

    #[test]
    fn buffer_frames_never_drop_to_zero() {
        assert_eq!(CameraConfig::default().with_buffer_frames(0).buffer_frames, 1);
    }
}
