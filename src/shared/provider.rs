// This is free and unencumbered software released into the public domain.

//! Lifecycle binding of preview and still-capture use-cases to a camera.

use crate::shared::{
    Camera, CameraConfig, CameraError, CameraEvent, CaptureError, CaptureMode, CaptureResult,
    Frame, FrameSink, ImageCapture, Preview, UseCaseError, open_camera,
};
use image::{ExtendedColorType, ImageEncoder, ImageError, codecs::jpeg::JpegEncoder};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

/// Receives the single outcome of a `take_picture` call.
pub type CaptureCallback = Box<dyn FnOnce(CaptureResult) + Send + 'static>;

/// Receives preview frames, already cropped and scaled for the preview.
pub type PreviewSink = Arc<dyn Fn(Frame) + Send + Sync + 'static>;

pub trait CameraProvider {
    /// Binds both use-cases in one step. Binding again replaces the previous
    /// binding.
    fn bind_to_lifecycle(
        &mut self,
        preview: &Preview,
        image_capture: &ImageCapture,
    ) -> Result<(), CameraError>;

    /// Captures one still into `file`. `on_result` runs exactly once, on an
    /// arbitrary thread.
    fn take_picture(&mut self, file: PathBuf, on_result: CaptureCallback);

    fn unbind_all(&mut self);
}

#[derive(Debug, Default)]
struct LatestFrame {
    slot: Mutex<(u64, Option<Frame>)>,
    fresh: Condvar,
}

impl LatestFrame {
    fn store(&self, frame: &Frame) {
        let mut guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        guard.0 += 1;
        guard.1 = Some(frame.clone());
        self.fresh.notify_all();
    }

    fn sequence(&self) -> u64 {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).0
    }

    fn clear(&self) {
        let mut guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        guard.1 = None;
    }

    /// Waits until a frame newer than `after` is stored, or the timeout passes.
    fn wait_newer(&self, after: u64, timeout: Duration) -> Option<Frame> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if guard.0 > after {
                if let Some(frame) = &guard.1 {
                    return Some(frame.clone());
                }
            }
            let left = deadline.checked_duration_since(Instant::now())?;
            guard = self
                .fresh
                .wait_timeout(guard, left)
                .unwrap_or_else(|p| p.into_inner())
                .0;
        }
    }
}

struct Binding {
    camera: Camera,
    image_capture: ImageCapture,
}

/// Provider backed by a frame camera (ffmpeg or the synthetic pattern).
pub struct FrameCameraProvider {
    device: String,
    config: CameraConfig,
    preview_sink: Option<PreviewSink>,
    latest: Arc<LatestFrame>,
    binding: Option<Binding>,
    capture_timeout: Duration,
    jpeg_quality: u8,
}

impl FrameCameraProvider {
    pub fn new(device: impl Into<String>, config: CameraConfig) -> Self {
        Self {
            device: device.into(),
            config,
            preview_sink: None,
            latest: Arc::default(),
            binding: None,
            capture_timeout: Duration::from_secs(3),
            jpeg_quality: 90,
        }
    }

    pub fn with_preview_sink(mut self, sink: PreviewSink) -> Self {
        self.preview_sink = Some(sink);
        self
    }

    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Driver notifications received since the last call.
    pub fn drain_events(&self) -> Vec<CameraEvent> {
        match &self.binding {
            Some(b) => b.camera.events().try_iter().collect(),
            None => Vec::new(),
        }
    }

    fn preview_frame_sink(&self, preview: &Preview) -> Option<FrameSink> {
        let sink = self.preview_sink.clone()?;
        let aspect = preview.config.target_aspect_ratio;
        let preview = preview.clone();
        Some(Arc::new(move |frame: &Frame| {
            let out = frame
                .crop_to_aspect(aspect)
                .and_then(|f| f.resize_to(preview.output_size(frame.size())));
            if let Ok(out) = out {
                sink(out);
            }
        }))
    }
}

impl CameraProvider for FrameCameraProvider {
    fn bind_to_lifecycle(
        &mut self,
        preview: &Preview,
        image_capture: &ImageCapture,
    ) -> Result<(), CameraError> {
        self.unbind_all();

        let mut camera = open_camera(&self.device, self.config.clone())?;
        if let Some(sink) = self.preview_frame_sink(preview) {
            camera.add_sink(sink);
        }
        let latest = Arc::clone(&self.latest);
        camera.add_sink(Arc::new(move |frame: &Frame| latest.store(frame)));
        camera.start()?;

        self.binding = Some(Binding {
            camera,
            image_capture: image_capture.clone(),
        });
        Ok(())
    }

    fn take_picture(&mut self, file: PathBuf, on_result: CaptureCallback) {
        let Some(binding) = &self.binding else {
            on_result(Err(CaptureError::new(
                UseCaseError::NoFrame,
                "camera is not bound",
            )));
            return;
        };

        let capture = binding.image_capture.clone();
        let latest = Arc::clone(&self.latest);
        let timeout = self.capture_timeout;
        let quality = self.jpeg_quality;
        let after = match capture.config.capture_mode {
            CaptureMode::MinLatency => 0,
            CaptureMode::MaxQuality => latest.sequence(),
        };

        std::thread::spawn(move || {
            let result = match latest.wait_newer(after, timeout) {
                Some(frame) => save_still(&frame, &capture, &file, quality),
                None => Err(CaptureError::new(
                    UseCaseError::NoFrame,
                    format!("no frame within {} ms", timeout.as_millis()),
                )),
            };
            on_result(result);
        });
    }

    fn unbind_all(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            let _ = binding.camera.stop();
        }
        self.latest.clear();
    }
}

impl Drop for FrameCameraProvider {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

fn save_still(frame: &Frame, capture: &ImageCapture, file: &Path, quality: u8) -> CaptureResult {
    let still = frame
        .crop_to_aspect(capture.config.target_aspect_ratio)
        .and_then(|f| f.to_rgb_image())
        .map_err(|e| {
            CaptureError::new(UseCaseError::Encode, e.to_string()).with_source(e)
        })?;

    if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(CaptureError::file_io)?;
    }
    let out = fs::File::create(file).map_err(CaptureError::file_io)?;
    let mut out = BufWriter::new(out);

    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(
            still.as_raw(),
            still.width(),
            still.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| match e {
            ImageError::IoError(io) => CaptureError::file_io(io),
            other => CaptureError::new(UseCaseError::Encode, other.to_string()).with_source(other),
        })?;
    out.flush().map_err(CaptureError::file_io)?;

    Ok(fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn min_latency_waits_for_the_first_frame_only() {
        let latest = Arc::new(LatestFrame::default());
        assert!(latest.wait_newer(0, Duration::from_millis(10)).is_none());

        let frame = crate::shared::drivers::synthetic::pattern_frame(4, 4, 0);
        latest.store(&frame);
        assert!(latest.wait_newer(0, Duration::from_millis(10)).is_some());
    }

    #[test]
    fn max_quality_waits_for_a_fresh_frame() {
        let latest = Arc::new(LatestFrame::default());
        let frame = crate::shared::drivers::synthetic::pattern_frame(4, 4, 0);
        latest.store(&frame);
        let seen = latest.sequence();
        assert!(latest.wait_newer(seen, Duration::from_millis(10)).is_none());

        let producer = {
            let latest = Arc::clone(&latest);
            let frame = frame.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                latest.store(&frame);
            })
        };
        assert!(latest.wait_newer(seen, Duration::from_secs(2)).is_some());
        producer.join().unwrap();
    }

    #[test]
    fn unbound_capture_fails_immediately() {
        let mut provider = FrameCameraProvider::new("synthetic:", CameraConfig::default());
        let (tx, rx) = std::sync::mpsc::channel();
        provider.take_picture(
            PathBuf::from("unused.jpg"),
            Box::new(move |r| {
                let _ = tx.send(r);
            }),
        );
        let err = rx.recv().unwrap().unwrap_err();
        assert_eq!(err.kind, UseCaseError::NoFrame);
    }
}
