// This is free and unencumbered software released into the public domain.

use super::{
    Camera, CameraBackend, CameraConfig, CameraDriver, CameraError, CameraEvent, Dispatcher,
    drivers,
};
use std::sync::mpsc::sync_channel;

const EVENTS_CAPACITY: usize = 64;

/// Picks the backend for a device URL. `synthetic:` selects the test pattern,
/// everything else goes through ffmpeg.
pub fn backend_for(input_url: &str) -> CameraBackend {
    if input_url.trim().starts_with("synthetic:") {
        CameraBackend::Synthetic
    } else {
        CameraBackend::Ffmpeg
    }
}

pub fn open_camera(input_url: impl AsRef<str>, config: CameraConfig) -> Result<Camera, CameraError> {
    let input_url = input_url.as_ref();
    let backend = backend_for(input_url);

    let (events_tx, events_rx) = sync_channel::<CameraEvent>(EVENTS_CAPACITY);
    let dispatcher = Dispatcher::new(config.buffer_frames, backend, events_tx.clone());
    let frame_tx = dispatcher.sender();

    let driver: Box<dyn CameraDriver> = match backend {
        CameraBackend::Synthetic => Box::new(drivers::synthetic::SyntheticCameraDriver::open(
            config.clone(),
            frame_tx,
            events_tx,
        )?),
        CameraBackend::Ffmpeg => Box::new(drivers::ffmpeg::FfmpegCameraDriver::open(
            input_url,
            config.clone(),
            frame_tx,
            events_tx,
        )?),
    };

    Ok(Camera::new(config, driver, dispatcher, events_rx))
}
