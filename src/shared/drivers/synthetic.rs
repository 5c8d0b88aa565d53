// This is free and unencumbered software released into the public domain.

//! Test-pattern camera: moving color bars at the configured size and rate.
//! Selected with the device URL `synthetic:`.

use crate::shared::{
    CameraBackend, CameraConfig, CameraDriver, CameraError, CameraEvent, Frame, FrameMsg,
    drivers::ffmpeg::now_ns_best_effort, try_send_frame,
};
use bytes::Bytes;
use std::{
    any::Any,
    borrow::Cow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::SyncSender,
    },
    thread::JoinHandle,
    time::Duration,
};

const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

#[derive(Debug)]
pub struct SyntheticCameraDriver {
    config: CameraConfig,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    frame_tx: SyncSender<FrameMsg>,
    events_tx: SyncSender<CameraEvent>,
}

impl SyntheticCameraDriver {
    pub fn open(
        config: CameraConfig,
        frame_tx: SyncSender<FrameMsg>,
        events_tx: SyncSender<CameraEvent>,
    ) -> Result<Self, CameraError> {
        if config.width == 0 || config.height == 0 {
            return Err(CameraError::invalid_config(format!(
                "camera size {}x{} is empty",
                config.width, config.height
            )));
        }
        Ok(Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
            join: None,
            frame_tx,
            events_tx,
        })
    }
}

/// Renders frame `sequence` of the pattern; the bars scroll one column per frame.
pub fn pattern_frame(width: u32, height: u32, sequence: u64) -> Frame {
    let stride = width * 3;
    let mut data = Vec::with_capacity(stride as usize * height as usize);
    for _y in 0..height {
        for x in 0..width {
            let shifted = (x as u64 + sequence) % width as u64;
            let bar = (shifted * BARS.len() as u64 / width as u64) as usize;
            data.extend_from_slice(&BARS[bar]);
        }
    }
    Frame::new_rgb8(Bytes::from(data), width, height, stride)
}

impl dogma::Named for SyntheticCameraDriver {
    fn name(&self) -> Cow<'_, str> {
        "synthetic".into()
    }
}

impl CameraDriver for SyntheticCameraDriver {
    fn backend(&self) -> CameraBackend {
        CameraBackend::Synthetic
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if self.join.is_some() {
            return Ok(());
        }
        self.stop.store(false, Ordering::Relaxed);

        let (width, height) = (self.config.width, self.config.height);
        let interval = Duration::from_secs_f64(1.0 / self.config.fps.max(0.1));
        let stop = Arc::clone(&self.stop);
        let frame_tx = self.frame_tx.clone();
        let events_tx = self.events_tx.clone();

        self.join = Some(std::thread::spawn(move || {
            let mut sequence = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let frame = pattern_frame(width, height, sequence)
                    .with_timestamp_ns(now_ns_best_effort());
                if !try_send_frame(&frame_tx, &events_tx, CameraBackend::Synthetic, frame) {
                    break;
                }
                sequence += 1;
                std::thread::sleep(interval);
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for SyntheticCameraDriver {
    fn drop(&mut self) {
        let _ = CameraDriver::stop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_has_the_requested_geometry() {
        let frame = pattern_frame(70, 10, 0);
        assert_eq!(frame.data.len(), 70 * 10 * 3);
        assert_eq!(&frame.data[..3], &BARS[0]);
        assert_eq!(&frame.data[69 * 3..70 * 3], &BARS[6]);
    }

    #[test]
    fn pattern_scrolls_with_the_sequence() {
        let a = pattern_frame(70, 1, 0);
        let b = pattern_frame(70, 1, 10);
        assert_ne!(a.data, b.data);
        assert_eq!(&b.data[..3], &BARS[1]);
    }
}
