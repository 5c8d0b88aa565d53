// This is free and unencumbered software released into the public domain.

//! Desktop capture through an `ffmpeg` child process emitting raw RGB24.

use crate::shared::{
    CameraBackend, CameraConfig, CameraDriver, CameraError, CameraEvent, Frame, FrameMsg,
    try_send_frame,
};
use bytes::Bytes;
use std::{
    any::Any,
    borrow::Cow,
    env,
    io::Read,
    process::{Child, Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::SyncSender,
    },
    thread::JoinHandle,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub struct FfmpegCameraDriver {
    input_device: String,
    config: CameraConfig,
    child: Option<Child>,
    stop: Arc<AtomicBool>,
    reader_join: Option<JoinHandle<()>>,
    frame_tx: SyncSender<FrameMsg>,
    events_tx: SyncSender<CameraEvent>,
}

impl core::fmt::Debug for FfmpegCameraDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FfmpegCameraDriver")
            .field("input_device", &self.input_device)
            .field("config", &self.config)
            .field("child", &self.child.as_ref().map(|_| "<child>"))
            .finish()
    }
}

impl FfmpegCameraDriver {
    pub fn open(
        input_url: impl AsRef<str>,
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
            input_device: input_device(input_url.as_ref().trim()),
            config,
            child: None,
            stop: Arc::new(AtomicBool::new(false)),
            reader_join: None,
            frame_tx,
            events_tx,
        })
    }

    pub fn input_device(&self) -> &str {
        &self.input_device
    }

    fn spawn(&self) -> Result<Child, CameraError> {
        let mut ffargs: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-nostats".into(),
            "-f".into(),
            ffmpeg_format().into(),
            "-loglevel".into(),
            "error".into(),
            "-video_size".into(),
            format!("{}x{}", self.config.width, self.config.height),
            "-framerate".into(),
            format!("{}", self.config.fps.round().max(1.0)),
        ];

        #[cfg(target_os = "macos")]
        ffargs.extend(["-pixel_format".into(), "0rgb".into()]);

        ffargs.extend([
            "-i".into(),
            self.input_device.clone(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-f".into(),
            "rawvideo".into(),
            "pipe:1".into(),
        ]);

        let stderr =
            if self.config.diagnostics || env::var_os("VIEWFINDER_FFMPEG_STDERR").is_some() {
                Stdio::inherit()
            } else {
                Stdio::null()
            };

        Command::new("ffmpeg")
            .args(&ffargs)
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|e| CameraError::driver("spawning ffmpeg", e))
    }

    fn stop_child(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        #[cfg(unix)]
        {
            // Give ffmpeg a chance to release the device cleanly.
            unsafe {
                let _ = libc::kill(child.id() as i32, libc::SIGTERM);
            }
            let start = std::time::Instant::now();
            while start.elapsed() < Duration::from_millis(900) {
                if let Ok(Some(_)) = child.try_wait() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }

        let _ = child.kill();
        let _ = child.wait();
    }
}

impl dogma::Named for FfmpegCameraDriver {
    fn name(&self) -> Cow<'_, str> {
        "ffmpeg".into()
    }
}

impl CameraDriver for FfmpegCameraDriver {
    fn backend(&self) -> CameraBackend {
        CameraBackend::Ffmpeg
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if self.child.is_some() {
            return Ok(());
        }

        self.stop.store(false, Ordering::Relaxed);

        let mut child = self.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CameraError::other("ffmpeg stdout not piped"))?;

        let width = self.config.width;
        let height = self.config.height;
        let stride = width.saturating_mul(3);
        let frame_size = (stride as usize).saturating_mul(height as usize);

        let stop = Arc::clone(&self.stop);
        let frame_tx = self.frame_tx.clone();
        let events_tx = self.events_tx.clone();

        let join = std::thread::spawn(move || {
            let mut reader = std::io::BufReader::new(stdout);

            while !stop.load(Ordering::Relaxed) {
                let mut buf = vec![0u8; frame_size];
                match reader.read_exact(&mut buf) {
                    Ok(()) => {
                        let frame = Frame::new_rgb8(Bytes::from(buf), width, height, stride)
                            .with_timestamp_ns(now_ns_best_effort());
                        if !try_send_frame(&frame_tx, &events_tx, CameraBackend::Ffmpeg, frame) {
                            break;
                        }
                    },
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                    Err(e) => {
                        let _ = events_tx.try_send(CameraEvent::Error {
                            backend: CameraBackend::Ffmpeg,
                            error: CameraError::driver("reading ffmpeg output", e),
                        });
                        break;
                    },
                }
            }
        });

        self.reader_join = Some(join);
        self.child = Some(child);

        Ok(())
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        self.stop.store(true, Ordering::Relaxed);
        self.stop_child();
        if let Some(j) = self.reader_join.take() {
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

impl Drop for FfmpegCameraDriver {
    fn drop(&mut self) {
        let _ = CameraDriver::stop(self);
    }
}

pub(crate) fn now_ns_best_effort() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        fn ffmpeg_format() -> &'static str {
            "avfoundation"
        }

        fn input_device(device: &str) -> String {
            let d = device.strip_prefix("avf:").unwrap_or(device);
            if d.is_empty() { "0".to_string() } else { d.to_string() }
        }
    } else if #[cfg(target_os = "windows")] {
        fn ffmpeg_format() -> &'static str {
            "dshow"
        }

        fn input_device(device: &str) -> String {
            let d = device.strip_prefix("dshow:").unwrap_or(device);
            if d.is_empty() { "video=default".to_string() } else { d.to_string() }
        }
    } else {
        fn ffmpeg_format() -> &'static str {
            "v4l2"
        }

        fn input_device(device: &str) -> String {
            let d = device.strip_prefix("file:").unwrap_or(device);
            if d.is_empty() {
                "/dev/video0".to_string()
            } else if d.chars().all(|c| c.is_ascii_digit()) {
                format!("/dev/video{d}")
            } else {
                d.to_string()
            }
        }
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn linux_device_urls_resolve_to_device_nodes() {
        assert_eq!(input_device("file:/dev/video2"), "/dev/video2");
        assert_eq!(input_device("1"), "/dev/video1");
        assert_eq!(input_device(""), "/dev/video0");
    }
}
