// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraConfig, CameraError, Frame};
use std::{
    any::Any,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel},
    },
    thread::JoinHandle,
    time::Duration,
};

pub type FrameSink = Arc<dyn Fn(&Frame) + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum CameraBackend {
    #[display("ffmpeg")]
    Ffmpeg,
    #[display("synthetic")]
    Synthetic,
}

#[derive(Debug)]
pub enum CameraEvent {
    Started { backend: CameraBackend },
    Stopped { backend: CameraBackend },
    FrameDropped { backend: CameraBackend },
    Error { backend: CameraBackend, error: CameraError },
}

pub enum FrameMsg {
    Frame(Frame),
    Stop,
}

/// Fans frames out from the driver thread to every registered sink on a
/// dedicated thread, so slow sinks never stall the capture loop.
pub struct Dispatcher {
    tx: SyncSender<FrameMsg>,
    sinks: Arc<RwLock<Vec<FrameSink>>>,
    delivered: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(
        capacity: usize,
        backend: CameraBackend,
        events_tx: SyncSender<CameraEvent>,
    ) -> Self {
        let (tx, rx) = sync_channel::<FrameMsg>(capacity.max(1));
        let sinks: Arc<RwLock<Vec<FrameSink>>> = Arc::new(RwLock::new(Vec::new()));
        let delivered = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let join = {
            let sinks = Arc::clone(&sinks);
            let delivered = Arc::clone(&delivered);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let _ = events_tx.try_send(CameraEvent::Started { backend });

                while !stop.load(Ordering::Relaxed) {
                    match rx.recv_timeout(Duration::from_millis(200)) {
                        Ok(FrameMsg::Frame(frame)) => {
                            if let Ok(list) = sinks.read() {
                                for sink in list.iter() {
                                    sink(&frame);
                                }
                            }
                            delivered.fetch_add(1, Ordering::Relaxed);
                        },
                        Ok(FrameMsg::Stop) => break,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                let _ = events_tx.try_send(CameraEvent::Stopped { backend });
            })
        };

        Self {
            tx,
            sinks,
            delivered,
            stop,
            join: Some(join),
        }
    }

    pub fn sender(&self) -> SyncSender<FrameMsg> {
        self.tx.clone()
    }

    pub fn add_sink(&self, sink: FrameSink) {
        if let Ok(mut g) = self.sinks.write() {
            g.push(sink);
        }
    }

    pub fn clear_sinks(&self) {
        if let Ok(mut g) = self.sinks.write() {
            g.clear();
        }
    }

    pub fn frames_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.tx.try_send(FrameMsg::Stop);
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

pub trait CameraDriver: dogma::Named + Send {
    fn backend(&self) -> CameraBackend;
    fn start(&mut self) -> Result<(), CameraError>;
    fn stop(&mut self) -> Result<(), CameraError> {
        Ok(())
    }
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An opened camera: a driver producing frames plus the dispatcher that
/// delivers them.
pub struct Camera {
    config: CameraConfig,
    driver: Box<dyn CameraDriver>,
    dispatcher: Dispatcher,
    events_rx: Receiver<CameraEvent>,
    running: bool,
}

impl Camera {
    pub(crate) fn new(
        config: CameraConfig,
        driver: Box<dyn CameraDriver>,
        dispatcher: Dispatcher,
        events_rx: Receiver<CameraEvent>,
    ) -> Self {
        Self {
            config,
            driver,
            dispatcher,
            events_rx,
            running: false,
        }
    }

    pub fn backend(&self) -> CameraBackend {
        self.driver.backend()
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn add_sink(&self, sink: FrameSink) {
        self.dispatcher.add_sink(sink);
    }

    pub fn events(&self) -> &Receiver<CameraEvent> {
        &self.events_rx
    }

    pub fn frames_delivered(&self) -> u64 {
        self.dispatcher.frames_delivered()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.running {
            return Ok(());
        }
        self.driver.start()?;
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), CameraError> {
        let r = if self.running {
            self.driver.stop()
        } else {
            Ok(())
        };
        self.running = false;
        self.dispatcher.clear_sinks();
        self.dispatcher.stop();
        r
    }

    pub fn driver_as<T: 'static>(&self) -> Option<&T> {
        self.driver.as_any().downcast_ref::<T>()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

pub fn report_drop(events_tx: &SyncSender<CameraEvent>, backend: CameraBackend) {
    let _ = events_tx.try_send(CameraEvent::FrameDropped { backend });
}

/// Hands a frame to the dispatcher without blocking the driver thread.
/// Returns `false` once the dispatcher has gone away.
pub fn try_send_frame(
    frame_tx: &SyncSender<FrameMsg>,
    events_tx: &SyncSender<CameraEvent>,
    backend: CameraBackend,
    frame: Frame,
) -> bool {
    match frame_tx.try_send(FrameMsg::Frame(frame)) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            report_drop(events_tx, backend);
            true
        },
        Err(TrySendError::Disconnected(_)) => {
            let _ = events_tx.try_send(CameraEvent::Error {
                backend,
                error: CameraError::Closed,
            });
            false
        },
    }
}
