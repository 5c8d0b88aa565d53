// This is free and unencumbered software released into the public domain.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    path::PathBuf,
    rc::Rc,
    sync::mpsc::{Receiver, channel},
};
use viewfinder::{
    app::{AppEvent, CameraScreen, Flow},
    shared::{
        AppConfig, CameraError, CameraProvider, CaptureCallback, CaptureResult, Feedback,
        ImageCapture, Permission, PermissionService, PermissionStatus, Preview, RequestCode,
        ToastDuration,
    },
};

#[derive(Clone, Default)]
pub struct FakePermissions {
    pub granted: Rc<RefCell<bool>>,
    pub requests: Rc<RefCell<Vec<(RequestCode, Vec<Permission>)>>>,
}

impl PermissionService for FakePermissions {
    fn check_self_permission(&self, _permission: Permission) -> PermissionStatus {
        if *self.granted.borrow() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    fn request_permissions(&mut self, request_code: RequestCode, permissions: &[Permission]) {
        self.requests
            .borrow_mut()
            .push((request_code, permissions.to_vec()));
    }
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    pub fail_bind: bool,
    pub binds: Rc<RefCell<Vec<(Preview, ImageCapture)>>>,
    pub pictures: Rc<RefCell<Vec<PathBuf>>>,
    pending: Rc<RefCell<Vec<CaptureCallback>>>,
    pub unbinds: Rc<RefCell<usize>>,
}

impl FakeProvider {
    pub fn failing_bind() -> Self {
        Self {
            fail_bind: true,
            ..Default::default()
        }
    }

    /// Delivers `result` to the oldest outstanding `take_picture`.
    pub fn complete(&self, result: CaptureResult) {
        let callback = self.pending.borrow_mut().remove(0);
        callback(result);
    }

    pub fn outstanding(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl CameraProvider for FakeProvider {
    fn bind_to_lifecycle(
        &mut self,
        preview: &Preview,
        image_capture: &ImageCapture,
    ) -> Result<(), CameraError> {
        self.binds
            .borrow_mut()
            .push((preview.clone(), image_capture.clone()));
        if self.fail_bind {
            return Err(CameraError::NoCamera);
        }
        Ok(())
    }

    fn take_picture(&mut self, file: PathBuf, on_result: CaptureCallback) {
        self.pictures.borrow_mut().push(file);
        self.pending.borrow_mut().push(on_result);
    }

    fn unbind_all(&mut self) {
        *self.unbinds.borrow_mut() += 1;
    }
}

#[derive(Clone, Default)]
pub struct RecordingFeedback {
    pub toasts: Rc<RefCell<Vec<String>>>,
}

impl RecordingFeedback {
    pub fn last(&self) -> Option<String> {
        self.toasts.borrow().last().cloned()
    }
}

impl Feedback for RecordingFeedback {
    fn toast(&self, text: &str, _duration: ToastDuration) {
        self.toasts.borrow_mut().push(text.to_string());
    }
}

pub type TestScreen = CameraScreen<FakePermissions, FakeProvider, RecordingFeedback>;

pub struct Harness {
    pub screen: TestScreen,
    pub events: Receiver<AppEvent>,
    pub permissions: FakePermissions,
    pub provider: FakeProvider,
    pub feedback: RecordingFeedback,
}

impl Harness {
    pub fn new(config: &AppConfig, granted: bool) -> Self {
        Self::with_provider(config, granted, FakeProvider::default())
    }

    pub fn with_provider(config: &AppConfig, granted: bool, provider: FakeProvider) -> Self {
        let (tx, events) = channel();
        let permissions = FakePermissions::default();
        *permissions.granted.borrow_mut() = granted;
        let feedback = RecordingFeedback::default();
        let screen = CameraScreen::new(
            config,
            permissions.clone(),
            provider.clone(),
            feedback.clone(),
            tx,
        );
        Self {
            screen,
            events,
            permissions,
            provider,
            feedback,
        }
    }

    /// Handles every queued event, like one turn of the event loop.
    pub fn pump(&mut self) -> Flow {
        let mut flow = Flow::Continue;
        while let Ok(event) = self.events.try_recv() {
            flow = self.screen.handle_event(event);
            if flow == Flow::Finish {
                break;
            }
        }
        flow
    }

    pub fn send(&mut self, event: AppEvent) -> Flow {
        let flow = self.screen.handle_event(event);
        if flow == Flow::Finish {
            return flow;
        }
        self.pump()
    }

    pub fn with_clock(mut self, clock: fn() -> u128) -> Self {
        self.screen = self.screen.with_clock(clock);
        self
    }

    /// Runs `on_create` and the queued events it produced.
    pub fn started(mut self) -> Self {
        self.screen.on_create();
        self.pump();
        self
    }

    /// Creates the screen with permission already granted and runs it up to
    /// a bound camera.
    pub fn running(config: &AppConfig) -> Self {
        Self::new(config, true).started()
    }
}
