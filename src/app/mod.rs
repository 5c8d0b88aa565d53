// This is free and unencumbered software released into the public domain.

//! The single camera screen and the events that drive it.
//!
//! Everything here runs on one event-loop thread. Collaborators that work in
//! the background (permission prompts, the camera, still capture) report back
//! by posting an [`AppEvent`] to the loop's channel.

pub mod console;

use crate::shared::{
    AppConfig, CameraProvider, CaptureError, CaptureMode, CaptureResult, Feedback, Frame,
    ImageCapture, ImageCaptureConfig, Locale, MediaDirs, Permission, PermissionResult,
    PermissionService, PermissionStatus, Preview, PreviewConfig, PreviewSurface, Rational,
    RequestCode, Size, ToastDuration, UseCaseError, VirtualDisplay, capture_failed_message,
    capture_succeeded_message, epoch_millis, photo_file,
};
use std::{path::Path, sync::mpsc::Sender};

#[cfg(feature = "tracing")]
use asimov_module::tracing::{debug, error, warn};

/// Distinguishes our permission request from any other in flight.
pub const REQUEST_CODE_PERMISSIONS: RequestCode = 10;

pub const REQUIRED_PERMISSIONS: &[Permission] = &[Permission::Camera];

pub const PREVIEW_RESOLUTION: Size = Size::new(640, 640);

#[derive(Debug)]
pub enum AppEvent {
    StartCamera,
    PermissionsResult(PermissionResult),
    LayoutChanged(Size),
    DisplayRotated(i32),
    CaptureClicked,
    CaptureFinished(CaptureResult),
    PreviewFrame(Frame),
    InputClosed,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenState {
    Created,
    AwaitingPermission,
    /// Permission granted but binding failed; capture stays unavailable.
    CameraUnavailable,
    Running,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finish,
}

pub struct CameraScreen<P, C, F> {
    permissions: P,
    provider: C,
    feedback: F,
    events: Sender<AppEvent>,
    view_finder: PreviewSurface,
    display: VirtualDisplay,
    media_dirs: MediaDirs,
    locale: Locale,
    clock: fn() -> u128,
    state: ScreenState,
    captures_in_flight: usize,
    closing: bool,
}

impl<P, C, F> CameraScreen<P, C, F>
where
    P: PermissionService,
    C: CameraProvider,
    F: Feedback,
{
    pub fn new(
        config: &AppConfig,
        permissions: P,
        provider: C,
        feedback: F,
        events: Sender<AppEvent>,
    ) -> Self {
        Self {
            permissions,
            provider,
            feedback,
            events,
            view_finder: PreviewSurface::new(config.surface),
            display: VirtualDisplay::new(config.rotation),
            media_dirs: config.media_dirs.clone(),
            locale: config.locale,
            clock: epoch_millis,
            state: ScreenState::Created,
            captures_in_flight: 0,
            closing: false,
        }
    }

    /// Replaces the wall clock used to name photos.
    pub fn with_clock(mut self, clock: fn() -> u128) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> ScreenState {
        self.state
    }

    pub fn view_finder(&self) -> &PreviewSurface {
        &self.view_finder
    }

    pub fn provider(&self) -> &C {
        &self.provider
    }

    pub fn on_create(&mut self) {
        if self.all_permissions_granted() {
            self.post(AppEvent::StartCamera);
        } else {
            self.state = ScreenState::AwaitingPermission;
            self.permissions
                .request_permissions(REQUEST_CODE_PERMISSIONS, REQUIRED_PERMISSIONS);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::StartCamera => self.start_camera(),
            AppEvent::PermissionsResult(result) => self.on_request_permissions_result(&result),
            AppEvent::LayoutChanged(size) => self.on_layout_change(size),
            AppEvent::DisplayRotated(code) => {
                self.display.set_rotation_code(code);
                self.update_transform();
            },
            AppEvent::CaptureClicked => self.on_capture_clicked(),
            AppEvent::CaptureFinished(result) => self.on_capture_finished(result),
            AppEvent::PreviewFrame(frame) => self.on_preview_frame(&frame),
            AppEvent::InputClosed => {
                self.closing = true;
                if self.captures_in_flight == 0 {
                    self.finish();
                }
            },
            AppEvent::Quit => self.finish(),
        }

        if self.state == ScreenState::Finished {
            Flow::Finish
        } else {
            Flow::Continue
        }
    }

    pub fn on_request_permissions_result(&mut self, result: &PermissionResult) {
        if result.request_code != REQUEST_CODE_PERMISSIONS {
            return;
        }
        if self.all_permissions_granted() {
            self.post(AppEvent::StartCamera);
        } else {
            self.feedback
                .toast(self.locale.permission_denied(), ToastDuration::Short);
            self.finish();
        }
    }

    pub fn start_camera(&mut self) {
        if self.state == ScreenState::Finished {
            return;
        }

        let preview = Preview::new(
            PreviewConfig::builder()
                .target_aspect_ratio(Rational::SQUARE)
                .target_resolution(PREVIEW_RESOLUTION)
                .build(),
        );
        let image_capture = ImageCapture::new(
            ImageCaptureConfig::builder()
                .target_aspect_ratio(Rational::SQUARE)
                .capture_mode(CaptureMode::MinLatency)
                .build(),
        );

        match self.provider.bind_to_lifecycle(&preview, &image_capture) {
            Ok(()) => {
                self.view_finder.attach_output();
                self.update_transform();
                self.state = ScreenState::Running;
            },
            Err(_err) => {
                #[cfg(feature = "tracing")]
                warn!(target: "viewfinder", error = %_err, "failed to bind camera use-cases");
                self.state = ScreenState::CameraUnavailable;
            },
        }
    }

    pub fn on_layout_change(&mut self, size: Size) {
        self.view_finder.set_size(size);
        self.update_transform();
    }

    /// Re-reads the display rotation and corrects the preview for it.
    /// Unrecognized rotation codes keep the current transform.
    pub fn update_transform(&mut self) {
        let code = self.display.rotation_code();
        if !self.view_finder.update_transform(code) {
            #[cfg(feature = "tracing")]
            debug!(target: "viewfinder", code, "ignoring unrecognized display rotation");
            return;
        }
        #[cfg(feature = "tracing")]
        debug!(
            target: "viewfinder",
            rotation = %crate::shared::DisplayRotation::from_code(code).unwrap_or_default(),
            transform = ?self.view_finder.transform(),
            "preview transform updated"
        );
    }

    pub fn on_capture_clicked(&mut self) {
        if self.state != ScreenState::Running {
            #[cfg(feature = "tracing")]
            debug!(target: "viewfinder", state = ?self.state, "capture ignored");
            return;
        }

        self.captures_in_flight += 1;
        let Some(dir) = self.media_dirs.first() else {
            let err = CaptureError::new(UseCaseError::FileIo, "no external media directory");
            self.post(AppEvent::CaptureFinished(Err(err)));
            return;
        };

        let file = photo_file(dir, (self.clock)());
        let events = self.events.clone();
        self.provider.take_picture(
            file,
            Box::new(move |result| {
                let _ = events.send(AppEvent::CaptureFinished(result));
            }),
        );
    }

    pub fn on_capture_finished(&mut self, result: CaptureResult) {
        self.captures_in_flight = self.captures_in_flight.saturating_sub(1);
        match result {
            Ok(path) => self.on_image_saved(&path),
            Err(err) => self.on_capture_error(&err),
        }
        if self.closing && self.captures_in_flight == 0 {
            self.finish();
        }
    }

    pub fn on_image_saved(&mut self, path: &Path) {
        let msg = capture_succeeded_message(path);
        self.feedback.toast(&msg, ToastDuration::Short);
        #[cfg(feature = "tracing")]
        debug!(target: "viewfinder", "{msg}");
    }

    pub fn on_capture_error(&mut self, err: &CaptureError) {
        let msg = capture_failed_message(&err.message);
        self.feedback.toast(&msg, ToastDuration::Short);
        #[cfg(feature = "tracing")]
        {
            use std::error::Error as _;
            error!(target: "viewfinder", kind = %err.kind, "{msg}");
            let mut source = err.source();
            while let Some(cause) = source {
                error!(target: "viewfinder", "  caused by: {cause}");
                source = cause.source();
            }
        }
    }

    fn on_preview_frame(&mut self, frame: &Frame) {
        if !self.view_finder.is_attached() {
            return;
        }
        if let Err(_err) = self.view_finder.present(frame) {
            #[cfg(feature = "tracing")]
            warn!(target: "viewfinder", error = %_err, "dropping preview frame");
        }
    }

    pub fn on_destroy(&mut self) {
        self.provider.unbind_all();
        self.view_finder.detach_output();
    }

    pub fn finish(&mut self) {
        self.state = ScreenState::Finished;
    }

    fn all_permissions_granted(&self) -> bool {
        REQUIRED_PERMISSIONS
            .iter()
            .all(|p| self.permissions.check_self_permission(*p) == PermissionStatus::Granted)
    }

    fn post(&self, event: AppEvent) {
        let _ = self.events.send(event);
    }
}
