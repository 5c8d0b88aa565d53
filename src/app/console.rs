// This is free and unencumbered software released into the public domain.

//! Terminal front end: stdin commands and permission consent.

use super::AppEvent;
use crate::shared::{
    ConsentStore, Permission, PermissionPolicy, PermissionResult, PermissionService,
    PermissionStatus, RequestCode, Size,
};
use std::{
    io::{self, BufRead, Write},
    sync::{Arc, Mutex, mpsc::Sender},
    thread::JoinHandle,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Capture,
    Rotate(i32),
    Resize(Size),
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        match verb.to_ascii_lowercase().as_str() {
            "" | "c" | "capture" => Command::Capture,
            "q" | "quit" | "exit" => Command::Quit,
            "r" | "rotate" => match arg.parse() {
                Ok(code) => Command::Rotate(code),
                Err(_) => Command::Unknown(line.to_string()),
            },
            "resize" => match arg.parse() {
                Ok(size) => Command::Resize(size),
                Err(_) => Command::Unknown(line.to_string()),
            },
            _ => Command::Unknown(line.to_string()),
        }
    }

    pub fn into_event(self) -> Option<AppEvent> {
        match self {
            Command::Capture => Some(AppEvent::CaptureClicked),
            Command::Rotate(code) => Some(AppEvent::DisplayRotated(code)),
            Command::Resize(size) => Some(AppEvent::LayoutChanged(size)),
            Command::Quit => Some(AppEvent::Quit),
            Command::Unknown(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingRequest {
    request_code: RequestCode,
    permissions: Vec<Permission>,
}

/// Shared between [`ConsolePermissions`] and the stdin reader, which answers
/// an outstanding request with the next line typed.
#[derive(Clone, Debug, Default)]
pub struct ConsentPrompt {
    pending: Arc<Mutex<Option<PendingRequest>>>,
    consent: Arc<Mutex<ConsentStore>>,
}

impl ConsentPrompt {
    pub fn new(consent: ConsentStore) -> Self {
        Self {
            pending: Arc::default(),
            consent: Arc::new(Mutex::new(consent)),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|p| p.is_some())
            .unwrap_or(false)
    }

    fn ask(&self, request_code: RequestCode, permissions: &[Permission]) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(PendingRequest {
                request_code,
                permissions: permissions.to_vec(),
            });
        }
    }

    fn status(&self, permission: Permission) -> PermissionStatus {
        self.consent
            .lock()
            .map(|c| c.status(permission))
            .unwrap_or(PermissionStatus::Denied)
    }

    /// Resolves the outstanding request, recording grants. Returns `None`
    /// when nothing was pending.
    pub fn resolve(&self, status: PermissionStatus) -> Option<PermissionResult> {
        self.settle(status, true)
    }

    fn settle(&self, status: PermissionStatus, remember: bool) -> Option<PermissionResult> {
        let request = self.pending.lock().ok()?.take()?;
        if remember && status == PermissionStatus::Granted {
            self.record(&request.permissions);
        }
        Some(PermissionResult::uniform(
            request.request_code,
            &request.permissions,
            status,
        ))
    }

    /// Treats `line` as the answer to a pending request, if there is one.
    pub fn answer(&self, line: &str) -> Option<PermissionResult> {
        if !self.is_pending() {
            return None;
        }
        let status = match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => PermissionStatus::Granted,
            _ => PermissionStatus::Denied,
        };
        self.resolve(status)
    }

    fn record(&self, permissions: &[Permission]) {
        let Ok(mut consent) = self.consent.lock() else {
            return;
        };
        for permission in permissions {
            if let Err(_err) = consent.grant(*permission) {
                #[cfg(feature = "tracing")]
                asimov_module::tracing::warn!(
                    target: "viewfinder",
                    error = %_err,
                    "could not persist permission grant"
                );
            }
        }
    }
}

/// Permission service for terminal sessions.
#[derive(Debug)]
pub struct ConsolePermissions {
    prompt: ConsentPrompt,
    policy: PermissionPolicy,
    events: Sender<AppEvent>,
}

impl ConsolePermissions {
    pub fn new(prompt: ConsentPrompt, policy: PermissionPolicy, events: Sender<AppEvent>) -> Self {
        Self {
            prompt,
            policy,
            events,
        }
    }
}

impl PermissionService for ConsolePermissions {
    fn check_self_permission(&self, permission: Permission) -> PermissionStatus {
        match self.policy {
            PermissionPolicy::Grant => PermissionStatus::Granted,
            PermissionPolicy::Deny => PermissionStatus::Denied,
            PermissionPolicy::Prompt => self.prompt.status(permission),
        }
    }

    fn request_permissions(&mut self, request_code: RequestCode, permissions: &[Permission]) {
        self.prompt.ask(request_code, permissions);
        let answer = match self.policy {
            PermissionPolicy::Grant => PermissionStatus::Granted,
            PermissionPolicy::Deny => PermissionStatus::Denied,
            PermissionPolicy::Prompt => {
                let names: Vec<&str> = permissions.iter().map(|p| p.name()).collect();
                let mut stderr = io::stderr();
                let _ = write!(stderr, "Allow access to {}? [y/N] ", names.join(", "));
                let _ = stderr.flush();
                return;
            },
        };
        // Flag answers last for this run only.
        if let Some(result) = self.prompt.settle(answer, false) {
            let _ = self.events.send(AppEvent::PermissionsResult(result));
        }
    }
}

/// Reads stdin lines on a background thread and posts them as events.
/// Start it after the screen's `on_create`, so an answer typed ahead is
/// matched against the permission request.
pub fn spawn_input_reader(prompt: ConsentPrompt, events: Sender<AppEvent>) -> JoinHandle<()> {
    std::thread::spawn(move || read_input(io::stdin().lock(), &prompt, &events))
}

/// Answers a pending permission request with the next line, and turns every
/// other line into a command event. End of input denies any outstanding
/// request and then posts [`AppEvent::InputClosed`].
pub fn read_input(input: impl BufRead, prompt: &ConsentPrompt, events: &Sender<AppEvent>) {
    for line in input.lines() {
        let Ok(line) = line else { break };

        if let Some(result) = prompt.answer(&line) {
            if events.send(AppEvent::PermissionsResult(result)).is_err() {
                return;
            }
            continue;
        }

        match Command::parse(&line) {
            Command::Unknown(text) => {
                let _ = writeln!(
                    io::stderr(),
                    "WARN: unknown command '{text}' (try: capture, rotate <0-3>, resize WxH, quit)"
                );
            },
            command => {
                if let Some(event) = command.into_event() {
                    if events.send(event).is_err() {
                        return;
                    }
                }
            },
        }
    }

    if let Some(result) = prompt.resolve(PermissionStatus::Denied) {
        let _ = events.send(AppEvent::PermissionsResult(result));
    }
    let _ = events.send(AppEvent::InputClosed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Cursor, sync::mpsc::channel};

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse(""), Command::Capture);
        assert_eq!(Command::parse("capture"), Command::Capture);
        assert_eq!(Command::parse("r 1"), Command::Rotate(1));
        assert_eq!(Command::parse("rotate -1"), Command::Rotate(-1));
        assert_eq!(Command::parse("resize 800x600"), Command::Resize(Size::new(800, 600)));
        assert_eq!(Command::parse("QUIT"), Command::Quit);
        assert!(matches!(Command::parse("rotate left"), Command::Unknown(_)));
        assert!(matches!(Command::parse("zoom"), Command::Unknown(_)));
    }

    #[test]
    fn typed_yes_grants_and_is_remembered() {
        let (tx, _rx) = channel();
        let prompt = ConsentPrompt::new(ConsentStore::in_memory());
        let mut permissions =
            ConsolePermissions::new(prompt.clone(), PermissionPolicy::Prompt, tx);

        permissions.request_permissions(10, &[Permission::Camera]);
        assert!(prompt.is_pending());

        let result = prompt.answer("yes").unwrap();
        assert_eq!(result.request_code, 10);
        assert!(result.is_granted(Permission::Camera));
        assert_eq!(
            permissions.check_self_permission(Permission::Camera),
            PermissionStatus::Granted
        );
        assert!(prompt.answer("yes").is_none());
    }

    #[test]
    fn anything_else_denies() {
        let (tx, _rx) = channel();
        let prompt = ConsentPrompt::new(ConsentStore::in_memory());
        let mut permissions =
            ConsolePermissions::new(prompt.clone(), PermissionPolicy::Prompt, tx);

        permissions.request_permissions(10, &[Permission::Camera]);
        let result = prompt.answer("").unwrap();
        assert!(!result.is_granted(Permission::Camera));
        assert_eq!(
            permissions.check_self_permission(Permission::Camera),
            PermissionStatus::Denied
        );
    }

    #[test]
    fn fixed_policies_answer_through_the_channel() {
        let (tx, rx) = channel();
        let prompt = ConsentPrompt::new(ConsentStore::in_memory());
        let mut permissions = ConsolePermissions::new(prompt.clone(), PermissionPolicy::Grant, tx);

        permissions.request_permissions(10, &[Permission::Camera]);
        match rx.try_recv() {
            Ok(AppEvent::PermissionsResult(result)) => {
                assert!(result.is_granted(Permission::Camera))
            },
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(!prompt.is_pending());
    }

    #[test]
    fn grant_flag_is_not_remembered() {
        let (tx, rx) = channel();
        let prompt = ConsentPrompt::new(ConsentStore::in_memory());
        let mut permissions = ConsolePermissions::new(prompt.clone(), PermissionPolicy::Grant, tx);

        assert_eq!(
            permissions.check_self_permission(Permission::Camera),
            PermissionStatus::Granted
        );
        permissions.request_permissions(10, &[Permission::Camera]);
        assert!(matches!(rx.try_recv(), Ok(AppEvent::PermissionsResult(_))));

        let later = ConsolePermissions::new(prompt, PermissionPolicy::Prompt, channel().0);
        assert_eq!(
            later.check_self_permission(Permission::Camera),
            PermissionStatus::Denied
        );
    }

    #[test]
    fn deny_policy_refuses_even_remembered_grants() {
        let (tx, rx) = channel();
        let mut consent = ConsentStore::in_memory();
        consent.grant(Permission::Camera).unwrap();
        let prompt = ConsentPrompt::new(consent);
        let mut permissions = ConsolePermissions::new(prompt.clone(), PermissionPolicy::Deny, tx);

        assert_eq!(
            permissions.check_self_permission(Permission::Camera),
            PermissionStatus::Denied
        );
        permissions.request_permissions(10, &[Permission::Camera]);
        match rx.try_recv() {
            Ok(AppEvent::PermissionsResult(result)) => {
                assert_eq!(result.request_code, 10);
                assert!(!result.is_granted(Permission::Camera));
            },
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(!prompt.is_pending());
    }

    #[test]
    fn typed_ahead_answer_resolves_the_request() {
        let (tx, rx) = channel();
        let prompt = ConsentPrompt::new(ConsentStore::in_memory());
        let mut permissions =
            ConsolePermissions::new(prompt.clone(), PermissionPolicy::Prompt, tx.clone());
        permissions.request_permissions(10, &[Permission::Camera]);

        read_input(Cursor::new("y\n\n"), &prompt, &tx);

        let events: Vec<AppEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3, "{events:?}");
        match &events[0] {
            AppEvent::PermissionsResult(result) => assert!(result.is_granted(Permission::Camera)),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(events[1], AppEvent::CaptureClicked));
        assert!(matches!(events[2], AppEvent::InputClosed));
    }

    #[test]
    fn end_of_input_denies_then_closes() {
        let (tx, rx) = channel();
        let prompt = ConsentPrompt::new(ConsentStore::in_memory());
        let mut permissions =
            ConsolePermissions::new(prompt.clone(), PermissionPolicy::Prompt, tx.clone());
        permissions.request_permissions(10, &[Permission::Camera]);

        read_input(Cursor::new(""), &prompt, &tx);

        let events: Vec<AppEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2, "{events:?}");
        match &events[0] {
            AppEvent::PermissionsResult(result) => {
                assert_eq!(result.request_code, 10);
                assert!(!result.is_granted(Permission::Camera));
            },
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(events[1], AppEvent::InputClosed));
        assert_eq!(
            permissions.check_self_permission(Permission::Camera),
            PermissionStatus::Denied
        );
    }

    #[test]
    fn lines_without_a_pending_request_are_commands() {
        let (tx, rx) = channel();
        let prompt = ConsentPrompt::new(ConsentStore::in_memory());

        read_input(Cursor::new("rotate 1\nbogus\nq\n"), &prompt, &tx);

        let events: Vec<AppEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], AppEvent::DisplayRotated(1)), "{events:?}");
        assert!(matches!(events[1], AppEvent::Quit));
        assert!(matches!(events[2], AppEvent::InputClosed));
        assert_eq!(events.len(), 3);
    }
}
