// This is free and unencumbered software released into the public domain.

use std::io::Write;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToastDuration {
    #[default]
    Short,
    Long,
}

/// Transient user-facing messages.
pub trait Feedback {
    fn toast(&self, text: &str, duration: ToastDuration);
}

/// Toasts as `toast: <text>` lines on stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleFeedback;

impl Feedback for ConsoleFeedback {
    fn toast(&self, text: &str, _duration: ToastDuration) {
        let _ = writeln!(std::io::stderr(), "toast: {text}");
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    /// Reads a POSIX locale string such as `ja_JP.UTF-8`.
    pub fn from_posix(value: &str) -> Self {
        let lang = value
            .split(['_', '.', '@', '-'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match lang.as_str() {
            "ja" => Locale::Ja,
            _ => Locale::En,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LANG"))
            .map(|v| Self::from_posix(&v))
            .unwrap_or_default()
    }

    pub fn permission_denied(self) -> &'static str {
        match self {
            Locale::En => "Permissions not granted by the user.",
            Locale::Ja => "パーミッションが許可されませんでした",
        }
    }
}

impl core::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ja" => Ok(Locale::Ja),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

pub fn capture_succeeded_message(path: &std::path::Path) -> String {
    format!("Photo capture succeeded: {}", path.display())
}

pub fn capture_failed_message(message: &str) -> String {
    format!("Photo capture failed: {message}")
}
