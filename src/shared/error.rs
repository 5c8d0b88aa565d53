// This is free and unencumbered software released into the public domain.

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no suitable camera backend available")]
    NoDriver,

    #[error("no camera device available")]
    NoCamera,

    #[error("driver is not configured")]
    NotConfigured,

    #[error("no use-cases are bound to the lifecycle")]
    NotBound,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("stream closed")]
    Closed,

    #[error("driver error while {context}")]
    DriverError {
        context: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Other(String),
}

impl CameraError {
    #[inline]
    pub fn driver(context: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::DriverError {
            context,
            source: Box::new(source),
        }
    }

    #[inline]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    #[inline]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Error code reported alongside a failed still capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum UseCaseError {
    #[display("file I/O error")]
    FileIo,
    #[display("no frame available")]
    NoFrame,
    #[display("encoding error")]
    Encode,
    #[display("unknown error")]
    Unknown,
}

/// Outcome of a failed `take_picture`: code, human message, optional cause.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CaptureError {
    pub kind: UseCaseError,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CaptureError {
    pub fn new(kind: UseCaseError, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn file_io(source: std::io::Error) -> Self {
        Self::new(UseCaseError::FileIo, source.to_string()).with_source(source)
    }
}

pub type CaptureResult = Result<std::path::PathBuf, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_error_displays_its_message() {
        let err = CaptureError::new(UseCaseError::FileIo, "disk full");
        assert_eq!(err.to_string(), "disk full");
        assert!(err.source().is_none());
    }

    #[test]
    fn file_io_keeps_the_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = CaptureError::file_io(io);
        assert_eq!(err.kind, UseCaseError::FileIo);
        assert_eq!(err.message, "disk full");
        assert!(err.source().is_some());
    }
}
