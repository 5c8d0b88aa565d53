// This is free and unencumbered software released into the public domain.

//! CLI helpers (error reporting, verbosity handling, argument parsing).

use crate::shared::{CameraError, DisplayRotation, Size};
use asimov_module::SysexitsError::{self, *};
use clientele::StandardOptions;

pub fn handle_error(err: &CameraError, flags: &StandardOptions) -> SysexitsError {
    #[cfg(feature = "tracing")]
    {
        use asimov_module::tracing::{debug, error};

        error!(target: "viewfinder", %err, "camera command failed");

        if flags.debug || flags.verbose >= 2 {
            debug!(target: "viewfinder", ?err, "detailed error");
        }
    }

    report_error(err, flags);
    map_error_to_sysexit(err)
}

pub fn info_user(flags: &StandardOptions, msg: &str) {
    if flags.debug || flags.verbose >= 1 {
        eprintln!("INFO: {msg}");
    }

    #[cfg(feature = "tracing")]
    asimov_module::tracing::info!(target: "viewfinder", "{msg}");
}

pub fn warn_user(flags: &StandardOptions, msg: &str) {
    if flags.debug || flags.verbose >= 1 {
        eprintln!("WARN: {msg}");
    }

    #[cfg(feature = "tracing")]
    asimov_module::tracing::warn!(target: "viewfinder", "{msg}");
}

pub fn warn_user_with_error(flags: &StandardOptions, msg: &str, error: &dyn std::error::Error) {
    if flags.debug || flags.verbose >= 2 {
        eprintln!("WARN: {msg}: {error}");
    } else if flags.verbose >= 1 {
        eprintln!("WARN: {msg}");
    }

    #[cfg(feature = "tracing")]
    asimov_module::tracing::warn!(target: "viewfinder", error = %error, "{msg}");
}

fn report_error(err: &CameraError, flags: &StandardOptions) {
    use std::error::Error as _;
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "ERROR: {err}");

    if flags.debug || flags.verbose >= 2 {
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = writeln!(stderr, "  Caused by: {}", cause);
            source = cause.source();
        }
    }
}

pub fn map_error_to_sysexit(err: &CameraError) -> SysexitsError {
    match err {
        CameraError::NoDriver => EX_UNAVAILABLE,
        CameraError::NoCamera => EX_USAGE,
        CameraError::NotConfigured => EX_CONFIG,
        CameraError::NotBound => EX_SOFTWARE,
        CameraError::InvalidConfig(_) => EX_USAGE,
        CameraError::Unsupported(_) => EX_UNAVAILABLE,
        CameraError::Closed => EX_UNAVAILABLE,
        CameraError::DriverError { .. } => EX_SOFTWARE,
        CameraError::Other(_) => EX_SOFTWARE,
    }
}

pub fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let size: Size = s.parse()?;

    if !(160..=7680).contains(&size.width) {
        return Err(format!(
            "Width {} is out of reasonable range (160-7680)",
            size.width
        ));
    }
    if !(120..=4320).contains(&size.height) {
        return Err(format!(
            "Height {} is out of reasonable range (120-4320)",
            size.height
        ));
    }

    Ok((size.width, size.height))
}

/// Surface sizes may be anything, including empty.
pub fn parse_surface(s: &str) -> Result<Size, String> {
    s.parse()
}

pub fn parse_rotation(s: &str) -> Result<DisplayRotation, String> {
    let degrees: i32 = s
        .trim()
        .trim_end_matches('°')
        .parse()
        .map_err(|_| format!("Invalid rotation: {s}"))?;
    DisplayRotation::from_degrees(degrees)
        .ok_or_else(|| format!("Rotation {degrees} must be one of 0, 90, 180, 270"))
}

pub fn parse_frequency(s: &str) -> Result<f64, String> {
    let freq: f64 = s.parse().map_err(|_| format!("Invalid frequency: {s}"))?;

    if freq <= 0.0 {
        return Err("Frequency must be positive".to_string());
    }
    if freq > 240.0 {
        return Err(format!(
            "Frequency {freq} Hz exceeds reasonable maximum (240 Hz)"
        ));
    }
    if freq < 0.1 {
        return Err(format!(
            "Frequency {freq} Hz is below reasonable minimum (0.1 Hz)"
        ));
    }

    Ok(freq)
}
