// This is free and unencumbered software released into the public domain.

#[cfg(not(feature = "std"))]
compile_error!("viewfinder requires the 'std' feature");

use asimov_module::SysexitsError::{self, *};
use clap::Parser;
use clientele::StandardOptions;
use serde_json::json;
use std::{
    error::Error as StdError,
    path::PathBuf,
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError},
    },
    time::{Duration, Instant},
};
use viewfinder::{
    app::{
        AppEvent, CameraScreen, Flow, ScreenState,
        console::{ConsentPrompt, ConsolePermissions, spawn_input_reader},
    },
    cli::{
        handle_error, info_user, parse_dimensions, parse_frequency, parse_rotation,
        parse_surface, warn_user, warn_user_with_error,
    },
    shared::{
        AppConfig, CameraConfig, CameraError, CameraEvent, CaptureResult, ConsentStore,
        ConsoleFeedback, DisplayRotation, Frame, FrameCameraProvider, Locale, PermissionPolicy,
        PreviewSink, Size,
    },
};

#[derive(Debug, Parser)]
struct Options {
    #[clap(flatten)]
    flags: StandardOptions,

    /// Camera device URL (`file:/dev/video0`, `avf:0`, `dshow:video=...`, `synthetic:`)
    #[arg(long)]
    device: Option<String>,

    #[arg(short, long = "size", value_parser = parse_dimensions, default_value = "640x480")]
    size: (u32, u32),

    #[arg(short, long, value_parser = parse_frequency, default_value = "30")]
    frequency: f64,

    /// Initial display rotation in degrees
    #[arg(long, value_parser = parse_rotation, default_value = "0")]
    rotation: DisplayRotation,

    /// Initial preview surface size
    #[arg(long, value_parser = parse_surface, default_value = "640x640")]
    surface: Size,

    /// Directory for captured photos
    #[arg(long, value_name = "DIR")]
    media_dir: Option<PathBuf>,

    /// Directory for remembered permission grants
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[arg(long, conflicts_with = "deny_camera")]
    grant_camera: bool,

    #[arg(long)]
    deny_camera: bool,

    #[arg(long)]
    locale: Option<Locale>,

    /// Periodically write the rendered preview to this file
    #[arg(long, value_name = "FILE")]
    preview_out: Option<PathBuf>,

    #[arg(
        value_name = "FORMAT",
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text"
    )]
    output: OutputFormat,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Jsonl,
}

pub fn main() -> Result<SysexitsError, Box<dyn StdError>> {
    asimov_module::dotenv().ok();
    let args = asimov_module::args_os()?;
    let options = Options::parse_from(args);

    if options.flags.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(EX_OK);
    }

    if options.flags.license {
        print!("{}", include_str!("../../UNLICENSE"));
        return Ok(EX_OK);
    }

    #[cfg(feature = "tracing")]
    asimov_module::init_tracing_subscriber(&options.flags).expect("failed to initialize logging");

    let exit_code = match run(&options) {
        Ok(()) => EX_OK,
        Err(err) => handle_error(&err, &options.flags),
    };

    Ok(exit_code)
}

fn app_config(opts: &Options) -> AppConfig {
    let (width, height) = opts.size;
    let mut config = AppConfig::from_env();

    let mut camera = CameraConfig::new(width, height, opts.frequency)
        .with_diagnostics(opts.flags.debug || opts.flags.verbose >= 3);
    if let Some(device) = &opts.device {
        camera = camera.with_device(device.trim());
    }
    config.camera = camera;
    config.surface = opts.surface;
    config.rotation = opts.rotation;
    if let Some(dir) = &opts.media_dir {
        config = config.with_media_dir(dir);
    }
    if let Some(dir) = &opts.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(locale) = opts.locale {
        config.locale = locale;
    }
    config.permission_policy = if opts.grant_camera {
        PermissionPolicy::Grant
    } else if opts.deny_camera {
        PermissionPolicy::Deny
    } else {
        PermissionPolicy::Prompt
    };
    config.preview_out = opts.preview_out.clone();
    config
}

fn load_consent(opts: &Options, config: &AppConfig) -> ConsentStore {
    let Some(dir) = &config.data_dir else {
        return ConsentStore::in_memory();
    };
    match ConsentStore::load(dir) {
        Ok(store) => store,
        Err(err) => {
            warn_user_with_error(&opts.flags, "could not read permission grants", &err);
            ConsentStore::in_memory()
        },
    }
}

fn run(opts: &Options) -> Result<(), CameraError> {
    info_user(&opts.flags, "starting viewfinder");

    let config = app_config(opts);
    match config.media_dirs.first() {
        Some(dir) => info_user(&opts.flags, &format!("saving photos to {}", dir.display())),
        None => warn_user(&opts.flags, "no media directory; captures will fail"),
    }

    let (tx, rx) = mpsc::channel::<AppEvent>();
    {
        let tx = tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(AppEvent::Quit);
        })
        .map_err(|e| CameraError::other(format!("{e}")))?;
    }

    let preview_sink: PreviewSink = {
        let tx = tx.clone();
        Arc::new(move |frame: Frame| {
            let _ = tx.send(AppEvent::PreviewFrame(frame));
        })
    };
    let provider = FrameCameraProvider::new(config.device(), config.camera.clone())
        .with_preview_sink(preview_sink);

    let prompt = ConsentPrompt::new(load_consent(opts, &config));
    let permissions =
        ConsolePermissions::new(prompt.clone(), config.permission_policy, tx.clone());

    let screen = CameraScreen::new(&config, permissions, provider, ConsoleFeedback, tx.clone());
    let mut screen = scopeguard::guard(screen, |mut screen| screen.on_destroy());

    screen.on_create();
    spawn_input_reader(prompt, tx.clone());

    let mut last_state = screen.state();
    let mut last_preview_write: Option<Instant> = None;

    loop {
        let event = match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Some(event) = event {
            if let AppEvent::CaptureFinished(result) = &event {
                print_capture(opts, result);
            }
            let is_preview = matches!(event, AppEvent::PreviewFrame(_));

            if screen.handle_event(event) == Flow::Finish {
                break;
            }

            if is_preview {
                write_preview(opts, &config, &*screen, &mut last_preview_write);
            }
        }

        let state = screen.state();
        if state != last_state {
            if state == ScreenState::CameraUnavailable {
                warn_user(&opts.flags, "camera could not be started; captures are disabled");
            } else if state == ScreenState::Running {
                info_user(&opts.flags, "camera running; press Enter to capture");
            }
            last_state = state;
        }

        for event in screen.provider().drain_events() {
            match event {
                CameraEvent::Error { backend, error } => warn_user_with_error(
                    &opts.flags,
                    &format!("{backend} camera error"),
                    &error,
                ),
                CameraEvent::Stopped { backend } => {
                    info_user(&opts.flags, &format!("{backend} camera stopped"))
                },
                CameraEvent::Started { .. } | CameraEvent::FrameDropped { .. } => {},
            }
        }
    }

    Ok(())
}

fn print_capture(opts: &Options, result: &CaptureResult) {
    match (&opts.output, result) {
        (OutputFormat::Text, Ok(path)) => println!("{}", path.display()),
        (OutputFormat::Text, Err(_)) => {},
        (OutputFormat::Jsonl, Ok(path)) => {
            println!("{}", json!({ "status": "saved", "path": path }));
        },
        (OutputFormat::Jsonl, Err(err)) => {
            println!(
                "{}",
                json!({ "status": "failed", "kind": err.kind.to_string(), "message": err.message })
            );
        },
    }
}

fn write_preview<P, C, F>(
    opts: &Options,
    config: &AppConfig,
    screen: &CameraScreen<P, C, F>,
    last: &mut Option<Instant>,
) where
    P: viewfinder::shared::PermissionService,
    C: viewfinder::shared::CameraProvider,
    F: viewfinder::shared::Feedback,
{
    let Some(path) = &config.preview_out else {
        return;
    };
    if last.is_some_and(|t| t.elapsed() < config.preview_interval) {
        return;
    }
    let Some(frame) = screen.view_finder().displayed() else {
        return;
    };
    *last = Some(Instant::now());

    let saved = frame
        .to_dynamic_image()
        .map_err(|e| Box::new(e) as Box<dyn StdError>)
        .and_then(|img| img.save(path).map_err(|e| Box::new(e) as Box<dyn StdError>));
    if let Err(err) = saved {
        warn_user_with_error(&opts.flags, "could not write preview", err.as_ref());
    }
}
