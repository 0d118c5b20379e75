// What you SEE:
// • A trail of fading blue dots follows your mouse anywhere on screen.
// • While any mouse button is held, new dots are red.
// • The overlay never takes clicks; everything underneath stays usable.
// • Ctrl+C in the terminal quits.

mod config;
mod error;
mod overlay;
mod render;
mod sample_loop;
mod status;
mod trail;
mod types;
mod x11;

use error::Error;
use overlay::Overlay;
use render::{TrailRenderer, TrailStyle};
use sample_loop::{LoopTiming, SampleLoop, ShutdownFlag};
use status::StatusLine;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use trail::TrailBuffer;
use x11::XDisplay;

fn main() -> ExitCode {
    // Logs go to stderr so they don't tear the stdout status line.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config::DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(()) => {
            println!("Exiting.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "cursor trail stopped");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    /* --- Ctrl+C -> stop flag ---
       The handler only flips the flag; the loop notices on its next turn. */
    let shutdown = ShutdownFlag::new();
    let on_signal = shutdown.clone();
    ctrlc::set_handler(move || on_signal.request()).map_err(|e| Error::Signal(e.to_string()))?;

    /* --- Display + overlay setup ---
       Visual: an invisible, screen-sized window appears above everything. */
    let display = XDisplay::connect()?;
    let (width, height) = display.screen_size();
    let overlay = Overlay::new(width, height)?;

    // A window we cannot shape would swallow every click: refuse to run.
    let window_id = overlay.x11_window_id()?;
    display.keep_above(window_id)?;
    if !display.make_click_through(window_id)? {
        warn!("XFixes extension not available; overlay will not be click-through");
    }
    info!(width, height, "overlay ready");

    /* --- Main loop ---
       Visual: dots chase the cursor until Ctrl+C. */
    let mut sample_loop = SampleLoop::new(
        display,
        overlay,
        TrailBuffer::new(config::TRAIL_LENGTH),
        TrailRenderer::new(TrailStyle::default()),
        LoopTiming::default(),
        shutdown,
    );

    let mut status = StatusLine::new(std::io::stdout());
    if let Err(e) = status.start() {
        debug!(error = %e, "status line unavailable");
    }
    let result = sample_loop.run(|outcome| {
        if let Err(e) = status.update(outcome) {
            debug!(error = %e, "status line write failed");
        }
    });
    if result.is_err() {
        // The loop died mid-line; keep the error record off the status line.
        if let Err(e) = status.break_line() {
            debug!(error = %e, "status line write failed");
        }
    }

    info!(samples = sample_loop.trail().len(), state = ?sample_loop.state(), "sample loop finished");
    // Overlay first, then the display connection.
    drop(sample_loop);
    info!("resources released");
    result
}
