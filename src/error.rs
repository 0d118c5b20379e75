// Every variant states *where* things went wrong.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Display connect error: {0}")]
    DisplayConnect(String), // Talking to the X server failed at startup
    #[error("Display request error: {0}")]
    DisplayRequest(String), // A setup request (atoms, shape, hints) failed
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the overlay window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Pushing a frame to the overlay failed
    #[error("Signal handler error: {0}")]
    Signal(String), // Installing the Ctrl+C handler failed
}

/// A pointer query that produced no usable position. Never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("pointer is not on the tracked screen")]
    OffScreen,
    #[error("pointer query failed: {0}")]
    Connection(String),
}
