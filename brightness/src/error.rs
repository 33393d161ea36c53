use thiserror::Error;

/// Errors returned by brightness operations.
///
/// An unreadable brightness is not an error; it is reported as
/// [`BrightnessValue::UNREADABLE`](crate::BrightnessValue::UNREADABLE).
#[derive(Error, Debug)]
pub enum Error {
    /// No native brightness backend exists for the current platform.
    #[error("Unsupported platform: no brightness backend for {0}")]
    UnsupportedPlatform(&'static str),

    /// An error occurred in the underlying platform implementation.
    #[error("Platform error: {0}")]
    Platform(String),

    /// An I/O error occurred while setting up a native observer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for brightness operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
