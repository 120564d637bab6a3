use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Window control error: {0}")]
    WindowControlError(String),

    /// Raised by action keywords when a resolved element lacks a required
    /// capability. Never raised by the resolver itself.
    #[error("Action not possible: {0}")]
    ActionNotPossible(String),

    #[error("Invalid integer value for '{strategy}'")]
    InvalidInteger {
        strategy: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },

    /// The underlying control no longer exists on screen. Normalized to
    /// `ElementNotFound` at the liveness-probe boundary.
    #[error("Element is gone: {0}")]
    ElementGone(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}
