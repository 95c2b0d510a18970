//! Typed errors for wifikeeper operations

use thiserror::Error;

/// Result type alias for platform wireless operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors from the per-OS wireless backends
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("could not start `{command}`: {source}")]
    Spawn {
        command: &'static str,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {code}: {stderr}")]
    CommandFailed {
        command: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("unexpected output from `{command}`")]
    UnexpectedOutput { command: &'static str },

    #[cfg(windows)]
    #[error("WLAN call {call} failed (code: {code})")]
    Native { call: &'static str, code: u32 },

    #[cfg(windows)]
    #[error("no WiFi interface found")]
    NoInterface,
}

/// Errors from a single captive-portal login attempt.
///
/// Every variant collapses to a boolean failure at the `PortalLogin`
/// boundary; the variant only determines what gets logged.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("login URL, username or password is empty")]
    MissingCredentials,

    #[error("no credential field appeared on the login page in time")]
    PageTimeout,

    #[error("could not locate a complete login form")]
    FormNotFound,

    #[error("browser session failed: {0}")]
    Browser(String),
}

/// Errors while persisting the configuration record
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode configuration: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure of a single monitor tick.
///
/// The loop drains these and always proceeds to the next tick.
#[derive(Error, Debug)]
pub enum TickError {
    #[error("tick panicked: {0}")]
    Panicked(String),
}
