//! Error types for wanwatch.

use std::io;

use thiserror::Error;

/// Result type alias for wanwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wanwatch.
#[derive(Error, Debug)]
pub enum Error {
    // Probing errors
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    // Router session errors
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The restoration wait window closed before enough replies arrived.
    #[error("connection did not come back up")]
    NotRestored,

    /// The root execution context was cancelled mid-operation.
    #[error("operation cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // General errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Errors from the ICMP probing primitive.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    /// A burst that never sent a single packet must surface as a
    /// configuration problem, never as a down verdict.
    #[error("no ping packets were sent to {0}, potential configuration error")]
    NoPacketsSent(String),

    #[error("ICMP socket error: {0}")]
    Socket(#[from] io::Error),
}

/// Errors from the router web interface session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("login completed but session is invalid, check credentials")]
    LoginRejected,

    #[error("no WAN IP element found in status page")]
    WanIpElementNotFound,

    #[error("no WAN IP text found in status page")]
    WanIpTextNotFound,

    #[error("status page scrape failed: {0}")]
    Scrape(String),
}

impl Error {
    /// Check if the error points at a misconfigured destination rather
    /// than a transient network failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::InvalidConfig(_)
                | Error::Probe(ProbeError::Resolve { .. } | ProbeError::NoPacketsSent(_))
        )
    }
}
