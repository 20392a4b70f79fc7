//! Error type shared by every seatsurf component

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to a single tool invocation.
///
/// None of these are retried automatically; the only retry anywhere in the
/// crate is the one-shot silent token refresh inside the session manager.
#[derive(Error, Debug)]
pub enum Error {
    /// A required credential or parameter is missing. Raised before any I/O.
    #[error("{0}")]
    Validation(String),

    #[error("Login failed with status {status}: {body}")]
    Authentication { status: u16, body: String },

    #[error("Not authenticated - please login first (use seatsurfing_login)")]
    NotAuthenticated,

    #[error("Session expired and token refresh failed - please login again")]
    SessionExpired,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed with status {status}: {body}")]
    RemoteRequest { status: u16, body: String },

    #[error("Booking failed with status {status}: {body}")]
    BookingRejected { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the caller has to log in again before retrying
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::SessionExpired)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
