//! Error types for fetchmd

use std::net::IpAddr;
use thiserror::Error;

/// A URL or its resolved address violates the contact policy
///
/// Always fails closed: anything that cannot be proven safe ends up here.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Candidate could not be parsed as a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Scheme other than https
    #[error("Scheme \"{0}\" is not allowed. Only https is supported.")]
    SchemeNotAllowed(String),

    /// Hostname is on the fixed denylist
    #[error("Hostname \"{0}\" is blocked.")]
    BlockedHostname(String),

    /// Literal IP address in a private or reserved range
    #[error("Access to private IP address \"{0}\" is blocked.")]
    PrivateAddress(IpAddr),

    /// DNS lookup failed
    #[error("Could not resolve hostname: {hostname}")]
    Unresolvable {
        hostname: String,
        #[source]
        source: std::io::Error,
    },

    /// Hostname resolved into a private or reserved range
    #[error("Hostname \"{hostname}\" resolved to private IP \"{address}\". Access blocked.")]
    ResolvedToPrivate { hostname: String, address: IpAddr },
}

/// Transport, protocol or resource-limit failure after a URL was approved
#[derive(Debug, Error)]
pub enum FetchError {
    /// The hop did not settle within the budget
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Any other transport failure
    #[error("Fetch failed: {0}")]
    Failed(String),

    /// 3xx response without a Location header
    #[error("Redirect ({status}) with no Location header")]
    MissingLocation { status: u16 },

    /// Location header that cannot be turned into a URL
    #[error("Redirect to invalid location: {0}")]
    InvalidLocation(String),

    /// Non-2xx, non-redirect status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Successful response that is not HTML or XHTML
    #[error("Expected HTML content but got \"{0}\"")]
    NotHtml(String),

    /// Body grew past the byte ceiling
    #[error("Response exceeds {limit} byte limit ({received}+ bytes received)")]
    TooLarge { limit: u64, received: u64 },

    /// Hop budget exhausted without a terminal response
    #[error("Too many redirects (>{max})")]
    TooManyRedirects { max: u32 },
}

impl FetchError {
    /// Build a status error using the caller-facing message table
    pub fn from_status(status: u16) -> Self {
        let message = match status {
            401 => "Authentication required".to_string(),
            403 => "Access denied".to_string(),
            404 => "Page not found".to_string(),
            429 => "Rate limited".to_string(),
            other => format!("Server error ({})", other),
        };
        FetchError::Status { status, message }
    }

    /// HTTP status code, for failures caused by a response status
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure inside a [`Transport`](crate::transport::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to build HTTP client
    #[error("failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// Failed to connect to server
    #[error("failed to connect to server: {0}")]
    Connect(String),

    /// Other request or body error
    #[error("{0}")]
    Request(String),
}

impl TransportError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Failure while reading a local input
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input exceeds {limit} byte limit ({size} bytes)")]
    TooLarge { limit: u64, size: u64 },

    #[error("Input is empty. No HTML content to process.")]
    Empty,
}

/// Failure reported by a [`Renderer`](crate::render::Renderer)
#[derive(Debug, Error)]
#[error("Failed to render {url}: {message}")]
pub struct RenderError {
    pub url: String,
    pub message: String,
}

/// Any failure surfaced by fetchmd
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl Error {
    /// HTTP status code, when the failure came from a response status
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Fetch(err) => err.status_code(),
            _ => None,
        }
    }
}
