//! fetchmd - SSRF-safe HTML fetching for markdown conversion
//!
//! This crate takes an untrusted URL, proves it is safe to contact, and
//! retrieves its HTML within strict time and size budgets. Redirects are
//! never followed by the HTTP stack: every `Location` goes back through the
//! validator before the next request is made.
//!
//! ## Pipeline
//!
//! - [`validate_url`] - https only, hostname denylist, private-range check on
//!   literal or resolved addresses
//! - [`BoundedFetcher`] - one request per hop, per-hop timeout, streamed body
//!   with a byte ceiling
//! - [`FetchClient`] - the redirect loop tying the two together
//!
//! DNS lookups go through an injected [`DnsResolver`] and requests through an
//! injected [`Transport`], so both can be replaced in tests.
//!
//! ```no_run
//! # async fn run() -> Result<(), fetchmd::Error> {
//! let client = fetchmd::FetchClient::builder().max_redirects(3).build();
//! let html = client.fetch("https://example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod error;
pub mod fetcher;
pub mod input;
pub mod render;
pub mod resolver;
pub mod security;
pub mod transport;
mod types;

pub use client::{fetch, fetch_with_budget, FetchClient, FetchClientBuilder};
pub use error::{Error, FetchError, InputError, RenderError, SecurityError, TransportError};
pub use fetcher::BoundedFetcher;
pub use input::{read_bounded, resolve_input, InputSource, MAX_INPUT_BYTES};
pub use render::Renderer;
pub use resolver::{DnsResolver, SystemResolver};
pub use security::{is_private_ip, validate_url, ValidatedUrl};
pub use transport::{BodyStream, HopRequest, HopResponse, ReqwestTransport, Transport};
pub use types::{
    FetchBudget, HopOutcome, DEFAULT_MAX_BYTES, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS,
};

/// User-Agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("fetchmd/", env!("CARGO_PKG_VERSION"));

/// Accept header sent with every request
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";
