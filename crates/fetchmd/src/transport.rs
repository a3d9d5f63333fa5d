//! Single-request HTTP transport
//!
//! A [`Transport`] issues exactly one request and never follows redirects.
//! Redirect handling, status mapping and size limits all live in
//! [`BoundedFetcher`](crate::fetcher::BoundedFetcher).

use crate::error::TransportError;
use crate::{ACCEPT_HTML, DEFAULT_USER_AGENT};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::redirect::Policy;
use std::net::{IpAddr, SocketAddr};
use url::Url;

/// Lazy, finite, non-restartable sequence of body chunks
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// One outbound request
#[derive(Debug, Clone)]
pub struct HopRequest {
    pub url: Url,
    /// Address approved by the validator; the transport must connect here
    pub pinned_addr: Option<IpAddr>,
}

/// Response head plus an unread body
pub struct HopResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl std::fmt::Debug for HopResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HopResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs one HTTP GET with redirect-following disabled
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HopRequest) -> Result<HopResponse, TransportError>;
}

/// Production transport built on reqwest
///
/// A client is built per hop so the hostname can be pinned to the address
/// the validator approved. Pinned hops bypass proxies, since a proxy would
/// resolve the name again on its own.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Send `user_agent` instead of [`DEFAULT_USER_AGENT`]
    ///
    /// Values that are not valid header text fall back to the default.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn build_client(&self, request: &HopRequest) -> Result<reqwest::Client, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(Policy::none());

        if let (Some(ip), Some(host)) = (request.pinned_addr, request.url.domain()) {
            let port = request.url.port_or_known_default().unwrap_or(443);
            builder = builder.no_proxy().resolve(host, SocketAddr::new(ip, port));
        }

        builder.build().map_err(TransportError::ClientBuild)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HopRequest) -> Result<HopResponse, TransportError> {
        let client = self.build_client(&request)?;

        let response = client
            .get(request.url.clone())
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map_err(TransportError::from_reqwest)
            .boxed();

        Ok(HopResponse {
            status,
            headers,
            body,
        })
    }
}
