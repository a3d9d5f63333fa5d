//! Bounded single-hop fetcher
//!
//! Sends one request through a [`Transport`] and interprets the response:
//! redirects are handed back unvalidated, error statuses are mapped to
//! caller-facing messages, and HTML bodies are streamed into a buffer that
//! never grows past the byte ceiling.

use crate::error::FetchError;
use crate::security::ValidatedUrl;
use crate::transport::{BodyStream, HopRequest, HopResponse, Transport};
use crate::types::{FetchBudget, HopOutcome};
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use std::sync::Arc;
use tracing::{debug, warn};

/// Media types accepted as HTML
const HTML_MEDIA_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Fetches one hop within a [`FetchBudget`]
#[derive(Clone)]
pub struct BoundedFetcher {
    transport: Arc<dyn Transport>,
}

impl BoundedFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch `target` once
    ///
    /// The budget timeout covers the whole hop, headers and body. When it
    /// fires, the in-flight request and body stream are dropped, which
    /// releases the connection.
    pub async fn fetch(
        &self,
        target: &ValidatedUrl,
        budget: &FetchBudget,
    ) -> Result<HopOutcome, FetchError> {
        match tokio::time::timeout(budget.timeout(), self.fetch_hop(target, budget)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(url = %target, timeout_ms = budget.timeout_ms, "Request timed out");
                Err(FetchError::Timeout {
                    timeout_ms: budget.timeout_ms,
                })
            }
        }
    }

    async fn fetch_hop(
        &self,
        target: &ValidatedUrl,
        budget: &FetchBudget,
    ) -> Result<HopOutcome, FetchError> {
        let request = HopRequest {
            url: target.url().clone(),
            pinned_addr: target.resolved_addr(),
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| FetchError::Failed(e.to_string()))?;

        let status = response.status;
        debug!(url = %target, status, "Received response");

        if (300..400).contains(&status) {
            return redirect_target(target, &response).map(HopOutcome::Redirect);
        }

        if !(200..300).contains(&status) {
            return Err(FetchError::from_status(status));
        }

        let content_type = response
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !is_html_content_type(content_type) {
            return Err(FetchError::NotHtml(content_type.to_string()));
        }

        let body = read_body_bounded(response.body, budget.max_bytes).await?;
        Ok(HopOutcome::Html(String::from_utf8_lossy(&body).into_owned()))
    }
}

/// Resolve the Location header against the current URL
fn redirect_target(current: &ValidatedUrl, response: &HopResponse) -> Result<url::Url, FetchError> {
    let location = response
        .headers
        .get(LOCATION)
        .ok_or(FetchError::MissingLocation {
            status: response.status,
        })?;
    let location = location.to_str().map_err(|_| {
        FetchError::InvalidLocation(String::from_utf8_lossy(location.as_bytes()).into_owned())
    })?;

    let next = current
        .url()
        .join(location)
        .map_err(|_| FetchError::InvalidLocation(location.to_string()))?;
    debug!(from = %current, to = %next, status = response.status, "Redirect");
    Ok(next)
}

/// Check if content type indicates HTML or XHTML
fn is_html_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    HTML_MEDIA_TYPES.iter().any(|t| ct_lower.contains(t))
}

/// Read the body chunk by chunk, failing as soon as the total passes `limit`
async fn read_body_bounded(mut stream: BodyStream, limit: u64) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::Failed(e.to_string()))?;
        received += chunk.len() as u64;
        if received > limit {
            warn!(limit, received, "Response exceeds byte limit");
            return Err(FetchError::TooLarge { limit, received });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
