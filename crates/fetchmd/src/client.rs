//! Fetch orchestration for fetchmd
//!
//! [`FetchClient`] runs the redirect loop: every hop is validated by
//! [`validate_url`](crate::security::validate_url) before the
//! [`BoundedFetcher`] is allowed to contact it, so a redirect into a private
//! network is rejected exactly like a direct request would be.

use crate::error::{Error, FetchError, SecurityError};
use crate::fetcher::BoundedFetcher;
use crate::resolver::{DnsResolver, SystemResolver};
use crate::security::{validate_url, ValidatedUrl};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{FetchBudget, HopOutcome};
use std::sync::Arc;
use tracing::debug;

/// Where one fetch currently stands
///
/// `Validating -> Fetching -> {Validating (redirect) | done | failed}`.
enum HopState {
    Validating(String),
    Fetching(ValidatedUrl),
}

/// Validating, bounded HTML fetch client
///
/// Cloning is cheap. Clones share only the immutable transport and
/// resolver; each call keeps its own redirect state, so concurrent fetches
/// are independent.
#[derive(Clone)]
pub struct FetchClient {
    fetcher: BoundedFetcher,
    resolver: Arc<dyn DnsResolver>,
    budget: FetchBudget,
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    /// Client using the system resolver, reqwest and the default budget
    pub fn new() -> Self {
        FetchClientBuilder::new().build()
    }

    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::new()
    }

    /// Budget used by [`fetch`](Self::fetch)
    pub fn budget(&self) -> &FetchBudget {
        &self.budget
    }

    /// Run `candidate` through the URL safety policy
    pub async fn validate(&self, candidate: &str) -> Result<ValidatedUrl, SecurityError> {
        validate_url(candidate, self.resolver.as_ref()).await
    }

    /// Fetch `url` as HTML with the client's budget
    pub async fn fetch(&self, url: &str) -> Result<String, Error> {
        self.fetch_with_budget(url, &self.budget).await
    }

    /// Fetch `url` as HTML with an explicit budget
    ///
    /// Makes at most `max_redirects + 1` requests, strictly one after the
    /// other. Nothing is retried.
    pub async fn fetch_with_budget(
        &self,
        url: &str,
        budget: &FetchBudget,
    ) -> Result<String, Error> {
        let mut state = HopState::Validating(url.to_string());
        let mut attempts: u64 = 0;

        loop {
            state = match state {
                HopState::Validating(candidate) => {
                    HopState::Fetching(self.validate(&candidate).await?)
                }
                HopState::Fetching(target) => {
                    if attempts > u64::from(budget.max_redirects) {
                        return Err(FetchError::TooManyRedirects {
                            max: budget.max_redirects,
                        }
                        .into());
                    }
                    attempts += 1;
                    debug!(url = %target, hop = attempts, "Fetching hop");

                    match self.fetcher.fetch(&target, budget).await? {
                        HopOutcome::Redirect(next) => HopState::Validating(next.into()),
                        HopOutcome::Html(html) => return Ok(html),
                    }
                }
            };
        }
    }
}

/// Builder for [`FetchClient`]
#[derive(Default)]
pub struct FetchClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    resolver: Option<Arc<dyn DnsResolver>>,
    user_agent: Option<String>,
    budget: FetchBudget,
}

impl FetchClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the HTTP transport
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the hostname resolver
    pub fn resolver(mut self, resolver: impl DnsResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// User-Agent for the default reqwest transport
    ///
    /// Ignored when a custom transport is supplied.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replace the whole default budget
    pub fn budget(mut self, budget: FetchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.budget.timeout_ms = timeout_ms;
        self
    }

    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.budget.max_bytes = max_bytes;
        self
    }

    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.budget.max_redirects = max_redirects;
        self
    }

    pub fn build(self) -> FetchClient {
        let user_agent = self.user_agent;
        let transport = self.transport.unwrap_or_else(|| {
            let mut transport = ReqwestTransport::new();
            if let Some(ua) = user_agent {
                transport = transport.with_user_agent(ua);
            }
            Arc::new(transport)
        });
        let resolver = self.resolver.unwrap_or_else(|| Arc::new(SystemResolver));
        FetchClient {
            fetcher: BoundedFetcher::new(transport),
            resolver,
            budget: self.budget,
        }
    }
}

/// Fetch a URL as HTML with the default client and budget
pub async fn fetch(url: &str) -> Result<String, Error> {
    FetchClient::new().fetch(url).await
}

/// Fetch a URL as HTML with the default client and a custom budget
pub async fn fetch_with_budget(url: &str, budget: &FetchBudget) -> Result<String, Error> {
    FetchClient::new().fetch_with_budget(url, budget).await
}
