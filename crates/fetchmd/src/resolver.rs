//! Hostname resolution capability
//!
//! The validator never calls the system resolver directly. Whatever
//! implementation the client was built with is passed in, so tests can use
//! deterministic answers and deployments can plug in caching or DoH.

use async_trait::async_trait;
use std::io;
use std::net::IpAddr;

/// Resolves a hostname to the single address the validator will classify
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn lookup(&self, hostname: &str) -> io::Result<IpAddr>;
}

/// Resolver backed by the operating system (via tokio)
///
/// Returns the first address reported, like `getaddrinfo` callers usually do.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn lookup(&self, hostname: &str) -> io::Result<IpAddr> {
        let mut addrs = tokio::net::lookup_host((hostname, 0)).await?;
        addrs.next().map(|addr| addr.ip()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {}", hostname),
            )
        })
    }
}
