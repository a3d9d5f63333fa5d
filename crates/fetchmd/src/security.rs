//! URL safety validation (SSRF defense)
//!
//! A candidate URL is approved only if it uses https, its host is not on
//! the denylist, and its address (literal or resolved) is outside the
//! private/reserved ranges below. The range table is a denylist: anything
//! not listed is treated as public. IPv4-mapped IPv6 and NAT64 prefixes are
//! not covered.
//!
//! | Family | Blocked |
//! |--------|---------|
//! | IPv4   | `0.0.0.0/8`, `10.0.0.0/8`, `127.0.0.0/8`, `169.254.0.0/16`, `172.16.0.0/12`, `192.168.0.0/16` |
//! | IPv6   | `::1`, `fc00::/7`, `fe80::/10` |

use crate::error::SecurityError;
use crate::resolver::DnsResolver;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{debug, warn};
use url::{Host, Url};

/// The only scheme a URL may use
const ALLOWED_SCHEME: &str = "https";

/// Hostnames rejected before any resolution
const BLOCKED_HOSTNAMES: &[&str] = &["localhost"];

/// A URL approved for one connection attempt
///
/// Only [`validate_url`] can produce one. It is deliberately not `Clone`:
/// every redirect hop has to go back through the validator.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidatedUrl {
    url: Url,
    resolved: Option<IpAddr>,
}

impl ValidatedUrl {
    /// The approved URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Always `"https"`
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, or 443
    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(443)
    }

    /// Address the hostname resolved to at validation time
    ///
    /// `None` when the host was already a literal IP address.
    pub fn resolved_addr(&self) -> Option<IpAddr> {
        self.resolved
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Validate `candidate` against the contact policy
///
/// Performs at most one DNS lookup through `resolver`. Results are never
/// cached, so re-validating the same hostname resolves it again.
pub async fn validate_url(
    candidate: &str,
    resolver: &dyn DnsResolver,
) -> Result<ValidatedUrl, SecurityError> {
    let url =
        Url::parse(candidate).map_err(|_| SecurityError::InvalidUrl(candidate.to_string()))?;

    if url.scheme() != ALLOWED_SCHEME {
        warn!(url = %candidate, scheme = url.scheme(), "Rejected URL scheme");
        return Err(SecurityError::SchemeNotAllowed(url.scheme().to_string()));
    }

    let host = url
        .host()
        .map(|h| h.to_owned())
        .ok_or_else(|| SecurityError::InvalidUrl(candidate.to_string()))?;

    let resolved = match host {
        Host::Ipv4(ip) => {
            check_literal(IpAddr::V4(ip))?;
            None
        }
        Host::Ipv6(ip) => {
            check_literal(IpAddr::V6(ip))?;
            None
        }
        Host::Domain(hostname) => {
            if is_blocked_hostname(&hostname) {
                warn!(hostname = %hostname, "Rejected blocked hostname");
                return Err(SecurityError::BlockedHostname(hostname));
            }

            let address = match resolver.lookup(&hostname).await {
                Ok(address) => address,
                Err(source) => {
                    warn!(hostname = %hostname, error = %source, "Hostname lookup failed");
                    return Err(SecurityError::Unresolvable { hostname, source });
                }
            };

            if is_private_ip(address) {
                warn!(hostname = %hostname, address = %address, "Hostname resolved to private address");
                return Err(SecurityError::ResolvedToPrivate { hostname, address });
            }
            Some(address)
        }
    };

    debug!(url = %url, resolved = ?resolved, "URL validated");
    Ok(ValidatedUrl { url, resolved })
}

fn check_literal(ip: IpAddr) -> Result<(), SecurityError> {
    if is_private_ip(ip) {
        warn!(address = %ip, "Rejected private address literal");
        return Err(SecurityError::PrivateAddress(ip));
    }
    Ok(())
}

fn is_blocked_hostname(hostname: &str) -> bool {
    BLOCKED_HOSTNAMES
        .iter()
        .any(|blocked| hostname.eq_ignore_ascii_case(blocked))
}

/// Returns true if `ip` falls in a blocked range
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 0
        || a == 10
        || a == 127
        || (a == 169 && b == 254)
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        // fc00::/7
        || first & 0xfe00 == 0xfc00
        // fe80::/10
        || first & 0xffc0 == 0xfe80
}
