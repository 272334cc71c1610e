//! Shared HTTP plumbing for source adapters.
//!
//! Article pages are linked from third-party feeds, so every outbound URL is
//! checked against private and reserved hosts before it is requested.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;

use crate::{NewswireError, Result};

/// User agent string for outbound requests.
pub const USER_AGENT: &str = "newswire/0.1 (news aggregator)";

/// Build an HTTP client with the given timeouts and redirect limit.
pub fn build_client(
    connect_timeout: Duration,
    total_timeout: Duration,
    max_redirects: usize,
) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(total_timeout)
        .redirect(reqwest::redirect::Policy::limited(max_redirects))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| NewswireError::Fetch(format!("failed to create HTTP client: {}", e)))
}

/// Validate a URL before fetching it.
///
/// The URL must use http or https and must not point at a loopback,
/// private, link-local or reserved host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| NewswireError::Fetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(NewswireError::Fetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| NewswireError::Fetch("URL has no host".to_string()))?;

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(NewswireError::Fetch(format!("forbidden host: {}", domain)));
            }
            return Ok(());
        }
        url::Host::Ipv4(ipv4) => IpAddr::V4(ipv4),
        url::Host::Ipv6(ipv6) => IpAddr::V6(ipv6),
    };

    if is_private_ip(&ip) {
        return Err(NewswireError::Fetch(format!(
            "private IP address not allowed: {}",
            ip
        )));
    }
    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    let host = host.to_lowercase();
    if host == "localhost" {
        return true;
    }
    [".local", ".localhost", ".internal", ".intranet", ".lan"]
        .iter()
        .any(|suffix| host.ends_with(suffix))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Carrier-grade NAT 100.64.0.0/10
                || (ipv4.octets()[0] == 100 && (ipv4.octets()[1] & 0xc0) == 64)
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local fe80::/10
                || (first & 0xffc0) == 0xfe80
        }
    }
}
