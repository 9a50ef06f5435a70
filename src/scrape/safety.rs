// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Outbound URL safety policy
//!
//! Keeps the fetchers away from internal infrastructure: only http(s),
//! no localhost names, no IP literals, and no host that resolves to a
//! loopback, private, link-local, multicast or otherwise reserved address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use url::Url;

/// Why a URL was refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnsafeUrlError {
    #[error("invalid URL: {0}")]
    Invalid(String),
    #[error("scheme not allowed: {0}")]
    Scheme(String),
    #[error("missing host")]
    MissingHost,
    #[error("localhost is blocked: {0}")]
    Localhost(String),
    #[error("IP literal is blocked: {0}")]
    IpLiteral(String),
    #[error("DNS resolution failed for {0}")]
    Unresolvable(String),
    #[error("resolved address is blocked: {0}")]
    BlockedAddress(IpAddr),
}

/// Outbound URL policy
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlSafetyPolicy {
    /// Skip the host and address checks (tests, intranet deployments)
    pub allow_private_hosts: bool,
}

impl UrlSafetyPolicy {
    pub fn new(allow_private_hosts: bool) -> Self {
        Self {
            allow_private_hosts,
        }
    }

    /// Checks that need no I/O: scheme, host presence, localhost, IP literal
    pub fn check_syntax(&self, url: &str) -> Result<Url, UnsafeUrlError> {
        let parsed = Url::parse(url).map_err(|e| UnsafeUrlError::Invalid(e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UnsafeUrlError::Scheme(parsed.scheme().to_string()));
        }

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(UnsafeUrlError::MissingHost)?
            .to_ascii_lowercase();

        if self.allow_private_hosts {
            return Ok(parsed);
        }

        if is_localhost(&host) {
            return Err(UnsafeUrlError::Localhost(host));
        }
        if host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok() {
            return Err(UnsafeUrlError::IpLiteral(host));
        }

        Ok(parsed)
    }

    /// Syntax checks plus DNS resolution of the host
    pub async fn check_resolved(&self, url: &str) -> Result<(), UnsafeUrlError> {
        let parsed = self.check_syntax(url)?;
        if self.allow_private_hosts {
            return Ok(());
        }

        let host = parsed.host_str().unwrap_or_default().to_string();
        let port = parsed.port_or_known_default().unwrap_or(80);

        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|_| UnsafeUrlError::Unresolvable(host.clone()))?
            .map(|sa| sa.ip())
            .collect();

        if addrs.is_empty() {
            return Err(UnsafeUrlError::Unresolvable(host));
        }
        if let Some(ip) = addrs.into_iter().find(|ip| ip_is_blocked(*ip)) {
            return Err(UnsafeUrlError::BlockedAddress(ip));
        }
        Ok(())
    }
}

fn is_localhost(host: &str) -> bool {
    host == "localhost" || host == "localhost.localdomain" || host.ends_with(".localhost")
}

/// Addresses the fetchers must never connect to
pub fn ip_is_blocked(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => ipv4_is_blocked(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => ipv4_is_blocked(v4),
            None => ipv6_is_blocked(v6),
        },
    }
}

fn ipv4_is_blocked(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
        // 0.0.0.0/8, carrier-grade NAT 100.64.0.0/10, reserved 240.0.0.0/4
        || a == 0
        || (a == 100 && (64..128).contains(&b))
        || a >= 240
}

fn ipv6_is_blocked(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // unique local fc00::/7, link-local fe80::/10, documentation 2001:db8::/32
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first == 0x2001 && ip.segments()[1] == 0x0db8)
}
