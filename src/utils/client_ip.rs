//! Client address resolution.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Resolves the client address of a request.
///
/// When `behind_proxy` is set, the first `X-Forwarded-For` entry and then
/// `X-Real-IP` are consulted before the socket peer. Header values that are
/// not valid IP addresses are ignored. Enable only behind a trusted proxy:
/// these headers are client-controlled otherwise.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, behind_proxy: bool) -> Option<IpAddr> {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };

        if let Some(ip) = forwarded.or_else(real_ip) {
            return Some(ip);
        }
    }

    peer.map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:51000".parse().unwrap())
    }

    #[test]
    fn test_peer_address_without_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5"));

        assert_eq!(
            client_ip(&headers, peer(), false),
            Some("192.0.2.10".parse().unwrap())
        );
    }

    #[test]
    fn test_forwarded_for_first_entry_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );

        assert_eq!(
            client_ip(&headers, peer(), true),
            Some("203.0.113.5".parse().unwrap())
        );
    }

    #[test]
    fn test_real_ip_and_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        headers.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));

        assert_eq!(
            client_ip(&headers, peer(), true),
            Some("2001:db8::1".parse().unwrap())
        );
        assert_eq!(client_ip(&HeaderMap::new(), None, true), None);
    }
}
