//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Two limiters guard the endpoints that write data or check secrets:
//! - `checkout_rate_limiter`: order submission (~6/min per IP)
//! - `admin_login_rate_limiter`: admin password attempts (~5/min per IP)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor keyed on the address seen by the edge proxy.
///
/// Only headers the proxy itself writes are trusted: `fly-client-ip`, then the
/// last `X-Forwarded-For` hop (the one the proxy appended). Anything earlier
/// in `X-Forwarded-For` came from the client. Without either header the peer
/// address is used.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

/// Header the edge proxy sets to the connecting client's address.
const PROXY_CLIENT_IP_HEADER: &str = "fly-client-ip";

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        if let Some(ip) = headers
            .get(PROXY_CLIENT_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_ip)
        {
            return Ok(ip);
        }

        if let Some(ip) = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|s| s.split(','))
            .next_back()
            .and_then(parse_ip)
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for checkout submissions: ~6 requests per minute per IP.
///
/// Configuration: 1 request every 10 seconds (replenish), burst of 3.
///
/// # Panics
///
/// Does not panic: `per_second(10)` and `burst_size(3)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(10)
        .burst_size(3)
        .finish()
        .expect("rate limiter config with per_second(10) and burst_size(3) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for admin login: ~5 attempts per minute per IP.
///
/// Configuration: 1 request every 12 seconds (replenish), burst of 5.
///
/// # Panics
///
/// Does not panic: `per_second(12)` and `burst_size(5)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
pub fn admin_login_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(12)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(12) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/checkout");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_proxy_client_ip_wins() {
        let req = request(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("fly-client-ip", "203.0.113.7"),
        ]);
        let ip = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_forwarded_for_uses_proxy_hop() {
        let req = request(&[("x-forwarded-for", "1.2.3.4, 198.51.100.2")]);
        let ip = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "198.51.100.2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_spoofed_headers_do_not_change_key() {
        let honest = request(&[("x-forwarded-for", "198.51.100.2")]);
        for forged in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            let req = request(&[
                ("cf-connecting-ip", forged),
                ("x-real-ip", forged),
                ("x-forwarded-for", &format!("{forged}, 198.51.100.2")),
            ]);
            assert_eq!(
                ClientIpKeyExtractor.extract(&req).unwrap(),
                ClientIpKeyExtractor.extract(&honest).unwrap()
            );
        }
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = request(&[]);
        let peer: SocketAddr = "192.0.2.9:5000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(ClientIpKeyExtractor.extract(&req).unwrap(), peer.ip());
    }

    #[test]
    fn test_no_source_is_an_error() {
        assert!(ClientIpKeyExtractor.extract(&request(&[])).is_err());
    }
}
