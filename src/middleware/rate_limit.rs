use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    rate_limit::{RateLimitStatus, RateLimiter},
};

/// Client identifier: `x-real-ip`, then the first `x-forwarded-for` hop,
/// then the socket peer.
pub fn client_ip<B>(req: &Request<B>) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

fn set_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(status.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(status.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(status.reset_in_secs));
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    let status = limiter.check(&ip).await;

    if status.is_limited {
        tracing::warn!("Rate limit exceeded for IP {}", ip);
        let mut response = AppError::RateLimited {
            retry_after_secs: status.reset_in_secs,
        }
        .into_response();
        set_limit_headers(response.headers_mut(), &status);
        return response;
    }

    let mut response = next.run(req).await;
    set_limit_headers(response.headers_mut(), &status);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn prefers_real_ip_header() {
        let req = request(&[("x-real-ip", "203.0.113.7"), ("x-forwarded-for", "198.51.100.1")]);
        assert_eq!(client_ip(&req), "203.0.113.7");
    }

    #[test]
    fn uses_first_forwarded_hop() {
        let req = request(&[("x-forwarded-for", " 198.51.100.1, 10.0.0.1")]);
        assert_eq!(client_ip(&req), "198.51.100.1");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 4000))));
        assert_eq!(client_ip(&req), "192.0.2.9");
        assert_eq!(client_ip(&request(&[])), "unknown");
    }
}
