//! Rate limiting for login and registration.
//!
//! Token bucket per client IP. Login and registration have separate buckets
//! with the same per-minute quota.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::auth::{ClientIpHeader, extract_client_ip};

/// Default attempts per minute per IP.
pub const DEFAULT_AUTH_RATE_LIMIT_PER_MINUTE: u32 = 30;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
pub struct RateLimitConfig {
    pub login: IpLimiter,
    /// Shared by `/auth/register` and public `POST /users`
    pub register: IpLimiter,
    /// Proxy header to read the client IP from; `None` uses the socket address
    pub ip_header: Option<ClientIpHeader>,
}

impl RateLimitConfig {
    /// Create limiters allowing `per_minute` attempts per IP (minimum 1).
    pub fn new(per_minute: u32, ip_header: Option<ClientIpHeader>) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            login: RateLimiter::keyed(quota),
            register: RateLimiter::keyed(quota),
            ip_header,
        }
    }

    /// Drop buckets that have fully refilled, so the key maps stay bounded.
    pub fn retain_recent(&self) {
        for limiter in [&self.login, &self.register] {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
        debug!(
            login_keys = self.login.len(),
            register_keys = self.register.len(),
            "Pruned rate limiter state"
        );
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_RATE_LIMIT_PER_MINUTE, None)
    }
}

fn check(
    config: &RateLimitConfig,
    limiter: &IpLimiter,
    request: &Request,
    what: &str,
) -> Result<(), ApiError> {
    let ip = extract_client_ip(request, config.ip_header).ok_or_else(|| {
        warn!("Rejected {} attempt without a usable client IP header", what);
        ApiError::forbidden("Unable to determine client IP")
    })?;
    limiter.check_key(&ip).map_err(|_| {
        warn!(ip = %ip, "Rate limited {} attempt", what);
        ApiError::TooManyRequests
    })
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config, &config.login, &request, "login") {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Middleware for rate limiting user registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config, &config.register, &request, "registration") {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
