//! # Rate Limiting
//!
//! Per-client request quota on `governor`, keyed by peer address. Every
//! response carries `RateLimit-Limit`, `RateLimit-Remaining` and
//! `RateLimit-Reset`; rejected requests get 429 with `Retry-After`.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

type ClientLimiter =
    RateLimiter<NotKeyed, InMemoryState, DefaultClock, StateInformationMiddleware>;

/// Shared limiter state, one token bucket per client address
#[derive(Clone)]
pub struct RateLimits {
    quota: Quota,
    limit: u32,
    /// Time to regain one request
    replenish: Duration,
    message: Arc<str>,
    limiters: Arc<DashMap<IpAddr, Arc<ClientLimiter>>>,
}

impl RateLimits {
    /// A bucket of `max_requests` that refills completely over `window`
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let replenish = config.window / burst.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            quota,
            limit: burst.get(),
            replenish,
            message: Arc::from(config.message.as_str()),
            limiters: Arc::new(DashMap::new()),
        }
    }

    fn limiter(&self, client: IpAddr) -> Arc<ClientLimiter> {
        self.limiters
            .entry(client)
            .or_insert_with(|| {
                Arc::new(RateLimiter::direct(self.quota).with_middleware::<StateInformationMiddleware>())
            })
            .clone()
    }

    fn write_headers(&self, headers: &mut HeaderMap, remaining: u32) {
        let reset = self.replenish * (self.limit - remaining.min(self.limit));
        let reset_secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);

        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
        headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_secs));
    }
}

/// Peer address of the connection, unspecified when the server was not
/// started with connect info
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| {
            addr.ip()
        })
}

/// Reject requests beyond the client's quota with 429.
pub async fn enforce(State(limits): State<RateLimits>, req: Request, next: Next) -> Response {
    let client = client_ip(&req);

    match limits.limiter(client).check() {
        Ok(snapshot) => {
            let mut response = next.run(req).await;
            limits.write_headers(response.headers_mut(), snapshot.remaining_burst_capacity());
            response
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            tracing::warn!(%client, retry_after, "Rate limit exceeded");

            let mut response = ApiError::RateLimited(limits.message.to_string()).into_response();
            let headers = response.headers_mut();
            limits.write_headers(headers, 0);
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}
