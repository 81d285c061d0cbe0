//! Per-client request quota.
//!
//! Every peer IP gets a bucket of `max_requests` that refills evenly over
//! `window`. Requests beyond the quota are answered with 429 before they
//! reach a handler.

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, ResponseError,
};
use async_trait::async_trait;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::AppError;
use crate::scheduler::{JobResult, SchedulerJob};

/// Keyed limiter shared by all workers.
pub struct IpRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl IpRateLimiter {
    /// Allow `max_requests` per `window` for each IP.
    ///
    /// Returns `None` when either value is zero, which disables limiting.
    pub fn new(max_requests: u32, window: Duration) -> Option<Self> {
        let burst = NonZeroU32::new(max_requests)?;
        let quota = Quota::with_period(window / max_requests)?.allow_burst(burst);

        Some(Self {
            limiter: RateLimiter::keyed(quota),
        })
    }

    /// Take one request from `ip`'s bucket; `false` once it is empty.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Forget buckets that have fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

impl std::fmt::Debug for IpRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpRateLimiter")
            .field("tracked_clients", &self.limiter.len())
            .finish()
    }
}

/// Periodically drops idle client buckets so the map does not grow forever.
pub struct RateLimitPruneJob {
    limiter: web::Data<IpRateLimiter>,
    interval: Duration,
}

impl RateLimitPruneJob {
    pub fn new(limiter: web::Data<IpRateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }
}

#[async_trait]
impl SchedulerJob for RateLimitPruneJob {
    fn name(&self) -> &'static str {
        "RateLimitPrune"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> JobResult {
        self.limiter.prune();
        tracing::debug!(tracked_clients = self.limiter.limiter.len(), "Pruned rate limiter");
        Ok(())
    }
}

/// Middleware rejecting clients that used up their quota.
///
/// Requests pass untouched when no [`IpRateLimiter`] is registered as app
/// data or the peer address is unknown.
pub async fn rate_limit<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let limited = match (
        req.app_data::<web::Data<IpRateLimiter>>(),
        req.peer_addr(),
    ) {
        (Some(limiter), Some(peer)) => !limiter.check(peer.ip()),
        _ => false,
    };

    if limited {
        tracing::warn!(
            peer = ?req.peer_addr(),
            path = %req.path(),
            "Rate limit exceeded"
        );
        let response = AppError::RateLimited.error_response();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}
