use actix_web::{
    Error, ResponseError,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use super::client_address;
use crate::config::RateQuota;
use crate::error::ApiError;

const PRUNE_THRESHOLD: usize = 10_000;

/// Per-client minute and hour quotas for one route, shared by every worker
/// in the process.
pub struct ClientRateLimiter {
    per_minute: DefaultKeyedRateLimiter<String>,
    per_hour: DefaultKeyedRateLimiter<String>,
    pair: Mutex<()>,
}

impl ClientRateLimiter {
    pub fn new(quota: RateQuota) -> Self {
        Self::with_quotas(
            Quota::per_minute(quota.per_minute),
            Quota::per_hour(quota.per_hour),
        )
    }

    fn with_quotas(minute: Quota, hour: Quota) -> Self {
        Self {
            per_minute: RateLimiter::keyed(minute),
            per_hour: RateLimiter::keyed(hour),
            pair: Mutex::new(()),
        }
    }

    /// Counts the request against both windows and returns whether it is
    /// within quota. A request refused by the minute window is not counted
    /// against the hour.
    pub fn check(&self, client: &str) -> bool {
        let _pair = match self.pair.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if self.per_hour.len() > PRUNE_THRESHOLD {
            self.per_minute.retain_recent();
            self.per_hour.retain_recent();
        }

        let key = client.to_string();
        self.per_minute.check_key(&key).is_ok() && self.per_hour.check_key(&key).is_ok()
    }
}

/// Middleware that enforces a [`ClientRateLimiter`] on the wrapped route.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<ClientRateLimiter>,
    scope: &'static str,
}

impl RateLimit {
    pub fn new(limiter: Arc<ClientRateLimiter>, scope: &'static str) -> Self {
        Self { limiter, scope }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitService {
            service: Arc::new(service),
            config: self.clone(),
        })
    }
}

pub struct RateLimitService<S> {
    service: Arc<S>,
    config: RateLimit,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let client = client_address(&req);
            if config.limiter.check(&client) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            log::warn!("Rate limit exceeded for {} on {}", client, config.scope);
            let (http_req, _payload) = req.into_parts();
            let response = ApiError::RateLimited.error_response().map_into_right_body();
            Ok(ServiceResponse::new(http_req, response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use std::time::Duration;

    fn quota(per_minute: u32, per_hour: u32) -> RateQuota {
        RateQuota {
            per_minute: NonZeroU32::new(per_minute).unwrap(),
            per_hour: NonZeroU32::new(per_hour).unwrap(),
        }
    }

    #[test]
    fn requests_over_the_minute_quota_are_rejected() {
        let limiter = ClientRateLimiter::new(quota(3, 100));
        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1"));
        }
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn hour_quota_caps_the_minute_burst() {
        let limiter = ClientRateLimiter::new(quota(10, 4));
        let accepted = (0..10).filter(|_| limiter.check("10.0.0.1")).count();
        assert_eq!(accepted, 4);
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = ClientRateLimiter::new(quota(2, 100));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn quota_replenishes_over_time() {
        let short = Quota::with_period(Duration::from_millis(20))
            .unwrap()
            .allow_burst(NonZeroU32::new(1).unwrap());
        let limiter = ClientRateLimiter::with_quotas(short, Quota::per_hour(NonZeroU32::new(100).unwrap()));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check("10.0.0.1"));
    }
}
