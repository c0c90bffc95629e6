//! Client-side rate limiting
//!
//! Every physical request acquires one token before it is sent. The default
//! limiter is a GCRA token bucket from `governor`; anything implementing
//! [`RateLimiter`] can be plugged into the client builder instead.

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::time::Duration;
use turbopve_core::cancel::Context;

/// Throttles outbound requests.
#[async_trait]
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    /// Wait until one request may be sent.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Cancelled`] as soon as `ctx` is cancelled or its
    /// deadline passes.
    async fn wait(&self, ctx: &Context) -> Result<()>;
}

/// Token bucket limiter: a steady rate plus a burst allowance.
pub struct TokenBucketLimiter {
    governor: DefaultDirectRateLimiter,
    requests_per_second: f64,
    burst: u32,
}

impl TokenBucketLimiter {
    /// Create a limiter admitting `requests_per_second` on average and at
    /// most `burst` requests back to back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the rate is not a positive finite
    /// number or the burst is zero.
    pub fn new(requests_per_second: f64, burst: u32) -> Result<Self> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(Error::Config(format!(
                "rate limit must be a positive number of requests per second, got {requests_per_second}"
            )));
        }
        let burst_size = NonZeroU32::new(burst)
            .ok_or_else(|| Error::Config("rate limit burst must be at least 1".to_string()))?;

        let period = Duration::from_secs_f64(1.0 / requests_per_second);
        let quota = Quota::with_period(period)
            .ok_or_else(|| Error::Config(format!("rate limit period {period:?} is zero")))?
            .allow_burst(burst_size);

        Ok(Self {
            governor: governor::RateLimiter::direct(quota),
            requests_per_second,
            burst,
        })
    }

    /// Build the limiter described by `config`; `None` when limiting is off.
    pub fn from_config(config: &RateLimitConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        Self::new(config.requests_per_second, config.burst).map(Some)
    }

    /// Steady request rate.
    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    /// Burst capacity.
    pub fn burst(&self) -> u32 {
        self.burst
    }
}

impl std::fmt::Debug for TokenBucketLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucketLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst", &self.burst)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn wait(&self, ctx: &Context) -> Result<()> {
        ctx.run(self.governor.until_ready()).await?;
        Ok(())
    }
}
