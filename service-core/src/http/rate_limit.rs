//! Client-side pacing for calls to rate-limited third-party APIs.

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::{num::NonZeroU32, sync::Arc};

/// Rate limiter for global/unkeyed use
pub type OutboundRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a limiter allowing `per_second` requests per second with an equal burst.
///
/// A value of zero is treated as one so the limiter can always make progress.
pub fn create_outbound_rate_limiter(per_second: u32) -> OutboundRateLimiter {
    let per_second = NonZeroU32::new(per_second.max(1)).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

/// Wait until the limiter hands out a permit.
pub async fn acquire(limiter: &OutboundRateLimiter) {
    limiter.until_ready().await;
}
