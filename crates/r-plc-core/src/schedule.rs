//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Fixed-period scheduling for the control loop."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Async rate limiter for the control loop. A slow tick pushes the schedule
/// back instead of firing a burst of catch-up ticks.
#[derive(Debug)]
pub struct RateLimiter {
    period: Duration,
    interval: tokio::time::Interval,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { period, interval }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Resolves at the next scheduled instant. The first call returns
    /// immediately.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
