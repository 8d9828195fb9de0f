//! Lookback window evaluation

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics::TrafficSource;
use crate::models::{TimeWindow, TrafficObservation, TrafficQuery};

/// Computes the lookback window and asks the metrics source how much traffic it saw
pub struct WindowEvaluator {
    /// Metrics source, already holding its credentials
    source: Box<dyn TrafficSource>,
    /// Zone identifier to query
    zone_tag: String,
    /// Host name filter
    target_host: String,
    /// Window length
    lookback: Duration,
}

impl WindowEvaluator {
    /// Create a new window evaluator
    pub fn new(
        source: Box<dyn TrafficSource>,
        zone_tag: impl Into<String>,
        target_host: impl Into<String>,
        lookback: Duration,
    ) -> Self {
        Self {
            source,
            zone_tag: zone_tag.into(),
            target_host: target_host.into(),
            lookback,
        }
    }

    /// Create an evaluator with zone, host and lookback from `config`
    pub fn from_config(source: Box<dyn TrafficSource>, config: &Config) -> Self {
        Self::new(
            source,
            config.metrics.zone_tag.clone(),
            config.metrics.target_host.clone(),
            config.window.lookback,
        )
    }

    /// Configured window length
    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Window ending at `now`
    pub fn window(&self, now: DateTime<Utc>) -> Result<TimeWindow> {
        TimeWindow::ending_at(now, self.lookback)
    }

    /// Count requests in `window`. Exactly one query unless configuration is missing.
    pub async fn observe(&self, window: &TimeWindow) -> Result<TrafficObservation> {
        if self.zone_tag.trim().is_empty() {
            return Err(Error::config("zone identifier is not set"));
        }
        if self.target_host.trim().is_empty() {
            return Err(Error::config("target host is not set"));
        }

        let query = TrafficQuery {
            zone_tag: self.zone_tag.clone(),
            target_host: self.target_host.clone(),
            window: *window,
        };

        let observation = self.source.count_requests(&query).await?;

        debug!(
            zone = %self.zone_tag,
            host = %self.target_host,
            window = %window,
            count = observation.request_count,
            "Evaluated window"
        );

        Ok(observation)
    }

    /// Compute the window ending at `now` and observe it
    pub async fn evaluate(&self, now: DateTime<Utc>) -> Result<(TimeWindow, TrafficObservation)> {
        let window = self.window(now)?;
        info!(window = %window, "Checking traffic");
        let observation = self.observe(&window).await?;
        Ok((window, observation))
    }
}
