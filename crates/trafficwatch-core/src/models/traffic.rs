//! Traffic query and observation models

use serde::{Deserialize, Serialize};

use super::window::TimeWindow;

/// Everything a metrics source needs to count requests for one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficQuery {
    /// Zone identifier
    pub zone_tag: String,
    /// Host name filter
    pub target_host: String,
    /// Window to count over
    pub window: TimeWindow,
}

/// Request count observed for a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrafficObservation {
    /// Number of matching HTTP requests
    pub request_count: u64,
}

impl TrafficObservation {
    /// Create an observation
    pub fn new(request_count: u64) -> Self {
        Self { request_count }
    }

    /// True when the window saw no requests at all
    pub fn is_silent(&self) -> bool {
        self.request_count == 0
    }
}
