//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of alert being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The window saw zero requests
    NoTraffic,
    /// The metrics source could not be checked
    MonitoringDegraded,
}

impl AlertKind {
    /// Marker used in the subject line and page title
    pub fn title(&self) -> &'static str {
        match self {
            Self::NoTraffic => "No Traffic Alert",
            Self::MonitoringDegraded => "Traffic Monitoring Degraded",
        }
    }

    /// Stable name for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoTraffic => "no_traffic",
            Self::MonitoringDegraded => "monitoring_degraded",
        }
    }
}

/// A fully rendered alert, ready to hand to a sender
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage {
    /// Unique identifier, also used for the `Message-ID` header
    pub id: Uuid,

    /// What triggered the alert
    pub kind: AlertKind,

    /// Envelope sender address
    pub sender: String,

    /// Display name for the `From:` header
    pub sender_name: String,

    /// Envelope recipient address
    pub recipient: String,

    /// Subject line
    pub subject: String,

    /// HTML body
    pub html_body: String,

    /// When the message was rendered
    pub created_at: DateTime<Utc>,
}
