//! # Trafficwatch
//!
//! Zero-traffic alerting for web zones.
//!
//! Every run looks back over a fixed window (15 minutes by default), asks the
//! zone analytics API how many requests the monitored host received, and sends
//! a single alert email when the answer is zero.
//!
//! ## Architecture
//!
//! - **Metrics**: GraphQL analytics client behind the `TrafficSource` trait
//! - **Alerting**: window evaluation, zero-threshold dispatch, MIME rendering and delivery
//! - **Monitor**: one scheduled invocation, with all errors caught and logged
//!
//! ## Quick Start
//!
//! ```bash
//! # One check, for cron or any external scheduler
//! trafficwatch check --config trafficwatch.toml
//!
//! # Check every 15 minutes until interrupted
//! trafficwatch watch --config trafficwatch.toml
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod monitor;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use monitor::{Monitor, RunOutcome};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertDispatcher, MessageSender, WindowEvaluator};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::metrics::TrafficSource;
    pub use crate::models::*;
    pub use crate::monitor::{Monitor, RunOutcome};
}
