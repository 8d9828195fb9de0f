//! One scheduled traffic check, end to end
//!
//! [`Monitor::run_once`] is the whole invocation: compute the window, query
//! the count, dispatch. Every error is caught and logged here; nothing is
//! returned to the scheduler beyond the [`RunOutcome`].

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::alerting::{
    AlertDispatcher, DispatchOutcome, LogSender, MessageSender, RelaySender, WindowEvaluator,
};
use crate::config::Config;
use crate::error::Result;
use crate::metrics::GraphQlTrafficSource;

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Traffic was seen
    Quiet {
        /// Requests counted in the window
        request_count: u64,
    },
    /// Zero traffic, alert sent
    Alerted,
    /// Zero traffic, but the alert could not be sent
    AlertFailed,
    /// The window could not be checked
    Aborted {
        /// Error kind, see [`crate::Error::kind`]
        kind: &'static str,
        /// Error message
        reason: String,
        /// Result of the degraded alert, when enabled
        degraded_alert: Option<DispatchOutcome>,
    },
}

/// Wires an evaluator to a dispatcher
pub struct Monitor {
    evaluator: WindowEvaluator,
    dispatcher: AlertDispatcher,
    alert_on_query_failure: bool,
}

impl Monitor {
    /// Create a monitor that stays silent when the query fails
    pub fn new(evaluator: WindowEvaluator, dispatcher: AlertDispatcher) -> Self {
        Self {
            evaluator,
            dispatcher,
            alert_on_query_failure: false,
        }
    }

    /// Send a "monitoring degraded" alert for transport and response failures
    #[must_use]
    pub fn alert_on_query_failure(mut self, enabled: bool) -> Self {
        self.alert_on_query_failure = enabled;
        self
    }

    /// Build the production monitor. `dry_run` logs alerts instead of sending them.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        let source = GraphQlTrafficSource::new(&config.metrics)?;
        let sender: Box<dyn MessageSender> = if dry_run {
            Box::new(LogSender)
        } else {
            Box::new(RelaySender::new(&config.notification)?)
        };

        let evaluator = WindowEvaluator::from_config(Box::new(source), config);
        let dispatcher = AlertDispatcher::from_config(sender, config);

        Ok(Self::new(evaluator, dispatcher)
            .alert_on_query_failure(config.notification.alert_on_query_failure))
    }

    /// Run one check for the window ending at `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> RunOutcome {
        let window = match self.evaluator.window(now) {
            Ok(window) => window,
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Error processing the scheduled check");
                return RunOutcome::Aborted {
                    kind: e.kind(),
                    reason: e.to_string(),
                    degraded_alert: None,
                };
            }
        };

        match self.evaluator.observe(&window).await {
            Ok(observation) => match self.dispatcher.dispatch(observation, &window).await {
                DispatchOutcome::Quiet => RunOutcome::Quiet {
                    request_count: observation.request_count,
                },
                DispatchOutcome::Sent => RunOutcome::Alerted,
                DispatchOutcome::SendFailed => RunOutcome::AlertFailed,
            },
            Err(e) => {
                error!(
                    kind = e.kind(),
                    error = %e,
                    window = %window,
                    "Error processing the scheduled check"
                );
                let degraded_alert = if self.alert_on_query_failure && e.is_transport() {
                    Some(self.dispatcher.dispatch_degraded(&window, &e).await)
                } else {
                    None
                };
                RunOutcome::Aborted {
                    kind: e.kind(),
                    reason: e.to_string(),
                    degraded_alert,
                }
            }
        }
    }

    /// Run one check for the window ending now
    pub async fn check_now(&self) -> RunOutcome {
        self.run_once(current_instant()).await
    }

    /// Check every `every` (non-zero) until `shutdown` resolves, starting immediately.
    ///
    /// A started check always finishes before shutdown is observed. Returns
    /// the number of checks run.
    pub async fn watch<F>(&self, every: Duration, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        info!(
            interval = %humantime::format_duration(every),
            lookback = %humantime::format_duration(self.evaluator.lookback()),
            "Starting traffic watch"
        );

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut runs = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(runs, "Stopping traffic watch");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.check_now().await;
                    runs += 1;
                    info!(run = runs, outcome = ?outcome, "Check finished");
                }
            }
        }

        runs
    }
}

/// Current instant at the millisecond precision used on the wire
pub fn current_instant() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
