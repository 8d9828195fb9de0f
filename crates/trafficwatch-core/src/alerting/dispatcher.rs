//! Zero-threshold decision and alert delivery

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::models::{AlertMessage, TimeWindow, TrafficObservation};

use super::message::{self, AlertContext, Identity};
use super::notifier::MessageSender;

/// What the dispatcher did with an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Traffic was seen, nothing sent
    Quiet,
    /// One alert was handed to the sender
    Sent,
    /// Sending failed; the failure was logged
    SendFailed,
}

/// Sends one alert when a window saw no traffic
pub struct AlertDispatcher {
    sender: Box<dyn MessageSender>,
    identity: Identity,
    context: AlertContext,
}

impl AlertDispatcher {
    /// Create a new dispatcher
    pub fn new(sender: Box<dyn MessageSender>, identity: Identity, context: AlertContext) -> Self {
        Self {
            sender,
            identity,
            context,
        }
    }

    /// Create a dispatcher with identities and zone context from `config`
    pub fn from_config(sender: Box<dyn MessageSender>, config: &Config) -> Self {
        Self::new(
            sender,
            Identity::from_config(config),
            AlertContext::from_config(config),
        )
    }

    /// Alert if, and only if, the observation is zero
    pub async fn dispatch(
        &self,
        observation: TrafficObservation,
        window: &TimeWindow,
    ) -> DispatchOutcome {
        if !observation.is_silent() {
            info!(
                host = %self.context.target_host,
                count = observation.request_count,
                window = %window,
                "Traffic detected"
            );
            return DispatchOutcome::Quiet;
        }

        warn!(
            host = %self.context.target_host,
            window = %window,
            "No traffic detected, sending alert"
        );

        let message = message::no_traffic(&self.identity, &self.context, window, Utc::now());
        self.deliver(&message).await
    }

    /// Alert that the window could not be checked
    pub async fn dispatch_degraded(&self, window: &TimeWindow, cause: &Error) -> DispatchOutcome {
        warn!(
            host = %self.context.target_host,
            window = %window,
            error = %cause,
            "Traffic check failed, sending degraded alert"
        );

        let message = message::monitoring_degraded(
            &self.identity,
            &self.context,
            window,
            &cause.to_string(),
            Utc::now(),
        );
        self.deliver(&message).await
    }

    async fn deliver(&self, message: &AlertMessage) -> DispatchOutcome {
        match self.sender.send(message).await {
            Ok(()) => {
                info!(
                    message_id = %message.id,
                    kind = message.kind.as_str(),
                    recipient = %message.recipient,
                    "Alert sent"
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                error!(
                    message_id = %message.id,
                    kind = message.kind.as_str(),
                    error = %e,
                    "Error sending alert"
                );
                DispatchOutcome::SendFailed
            }
        }
    }
}
