//! Alerting for Trafficwatch
//!
//! Window evaluation, the zero-traffic decision, alert rendering and delivery.

mod dispatcher;
mod evaluator;
pub mod message;
mod notifier;

pub use dispatcher::{AlertDispatcher, DispatchOutcome};
pub use evaluator::WindowEvaluator;
pub use message::{AlertContext, Identity};
pub use notifier::{LogSender, MessageSender, RelaySender};
