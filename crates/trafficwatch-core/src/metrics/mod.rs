//! Traffic metrics sources
//!
//! The evaluator only sees the [`TrafficSource`] trait; the GraphQL client is
//! the production implementation.

mod graphql;

pub use graphql::GraphQlTrafficSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{TrafficObservation, TrafficQuery};

/// Something that can count requests for a host over a window
#[async_trait]
pub trait TrafficSource: Send + Sync {
    /// Run one query. Implementations must not retry and must not turn a
    /// failed or malformed query into a zero count.
    async fn count_requests(&self, query: &TrafficQuery) -> Result<TrafficObservation>;
}
