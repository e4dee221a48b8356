//! Status providers
//!
//! The REST backend is an external collaborator; this module defines the
//! async boundary the fetch adapters talk to, plus the built-in
//! implementations: a simulated provider for demos/tests and an HTTP
//! provider speaking the backend's response envelope.

pub mod http;
pub mod sim;

pub use http::{ApiEnvelope, HttpProvider};
pub use sim::{SimMode, SimProvider, SimProviderConfig};

use async_trait::async_trait;
use rt_board_types::{Aggregate, DataPoint, EntityId, EntityStatus, TimeRange};
use thiserror::Error;

/// Why a fetch produced no data.
///
/// Adapters translate every variant into the NoData state; these errors
/// never reach the rendering layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("backend rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),
}

/// Async source of entity status and aggregated history
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Latest status for one entity
    async fn entity_status(&self, id: &EntityId) -> Result<EntityStatus, ProviderError>;

    /// Aggregated history series for one entity over a time range
    async fn aggregate_history(
        &self,
        id: &EntityId,
        range: &TimeRange,
        aggregate: Aggregate,
    ) -> Result<Vec<DataPoint>, ProviderError>;
}
