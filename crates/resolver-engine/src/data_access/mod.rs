pub mod memory;

pub use memory::{Gate, MemoryDataAccessLayer};

use futures_util::future::BoxFuture;
use resolver_core::{EntityIndex, RelatedEventsPage, ResolverTree};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataAccessError {
    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl DataAccessError {
    /// Cancellation is expected when a request is superseded and is never
    /// surfaced as a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type DalResult<T> = Result<T, DataAccessError>;

/// Backend the middleware fetches from. Every call takes a token; a
/// cancelled call resolves to `DataAccessError::Cancelled`.
pub trait DataAccessLayer: Send + Sync {
    fn index_patterns(&self) -> Vec<String>;

    /// Candidate origin entities for a source document.
    fn entities(
        &self,
        document_id: String,
        indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<EntityIndex>>;

    fn resolver_tree(
        &self,
        entity_id: String,
        indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<ResolverTree>>;

    /// One page of related events, starting after `after` when given.
    fn related_events(
        &self,
        entity_id: String,
        after: Option<String>,
        indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<RelatedEventsPage>>;
}
