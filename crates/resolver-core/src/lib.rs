pub mod event;
pub mod tree;

pub use event::{DescriptiveName, EventCategory, OneOrMany, ResolverEvent};
pub use tree::{
    EntityIndex, EntityIndexEntry, LifecycleNode, NodeStats, RelatedEventsPage, ResolverTree,
};

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "resolver/1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Msg {
    Hello { version: String },
    RequestEntities { document_id: String, indices: Vec<String> },
    Entities { entities: EntityIndex },
    RequestResolverTree { entity_id: String, indices: Vec<String> },
    ResolverTree { tree: Box<ResolverTree> },
    RequestRelatedEvents {
        entity_id: String,
        after: Option<String>,
        indices: Vec<String>,
        /// Page size wanted by the client; the server's default otherwise.
        #[serde(default)]
        limit: Option<usize>,
    },
    RelatedEvents { page: RelatedEventsPage },
    Error { message: String },
}
