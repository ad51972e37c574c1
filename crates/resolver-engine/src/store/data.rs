use crate::graph::layout::ProcessLayout;
use crate::graph::tree::IndexedProcessTree;
use crate::store::actions::{RequestId, ResolverAction};
use resolver_core::{RelatedEventsPage, ResolverEvent, ResolverTree};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// A successful tree response together with everything derived from it.
#[derive(Debug)]
pub struct ResolvedTree {
    pub response: ResolverTree,
    pub indexed: IndexedProcessTree,
    pub layout: ProcessLayout,
    terminated: HashSet<String>,
}

impl ResolvedTree {
    pub fn new(response: ResolverTree) -> Self {
        let lifecycle = response.lifecycle_events();
        let graphable: Vec<&ResolverEvent> = lifecycle
            .iter()
            .copied()
            .filter(|e| e.is_graphable_process())
            .collect();
        let terminated = lifecycle
            .iter()
            .filter(|e| e.is_terminated_process())
            .map(|e| e.entity_id())
            .collect();
        let indexed = IndexedProcessTree::new(graphable);
        let layout = ProcessLayout::new(&indexed);
        Self {
            response,
            indexed,
            layout,
            terminated,
        }
    }

    pub fn is_terminated(&self, entity_id: &str) -> bool {
        self.terminated.contains(entity_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTreeRequest {
    pub request_id: RequestId,
    pub database_document_id: String,
}

#[derive(Debug, Clone)]
pub enum LastResponse {
    Success {
        database_document_id: String,
        tree: Arc<ResolvedTree>,
    },
    Failure {
        database_document_id: String,
    },
}

impl LastResponse {
    pub fn database_document_id(&self) -> &str {
        match self {
            Self::Success {
                database_document_id,
                ..
            }
            | Self::Failure {
                database_document_id,
            } => database_document_id,
        }
    }

    pub fn successful(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Absent from the status map means unrequested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedFetchStatus {
    Requested { generation: u64 },
    Completed { successful: bool },
}

#[derive(Debug, Clone, Default)]
pub struct DataState {
    pub database_document_id: Option<String>,
    pub pending: Option<PendingTreeRequest>,
    pub last_response: Option<LastResponse>,
    pub related_events: HashMap<String, RelatedEventsPage>,
    pub related_events_status: HashMap<String, RelatedFetchStatus>,
    pub entity_ids_requiring_related_events: BTreeSet<String>,
    /// Entities whose next page was asked for and not yet requested.
    pub entity_ids_requiring_more_related_events: BTreeSet<String>,
}

fn append_page(existing: &mut RelatedEventsPage, page: RelatedEventsPage) {
    let known: HashSet<String> = existing
        .events
        .iter()
        .filter_map(ResolverEvent::event_id)
        .collect();
    existing.events.extend(
        page.events
            .into_iter()
            .filter(|e| e.event_id().map_or(true, |id| !known.contains(&id))),
    );
    existing.next_event = page.next_event;
}

pub fn data_reducer(state: &mut DataState, action: &ResolverAction) {
    match action {
        ResolverAction::AppReceivedNewExternalProperties {
            database_document_id,
            ..
        } => {
            state.database_document_id = database_document_id.clone();
        }
        ResolverAction::AppRequestedResolverData {
            request_id,
            database_document_id,
        } => {
            state.pending = Some(PendingTreeRequest {
                request_id: *request_id,
                database_document_id: database_document_id.clone(),
            });
        }
        ResolverAction::AppAbortedResolverDataRequest { request_id } => {
            if state.pending.as_ref().map(|p| p.request_id) == Some(*request_id) {
                state.pending = None;
            }
        }
        ResolverAction::ServerReturnedResolverData {
            request_id,
            database_document_id,
            result,
        } => {
            if state.accepts_tree_response(*request_id, database_document_id) {
                state.pending = None;
                state.last_response = Some(LastResponse::Success {
                    database_document_id: database_document_id.clone(),
                    tree: Arc::new(ResolvedTree::new(result.as_ref().clone())),
                });
            }
        }
        ResolverAction::ServerFailedToReturnResolverData {
            request_id,
            database_document_id,
        } => {
            if state.accepts_tree_response(*request_id, database_document_id) {
                state.pending = None;
                state.last_response = Some(LastResponse::Failure {
                    database_document_id: database_document_id.clone(),
                });
            }
        }
        ResolverAction::UserRequestedRelatedEventData(entity_id)
        | ResolverAction::UserSelectedRelatedEventCategory { entity_id, .. } => {
            state
                .entity_ids_requiring_related_events
                .insert(entity_id.clone());
        }
        ResolverAction::UserRequestedAdditionalRelatedEvents(entity_id) => {
            let completed = matches!(
                state.related_events_status.get(entity_id),
                Some(RelatedFetchStatus::Completed { .. })
            );
            if completed && state.has_more_related_events(entity_id) {
                state
                    .entity_ids_requiring_more_related_events
                    .insert(entity_id.clone());
            }
        }
        ResolverAction::AppRequestedRelatedEventData {
            entity_id,
            generation,
        } => {
            state.related_events_status.insert(
                entity_id.clone(),
                RelatedFetchStatus::Requested {
                    generation: *generation,
                },
            );
            state.entity_ids_requiring_more_related_events.remove(entity_id);
        }
        ResolverAction::ServerReturnedRelatedEventData {
            entity_id,
            generation,
            response,
        } => {
            if state.accepts_related_response(entity_id, *generation) {
                match state.related_events.get_mut(entity_id) {
                    Some(existing) => append_page(existing, response.clone()),
                    None => {
                        state
                            .related_events
                            .insert(entity_id.clone(), response.clone());
                    }
                }
                state
                    .related_events_status
                    .insert(entity_id.clone(), RelatedFetchStatus::Completed { successful: true });
            }
        }
        ResolverAction::ServerFailedToReturnRelatedEventData {
            entity_id,
            generation,
        } => {
            if state.accepts_related_response(entity_id, *generation) {
                state.related_events_status.insert(
                    entity_id.clone(),
                    RelatedFetchStatus::Completed { successful: false },
                );
            }
        }
        ResolverAction::AppAbortedRelatedEventDataRequest {
            entity_id,
            generation,
        } => {
            if state.accepts_related_response(entity_id, *generation) {
                if state.related_events.contains_key(entity_id) {
                    // an aborted next-page request leaves the loaded pages intact
                    state.related_events_status.insert(
                        entity_id.clone(),
                        RelatedFetchStatus::Completed { successful: true },
                    );
                } else {
                    state.related_events_status.remove(entity_id);
                    state.entity_ids_requiring_related_events.remove(entity_id);
                }
            }
        }
        ResolverAction::Camera(_)
        | ResolverAction::UserBroughtProcessIntoView { .. }
        | ResolverAction::UserFocusedOnResolverNode(_)
        | ResolverAction::UserSelectedResolverNode(_)
        | ResolverAction::AppDetectedNewIdFromQueryParams { .. } => {}
    }
}

// ----- selectors -----

impl DataState {
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.last_response
            .as_ref()
            .is_some_and(|r| !r.successful())
    }

    pub fn resolved_tree(&self) -> Option<&Arc<ResolvedTree>> {
        match self.last_response.as_ref()? {
            LastResponse::Success { tree, .. } => Some(tree),
            LastResponse::Failure { .. } => None,
        }
    }

    /// The document whose tree should be requested next, if any.
    pub fn database_document_id_to_fetch(&self) -> Option<&str> {
        let wanted = self.database_document_id.as_deref()?;
        if self.pending.is_some() {
            return None;
        }
        let already = self
            .last_response
            .as_ref()
            .is_some_and(|r| r.database_document_id() == wanted);
        (!already).then_some(wanted)
    }

    /// The in-flight request that no longer matches the wanted document.
    pub fn tree_request_to_abort(&self) -> Option<RequestId> {
        let pending = self.pending.as_ref()?;
        (self.database_document_id.as_deref() != Some(pending.database_document_id.as_str()))
            .then_some(pending.request_id)
    }

    pub fn accepts_tree_response(&self, request_id: RequestId, database_document_id: &str) -> bool {
        self.pending.as_ref().is_some_and(|p| {
            p.request_id == request_id && p.database_document_id == database_document_id
        })
    }

    pub fn accepts_related_response(&self, entity_id: &str, generation: u64) -> bool {
        self.related_events_status.get(entity_id)
            == Some(&RelatedFetchStatus::Requested { generation })
    }

    /// Entities that need related events and have never been requested.
    pub fn entity_ids_to_fetch_related_events_for(&self) -> Vec<String> {
        self.entity_ids_requiring_related_events
            .iter()
            .filter(|id| !self.related_events_status.contains_key(*id))
            .cloned()
            .collect()
    }

    /// `(entity id, page token)` for every queued next-page request.
    pub fn entity_ids_to_fetch_more_related_events_for(&self) -> Vec<(String, String)> {
        self.entity_ids_requiring_more_related_events
            .iter()
            .filter(|id| {
                matches!(
                    self.related_events_status.get(*id),
                    Some(RelatedFetchStatus::Completed { .. })
                )
            })
            .filter_map(|id| {
                let token = self.related_events.get(id)?.next_event.clone()?;
                Some((id.clone(), token))
            })
            .collect()
    }

    pub fn related_status(&self, entity_id: &str) -> Option<RelatedFetchStatus> {
        self.related_events_status.get(entity_id).copied()
    }

    pub fn has_more_related_events(&self, entity_id: &str) -> bool {
        self.related_events
            .get(entity_id)
            .is_some_and(|page| page.next_event.is_some())
    }
}
