//! Effect layer: the only place the store talks to the data access layer.
//!
//! Reducers stay synchronous. After every reduced action the runtime looks
//! at the new state, starts or cancels fetches, and feeds their results back
//! in as further actions.

use crate::data_access::{DalResult, DataAccessError, DataAccessLayer};
use crate::graph::layout::VisibleEntities;
use crate::store::actions::{RequestId, ResolverAction};
use crate::store::{selectors, ResolverState, Store};
use crate::util::clock::{Clock, Timestamp};
use resolver_core::ResolverTree;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Feeds actions into a runtime from elsewhere. They are reduced the next
/// time the runtime settles.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: mpsc::UnboundedSender<ResolverAction>,
}

impl RuntimeHandle {
    /// False once the runtime is gone.
    pub fn dispatch(&self, action: ResolverAction) -> bool {
        self.tx.send(action).is_ok()
    }
}

pub struct ResolverRuntime {
    store: Store,
    dal: Arc<dyn DataAccessLayer>,
    clock: Arc<dyn Clock>,
    tasks: JoinSet<Option<ResolverAction>>,
    tree_request: Option<(RequestId, CancellationToken)>,
    related_requests: HashMap<String, (u64, CancellationToken)>,
    next_request_id: u64,
    next_generation: u64,
    panel_node: Option<String>,
    inbox: mpsc::UnboundedReceiver<ResolverAction>,
    handle: RuntimeHandle,
}

impl ResolverRuntime {
    pub fn new(dal: Arc<dyn DataAccessLayer>, clock: Arc<dyn Clock>) -> Self {
        Self::with_state(ResolverState::default(), dal, clock)
    }

    pub fn with_state(
        state: ResolverState,
        dal: Arc<dyn DataAccessLayer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        Self {
            store: Store::new(state),
            dal,
            clock,
            tasks: JoinSet::new(),
            tree_request: None,
            related_requests: HashMap::new(),
            next_request_id: 0,
            next_generation: 0,
            panel_node: None,
            inbox,
            handle: RuntimeHandle { tx },
        }
    }

    pub fn state(&self) -> &ResolverState {
        self.store.state()
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Visible nodes and edges at the clock's current time.
    pub fn visible_entities(&self) -> Arc<VisibleEntities> {
        selectors::visible_process_node_positions_and_edge_line_segments(
            self.state(),
            self.clock.now(),
        )
    }

    /// Reduces `action` and everything its effects produce, in order,
    /// before returning.
    pub fn dispatch(&mut self, action: ResolverAction) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            tracing::trace!(action = action.name(), "dispatch");
            self.store.dispatch(&action);
            for follow_up in self.run_effects().into_iter().rev() {
                queue.push_front(follow_up);
            }
        }
    }

    /// Processes queued actions and fetch results until nothing is in flight.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(action) = self.inbox.try_recv() {
                self.dispatch(action);
            }
            let Some(joined) = self.tasks.join_next().await else {
                break;
            };
            self.complete(joined);
        }
    }

    /// Waits for the next fetch to finish and applies it. False when idle.
    pub async fn step(&mut self) -> bool {
        match self.tasks.join_next().await {
            Some(joined) => {
                self.complete(joined);
                true
            }
            None => false,
        }
    }

    fn complete(&mut self, joined: Result<Option<ResolverAction>, JoinError>) {
        let action = match joined {
            Ok(Some(action)) => action,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "fetch task did not finish");
                return;
            }
        };

        let data = &self.store.state().data;
        match &action {
            ResolverAction::ServerReturnedResolverData {
                request_id,
                database_document_id,
                ..
            }
            | ResolverAction::ServerFailedToReturnResolverData {
                request_id,
                database_document_id,
            } => {
                if self
                    .tree_request
                    .as_ref()
                    .is_some_and(|(id, _)| id == request_id)
                {
                    self.tree_request = None;
                }
                if !data.accepts_tree_response(*request_id, database_document_id) {
                    tracing::debug!(
                        %request_id,
                        document_id = %database_document_id,
                        "stale resolver tree response dropped"
                    );
                    return;
                }
            }
            ResolverAction::ServerReturnedRelatedEventData {
                entity_id,
                generation,
                ..
            }
            | ResolverAction::ServerFailedToReturnRelatedEventData {
                entity_id,
                generation,
            } => {
                let accepted = data.accepts_related_response(entity_id, *generation);
                if self
                    .related_requests
                    .get(entity_id)
                    .is_some_and(|(g, _)| g == generation)
                {
                    self.related_requests.remove(entity_id);
                }
                if !accepted {
                    tracing::debug!(
                        entity_id = %entity_id,
                        generation,
                        "stale related events response dropped"
                    );
                    return;
                }
            }
            _ => {}
        }
        self.dispatch(action);
    }

    fn run_effects(&mut self) -> Vec<ResolverAction> {
        let mut out = Vec::new();
        self.abort_superseded_tree_request(&mut out);
        self.start_tree_request(&mut out);
        self.abort_related_for_departed_panel_node(&mut out);
        self.start_related_requests(&mut out);
        out
    }

    // ----- resolver tree -----

    fn abort_superseded_tree_request(&mut self, out: &mut Vec<ResolverAction>) {
        let Some(request_id) = self.store.state().data.tree_request_to_abort() else {
            return;
        };
        if let Some((id, token)) = self.tree_request.take() {
            if id == request_id {
                token.cancel();
            } else {
                self.tree_request = Some((id, token));
            }
        }
        tracing::debug!(%request_id, "resolver tree request superseded");
        out.push(ResolverAction::AppAbortedResolverDataRequest { request_id });
    }

    fn start_tree_request(&mut self, out: &mut Vec<ResolverAction>) {
        if self.tree_request.is_some() {
            return;
        }
        let Some(document_id) = self
            .store
            .state()
            .data
            .database_document_id_to_fetch()
            .map(str::to_string)
        else {
            return;
        };

        self.next_request_id += 1;
        let request_id = RequestId(self.next_request_id);
        let token = CancellationToken::new();
        self.tree_request = Some((request_id, token.clone()));
        tracing::info!(%request_id, document_id = %document_id, "resolver tree requested");

        self.tasks.spawn(fetch_tree(
            Arc::clone(&self.dal),
            request_id,
            document_id.clone(),
            token,
        ));
        out.push(ResolverAction::AppRequestedResolverData {
            request_id,
            database_document_id: document_id,
        });
    }

    // ----- related events -----

    fn abort_related_for_departed_panel_node(&mut self, out: &mut Vec<ResolverAction>) {
        let current = self.store.state().ui.panel_node_id();
        if current == self.panel_node {
            return;
        }
        if let Some(previous) = self.panel_node.take() {
            if let Some((generation, token)) = self.related_requests.remove(&previous) {
                token.cancel();
                tracing::debug!(entity_id = %previous, generation, "related events request cancelled");
                out.push(ResolverAction::AppAbortedRelatedEventDataRequest {
                    entity_id: previous,
                    generation,
                });
            }
        }
        self.panel_node = current;
    }

    fn start_related_requests(&mut self, out: &mut Vec<ResolverAction>) {
        let data = &self.store.state().data;
        let wanted: Vec<(String, Option<String>)> = data
            .entity_ids_to_fetch_related_events_for()
            .into_iter()
            .map(|id| (id, None))
            .chain(
                data.entity_ids_to_fetch_more_related_events_for()
                    .into_iter()
                    .map(|(id, after)| (id, Some(after))),
            )
            .collect();

        for (entity_id, after) in wanted {
            // one request per entity at a time
            if self.related_requests.contains_key(&entity_id) {
                continue;
            }
            self.next_generation += 1;
            let generation = self.next_generation;
            let token = CancellationToken::new();
            self.related_requests
                .insert(entity_id.clone(), (generation, token.clone()));
            tracing::debug!(
                entity_id = %entity_id,
                generation,
                after = after.as_deref().unwrap_or(""),
                "related events requested"
            );

            self.tasks.spawn(fetch_related(
                Arc::clone(&self.dal),
                entity_id.clone(),
                generation,
                after,
                token,
            ));
            out.push(ResolverAction::AppRequestedRelatedEventData {
                entity_id,
                generation,
            });
        }
    }
}

// ----- fetch tasks -----

async fn fetch_tree(
    dal: Arc<dyn DataAccessLayer>,
    request_id: RequestId,
    document_id: String,
    token: CancellationToken,
) -> Option<ResolverAction> {
    let work = async {
        let indices = dal.index_patterns();
        let entities = dal
            .entities(document_id.clone(), indices.clone(), token.clone())
            .await?;
        let Some(origin) = entities.into_iter().next() else {
            return Err(DataAccessError::NotFound(format!(
                "no process entity for document {document_id}"
            )));
        };
        dal.resolver_tree(origin.entity_id, indices, token.clone())
            .await
    };
    let result: DalResult<ResolverTree> = tokio::select! {
        _ = token.cancelled() => Err(DataAccessError::Cancelled),
        result = work => result,
    };

    match result {
        Ok(tree) => {
            tracing::info!(%request_id, document_id = %document_id, "resolver tree received");
            Some(ResolverAction::ServerReturnedResolverData {
                request_id,
                database_document_id: document_id,
                result: Box::new(tree),
            })
        }
        Err(e) if e.is_cancellation() && token.is_cancelled() => {
            tracing::debug!(%request_id, "resolver tree request cancelled");
            None
        }
        Err(e) => {
            tracing::warn!(%request_id, document_id = %document_id, error = %e, "resolver tree request failed");
            Some(ResolverAction::ServerFailedToReturnResolverData {
                request_id,
                database_document_id: document_id,
            })
        }
    }
}

async fn fetch_related(
    dal: Arc<dyn DataAccessLayer>,
    entity_id: String,
    generation: u64,
    after: Option<String>,
    token: CancellationToken,
) -> Option<ResolverAction> {
    let call = dal.related_events(
        entity_id.clone(),
        after,
        dal.index_patterns(),
        token.clone(),
    );
    let result = tokio::select! {
        _ = token.cancelled() => Err(DataAccessError::Cancelled),
        result = call => result,
    };

    match result {
        Ok(response) => Some(ResolverAction::ServerReturnedRelatedEventData {
            entity_id,
            generation,
            response,
        }),
        Err(e) if e.is_cancellation() && token.is_cancelled() => None,
        Err(e) => {
            tracing::warn!(entity_id = %entity_id, error = %e, "related events request failed");
            Some(ResolverAction::ServerFailedToReturnRelatedEventData {
                entity_id,
                generation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_access::memory::CallKind;
    use crate::data_access::MemoryDataAccessLayer;
    use crate::graph::tree::tests::process;
    use crate::store::data::RelatedFetchStatus;
    use crate::util::clock::ManualClock;
    use resolver_core::ResolverEvent;
    use serde_json::json;

    fn tree(entity_id: &str) -> ResolverTree {
        ResolverTree {
            entity_id: entity_id.to_string(),
            lifecycle: vec![process(entity_id, None)],
            ..ResolverTree::default()
        }
    }

    fn file_event(entity: &str, id: &str) -> ResolverEvent {
        serde_json::from_value(json!({
            "event": { "id": id, "category": "file" },
            "process": { "entity_id": entity },
        }))
        .expect("event parses")
    }

    fn runtime(dal: &MemoryDataAccessLayer) -> ResolverRuntime {
        ResolverRuntime::new(Arc::new(dal.clone()), Arc::new(ManualClock::new(0.0)))
    }

    fn open(document_id: &str, url_search: &str) -> ResolverAction {
        ResolverAction::AppReceivedNewExternalProperties {
            database_document_id: Some(document_id.into()),
            url_search: url_search.into(),
            time: 0.0,
        }
    }

    #[tokio::test]
    async fn loads_tree_for_document() {
        let dal = MemoryDataAccessLayer::new()
            .with_document("doc", "a")
            .with_tree(tree("a"));
        let mut rt = runtime(&dal);

        rt.dispatch(open("doc", ""));
        assert!(selectors::is_loading(rt.state()));
        rt.settle().await;

        assert!(!selectors::is_loading(rt.state()));
        assert!(!selectors::has_error(rt.state()));
        assert_eq!(
            selectors::resolver_tree(rt.state()).map(|t| t.entity_id.as_str()),
            Some("a")
        );
        assert_eq!(dal.calls(CallKind::ResolverTree), vec!["a"]);

        // same document again: nothing new is fetched
        rt.dispatch(open("doc", ""));
        rt.settle().await;
        assert_eq!(dal.calls(CallKind::ResolverTree), vec!["a"]);
    }

    #[tokio::test]
    async fn superseded_tree_request_is_dropped() {
        let dal = MemoryDataAccessLayer::new()
            .with_document("A", "a")
            .with_document("B", "b")
            .with_tree(tree("a"))
            .with_tree(tree("b"));
        let gate = dal.hold(CallKind::ResolverTree, "a");
        let mut rt = runtime(&dal);

        rt.dispatch(open("A", ""));
        tokio::task::yield_now().await;
        rt.dispatch(open("B", ""));
        gate.open();
        rt.settle().await;

        let data = &rt.state().data;
        let last = data.last_response.as_ref().expect("response stored");
        assert_eq!(last.database_document_id(), "B");
        assert!(last.successful());
        assert!(!data.has_error());
        assert_eq!(
            selectors::resolver_tree(rt.state()).map(|t| t.entity_id.as_str()),
            Some("b")
        );
    }

    #[tokio::test]
    async fn document_without_entities_is_an_error() {
        let dal = MemoryDataAccessLayer::new();
        let mut rt = runtime(&dal);
        rt.dispatch(open("nothing", ""));
        rt.settle().await;
        assert!(selectors::has_error(rt.state()));
        assert!(dal.calls(CallKind::ResolverTree).is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_is_an_error() {
        let dal = MemoryDataAccessLayer::new().with_document("doc", "a");
        dal.fail(
            CallKind::ResolverTree,
            "a",
            DataAccessError::Transport("connection reset".into()),
        );
        let mut rt = runtime(&dal);
        rt.dispatch(open("doc", ""));
        rt.settle().await;
        assert!(selectors::has_error(rt.state()));
    }

    #[tokio::test]
    async fn related_requests_are_deduplicated() {
        let dal = MemoryDataAccessLayer::new().with_related_events("a", vec![file_event("a", "f1")]);
        let mut rt = runtime(&dal);

        rt.dispatch(ResolverAction::UserRequestedRelatedEventData("a".into()));
        rt.dispatch(ResolverAction::UserRequestedRelatedEventData("a".into()));
        assert_eq!(rt.in_flight(), 1);
        rt.settle().await;
        rt.dispatch(ResolverAction::UserRequestedRelatedEventData("a".into()));
        rt.settle().await;

        assert_eq!(dal.calls(CallKind::RelatedEvents), vec!["a"]);
        assert_eq!(
            selectors::related_events_for_node(rt.state(), "a").map(<[_]>::len),
            Some(1)
        );
    }

    #[tokio::test]
    async fn leaving_panel_node_cancels_without_error() {
        let dal = MemoryDataAccessLayer::new()
            .with_related_events("b", vec![file_event("b", "f1")])
            .with_related_events("c", vec![file_event("c", "f2")]);
        let _gate = dal.hold(CallKind::RelatedEvents, "b");
        let mut rt = runtime(&dal);

        rt.dispatch(open("doc", "panelView=node&panelNodeID=b"));
        assert!(matches!(
            rt.state().data.related_status("b"),
            Some(RelatedFetchStatus::Requested { .. })
        ));
        rt.dispatch(open("doc", "panelView=node&panelNodeID=c"));
        rt.settle().await;

        let data = &rt.state().data;
        assert_eq!(data.related_status("b"), None);
        assert!(!data.related_events.contains_key("b"));
        assert_eq!(
            data.related_status("c"),
            Some(RelatedFetchStatus::Completed { successful: true })
        );
    }

    #[tokio::test]
    async fn additional_pages_are_fetched_with_token() {
        let dal = MemoryDataAccessLayer::new()
            .with_page_size(2)
            .with_related_events(
                "a",
                vec![
                    file_event("a", "f1"),
                    file_event("a", "f2"),
                    file_event("a", "f3"),
                ],
            );
        let mut rt = runtime(&dal);

        rt.dispatch(ResolverAction::UserRequestedRelatedEventData("a".into()));
        rt.settle().await;
        assert!(selectors::has_more_related_events(rt.state(), "a"));

        rt.dispatch(ResolverAction::UserRequestedAdditionalRelatedEvents("a".into()));
        rt.settle().await;
        assert!(!selectors::has_more_related_events(rt.state(), "a"));
        assert_eq!(
            selectors::related_events_for_node(rt.state(), "a").map(<[_]>::len),
            Some(3)
        );
        assert_eq!(dal.calls(CallKind::RelatedEvents), vec!["a", "a"]);
    }

    #[tokio::test]
    async fn related_failure_is_recorded() {
        let dal = MemoryDataAccessLayer::new();
        dal.fail(
            CallKind::RelatedEvents,
            "a",
            DataAccessError::Server("boom".into()),
        );
        let mut rt = runtime(&dal);
        rt.dispatch(ResolverAction::UserRequestedRelatedEventData("a".into()));
        rt.settle().await;
        assert_eq!(
            rt.state().data.related_status("a"),
            Some(RelatedFetchStatus::Completed { successful: false })
        );
    }

    #[tokio::test]
    async fn cancellation_the_runtime_did_not_ask_for_is_a_failure() {
        let dal = MemoryDataAccessLayer::new().with_document("doc", "a");
        dal.fail(CallKind::ResolverTree, "a", DataAccessError::Cancelled);
        dal.fail(CallKind::RelatedEvents, "b", DataAccessError::Cancelled);
        let mut rt = runtime(&dal);

        rt.dispatch(open("doc", ""));
        rt.dispatch(ResolverAction::UserRequestedRelatedEventData("b".into()));
        rt.settle().await;

        assert!(!selectors::is_loading(rt.state()));
        assert!(selectors::has_error(rt.state()));
        let last = rt.state().data.last_response.as_ref().expect("response stored");
        assert_eq!(last.database_document_id(), "doc");
        assert!(!last.successful());
        assert_eq!(
            rt.state().data.related_status("b"),
            Some(RelatedFetchStatus::Completed { successful: false })
        );
        assert_eq!(rt.in_flight(), 0);
    }

    #[tokio::test]
    async fn handle_feeds_the_runtime() {
        let dal = MemoryDataAccessLayer::new().with_related_events("a", vec![file_event("a", "f1")]);
        let mut rt = runtime(&dal);
        let handle = rt.handle();
        assert!(handle.dispatch(ResolverAction::UserRequestedRelatedEventData("a".into())));
        rt.settle().await;
        assert_eq!(dal.calls(CallKind::RelatedEvents), vec!["a"]);
    }
}
