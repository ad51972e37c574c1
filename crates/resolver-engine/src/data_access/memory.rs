use super::{DalResult, DataAccessError, DataAccessLayer};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use resolver_core::{EntityIndex, EntityIndexEntry, RelatedEventsPage, ResolverEvent, ResolverTree};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Entities,
    ResolverTree,
    RelatedEvents,
}

/// Holds matching calls until opened. Calls cancelled while held still
/// resolve to `Cancelled`.
#[derive(Debug, Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    pub fn open(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Default)]
struct Inner {
    index_patterns: Vec<String>,
    documents: HashMap<String, Vec<String>>,
    trees: HashMap<String, ResolverTree>,
    related: HashMap<String, Vec<ResolverEvent>>,
    page_size: usize,
    failures: HashMap<(CallKind, String), DataAccessError>,
    gates: HashMap<(CallKind, String), watch::Receiver<bool>>,
    calls: Vec<(CallKind, String)>,
}

impl Inner {
    fn begin(&mut self, kind: CallKind, key: &str) -> Option<watch::Receiver<bool>> {
        self.calls.push((kind, key.to_string()));
        self.gates.get(&(kind, key.to_string())).cloned()
    }

    fn failure(&self, kind: CallKind, key: &str) -> Option<DataAccessError> {
        self.failures.get(&(kind, key.to_string())).cloned()
    }
}

/// Fixture-backed data access layer for tests and demos.
#[derive(Clone)]
pub struct MemoryDataAccessLayer {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryDataAccessLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataAccessLayer {
    pub fn new() -> Self {
        let inner = Inner {
            index_patterns: vec!["logs-endpoint.*".to_string()],
            page_size: 100,
            ..Inner::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn with_index_patterns(self, patterns: Vec<String>) -> Self {
        self.inner.lock().index_patterns = patterns;
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.inner.lock().page_size = page_size.max(1);
        self
    }

    pub fn with_document(self, document_id: &str, entity_id: &str) -> Self {
        self.inner
            .lock()
            .documents
            .entry(document_id.to_string())
            .or_default()
            .push(entity_id.to_string());
        self
    }

    pub fn with_tree(self, tree: ResolverTree) -> Self {
        self.inner.lock().trees.insert(tree.entity_id.clone(), tree);
        self
    }

    pub fn with_related_events(self, entity_id: &str, events: Vec<ResolverEvent>) -> Self {
        self.inner
            .lock()
            .related
            .insert(entity_id.to_string(), events);
        self
    }

    pub fn fail(&self, kind: CallKind, key: &str, error: DataAccessError) {
        self.inner
            .lock()
            .failures
            .insert((kind, key.to_string()), error);
    }

    pub fn hold(&self, kind: CallKind, key: &str) -> Gate {
        let (tx, rx) = watch::channel(false);
        self.inner.lock().gates.insert((kind, key.to_string()), rx);
        Gate { tx: Arc::new(tx) }
    }

    /// Keys of every call of `kind` so far, in call order.
    pub fn calls(&self, kind: CallKind) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

async fn pass_gate(
    gate: Option<watch::Receiver<bool>>,
    cancel: &CancellationToken,
) -> DalResult<()> {
    if cancel.is_cancelled() {
        return Err(DataAccessError::Cancelled);
    }
    let Some(mut rx) = gate else {
        return Ok(());
    };
    tokio::select! {
        _ = cancel.cancelled() => Err(DataAccessError::Cancelled),
        _ = async {
            loop {
                let open = *rx.borrow();
                if open || rx.changed().await.is_err() {
                    break;
                }
            }
        } => Ok(()),
    }
}

fn page(events: &[ResolverEvent], entity_id: &str, after: Option<&str>, size: usize) -> DalResult<RelatedEventsPage> {
    let start = match after {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| DataAccessError::Decode(format!("bad page token {token:?}")))?,
        None => 0,
    };
    let start = start.min(events.len());
    let end = start.saturating_add(size).min(events.len());
    Ok(RelatedEventsPage {
        entity_id: entity_id.to_string(),
        events: events[start..end].to_vec(),
        next_event: (end < events.len()).then(|| end.to_string()),
    })
}

impl DataAccessLayer for MemoryDataAccessLayer {
    fn index_patterns(&self) -> Vec<String> {
        self.inner.lock().index_patterns.clone()
    }

    fn entities(
        &self,
        document_id: String,
        _indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<EntityIndex>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let gate = inner.lock().begin(CallKind::Entities, &document_id);
            pass_gate(gate, &cancel).await?;
            let inner = inner.lock();
            if let Some(err) = inner.failure(CallKind::Entities, &document_id) {
                return Err(err);
            }
            Ok(inner
                .documents
                .get(&document_id)
                .into_iter()
                .flatten()
                .map(|entity_id| EntityIndexEntry {
                    entity_id: entity_id.clone(),
                })
                .collect())
        })
    }

    fn resolver_tree(
        &self,
        entity_id: String,
        _indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<ResolverTree>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let gate = inner.lock().begin(CallKind::ResolverTree, &entity_id);
            pass_gate(gate, &cancel).await?;
            let inner = inner.lock();
            if let Some(err) = inner.failure(CallKind::ResolverTree, &entity_id) {
                return Err(err);
            }
            inner
                .trees
                .get(&entity_id)
                .cloned()
                .ok_or(DataAccessError::NotFound(entity_id))
        })
    }

    fn related_events(
        &self,
        entity_id: String,
        after: Option<String>,
        _indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<RelatedEventsPage>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let gate = inner.lock().begin(CallKind::RelatedEvents, &entity_id);
            pass_gate(gate, &cancel).await?;
            let inner = inner.lock();
            if let Some(err) = inner.failure(CallKind::RelatedEvents, &entity_id) {
                return Err(err);
            }
            let events = inner
                .related
                .get(&entity_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            page(events, &entity_id, after.as_deref(), inner.page_size)
        })
    }
}
