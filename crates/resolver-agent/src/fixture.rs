use anyhow::{Context, Result};
use resolver_core::tree::{AncestryPage, ChildrenPage};
use resolver_core::{
    EntityIndexEntry, EventCategory, LifecycleNode, Msg, NodeStats, RelatedEventsPage,
    ResolverEvent, ResolverTree, PROTOCOL_VERSION,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FixtureFile {
    index_patterns: Vec<String>,
    /// Source document id to origin entity id.
    documents: HashMap<String, String>,
    events: Vec<ResolverEvent>,
}

/// Event store the agent answers from, indexed by entity.
#[derive(Debug, Default)]
pub struct Fixture {
    index_patterns: Vec<String>,
    documents: HashMap<String, String>,
    lifecycles: HashMap<String, Vec<ResolverEvent>>,
    parents: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
    related: HashMap<String, Vec<ResolverEvent>>,
    page_size: usize,
}

fn is_lifecycle(event: &ResolverEvent) -> bool {
    matches!(
        event.event_category(),
        EventCategory::ProcessCreated
            | EventCategory::ProcessRan
            | EventCategory::ProcessTerminated
            | EventCategory::UnknownProcessEvent
    )
}

impl Fixture {
    pub fn load(path: &Path, page_size: usize) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read fixture {}", path.display()))?;
        let file: FixtureFile = serde_json::from_str(&raw)
            .with_context(|| format!("parse fixture {}", path.display()))?;
        Ok(Self::build(file, page_size))
    }

    fn build(file: FixtureFile, page_size: usize) -> Self {
        let mut fixture = Self {
            index_patterns: file.index_patterns,
            documents: file.documents,
            page_size: page_size.max(1),
            ..Self::default()
        };

        for event in file.events {
            let entity_id = event.entity_id();
            if entity_id.is_empty() {
                continue;
            }
            if !is_lifecycle(&event) {
                fixture.related.entry(entity_id).or_default().push(event);
                continue;
            }
            if let Some(parent) = event.parent_entity_id() {
                if !fixture.parents.contains_key(&entity_id) {
                    fixture.parents.insert(entity_id.clone(), parent.clone());
                    fixture
                        .children
                        .entry(parent)
                        .or_default()
                        .push(entity_id.clone());
                }
            }
            fixture.lifecycles.entry(entity_id).or_default().push(event);
        }

        tracing::info!(
            processes = fixture.lifecycles.len(),
            documents = fixture.documents.len(),
            "fixture loaded"
        );
        fixture
    }

    /// Empty `indices` searches everything.
    fn searches(&self, indices: &[String]) -> bool {
        indices.is_empty()
            || self.index_patterns.is_empty()
            || indices.iter().any(|i| self.index_patterns.contains(i))
    }

    fn stats(&self, entity_id: &str) -> NodeStats {
        let mut stats = NodeStats::default();
        for event in self.related.get(entity_id).into_iter().flatten() {
            stats.record(event);
        }
        stats
    }

    fn node(&self, entity_id: &str) -> Option<LifecycleNode> {
        Some(LifecycleNode {
            entity_id: entity_id.to_string(),
            lifecycle: self.lifecycles.get(entity_id)?.clone(),
            stats: Some(self.stats(entity_id)),
        })
    }

    /// Nearest first. Stops at the first parent with no lifecycle or on a cycle.
    fn ancestors(&self, origin: &str) -> Vec<LifecycleNode> {
        let mut seen = HashSet::from([origin.to_string()]);
        let mut out = Vec::new();
        let mut current = origin;
        while let Some(parent) = self.parents.get(current) {
            if !seen.insert(parent.clone()) {
                break;
            }
            let Some(node) = self.node(parent) else {
                break;
            };
            out.push(node);
            current = parent;
        }
        out
    }

    fn descendants(&self, origin: &str) -> Vec<LifecycleNode> {
        let mut seen = HashSet::from([origin.to_string()]);
        let mut queue = VecDeque::from([origin.to_string()]);
        let mut out = Vec::new();
        while let Some(id) = queue.pop_front() {
            for child in self.children.get(&id).into_iter().flatten() {
                if !seen.insert(child.clone()) {
                    continue;
                }
                if let Some(node) = self.node(child) {
                    out.push(node);
                }
                queue.push_back(child.clone());
            }
        }
        out
    }

    pub fn tree(&self, entity_id: &str) -> Option<ResolverTree> {
        let lifecycle = self.lifecycles.get(entity_id)?.clone();
        Some(ResolverTree {
            entity_id: entity_id.to_string(),
            lifecycle,
            children: ChildrenPage {
                child_nodes: self.descendants(entity_id),
                next_child: None,
            },
            ancestry: AncestryPage {
                ancestors: self.ancestors(entity_id),
                next_ancestor: None,
            },
            related_events: self.related_page(entity_id, None, None).ok()?,
            stats: Some(self.stats(entity_id)),
        })
    }

    /// Offset-token paging over an entity's non-process events.
    pub fn related_page(
        &self,
        entity_id: &str,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<RelatedEventsPage> {
        let events = self
            .related
            .get(entity_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = match after {
            Some(token) => token
                .parse::<usize>()
                .with_context(|| format!("bad page token {token:?}"))?,
            None => 0,
        };
        let size = limit.unwrap_or(self.page_size).max(1);
        let start = start.min(events.len());
        let end = start.saturating_add(size).min(events.len());
        Ok(RelatedEventsPage {
            entity_id: entity_id.to_string(),
            events: events[start..end].to_vec(),
            next_event: (end < events.len()).then(|| end.to_string()),
        })
    }

    /// Answer for one request frame.
    pub fn respond(&self, request: Msg) -> Msg {
        match request {
            Msg::Hello { .. } => Msg::Hello {
                version: PROTOCOL_VERSION.into(),
            },
            Msg::RequestEntities {
                document_id,
                indices,
            } => {
                let entities = self
                    .documents
                    .get(&document_id)
                    .filter(|_| self.searches(&indices))
                    .map(|entity_id| EntityIndexEntry {
                        entity_id: entity_id.clone(),
                    })
                    .into_iter()
                    .collect();
                Msg::Entities { entities }
            }
            Msg::RequestResolverTree { entity_id, indices } => {
                match self.tree(&entity_id).filter(|_| self.searches(&indices)) {
                    Some(tree) => Msg::ResolverTree {
                        tree: Box::new(tree),
                    },
                    None => Msg::Error {
                        message: format!("no process with entity id {entity_id}"),
                    },
                }
            }
            Msg::RequestRelatedEvents {
                entity_id,
                after,
                indices,
                limit,
            } => {
                if !self.searches(&indices) {
                    return Msg::RelatedEvents {
                        page: RelatedEventsPage {
                            entity_id,
                            ..RelatedEventsPage::default()
                        },
                    };
                }
                match self.related_page(&entity_id, after.as_deref(), limit) {
                    Ok(page) => Msg::RelatedEvents { page },
                    Err(e) => Msg::Error {
                        message: format!("{e:#}"),
                    },
                }
            }
            other => Msg::Error {
                message: format!("not a request: {other:?}"),
            },
        }
    }
}
