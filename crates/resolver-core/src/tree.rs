use crate::event::ResolverEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event counts for one process node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeStats {
    pub total_alerts: u64,
    pub events: EventStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventStats {
    pub total: u64,
    /// Keyed by primary category (`file`, `network`, ...).
    pub by_category: BTreeMap<String, u64>,
}

/// All lifecycle records of a single process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleNode {
    #[serde(rename = "entityID")]
    pub entity_id: String,
    pub lifecycle: Vec<ResolverEvent>,
    pub stats: Option<NodeStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildrenPage {
    pub child_nodes: Vec<LifecycleNode>,
    pub next_child: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AncestryPage {
    /// Nearest ancestor first.
    pub ancestors: Vec<LifecycleNode>,
    pub next_ancestor: Option<String>,
}

/// One page of non-process events for an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedEventsPage {
    #[serde(rename = "entityID")]
    pub entity_id: String,
    pub events: Vec<ResolverEvent>,
    #[serde(rename = "nextEvent")]
    pub next_event: Option<String>,
}

/// Full ancestry/descendancy answer for one origin process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverTree {
    #[serde(rename = "entityID")]
    pub entity_id: String,
    pub lifecycle: Vec<ResolverEvent>,
    pub children: ChildrenPage,
    pub ancestry: AncestryPage,
    #[serde(rename = "relatedEvents")]
    pub related_events: RelatedEventsPage,
    pub stats: Option<NodeStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIndexEntry {
    pub entity_id: String,
}

pub type EntityIndex = Vec<EntityIndexEntry>;

impl ResolverTree {
    /// Ancestors (furthest first), then the origin, then descendants.
    pub fn lifecycle_events(&self) -> Vec<&ResolverEvent> {
        let ancestors = self
            .ancestry
            .ancestors
            .iter()
            .rev()
            .flat_map(|node| node.lifecycle.iter());
        let children = self
            .children
            .child_nodes
            .iter()
            .flat_map(|node| node.lifecycle.iter());
        ancestors
            .chain(self.lifecycle.iter())
            .chain(children)
            .collect()
    }

    pub fn stats_for(&self, entity_id: &str) -> Option<&NodeStats> {
        if self.entity_id == entity_id {
            return self.stats.as_ref();
        }
        self.ancestry
            .ancestors
            .iter()
            .chain(self.children.child_nodes.iter())
            .find(|node| node.entity_id == entity_id)
            .and_then(|node| node.stats.as_ref())
    }
}

impl NodeStats {
    /// Tallies one non-process event into the counters.
    pub fn record(&mut self, event: &ResolverEvent) {
        use crate::event::EventCategory;
        if event.event_category() == EventCategory::ProcessCausedAlert {
            self.total_alerts += 1;
            return;
        }
        self.events.total += 1;
        if let Some(category) = event.primary_category() {
            *self.events.by_category.entry(category).or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn process(id: &str, parent: Option<&str>) -> ResolverEvent {
        serde_json::from_value(json!({
            "event": { "category": "process", "type": "start" },
            "process": { "entity_id": id, "parent": { "entity_id": parent } },
        }))
        .expect("event parses")
    }

    fn node(id: &str, parent: Option<&str>) -> LifecycleNode {
        LifecycleNode {
            entity_id: id.to_string(),
            lifecycle: vec![process(id, parent)],
            stats: None,
        }
    }

    #[test]
    fn lifecycle_events_order_ancestors_origin_children() {
        let tree = ResolverTree {
            entity_id: "origin".into(),
            lifecycle: vec![process("origin", Some("parent"))],
            children: ChildrenPage {
                child_nodes: vec![node("child", Some("origin"))],
                next_child: None,
            },
            ancestry: AncestryPage {
                ancestors: vec![node("parent", Some("grand")), node("grand", None)],
                next_ancestor: None,
            },
            ..Default::default()
        };
        let ids: Vec<String> = tree
            .lifecycle_events()
            .into_iter()
            .map(|e| e.entity_id())
            .collect();
        assert_eq!(ids, vec!["grand", "parent", "origin", "child"]);
    }

    #[test]
    fn mistyped_event_fields_do_not_reject_the_tree() {
        let tree: ResolverTree = serde_json::from_value(json!({
            "entityID": "origin",
            "lifecycle": [{
                "event": { "category": "process", "type": "start" },
                "process": { "entity_id": "origin", "pid": "4242" },
            }],
            "children": { "childNodes": [{
                "entityID": "child",
                "lifecycle": [{
                    "@timestamp": "yesterday",
                    "event": { "category": "process", "type": "start", "sequence": -1 },
                    "process": {
                        "entity_id": "child",
                        "pid": { "value": 1 },
                        "parent": { "entity_id": "origin", "pid": true },
                        "hash": "not-an-object",
                    },
                }],
            }] },
        }))
        .expect("tree parses");

        let events = tree.lifecycle_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].pid(), Some(4242));
        let child = events[1];
        assert_eq!(child.entity_id(), "child");
        assert_eq!(child.parent_entity_id().as_deref(), Some("origin"));
        assert!(child.is_graphable_process());
        assert_eq!(child.pid(), None);
        assert_eq!(child.ppid(), None);
        assert_eq!(child.timestamp(), None);
        assert_eq!(child.md5(), None);
    }

    #[test]
    fn wire_field_names() {
        let tree = ResolverTree {
            entity_id: "a".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(value["entityID"], "a");
        assert!(value["children"]["childNodes"].is_array());
        assert!(value["ancestry"]["nextAncestor"].is_null());
        assert!(value["relatedEvents"]["events"].is_array());
    }

    #[test]
    fn stats_record_splits_alerts_from_events() {
        let file: ResolverEvent = serde_json::from_value(json!({
            "event": { "category": "file", "kind": "event" },
            "process": { "entity_id": "a" },
        }))
        .expect("event parses");
        let alert: ResolverEvent = serde_json::from_value(json!({
            "event": { "category": "malware", "kind": "alert" },
            "process": { "entity_id": "a" },
        }))
        .expect("event parses");

        let mut stats = NodeStats::default();
        stats.record(&file);
        stats.record(&file);
        stats.record(&alert);
        assert_eq!(stats.total_alerts, 1);
        assert_eq!(stats.events.total, 2);
        assert_eq!(stats.events.by_category.get("file"), Some(&2));
    }
}
