//! Read-only views over `ResolverState` for the rendering layer.

use crate::camera::DAffine2;
use crate::graph::layout::{ProcessLayout, VisibleEntities};
use crate::graph::tree::IndexedProcessTree;
use crate::store::data::{RelatedFetchStatus, ResolvedTree};
use crate::store::panel::PanelQueryStringState;
use crate::store::ResolverState;
use crate::util::clock::Timestamp;
use resolver_core::{NodeStats, ResolverEvent, ResolverTree};
use std::collections::BTreeMap;
use std::sync::Arc;

// ----- data -----

pub fn is_loading(state: &ResolverState) -> bool {
    state.data.is_loading()
}

pub fn has_error(state: &ResolverState) -> bool {
    state.data.has_error()
}

fn resolved(state: &ResolverState) -> Option<&ResolvedTree> {
    state.data.resolved_tree().map(Arc::as_ref)
}

pub fn resolver_tree(state: &ResolverState) -> Option<&ResolverTree> {
    resolved(state).map(|t| &t.response)
}

pub fn indexed_tree(state: &ResolverState) -> Option<&IndexedProcessTree> {
    resolved(state).map(|t| &t.indexed)
}

pub fn layout(state: &ResolverState) -> Option<&ProcessLayout> {
    resolved(state).map(|t| &t.layout)
}

/// Process events that make it into the graph, in response order.
pub fn graphable_processes(state: &ResolverState) -> Vec<&ResolverEvent> {
    resolver_tree(state)
        .map(|tree| {
            tree.lifecycle_events()
                .into_iter()
                .filter(|e| e.is_graphable_process())
                .collect()
        })
        .unwrap_or_default()
}

pub fn process_for_entity_id<'a>(
    state: &'a ResolverState,
    entity_id: &str,
) -> Option<&'a ResolverEvent> {
    indexed_tree(state)?.event(entity_id)
}

pub fn node_level(state: &ResolverState, entity_id: &str) -> Option<usize> {
    indexed_tree(state)?.node_level(entity_id)
}

pub fn next_sibling<'a>(state: &'a ResolverState, entity_id: &str) -> Option<&'a ResolverEvent> {
    indexed_tree(state)?.next_sibling(entity_id)
}

pub fn is_process_terminated(state: &ResolverState, entity_id: &str) -> bool {
    resolved(state).is_some_and(|t| t.is_terminated(entity_id))
}

pub fn node_stats<'a>(state: &'a ResolverState, entity_id: &str) -> Option<&'a NodeStats> {
    resolver_tree(state)?.stats_for(entity_id)
}

/// Server-side count of non-alert events, independent of how many pages are loaded.
pub fn related_event_total_for_node(state: &ResolverState, entity_id: &str) -> Option<u64> {
    node_stats(state, entity_id).map(|s| s.events.total)
}

pub fn related_events_for_node<'a>(
    state: &'a ResolverState,
    entity_id: &str,
) -> Option<&'a [ResolverEvent]> {
    state
        .data
        .related_events
        .get(entity_id)
        .map(|page| page.events.as_slice())
}

/// Loaded related events grouped by every category they carry. An event
/// with several categories is listed under each.
pub fn related_events_by_category<'a>(
    state: &'a ResolverState,
    entity_id: &str,
) -> BTreeMap<String, Vec<&'a ResolverEvent>> {
    let mut grouped: BTreeMap<String, Vec<&ResolverEvent>> = BTreeMap::new();
    for event in related_events_for_node(state, entity_id).unwrap_or_default() {
        for category in event.categories() {
            grouped.entry(category).or_default().push(event);
        }
    }
    grouped
}

pub fn has_more_related_events(state: &ResolverState, entity_id: &str) -> bool {
    state.data.has_more_related_events(entity_id)
}

// ----- panel -----

pub fn panel_view_and_parameters(state: &ResolverState) -> Option<PanelQueryStringState> {
    state.ui.panel_state()
}

pub fn panel_node_id(state: &ResolverState) -> Option<String> {
    state.ui.panel_node_id()
}

/// True until the panel node's first page has either arrived or failed.
pub fn related_events_for_panel_node_are_loading(state: &ResolverState) -> bool {
    let Some(id) = panel_node_id(state) else {
        return false;
    };
    match state.data.related_status(&id) {
        Some(RelatedFetchStatus::Requested { .. }) => !state.data.related_events.contains_key(&id),
        Some(RelatedFetchStatus::Completed { .. }) => false,
        None => state.data.entity_ids_requiring_related_events.contains(&id),
    }
}

pub fn process_event_for_panel_node_id(state: &ResolverState) -> Option<&ResolverEvent> {
    let id = panel_node_id(state)?;
    process_for_entity_id(state, &id)
}

/// The related event named by `panelRelatedEventID`, looked up among the
/// panel node's loaded pages.
pub fn event_for_panel_related_event_id(state: &ResolverState) -> Option<&ResolverEvent> {
    let panel = panel_view_and_parameters(state)?;
    let node_id = panel.panel_node_id()?;
    let event_id = panel.panel_related_event_id()?;
    related_events_for_node(state, node_id)?
        .iter()
        .find(|e| e.event_id().as_deref() == Some(event_id))
}

// ----- ui -----

pub fn focused_node(state: &ResolverState) -> Option<&str> {
    state.ui.focused_node.as_deref()
}

pub fn selected_node(state: &ResolverState) -> Option<&str> {
    state.ui.selected_node.as_deref()
}

// ----- camera -----

pub fn projection_matrix(state: &ResolverState, time: Timestamp) -> DAffine2 {
    state.camera.projection_matrix(time)
}

pub fn inverse_projection_matrix(state: &ResolverState, time: Timestamp) -> DAffine2 {
    state.camera.inverse_projection_matrix(time)
}

/// Nodes and edges inside the camera's view at `time`.
pub fn visible_process_node_positions_and_edge_line_segments(
    state: &ResolverState,
    time: Timestamp,
) -> Arc<VisibleEntities> {
    match layout(state) {
        Some(layout) => layout.visible_in(state.camera.viewable_bounding_box(time)),
        None => Arc::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::actions::ResolverAction;
    use crate::store::reducer::resolver_reducer;
    use crate::store::reducer::tests::loaded_state;
    use resolver_core::RelatedEventsPage;
    use serde_json::json;

    fn related_event(entity: &str, id: &str, category: serde_json::Value) -> ResolverEvent {
        serde_json::from_value(json!({
            "event": { "id": id, "category": category },
            "process": { "entity_id": entity },
        }))
        .expect("event parses")
    }

    fn with_panel(state: &mut ResolverState, url_search: &str) {
        resolver_reducer(
            state,
            &ResolverAction::AppReceivedNewExternalProperties {
                database_document_id: Some("doc".into()),
                url_search: url_search.into(),
                time: 0.0,
            },
        );
    }

    fn deliver(state: &mut ResolverState, entity: &str, events: Vec<ResolverEvent>) {
        resolver_reducer(
            state,
            &ResolverAction::AppRequestedRelatedEventData {
                entity_id: entity.into(),
                generation: 1,
            },
        );
        resolver_reducer(
            state,
            &ResolverAction::ServerReturnedRelatedEventData {
                entity_id: entity.into(),
                generation: 1,
                response: RelatedEventsPage {
                    entity_id: entity.into(),
                    events,
                    next_event: None,
                },
            },
        );
    }

    #[test]
    fn empty_state_is_quiet() {
        let state = ResolverState::default();
        assert!(!is_loading(&state));
        assert!(!has_error(&state));
        assert!(graphable_processes(&state).is_empty());
        assert!(process_for_entity_id(&state, "a").is_none());
        assert!(!related_events_for_panel_node_are_loading(&state));
        let visible = visible_process_node_positions_and_edge_line_segments(&state, 0.0);
        assert!(visible.process_node_positions.is_empty());
    }

    #[test]
    fn tree_selectors() {
        let state = loaded_state();
        assert_eq!(graphable_processes(&state).len(), 7);
        assert_eq!(node_level(&state, "e"), Some(3));
        assert_eq!(
            next_sibling(&state, "b").map(ResolverEvent::entity_id).as_deref(),
            Some("c")
        );
        assert!(!is_process_terminated(&state, "a"));
        assert_eq!(
            process_for_entity_id(&state, "g")
                .and_then(ResolverEvent::name)
                .as_deref(),
            Some("g.exe")
        );
    }

    #[test]
    fn centered_origin_is_visible() {
        let state = loaded_state();
        let visible = visible_process_node_positions_and_edge_line_segments(&state, 0.0);
        assert!(visible
            .process_node_positions
            .iter()
            .any(|n| n.entity_id == "a"));
        assert!(!visible.connecting_edge_line_segments.is_empty());

        let again = visible_process_node_positions_and_edge_line_segments(&state, 0.0);
        assert!(Arc::ptr_eq(&visible, &again));
    }

    #[test]
    fn panel_node_loading_then_grouped() {
        let mut state = loaded_state();
        with_panel(&mut state, "panelView=nodeEvents&panelNodeID=b&panelRelatedEventID=f2");
        assert!(related_events_for_panel_node_are_loading(&state));
        assert_eq!(
            process_event_for_panel_node_id(&state).map(ResolverEvent::entity_id).as_deref(),
            Some("b")
        );

        deliver(
            &mut state,
            "b",
            vec![
                related_event("b", "f1", json!("file")),
                related_event("b", "f2", json!(["file", "network"])),
                related_event("b", "n1", json!("network")),
            ],
        );
        assert!(!related_events_for_panel_node_are_loading(&state));

        let grouped = related_events_by_category(&state, "b");
        assert_eq!(grouped["file"].len(), 2);
        assert_eq!(grouped["network"].len(), 2);
        assert_eq!(
            event_for_panel_related_event_id(&state).and_then(ResolverEvent::event_id),
            Some("f2".to_string())
        );
        assert!(!has_more_related_events(&state, "b"));
    }

    #[test]
    fn unknown_panel_event_is_none() {
        let mut state = loaded_state();
        with_panel(&mut state, "panelView=nodeEvents&panelNodeID=b&panelRelatedEventID=zz");
        deliver(&mut state, "b", vec![related_event("b", "f1", json!("file"))]);
        assert!(event_for_panel_related_event_id(&state).is_none());
    }
}
