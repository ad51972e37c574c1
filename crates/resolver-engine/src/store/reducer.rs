use crate::camera::{camera_reducer, CameraAction};
use crate::store::actions::ResolverAction;
use crate::store::data::data_reducer;
use crate::store::ui::ui_reducer;
use crate::store::ResolverState;
use crate::util::clock::Timestamp;

/// Runs every concern's reducer, then applies the transitions that need
/// more than one concern at once.
pub fn resolver_reducer(state: &mut ResolverState, action: &ResolverAction) {
    let previously_selected = state.ui.selected_node.clone();
    let accepts_tree = match action {
        ResolverAction::ServerReturnedResolverData {
            request_id,
            database_document_id,
            ..
        } => state
            .data
            .accepts_tree_response(*request_id, database_document_id),
        _ => false,
    };

    if let ResolverAction::Camera(camera_action) = action {
        camera_reducer(&mut state.camera, camera_action);
    }
    data_reducer(&mut state.data, action);
    ui_reducer(&mut state.ui, action);

    // whatever the panel shows needs its related events
    if let Some(panel_node_id) = state.ui.panel_node_id() {
        state
            .data
            .entity_ids_requiring_related_events
            .insert(panel_node_id);
    }

    match action {
        ResolverAction::AppReceivedNewExternalProperties { time, .. } => {
            if let Some(selected) = state.ui.selected_node.clone() {
                if previously_selected.as_deref() != Some(selected.as_str()) {
                    animate_process_into_view(state, &selected, *time);
                }
            }
        }
        ResolverAction::UserBroughtProcessIntoView { id, time }
        | ResolverAction::AppDetectedNewIdFromQueryParams { id, time } => {
            animate_process_into_view(state, id, *time);
        }
        ResolverAction::ServerReturnedResolverData { .. } if accepts_tree => {
            center_on_loaded_tree(state);
        }
        _ => {}
    }
}

fn animate_process_into_view(state: &mut ResolverState, entity_id: &str, time: Timestamp) {
    let Some(tree) = state.data.resolved_tree() else {
        return;
    };
    let Some(position) = tree.layout.position(entity_id) else {
        return;
    };
    camera_reducer(
        &mut state.camera,
        &CameraAction::AnimateTo {
            world_coordinates: position,
            time,
        },
    );
}

/// Jumps to the selected node, or the tree's origin when nothing is selected.
fn center_on_loaded_tree(state: &mut ResolverState) {
    let Some(tree) = state.data.resolved_tree() else {
        return;
    };
    let target = state
        .ui
        .selected_node
        .as_deref()
        .and_then(|id| tree.layout.position(id))
        .or_else(|| tree.layout.position(&tree.response.entity_id));
    if let Some(position) = target {
        camera_reducer(
            &mut state.camera,
            &CameraAction::UserSetPositionOfCamera(-position),
        );
    }
}
