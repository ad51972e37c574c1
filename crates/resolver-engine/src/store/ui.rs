use crate::store::actions::ResolverAction;
use crate::store::panel::{parse_panel_state, PanelQueryStringState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedEventCategorySelection {
    pub entity_id: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub focused_node: Option<String>,
    pub selected_node: Option<String>,
    /// Last query string handed in from outside; the panel is derived from it.
    pub url_search: String,
    pub selected_related_event_category: Option<RelatedEventCategorySelection>,
}

impl UiState {
    pub fn panel_state(&self) -> Option<PanelQueryStringState> {
        parse_panel_state(&self.url_search)
    }

    pub fn panel_node_id(&self) -> Option<String> {
        self.panel_state()
            .and_then(|p| p.panel_node_id().map(str::to_string))
    }
}

pub fn ui_reducer(state: &mut UiState, action: &ResolverAction) {
    match action {
        ResolverAction::AppReceivedNewExternalProperties { url_search, .. } => {
            state.url_search = url_search.clone();
            // the query string is authoritative for which node is selected
            if let Some(id) = state.panel_node_id() {
                state.selected_node = Some(id);
            }
        }
        ResolverAction::UserFocusedOnResolverNode(id) => {
            state.focused_node = Some(id.clone());
        }
        ResolverAction::UserSelectedResolverNode(id) => {
            state.selected_node = Some(id.clone());
        }
        ResolverAction::UserBroughtProcessIntoView { id, .. }
        | ResolverAction::AppDetectedNewIdFromQueryParams { id, .. } => {
            state.focused_node = Some(id.clone());
            state.selected_node = Some(id.clone());
        }
        ResolverAction::UserSelectedRelatedEventCategory {
            entity_id,
            category,
        } => {
            state.selected_related_event_category = Some(RelatedEventCategorySelection {
                entity_id: entity_id.clone(),
                category: category.clone(),
            });
        }
        _ => {}
    }
}
