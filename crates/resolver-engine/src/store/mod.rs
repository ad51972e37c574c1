pub mod actions;
pub mod data;
pub mod middleware;
pub mod panel;
pub mod reducer;
pub mod selectors;
pub mod ui;

pub use actions::{RequestId, ResolverAction};
pub use middleware::{ResolverRuntime, RuntimeHandle};
pub use panel::{parse_panel_state, with_panel_state, NodeEventsRefinement, PanelQueryStringState};

use crate::camera::CameraState;
use data::DataState;
use ui::UiState;

#[derive(Debug, Clone, Default)]
pub struct ResolverState {
    pub camera: CameraState,
    pub data: DataState,
    pub ui: UiState,
}

/// The single owner of `ResolverState`. All mutation goes through `dispatch`.
#[derive(Debug, Default)]
pub struct Store {
    state: ResolverState,
}

impl Store {
    pub fn new(state: ResolverState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    pub fn dispatch(&mut self, action: &ResolverAction) {
        reducer::resolver_reducer(&mut self.state, action);
    }
}
