use super::{
    clamp_zoom, CameraAnimation, CameraState, PanningState, DVec2, ANIMATION_DURATION_MS,
    NUDGE_DURATION_MS, NUDGE_PIXELS, ZOOM_STEP,
};
use crate::util::clock::Timestamp;

#[derive(Debug, Clone, PartialEq)]
pub enum CameraAction {
    UserSetZoomLevel(f64),
    UserClickedZoomIn,
    UserClickedZoomOut,
    /// Positive zooms in. Keeps the last pointed-at world point fixed on screen.
    UserZoomed { zoom_change: f64, time: Timestamp },
    UserMovedPointer { screen_coordinates: DVec2, time: Timestamp },
    UserStartedPanning { screen_coordinates: DVec2, time: Timestamp },
    UserContinuedPanning { screen_coordinates: DVec2, time: Timestamp },
    UserStoppedPanning { time: Timestamp },
    /// `direction` is a world-space unit vector.
    UserNudgedCamera { direction: DVec2, time: Timestamp },
    UserSetRasterSize(DVec2),
    UserSetPositionOfCamera(DVec2),
    /// Centers `world_coordinates` over `ANIMATION_DURATION_MS`.
    AnimateTo { world_coordinates: DVec2, time: Timestamp },
}

/// Replaces any running animation with a fixed translation at `time`.
fn freeze(state: &mut CameraState, time: Timestamp) {
    if state.animation.is_some() {
        state.panning_offset = state.translation(time);
        state.animation = None;
    }
}

fn animate(state: &mut CameraState, target: DVec2, duration: f64, time: Timestamp) {
    let initial = state.translation(time);
    state.panning = None;
    state.panning_offset = target;
    state.animation = Some(CameraAnimation {
        start_time: time,
        duration,
        initial_translation: initial,
        target_translation: target,
    });
}

fn set_zoom(state: &mut CameraState, zoom: f64) {
    state.zoom_level = clamp_zoom(zoom);
}

pub fn camera_reducer(state: &mut CameraState, action: &CameraAction) {
    match action {
        CameraAction::UserSetZoomLevel(zoom) => set_zoom(state, *zoom),
        CameraAction::UserClickedZoomIn => set_zoom(state, state.zoom_level + ZOOM_STEP),
        CameraAction::UserClickedZoomOut => set_zoom(state, state.zoom_level - ZOOM_STEP),
        CameraAction::UserZoomed { zoom_change, time } => {
            freeze(state, *time);
            let old_scale = state.scale();
            set_zoom(state, state.zoom_level + zoom_change);
            let new_scale = state.scale();
            if state.panning.is_none() {
                if let Some(focus) = state.latest_focused_world_coordinates {
                    // s_old * (w + t_old) == s_new * (w + t_new)
                    let anchored = (focus + state.panning_offset) * (old_scale / new_scale);
                    state.panning_offset = anchored - focus;
                }
            }
        }
        CameraAction::UserMovedPointer {
            screen_coordinates,
            time,
        } => {
            if let Some(panning) = state.panning.as_mut() {
                panning.current_offset = *screen_coordinates;
            }
            let world = state
                .inverse_projection_matrix(*time)
                .transform_point2(*screen_coordinates);
            state.latest_focused_world_coordinates = Some(world);
        }
        CameraAction::UserStartedPanning {
            screen_coordinates,
            time,
        } => {
            freeze(state, *time);
            state.panning = Some(PanningState {
                origin: *screen_coordinates,
                current_offset: *screen_coordinates,
            });
        }
        CameraAction::UserContinuedPanning {
            screen_coordinates,
            ..
        } => {
            if let Some(panning) = state.panning.as_mut() {
                panning.current_offset = *screen_coordinates;
            }
        }
        CameraAction::UserStoppedPanning { time } => {
            if state.panning.is_some() {
                state.panning_offset = state.translation(*time);
                state.panning = None;
            }
        }
        CameraAction::UserNudgedCamera { direction, time } => {
            let distance = NUDGE_PIXELS / state.scale();
            let target = state.translation(*time) - *direction * distance;
            animate(state, target, NUDGE_DURATION_MS, *time);
        }
        CameraAction::UserSetRasterSize(size) => {
            state.raster_size = *size;
        }
        CameraAction::UserSetPositionOfCamera(translation) => {
            state.panning = None;
            state.animation = None;
            state.panning_offset = *translation;
        }
        CameraAction::AnimateTo {
            world_coordinates,
            time,
        } => {
            animate(state, -*world_coordinates, ANIMATION_DURATION_MS, *time);
        }
    }
}
