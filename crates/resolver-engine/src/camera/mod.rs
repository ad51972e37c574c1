pub mod geometry;
pub mod reducer;

pub use geometry::{Aabb, DAffine2, DVec2};
pub use reducer::{camera_reducer, CameraAction};

use crate::util::clock::Timestamp;

pub const MIN_ZOOM_LEVEL: f64 = 0.05;
pub const MAX_ZOOM_LEVEL: f64 = 1.0;
pub const ZOOM_STEP: f64 = 0.1;
pub const ANIMATION_DURATION_MS: f64 = 1_000.0;
pub const NUDGE_DURATION_MS: f64 = 300.0;
/// Screen pixels moved per nudge, independent of zoom.
pub const NUDGE_PIXELS: f64 = 50.0;

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return MAX_ZOOM_LEVEL;
    }
    zoom.clamp(MIN_ZOOM_LEVEL, MAX_ZOOM_LEVEL)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanningState {
    /// Screen position where the drag started.
    pub origin: DVec2,
    pub current_offset: DVec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraAnimation {
    pub start_time: Timestamp,
    pub duration: f64,
    pub initial_translation: DVec2,
    pub target_translation: DVec2,
}

impl CameraAnimation {
    fn progress(&self, time: Timestamp) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((time - self.start_time) / self.duration).clamp(0.0, 1.0)
    }

    fn is_running(&self, time: Timestamp) -> bool {
        time < self.start_time + self.duration
    }
}

fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Pan/zoom state. The world origin sits at the raster center when the
/// translation is zero; world y grows upward, screen y downward.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub zoom_level: f64,
    /// Translation excluding an in-progress pan.
    pub panning_offset: DVec2,
    pub panning: Option<PanningState>,
    pub animation: Option<CameraAnimation>,
    pub raster_size: DVec2,
    pub latest_focused_world_coordinates: Option<DVec2>,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            zoom_level: MAX_ZOOM_LEVEL,
            panning_offset: DVec2::ZERO,
            panning: None,
            animation: None,
            raster_size: DVec2::ZERO,
            latest_focused_world_coordinates: None,
        }
    }
}

// ----- selectors -----

impl CameraState {
    pub fn scale(&self) -> f64 {
        clamp_zoom(self.zoom_level)
    }

    pub fn user_is_panning(&self) -> bool {
        self.panning.is_some()
    }

    pub fn is_animating(&self, time: Timestamp) -> bool {
        self.animation.is_some_and(|a| a.is_running(time))
    }

    /// World-space translation at `time`, including animation and panning.
    pub fn translation(&self, time: Timestamp) -> DVec2 {
        if let Some(panning) = self.panning {
            let delta = panning.current_offset - panning.origin;
            let scale = self.scale();
            return self.panning_offset + DVec2::new(delta.x / scale, -delta.y / scale);
        }
        if let Some(animation) = self.animation {
            if animation.is_running(time) {
                let t = ease_in_out_cubic(animation.progress(time));
                return animation
                    .initial_translation
                    .lerp(animation.target_translation, t);
            }
        }
        self.panning_offset
    }

    /// World to screen.
    pub fn projection_matrix(&self, time: Timestamp) -> DAffine2 {
        let scale = self.scale();
        let center = self.raster_size * 0.5;
        DAffine2::from_translation(center)
            * DAffine2::from_scale(DVec2::new(scale, -scale))
            * DAffine2::from_translation(self.translation(time))
    }

    /// Screen to world.
    pub fn inverse_projection_matrix(&self, time: Timestamp) -> DAffine2 {
        let scale = self.scale();
        let center = self.raster_size * 0.5;
        DAffine2::from_translation(-self.translation(time))
            * DAffine2::from_scale(DVec2::new(1.0 / scale, -1.0 / scale))
            * DAffine2::from_translation(-center)
    }

    pub fn viewable_bounding_box(&self, time: Timestamp) -> Aabb {
        let inverse = self.inverse_projection_matrix(time);
        Aabb::new(
            inverse.transform_point2(DVec2::ZERO),
            inverse.transform_point2(self.raster_size),
        )
    }
}
