use crate::host::UtteranceId;
use crate::math::{step_zoom, wrap_degrees};

/// Mutable session state of one panorama viewer
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    /// Id of the scene on screen
    pub(crate) scene: String,
    /// View direction in degrees, always in `[0, 360)`
    pub(crate) rotation: f64,
    /// Zoom level in percent
    pub(crate) zoom: i32,
    /// Auto-rotation enabled
    pub(crate) auto_rotate: bool,
    /// Narration in flight
    pub(crate) narration: Option<UtteranceId>,
    /// Last pointer position while a drag is in progress
    pub(crate) drag: Option<(f64, f64)>,
    /// Fullscreen presentation accepted by the host
    pub(crate) fullscreen: bool,
    /// Hotspot markers drawn
    pub(crate) show_hotspots: bool,
    /// Viewer has keyboard focus
    pub(crate) active: bool,
}

impl ViewerState {
    pub fn new(scene: impl Into<String>, zoom: i32) -> Self {
        ViewerState {
            scene: scene.into(),
            rotation: 0.0,
            zoom,
            auto_rotate: false,
            narration: None,
            drag: None,
            fullscreen: false,
            show_hotspots: true,
            active: true,
        }
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.auto_rotate
    }

    pub fn is_narrating(&self) -> bool {
        self.narration.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn shows_hotspots(&self) -> bool {
        self.show_hotspots
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn rotate_by(&mut self, delta: f64) {
        self.rotation = wrap_degrees(self.rotation + delta);
    }

    pub(crate) fn zoom_by(&mut self, delta: i32, min: i32, max: i32) {
        self.zoom = step_zoom(self.zoom, delta, min, max);
    }

    /// Back to facing forward at the given zoom
    pub(crate) fn reset_view(&mut self, zoom: i32) {
        self.rotation = 0.0;
        self.zoom = zoom;
    }
}
