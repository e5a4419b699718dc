use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TourError;
use crate::tour::{Scene, Tour};

/// Interaction tuning for the panorama viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Degrees of rotation per pixel of horizontal drag
    pub drag_sensitivity: f64,
    /// Auto-rotate tick period in milliseconds
    pub auto_rotate_period_ms: u64,
    /// Degrees added on each auto-rotate tick
    pub auto_rotate_step: f64,
    /// Rotation per arrow key press
    pub key_rotate_step: f64,
    /// Zoom percent per arrow key press
    pub key_zoom_step: i32,
    /// Rotation per on-screen button press
    pub button_rotate_step: f64,
    /// Zoom percent per on-screen button press
    pub button_zoom_step: i32,
    pub zoom_min: i32,
    pub zoom_max: i32,
    /// Zoom a scene opens at
    pub zoom_default: i32,
    pub speech: SpeechConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            drag_sensitivity: 0.5,
            auto_rotate_period_ms: 50,
            auto_rotate_step: 1.0,
            key_rotate_step: 5.0,
            key_zoom_step: 10,
            button_rotate_step: 15.0,
            button_zoom_step: 20,
            zoom_min: 50,
            zoom_max: 200,
            zoom_default: 100,
            speech: SpeechConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<(), TourError> {
        if self.zoom_min > self.zoom_default || self.zoom_default > self.zoom_max {
            return Err(TourError::InvalidSettings(format!(
                "zoom bounds must satisfy {} <= {} <= {}",
                self.zoom_min, self.zoom_default, self.zoom_max
            )));
        }
        if self.auto_rotate_period_ms == 0 {
            return Err(TourError::InvalidSettings(
                "auto_rotate_period_ms must be positive".into(),
            ));
        }
        if !(self.drag_sensitivity.is_finite() && self.drag_sensitivity > 0.0) {
            return Err(TourError::InvalidSettings(
                "drag_sensitivity must be a positive number".into(),
            ));
        }
        let steps = [
            ("auto_rotate_step", self.auto_rotate_step),
            ("key_rotate_step", self.key_rotate_step),
            ("button_rotate_step", self.button_rotate_step),
        ];
        if let Some((name, _)) = steps.iter().find(|(_, step)| !step.is_finite()) {
            return Err(TourError::InvalidSettings(format!(
                "{name} must be a finite number of degrees"
            )));
        }
        Ok(())
    }
}

/// Voice guide parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// External program that reads text aloud
    pub program: String,
    /// Speaking rate, 1.0 is the program's normal speed
    pub rate: f32,
    pub pitch: f32,
    /// Volume between 0.0 and 1.0
    pub volume: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: "espeak".into(),
            rate: 0.8,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}

/// On-disk layout of a tour file
#[derive(Debug, Serialize, Deserialize)]
struct TourFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(default)]
    viewer: ViewerConfig,
    #[serde(rename = "scene")]
    scenes: Vec<Scene>,
}

/// Everything the viewer needs before the first frame
#[derive(Debug)]
pub struct Settings {
    pub viewer: ViewerConfig,
    pub tour: Tour,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            viewer: ViewerConfig::default(),
            tour: Tour::monastery(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, TourError> {
        let raw = fs::read_to_string(path).map_err(|source| TourError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, TourError> {
        let file: TourFile = toml::from_str(raw)?;
        file.viewer.validate()?;
        let tour = Tour::new(file.start, file.scenes)?;
        for (scene, target) in tour.dangling_targets() {
            log::warn!("scene `{scene}` has a hotspot leading to unknown scene `{target}`");
        }
        Ok(Self {
            viewer: file.viewer,
            tour,
        })
    }

    /// Serializes these settings in the tour file format
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let file = TourFile {
            start: Some(self.tour.start().to_string()),
            viewer: self.viewer.clone(),
            scenes: self.tour.scenes().to_vec(),
        };
        toml::to_string_pretty(&file)
    }
}
