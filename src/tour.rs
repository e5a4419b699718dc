use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::TourError;

/// A point of interest overlaid on a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Horizontal position in percent of the viewport
    pub x: f64,
    /// Vertical position in percent of the viewport
    pub y: f64,
    pub title: String,
    pub description: String,
    /// Scene this hotspot leads to; informational when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A named viewing location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: String,
    /// Background image reference
    pub image: String,
    /// Text read aloud by the voice guide
    pub narration: String,
    #[serde(default, rename = "hotspot")]
    pub hotspots: Vec<Hotspot>,
}

/// The static scene graph of a tour.
///
/// Scenes are kept in declaration order, which is also the order of the
/// scene selector. Once built the tour is read-only.
#[derive(Debug, Clone)]
pub struct Tour {
    start: String,
    scenes: Vec<Scene>,
    index: FxHashMap<String, usize>,
}

impl Tour {
    /// Builds a tour, checking ids, the start scene and hotspot positions.
    ///
    /// Hotspot targets are not required to resolve: activating a dangling
    /// one is ignored at runtime. See [`Tour::dangling_targets`].
    pub fn new(start: Option<String>, scenes: Vec<Scene>) -> Result<Self, TourError> {
        let first = scenes.first().ok_or(TourError::Empty)?.id.clone();
        let start = start.unwrap_or(first);

        let mut index = FxHashMap::default();
        for (position, scene) in scenes.iter().enumerate() {
            if index.insert(scene.id.clone(), position).is_some() {
                return Err(TourError::DuplicateScene(scene.id.clone()));
            }
            for hotspot in &scene.hotspots {
                let in_range = |v: f64| (0.0..=100.0).contains(&v);
                if !in_range(hotspot.x) || !in_range(hotspot.y) {
                    return Err(TourError::HotspotOutOfRange {
                        scene: scene.id.clone(),
                        title: hotspot.title.clone(),
                        x: hotspot.x,
                        y: hotspot.y,
                    });
                }
            }
        }

        if !index.contains_key(&start) {
            return Err(TourError::UnknownStart(start));
        }

        Ok(Tour {
            start,
            scenes,
            index,
        })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn get(&self, id: &str) -> Option<&Scene> {
        self.index.get(id).map(|&i| &self.scenes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Id of the scene `step` places after `id` in declaration order, wrapping
    pub fn cycle(&self, id: &str, step: isize) -> Option<&str> {
        let position = *self.index.get(id)? as isize;
        let len = self.scenes.len() as isize;
        let next = (position + step).rem_euclid(len) as usize;
        Some(&self.scenes[next].id)
    }

    /// `(scene id, target)` pairs whose target names no scene
    pub fn dangling_targets(&self) -> Vec<(&str, &str)> {
        self.scenes
            .iter()
            .flat_map(|scene| {
                scene
                    .hotspots
                    .iter()
                    .filter_map(|h| h.target.as_deref())
                    .filter(|target| !self.contains(target))
                    .map(move |target| (scene.id.as_str(), target))
            })
            .collect()
    }

    /// The built-in monastery tour
    pub fn monastery() -> Self {
        let scenes = vec![
            Scene {
                id: "main-hall".into(),
                name: "Main Hall".into(),
                image: "assets/main-hall.jpg".into(),
                narration: "Welcome to the Main Hall of the monastery. This sacred space, \
                            built in the twelfth century, features Gothic arches and is the \
                            heart of the monastic community. The stone work around you took \
                            craftsmen over thirty years to complete."
                    .into(),
                hotspots: vec![
                    hotspot(
                        25.0,
                        30.0,
                        "Ancient Altar",
                        "Sacred altar with 800-year-old religious artifacts",
                        None,
                    ),
                    hotspot(
                        70.0,
                        45.0,
                        "Stone Pillars",
                        "Hand-carved limestone pillars with religious motifs",
                        Some("sacred-chapel"),
                    ),
                    hotspot(
                        50.0,
                        70.0,
                        "Prayer Area",
                        "Prayer space where monks gather for daily worship",
                        None,
                    ),
                    hotspot(
                        80.0,
                        25.0,
                        "Exit to Garden",
                        "Pathway leading to the monastery gardens",
                        Some("peaceful-garden"),
                    ),
                ],
            },
            Scene {
                id: "sacred-chapel".into(),
                name: "Sacred Chapel".into(),
                image: "assets/sacred-chapel.jpg".into(),
                narration: "You are now in the Sacred Chapel, the spiritual centre of the \
                            monastery. This sanctuary has witnessed centuries of prayer and \
                            meditation, and its stained glass windows tell stories of faith \
                            and devotion."
                    .into(),
                hotspots: vec![
                    hotspot(
                        50.0,
                        20.0,
                        "Stained Glass",
                        "Medieval stained glass depicting religious scenes",
                        None,
                    ),
                    hotspot(30.0, 60.0, "Prayer Benches", "Wooden benches for contemplation", None),
                    hotspot(
                        85.0,
                        40.0,
                        "Back to Main Hall",
                        "Return to the main monastery hall",
                        Some("main-hall"),
                    ),
                ],
            },
            Scene {
                id: "ancient-library".into(),
                name: "Ancient Library".into(),
                image: "assets/ancient-library.jpg".into(),
                narration: "Welcome to the Ancient Library, where centuries of wisdom are \
                            preserved. Generations of monks have maintained these texts and \
                            manuscripts, among them rare Buddhist scriptures and works of \
                            philosophy."
                    .into(),
                hotspots: vec![
                    hotspot(
                        40.0,
                        30.0,
                        "Ancient Manuscripts",
                        "Rare Buddhist texts dating back 500 years",
                        None,
                    ),
                    hotspot(
                        60.0,
                        50.0,
                        "Reading Desk",
                        "Desk where monks study sacred texts",
                        None,
                    ),
                    hotspot(
                        20.0,
                        70.0,
                        "Scroll Collection",
                        "Ancient scrolls with philosophical teachings",
                        None,
                    ),
                    hotspot(
                        80.0,
                        35.0,
                        "Exit to Garden",
                        "Path leading to the monastery gardens",
                        Some("peaceful-garden"),
                    ),
                ],
            },
            Scene {
                id: "peaceful-garden".into(),
                name: "Peaceful Garden".into(),
                image: "assets/peaceful-garden.jpg".into(),
                narration: "You are now in the Peaceful Garden, a place of stillness within \
                            the monastery walls. The tended plants and flowing water have \
                            invited meditation and reflection for centuries."
                    .into(),
                hotspots: vec![
                    hotspot(
                        30.0,
                        40.0,
                        "Meditation Stone",
                        "Stone where monks practice meditation",
                        None,
                    ),
                    hotspot(
                        70.0,
                        30.0,
                        "Prayer Fountain",
                        "Ancient fountain with blessed water",
                        None,
                    ),
                    hotspot(
                        50.0,
                        70.0,
                        "Herb Garden",
                        "Medicinal herbs grown by the monastery",
                        None,
                    ),
                    hotspot(
                        85.0,
                        60.0,
                        "Back to Chapel",
                        "Return to the sacred chapel",
                        Some("sacred-chapel"),
                    ),
                ],
            },
        ];

        // Every id and coordinate above is fixed, so validation cannot fail.
        let mut index = FxHashMap::default();
        for (position, scene) in scenes.iter().enumerate() {
            index.insert(scene.id.clone(), position);
        }
        Tour {
            start: "main-hall".into(),
            scenes,
            index,
        }
    }
}

fn hotspot(x: f64, y: f64, title: &str, description: &str, target: Option<&str>) -> Hotspot {
    Hotspot {
        x,
        y,
        title: title.into(),
        description: description.into(),
        target: target.map(Into::into),
    }
}
