use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or validating a tour.
#[derive(Debug, Error)]
pub enum TourError {
    #[error("failed to read tour file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tour file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("tour has no scenes")]
    Empty,
    #[error("duplicate scene id `{0}`")]
    DuplicateScene(String),
    #[error("start scene `{0}` is not part of the tour")]
    UnknownStart(String),
    #[error("hotspot `{title}` on scene `{scene}` lies outside the viewport ({x}, {y})")]
    HotspotOutOfRange {
        scene: String,
        title: String,
        x: f64,
        y: f64,
    },
    #[error("invalid viewer settings: {0}")]
    InvalidSettings(String),
}

/// Failures reported by a host capability (speech, fullscreen).
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{0} is not available on this host")]
    Unavailable(&'static str),
    #[error("host capability failed: {0}")]
    Io(#[from] std::io::Error),
}
