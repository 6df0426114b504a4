//! Media entries shown by the rotation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media bound to a slot.
///
/// Videos advance on their natural end, images after the dwell duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Image,
}

/// Immutable rotation item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaEntry {
    pub kind: MediaKind,
    pub source: String,
}

impl MediaEntry {
    pub fn video(source: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            source: source.into(),
        }
    }

    pub fn image(source: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            source: source.into(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}

impl fmt::Display for MediaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MediaKind::Video => write!(f, "video:{}", self.source),
            MediaKind::Image => write!(f, "image:{}", self.source),
        }
    }
}
