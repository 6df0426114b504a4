//! Error types for ambrotation

use crate::slot::SlotId;

/// Rotation errors.
///
/// None of these is fatal to a running session: the scheduler turns playback
/// failures into retries or a forced advance. Audio failures never show up
/// here, the autoplay controller handles its own [`AudioError`]s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Playback rejected on slot {slot}: {reason}")]
    PlaybackRejected { slot: SlotId, reason: String },

    #[error("Surface error on slot {slot}: {reason}")]
    Surface { slot: SlotId, reason: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn playback_rejected(slot: SlotId, reason: impl Into<String>) -> Self {
        Error::PlaybackRejected {
            slot,
            reason: reason.into(),
        }
    }

    pub fn surface(slot: SlotId, reason: impl Into<String>) -> Self {
        Error::Surface {
            slot,
            reason: reason.into(),
        }
    }
}

/// Failures reported by an [`AudioTrack`](crate::autoplay::AudioTrack).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// The platform refused to start playback (autoplay policy).
    #[error("Playback not allowed: {0}")]
    NotAllowed(String),

    #[error("Audio playback failed: {0}")]
    Failed(String),
}

/// Specialized Result type for ambrotation
pub type Result<T> = std::result::Result<T, Error>;
