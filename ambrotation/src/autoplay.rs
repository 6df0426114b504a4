//! Background music and the platform autoplay policy.
//!
//! Platforms commonly refuse audible playback that was not triggered by the
//! user. The controller first tries to start the track unmuted, falls back to
//! a muted start, and otherwise stays silent until the user toggles the
//! sound. None of this ever reaches the rotation.

use crate::error::AudioError;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Capability over the looping background track.
///
/// No seek: toggling the sound never changes the playback position.
#[async_trait]
pub trait AudioTrack: Send {
    /// Starts or resumes playback; resolves once the platform accepted or
    /// refused it.
    async fn play(&mut self) -> Result<(), AudioError>;

    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Volume in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
}

#[async_trait]
impl<T: AudioTrack + ?Sized> AudioTrack for Box<T> {
    async fn play(&mut self) -> Result<(), AudioError> {
        (**self).play().await
    }

    fn set_muted(&mut self, muted: bool) {
        (**self).set_muted(muted)
    }

    fn is_muted(&self) -> bool {
        (**self).is_muted()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }
}

/// How the startup attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayOutcome {
    /// Playing with sound.
    Audible,
    /// Audible start refused, playing muted.
    MutedFallback,
    /// Nothing plays until the user toggles the sound.
    SilentIdle,
}

/// What the sound toggle shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MusicState {
    pub muted: bool,
    pub playing: bool,
}

pub struct AutoplayFallbackController<T> {
    track: T,
    volume: f32,
    outcome: Option<AutoplayOutcome>,
}

impl<T: AudioTrack> AutoplayFallbackController<T> {
    pub fn new(track: T, volume: f32) -> Self {
        Self {
            track,
            volume: volume.clamp(0.0, 1.0),
            outcome: None,
        }
    }

    /// Startup attempt: unmuted, then muted, then silent idle.
    ///
    /// A refusal by policy (`NotAllowed`) triggers the muted retry; any other
    /// failure goes straight to silent idle, muting would not help.
    pub async fn start(&mut self) -> AutoplayOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        self.track.set_volume(self.volume);
        self.track.set_muted(false);

        let outcome = match self.track.play().await {
            Ok(()) => {
                info!(volume = self.volume, "🎵 Music started");
                AutoplayOutcome::Audible
            }
            Err(AudioError::NotAllowed(reason)) => {
                warn!(%reason, "Audible autoplay refused, retrying muted");
                self.track.set_muted(true);
                match self.track.play().await {
                    Ok(()) => {
                        info!("🔇 Music started muted");
                        AutoplayOutcome::MutedFallback
                    }
                    Err(err) => {
                        warn!(error = %err, "Muted music fallback also failed");
                        AutoplayOutcome::SilentIdle
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "Music could not start");
                self.track.set_muted(true);
                AutoplayOutcome::SilentIdle
            }
        };

        self.outcome = Some(outcome);
        outcome
    }

    /// User toggle: unmutes (resuming if paused) or mutes.
    ///
    /// A failed resume is logged and otherwise ignored.
    pub async fn toggle(&mut self) -> MusicState {
        if self.track.is_muted() {
            self.track.set_muted(false);
            if self.track.is_paused() {
                match self.track.play().await {
                    Ok(()) => debug!("Music resumed on unmute"),
                    Err(err) => warn!(error = %err, "Error playing music on unmute"),
                }
            }
        } else {
            self.track.set_muted(true);
        }

        let state = self.state();
        debug!(muted = state.muted, playing = state.playing, "Music toggled");
        state
    }

    pub fn state(&self) -> MusicState {
        MusicState {
            muted: self.track.is_muted(),
            playing: !self.track.is_paused(),
        }
    }

    /// Startup outcome, `None` before [`start`](Self::start).
    pub fn outcome(&self) -> Option<AutoplayOutcome> {
        self.outcome
    }

    pub fn track(&self) -> &T {
        &self.track
    }
}
