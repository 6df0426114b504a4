//! # ambrotation - Double-buffered crossfading backdrop rotation
//!
//! This crate drives an endless ambient backdrop: a few leading videos, then
//! a shuffled catalog of still images, shown one after the other through two
//! alternating playback slots. While one slot is on screen the other one is
//! already bound to the next entry, so every transition is a crossfade
//! between two ready surfaces.
//!
//! # Architecture
//!
//! - **PlaylistBuilder** : builds the immutable rotation order once per session
//! - **SlotManager** : owns the two slots, binds, activates and deactivates them
//! - **Preloader** : binds the upcoming entry into the inactive slot
//! - **TransitionScheduler** : state machine advancing on video end or image dwell
//! - **AutoplayFallbackController** : starts the background music despite autoplay policies
//! - **Session** : rotation loop serializing timers and callbacks, music in its own task
//!
//! Playback backends plug in through the [`MediaSurface`] and [`AudioTrack`]
//! traits.
//!
//! # Example
//!
//! ```no_run
//! use ambrotation::{
//!     AudioTrack, AutoplayFallbackController, MediaSurface, PlaylistBuilder, RotationSettings,
//!     Session,
//! };
//!
//! # async fn run<S, T>(surfaces: [S; 2], track: T) -> ambrotation::Result<()>
//! # where
//! #     S: MediaSurface + 'static,
//! #     T: AudioTrack + 'static,
//! # {
//! let playlist = PlaylistBuilder::from_sources(
//!     ["/assets/videos/intro.mp4"],
//!     (1..=167).map(|n| format!("/assets/images/{n}.jpg")),
//! )
//! .build(&mut rand::rng());
//!
//! let music = AutoplayFallbackController::new(track, 0.3);
//! let handle = Session::new(playlist, surfaces, music, RotationSettings::default()).spawn();
//!
//! handle.toggle_music().await?;
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod autoplay;
mod error;
mod events;
mod media;
mod playlist;
mod preloader;
mod scheduler;
mod session;
mod slot;
mod surface;
mod timer;

#[cfg(feature = "ambconfig")]
mod config_ext;

#[cfg(test)]
mod test_support;

// Public re-exports
pub use autoplay::{AudioTrack, AutoplayFallbackController, AutoplayOutcome, MusicState};
pub use error::{AudioError, Error, Result};
pub use events::{
    CompletionListener, EventReceiver, EventSender, Generation, RotationEvent, event_channel,
};
pub use media::{MediaEntry, MediaKind};
pub use playlist::{Playlist, PlaylistBuilder};
pub use preloader::Preloader;
pub use scheduler::{
    PlayerState, RetryPolicy, RotationSettings, TransitionOutcome, TransitionScheduler,
};
pub use session::{BackdropSnapshot, Session, SessionCommand, SessionHandle};
pub use slot::{PlaybackSlot, SlotId, SlotManager, SlotView};
pub use surface::MediaSurface;
pub use timer::TimerKind;

#[cfg(feature = "ambconfig")]
pub use config_ext::{MusicSettings, RotationConfigExt};
