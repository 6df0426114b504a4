//! Playback surface capability.
//!
//! A surface is one of the two visual layers the backdrop renders into. The
//! scheduler never talks to a concrete player: it drives surfaces through
//! this trait, so any backend (a browser element bridge, a native player,
//! the headless runner, a test fake) can sit behind it.
//!
//! Surfaces are owned by their slot and live for the whole session; they are
//! rebound to new sources, never recreated.

use crate::events::CompletionListener;
use crate::media::MediaEntry;
use std::time::Duration;

pub trait MediaSurface: Send {
    /// Points the surface at `entry`.
    ///
    /// For a video this sets the source and starts buffering without playing;
    /// for an image it exposes the displayable reference. The slot manager
    /// skips this call when the surface already holds `entry`.
    fn bind(&mut self, entry: &MediaEntry) -> Result<(), String>;

    /// Starts (or resumes) playback of the bound video.
    ///
    /// Must not block on buffering: playback begins once enough data is
    /// available. A video that already reached its end restarts from the
    /// beginning. An `Err` means the start was refused outright.
    fn play(&mut self) -> Result<(), String>;

    fn pause(&mut self);

    /// Fades the surface to `opacity` (0.0 hidden, 1.0 foreground) over `fade`.
    fn set_opacity(&mut self, opacity: f32, fade: Duration);

    /// Registers the completion callback for the currently bound video,
    /// replacing any previous one.
    fn on_completion(&mut self, listener: CompletionListener);

    /// Detaches the completion callback, if any.
    fn clear_completion(&mut self);

    /// Releases backend resources at session teardown.
    fn release(&mut self) {}
}

impl<S: MediaSurface + ?Sized> MediaSurface for Box<S> {
    fn bind(&mut self, entry: &MediaEntry) -> Result<(), String> {
        (**self).bind(entry)
    }

    fn play(&mut self) -> Result<(), String> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn set_opacity(&mut self, opacity: f32, fade: Duration) {
        (**self).set_opacity(opacity, fade)
    }

    fn on_completion(&mut self, listener: CompletionListener) {
        (**self).on_completion(listener)
    }

    fn clear_completion(&mut self) {
        (**self).clear_completion()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
