//! Preloads the upcoming entry into the inactive slot.

use crate::error::Result;
use crate::playlist::Playlist;
use crate::slot::{SlotId, SlotManager};
use crate::surface::MediaSurface;
use tracing::{debug, warn};

/// Binds `playlist[(current + 1) mod len]` into the inactive slot without
/// activating it, so that the next transition only waits on local buffering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preloader;

impl Preloader {
    pub fn new() -> Self {
        Self
    }

    /// Prepares the entry following `current_index` into `inactive`.
    ///
    /// Returns the index that was preloaded, `None` on an empty playlist.
    pub fn preload<S: MediaSurface>(
        &self,
        playlist: &Playlist,
        current_index: usize,
        slots: &mut SlotManager<S>,
        inactive: SlotId,
    ) -> Result<Option<usize>> {
        let next_index = playlist.next_index(current_index);
        let Some(next) = playlist.get(next_index) else {
            return Ok(None);
        };

        let rebound = slots.attach(inactive, next)?;
        slots.park(inactive);

        debug!(
            slot = %inactive,
            index = next_index,
            source = %next.source,
            rebound,
            "Preloaded next entry"
        );
        Ok(Some(next_index))
    }

    /// Same as [`preload`](Self::preload) but only logs a failure: a slot
    /// that could not be prepared is bound again when it becomes active.
    pub fn preload_or_warn<S: MediaSurface>(
        &self,
        playlist: &Playlist,
        current_index: usize,
        slots: &mut SlotManager<S>,
        inactive: SlotId,
    ) -> Option<usize> {
        match self.preload(playlist, current_index, slots, inactive) {
            Ok(index) => index,
            Err(err) => {
                warn!(slot = %inactive, error = %err, "Preload failed");
                None
            }
        }
    }
}
