//! Transition scheduler: the state machine advancing the rotation.
//!
//! ## Transitions
//!
//! A `VideoEnded` or `DwellExpired` event for the live activation commits a
//! transition, in this order:
//! 1. `current_index` moves to the next position (mod length)
//! 2. the other slot, which already holds that entry, becomes active
//! 3. the previously active slot is deactivated
//! 4. the entry after the new current one is preloaded into the slot that
//!    was just deactivated
//!
//! ## Stale events
//!
//! Timers and completion listeners may fire after the activation they were
//! armed for is gone. Each event carries `(slot, generation)`; anything not
//! matching the live `PlayerState` is discarded, so two racing events can
//! never advance the index twice.
//!
//! ## Playback failures
//!
//! A video that cannot start is retried on the same slot `max_retries` times,
//! `delay` apart. When the retries are exhausted the rotation is forced to
//! the next entry after one more `delay`, so a bad item never stalls it.

use crate::events::{EventSender, Generation, RotationEvent};
use crate::media::MediaEntry;
use crate::playlist::Playlist;
use crate::preloader::Preloader;
use crate::slot::{SlotId, SlotManager};
use crate::surface::MediaSurface;
use crate::timer::TimerKind;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Bounded retry policy for videos that fail to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt before the entry is skipped.
    pub max_retries: u32,
    /// Delay before each retry, and before the forced advance.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Timing constants of the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSettings {
    /// Overlap during which both slots are partially visible.
    pub crossfade: Duration,
    /// How long an image stays active.
    pub dwell: Duration,
    pub retry: RetryPolicy,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            crossfade: Duration::from_millis(1000),
            dwell: Duration::from_millis(7000),
            retry: RetryPolicy::default(),
        }
    }
}

/// Single source of truth of the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerState {
    pub active_slot: SlotId,
    pub current_index: usize,
    /// Incremented on every committed transition.
    pub generation: Generation,
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// A transition was committed.
    Advanced {
        index: usize,
        active: SlotId,
        forced: bool,
    },
    /// Playback failed; a retry is scheduled.
    Retrying { slot: SlotId, attempt: u32 },
    /// Retries are exhausted; the entry is skipped when the delay elapses.
    GivingUp { slot: SlotId },
    /// A retry started playback again.
    Resumed { slot: SlotId },
    /// The event belonged to an activation that is no longer live.
    Ignored,
    /// Nothing is rotating (empty playlist, not started or torn down).
    Idle,
}

pub struct TransitionScheduler<S> {
    playlist: Playlist,
    slots: SlotManager<S>,
    preloader: Preloader,
    settings: RotationSettings,
    state: Option<PlayerState>,
    failed_plays: u32,
}

impl<S: MediaSurface> TransitionScheduler<S> {
    pub fn new(
        playlist: Playlist,
        surfaces: [S; 2],
        settings: RotationSettings,
        events: EventSender,
    ) -> Self {
        Self {
            playlist,
            slots: SlotManager::new(surfaces, settings.crossfade, events),
            preloader: Preloader::new(),
            settings,
            state: None,
            failed_plays: 0,
        }
    }

    pub fn state(&self) -> Option<PlayerState> {
        self.state
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn slots(&self) -> &SlotManager<S> {
        &self.slots
    }

    pub fn settings(&self) -> &RotationSettings {
        &self.settings
    }

    /// Entry shown by the active slot.
    pub fn current_entry(&self) -> Option<&MediaEntry> {
        self.state
            .and_then(|state| self.playlist.get(state.current_index))
    }

    /// Starts the rotation: entry 0 on slot A, entry 1 preloaded on slot B.
    ///
    /// Must run inside a tokio runtime (timers are spawned tasks). An empty
    /// playlist leaves the scheduler idle and returns `None`.
    pub fn start(&mut self) -> Option<PlayerState> {
        if self.state.is_some() {
            warn!("Rotation already started");
            return self.state;
        }
        if self.playlist.is_empty() {
            info!("Playlist is empty, nothing to show");
            return None;
        }

        let state = PlayerState {
            active_slot: SlotId::A,
            current_index: 0,
            generation: 0,
        };
        self.state = Some(state);
        self.failed_plays = 0;

        self.slots.hide(SlotId::B);
        self.enter(state);
        self.preloader.preload_or_warn(
            &self.playlist,
            state.current_index,
            &mut self.slots,
            SlotId::B,
        );

        info!(entries = self.playlist.len(), "Rotation started");
        Some(state)
    }

    /// Applies one event to the state machine.
    pub fn handle(&mut self, event: RotationEvent) -> TransitionOutcome {
        let Some(state) = self.state else {
            trace!(?event, "Rotation idle, event dropped");
            return TransitionOutcome::Idle;
        };

        if event.slot() != state.active_slot || event.generation() != state.generation {
            trace!(
                ?event,
                active = %state.active_slot,
                generation = state.generation,
                "Stale event discarded"
            );
            return TransitionOutcome::Ignored;
        }

        match event {
            RotationEvent::VideoEnded { .. } | RotationEvent::DwellExpired { .. } => {
                self.commit(false)
            }
            RotationEvent::PlaybackRejected { slot, reason, .. } => {
                // At most one retry in flight per entry
                if self.slots.slot(slot).pending_timer() == Some(TimerKind::Retry) {
                    debug!(%slot, %reason, "Playback rejected, retry already pending");
                    return self.retry_outcome(slot);
                }
                self.playback_failed(state, &reason)
            }
            RotationEvent::RetryPlayback { slot, .. } => {
                self.slots.disarm_timer(slot);
                if self.failed_plays > self.settings.retry.max_retries {
                    warn!(%slot, index = state.current_index, "Skipping entry that will not play");
                    self.commit(true)
                } else if self.enter(state) {
                    debug!(%slot, attempt = self.failed_plays, "Playback resumed");
                    TransitionOutcome::Resumed { slot }
                } else {
                    self.retry_outcome(slot)
                }
            }
        }
    }

    /// Cancels all timers, detaches all listeners and releases both surfaces.
    /// Events arriving afterwards are dropped.
    pub fn teardown(&mut self) {
        self.slots.teardown();
        self.state = None;
        info!("Rotation torn down");
    }

    /// Steps 1 to 4 of a transition. Runs to completion once started.
    fn commit(&mut self, forced: bool) -> TransitionOutcome {
        let Some(mut state) = self.state else {
            return TransitionOutcome::Idle;
        };

        let previous = state.active_slot;
        state.current_index = self.playlist.next_index(state.current_index);
        state.active_slot = previous.other();
        state.generation += 1;
        self.state = Some(state);
        self.failed_plays = 0;

        let started = self.enter(state);
        self.slots.deactivate(previous);
        self.preloader.preload_or_warn(
            &self.playlist,
            state.current_index,
            &mut self.slots,
            previous,
        );

        if let Some(entry) = self.playlist.get(state.current_index) {
            info!(
                index = state.current_index,
                slot = %state.active_slot,
                %entry,
                forced,
                "Transition committed"
            );
        }

        if !started {
            return self.retry_outcome(state.active_slot);
        }
        TransitionOutcome::Advanced {
            index: state.current_index,
            active: state.active_slot,
            forced,
        }
    }

    /// Shows the current entry on the active slot: binds it if the preload
    /// did not, activates the slot and arms the dwell timer for an image.
    ///
    /// Returns false when playback failed; a retry is then already scheduled.
    fn enter(&mut self, state: PlayerState) -> bool {
        let Some(entry) = self.playlist.get(state.current_index).cloned() else {
            return true;
        };
        let slot = state.active_slot;

        let result = self
            .slots
            .attach(slot, &entry)
            .and_then(|_| self.slots.activate(slot, state.generation));

        match result {
            Ok(()) => {
                if entry.is_image() {
                    self.slots
                        .arm_timer(slot, TimerKind::Dwell, state.generation, self.settings.dwell);
                }
                true
            }
            Err(err) => {
                self.playback_failed(state, &err.to_string());
                false
            }
        }
    }

    fn playback_failed(&mut self, state: PlayerState, reason: &str) -> TransitionOutcome {
        let slot = state.active_slot;
        self.failed_plays += 1;

        if self.failed_plays <= self.settings.retry.max_retries {
            warn!(
                %slot,
                index = state.current_index,
                attempt = self.failed_plays,
                reason,
                "Playback rejected, retrying"
            );
        } else {
            warn!(
                %slot,
                index = state.current_index,
                reason,
                "Playback rejected, retries exhausted"
            );
        }

        // Both the retry and the forced advance go through the timer, so a
        // playlist of unplayable entries keeps a steady pace.
        self.slots.arm_timer(
            slot,
            TimerKind::Retry,
            state.generation,
            self.settings.retry.delay,
        );
        self.retry_outcome(slot)
    }

    fn retry_outcome(&self, slot: SlotId) -> TransitionOutcome {
        if self.failed_plays <= self.settings.retry.max_retries {
            TransitionOutcome::Retrying {
                slot,
                attempt: self.failed_plays,
            }
        } else {
            TransitionOutcome::GivingUp { slot }
        }
    }
}
