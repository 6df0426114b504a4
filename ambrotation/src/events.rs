//! Events driving the rotation.
//!
//! Every event carries the slot it was raised for and the activation
//! generation that was live when its source (timer or completion listener)
//! was armed. The scheduler compares both against its live state and drops
//! anything that no longer matches.

use crate::slot::SlotId;
use tokio::sync::mpsc;
use tracing::trace;

/// Activation counter, incremented on every committed transition.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationEvent {
    /// The slot's video reached its natural end.
    VideoEnded { slot: SlotId, generation: Generation },
    /// The slot's image stayed on screen for the dwell duration.
    DwellExpired { slot: SlotId, generation: Generation },
    /// The slot's video failed to start or decode.
    PlaybackRejected {
        slot: SlotId,
        generation: Generation,
        reason: String,
    },
    /// Time to try starting the slot's video again.
    RetryPlayback { slot: SlotId, generation: Generation },
}

impl RotationEvent {
    pub fn slot(&self) -> SlotId {
        match self {
            RotationEvent::VideoEnded { slot, .. }
            | RotationEvent::DwellExpired { slot, .. }
            | RotationEvent::PlaybackRejected { slot, .. }
            | RotationEvent::RetryPlayback { slot, .. } => *slot,
        }
    }

    pub fn generation(&self) -> Generation {
        match self {
            RotationEvent::VideoEnded { generation, .. }
            | RotationEvent::DwellExpired { generation, .. }
            | RotationEvent::PlaybackRejected { generation, .. }
            | RotationEvent::RetryPlayback { generation, .. } => *generation,
        }
    }
}

/// Sending half of the session event queue.
pub type EventSender = mpsc::UnboundedSender<RotationEvent>;

/// Receiving half of the session event queue.
pub type EventReceiver = mpsc::UnboundedReceiver<RotationEvent>;

/// Creates the session event queue.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Completion callback handed to a [`MediaSurface`](crate::surface::MediaSurface)
/// when one of its videos becomes active.
///
/// The surface calls [`ended`](Self::ended) when the video finishes playing
/// naturally and [`rejected`](Self::rejected) when it cannot start. Both only
/// enqueue an event; a listener that outlived its activation produces events
/// the scheduler discards.
#[derive(Debug, Clone)]
pub struct CompletionListener {
    slot: SlotId,
    generation: Generation,
    events: EventSender,
}

impl CompletionListener {
    pub fn new(slot: SlotId, generation: Generation, events: EventSender) -> Self {
        Self {
            slot,
            generation,
            events,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn ended(&self) {
        self.post(RotationEvent::VideoEnded {
            slot: self.slot,
            generation: self.generation,
        });
    }

    pub fn rejected(&self, reason: impl Into<String>) {
        self.post(RotationEvent::PlaybackRejected {
            slot: self.slot,
            generation: self.generation,
            reason: reason.into(),
        });
    }

    fn post(&self, event: RotationEvent) {
        // The session may already be torn down
        if self.events.send(event).is_err() {
            trace!(slot = %self.slot, "Completion after session teardown, dropped");
        }
    }
}
