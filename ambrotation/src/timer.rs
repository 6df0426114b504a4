//! One-shot timers posting rotation events.

use crate::events::{EventSender, Generation, RotationEvent};
use crate::slot::SlotId;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Image dwell, fires `DwellExpired`.
    Dwell,
    /// Delayed playback retry, fires `RetryPlayback`.
    Retry,
}

/// A timer armed for a slot.
///
/// Dropping the timer cancels it, so a slot that loses its timer (replaced,
/// cleared, or torn down with the session) can never fire a late event.
#[derive(Debug)]
pub struct PendingTimer {
    kind: TimerKind,
    handle: JoinHandle<()>,
}

impl PendingTimer {
    /// Spawns the timer on the current tokio runtime.
    pub fn arm(
        kind: TimerKind,
        slot: SlotId,
        generation: Generation,
        after: Duration,
        events: EventSender,
    ) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let event = match kind {
                TimerKind::Dwell => RotationEvent::DwellExpired { slot, generation },
                TimerKind::Retry => RotationEvent::RetryPlayback { slot, generation },
            };
            if events.send(event).is_err() {
                trace!(%slot, ?kind, "Timer fired after session teardown");
            }
        });

        Self { kind, handle }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn cancel(self) {
        // Drop does the work
    }
}

impl Drop for PendingTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    #[tokio::test(start_paused = true)]
    async fn test_dwell_timer_fires_after_duration() {
        let (tx, mut rx) = event_channel();
        let _timer = PendingTimer::arm(
            TimerKind::Dwell,
            SlotId::B,
            4,
            Duration::from_millis(7000),
            tx,
        );
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(6999)).await;
        assert!(rx.try_recv().is_err());

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            RotationEvent::DwellExpired {
                slot: SlotId::B,
                generation: 4
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_timer_never_fires() {
        let (tx, mut rx) = event_channel();
        let timer = PendingTimer::arm(
            TimerKind::Retry,
            SlotId::A,
            1,
            Duration::from_millis(500),
            tx,
        );
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
