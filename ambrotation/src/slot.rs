//! The two playback slots and the operations binding media into them.

use crate::error::{Error, Result};
use crate::events::{CompletionListener, EventSender, Generation};
use crate::media::{MediaEntry, MediaKind};
use crate::surface::MediaSurface;
use crate::timer::{PendingTimer, TimerKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Identity of a playback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub fn other(self) -> SlotId {
        match self {
            SlotId::A => SlotId::B,
            SlotId::B => SlotId::A,
        }
    }

    fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::A => f.write_str("A"),
            SlotId::B => f.write_str("B"),
        }
    }
}

/// One reusable playback unit: a surface, the entry bound to it and at most
/// one pending timer.
pub struct PlaybackSlot<S> {
    id: SlotId,
    bound: Option<MediaEntry>,
    surface: S,
    pending_timer: Option<PendingTimer>,
    visible: bool,
}

impl<S> PlaybackSlot<S> {
    fn new(id: SlotId, surface: S) -> Self {
        Self {
            id,
            bound: None,
            surface,
            pending_timer: None,
            visible: false,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn bound(&self) -> Option<&MediaEntry> {
        self.bound.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn pending_timer(&self) -> Option<TimerKind> {
        self.pending_timer.as_ref().map(PendingTimer::kind)
    }

    fn bound_kind(&self) -> Option<MediaKind> {
        self.bound.as_ref().map(|entry| entry.kind)
    }

    fn view(&self) -> SlotView {
        SlotView {
            slot: self.id,
            entry: self.bound.clone(),
            visible: self.visible,
        }
    }
}

/// What a slot shows, as exposed to the hosting page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub slot: SlotId,
    pub entry: Option<MediaEntry>,
    pub visible: bool,
}

/// Owns both slots and performs bind/activate/deactivate on them.
///
/// Visibility changes are crossfades: a slot fading in and a slot fading out
/// overlap for the whole `crossfade` duration.
pub struct SlotManager<S> {
    slots: [PlaybackSlot<S>; 2],
    crossfade: Duration,
    events: EventSender,
}

impl<S: MediaSurface> SlotManager<S> {
    pub fn new(surfaces: [S; 2], crossfade: Duration, events: EventSender) -> Self {
        let [a, b] = surfaces;
        Self {
            slots: [PlaybackSlot::new(SlotId::A, a), PlaybackSlot::new(SlotId::B, b)],
            crossfade,
            events,
        }
    }

    pub fn slot(&self, id: SlotId) -> &PlaybackSlot<S> {
        &self.slots[id.index()]
    }

    fn slot_mut(&mut self, id: SlotId) -> &mut PlaybackSlot<S> {
        &mut self.slots[id.index()]
    }

    /// Binds `entry` into the slot's surface.
    ///
    /// Returns `Ok(false)` without touching the surface when the slot already
    /// holds `entry`: rebinding would reload the media and restart it.
    pub fn attach(&mut self, id: SlotId, entry: &MediaEntry) -> Result<bool> {
        let slot = self.slot_mut(id);
        if slot.bound.as_ref() == Some(entry) {
            debug!(slot = %id, source = %entry.source, "Already bound, skipping reload");
            return Ok(false);
        }

        // Anything armed for the previous entry is meaningless now
        slot.pending_timer = None;
        if slot.bound_kind() == Some(MediaKind::Video) {
            slot.surface.clear_completion();
        }

        match slot.surface.bind(entry) {
            Ok(()) => {
                debug!(slot = %id, %entry, "Bound");
                slot.bound = Some(entry.clone());
                Ok(true)
            }
            Err(reason) => {
                slot.bound = None;
                Err(Error::surface(id, reason))
            }
        }
    }

    /// Brings the slot to the foreground and, for a video, starts playback
    /// with a completion listener tagged with `generation`.
    ///
    /// Playback is best effort: a video still buffering starts as soon as
    /// the surface has enough data. An error means the start was refused.
    pub fn activate(&mut self, id: SlotId, generation: Generation) -> Result<()> {
        let crossfade = self.crossfade;
        let events = self.events.clone();
        let slot = self.slot_mut(id);

        slot.visible = true;
        slot.surface.set_opacity(1.0, crossfade);

        if slot.bound_kind() == Some(MediaKind::Video) {
            slot.surface
                .on_completion(CompletionListener::new(id, generation, events));
            slot.surface
                .play()
                .map_err(|reason| Error::playback_rejected(id, reason))?;
        }
        Ok(())
    }

    /// Sends the slot to the background: fades it out, pauses a video and
    /// detaches its listener, cancels any pending timer.
    pub fn deactivate(&mut self, id: SlotId) {
        let crossfade = self.crossfade;
        let slot = self.slot_mut(id);

        slot.visible = false;
        slot.surface.set_opacity(0.0, crossfade);
        slot.pending_timer = None;

        if slot.bound_kind() == Some(MediaKind::Video) {
            slot.surface.pause();
            slot.surface.clear_completion();
        }
    }

    /// Hides the slot without a fade; used for the slot that starts in the
    /// background.
    pub fn hide(&mut self, id: SlotId) {
        let slot = self.slot_mut(id);
        slot.visible = false;
        slot.surface.set_opacity(0.0, Duration::ZERO);
    }

    /// Keeps an inactive video buffered but paused.
    pub fn park(&mut self, id: SlotId) {
        let slot = self.slot_mut(id);
        if slot.bound_kind() == Some(MediaKind::Video) {
            slot.surface.pause();
        }
    }

    /// Arms a timer on the slot, replacing (and cancelling) the previous one.
    pub fn arm_timer(
        &mut self,
        id: SlotId,
        kind: TimerKind,
        generation: Generation,
        after: Duration,
    ) {
        let timer = PendingTimer::arm(kind, id, generation, after, self.events.clone());
        self.slot_mut(id).pending_timer = Some(timer);
    }

    /// Forgets the slot's timer once its event has been taken in.
    pub fn disarm_timer(&mut self, id: SlotId) {
        self.slot_mut(id).pending_timer = None;
    }

    pub fn views(&self) -> [SlotView; 2] {
        [self.slots[0].view(), self.slots[1].view()]
    }

    /// Cancels every timer, detaches every listener and releases both
    /// surfaces.
    pub fn teardown(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.pending_timer = None;
            slot.surface.clear_completion();
            if slot.bound_kind() == Some(MediaKind::Video) {
                slot.surface.pause();
            }
            slot.surface.release();
            slot.visible = false;
        }
        debug!("Slots released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RotationEvent, event_channel};
    use crate::test_support::{FakeRemote, FakeSurface, SurfaceCall};

    const FADE: Duration = Duration::from_millis(1000);

    fn manager() -> (
        SlotManager<FakeSurface>,
        [FakeRemote; 2],
        crate::events::EventReceiver,
    ) {
        let (a, remote_a) = FakeSurface::new();
        let (b, remote_b) = FakeSurface::new();
        let (tx, rx) = event_channel();
        (
            SlotManager::new([a, b], FADE, tx),
            [remote_a, remote_b],
            rx,
        )
    }

    #[test]
    fn test_other_slot() {
        assert_eq!(SlotId::A.other(), SlotId::B);
        assert_eq!(SlotId::B.other(), SlotId::A);
    }

    #[test]
    fn test_rebinding_same_source_is_noop() {
        let (mut slots, [remote_a, _], _rx) = manager();
        let entry = MediaEntry::video("/v1.mp4");

        assert!(slots.attach(SlotId::A, &entry).unwrap());
        assert!(!slots.attach(SlotId::A, &entry).unwrap());

        assert_eq!(remote_a.binds(), vec!["/v1.mp4".to_string()]);
    }

    #[test]
    fn test_rebinding_other_source_reloads() {
        let (mut slots, [remote_a, _], _rx) = manager();

        slots.attach(SlotId::A, &MediaEntry::image("/1.jpg")).unwrap();
        slots.attach(SlotId::A, &MediaEntry::image("/2.jpg")).unwrap();

        assert_eq!(remote_a.binds(), vec!["/1.jpg", "/2.jpg"]);
        assert_eq!(slots.slot(SlotId::A).bound(), Some(&MediaEntry::image("/2.jpg")));
    }

    #[tokio::test]
    async fn test_activate_video_plays_and_listens() {
        let (mut slots, [remote_a, _], mut rx) = manager();
        slots.attach(SlotId::A, &MediaEntry::video("/v1.mp4")).unwrap();
        remote_a.clear();

        slots.activate(SlotId::A, 3).unwrap();

        assert_eq!(
            remote_a.calls(),
            vec![
                SurfaceCall::Opacity(1.0, FADE),
                SurfaceCall::Listen(3),
                SurfaceCall::Play
            ]
        );
        assert!(slots.slot(SlotId::A).is_visible());

        assert!(remote_a.finish());
        assert_eq!(
            rx.recv().await.unwrap(),
            RotationEvent::VideoEnded {
                slot: SlotId::A,
                generation: 3
            }
        );
    }

    #[test]
    fn test_activate_image_does_not_play() {
        let (mut slots, [remote_a, _], _rx) = manager();
        slots.attach(SlotId::A, &MediaEntry::image("/1.jpg")).unwrap();
        remote_a.clear();

        slots.activate(SlotId::A, 1).unwrap();

        assert_eq!(remote_a.calls(), vec![SurfaceCall::Opacity(1.0, FADE)]);
    }

    #[test]
    fn test_activate_reports_refused_playback() {
        let (mut slots, [remote_a, _], _rx) = manager();
        slots.attach(SlotId::A, &MediaEntry::video("/broken.mp4")).unwrap();
        remote_a.refuse_next_plays(1);

        let err = slots.activate(SlotId::A, 1).unwrap_err();
        assert!(matches!(err, Error::PlaybackRejected { slot: SlotId::A, .. }));
    }

    #[tokio::test]
    async fn test_deactivate_video_pauses_and_detaches() {
        let (mut slots, [remote_a, _], _rx) = manager();
        slots.attach(SlotId::A, &MediaEntry::video("/v1.mp4")).unwrap();
        slots.activate(SlotId::A, 1).unwrap();
        remote_a.clear();

        slots.deactivate(SlotId::A);

        assert_eq!(
            remote_a.calls(),
            vec![
                SurfaceCall::Opacity(0.0, FADE),
                SurfaceCall::Pause,
                SurfaceCall::Unlisten
            ]
        );
        assert!(!remote_a.has_listener());
        assert!(!slots.slot(SlotId::A).is_visible());
    }

    #[test]
    fn test_hide_skips_the_fade() {
        let (mut slots, [_, remote_b], _rx) = manager();
        slots.attach(SlotId::B, &MediaEntry::image("/1.jpg")).unwrap();
        remote_b.clear();

        slots.hide(SlotId::B);

        assert_eq!(remote_b.calls(), vec![SurfaceCall::Opacity(0.0, Duration::ZERO)]);
        assert!(!slots.slot(SlotId::B).is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_is_forgotten() {
        let (mut slots, _, _rx) = manager();
        slots.arm_timer(SlotId::A, TimerKind::Retry, 1, Duration::from_secs(1));
        assert_eq!(slots.slot(SlotId::A).pending_timer(), Some(TimerKind::Retry));

        slots.disarm_timer(SlotId::A);
        assert_eq!(slots.slot(SlotId::A).pending_timer(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_image_cancels_dwell_timer() {
        let (mut slots, _, mut rx) = manager();
        slots.attach(SlotId::B, &MediaEntry::image("/1.jpg")).unwrap();
        slots.activate(SlotId::B, 2).unwrap();
        slots.arm_timer(SlotId::B, TimerKind::Dwell, 2, Duration::from_millis(7000));
        assert_eq!(slots.slot(SlotId::B).pending_timer(), Some(TimerKind::Dwell));

        slots.deactivate(SlotId::B);
        assert_eq!(slots.slot(SlotId::B).pending_timer(), None);

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arming_replaces_previous_timer() {
        let (mut slots, _, mut rx) = manager();
        slots.arm_timer(SlotId::A, TimerKind::Dwell, 1, Duration::from_millis(100));
        slots.arm_timer(SlotId::A, TimerKind::Dwell, 2, Duration::from_millis(200));

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            RotationEvent::DwellExpired {
                slot: SlotId::A,
                generation: 2
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_teardown_releases_everything() {
        let (mut slots, [remote_a, remote_b], _rx) = manager();
        slots.attach(SlotId::A, &MediaEntry::video("/v1.mp4")).unwrap();
        slots.attach(SlotId::B, &MediaEntry::image("/1.jpg")).unwrap();
        slots.activate(SlotId::A, 1).unwrap();
        slots.arm_timer(SlotId::B, TimerKind::Dwell, 1, Duration::from_secs(7));

        slots.teardown();

        assert!(!remote_a.has_listener());
        assert_eq!(remote_a.count(&SurfaceCall::Release), 1);
        assert_eq!(remote_b.count(&SurfaceCall::Release), 1);
        assert_eq!(slots.slot(SlotId::B).pending_timer(), None);
        assert!(slots.views().iter().all(|view| !view.visible));
    }
}
