//! Headless backend: surfaces and audio track that only log what a real
//! player would do, with simulated video durations.

use ambrotation::{AudioError, AudioTrack, CompletionListener, MediaEntry, MediaSurface, SlotId};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

type SharedListener = Arc<Mutex<Option<CompletionListener>>>;

/// Surface simulating playback: a bound video "ends" after the configured
/// duration of actual play time.
pub struct HeadlessSurface {
    slot: SlotId,
    video_duration: Duration,
    bound: Option<MediaEntry>,
    listener: SharedListener,
    playback: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
    remaining: Duration,
}

impl HeadlessSurface {
    pub fn new(slot: SlotId, video_duration: Duration) -> Self {
        Self {
            slot,
            video_duration,
            bound: None,
            listener: Arc::new(Mutex::new(None)),
            playback: None,
            started_at: None,
            remaining: video_duration,
        }
    }

    fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn stop(&mut self) {
        if let Some(handle) = self.playback.take() {
            handle.abort();
        }
        if let Some(started_at) = self.started_at.take() {
            self.remaining = self.remaining.saturating_sub(started_at.elapsed());
        }
    }

    fn set_listener(&self, listener: Option<CompletionListener>) {
        if let Ok(mut slot) = self.listener.lock() {
            *slot = listener;
        }
    }
}

impl MediaSurface for HeadlessSurface {
    fn bind(&mut self, entry: &MediaEntry) -> Result<(), String> {
        self.stop();
        self.remaining = self.video_duration;
        info!(slot = %self.slot, %entry, "📼 Bound");
        self.bound = Some(entry.clone());
        Ok(())
    }

    fn play(&mut self) -> Result<(), String> {
        let Some(entry) = &self.bound else {
            return Err("nothing bound".to_string());
        };
        if !entry.is_video() || self.is_playing() {
            return Ok(());
        }

        // Restart a video that already reached its end
        if self.remaining.is_zero() {
            self.remaining = self.video_duration;
        }

        let remaining = self.remaining;
        let listener = self.listener.clone();
        let slot = self.slot;
        self.started_at = Some(Instant::now());
        self.playback = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let current = listener.lock().ok().and_then(|guard| guard.clone());
            match current {
                Some(listener) => listener.ended(),
                None => trace!(%slot, "Video ended without listener"),
            }
        }));

        debug!(slot = %self.slot, source = %entry.source, ?remaining, "▶️ Playing");
        Ok(())
    }

    fn pause(&mut self) {
        if self.is_playing() {
            debug!(slot = %self.slot, "⏸️ Paused");
        }
        self.stop();
    }

    fn set_opacity(&mut self, opacity: f32, fade: Duration) {
        debug!(slot = %self.slot, opacity, ?fade, "Fading");
    }

    fn on_completion(&mut self, listener: CompletionListener) {
        self.set_listener(Some(listener));
    }

    fn clear_completion(&mut self) {
        self.set_listener(None);
    }

    fn release(&mut self) {
        self.stop();
        self.bound = None;
        debug!(slot = %self.slot, "Released");
    }
}

/// Audio track that always honors playback.
pub struct HeadlessAudio {
    source: String,
    muted: bool,
    paused: bool,
}

impl HeadlessAudio {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            muted: false,
            paused: true,
        }
    }
}

#[async_trait]
impl AudioTrack for HeadlessAudio {
    async fn play(&mut self) -> Result<(), AudioError> {
        self.paused = false;
        debug!(source = %self.source, muted = self.muted, "Music playing");
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_volume(&mut self, volume: f32) {
        debug!(volume, "Music volume");
    }
}
