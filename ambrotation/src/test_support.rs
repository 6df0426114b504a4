//! Recording surface and scripted audio track used by the unit tests.

use crate::autoplay::AudioTrack;
use crate::error::AudioError;
use crate::events::CompletionListener;
use crate::media::MediaEntry;
use crate::surface::MediaSurface;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Bind(String),
    Play,
    Pause,
    Opacity(f32, Duration),
    Listen(u64),
    Unlisten,
    Release,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<SurfaceCall>,
    listener: Option<CompletionListener>,
    refuse_plays: u32,
}

/// Surface that records every call; the paired [`FakeRemote`] inspects it and
/// plays the backend's part (ending videos, refusing playback).
#[derive(Debug, Clone, Default)]
pub struct FakeSurface {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug, Clone)]
pub struct FakeRemote {
    shared: Arc<Mutex<Shared>>,
}

impl FakeSurface {
    pub fn new() -> (Self, FakeRemote) {
        let surface = Self::default();
        let remote = FakeRemote {
            shared: surface.shared.clone(),
        };
        (surface, remote)
    }

    fn record(&self, call: SurfaceCall) {
        self.shared.lock().unwrap().calls.push(call);
    }
}

impl MediaSurface for FakeSurface {
    fn bind(&mut self, entry: &MediaEntry) -> Result<(), String> {
        self.record(SurfaceCall::Bind(entry.source.clone()));
        Ok(())
    }

    fn play(&mut self) -> Result<(), String> {
        self.record(SurfaceCall::Play);
        let mut shared = self.shared.lock().unwrap();
        if shared.refuse_plays > 0 {
            shared.refuse_plays -= 1;
            return Err("decode error".to_string());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.record(SurfaceCall::Pause);
    }

    fn set_opacity(&mut self, opacity: f32, fade: Duration) {
        self.record(SurfaceCall::Opacity(opacity, fade));
    }

    fn on_completion(&mut self, listener: CompletionListener) {
        self.record(SurfaceCall::Listen(listener.generation()));
        self.shared.lock().unwrap().listener = Some(listener);
    }

    fn clear_completion(&mut self) {
        self.record(SurfaceCall::Unlisten);
        self.shared.lock().unwrap().listener = None;
    }

    fn release(&mut self) {
        self.record(SurfaceCall::Release);
    }
}

impl FakeRemote {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    pub fn binds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Bind(source) => Some(source),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &SurfaceCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.shared.lock().unwrap().calls.clear();
    }

    /// Ends the bound video through the registered listener.
    /// Returns false when no listener is attached.
    pub fn finish(&self) -> bool {
        let listener = self.shared.lock().unwrap().listener.clone();
        match listener {
            Some(listener) => {
                listener.ended();
                true
            }
            None => false,
        }
    }

    pub fn refuse_next_plays(&self, count: u32) {
        self.shared.lock().unwrap().refuse_plays = count;
    }

    pub fn has_listener(&self) -> bool {
        self.shared.lock().unwrap().listener.is_some()
    }

    /// Opacity changes with their fade, in call order.
    pub fn fades(&self) -> Vec<(f32, Duration)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Opacity(opacity, fade) => Some((opacity, fade)),
                _ => None,
            })
            .collect()
    }
}

/// Track answering `play()` from a script; an exhausted script accepts,
/// or never answers at all for a stalling track.
#[derive(Debug, Default)]
pub struct ScriptedTrack {
    answers: VecDeque<Result<(), AudioError>>,
    stall_when_exhausted: bool,
    muted: bool,
    paused: bool,
    volume: f32,
    plays: Vec<bool>,
}

impl ScriptedTrack {
    pub fn new(answers: Vec<Result<(), AudioError>>) -> Self {
        Self {
            answers: answers.into(),
            paused: true,
            ..Default::default()
        }
    }

    pub fn stalling(answers: Vec<Result<(), AudioError>>) -> Self {
        Self {
            stall_when_exhausted: true,
            ..Self::new(answers)
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Muted flag at each `play()` call.
    pub fn plays(&self) -> Vec<bool> {
        self.plays.clone()
    }
}

#[async_trait]
impl AudioTrack for ScriptedTrack {
    async fn play(&mut self) -> Result<(), AudioError> {
        self.plays.push(self.muted);
        if self.answers.is_empty() && self.stall_when_exhausted {
            std::future::pending::<()>().await;
        }
        let answer = self.answers.pop_front().unwrap_or(Ok(()));
        if answer.is_ok() {
            self.paused = false;
        }
        answer
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
        self.volume = volume;
    }
}
