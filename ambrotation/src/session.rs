//! Session: the event loop owning the rotation, next to the music task.
//!
//! Timer expirations and completion callbacks are serialized through the
//! rotation task, so a transition always runs to completion before the next
//! event is looked at. The music controller runs in a task of its own: a
//! track that takes its time to start or to answer a toggle never holds
//! back the rotation.

use crate::autoplay::{AudioTrack, AutoplayFallbackController, MusicState};
use crate::error::{Error, Result};
use crate::events::{EventReceiver, event_channel};
use crate::playlist::Playlist;
use crate::scheduler::{RotationSettings, TransitionScheduler};
use crate::slot::{SlotId, SlotView};
use crate::surface::MediaSurface;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// What the backdrop shows, published after every handled event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackdropSnapshot {
    pub slots: [SlotView; 2],
    pub active_slot: Option<SlotId>,
    pub current_index: Option<usize>,
    pub music: MusicState,
}

impl BackdropSnapshot {
    fn blank() -> Self {
        Self {
            slots: [
                SlotView {
                    slot: SlotId::A,
                    entry: None,
                    visible: false,
                },
                SlotView {
                    slot: SlotId::B,
                    entry: None,
                    visible: false,
                },
            ],
            active_slot: None,
            current_index: None,
            music: MusicState {
                muted: true,
                playing: false,
            },
        }
    }

    fn of<S: MediaSurface>(scheduler: &TransitionScheduler<S>, music: MusicState) -> Self {
        let state = scheduler.state();
        Self {
            slots: scheduler.slots().views(),
            active_slot: state.map(|s| s.active_slot),
            current_index: state.map(|s| s.current_index),
            music,
        }
    }
}

#[derive(Debug)]
pub enum SessionCommand {
    /// Flip the music mute state; the reply carries the resulting state.
    ToggleMusic(oneshot::Sender<MusicState>),
}

pub struct Session<S, T> {
    scheduler: TransitionScheduler<S>,
    music: AutoplayFallbackController<T>,
    events: EventReceiver,
}

impl<S, T> Session<S, T>
where
    S: MediaSurface + 'static,
    T: AudioTrack + 'static,
{
    pub fn new(
        playlist: Playlist,
        surfaces: [S; 2],
        music: AutoplayFallbackController<T>,
        settings: RotationSettings,
    ) -> Self {
        let (tx, rx) = event_channel();
        Self {
            scheduler: TransitionScheduler::new(playlist, surfaces, settings, tx),
            music,
            events: rx,
        }
    }

    /// Runs the session on the current tokio runtime.
    ///
    /// The session stops on [`SessionHandle::shutdown`] or when the handle
    /// is dropped.
    pub fn spawn(self) -> SessionHandle {
        let cancel = CancellationToken::new();
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (music_tx, music_rx) = watch::channel(self.music.state());
        let (snapshots_tx, snapshots_rx) = watch::channel(BackdropSnapshot::blank());

        let Session {
            scheduler,
            music,
            events,
        } = self;

        let music_task = tokio::spawn(run_music(music, commands_rx, music_tx, cancel.clone()));
        let rotation_task = tokio::spawn(run_rotation(
            scheduler,
            events,
            music_rx,
            snapshots_tx,
            cancel.clone(),
        ));

        SessionHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            rotation_task,
            music_task,
        }
    }
}

async fn run_rotation<S: MediaSurface>(
    mut scheduler: TransitionScheduler<S>,
    mut events: EventReceiver,
    mut music: watch::Receiver<MusicState>,
    snapshots: watch::Sender<BackdropSnapshot>,
    cancel: CancellationToken,
) {
    info!(entries = scheduler.playlist().len(), "🚀 Session starting");

    scheduler.start();
    snapshots.send_replace(BackdropSnapshot::of(&scheduler, *music.borrow()));

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Some(event) = events.recv() => {
                let outcome = scheduler.handle(event);
                debug!(?outcome, "Event handled");
            }

            Ok(()) = music.changed() => {}
        }
        snapshots.send_replace(BackdropSnapshot::of(&scheduler, *music.borrow()));
    }

    scheduler.teardown();
    snapshots.send_replace(BackdropSnapshot::of(&scheduler, *music.borrow()));
    info!("🛑 Session closed");
}

async fn run_music<T: AudioTrack>(
    mut controller: AutoplayFallbackController<T>,
    mut commands: mpsc::Receiver<SessionCommand>,
    states: watch::Sender<MusicState>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Session closed before autoplay settled");
            return;
        }
        outcome = controller.start() => outcome,
    };
    debug!(?outcome, "Autoplay settled");
    states.send_replace(controller.state());

    loop {
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(SessionCommand::ToggleMusic(reply)) => reply,
                None => {
                    debug!("Session handle dropped");
                    break;
                }
            },
        };

        let state = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            state = controller.toggle() => state,
        };
        states.send_replace(state);
        let _ = reply.send(state);
    }
}

/// Control handle of a running [`Session`].
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<BackdropSnapshot>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
    rotation_task: JoinHandle<()>,
    music_task: JoinHandle<()>,
}

impl SessionHandle {
    /// Latest published snapshot.
    pub fn snapshot(&self) -> BackdropSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn changes(&self) -> watch::Receiver<BackdropSnapshot> {
        self.snapshots.clone()
    }

    pub fn music_state(&self) -> MusicState {
        self.snapshots.borrow().music
    }

    /// User sound toggle. Resolves once the track answered.
    pub async fn toggle_music(&self) -> Result<MusicState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::ToggleMusic(reply_tx))
            .await
            .map_err(|_| Error::SessionClosed)?;
        reply_rx.await.map_err(|_| Error::SessionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.rotation_task.is_finished()
    }

    /// Stops the session: cancels every timer, detaches every listener,
    /// releases both surfaces and waits for both tasks to exit. A pending
    /// music start or toggle is abandoned.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        let rotation = self.rotation_task.await;
        let music = self.music_task.await;
        rotation
            .and(music)
            .map_err(|err| Error::Other(anyhow::anyhow!("Session task failed: {}", err)))
    }
}
