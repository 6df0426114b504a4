mod headless;
mod logging;

use ambconfig::get_config;
use ambrotation::{AutoplayFallbackController, RotationConfigExt, Session, SessionHandle, SlotId};
use headless::{HeadlessAudio, HeadlessSurface};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Commands read from standard input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    ToggleMusic,
    Snapshot,
    LogLevel(String),
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Command> {
        let mut words = line.split_whitespace();
        match words.next()? {
            "m" => Some(Command::ToggleMusic),
            "s" => Some(Command::Snapshot),
            "l" => words.next().map(|level| Command::LogLevel(level.to_string())),
            "q" => Some(Command::Quit),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();
    let log = logging::init_logging(&config);

    info!("🎬 Starting Ambiance backdrop...");
    if !config.directory().is_empty() {
        info!("📁 Configuration directory: {}", config.directory());
    }

    // ========== Playlist ==========
    let builder = config.playlist_builder()?;
    let playlist = match config.get_shuffle_seed()? {
        Some(seed) => {
            info!(seed, "🎲 Using pinned shuffle seed");
            builder.build_seeded(seed)
        }
        None => builder.build(&mut rand::rng()),
    };
    info!("✅ Playlist ready with {} entries", playlist.len());

    // ========== Session ==========
    let settings = config.rotation_settings()?;
    let music = config.music_settings()?;
    let video_duration = Duration::from_millis(config.get_headless_video_duration_ms()?);

    let surfaces = [
        HeadlessSurface::new(SlotId::A, video_duration),
        HeadlessSurface::new(SlotId::B, video_duration),
    ];
    let controller = AutoplayFallbackController::new(HeadlessAudio::new(music.source), music.volume);
    let handle = Session::new(playlist, surfaces, controller, settings).spawn();

    info!("⌨️  Commands: m = toggle music, s = snapshot, l <level> = log level, q = quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(Command::Quit) => break,
                    Some(command) => run_command(command, &handle, &log).await,
                    None if line.trim().is_empty() => {}
                    None => warn!("Unknown command: {}", line.trim()),
                },
                Ok(None) => {
                    info!("Standard input closed, press Ctrl+C to stop");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("⚠️ Cannot read standard input: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    handle.shutdown().await?;
    info!("👋 Bye");
    Ok(())
}

async fn run_command(command: Command, handle: &SessionHandle, log: &logging::LogControl) {
    match command {
        Command::ToggleMusic => match handle.toggle_music().await {
            Ok(state) if state.muted => info!("🔇 Music muted"),
            Ok(_) => info!("🔊 Music on"),
            Err(e) => warn!("⚠️ Cannot toggle music: {}", e),
        },
        Command::Snapshot => match serde_json::to_string_pretty(&handle.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("⚠️ Cannot serialize snapshot: {}", e),
        },
        Command::LogLevel(level) => match log.set_level(&level) {
            Ok(filter) => info!("Log level set to {}", filter),
            Err(e) => warn!("⚠️ {}", e),
        },
        Command::Quit => {}
    }
}
