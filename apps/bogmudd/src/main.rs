//! bogmudd: the bogmud telnet server.
//!
//! Loads a world file (or the built-in demo world), compiles the command
//! set, and serves each telnet connection as one player session.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bogcmd::Registry;
use bogworld::{builtin_commands, load_world, Scheduler, World};
use tokio::net::TcpListener;
use tracing::{info, warn, Level};

mod behaviors;
mod session;

const DEFAULT_WORLD: &str = include_str!("../world/default.yaml");

fn usage_and_exit() -> ! {
    eprintln!(
        "bogmudd\n\n\
USAGE:\n  bogmudd [--bind HOST:PORT] [--world FILE] [--start-room HANDLE]\n\n\
ENV:\n  BOGMUD_BIND            default 127.0.0.1:4000\n  BOGMUD_WORLD           world file path (default: built-in demo world)\n  BOGMUD_START_ROOM      override the world file's start_room\n  BOGMUD_COOLDOWN_MS     pause between commands, default 500\n  BOGMUD_MAILBOX         per-player mailbox capacity, default 64\n"
    );
    std::process::exit(2);
}

#[derive(Clone, Debug)]
struct Config {
    bind: SocketAddr,
    world_path: Option<PathBuf>,
    start_room: Option<String>,
    cooldown: Duration,
    mailbox: usize,
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("BOGMUD_BIND")
        .unwrap_or_else(|_| "127.0.0.1:4000".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let mut world_path: Option<PathBuf> = std::env::var("BOGMUD_WORLD").ok().map(PathBuf::from);
    let mut start_room: Option<String> = std::env::var("BOGMUD_START_ROOM").ok();
    let cooldown_ms: u64 = std::env::var("BOGMUD_COOLDOWN_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(500);
    let mailbox: usize = std::env::var("BOGMUD_MAILBOX")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(64)
        .max(1);

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--world" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                world_path = Some(PathBuf::from(v));
            }
            "--start-room" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                start_room = Some(v);
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }

    Config {
        bind,
        world_path,
        start_room,
        cooldown: Duration::from_millis(cooldown_ms),
        mailbox,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bogmudd=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();

    let text = match &cfg.world_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read world file {}", path.display()))?,
        None => DEFAULT_WORLD.to_string(),
    };

    let loaded = load_world(&text, &behaviors::standard())?;
    for warning in &loaded.warnings {
        warn!(warning = %warning, "world file");
    }

    let mut commands = builtin_commands();
    commands.extend(loaded.commands.clone());
    let registry = Registry::new(&commands)?;

    let start_room = cfg
        .start_room
        .clone()
        .unwrap_or_else(|| loaded.start_room.clone());
    let world = World::new(loaded.entities, &start_room, registry, Scheduler::start())?;
    world.init();
    info!(start_room = %start_room, commands = commands.len(), "world up");

    let listener = TcpListener::bind(cfg.bind).await?;
    info!(bind = %cfg.bind, "bogmudd listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!(peer = %peer, "client connected");
        let world = Arc::clone(&world);
        let cfg = cfg.clone();
        tokio::spawn(async move {
            if let Err(e) = session::run(stream, world, cfg.cooldown, cfg.mailbox).await {
                warn!(peer = %peer, err = %e, "session ended with error");
            }
            info!(peer = %peer, "client disconnected");
        });
    }
}
