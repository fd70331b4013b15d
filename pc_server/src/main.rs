//! Party card game host process.
//!
//! Loads packs and settings, runs one session inside a room actor, and logs
//! every session event until interrupted. A transport layer attaches to the
//! room through its [`RoomHandle`](party_cards::room::RoomHandle).

mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Error};
use ctrlc::set_handler;
use log::info;
use party_cards::{
    Session,
    game::load_packs_dir,
    room::RoomActor,
};
use pico_args::Arguments;
use tokio::sync::mpsc;

use config::ServerConfig;

const HELP: &str = "\
Host a party card game session

USAGE:
  pc_server [OPTIONS]

OPTIONS:
  --settings   PATH        Game settings JSON file     [default: env PC_SETTINGS or built-in defaults]
  --packs      DIR         Directory of card packs     [default: env PC_PACKS_DIR or ./packs]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  PC_SETTINGS              Game settings JSON file
  PC_PACKS_DIR             Directory searched recursively for *.json packs
  PC_EVENT_BUFFER          Events buffered for the event log [default: 256]
  RUST_LOG                 Log filter [default: info]
";

/// Subscriber id of the server's own event log.
const EVENT_LOG_SUBSCRIBER: u64 = 0;

struct Args {
    settings: Option<PathBuf>,
    packs: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        settings: pargs.opt_value_from_str("--settings")?,
        packs: pargs.opt_value_from_str("--packs")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.settings, args.packs);
    config.validate()?;

    let settings = config
        .load_settings()
        .context("failed to load game settings")?;
    let packs = load_packs_dir(&config.packs_dir)?;
    if packs.is_empty() {
        log::warn!("no packs found under {}", config.packs_dir.display());
    }

    let session = Session::new(&packs, settings);
    let session_info = session.info();
    info!(
        "Loaded {} black and {} white cards, {} trophies",
        session_info.black_cards, session_info.white_cards, session_info.trophies
    );
    for pack in &session_info.packs {
        info!(
            "  - {} [{}]: {} black, {} white",
            pack.name, pack.id, pack.black_cards, pack.white_cards
        );
    }
    info!(
        "Players {}-{}, {} points to win, {} bots",
        session_info.settings.min_players,
        session_info.settings.max_players,
        session_info.settings.max_points,
        session_info.settings.bot_count
    );

    let (room, room_task) = RoomActor::spawn(session);
    let mut events = room
        .subscribe(EVENT_LOG_SUBSCRIBER, None, config.event_buffer)
        .await?;

    // Catching signals for exit.
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel();
    set_handler(move || {
        let _ = shutdown_tx.send(());
    })?;

    info!("Session is running. Press Ctrl+C to stop.");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => logging::log_session_event(&event),
                None => break,
            },
            _ = shutdown_rx.recv() => {
                info!("Shutting down...");
                room.close().await?;
                break;
            }
        }
    }

    room_task.await?;
    info!("Session closed");

    Ok(())
}
