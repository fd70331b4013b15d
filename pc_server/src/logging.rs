//! Structured logging configuration.
//!
//! Library crates log through the `log` facade; those records are bridged
//! into the same `tracing` subscriber as the server's own spans and events.

use party_cards::SessionEvent;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var and default to `info`.
///
/// # Example
///
/// ```no_run
/// logging::init();
/// tracing::info!("Server starting");
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a session event with structured fields
///
/// # Arguments
///
/// * `event` - Event drained from the room
pub fn log_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::PlayerJoined { player, name } => {
            tracing::info!(event = "player_joined", player, name = name.as_str(), "{event}");
        }
        SessionEvent::PlayerLeft { player, reason } => {
            tracing::info!(event = "player_left", player, reason = reason.as_str(), "{event}");
        }
        SessionEvent::RoundStarted {
            round,
            black_card,
            judge,
        } => {
            tracing::info!(
                event = "round_started",
                round,
                black_card = black_card.as_str(),
                judge = ?judge,
                "{event}"
            );
        }
        SessionEvent::RoundEnded {
            round,
            winner,
            winning_play,
            ..
        } => {
            tracing::info!(
                event = "round_ended",
                round,
                winner = ?winner,
                winning_play = ?winning_play,
                "{event}"
            );
        }
        SessionEvent::GameEnded { winners } => {
            tracing::info!(event = "game_ended", winners = ?winners, "{event}");
        }
        SessionEvent::TrophyAwarded { player, trophy } => {
            tracing::info!(event = "trophy_awarded", player, trophy = trophy.as_str(), "{event}");
        }
        SessionEvent::PlayersChanged | SessionEvent::GameStateChanged => {
            tracing::trace!("{event}");
        }
        other => {
            tracing::debug!("{other}");
        }
    }
}
