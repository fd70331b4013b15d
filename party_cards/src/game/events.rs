//! What the session tells the outside world.

use serde::Serialize;
use std::{fmt, time::Duration};

use super::{entities::PlayerId, state_machine::Stage};

/// Notifications raised by session operations, in the order they happened.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SessionEvent {
    PlayerJoined {
        player: PlayerId,
        name: String,
    },
    PlayerLeft {
        player: PlayerId,
        reason: String,
    },
    /// A disconnected player is being held for reconnection.
    PlayerPreserved {
        player: PlayerId,
    },
    PlayerRestored {
        player: PlayerId,
    },
    /// Someone joined, left, or had their visible state changed.
    PlayersChanged,
    GameStateChanged,
    RoundStarted {
        round: u32,
        black_card: String,
        judge: Option<PlayerId>,
    },
    StageChanged {
        old: Stage,
        new: Stage,
    },
    RoundEnded {
        round: u32,
        black_card: String,
        judge: Option<PlayerId>,
        winner: Option<PlayerId>,
        winning_play: Vec<String>,
    },
    GameEnded {
        winners: Vec<PlayerId>,
    },
    BlackCardSkipped {
        old: String,
        new: String,
    },
    TrophyAwarded {
        player: PlayerId,
        trophy: String,
    },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerJoined { player, name } => write!(f, "{name} (#{player}) joined"),
            Self::PlayerLeft { player, reason } => write!(f, "#{player} left ({reason})"),
            Self::PlayerPreserved { player } => write!(f, "holding #{player} for reconnect"),
            Self::PlayerRestored { player } => write!(f, "#{player} reconnected"),
            Self::PlayersChanged => write!(f, "players changed"),
            Self::GameStateChanged => write!(f, "game state changed"),
            Self::RoundStarted {
                round,
                black_card,
                judge,
            } => match judge {
                Some(judge) => write!(f, "round {round} started with {black_card}, #{judge} judging"),
                None => write!(f, "round {round} started with {black_card}"),
            },
            Self::StageChanged { old, new } => write!(f, "stage {old} -> {new}"),
            Self::RoundEnded { round, winner, .. } => match winner {
                Some(winner) => write!(f, "round {round} won by #{winner}"),
                None => write!(f, "round {round} ended without a winner"),
            },
            Self::GameEnded { winners } => {
                let winners: Vec<String> = winners.iter().map(|id| format!("#{id}")).collect();
                write!(f, "game won by {}", winners.join(", "))
            }
            Self::BlackCardSkipped { old, new } => write!(f, "skipped {old} for {new}"),
            Self::TrophyAwarded { player, trophy } => write!(f, "#{player} earned {trophy}"),
        }
    }
}

/// Which kind of bot move a timer is for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum BotAction {
    Play,
    Judge,
}

/// Timers the session wants its host to run.
///
/// Each carries the round or game number it was scheduled in. When it
/// fires, the host hands that number back, and the session ignores it if
/// play has moved on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    RoundEndTimeout {
        round: u32,
        after: Duration,
    },
    GameEndTimeout {
        game: u32,
        after: Duration,
    },
    BotDelay {
        player: PlayerId,
        action: BotAction,
        after: Duration,
    },
}
