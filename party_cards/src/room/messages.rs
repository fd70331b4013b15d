//! Room actor message types.

use tokio::sync::{mpsc, oneshot};

use crate::game::{
    BotAction, Card, PlayerId, SessionEvent, SessionInfo, SessionView, UserError,
};

/// Messages that can be sent to a [`RoomActor`](super::RoomActor).
#[derive(Debug)]
pub enum RoomMessage {
    /// Seat a player, or reattach a held one by token
    Join {
        name: Option<String>,
        token: Option<String>,
        bot: bool,
        response: oneshot::Sender<RoomResponse>,
    },

    Leave {
        player: PlayerId,
        reason: String,
        /// Hold the player for reconnection if the session allows it
        preserve: bool,
        response: oneshot::Sender<RoomResponse>,
    },

    PlayCards {
        player: PlayerId,
        cards: Vec<String>,
        response: oneshot::Sender<RoomResponse>,
    },

    JudgeCards {
        player: PlayerId,
        index: usize,
        response: oneshot::Sender<RoomResponse>,
    },

    VoteSkip {
        player: PlayerId,
        vote: bool,
        response: oneshot::Sender<RoomResponse>,
    },

    DiscardCard {
        player: PlayerId,
        card: String,
        response: oneshot::Sender<RoomResponse>,
    },

    UpgradeCard {
        player: PlayerId,
        card: String,
        response: oneshot::Sender<RoomResponse>,
    },

    SetAfk {
        player: PlayerId,
        afk: bool,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Moderation flag for content violations
    SetAsshole {
        player: PlayerId,
        flagged: bool,
        response: oneshot::Sender<RoomResponse>,
    },

    Rename {
        player: PlayerId,
        name: String,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Snapshot as seen by `player`, or by an observer
    GetState {
        player: Option<PlayerId>,
        response: oneshot::Sender<SessionView>,
    },

    GetInfo {
        response: oneshot::Sender<SessionInfo>,
    },

    /// Card lookup, custom card ids included
    CardById {
        id: String,
        response: oneshot::Sender<Option<Card>>,
    },

    /// Subscribe to session events. A subscriber bound to a player is
    /// dropped when that player leaves.
    Subscribe {
        subscriber: u64,
        player: Option<PlayerId>,
        sender: mpsc::Sender<SessionEvent>,
    },

    Unsubscribe { subscriber: u64 },

    /// Internal: the round-end pause for `round` is over
    RoundEndElapsed { round: u32 },

    /// Internal: the game-end pause for `game` is over
    GameEndElapsed { game: u32 },

    /// Internal: a bot's simulated thinking time is over
    BotDelayElapsed { player: PlayerId, action: BotAction },

    Close {
        response: oneshot::Sender<RoomResponse>,
    },
}

/// Response from room operations
#[derive(Clone, Debug, PartialEq)]
pub enum RoomResponse {
    Success,

    Joined { player: PlayerId, token: String },

    Renamed(String),

    /// Whether the player was seated
    Left(bool),

    /// The session refused the action and nothing changed
    Rejected(UserError),
}

impl RoomResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Rejected(_) | Self::Left(false))
    }

    #[must_use]
    pub fn error(&self) -> Option<&UserError> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Result<(), UserError>> for RoomResponse {
    fn from(result: Result<(), UserError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Rejected(e),
        }
    }
}
