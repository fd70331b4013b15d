//! Card game engine: cards, packs, players and the session state machine.

pub mod constants;
pub mod deck;
pub mod entities;
pub mod events;
pub mod judge;
pub mod packs;
pub mod player;
pub mod settings;
pub mod state_machine;
pub mod token;
pub mod trophy;
pub mod views;

pub use entities::{BlackCard, Card, CardContent, LocalizedString, PlayerId, RoundPlay, Submission, WhiteCard};
pub use events::{BotAction, Effect, SessionEvent};
pub use packs::{CardPool, Pack, PackError, PackInfo, load_pack_file, load_packs_dir};
pub use player::Player;
pub use settings::{GameSettings, SettingsError};
pub use state_machine::{CardCensus, Session, SessionInfo, Stage, UserError};
pub use trophy::{GameOutcome, Requirement, Trophy};
pub use views::{BlackCardView, CardView, HandView, PlayerView, SessionView};
