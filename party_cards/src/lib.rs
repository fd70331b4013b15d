//! # Party Cards
//!
//! Session engine for a fill-in-the-blank party card game played over a LAN.
//!
//! Each round one player judges while the others answer a black prompt card
//! with white cards from their hands. The judge picks a favourite, its owner
//! scores, and the game runs until someone reaches the point limit or the
//! round limit is hit. Trophies are handed out at the end of every game.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, pack loading, players, trophies and the [`Session`]
//!   state machine
//! - [`bot`]: Timing for simulated players
//! - [`room`]: Tokio actor that hosts a session and runs its timers
//!
//! ## Example
//!
//! ```
//! use party_cards::{BlackCard, GameSettings, Pack, Session, Stage, WhiteCard};
//!
//! let mut pack = Pack::new("base", "Base");
//! for i in 0..40 {
//!     pack.add_white(WhiteCard::new(&format!("w_{i}"), "an answer"));
//! }
//! pack.add_black(BlackCard::new("b_0", "What's that smell? ____", 1, 0));
//!
//! let mut session = Session::new(&[pack], GameSettings::default());
//! for name in ["ann", "ben", "cat"] {
//!     session.create_player(Some(name), false, None).unwrap();
//! }
//! assert_eq!(session.stage(), Stage::RoundInProgress);
//! ```

/// Simulated players.
pub mod bot;
pub use bot::{BotScheduler, BotTiming};

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    BlackCard, Card, GameSettings, Pack, Player, PlayerId, Session, SessionEvent, Stage, UserError,
    WhiteCard,
    constants::{self, MIN_PLAYERS},
    entities,
};

/// Async room hosting.
pub mod room;
