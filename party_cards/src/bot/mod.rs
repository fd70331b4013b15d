//! Autonomous players.
//!
//! Bots are ordinary session players with the bot flag set. This module
//! holds their timing configuration and the scheduler that turns it into
//! concrete delays; the moves themselves are made by the session.

pub mod models;
pub mod scheduler;

pub use models::BotTiming;
pub use scheduler::BotScheduler;
