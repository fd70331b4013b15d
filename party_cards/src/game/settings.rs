//! Session configuration.

use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use thiserror::Error;

use super::{
    constants::{MIN_GAME_END_TIMEOUT_MS, MIN_HAND_SIZE, MIN_PLAYERS},
    judge::JudgeSelector,
};
use crate::bot::BotTiming;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("can't read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Game rules and limits for one session.
///
/// Every field is optional in the JSON form; missing fields take their
/// defaults and out-of-range values are clamped by [`GameSettings::clamped`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GameSettings {
    pub min_players: usize,
    pub max_players: usize,
    pub hand_size: usize,
    /// Custom cards each player may write per game.
    pub blank_cards: usize,
    pub discards: usize,
    pub max_points: u32,
    /// Zero means no round limit.
    pub max_rounds: u32,
    /// Milliseconds between a judgement and the next round.
    pub round_end_timeout: u64,
    /// Milliseconds between the end of a game and the next one.
    pub game_end_timeout: u64,
    pub perma_czar: bool,
    pub bot_czars: bool,
    pub winner_czar: bool,
    pub bot_count: usize,
    pub bot_names: Vec<String>,
    pub bot_config: BotTiming,
    /// Flag expressions; matching cards are left out of the pool.
    pub exclude_content: Vec<String>,
    /// Languages every pooled card must support.
    pub require_languages: Vec<String>,
    /// When non-empty, only these packs are loaded.
    pub use_packs: Vec<String>,
    pub exclude_packs: Vec<String>,
    pub enable_upgrades: bool,
    pub allow_skips: bool,
    pub pick_one_only: bool,
    pub max_blank_card_length: usize,
    pub max_player_name_length: usize,
    pub enable_player_preserve: bool,
    /// Seconds a disconnected player is held for.
    pub player_preserve_time: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: 10,
            hand_size: 10,
            blank_cards: 0,
            discards: 5,
            max_points: 10,
            max_rounds: 16,
            round_end_timeout: 10_000,
            game_end_timeout: 30_000,
            perma_czar: false,
            bot_czars: true,
            winner_czar: false,
            bot_count: 0,
            bot_names: Vec::new(),
            bot_config: BotTiming::default(),
            exclude_content: Vec::new(),
            require_languages: Vec::new(),
            use_packs: Vec::new(),
            exclude_packs: Vec::new(),
            enable_upgrades: true,
            allow_skips: true,
            pick_one_only: false,
            max_blank_card_length: 140,
            max_player_name_length: 48,
            enable_player_preserve: true,
            player_preserve_time: 30,
        }
    }
}

impl GameSettings {
    /// Reads settings from a JSON file, clamps them, and validates the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or parsed, or if the
    /// settings contradict each other.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// # Errors
    ///
    /// Returns an error on malformed JSON or contradictory settings.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(text)?;
        let settings = settings.clamped();
        settings.validate()?;
        Ok(settings)
    }

    /// Raises fields that are below their minimums.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.min_players = self.min_players.max(MIN_PLAYERS);
        self.max_players = self.max_players.max(MIN_PLAYERS);
        self.hand_size = self.hand_size.max(MIN_HAND_SIZE);
        self.max_points = self.max_points.max(1);
        self.game_end_timeout = self.game_end_timeout.max(MIN_GAME_END_TIMEOUT_MS);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the settings contradict each other.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.min_players > self.max_players {
            return Err(SettingsError::Invalid {
                field: "min_players",
                reason: format!("must not exceed max_players ({})", self.max_players),
            });
        }
        if self.bot_count > self.max_players {
            return Err(SettingsError::Invalid {
                field: "bot_count",
                reason: format!("must not exceed max_players ({})", self.max_players),
            });
        }
        if self.max_player_name_length == 0 {
            return Err(SettingsError::Invalid {
                field: "max_player_name_length",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn round_end_timeout(&self) -> Duration {
        Duration::from_millis(self.round_end_timeout)
    }

    #[must_use]
    pub fn game_end_timeout(&self) -> Duration {
        Duration::from_millis(self.game_end_timeout)
    }

    #[must_use]
    pub fn judge_selector(&self) -> JudgeSelector {
        JudgeSelector {
            permanent_czar: self.perma_czar,
            allow_bot_czars: self.bot_czars,
            winner_czar: self.winner_czar,
        }
    }
}
