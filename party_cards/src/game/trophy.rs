//! End-of-game achievements and the requirement tree that grants them.
//!
//! Requirements form a closed set of variants that are dispatched through
//! [`CheckPlayer`] and read from pack files by their `"type"` tag:
//!
//! | tag               | variant            |
//! |-------------------|--------------------|
//! | `all`             | [`AllOf`]          |
//! | `any`             | [`AnyOf`]          |
//! | `card_proportion` | [`CardProportion`] |
//! | `cards_played`    | [`CardsPlayed`]    |
//! | `win_proportion`  | [`WinProportion`]  |
//! | `lost_to_bot`     | [`LostToBot`]      |

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use super::{
    entities::{CardContent, LocalizedString, PlayerId},
    player::Player,
};

/// Facts about the finished game that requirements may look at.
#[derive(Clone, Debug, Default)]
pub struct GameOutcome {
    /// Players tied on the top score.
    pub winners: Vec<PlayerId>,
    /// Whether any of the winners is a bot.
    pub bot_won: bool,
}

impl GameOutcome {
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        self.winners.contains(&player)
    }
}

#[enum_dispatch]
pub trait CheckPlayer {
    fn check_player(&self, player: &Player, outcome: &GameOutcome) -> bool;
}

#[enum_dispatch(CheckPlayer)]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    #[serde(rename = "all")]
    AllOf(AllOf),
    #[serde(rename = "any")]
    AnyOf(AnyOf),
    CardProportion(CardProportion),
    CardsPlayed(CardsPlayed),
    WinProportion(WinProportion),
    LostToBot(LostToBot),
}

/// Every sub-requirement must hold. An empty list holds vacuously.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AllOf {
    pub requirements: Vec<Requirement>,
}

impl CheckPlayer for AllOf {
    fn check_player(&self, player: &Player, outcome: &GameOutcome) -> bool {
        self.requirements
            .iter()
            .all(|req| req.check_player(player, outcome))
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AnyOf {
    pub requirements: Vec<Requirement>,
}

impl CheckPlayer for AnyOf {
    fn check_player(&self, player: &Player, outcome: &GameOutcome) -> bool {
        self.requirements
            .iter()
            .any(|req| req.check_player(player, outcome))
    }
}

const fn default_percent() -> u32 {
    50
}

const fn default_true() -> bool {
    true
}

/// Share of played cards that match any of `flags`.
///
/// The denominator is every card the player was asked to play. With
/// `winning` only cards from winning plays count towards the numerator.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CardProportion {
    pub flags: Vec<String>,
    #[serde(default)]
    pub winning: bool,
    #[serde(default = "default_percent")]
    pub percent: u32,
    #[serde(default)]
    pub maximum: bool,
}

impl CheckPlayer for CardProportion {
    fn check_player(&self, player: &Player, _outcome: &GameOutcome) -> bool {
        let mut total = 0;
        let mut eligible = 0;
        for play in player.history() {
            total += play.pick_count();
            if self.winning && !play.winning {
                continue;
            }
            eligible += play
                .white_cards
                .iter()
                .filter(|card| self.flags.iter().any(|flags| card.matches_flags(flags)))
                .count();
        }
        if total == 0 {
            return false;
        }

        let percent = (eligible * 100 / total) as u32;
        if self.maximum {
            percent <= self.percent
        } else {
            percent >= self.percent
        }
    }
}

/// All of `cards` were played, either across the whole game or together
/// in one play when `single_play` is set.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CardsPlayed {
    pub cards: Vec<String>,
    #[serde(default)]
    pub single_play: bool,
}

impl CheckPlayer for CardsPlayed {
    fn check_player(&self, player: &Player, _outcome: &GameOutcome) -> bool {
        let mut found = vec![false; self.cards.len()];
        for play in player.history() {
            for card in &play.white_cards {
                for (slot, id) in found.iter_mut().zip(&self.cards) {
                    if card.id == *id {
                        *slot = true;
                    }
                }
            }
            if self.single_play {
                if found.iter().all(|f| *f) {
                    return true;
                }
                found.fill(false);
            }
        }
        found.iter().all(|f| *f)
    }
}

/// Win rate threshold over all recorded plays.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WinProportion {
    #[serde(default = "default_percent")]
    pub percent: u32,
    #[serde(default)]
    pub maximum: bool,
    #[serde(default = "default_true")]
    pub inclusive: bool,
}

impl CheckPlayer for WinProportion {
    fn check_player(&self, player: &Player, _outcome: &GameOutcome) -> bool {
        let plays = player.history().len();
        if plays == 0 {
            return false;
        }
        let wins = player.history().iter().filter(|play| play.winning).count();
        let percent = (wins * 100 / plays) as u32;

        match (self.maximum, self.inclusive) {
            (true, true) => percent <= self.percent,
            (true, false) => percent < self.percent,
            (false, true) => percent >= self.percent,
            (false, false) => percent > self.percent,
        }
    }
}

/// A human who did not win while a bot did.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LostToBot {}

impl CheckPlayer for LostToBot {
    fn check_player(&self, player: &Player, outcome: &GameOutcome) -> bool {
        !player.is_bot() && !outcome.is_winner(player.id()) && outcome.bot_won
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Trophy {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedString,
    #[serde(default)]
    pub desc: LocalizedString,
    /// Mutual-exclusion group. Blank means the trophy stands alone.
    #[serde(rename = "trophy_class", default)]
    pub class: String,
    /// Rank within the class.
    #[serde(rename = "trophy_grade", default)]
    pub grade: i32,
    pub requirements: Vec<Requirement>,
}

impl Trophy {
    #[must_use]
    pub fn new(id: &str, class: &str, grade: i32, requirements: Vec<Requirement>) -> Self {
        Self {
            id: id.to_string(),
            name: LocalizedString::default(),
            desc: LocalizedString::default(),
            class: class.to_string(),
            grade,
            requirements,
        }
    }

    #[must_use]
    pub fn same_class(&self, other: &Trophy) -> bool {
        !self.class.trim().is_empty() && self.class.eq_ignore_ascii_case(&other.class)
    }

    #[must_use]
    pub fn is_player_eligible(&self, player: &Player, outcome: &GameOutcome) -> bool {
        self.requirements
            .iter()
            .all(|req| req.check_player(player, outcome))
    }
}
