//! Bot timing configuration.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

const DEFAULT_PLAY_MIN_BASE_DELAY: u64 = 2000;
const DEFAULT_PLAY_MAX_BASE_DELAY: u64 = 8000;
const DEFAULT_PLAY_MIN_PER_CARD_DELAY: u64 = 3000;
const DEFAULT_PLAY_MAX_PER_CARD_DELAY: u64 = 4000;
const DEFAULT_JUDGE_MIN_PER_PLAY_DELAY: u64 = 3000;
const DEFAULT_JUDGE_MAX_PER_PLAY_DELAY: u64 = 5500;
const DEFAULT_JUDGE_MIN_PER_CARD_DELAY: u64 = 2000;
const DEFAULT_JUDGE_MAX_PER_CARD_DELAY: u64 = 3000;

/// Delay ranges in milliseconds used to make bots look like people.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct BotTiming {
    pub play_min_base_delay: u64,
    pub play_max_base_delay: u64,
    pub play_min_per_card_delay: u64,
    pub play_max_per_card_delay: u64,
    pub judge_min_per_play_delay: u64,
    pub judge_max_per_play_delay: u64,
    pub judge_min_per_card_delay: u64,
    pub judge_max_per_card_delay: u64,
}

impl Default for BotTiming {
    fn default() -> Self {
        Self {
            play_min_base_delay: DEFAULT_PLAY_MIN_BASE_DELAY,
            play_max_base_delay: DEFAULT_PLAY_MAX_BASE_DELAY,
            play_min_per_card_delay: DEFAULT_PLAY_MIN_PER_CARD_DELAY,
            play_max_per_card_delay: DEFAULT_PLAY_MAX_PER_CARD_DELAY,
            judge_min_per_play_delay: DEFAULT_JUDGE_MIN_PER_PLAY_DELAY,
            judge_max_per_play_delay: DEFAULT_JUDGE_MAX_PER_PLAY_DELAY,
            judge_min_per_card_delay: DEFAULT_JUDGE_MIN_PER_CARD_DELAY,
            judge_max_per_card_delay: DEFAULT_JUDGE_MAX_PER_CARD_DELAY,
        }
    }
}

impl BotTiming {
    /// Bots that act immediately. Handy for tests and demos.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            play_min_base_delay: 0,
            play_max_base_delay: 0,
            play_min_per_card_delay: 0,
            play_max_per_card_delay: 0,
            judge_min_per_play_delay: 0,
            judge_max_per_play_delay: 0,
            judge_min_per_card_delay: 0,
            judge_max_per_card_delay: 0,
        }
    }

    pub(crate) fn play_base(&self) -> RangeInclusive<u64> {
        ordered(self.play_min_base_delay, self.play_max_base_delay)
    }

    pub(crate) fn play_per_card(&self) -> RangeInclusive<u64> {
        ordered(self.play_min_per_card_delay, self.play_max_per_card_delay)
    }

    pub(crate) fn judge_per_play(&self) -> RangeInclusive<u64> {
        ordered(self.judge_min_per_play_delay, self.judge_max_per_play_delay)
    }

    pub(crate) fn judge_per_card(&self) -> RangeInclusive<u64> {
        ordered(self.judge_min_per_card_delay, self.judge_max_per_card_delay)
    }
}

/// Config files sometimes carry min and max swapped.
fn ordered(a: u64, b: u64) -> RangeInclusive<u64> {
    a.min(b)..=a.max(b)
}
