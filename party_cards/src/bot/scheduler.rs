//! Simulated thinking time for bots.

use rand::Rng;
use std::{ops::RangeInclusive, time::Duration};

use super::models::BotTiming;

/// Computes how long a bot waits before acting.
///
/// The session asks for a delay whenever a bot is prompted, hands the
/// resulting timer to its host, and performs the bot's move when the last
/// outstanding timer for that bot fires.
#[derive(Clone, Debug, Default)]
pub struct BotScheduler {
    timing: BotTiming,
}

impl BotScheduler {
    #[must_use]
    pub fn new(timing: BotTiming) -> Self {
        Self { timing }
    }

    #[must_use]
    pub fn timing(&self) -> &BotTiming {
        &self.timing
    }

    /// A random base delay plus a per-card delay for each of `cards`.
    pub fn play_delay<R: Rng + ?Sized>(&self, cards: usize, rng: &mut R) -> Duration {
        let base = sample(self.timing.play_base(), 1, rng);
        let per_card = sample(self.timing.play_per_card(), cards, rng);
        Duration::from_millis(base + per_card)
    }

    /// Time to read `plays` plays of `cards_per_play` cards each.
    pub fn judge_delay<R: Rng + ?Sized>(
        &self,
        cards_per_play: usize,
        plays: usize,
        rng: &mut R,
    ) -> Duration {
        let per_card = sample(self.timing.judge_per_card(), cards_per_play, rng);
        let per_play = sample(self.timing.judge_per_play(), plays, rng);
        Duration::from_millis(per_card + per_play)
    }
}

/// Draws from `[min * n, max * n]`.
fn sample<R: Rng + ?Sized>(range: RangeInclusive<u64>, n: usize, rng: &mut R) -> u64 {
    let n = n as u64;
    let (min, max) = (range.start() * n, range.end() * n);
    if min == max {
        return min;
    }
    rng.random_range(min..=max)
}
