//! Czar rotation policy.

use rand::Rng;

use super::player::Player;

/// Judge rotation flags taken from the session settings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct JudgeSelector {
    /// Keep one judge until they go away.
    pub permanent_czar: bool,
    /// Bots may judge.
    pub allow_bot_czars: bool,
    /// The previous round's winner judges next.
    pub winner_czar: bool,
}

impl JudgeSelector {
    fn is_candidate(&self, player: &Player) -> bool {
        !player.is_afk() && (self.allow_bot_czars || !player.is_bot())
    }

    /// Picks the index of the next judge.
    ///
    /// # Arguments
    ///
    /// * `players` - Seated players in order
    /// * `current` - Index of the current judge, if any
    /// * `last_winner` - Index of the previous round's winner, if still seated
    /// * `rng` - Randomness for punishment rotation and permanent czars
    ///
    /// # Returns
    ///
    /// * `Option<usize>` - `None` only when nobody is seated
    pub fn next_judge<R: Rng + ?Sized>(
        &self,
        players: &[Player],
        current: Option<usize>,
        last_winner: Option<usize>,
        rng: &mut R,
    ) -> Option<usize> {
        let n = players.len();
        if n == 0 {
            return None;
        }
        let current = current.filter(|i| *i < n);

        if self.permanent_czar {
            if let Some(judge) = current
                && !players[judge].is_afk()
            {
                return Some(judge);
            }
            let offset = rng.random_range(0..n);
            return (0..n)
                .map(|i| (i + offset) % n)
                .find(|i| self.is_candidate(&players[*i]))
                .or_else(|| Some(rng.random_range(0..n)));
        }

        // Punishment rotation.
        let assholes: Vec<usize> = (0..n)
            .filter(|i| players[*i].is_asshole() && !players[*i].is_afk())
            .collect();
        if !assholes.is_empty() && rng.random_bool(0.5) {
            return Some(assholes[rng.random_range(0..assholes.len())]);
        }

        if self.winner_czar
            && let Some(winner) = last_winner.filter(|i| *i < n)
            && !players[winner].is_afk()
            && (self.allow_bot_czars || !players[winner].is_bot())
        {
            return Some(winner);
        }

        let (start, offsets) = match current {
            Some(judge) => (judge, 1..n),
            None => (0, 0..n),
        };
        offsets
            .map(|i| (start + i) % n)
            .find(|i| self.is_candidate(&players[*i]))
            .or_else(|| Some(current.map_or(0, |judge| (judge + 1) % n)))
    }
}
