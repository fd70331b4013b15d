//! White-card piles and the black-card cycle.

use rand::Rng;
use std::sync::Arc;

use super::{
    constants::SHUFFLE_PASSES,
    entities::{BlackCard, WhiteCard},
    player::Player,
};

/// Shuffles in place with repeated forced swaps.
///
/// Every pass visits each position `j` and swaps it with
/// `(r + j + 1) % n` for `r` drawn from `[0, n - 2]`, so a position is
/// never swapped with itself.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    let n = items.len();
    if n < 2 {
        return;
    }
    for _ in 0..SHUFFLE_PASSES {
        for j in 0..n {
            let s = (rng.random_range(0..n - 1) + j + 1) % n;
            items.swap(j, s);
        }
    }
}

/// Card pools plus the draw and discard piles built from them.
///
/// The white pool is the set of cards in circulation. Every pool card is
/// always in exactly one place: the draw pile, the discard pile, or some
/// player's hand or selection. Custom cards are never pooled.
#[derive(Debug)]
pub struct Deck {
    white_cards: Vec<Arc<WhiteCard>>,
    black_cards: Vec<Arc<BlackCard>>,
    draw_pile: Vec<Arc<WhiteCard>>,
    discard_pile: Vec<Arc<WhiteCard>>,
    black_index: usize,
    pick_one_only: bool,
}

impl Deck {
    #[must_use]
    pub fn new(
        white_cards: Vec<Arc<WhiteCard>>,
        black_cards: Vec<Arc<BlackCard>>,
        pick_one_only: bool,
    ) -> Self {
        let mut deck = Self {
            white_cards,
            black_cards,
            draw_pile: Vec::new(),
            discard_pile: Vec::new(),
            black_index: 0,
            pick_one_only,
        };
        deck.reset();
        deck
    }

    /// Puts the whole white pool back into a freshly shuffled draw pile and
    /// reshuffles the black cards. Callers must have emptied every hand.
    pub fn reset(&mut self) {
        let mut rng = rand::rng();
        self.draw_pile.clear();
        self.draw_pile.extend(self.white_cards.iter().cloned());
        shuffle(&mut self.draw_pile, &mut rng);
        shuffle(&mut self.black_cards, &mut rng);
        self.discard_pile.clear();
        self.black_index = 0;
    }

    /// Draws up to `n` cards from the top of the draw pile.
    ///
    /// An empty draw pile is refilled from the shuffled discard pile. If
    /// both are empty the result is short.
    pub fn draw(&mut self, n: usize) -> Vec<Arc<WhiteCard>> {
        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            if self.draw_pile.is_empty() {
                self.draw_pile.append(&mut self.discard_pile);
                shuffle(&mut self.draw_pile, &mut rand::rng());
            }
            match self.draw_pile.pop() {
                Some(card) => drawn.push(card),
                None => {
                    log::warn!(
                        "white card pool exhausted, dealt {} of {} cards",
                        drawn.len(),
                        n
                    );
                    break;
                }
            }
        }
        drawn
    }

    /// Tops a player's hand up to `hand_size + extra`. Never takes cards away.
    pub fn deal_to(&mut self, player: &mut Player, hand_size: usize, extra: usize) {
        let wanted = (hand_size + extra).saturating_sub(player.hand().len());
        if wanted > 0 {
            let cards = self.draw(wanted);
            player.add_to_hand(cards);
        }
    }

    /// Returns cards to the discard pile. Custom cards simply vanish.
    pub fn discard<I>(&mut self, cards: I)
    where
        I: IntoIterator<Item = Arc<WhiteCard>>,
    {
        self.discard_pile
            .extend(cards.into_iter().filter(|card| !card.custom));
    }

    /// Pulls a specific card out of the draw or discard pile.
    pub fn take(&mut self, id: &str) -> Option<Arc<WhiteCard>> {
        for pile in [&mut self.draw_pile, &mut self.discard_pile] {
            if let Some(pos) = pile.iter().position(|card| card.id == id) {
                return Some(pile.remove(pos));
            }
        }
        None
    }

    /// Moves the cursor to the next black card.
    ///
    /// Running off the end reshuffles the black cards and starts over. With
    /// `pick_one_only` the cursor keeps stepping until it lands on a pick-1
    /// card. The scan is capped so that it covers at most one full pass of
    /// the list after a reshuffle; if that finds nothing the cursor stays
    /// where it stopped.
    pub fn advance_black_card(&mut self) {
        if self.black_cards.is_empty() {
            return;
        }
        self.step_black_card();
        if !self.pick_one_only {
            return;
        }

        let limit = 2 * self.black_cards.len();
        let mut steps = 0;
        while self.black_cards[self.black_index].pick != 1 {
            if steps == limit {
                log::warn!("no pick-1 black card found, keeping the current prompt");
                return;
            }
            self.step_black_card();
            steps += 1;
        }
    }

    fn step_black_card(&mut self) {
        self.black_index += 1;
        if self.black_index >= self.black_cards.len() {
            shuffle(&mut self.black_cards, &mut rand::rng());
            self.black_index = 0;
        }
    }

    #[must_use]
    pub fn current_black_card(&self) -> Option<&Arc<BlackCard>> {
        self.black_cards.get(self.black_index)
    }

    #[must_use]
    pub fn white_cards(&self) -> &[Arc<WhiteCard>] {
        &self.white_cards
    }

    #[must_use]
    pub fn black_cards(&self) -> &[Arc<BlackCard>] {
        &self.black_cards
    }

    #[must_use]
    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    #[must_use]
    pub fn discard_pile_len(&self) -> usize {
        self.discard_pile.len()
    }

    #[must_use]
    pub fn contains_in_piles(&self, id: &str) -> bool {
        self.draw_pile
            .iter()
            .chain(self.discard_pile.iter())
            .any(|card| card.id == id)
    }
}
