//! Per-player state: hand, selection, awards and history.

use std::{fmt, mem, sync::Arc};

use super::{
    entities::{BlackCard, PlayerId, RoundPlay, WhiteCard},
    trophy::Trophy,
};

#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    token: String,
    name: String,
    hand: Vec<Arc<WhiteCard>>,
    selection: Vec<Arc<WhiteCard>>,
    blank_cards: usize,
    discards: usize,
    score: u32,
    coins: u32,
    afk: bool,
    asshole: bool,
    bot: bool,
    skip_vote: bool,
    trophies: Vec<Arc<Trophy>>,
    history: Vec<RoundPlay>,
    /// Outstanding simulated play delays. Only the last one to finish acts.
    pending_plays: u32,
    /// Outstanding simulated judging delays.
    pending_judgements: u32,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, token: String, name: String, bot: bool) -> Self {
        Self {
            id,
            token,
            name,
            hand: Vec::new(),
            selection: Vec::new(),
            blank_cards: 0,
            discards: 0,
            score: 0,
            coins: 0,
            afk: false,
            asshole: false,
            bot,
            skip_vote: false,
            trophies: Vec::new(),
            history: Vec::new(),
            pending_plays: 0,
            pending_judgements: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    #[must_use]
    pub fn hand(&self) -> &[Arc<WhiteCard>] {
        &self.hand
    }

    #[must_use]
    pub fn selection(&self) -> &[Arc<WhiteCard>] {
        &self.selection
    }

    #[must_use]
    pub fn blank_cards(&self) -> usize {
        self.blank_cards
    }

    #[must_use]
    pub fn discards(&self) -> usize {
        self.discards
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn coins(&self) -> u32 {
        self.coins
    }

    #[must_use]
    pub fn is_afk(&self) -> bool {
        self.afk
    }

    #[must_use]
    pub fn is_asshole(&self) -> bool {
        self.asshole
    }

    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.bot
    }

    #[must_use]
    pub fn voted_skip(&self) -> bool {
        self.skip_vote
    }

    #[must_use]
    pub fn trophies(&self) -> &[Arc<Trophy>] {
        &self.trophies
    }

    #[must_use]
    pub fn history(&self) -> &[RoundPlay] {
        &self.history
    }

    pub(crate) fn set_afk(&mut self, afk: bool) -> bool {
        mem::replace(&mut self.afk, afk) != afk
    }

    pub(crate) fn set_asshole(&mut self, asshole: bool) -> bool {
        mem::replace(&mut self.asshole, asshole) != asshole
    }

    pub(crate) fn set_skip_vote(&mut self, vote: bool) {
        self.skip_vote = vote;
    }

    /// New cards go in front of the hand.
    pub(crate) fn add_to_hand(&mut self, cards: Vec<Arc<WhiteCard>>) {
        self.hand.splice(0..0, cards);
    }

    #[must_use]
    pub fn has_card(&self, id: &str) -> bool {
        self.hand.iter().any(|card| card.id == id)
    }

    #[must_use]
    pub fn holds_card(&self, id: &str) -> bool {
        self.has_card(id) || self.selection.iter().any(|card| card.id == id)
    }

    pub(crate) fn remove_from_hand(&mut self, id: &str) -> Option<Arc<WhiteCard>> {
        let pos = self.hand.iter().position(|card| card.id == id)?;
        Some(self.hand.remove(pos))
    }

    /// Swaps a hand card for another in the same position.
    pub(crate) fn replace_in_hand(
        &mut self,
        id: &str,
        card: Arc<WhiteCard>,
    ) -> Option<Arc<WhiteCard>> {
        let slot = self.hand.iter_mut().find(|held| held.id == id)?;
        Some(mem::replace(slot, card))
    }

    pub(crate) fn take_hand(&mut self) -> Vec<Arc<WhiteCard>> {
        mem::take(&mut self.hand)
    }

    pub(crate) fn take_selection(&mut self) -> Vec<Arc<WhiteCard>> {
        mem::take(&mut self.selection)
    }

    pub(crate) fn set_selection(&mut self, cards: Vec<Arc<WhiteCard>>) {
        self.selection = cards;
    }

    /// A selection is valid when it holds exactly as many cards as the
    /// prompt asks for.
    #[must_use]
    pub fn is_selection_valid(&self, black_card: Option<&BlackCard>) -> bool {
        black_card.is_some_and(|card| {
            card.pick > 0 && !self.selection.is_empty() && self.selection.len() == card.pick
        })
    }

    pub(crate) fn set_blank_cards(&mut self, n: usize) {
        self.blank_cards = n;
    }

    pub(crate) fn spend_blank_cards(&mut self, n: usize) -> bool {
        if self.blank_cards < n {
            return false;
        }
        self.blank_cards -= n;
        true
    }

    pub(crate) fn set_discards(&mut self, n: usize) {
        self.discards = n;
    }

    pub(crate) fn spend_discard(&mut self) -> bool {
        if self.discards == 0 {
            return false;
        }
        self.discards -= 1;
        true
    }

    pub(crate) fn add_points(&mut self, points: u32) {
        self.score += points;
    }

    pub(crate) fn add_coins(&mut self, coins: u32) {
        self.coins += coins;
    }

    pub(crate) fn spend_coins(&mut self, coins: u32) -> bool {
        if coins > self.coins {
            return false;
        }
        self.coins -= coins;
        true
    }

    /// Gives the player a trophy unless they already hold an equal or
    /// better one of the same class. Weaker trophies of that class are
    /// dropped.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the trophy was added
    pub fn award_trophy(&mut self, trophy: Arc<Trophy>) -> bool {
        if self.trophies.iter().any(|held| {
            held.id == trophy.id || (held.same_class(&trophy) && held.grade >= trophy.grade)
        }) {
            return false;
        }
        self.trophies
            .retain(|held| !(held.same_class(&trophy) && held.grade < trophy.grade));
        self.trophies.push(trophy);
        true
    }

    pub(crate) fn save_play(&mut self, black_card: Arc<BlackCard>, cards: Vec<Arc<WhiteCard>>, winning: bool) {
        self.history.push(RoundPlay {
            black_card,
            white_cards: cards,
            winning,
        });
    }

    /// Clears score, coins and trophies.
    pub(crate) fn reset_awards(&mut self) {
        self.score = 0;
        self.coins = 0;
        self.trophies.clear();
    }

    pub(crate) fn clear_history(&mut self) {
        self.history.clear();
    }

    pub(crate) fn begin_play_delay(&mut self) {
        self.pending_plays += 1;
    }

    /// # Returns
    ///
    /// * `bool` - Whether this was the last outstanding play delay
    pub(crate) fn finish_play_delay(&mut self) -> bool {
        self.pending_plays = self.pending_plays.saturating_sub(1);
        self.pending_plays == 0
    }

    pub(crate) fn begin_judge_delay(&mut self) {
        self.pending_judgements += 1;
    }

    pub(crate) fn finish_judge_delay(&mut self) -> bool {
        self.pending_judgements = self.pending_judgements.saturating_sub(1);
        self.pending_judgements == 0
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::trophy::Trophy;

    fn player() -> Player {
        Player::new(1, "token".to_string(), "Alice".to_string(), false)
    }

    fn trophy(id: &str, class: &str, grade: i32) -> Arc<Trophy> {
        Arc::new(Trophy::new(id, class, grade, vec![]))
    }

    fn cards(ids: &[&str]) -> Vec<Arc<WhiteCard>> {
        ids.iter().map(|id| Arc::new(WhiteCard::new(id, "x"))).collect()
    }

    #[test]
    fn new_cards_go_to_the_front() {
        let mut p = player();
        p.add_to_hand(cards(&["w_a", "w_b"]));
        p.add_to_hand(cards(&["w_c"]));
        let ids: Vec<_> = p.hand().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["w_c", "w_a", "w_b"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut p = player();
        p.add_to_hand(cards(&["w_a", "w_b", "w_c"]));
        let old = p.replace_in_hand("w_b", Arc::new(WhiteCard::new("w_b2", "x")));
        assert_eq!(old.map(|c| c.id.clone()), Some("w_b".to_string()));
        assert_eq!(p.hand()[1].id, "w_b2");
        assert!(p.replace_in_hand("w_zz", Arc::new(WhiteCard::new("w_q", "x"))).is_none());
    }

    #[test]
    fn selection_validity_tracks_pick_count() {
        let mut p = player();
        let prompt = BlackCard::new("b_1", "?", 2, 0);
        assert!(!p.is_selection_valid(Some(&prompt)));
        p.set_selection(cards(&["w_a"]));
        assert!(!p.is_selection_valid(Some(&prompt)));
        p.set_selection(cards(&["w_a", "w_b"]));
        assert!(p.is_selection_valid(Some(&prompt)));
        assert!(!p.is_selection_valid(None));
    }

    #[test]
    fn higher_grade_supersedes_lower() {
        let mut p = player();
        assert!(p.award_trophy(trophy("x1", "X", 1)));
        assert!(p.award_trophy(trophy("x2", "X", 2)));
        let ids: Vec<_> = p.trophies().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["x2"]);
    }

    #[test]
    fn lower_grade_is_rejected() {
        let mut p = player();
        assert!(p.award_trophy(trophy("x2", "X", 2)));
        assert!(!p.award_trophy(trophy("x1", "X", 1)));
        let ids: Vec<_> = p.trophies().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["x2"]);
    }

    #[test]
    fn class_comparison_ignores_case_and_blank_classes() {
        let mut p = player();
        assert!(p.award_trophy(trophy("x1", "x", 1)));
        assert!(!p.award_trophy(trophy("x0", "X", 0)));
        assert!(p.award_trophy(trophy("a", "", 5)));
        assert!(p.award_trophy(trophy("b", "", 1)));
        assert!(!p.award_trophy(trophy("b", "", 1)));
        assert_eq!(p.trophies().len(), 3);
    }

    #[test]
    fn spending_is_bounded() {
        let mut p = player();
        p.add_coins(2);
        assert!(!p.spend_coins(3));
        assert!(p.spend_coins(2));
        assert_eq!(p.coins(), 0);

        p.set_discards(1);
        assert!(p.spend_discard());
        assert!(!p.spend_discard());

        p.set_blank_cards(1);
        assert!(!p.spend_blank_cards(2));
        assert!(p.spend_blank_cards(1));
    }

    #[test]
    fn only_the_last_delay_acts() {
        let mut p = player();
        p.begin_play_delay();
        p.begin_play_delay();
        assert!(!p.finish_play_delay());
        assert!(p.finish_play_delay());
        assert!(p.finish_play_delay());

        p.begin_judge_delay();
        assert!(p.finish_judge_delay());
    }
}
