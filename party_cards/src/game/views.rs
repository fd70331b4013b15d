//! Serializable snapshots of a session, as seen by one player.

use serde::{Deserialize, Serialize};

use super::{
    constants::DEFAULT_LANGUAGE,
    entities::{BlackCard, CardContent, PlayerId, WhiteCard},
    player::Player,
    state_machine::{Session, Stage},
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub text: String,
}

impl From<&WhiteCard> for CardView {
    fn from(card: &WhiteCard) -> Self {
        Self {
            id: card.id.clone(),
            text: card.text(DEFAULT_LANGUAGE).to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlackCardView {
    pub id: String,
    pub text: String,
    pub pick: usize,
    pub draw: usize,
}

impl From<&BlackCard> for BlackCardView {
    fn from(card: &BlackCard) -> Self {
        Self {
            id: card.id.clone(),
            text: card.text(DEFAULT_LANGUAGE).to_string(),
            pick: card.pick,
            draw: card.draw,
        }
    }
}

/// What everyone can see about a player.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub coins: u32,
    pub afk: bool,
    pub bot: bool,
    pub judge: bool,
    pub played: bool,
    pub voted_skip: bool,
    pub trophies: Vec<String>,
}

/// What only the viewer can see about themselves.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandView {
    pub hand: Vec<CardView>,
    pub selection: Vec<CardView>,
    pub blank_cards: usize,
    pub discards: usize,
}

impl From<&Player> for HandView {
    fn from(player: &Player) -> Self {
        Self {
            hand: player.hand().iter().map(|c| CardView::from(c.as_ref())).collect(),
            selection: player
                .selection()
                .iter()
                .map(|c| CardView::from(c.as_ref()))
                .collect(),
            blank_cards: player.blank_cards(),
            discards: player.discards(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SessionView {
    pub stage: Stage,
    pub round: u32,
    pub black_card: Option<BlackCardView>,
    pub judge: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub pending: Vec<PlayerId>,
    /// Anonymous until the round is decided.
    pub plays: Vec<Vec<CardView>>,
    pub winning_play: Option<usize>,
    pub round_winner: Option<PlayerId>,
    pub you: Option<HandView>,
}

impl Session {
    /// Builds the snapshot `viewer` is allowed to see. Plays are hidden
    /// until judging starts; hands are only shown to their owner.
    #[must_use]
    pub fn view(&self, viewer: Option<PlayerId>) -> SessionView {
        let judge = self.judge().map(Player::id);
        let plays = match self.stage() {
            Stage::JudgingCards | Stage::RoundEnd => self
                .round_plays()
                .iter()
                .map(|play| play.cards.iter().map(|c| CardView::from(c.as_ref())).collect())
                .collect(),
            _ => Vec::new(),
        };
        let round_winner = match self.stage() {
            Stage::RoundEnd => self.round_winner(),
            _ => None,
        };

        SessionView {
            stage: self.stage(),
            round: self.round(),
            black_card: self.current_black_card().map(|c| BlackCardView::from(c.as_ref())),
            judge,
            players: self
                .players()
                .iter()
                .map(|p| PlayerView {
                    id: p.id(),
                    name: p.name().to_string(),
                    score: p.score(),
                    coins: p.coins(),
                    afk: p.is_afk(),
                    bot: p.is_bot(),
                    judge: Some(p.id()) == judge,
                    played: !p.selection().is_empty(),
                    voted_skip: p.voted_skip(),
                    trophies: p.trophies().iter().map(|t| t.id.clone()).collect(),
                })
                .collect(),
            pending: self.pending_players(),
            plays,
            winning_play: round_winner.and(self.winning_play_index()),
            round_winner,
            you: viewer.and_then(|id| self.player(id)).map(HandView::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{packs::Pack, settings::GameSettings};

    fn session() -> (Session, Vec<PlayerId>) {
        let mut pack = Pack::new("view", "View");
        for i in 0..40 {
            pack.add_white(WhiteCard::new(&format!("w_{i}"), &format!("answer {i}")));
        }
        pack.add_black(BlackCard::new("b_0", "Why ____?", 1, 0));
        let mut session = Session::new(&[pack], GameSettings::default());
        let ids = ["ann", "ben", "cat"]
            .iter()
            .map(|name| session.create_player(Some(name), false, None).unwrap())
            .collect();
        (session, ids)
    }

    #[test]
    fn hands_are_private() {
        let (session, ids) = session();
        let view = session.view(Some(ids[0]));
        assert_eq!(view.you.unwrap().hand.len(), 10);
        assert_eq!(view.players.len(), 3);
        assert!(session.view(None).you.is_none());
        assert_eq!(view.black_card.unwrap().text, "Why ____?");
    }

    #[test]
    fn plays_show_once_judging_starts() {
        let (mut session, _) = session();
        let judge = session.judge().unwrap().id();
        let players: Vec<(PlayerId, String)> = session
            .players()
            .iter()
            .filter(|p| p.id() != judge)
            .map(|p| (p.id(), p.hand()[0].id.clone()))
            .collect();

        session.play_cards(players[0].0, &[players[0].1.clone()]).unwrap();
        let view = session.view(None);
        assert!(view.plays.is_empty());
        assert_eq!(view.pending, vec![players[1].0]);

        session.play_cards(players[1].0, &[players[1].1.clone()]).unwrap();
        let view = session.view(None);
        assert_eq!(view.stage, Stage::JudgingCards);
        assert_eq!(view.plays.len(), 2);
        assert_eq!(view.round_winner, None);
    }
}
