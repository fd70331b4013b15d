//! The session: players, piles and the round lifecycle.
//!
//! A [`Session`] is plain synchronous state. Every operation takes
//! `&mut self`, so whoever owns it (normally a
//! [`RoomActor`](crate::room::RoomActor)) serializes all access. Operations
//! queue [`SessionEvent`]s for listeners and [`Effect`]s for the host to
//! schedule; both are collected with the `drain_*` methods.
//!
//! Stages advance as
//! `GameStarting -> RoundInProgress -> JudgingCards -> RoundEnd`, then
//! either back to `RoundInProgress` or on to `GameEnd`, which returns to
//! `GameStarting` after a timeout.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
};
use thiserror::Error;

use super::{
    constants::{DEFAULT_BOT_NAME, DEFAULT_PLAYER_NAME, NAME_CHAR_EXCEPTIONS},
    deck::{Deck, shuffle},
    entities::{BlackCard, Card, PlayerId, Submission, WhiteCard},
    events::{BotAction, Effect, SessionEvent},
    judge::JudgeSelector,
    packs::{CardPool, Pack, PackInfo},
    player::Player,
    settings::GameSettings,
    token::TokenGenerator,
    trophy::GameOutcome,
};
use crate::bot::BotScheduler;

/// Errors for player actions that aren't allowed right now. The session is
/// left untouched whenever one is returned.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum UserError {
    #[error("room is full")]
    CapacityReached,
    #[error("player does not exist")]
    PlayerDoesNotExist,
    #[error("not allowed while {stage}")]
    WrongStage { stage: Stage },
    #[error("the judge doesn't play cards")]
    JudgeCannotPlay,
    #[error("already played this round")]
    AlreadyPlayed,
    #[error("not the judge")]
    NotJudge,
    #[error("need exactly {expected} cards")]
    WrongCardCount { expected: usize },
    #[error("{0} isn't in your hand")]
    CardNotOwned(String),
    #[error("{0} selected twice")]
    DuplicateCard(String),
    #[error("no blank cards left")]
    NoBlankCards,
    #[error("invalid custom card")]
    InvalidCustomCard,
    #[error("no play #{0}")]
    InvalidPlayIndex(usize),
    #[error("black card skips are disabled")]
    SkipsDisabled,
    #[error("bots don't vote")]
    BotCannotVote,
    #[error("vote unchanged")]
    VoteUnchanged,
    #[error("no discards left")]
    NoDiscardsLeft,
    #[error("upgrades are disabled")]
    UpgradesDisabled,
    #[error("{0} can't be upgraded")]
    NoUpgrade(String),
    #[error("{0} isn't available")]
    UpgradeUnavailable(String),
    #[error("need {required} coins")]
    InsufficientCoins { required: u32 },
    #[error("no black card in play")]
    NoBlackCard,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Stage {
    #[default]
    GameStarting,
    RoundInProgress,
    JudgingCards,
    RoundEnd,
    GameEnd,
}

impl Stage {
    /// A game is underway and disconnecting players are worth holding.
    #[must_use]
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::RoundInProgress | Self::JudgingCards | Self::RoundEnd
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::GameStarting => "game starting",
            Self::RoundInProgress => "round in progress",
            Self::JudgingCards => "judging cards",
            Self::RoundEnd => "round end",
            Self::GameEnd => "game end",
        };
        write!(f, "{repr}")
    }
}

/// Where every white card in circulation currently is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CardCensus {
    pub draw_pile: usize,
    pub discard_pile: usize,
    /// Pool cards in hands and selections, preserved players included.
    pub held: usize,
    /// Size of the white pool.
    pub total: usize,
}

impl CardCensus {
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.draw_pile + self.discard_pile + self.held == self.total
    }
}

/// Summary for the host's startup banner.
#[derive(Clone, Debug, Serialize)]
pub struct SessionInfo {
    pub black_cards: usize,
    pub white_cards: usize,
    pub trophies: usize,
    pub packs: Vec<PackInfo>,
    pub settings: GameSettings,
}

#[derive(Debug)]
struct Preserved {
    player: Player,
    remaining_secs: u32,
}

pub struct Session {
    settings: GameSettings,
    pool: CardPool,
    deck: Deck,
    judges: JudgeSelector,
    bots: BotScheduler,
    tokens: TokenGenerator,
    players: Vec<Player>,
    /// Disconnected players held for reconnection, keyed by token.
    preserved: HashMap<String, Preserved>,
    judge: Option<usize>,
    last_winner: Option<PlayerId>,
    round: u32,
    /// Bumped on every reset so stale game-end timers can be told apart.
    game: u32,
    stage: Stage,
    round_plays: Vec<Submission>,
    winning_play: Option<usize>,
    next_player_id: PlayerId,
    events: VecDeque<SessionEvent>,
    effects: VecDeque<Effect>,
    disposed: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("stage", &self.stage)
            .field("round", &self.round)
            .field("game", &self.game)
            .field("players", &self.players.len())
            .field("preserved", &self.preserved.len())
            .field("judge", &self.judge)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Builds a session from the given packs and seats any configured bots.
    #[must_use]
    pub fn new(packs: &[Pack], settings: GameSettings) -> Self {
        let pool = CardPool::build(packs, &settings);
        let deck = Deck::new(
            pool.white_cards().to_vec(),
            pool.black_cards().to_vec(),
            settings.pick_one_only,
        );
        log::info!(
            "session ready with {} black cards, {} white cards and {} trophies from {} packs",
            pool.black_cards().len(),
            pool.white_cards().len(),
            pool.trophies().len(),
            pool.packs().len()
        );

        let mut session = Self {
            judges: settings.judge_selector(),
            bots: BotScheduler::new(settings.bot_config.clone()),
            settings,
            pool,
            deck,
            tokens: TokenGenerator::new(),
            players: Vec::new(),
            preserved: HashMap::new(),
            judge: None,
            last_winner: None,
            round: 0,
            game: 0,
            stage: Stage::GameStarting,
            round_plays: Vec::new(),
            winning_play: None,
            next_player_id: 0,
            events: VecDeque::new(),
            effects: VecDeque::new(),
            disposed: false,
        };

        for i in 0..session.settings.bot_count {
            let name = match session.settings.bot_names.as_slice() {
                [] => DEFAULT_BOT_NAME.to_string(),
                names => names[i % names.len()].clone(),
            };
            if let Err(e) = session.create_player(Some(&name), true, None) {
                log::warn!("couldn't seat bot {name}: {e}");
            }
        }
        session
    }

    fn ensure_live(&self) {
        assert!(!self.disposed, "session used after dispose");
    }

    /// Tears the session down. Any later use is a bug and panics.
    ///
    /// # Panics
    ///
    /// Panics if the session was already disposed.
    pub fn dispose(&mut self) {
        assert!(!self.disposed, "session disposed twice");
        self.disposed = true;
        self.tokens.dispose();
        log::info!("session disposed");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn drain_events(&mut self) -> VecDeque<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_effects(&mut self) -> VecDeque<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn position(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id() == id)
    }

    fn index_of(&self, id: PlayerId) -> Result<usize, UserError> {
        self.position(id).ok_or(UserError::PlayerDoesNotExist)
    }

    fn black_card(&self) -> Option<Arc<BlackCard>> {
        self.deck.current_black_card().cloned()
    }

    fn judge_id(&self) -> Option<PlayerId> {
        self.judge.map(|i| self.players[i].id())
    }

    fn all_players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players
            .iter_mut()
            .chain(self.preserved.values_mut().map(|entry| &mut entry.player))
    }

    fn choose_judge(&mut self) {
        let last_winner = self.last_winner.and_then(|id| self.position(id));
        self.judge = self
            .judges
            .next_judge(&self.players, self.judge, last_winner, &mut rand::rng());
    }

    fn set_stage(&mut self, stage: Stage) {
        let old = std::mem::replace(&mut self.stage, stage);
        log::debug!("stage {old} -> {stage}");
        self.events
            .push_back(SessionEvent::StageChanged { old, new: stage });
        self.events.push_back(SessionEvent::GameStateChanged);
    }

    fn clean_name(&self, requested: Option<&str>, bot: bool, exclude: Option<PlayerId>) -> String {
        let cleaned: String = requested
            .unwrap_or_default()
            .trim()
            .chars()
            .filter(|c| !c.is_control() && (c.is_alphanumeric() || NAME_CHAR_EXCEPTIONS.contains(c)))
            .take(self.settings.max_player_name_length)
            .collect();
        let cleaned = match cleaned.trim() {
            "" if bot => DEFAULT_BOT_NAME,
            "" => DEFAULT_PLAYER_NAME,
            name => name,
        };

        let taken = |name: &str| {
            self.players
                .iter()
                .any(|p| Some(p.id()) != exclude && p.name() == name)
        };
        let mut name = cleaned.to_string();
        let mut suffix = 2;
        while taken(&name) {
            name = format!("{cleaned} {suffix}");
            suffix += 1;
        }
        name
    }

    fn fresh_token(&self) -> String {
        loop {
            let token = self.tokens.generate();
            if !self.preserved.contains_key(&token) && self.players.iter().all(|p| p.token() != token) {
                return token;
            }
        }
    }

    /// Seats a player, or reattaches a preserved one when `token` matches.
    ///
    /// A reattached player keeps their id, hand, score and history and is
    /// not dealt any cards. An unknown token is ignored and a new player is
    /// created.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::CapacityReached`] if the room is full.
    pub fn create_player(
        &mut self,
        name: Option<&str>,
        bot: bool,
        token: Option<&str>,
    ) -> Result<PlayerId, UserError> {
        self.ensure_live();
        if self.players.len() >= self.settings.max_players {
            return Err(UserError::CapacityReached);
        }

        if let Some(token) = token
            && let Some(entry) = self.preserved.remove(token)
        {
            let id = entry.player.id();
            log::info!("{} reconnected", entry.player);
            self.events.push_back(SessionEvent::PlayerRestored { player: id });
            self.events.push_back(SessionEvent::PlayerJoined {
                player: id,
                name: entry.player.name().to_string(),
            });
            self.players.push(entry.player);
            if self.judge.is_none() {
                self.choose_judge();
            }
            self.on_player_count_changed();
            return Ok(id);
        }

        let id = self.next_player_id;
        self.next_player_id = self.next_player_id.wrapping_add(1);
        let name = self.clean_name(name, bot, None);
        let mut player = Player::new(id, self.fresh_token(), name, bot);
        player.set_blank_cards(self.settings.blank_cards);
        player.set_discards(self.settings.discards);
        self.deck.deal_to(&mut player, self.settings.hand_size, 0);

        log::info!("{player} joined{}", if bot { " as a bot" } else { "" });
        self.events.push_back(SessionEvent::PlayerJoined {
            player: id,
            name: player.name().to_string(),
        });
        self.players.push(player);
        if self.judge.is_none() {
            self.choose_judge();
        }
        self.on_player_count_changed();
        Ok(id)
    }

    /// Removes a player.
    ///
    /// With `preserve` set, preservation enabled and a game underway, the
    /// player is held with their cards for reconnection instead of having
    /// their cards reclaimed.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the player was seated
    pub fn remove_player(&mut self, id: PlayerId, reason: &str, preserve: bool) -> bool {
        self.ensure_live();
        let Some(idx) = self.position(id) else {
            return false;
        };
        let mut player = self.players.remove(idx);

        let judge_removed = match self.judge {
            Some(j) if j == idx => true,
            Some(j) if j > idx => {
                self.judge = Some(j - 1);
                false
            }
            _ => false,
        };

        let preserve = preserve
            && self.settings.enable_player_preserve
            && self.settings.player_preserve_time > 0
            && self.stage.is_in_progress()
            && !player.is_bot();
        if preserve {
            log::info!(
                "{player} left ({reason}), holding for {}s",
                self.settings.player_preserve_time
            );
            self.events.push_back(SessionEvent::PlayerPreserved { player: id });
            self.preserved.insert(
                player.token().to_string(),
                Preserved {
                    player,
                    remaining_secs: self.settings.player_preserve_time,
                },
            );
        } else {
            log::info!("{player} left ({reason})");
            self.deck.discard(player.take_hand());
            self.deck.discard(player.take_selection());
        }
        self.events.push_back(SessionEvent::PlayerLeft {
            player: id,
            reason: reason.to_string(),
        });

        if self.players.is_empty() {
            self.judge = None;
        } else if judge_removed {
            let n = self.players.len();
            // Scanning resumes from whoever now sits in the judge's seat.
            self.judge = if self.judges.permanent_czar {
                None
            } else {
                Some((idx + n - 1) % n)
            };
            self.choose_judge();
        }
        self.on_player_count_changed();
        true
    }

    fn on_player_count_changed(&mut self) {
        match self.stage {
            Stage::GameStarting => {
                if self.players.len() >= self.settings.min_players {
                    self.new_round();
                }
            }
            _ => {
                if self.players.len() < self.settings.min_players {
                    log::info!("not enough players, restarting");
                    self.new_game();
                }
            }
        }
        self.on_players_changed();
        self.events.push_back(SessionEvent::GameStateChanged);
    }

    fn on_players_changed(&mut self) {
        self.events.push_back(SessionEvent::PlayersChanged);
        self.prompt_bots();
        self.check_round_plays();
    }

    /// Resets scores, coins, trophies and histories, reshuffles everything
    /// and redeals. Held players are dropped.
    fn new_game(&mut self) {
        self.game += 1;
        log::info!("starting game {}", self.game);

        for player in &mut self.players {
            player.reset_awards();
            player.clear_history();
            player.set_skip_vote(false);
            player.set_discards(self.settings.discards);
            player.set_blank_cards(self.settings.blank_cards);
            player.take_hand();
            player.take_selection();
        }
        for (_, entry) in self.preserved.drain() {
            log::info!("dropping held player {}", entry.player);
        }

        self.round_plays.clear();
        self.winning_play = None;
        self.last_winner = None;
        self.deck.reset();
        for player in &mut self.players {
            self.deck.deal_to(player, self.settings.hand_size, 0);
        }
        self.round = 0;
        self.judge = None;
        self.choose_judge();

        self.set_stage(Stage::GameStarting);
        self.events.push_back(SessionEvent::PlayersChanged);
        if self.players.len() >= self.settings.min_players {
            self.new_round();
        }
    }

    fn new_round(&mut self) {
        self.deck.advance_black_card();
        self.choose_judge();
        self.round += 1;

        let Self {
            players,
            preserved,
            deck,
            ..
        } = self;
        for player in players
            .iter_mut()
            .chain(preserved.values_mut().map(|entry| &mut entry.player))
        {
            deck.discard(player.take_selection());
            player.set_skip_vote(false);
        }
        self.deal_round_extras();

        self.round_plays.clear();
        self.winning_play = None;
        self.set_stage(Stage::RoundInProgress);

        let black_card = self.black_card();
        match &black_card {
            Some(card) => log::info!(
                "round {} started with {} (pick {}, draw {}), judge {}",
                self.round,
                card.id,
                card.pick,
                card.draw,
                self.judge.map_or("nobody".to_string(), |i| self.players[i].to_string())
            ),
            None => log::warn!("round {} started without any black cards", self.round),
        }
        self.events.push_back(SessionEvent::RoundStarted {
            round: self.round,
            black_card: black_card.map(|c| c.id.clone()).unwrap_or_default(),
            judge: self.judge_id(),
        });
        self.prompt_bots();
    }

    /// Tops up every non-judge hand, plus the black card's draw bonus.
    fn deal_round_extras(&mut self) {
        let extra = self.black_card().map_or(0, |card| card.draw);
        for (i, player) in self.players.iter_mut().enumerate() {
            if Some(i) != self.judge {
                self.deck.deal_to(player, self.settings.hand_size, extra);
            }
        }
    }

    fn check_round_plays(&mut self) {
        if self.stage != Stage::RoundInProgress {
            return;
        }
        let Some(black_card) = self.black_card() else {
            return;
        };

        let mut active = self
            .players
            .iter()
            .enumerate()
            .filter(|(i, p)| Some(*i) != self.judge && !p.is_afk())
            .map(|(_, p)| p)
            .peekable();
        if active.peek().is_none() {
            return;
        }
        if active.all(|p| p.is_selection_valid(Some(&black_card))) {
            self.begin_judging(&black_card);
        }
    }

    fn begin_judging(&mut self, black_card: &BlackCard) {
        let mut plays: Vec<Submission> = self
            .players
            .iter()
            .enumerate()
            .filter(|(i, p)| Some(*i) != self.judge && p.is_selection_valid(Some(black_card)))
            .map(|(_, p)| Submission {
                player: p.id(),
                cards: p.selection().to_vec(),
            })
            .collect();
        shuffle(&mut plays, &mut rand::rng());
        self.round_plays = plays;

        log::info!(
            "round {}: judging {} plays",
            self.round,
            self.round_plays.len()
        );
        self.set_stage(Stage::JudgingCards);
        self.prompt_bots();
    }

    /// Submits a player's answer for the current black card.
    ///
    /// Custom cards are given by their encoded id and spend blank-card
    /// allowance. The hand is topped back up afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the player can't play right now or the cards
    /// don't form a valid answer.
    pub fn play_cards(&mut self, id: PlayerId, cards: &[String]) -> Result<(), UserError> {
        self.ensure_live();
        let idx = self.index_of(id)?;
        if self.stage != Stage::RoundInProgress {
            return Err(UserError::WrongStage { stage: self.stage });
        }
        if Some(idx) == self.judge {
            return Err(UserError::JudgeCannotPlay);
        }
        let player = &self.players[idx];
        if !player.selection().is_empty() {
            return Err(UserError::AlreadyPlayed);
        }
        let black_card = self.black_card().ok_or(UserError::NoBlackCard)?;
        if cards.len() != black_card.pick {
            return Err(UserError::WrongCardCount {
                expected: black_card.pick,
            });
        }

        let mut selection: Vec<Arc<WhiteCard>> = Vec::with_capacity(cards.len());
        let mut custom = 0;
        for card_id in cards {
            if selection.iter().any(|card| card.id == *card_id) {
                return Err(UserError::DuplicateCard(card_id.clone()));
            }
            let card = if WhiteCard::is_custom_id(card_id) {
                custom += 1;
                WhiteCard::from_custom_id(card_id, self.settings.max_blank_card_length)
                    .map(Arc::new)
                    .ok_or(UserError::InvalidCustomCard)?
            } else {
                player
                    .hand()
                    .iter()
                    .find(|card| card.id == *card_id)
                    .cloned()
                    .ok_or_else(|| UserError::CardNotOwned(card_id.clone()))?
            };
            selection.push(card);
        }
        if player.blank_cards() < custom {
            return Err(UserError::NoBlankCards);
        }

        let player = &mut self.players[idx];
        player.spend_blank_cards(custom);
        for card in selection.iter().filter(|card| !card.custom) {
            player.remove_from_hand(&card.id);
        }
        log::debug!(
            "{player} played {}",
            selection
                .iter()
                .map(|card| if card.custom { "(custom)" } else { card.id.as_str() })
                .collect::<Vec<_>>()
                .join(", ")
        );
        player.set_selection(selection);
        self.deck.deal_to(player, self.settings.hand_size, 0);

        self.check_round_plays();
        self.events.push_back(SessionEvent::GameStateChanged);
        Ok(())
    }

    /// Picks the winning play.
    ///
    /// Every submitted play is recorded in its owner's history. The winner
    /// scores one point plus the tiers of the winning cards and earns coins
    /// equal to the pick count.
    ///
    /// # Errors
    ///
    /// Returns an error if the player isn't the judge, the stage isn't
    /// judging, or there's no play at `index`.
    pub fn judge_cards(&mut self, id: PlayerId, index: usize) -> Result<(), UserError> {
        self.ensure_live();
        let idx = self.index_of(id)?;
        if self.stage != Stage::JudgingCards {
            return Err(UserError::WrongStage { stage: self.stage });
        }
        if Some(idx) != self.judge {
            return Err(UserError::NotJudge);
        }
        if index >= self.round_plays.len() {
            return Err(UserError::InvalidPlayIndex(index));
        }
        let black_card = self.black_card().ok_or(UserError::NoBlackCard)?;

        self.winning_play = Some(index);
        let winning = self.round_plays[index].clone();

        // Departed players that weren't held get no history.
        let plays = self.round_plays.clone();
        for (i, play) in plays.into_iter().enumerate() {
            if let Some(player) = self.all_players_mut().find(|p| p.id() == play.player) {
                player.save_play(black_card.clone(), play.cards, i == index);
            }
        }

        let round = self.round;
        let points = 1 + winning.cards.iter().map(|card| card.tier).sum::<u32>();
        let coins = u32::try_from(black_card.pick).unwrap_or(u32::MAX);
        let winner = self
            .all_players_mut()
            .find(|p| p.id() == winning.player)
            .map(|p| {
                p.add_points(points);
                p.add_coins(coins);
                log::info!("round {round} won by {p} for {points} points");
                p.id()
            });
        self.last_winner = winner;

        self.set_stage(Stage::RoundEnd);
        self.events.push_back(SessionEvent::RoundEnded {
            round: self.round,
            black_card: black_card.id.clone(),
            judge: self.judge_id(),
            winner,
            winning_play: winning.cards.iter().map(|card| card.id.clone()).collect(),
        });
        self.effects.push_back(Effect::RoundEndTimeout {
            round: self.round,
            after: self.settings.round_end_timeout(),
        });
        Ok(())
    }

    /// Ends the round-end pause: either a new round or the end of the game.
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if the timer is stale and nothing happened
    pub fn round_end_elapsed(&mut self, round: u32) -> bool {
        self.ensure_live();
        if self.stage != Stage::RoundEnd || self.round != round {
            log::debug!("ignoring stale round-end timer for round {round}");
            return false;
        }
        let max_points = self.settings.max_points;
        let max_rounds = self.settings.max_rounds;
        let reached_points = self
            .players
            .iter()
            .chain(self.preserved.values().map(|entry| &entry.player))
            .any(|p| p.score() >= max_points);
        if reached_points || (max_rounds > 0 && self.round >= max_rounds) {
            self.end_game();
        } else {
            self.new_round();
        }
        true
    }

    fn end_game(&mut self) {
        self.set_stage(Stage::GameEnd);
        self.assign_trophies();
        let winners = self.winners();
        log::info!("game {} over after {} rounds", self.game, self.round);
        self.events.push_back(SessionEvent::GameEnded { winners });
        self.effects.push_back(Effect::GameEndTimeout {
            game: self.game,
            after: self.settings.game_end_timeout(),
        });
    }

    fn assign_trophies(&mut self) {
        let winners = self.winners();
        let bot_won = self
            .players
            .iter()
            .any(|p| p.is_bot() && winners.contains(&p.id()));
        let outcome = GameOutcome { winners, bot_won };

        for player in &mut self.players {
            if player.is_asshole() {
                continue;
            }
            for trophy in self.pool.trophies() {
                if trophy.is_player_eligible(player, &outcome) && player.award_trophy(trophy.clone()) {
                    log::info!("{player} earned trophy {}", trophy.id);
                    self.events.push_back(SessionEvent::TrophyAwarded {
                        player: player.id(),
                        trophy: trophy.id.clone(),
                    });
                }
            }
        }
    }

    /// Starts the next game once the game-end pause is over.
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if the timer is stale and nothing happened
    pub fn game_end_elapsed(&mut self, game: u32) -> bool {
        self.ensure_live();
        if self.stage != Stage::GameEnd || self.game != game {
            log::debug!("ignoring stale game-end timer for game {game}");
            return false;
        }
        self.new_game();
        true
    }

    /// Casts or withdraws a vote to skip the current black card.
    ///
    /// The card is skipped once more than half of the eligible voters
    /// (humans who aren't away or flagged) want it gone.
    ///
    /// # Errors
    ///
    /// Returns an error if skips are off, no round is running, the player
    /// is a bot, or the vote doesn't change anything.
    pub fn vote_skip(&mut self, id: PlayerId, vote: bool) -> Result<(), UserError> {
        self.ensure_live();
        let idx = self.index_of(id)?;
        if !self.settings.allow_skips {
            return Err(UserError::SkipsDisabled);
        }
        if self.stage != Stage::RoundInProgress {
            return Err(UserError::WrongStage { stage: self.stage });
        }
        let player = &mut self.players[idx];
        if player.is_bot() {
            return Err(UserError::BotCannotVote);
        }
        if player.voted_skip() == vote {
            return Err(UserError::VoteUnchanged);
        }
        player.set_skip_vote(vote);
        log::info!(
            "{player} {}",
            if vote { "voted to skip the black card" } else { "withdrew their skip vote" }
        );

        self.update_skip_votes();
        self.events.push_back(SessionEvent::PlayersChanged);
        Ok(())
    }

    fn update_skip_votes(&mut self) {
        let (eligible, votes) = self
            .players
            .iter()
            .filter(|p| !p.is_bot() && !p.is_afk() && !p.is_asshole())
            .fold((0usize, 0usize), |(eligible, votes), p| {
                (eligible + 1, votes + usize::from(p.voted_skip()))
            });
        // Only eligible votes count, so nobody eligible means no skip.
        if votes > 0 && votes * 2 > eligible {
            self.skip_black_card();
        }
    }

    fn skip_black_card(&mut self) {
        let old = self.black_card().map(|c| c.id.clone()).unwrap_or_default();

        let Self {
            players,
            preserved,
            deck,
            ..
        } = self;
        for player in players
            .iter_mut()
            .chain(preserved.values_mut().map(|entry| &mut entry.player))
        {
            deck.discard(player.take_selection());
            player.set_skip_vote(false);
        }
        self.deck.advance_black_card();
        self.deal_round_extras();

        let new = self.black_card().map(|c| c.id.clone()).unwrap_or_default();
        log::info!("round {}: skipped black card {old} for {new}", self.round);
        self.events
            .push_back(SessionEvent::BlackCardSkipped { old, new });
        self.events.push_back(SessionEvent::GameStateChanged);
        self.prompt_bots();
    }

    /// Throws a hand card away for a fresh one, spending a discard.
    ///
    /// # Errors
    ///
    /// Returns an error if the card isn't in the hand or no discards are
    /// left.
    pub fn discard_card(&mut self, id: PlayerId, card_id: &str) -> Result<(), UserError> {
        self.ensure_live();
        let idx = self.index_of(id)?;
        let player = &mut self.players[idx];
        if !player.has_card(card_id) {
            return Err(UserError::CardNotOwned(card_id.to_string()));
        }
        if !player.spend_discard() {
            return Err(UserError::NoDiscardsLeft);
        }
        if let Some(card) = player.remove_from_hand(card_id) {
            self.deck.discard([card]);
        }
        log::debug!("{player} discarded {card_id}");
        self.deck.deal_to(player, self.settings.hand_size, 0);
        self.events.push_back(SessionEvent::PlayersChanged);
        Ok(())
    }

    /// Trades a hand card for its next tier, paying the tier's cost in
    /// coins. The old card goes to the discard pile.
    ///
    /// # Errors
    ///
    /// Returns an error if upgrades are off, the card isn't held or has no
    /// upgrade, the upgrade is out of circulation, or coins are short.
    pub fn upgrade_card(&mut self, id: PlayerId, card_id: &str) -> Result<(), UserError> {
        self.ensure_live();
        if !self.settings.enable_upgrades {
            return Err(UserError::UpgradesDisabled);
        }
        let idx = self.index_of(id)?;
        let player = &self.players[idx];
        let card = player
            .hand()
            .iter()
            .find(|card| card.id == card_id)
            .cloned()
            .ok_or_else(|| UserError::CardNotOwned(card_id.to_string()))?;
        let next_id = card
            .next_tier_id
            .clone()
            .ok_or_else(|| UserError::NoUpgrade(card_id.to_string()))?;
        let Some(tier_card) = self.pool.white(&next_id).cloned() else {
            log::warn!("{card_id} upgrades to unknown card {next_id}");
            return Err(UserError::NoUpgrade(card_id.to_string()));
        };
        let held = self
            .players
            .iter()
            .chain(self.preserved.values().map(|entry| &entry.player))
            .any(|p| p.holds_card(&next_id));
        if held || !self.deck.contains_in_piles(&next_id) {
            return Err(UserError::UpgradeUnavailable(next_id));
        }
        if player.coins() < tier_card.tier_cost {
            return Err(UserError::InsufficientCoins {
                required: tier_card.tier_cost,
            });
        }

        let Some(tier_card) = self.deck.take(&next_id) else {
            return Err(UserError::UpgradeUnavailable(next_id));
        };
        let player = &mut self.players[idx];
        player.spend_coins(tier_card.tier_cost);
        log::info!(
            "{player} upgraded {card_id} to {next_id} (-{} coins)",
            tier_card.tier_cost
        );
        if let Some(old) = player.replace_in_hand(card_id, tier_card) {
            self.deck.discard([old]);
        }
        self.events.push_back(SessionEvent::PlayersChanged);
        Ok(())
    }

    /// Marks a player as away. An away judge is replaced at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the player doesn't exist.
    pub fn set_afk(&mut self, id: PlayerId, afk: bool) -> Result<(), UserError> {
        self.ensure_live();
        let idx = self.index_of(id)?;
        if !self.players[idx].set_afk(afk) {
            return Ok(());
        }
        log::info!(
            "{} is {}",
            self.players[idx],
            if afk { "away" } else { "back" }
        );
        if afk && self.judge == Some(idx) {
            self.choose_judge();
        }
        self.on_players_changed();
        self.events.push_back(SessionEvent::GameStateChanged);
        Ok(())
    }

    /// Flags or clears a player for content violations.
    ///
    /// # Errors
    ///
    /// Returns an error if the player doesn't exist.
    pub fn set_asshole(&mut self, id: PlayerId, flagged: bool) -> Result<(), UserError> {
        self.ensure_live();
        let idx = self.index_of(id)?;
        if self.players[idx].set_asshole(flagged) {
            log::info!(
                "{} {}",
                self.players[idx],
                if flagged { "flagged" } else { "unflagged" }
            );
            self.events.push_back(SessionEvent::PlayersChanged);
        }
        Ok(())
    }

    /// Renames a player, applying the same cleanup as on join.
    ///
    /// # Errors
    ///
    /// Returns an error if the player doesn't exist.
    pub fn rename_player(&mut self, id: PlayerId, name: &str) -> Result<String, UserError> {
        self.ensure_live();
        let idx = self.index_of(id)?;
        let name = self.clean_name(Some(name), self.players[idx].is_bot(), Some(id));
        if name != self.players[idx].name() {
            log::info!("{} is now {name}", self.players[idx]);
            self.players[idx].set_name(name.clone());
            self.events.push_back(SessionEvent::PlayersChanged);
        }
        Ok(name)
    }

    fn prompt_bots(&mut self) {
        let mut rng = rand::rng();
        match self.stage {
            Stage::RoundInProgress => {
                if self.players.iter().all(Player::is_bot) {
                    return;
                }
                let draw = self.black_card().map_or(0, |card| card.draw);
                for (i, player) in self.players.iter_mut().enumerate() {
                    if !player.is_bot() || Some(i) == self.judge || !player.selection().is_empty() {
                        continue;
                    }
                    player.begin_play_delay();
                    self.effects.push_back(Effect::BotDelay {
                        player: player.id(),
                        action: BotAction::Play,
                        after: self.bots.play_delay(draw, &mut rng),
                    });
                }
            }
            Stage::JudgingCards => {
                let Some(judge) = self.judge else {
                    return;
                };
                let pick = self.black_card().map_or(1, |card| card.pick);
                let plays = self.round_plays.len();
                let player = &mut self.players[judge];
                if player.is_bot() {
                    player.begin_judge_delay();
                    self.effects.push_back(Effect::BotDelay {
                        player: player.id(),
                        action: BotAction::Judge,
                        after: self.bots.judge_delay(pick, plays, &mut rng),
                    });
                }
            }
            _ => {}
        }
    }

    /// Called when a bot's simulated delay runs out. The bot only moves if
    /// this was its last outstanding delay of that kind.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the bot made a move
    pub fn bot_delay_elapsed(&mut self, id: PlayerId, action: BotAction) -> bool {
        self.ensure_live();
        let Some(idx) = self.position(id) else {
            return false;
        };
        let player = &mut self.players[idx];
        if !player.is_bot() {
            return false;
        }
        match action {
            BotAction::Play => player.finish_play_delay() && self.auto_play(idx),
            BotAction::Judge => player.finish_judge_delay() && self.auto_judge(idx),
        }
    }

    /// Plays the first cards in the bot's hand.
    fn auto_play(&mut self, idx: usize) -> bool {
        let Some(black_card) = self.black_card() else {
            return false;
        };
        let player = &self.players[idx];
        if self.stage != Stage::RoundInProgress
            || Some(idx) == self.judge
            || !player.selection().is_empty()
        {
            return false;
        }
        let id = player.id();
        let cards: Vec<String> = player
            .hand()
            .iter()
            .take(black_card.pick)
            .map(|card| card.id.clone())
            .collect();
        match self.play_cards(id, &cards) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("bot #{id} couldn't play: {e}");
                false
            }
        }
    }

    /// Picks a play uniformly at random.
    fn auto_judge(&mut self, idx: usize) -> bool {
        if self.stage != Stage::JudgingCards
            || self.judge != Some(idx)
            || self.round_plays.is_empty()
        {
            return false;
        }
        let id = self.players[idx].id();
        let index = rand::rng().random_range(0..self.round_plays.len());
        match self.judge_cards(id, index) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("bot #{id} couldn't judge: {e}");
                false
            }
        }
    }

    /// Counts down held players by one second. Entries run out at zero, or
    /// at once if no game is underway; their cards are reclaimed.
    pub fn tick_preserved(&mut self) {
        self.ensure_live();
        if self.preserved.is_empty() {
            return;
        }
        let in_progress = self.stage.is_in_progress();
        let expired: Vec<String> = self
            .preserved
            .iter_mut()
            .filter_map(|(token, entry)| {
                entry.remaining_secs = entry.remaining_secs.saturating_sub(1);
                (!in_progress || entry.remaining_secs == 0).then(|| token.clone())
            })
            .collect();

        for token in expired {
            if let Some(mut entry) = self.preserved.remove(&token) {
                log::info!("stopped holding {}", entry.player);
                self.deck.discard(entry.player.take_hand());
                self.deck.discard(entry.player.take_selection());
            }
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn game_number(&self) -> u32 {
        self.game
    }

    #[must_use]
    pub fn current_black_card(&self) -> Option<&Arc<BlackCard>> {
        self.deck.current_black_card()
    }

    #[must_use]
    pub fn judge(&self) -> Option<&Player> {
        self.judge.map(|i| &self.players[i])
    }

    #[must_use]
    pub fn judge_index(&self) -> Option<usize> {
        self.judge
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    /// Players who still owe a play this round. Away players are left out
    /// unless everyone else is away too.
    #[must_use]
    pub fn pending_players(&self) -> Vec<PlayerId> {
        if self.stage != Stage::RoundInProgress {
            return Vec::new();
        }
        let black_card = self.black_card();
        let owing = |include_afk: bool| -> Vec<PlayerId> {
            self.players
                .iter()
                .enumerate()
                .filter(|(i, p)| {
                    Some(*i) != self.judge
                        && !p.is_selection_valid(black_card.as_deref())
                        && (include_afk || !p.is_afk())
                })
                .map(|(_, p)| p.id())
                .collect()
        };
        let pending = owing(false);
        if pending.is_empty() { owing(true) } else { pending }
    }

    /// The shuffled plays in front of the judge.
    #[must_use]
    pub fn round_plays(&self) -> &[Submission] {
        &self.round_plays
    }

    #[must_use]
    pub fn winning_play_index(&self) -> Option<usize> {
        self.winning_play
    }

    #[must_use]
    pub fn round_winner(&self) -> Option<PlayerId> {
        self.winning_play
            .and_then(|i| self.round_plays.get(i))
            .map(|play| play.player)
    }

    /// Players sharing the top score.
    #[must_use]
    pub fn winners(&self) -> Vec<PlayerId> {
        let Some(top) = self.players.iter().map(Player::score).max() else {
            return Vec::new();
        };
        self.players
            .iter()
            .filter(|p| p.score() == top)
            .map(Player::id)
            .collect()
    }

    #[must_use]
    pub fn packs(&self) -> &[PackInfo] {
        self.pool.packs()
    }

    /// Looks a card up by id, decoding custom cards on the fly.
    #[must_use]
    pub fn card_by_id(&self, id: &str) -> Option<Card> {
        if let Some(card) = self.pool.card(id) {
            return Some(card.clone());
        }
        WhiteCard::from_custom_id(id, self.settings.max_blank_card_length)
            .map(|card| Card::White(Arc::new(card)))
    }

    #[must_use]
    pub fn is_preserved(&self, token: &str) -> bool {
        self.preserved.contains_key(token)
    }

    #[must_use]
    pub fn preserved_count(&self) -> usize {
        self.preserved.len()
    }

    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            black_cards: self.pool.black_cards().len(),
            white_cards: self.pool.white_cards().len(),
            trophies: self.pool.trophies().len(),
            packs: self.pool.packs().to_vec(),
            settings: self.settings.clone(),
        }
    }

    #[must_use]
    pub fn card_census(&self) -> CardCensus {
        let held = self
            .players
            .iter()
            .chain(self.preserved.values().map(|entry| &entry.player))
            .flat_map(|p| p.hand().iter().chain(p.selection()))
            .filter(|card| !card.custom)
            .count();
        CardCensus {
            draw_pile: self.deck.draw_pile_len(),
            discard_pile: self.deck.discard_pile_len(),
            held,
            total: self.pool.white_cards().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::BotTiming;
    use crate::game::entities::CardContent;

    fn test_pack(whites: usize, blacks: &[(usize, usize)]) -> Pack {
        let mut pack = Pack::new("test", "Test Pack");
        for i in 0..whites {
            pack.add_white(WhiteCard::new(&format!("w_{i}"), &format!("answer {i}")));
        }
        for (i, &(pick, draw)) in blacks.iter().enumerate() {
            pack.add_black(BlackCard::new(&format!("b_{i}"), &format!("prompt {i} ____"), pick, draw));
        }
        pack
    }

    fn settings() -> GameSettings {
        GameSettings {
            hand_size: 5,
            bot_config: BotTiming::instant(),
            ..GameSettings::default()
        }
    }

    fn session_with(pack: Pack, settings: GameSettings, humans: usize) -> (Session, Vec<PlayerId>) {
        let mut session = Session::new(&[pack], settings);
        let ids = (0..humans)
            .map(|i| session.create_player(Some(&format!("p{i}")), false, None).unwrap())
            .collect();
        (session, ids)
    }

    fn play_first_cards(session: &mut Session) {
        let pick = session.current_black_card().unwrap().pick;
        let ids: Vec<PlayerId> = session
            .players()
            .iter()
            .filter(|p| Some(p.id()) != session.judge().map(Player::id))
            .map(Player::id)
            .collect();
        for id in ids {
            let cards: Vec<String> = session.player(id).unwrap().hand()[..pick]
                .iter()
                .map(|c| c.id.clone())
                .collect();
            session.play_cards(id, &cards).unwrap();
        }
    }

    /// Moves a pool card into a seated player's hand, wherever it is now.
    fn give(session: &mut Session, id: PlayerId, card_id: &str) {
        let card = session
            .deck
            .take(card_id)
            .or_else(|| {
                session
                    .players
                    .iter_mut()
                    .find_map(|p| p.remove_from_hand(card_id))
            })
            .unwrap();
        let idx = session.position(id).unwrap();
        session.players[idx].add_to_hand(vec![card]);
    }

    #[test]
    fn round_starts_at_min_players() {
        let (mut session, ids) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 2);
        assert_eq!(session.stage(), Stage::GameStarting);

        session.create_player(Some("p2"), false, None).unwrap();
        assert_eq!(session.stage(), Stage::RoundInProgress);
        assert_eq!(session.round(), 1);
        assert!(session.judge().is_some());
        assert_eq!(session.pending_players().len(), 2);
        assert!(session.card_census().is_conserved());
        assert!(ids.iter().all(|id| session.player(*id).unwrap().hand().len() == 5));
    }

    #[test]
    fn full_round_scores_and_records_history() {
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 3);
        let judge = session.judge().unwrap().id();

        let err = session.play_cards(judge, &["w_0".to_string()]).unwrap_err();
        assert_eq!(err, UserError::JudgeCannotPlay);

        play_first_cards(&mut session);
        assert_eq!(session.stage(), Stage::JudgingCards);
        assert_eq!(session.round_plays().len(), 2);

        let winner = session.round_plays()[0].player;
        session.drain_effects();
        session.judge_cards(judge, 0).unwrap();
        assert_eq!(session.stage(), Stage::RoundEnd);
        assert_eq!(session.round_winner(), Some(winner));

        let winner = session.player(winner).unwrap();
        assert_eq!(winner.score(), 1);
        assert_eq!(winner.coins(), 1);
        assert!(winner.history()[0].winning);
        let histories: usize = session.players().iter().map(|p| p.history().len()).sum();
        assert_eq!(histories, 2);

        assert_eq!(
            session.drain_effects().pop_front(),
            Some(Effect::RoundEndTimeout {
                round: 1,
                after: session.settings().round_end_timeout()
            })
        );
        assert!(session.card_census().is_conserved());
    }

    #[test]
    fn tiered_cards_score_extra() {
        let mut pack = Pack::new("tiers", "Tiers");
        for i in 0..60 {
            let mut card = WhiteCard::new(&format!("w_{i}"), "shiny");
            card.tier = 2;
            pack.add_white(card);
        }
        pack.add_black(BlackCard::new("b_0", "____ and ____", 2, 0));
        let (mut session, _) = session_with(pack, settings(), 3);
        let judge = session.judge().unwrap().id();

        play_first_cards(&mut session);
        let winner = session.round_plays()[1].player;
        session.judge_cards(judge, 1).unwrap();
        let winner = session.player(winner).unwrap();
        assert_eq!(winner.score(), 5);
        assert_eq!(winner.coins(), 2);
    }

    #[test]
    fn play_validation_leaves_state_alone() {
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 3);
        let judge = session.judge().unwrap().id();
        let player = session.players().iter().find(|p| p.id() != judge).unwrap();
        let id = player.id();
        let hand: Vec<String> = player.hand().iter().map(|c| c.id.clone()).collect();
        let foreign = session
            .players()
            .iter()
            .find(|p| p.id() != judge && p.id() != id)
            .unwrap()
            .hand()[0]
            .id
            .clone();

        assert_eq!(
            session.play_cards(id, &hand[..2]),
            Err(UserError::WrongCardCount { expected: 1 })
        );
        assert_eq!(
            session.play_cards(id, &[foreign.clone()]),
            Err(UserError::CardNotOwned(foreign))
        );
        assert_eq!(session.play_cards(99, &hand[..1]), Err(UserError::PlayerDoesNotExist));
        assert_eq!(session.player(id).unwrap().hand().len(), 5);

        session.play_cards(id, &hand[..1]).unwrap();
        assert_eq!(session.play_cards(id, &hand[1..2]), Err(UserError::AlreadyPlayed));
        assert_eq!(session.player(id).unwrap().hand().len(), 5);
        assert_eq!(session.judge_cards(id, 0), Err(UserError::WrongStage { stage: Stage::RoundInProgress }));
    }

    #[test]
    fn custom_cards_spend_blanks() {
        let settings = GameSettings {
            blank_cards: 1,
            ..settings()
        };
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings, 3);
        let judge = session.judge().unwrap().id();
        let id = session.players().iter().find(|p| p.id() != judge).unwrap().id();
        let custom = WhiteCard::custom("  my own answer ", 140).unwrap().id;

        session.play_cards(id, &[custom.clone()]).unwrap();
        let player = session.player(id).unwrap();
        assert_eq!(player.blank_cards(), 0);
        assert_eq!(player.hand().len(), 5);
        assert!(player.selection()[0].custom);
        assert_eq!(
            session.card_by_id(&custom).unwrap().as_white().unwrap().text("en"),
            "my own answer"
        );
        assert!(session.card_census().is_conserved());
    }

    #[test]
    fn skip_needs_a_strict_majority() {
        let (mut session, ids) = session_with(test_pack(80, &[(1, 0); 5]), settings(), 4);
        let before = session.current_black_card().unwrap().id.clone();

        session.vote_skip(ids[0], true).unwrap();
        session.vote_skip(ids[1], true).unwrap();
        assert_eq!(session.current_black_card().unwrap().id, before);
        assert_eq!(session.vote_skip(ids[1], true), Err(UserError::VoteUnchanged));

        session.drain_events();
        session.vote_skip(ids[2], true).unwrap();
        assert_ne!(session.current_black_card().unwrap().id, before);
        assert!(session.players().iter().all(|p| !p.voted_skip()));
        assert!(
            session
                .drain_events()
                .iter()
                .any(|e| matches!(e, SessionEvent::BlackCardSkipped { .. }))
        );
        assert!(session.card_census().is_conserved());
    }

    #[test]
    fn mixed_tiers_add_up() {
        let mut pack = test_pack(60, &[(2, 0); 3]);
        let mut low = WhiteCard::new("w_low", "a tier one answer");
        low.tier = 1;
        let mut high = WhiteCard::new("w_high", "a tier two answer");
        high.tier = 2;
        pack.add_white(low);
        pack.add_white(high);
        let (mut session, _) = session_with(pack, settings(), 3);
        let judge = session.judge().unwrap().id();
        let mut others = session.players().iter().map(Player::id).filter(|id| *id != judge);
        let (winner, other) = (others.next().unwrap(), others.next().unwrap());
        give(&mut session, winner, "w_low");
        give(&mut session, winner, "w_high");

        session
            .play_cards(winner, &["w_low".to_string(), "w_high".to_string()])
            .unwrap();
        let cards: Vec<String> = session.player(other).unwrap().hand()[..2]
            .iter()
            .map(|c| c.id.clone())
            .collect();
        session.play_cards(other, &cards).unwrap();

        let index = session
            .round_plays()
            .iter()
            .position(|play| play.player == winner)
            .unwrap();
        session.judge_cards(judge, index).unwrap();
        let winner = session.player(winner).unwrap();
        assert_eq!(winner.score(), 4);
        assert_eq!(winner.coins(), 2);
    }

    #[test]
    fn round_winner_judges_next_with_winner_czar() {
        let settings = GameSettings {
            winner_czar: true,
            ..settings()
        };
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings, 3);
        let judge = session.judge().unwrap().id();
        play_first_cards(&mut session);
        let winner = session.round_plays()[1].player;
        session.judge_cards(judge, 1).unwrap();

        assert!(session.round_end_elapsed(1));
        assert_eq!(session.round(), 2);
        assert_eq!(session.judge().unwrap().id(), winner);
    }

    #[test]
    fn away_and_flagged_votes_do_not_count() {
        let (mut session, ids) = session_with(test_pack(80, &[(1, 0); 5]), settings(), 4);
        session.set_asshole(ids[3], true).unwrap();
        session.set_afk(ids[2], true).unwrap();
        let before = session.current_black_card().unwrap().id.clone();

        session.vote_skip(ids[3], true).unwrap();
        session.vote_skip(ids[2], true).unwrap();
        assert_eq!(session.current_black_card().unwrap().id, before);

        // One of two eligible voters is only half.
        session.vote_skip(ids[0], true).unwrap();
        assert_eq!(session.current_black_card().unwrap().id, before);

        session.vote_skip(ids[1], true).unwrap();
        assert_ne!(session.current_black_card().unwrap().id, before);
    }

    #[test]
    fn restored_player_keeps_score_and_history() {
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 4);
        let judge = session.judge().unwrap().id();
        play_first_cards(&mut session);
        let winner = session.round_plays()[0].player;
        session.judge_cards(judge, 0).unwrap();
        let token = session.player(winner).unwrap().token().to_string();

        assert!(session.remove_player(winner, "disconnected", true));
        assert!(session.is_preserved(&token));
        let id = session.create_player(None, false, Some(&token)).unwrap();

        assert_eq!(id, winner);
        let back = session.player(id).unwrap();
        assert_eq!(back.score(), 1);
        assert_eq!(back.coins(), 1);
        assert_eq!(back.history().len(), 1);
        assert!(back.history()[0].winning);
    }

    #[test]
    fn held_leader_still_ends_the_game() {
        let settings = GameSettings {
            max_points: 1,
            ..settings()
        };
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings, 4);
        let judge = session.judge().unwrap().id();
        play_first_cards(&mut session);
        let winner = session.round_plays()[0].player;
        session.judge_cards(judge, 0).unwrap();

        assert!(session.remove_player(winner, "disconnected", true));
        assert!(session.round_end_elapsed(1));
        assert_eq!(session.stage(), Stage::GameEnd);
    }

    #[test]
    fn last_player_out_leaves_no_judge() {
        let (mut session, ids) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 3);
        assert_eq!(session.stage(), Stage::RoundInProgress);

        for (left, id) in ids.iter().enumerate() {
            assert!(session.remove_player(*id, "quit", false));
            let seated = ids.len() - left - 1;
            assert_eq!(session.players().len(), seated);
            assert_eq!(session.judge_index().is_some(), seated > 0);
            if let Some(judge) = session.judge_index() {
                assert!(judge < seated);
            }
        }
        assert!(session.judge().is_none());
        assert!(session.card_census().is_conserved());
    }

    #[test]
    fn dropping_below_min_resets_the_game() {
        let (mut session, ids) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 3);
        assert!(session.remove_player(ids[0], "quit", false));
        assert!(!session.remove_player(ids[0], "quit", false));

        assert_eq!(session.stage(), Stage::GameStarting);
        assert_eq!(session.round(), 0);
        assert_eq!(session.players().len(), 2);
        assert!(session.card_census().is_conserved());
    }

    #[test]
    fn preserved_player_comes_back_whole() {
        let (mut session, ids) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 4);
        let leaver = session.player(ids[3]).unwrap();
        let token = leaver.token().to_string();
        let hand: Vec<String> = leaver.hand().iter().map(|c| c.id.clone()).collect();

        session.remove_player(ids[3], "disconnected", true);
        assert!(session.is_preserved(&token));
        assert!(session.card_census().is_conserved());
        for _ in 0..10 {
            session.tick_preserved();
        }

        let id = session.create_player(Some("someone else"), false, Some(&token)).unwrap();
        assert_eq!(id, ids[3]);
        let back = session.player(id).unwrap();
        assert_eq!(back.name(), "p3");
        assert_eq!(back.hand().iter().map(|c| c.id.clone()).collect::<Vec<_>>(), hand);
        assert!(!session.is_preserved(&token));
    }

    #[test]
    fn preserved_player_expires() {
        let (mut session, ids) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 4);
        let token = session.player(ids[3]).unwrap().token().to_string();
        session.remove_player(ids[3], "disconnected", true);

        for _ in 0..30 {
            session.tick_preserved();
        }
        assert_eq!(session.preserved_count(), 0);
        assert!(session.card_census().is_conserved());

        let id = session.create_player(Some("p3"), false, Some(&token)).unwrap();
        assert_ne!(id, ids[3]);
    }

    #[test]
    fn upgrade_swaps_for_next_tier() {
        let mut pack = test_pack(40, &[(1, 0); 5]);
        let mut base = WhiteCard::new("w_base", "a dog");
        base.next_tier_id = Some("w_base_up".to_string());
        let mut up = WhiteCard::new("w_base_up", "a very good dog");
        up.tier = 1;
        up.tier_cost = 2;
        pack.add_white(base);
        pack.add_white(up);
        let (mut session, ids) = session_with(pack, settings(), 3);
        give(&mut session, ids[0], "w_base");
        give(&mut session, ids[1], "w_base_up");

        assert_eq!(
            session.upgrade_card(ids[0], "w_base"),
            Err(UserError::UpgradeUnavailable("w_base_up".to_string()))
        );
        let holder = session.position(ids[1]).unwrap();
        let up = session.players[holder].remove_from_hand("w_base_up").unwrap();
        session.deck.discard([up]);

        assert_eq!(
            session.upgrade_card(ids[0], "w_base"),
            Err(UserError::InsufficientCoins { required: 2 })
        );
        let idx = session.position(ids[0]).unwrap();
        session.players[idx].add_coins(3);
        session.upgrade_card(ids[0], "w_base").unwrap();

        let player = session.player(ids[0]).unwrap();
        assert!(player.has_card("w_base_up"));
        assert!(!player.has_card("w_base"));
        assert_eq!(player.coins(), 1);
        assert_eq!(
            session.upgrade_card(ids[0], "w_base_up"),
            Err(UserError::NoUpgrade("w_base_up".to_string()))
        );
        assert!(session.card_census().is_conserved());
    }

    #[test]
    fn names_are_cleaned_and_unique() {
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings(), 0);
        let a = session.create_player(Some("Alice"), false, None).unwrap();
        let b = session.create_player(Some(" Ali\u{7}ce "), false, None).unwrap();
        let c = session.create_player(Some("<>"), false, None).unwrap();
        assert_eq!(session.player(a).unwrap().name(), "Alice");
        assert_eq!(session.player(b).unwrap().name(), "Alice 2");
        assert_eq!(session.player(c).unwrap().name(), DEFAULT_PLAYER_NAME);

        assert_eq!(session.rename_player(b, "Alice").unwrap(), "Alice 2");
        assert_eq!(session.rename_player(a, "Alice").unwrap(), "Alice");
    }

    #[test]
    fn bots_play_when_their_delay_runs_out() {
        let settings = GameSettings {
            bot_count: 2,
            bot_names: vec!["Robo".to_string()],
            ..settings()
        };
        let (mut session, _) = session_with(test_pack(60, &[(1, 0); 5]), settings, 0);
        assert_eq!(session.players()[1].name(), "Robo 2");
        assert_eq!(session.stage(), Stage::GameStarting);
        assert!(session.drain_effects().is_empty());

        session.create_player(Some("human"), false, None).unwrap();
        assert_eq!(session.stage(), Stage::RoundInProgress);
        let delays: Vec<Effect> = session.drain_effects().into_iter().collect();
        assert!(!delays.is_empty());
        for effect in delays {
            if let Effect::BotDelay { player, action, .. } = effect {
                session.bot_delay_elapsed(player, action);
            }
        }
        let bots_owing = session
            .pending_players()
            .into_iter()
            .filter(|id| session.player(*id).unwrap().is_bot())
            .count();
        assert_eq!(bots_owing, 0);
    }

    #[test]
    #[should_panic(expected = "disposed twice")]
    fn double_dispose_panics() {
        let (mut session, _) = session_with(test_pack(10, &[(1, 0)]), settings(), 0);
        session.dispose();
        assert!(session.is_disposed());
        session.dispose();
    }

    #[test]
    #[should_panic(expected = "used after dispose")]
    fn use_after_dispose_panics() {
        let (mut session, _) = session_with(test_pack(10, &[(1, 0)]), settings(), 0);
        session.dispose();
        let _ = session.create_player(None, false, None);
    }
}
