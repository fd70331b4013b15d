//! Room actor: owns one session and runs its timers.

use std::collections::HashMap;
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Duration, interval, sleep},
};

use super::messages::{RoomMessage, RoomResponse};
use crate::game::{
    Card, Effect, PlayerId, Session, SessionEvent, SessionInfo, SessionView, UserError,
};

/// Inbox capacity for each room.
pub const ROOM_INBOX_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room is closed")]
    Closed,
}

/// Handle for talking to a running room.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
}

impl RoomHandle {
    /// Sends a message without waiting for an answer.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn send(&self, message: RoomMessage) -> Result<(), RoomError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomError::Closed)
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let (response, answer) = oneshot::channel();
        self.send(message(response)).await?;
        answer.await.map_err(|_| RoomError::Closed)
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn join(
        &self,
        name: Option<String>,
        token: Option<String>,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Join {
            name,
            token,
            bot: false,
            response,
        })
        .await
    }

    /// Seats an autonomous player.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn add_bot(&self, name: Option<String>) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Join {
            name,
            token: None,
            bot: true,
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn leave(
        &self,
        player: PlayerId,
        reason: &str,
        preserve: bool,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Leave {
            player,
            reason: reason.to_string(),
            preserve,
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn play_cards(
        &self,
        player: PlayerId,
        cards: Vec<String>,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::PlayCards {
            player,
            cards,
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn judge_cards(
        &self,
        player: PlayerId,
        index: usize,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::JudgeCards {
            player,
            index,
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn vote_skip(&self, player: PlayerId, vote: bool) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::VoteSkip {
            player,
            vote,
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn discard_card(&self, player: PlayerId, card: &str) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::DiscardCard {
            player,
            card: card.to_string(),
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn upgrade_card(&self, player: PlayerId, card: &str) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::UpgradeCard {
            player,
            card: card.to_string(),
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn set_afk(&self, player: PlayerId, afk: bool) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::SetAfk {
            player,
            afk,
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn set_asshole(
        &self,
        player: PlayerId,
        flagged: bool,
    ) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::SetAsshole {
            player,
            flagged,
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn rename(&self, player: PlayerId, name: &str) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Rename {
            player,
            name: name.to_string(),
            response,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn state(&self, player: Option<PlayerId>) -> Result<SessionView, RoomError> {
        self.request(|response| RoomMessage::GetState { player, response })
            .await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn info(&self) -> Result<SessionInfo, RoomError> {
        self.request(|response| RoomMessage::GetInfo { response })
            .await
    }

    /// Looks a card up by id. Custom card ids decode on the fly.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn card(&self, id: &str) -> Result<Option<Card>, RoomError> {
        self.request(|response| RoomMessage::CardById {
            id: id.to_string(),
            response,
        })
        .await
    }

    /// Subscribes to session events.
    ///
    /// # Arguments
    ///
    /// * `subscriber` - Caller-chosen id, used to unsubscribe
    /// * `player` - Player the subscription belongs to, if any
    /// * `buffer` - Events held before new ones are dropped
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn subscribe(
        &self,
        subscriber: u64,
        player: Option<PlayerId>,
        buffer: usize,
    ) -> Result<mpsc::Receiver<SessionEvent>, RoomError> {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        self.send(RoomMessage::Subscribe {
            subscriber,
            player,
            sender,
        })
        .await?;
        Ok(receiver)
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has shut down.
    pub async fn unsubscribe(&self, subscriber: u64) -> Result<(), RoomError> {
        self.send(RoomMessage::Unsubscribe { subscriber }).await
    }

    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the room has already shut down.
    pub async fn close(&self) -> Result<RoomResponse, RoomError> {
        self.request(|response| RoomMessage::Close { response })
            .await
    }
}

#[derive(Debug)]
struct Subscriber {
    player: Option<PlayerId>,
    sender: mpsc::Sender<SessionEvent>,
}

/// Actor serializing all access to one [`Session`].
///
/// Timers requested by the session are run as sleeping tasks that post
/// back into the inbox. They hold only a weak sender, so a room whose
/// handles are all gone shuts down even with timers outstanding.
pub struct RoomActor {
    session: Session,
    inbox: mpsc::Receiver<RoomMessage>,
    timers: mpsc::WeakSender<RoomMessage>,
    subscribers: HashMap<u64, Subscriber>,
    is_closed: bool,
}

impl RoomActor {
    /// # Returns
    ///
    /// * `(RoomActor, RoomHandle)` - Actor to spawn and handle for sending messages
    #[must_use]
    pub fn new(session: Session) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(ROOM_INBOX_SIZE);
        let actor = Self {
            session,
            inbox,
            timers: sender.downgrade(),
            subscribers: HashMap::new(),
            is_closed: false,
        };
        (actor, RoomHandle { sender })
    }

    /// Runs the actor on a new task.
    #[must_use]
    pub fn spawn(session: Session) -> (RoomHandle, tokio::task::JoinHandle<()>) {
        let (actor, handle) = Self::new(session);
        (handle, tokio::spawn(actor.run()))
    }

    /// Event loop. Ends on [`RoomMessage::Close`] or once every handle is
    /// dropped, disposing the session.
    pub async fn run(mut self) {
        log::info!("room starting");
        self.flush();

        let mut tick_interval = interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        log::debug!("all room handles dropped");
                        break;
                    };
                    self.handle_message(message);
                    self.flush();
                    if self.is_closed {
                        break;
                    }
                }

                _ = tick_interval.tick() => {
                    self.session.tick_preserved();
                    self.flush();
                }
            }
        }

        self.session.dispose();
        log::info!("room closed");
    }

    fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                name,
                token,
                bot,
                response,
            } => {
                let result = match self
                    .session
                    .create_player(name.as_deref(), bot, token.as_deref())
                {
                    Ok(player) => RoomResponse::Joined {
                        player,
                        token: self
                            .session
                            .player(player)
                            .map(|p| p.token().to_string())
                            .unwrap_or_default(),
                    },
                    Err(e) => self.rejected(None, e),
                };
                let _ = response.send(result);
            }

            RoomMessage::Leave {
                player,
                reason,
                preserve,
                response,
            } => {
                let removed = self.session.remove_player(player, &reason, preserve);
                let _ = response.send(RoomResponse::Left(removed));
            }

            RoomMessage::PlayCards {
                player,
                cards,
                response,
            } => {
                let result = self.session.play_cards(player, &cards);
                let _ = response.send(self.respond(player, result));
            }

            RoomMessage::JudgeCards {
                player,
                index,
                response,
            } => {
                let result = self.session.judge_cards(player, index);
                let _ = response.send(self.respond(player, result));
            }

            RoomMessage::VoteSkip {
                player,
                vote,
                response,
            } => {
                let result = self.session.vote_skip(player, vote);
                let _ = response.send(self.respond(player, result));
            }

            RoomMessage::DiscardCard {
                player,
                card,
                response,
            } => {
                let result = self.session.discard_card(player, &card);
                let _ = response.send(self.respond(player, result));
            }

            RoomMessage::UpgradeCard {
                player,
                card,
                response,
            } => {
                let result = self.session.upgrade_card(player, &card);
                let _ = response.send(self.respond(player, result));
            }

            RoomMessage::SetAfk {
                player,
                afk,
                response,
            } => {
                let result = self.session.set_afk(player, afk);
                let _ = response.send(self.respond(player, result));
            }

            RoomMessage::SetAsshole {
                player,
                flagged,
                response,
            } => {
                let result = self.session.set_asshole(player, flagged);
                let _ = response.send(self.respond(player, result));
            }

            RoomMessage::Rename {
                player,
                name,
                response,
            } => {
                let result = match self.session.rename_player(player, &name) {
                    Ok(name) => RoomResponse::Renamed(name),
                    Err(e) => self.rejected(Some(player), e),
                };
                let _ = response.send(result);
            }

            RoomMessage::GetState { player, response } => {
                let _ = response.send(self.session.view(player));
            }

            RoomMessage::GetInfo { response } => {
                let _ = response.send(self.session.info());
            }

            RoomMessage::CardById { id, response } => {
                let _ = response.send(self.session.card_by_id(&id));
            }

            RoomMessage::Subscribe {
                subscriber,
                player,
                sender,
            } => {
                self.subscribers
                    .insert(subscriber, Subscriber { player, sender });
                log::debug!("subscriber {subscriber} attached");
            }

            RoomMessage::Unsubscribe { subscriber } => {
                self.subscribers.remove(&subscriber);
                log::debug!("subscriber {subscriber} detached");
            }

            RoomMessage::RoundEndElapsed { round } => {
                self.session.round_end_elapsed(round);
            }

            RoomMessage::GameEndElapsed { game } => {
                self.session.game_end_elapsed(game);
            }

            RoomMessage::BotDelayElapsed { player, action } => {
                self.session.bot_delay_elapsed(player, action);
            }

            RoomMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(RoomResponse::Success);
            }
        }
    }

    fn respond(&self, player: PlayerId, result: Result<(), UserError>) -> RoomResponse {
        if let Err(e) = &result
            && let Some(player) = self.session.player(player)
        {
            log::debug!("rejected action from {player}: {e}");
        }
        result.into()
    }

    fn rejected(&self, player: Option<PlayerId>, error: UserError) -> RoomResponse {
        match player.and_then(|id| self.session.player(id)) {
            Some(player) => log::debug!("rejected action from {player}: {error}"),
            None => log::debug!("rejected action: {error}"),
        }
        RoomResponse::Rejected(error)
    }

    /// Schedules pending timers and fans pending events out to subscribers.
    fn flush(&mut self) {
        for effect in self.session.drain_effects() {
            self.schedule(effect);
        }
        for event in self.session.drain_events() {
            log::debug!("{event}");
            self.notify(&event);
            if let SessionEvent::PlayerLeft { player, .. } = event {
                self.subscribers.retain(|_, sub| sub.player != Some(player));
            }
        }
    }

    fn schedule(&self, effect: Effect) {
        let (after, message) = match effect {
            Effect::RoundEndTimeout { round, after } => {
                (after, RoomMessage::RoundEndElapsed { round })
            }
            Effect::GameEndTimeout { game, after } => (after, RoomMessage::GameEndElapsed { game }),
            Effect::BotDelay {
                player,
                action,
                after,
            } => (after, RoomMessage::BotDelayElapsed { player, action }),
        };
        let timers = self.timers.clone();
        tokio::spawn(async move {
            sleep(after).await;
            if let Some(sender) = timers.upgrade() {
                let _ = sender.send(message).await;
            }
        });
    }

    /// Broadcast an event to all subscribers
    fn notify(&mut self, event: &SessionEvent) {
        self.subscribers
            .retain(|id, sub| match sub.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("subscriber {id} channel full, dropping event");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("subscriber {id} disconnected, removing");
                    false
                }
            });
    }
}
