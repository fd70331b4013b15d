pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_PLAYER_NAME: &str = "Player";
pub const DEFAULT_BOT_NAME: &str = "Bot";

pub const CUSTOM_CARD_PREFIX: &str = "custom_";
pub const WHITE_CARD_PREFIX: &str = "w_";
pub const BLACK_CARD_PREFIX: &str = "b_";

/// Number of swap passes per shuffle.
pub const SHUFFLE_PASSES: usize = 100;

/// Bytes of entropy in a player token.
pub const TOKEN_BYTES: usize = 16;

/// Characters allowed in player names besides letters and digits.
pub const NAME_CHAR_EXCEPTIONS: &[char] = &[' ', '-', '_', '\'', '"', '\u{00ae}', '\u{2122}', '.', ','];

pub const MIN_PLAYERS: usize = 3;
pub const MIN_HAND_SIZE: usize = 4;
pub const MIN_GAME_END_TIMEOUT_MS: u64 = 10_000;
