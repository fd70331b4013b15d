use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc};

use super::constants::{CUSTOM_CARD_PREFIX, DEFAULT_LANGUAGE};

/// Session-unique player identifier.
pub type PlayerId = u32;

/// Text keyed by language code (`en`, `en-US`, ...).
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocalizedString(BTreeMap<String, String>);

impl LocalizedString {
    #[must_use]
    pub fn new(language: &str, text: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert(language.to_string(), text.to_string());
        Self(map)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up text for a language, falling back to its family, then the
    /// default language, then whatever entry comes first.
    #[must_use]
    pub fn get(&self, language: &str) -> Option<&str> {
        let family = language_family(language);
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(language))
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(family))
            })
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(key, _)| language_family(key).eq_ignore_ascii_case(family))
            })
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(key, _)| language_family(key).eq_ignore_ascii_case(DEFAULT_LANGUAGE))
            })
            .or_else(|| self.0.iter().next())
            .map(|(_, text)| text.as_str())
    }

    /// A string supports a language if it has an entry for the exact code,
    /// or if the code names the family of one of its entries.
    #[must_use]
    pub fn supports_language(&self, language: &str) -> bool {
        self.0.keys().any(|key| {
            key.eq_ignore_ascii_case(language) || language_family(key).eq_ignore_ascii_case(language)
        })
    }
}

impl fmt::Display for LocalizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get(DEFAULT_LANGUAGE).unwrap_or_default())
    }
}

fn language_family(language: &str) -> &str {
    language.split('-').next().unwrap_or(language)
}

/// Card ids may only hold letters, digits, underscores and the extra
/// characters of the base64 alphabet.
#[must_use]
pub fn is_valid_card_id(id: &str) -> bool {
    !id.trim().is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '/' | '+' | '='))
}

/// Checks a card's flag string against a flag expression.
///
/// Expressions are space-separated terms. A bare term must be present on
/// the card; a `!term` must be absent. All terms have to hold.
#[must_use]
pub fn matches_content_flags(card_flags: &str, expression: &str) -> bool {
    let card_flags: Vec<&str> = card_flags.split_whitespace().collect();
    expression.split_whitespace().all(|term| match term.strip_prefix('!') {
        Some(flag) => !card_flags.contains(&flag),
        None => card_flags.contains(&term),
    })
}

/// Behavior shared by both card variants.
pub trait CardContent {
    fn id(&self) -> &str;
    fn content(&self) -> &LocalizedString;
    fn flags(&self) -> &str;

    fn supports_language(&self, language: &str) -> bool {
        self.content().supports_language(language)
    }

    fn matches_flags(&self, expression: &str) -> bool {
        matches_content_flags(self.flags(), expression)
    }

    fn text(&self, language: &str) -> &str {
        self.content().get(language).unwrap_or_default()
    }
}

/// A prompt card. `pick` answers are required per play, and `draw` extra
/// cards are dealt to everyone while it is active.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BlackCard {
    pub id: String,
    pub content: LocalizedString,
    pub flags: String,
    pub pack_id: Option<String>,
    pub pick: usize,
    pub draw: usize,
}

impl BlackCard {
    #[must_use]
    pub fn new(id: &str, text: &str, pick: usize, draw: usize) -> Self {
        Self {
            id: id.to_string(),
            content: LocalizedString::new(DEFAULT_LANGUAGE, text),
            flags: String::new(),
            pack_id: None,
            pick: pick.max(1),
            draw,
        }
    }
}

impl CardContent for BlackCard {
    fn id(&self) -> &str {
        &self.id
    }

    fn content(&self) -> &LocalizedString {
        &self.content
    }

    fn flags(&self) -> &str {
        &self.flags
    }
}

/// An answer card. Tiered cards can be upgraded to `next_tier_id` for the
/// target's `tier_cost` in coins.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct WhiteCard {
    pub id: String,
    pub content: LocalizedString,
    pub flags: String,
    pub pack_id: Option<String>,
    pub tier: u32,
    pub tier_cost: u32,
    pub next_tier_id: Option<String>,
    pub custom: bool,
}

impl WhiteCard {
    #[must_use]
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            content: LocalizedString::new(DEFAULT_LANGUAGE, text),
            flags: String::new(),
            pack_id: None,
            tier: 0,
            tier_cost: 0,
            next_tier_id: None,
            custom: false,
        }
    }

    /// Synthesizes a player-written card. The text is cleaned and cut to
    /// `max_len` characters; blank text yields nothing.
    #[must_use]
    pub fn custom(text: &str, max_len: usize) -> Option<Self> {
        let text: String = text
            .trim()
            .chars()
            .filter(|c| !c.is_control())
            .take(max_len)
            .collect();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut card = Self::new(
            &format!("{CUSTOM_CARD_PREFIX}{}", STANDARD.encode(text.as_bytes())),
            text,
        );
        card.custom = true;
        Some(card)
    }

    /// Rebuilds a custom card from its encoded id.
    #[must_use]
    pub fn from_custom_id(id: &str, max_len: usize) -> Option<Self> {
        let encoded = id.strip_prefix(CUSTOM_CARD_PREFIX)?;
        let bytes = STANDARD.decode(encoded).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        Self::custom(&text, max_len)
    }

    #[must_use]
    pub fn is_custom_id(id: &str) -> bool {
        id.starts_with(CUSTOM_CARD_PREFIX)
    }
}

impl CardContent for WhiteCard {
    fn id(&self) -> &str {
        &self.id
    }

    fn content(&self) -> &LocalizedString {
        &self.content
    }

    fn flags(&self) -> &str {
        &self.flags
    }
}

/// Either card variant, as returned by id lookups.
#[derive(Clone, Debug, PartialEq)]
pub enum Card {
    Black(Arc<BlackCard>),
    White(Arc<WhiteCard>),
}

impl Card {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Black(card) => &card.id,
            Self::White(card) => &card.id,
        }
    }

    #[must_use]
    pub fn as_white(&self) -> Option<&Arc<WhiteCard>> {
        match self {
            Self::White(card) => Some(card),
            Self::Black(_) => None,
        }
    }

    #[must_use]
    pub fn as_black(&self) -> Option<&Arc<BlackCard>> {
        match self {
            Self::Black(card) => Some(card),
            Self::White(_) => None,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White(card) if card.custom => write!(f, "(custom)"),
            _ => write!(f, "{}", self.id()),
        }
    }
}

/// One player's finished play in a past round.
#[derive(Clone, Debug)]
pub struct RoundPlay {
    pub black_card: Arc<BlackCard>,
    pub white_cards: Vec<Arc<WhiteCard>>,
    pub winning: bool,
}

impl RoundPlay {
    /// Number of answer cards the prompt asked for.
    #[must_use]
    pub fn pick_count(&self) -> usize {
        self.black_card.pick
    }
}

/// A play exposed to the judge: whose it is and what they put down.
#[derive(Clone, Debug)]
pub struct Submission {
    pub player: PlayerId,
    pub cards: Vec<Arc<WhiteCard>>,
}
