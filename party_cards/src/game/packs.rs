//! Card packs and the pooled card set a session plays with.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

use super::{
    constants::{BLACK_CARD_PREFIX, WHITE_CARD_PREFIX},
    entities::{BlackCard, Card, CardContent, LocalizedString, WhiteCard, is_valid_card_id},
    settings::GameSettings,
    trophy::Trophy,
};

const DEFAULT_PACK_ID: &str = "untitled";
const DEFAULT_PACK_NAME: &str = "Untitled Pack";

#[derive(Debug, Error)]
pub enum PackError {
    #[error("malformed pack: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pack id {0:?}")]
    InvalidId(String),
}

fn default_pack_id() -> String {
    DEFAULT_PACK_ID.to_string()
}

fn default_pack_name() -> String {
    DEFAULT_PACK_NAME.to_string()
}

const fn default_pick() -> usize {
    1
}

#[derive(Deserialize)]
struct RawPack {
    #[serde(default = "default_pack_id")]
    id: String,
    #[serde(default = "default_pack_name")]
    name: String,
    #[serde(default)]
    cards: Vec<RawCard>,
    #[serde(default)]
    trophies: Vec<Trophy>,
}

/// Both card kinds share one JSON shape; the id prefix says which is which.
#[derive(Deserialize)]
struct RawCard {
    id: String,
    #[serde(default)]
    content: LocalizedString,
    #[serde(default)]
    flags: String,
    #[serde(default = "default_pick")]
    pick: usize,
    #[serde(default)]
    draw: usize,
    #[serde(default)]
    tier: u32,
    #[serde(default)]
    tier_cost: u32,
    #[serde(default)]
    next_tier_id: String,
}

/// A named bundle of cards and trophies. Read-only once loaded.
#[derive(Clone, Debug)]
pub struct Pack {
    pub id: String,
    pub name: String,
    pub black_cards: Vec<Arc<BlackCard>>,
    pub white_cards: Vec<Arc<WhiteCard>>,
    pub trophies: Vec<Arc<Trophy>>,
}

impl Pack {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            black_cards: Vec::new(),
            white_cards: Vec::new(),
            trophies: Vec::new(),
        }
    }

    pub fn add_black(&mut self, mut card: BlackCard) {
        card.pack_id = Some(self.id.clone());
        self.black_cards.push(Arc::new(card));
    }

    pub fn add_white(&mut self, mut card: WhiteCard) {
        card.pack_id = Some(self.id.clone());
        self.white_cards.push(Arc::new(card));
    }

    pub fn add_trophy(&mut self, trophy: Trophy) {
        self.trophies.push(Arc::new(trophy));
    }

    /// Parses a pack document. Cards with bad ids or an unknown kind prefix
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or an unusable pack id.
    pub fn from_json(text: &str) -> Result<Self, PackError> {
        let raw: RawPack = serde_json::from_str(text)?;
        if !is_valid_card_id(&raw.id) {
            return Err(PackError::InvalidId(raw.id));
        }

        let mut pack = Self::new(&raw.id, &raw.name);
        for card in raw.cards {
            if !is_valid_card_id(&card.id) {
                log::warn!("skipping card with invalid id {:?} in [{}]", card.id, pack.id);
                continue;
            }
            if card.id.starts_with(WHITE_CARD_PREFIX) {
                pack.add_white(WhiteCard {
                    id: card.id,
                    content: card.content,
                    flags: card.flags,
                    pack_id: None,
                    tier: card.tier,
                    tier_cost: card.tier_cost,
                    next_tier_id: Some(card.next_tier_id).filter(|id| !id.is_empty()),
                    custom: false,
                });
            } else if card.id.starts_with(BLACK_CARD_PREFIX) {
                pack.add_black(BlackCard {
                    id: card.id,
                    content: card.content,
                    flags: card.flags,
                    pack_id: None,
                    pick: card.pick.max(1),
                    draw: card.draw,
                });
            } else {
                log::warn!("skipping card {:?} in [{}]: unknown kind", card.id, pack.id);
            }
        }
        for trophy in raw.trophies {
            pack.add_trophy(trophy);
        }
        Ok(pack)
    }

    #[must_use]
    pub fn info(&self) -> PackInfo {
        PackInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            black_cards: self.black_cards.len(),
            white_cards: self.white_cards.len(),
            trophies: self.trophies.len(),
        }
    }
}

/// Summary of a loaded pack.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PackInfo {
    pub id: String,
    pub name: String,
    pub black_cards: usize,
    pub white_cards: usize,
    pub trophies: usize,
}

/// Loads a single pack file.
pub fn load_pack_file(path: &Path) -> anyhow::Result<Pack> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let pack = Pack::from_json(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(pack)
}

/// Loads every `*.json` pack below `dir`, in path order.
///
/// Files that fail to load are logged and skipped.
pub fn load_packs_dir(dir: &Path) -> anyhow::Result<Vec<Pack>> {
    let mut files = Vec::new();
    collect_json_files(dir, &mut files)?;
    files.sort();

    let mut packs = Vec::with_capacity(files.len());
    for file in files {
        match load_pack_file(&file) {
            Ok(pack) => {
                log::info!(
                    "loaded pack [{}] {} ({} black, {} white, {} trophies)",
                    pack.id,
                    pack.name,
                    pack.black_cards.len(),
                    pack.white_cards.len(),
                    pack.trophies.len()
                );
                packs.push(pack);
            }
            Err(e) => log::warn!("skipping pack file: {e:#}"),
        }
    }
    Ok(packs)
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(())
}

/// The cards and trophies in play, after pack selection and filtering.
#[derive(Debug, Default)]
pub struct CardPool {
    cards: HashMap<String, Card>,
    white_cards: Vec<Arc<WhiteCard>>,
    black_cards: Vec<Arc<BlackCard>>,
    trophies: Vec<Arc<Trophy>>,
    packs: Vec<PackInfo>,
}

impl CardPool {
    /// Pools the selected packs.
    ///
    /// Packs are picked with `use_packs`/`exclude_packs`. Cards lacking any
    /// required language are dropped, then duplicate ids are dropped with a
    /// warning (first pack wins), then cards matching an excluded flag
    /// expression are left out of play. Excluded cards can still be looked
    /// up by id.
    #[must_use]
    pub fn build(packs: &[Pack], settings: &GameSettings) -> Self {
        let mut pool = Self::default();
        let selected = packs.iter().filter(|pack| {
            (settings.use_packs.is_empty() || settings.use_packs.contains(&pack.id))
                && !settings.exclude_packs.contains(&pack.id)
        });

        let supported = |card: &dyn CardContent| {
            settings
                .require_languages
                .iter()
                .all(|lang| card.supports_language(lang))
        };
        let excluded = |card: &dyn CardContent| {
            settings
                .exclude_content
                .iter()
                .filter(|expr| !expr.trim().is_empty())
                .any(|expr| card.matches_flags(expr))
        };

        for pack in selected {
            pool.packs.push(pack.info());
            for card in &pack.black_cards {
                if !supported(card.as_ref()) || !pool.register(Card::Black(card.clone()), &pack.id) {
                    continue;
                }
                if !excluded(card.as_ref()) {
                    pool.black_cards.push(card.clone());
                }
            }
            for card in &pack.white_cards {
                if !supported(card.as_ref()) || !pool.register(Card::White(card.clone()), &pack.id) {
                    continue;
                }
                if !excluded(card.as_ref()) {
                    pool.white_cards.push(card.clone());
                }
            }
            pool.trophies.extend(pack.trophies.iter().cloned());
        }

        for card in &pool.white_cards {
            if let Some(next) = &card.next_tier_id
                && pool.white(next).is_none()
            {
                log::warn!("card {} upgrades to unknown card {}", card.id, next);
            }
        }

        let mut seen = HashSet::new();
        pool.trophies.retain(|trophy| {
            let fresh = seen.insert(trophy.id.clone());
            if !fresh {
                log::warn!("duplicate trophy id {}", trophy.id);
            }
            fresh
        });

        pool
    }

    fn register(&mut self, card: Card, pack_id: &str) -> bool {
        if self.cards.contains_key(card.id()) {
            log::warn!("duplicate card id {} in [{}]", card.id(), pack_id);
            return false;
        }
        self.cards.insert(card.id().to_string(), card);
        true
    }

    #[must_use]
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    #[must_use]
    pub fn white(&self, id: &str) -> Option<&Arc<WhiteCard>> {
        self.cards.get(id).and_then(Card::as_white)
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
    pub fn trophies(&self) -> &[Arc<Trophy>] {
        &self.trophies
    }

    #[must_use]
    pub fn packs(&self) -> &[PackInfo] {
        &self.packs
    }
}
