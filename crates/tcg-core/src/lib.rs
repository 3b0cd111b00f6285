//! Core domain entities and deck rules for the TCG deck tracker.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tcg_utils::{contains_fold, eq_fold};

/// Copy limit, applied both per named card across sets and per printing.
pub const MAX_COPIES: u32 = 2;

/// Result type for deck operations.
pub type DeckResult<T> = Result<T, DeckError>;

/// Errors returned by deck operations and their collaborators.
#[derive(Debug, Error)]
pub enum DeckError {
    /// Returned when a card id does not resolve in the catalog.
    #[error("card id \"{0}\" not found in the catalog")]
    CardNotFound(String),
    /// Returned when creating a deck whose record already exists.
    #[error("deck \"{0}\" already exists")]
    AlreadyExists(String),
    /// Returned when a card index is outside the deck.
    #[error("index {index} out of range for a deck with {len} entries")]
    OutOfRange { index: usize, len: usize },
    /// Returned when a battle outcome is not W or L.
    #[error("invalid outcome \"{0}\", expected W or L")]
    InvalidResult(String),
    /// Returned when no catalog source could be resolved.
    #[error("card catalog unavailable: {0}")]
    Catalog(String),
    /// Returned when reading or writing deck records fails.
    #[error("storage error: {0}")]
    Storage(String),
}

/// A catalog entry. Identity is `id`, case-insensitive.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Card {
    /// Display name.
    pub name: String,
    /// Set label, already formatted as `Set Name (code)`.
    pub set: String,
    /// Unique id, formatted `<lowercase-set-code>-<3-digit-number>`.
    pub id: String,
}

/// One line of a deck: a printing and how many copies of it are held.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CardEntry {
    pub name: String,
    pub set: String,
    pub count: u32,
}

/// A single recorded battle outcome.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct BattleRecord {
    /// Timestamp formatted `YYYY-MM-DD HH:MM:SS`.
    pub date: String,
    /// `"W"` or `"L"`, normalized at record time.
    pub result: String,
    /// Free-text opponent name, `"Unknown"` when none was given.
    pub opponent: String,
}

/// Where the card catalog was resolved from.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardsSource {
    Remote,
    Local,
    None,
}

impl CardsSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CardsSource::Remote => "remote",
            CardsSource::Local => "local",
            CardsSource::None => "none",
        }
    }
}

/// How a deck's persisted record was loaded at construction time.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeckLoadStatus {
    /// No record existed; the deck starts empty.
    New,
    /// The record decoded and was loaded verbatim.
    Loaded,
    /// A record existed but could not be decoded; the deck starts empty.
    Reset,
}

impl DeckLoadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeckLoadStatus::New => "new",
            DeckLoadStatus::Loaded => "loaded",
            DeckLoadStatus::Reset => "reset",
        }
    }
}

/// A resolved snapshot of the cards a deck may legally contain.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub cards: Vec<Card>,
    pub source: CardsSource,
    /// Non-fatal notice from the resolver, such as a remote failure that
    /// was recovered from the local cache.
    pub warning: Option<String>,
}

/// Resolver interface for acquiring the card catalog.
pub trait CatalogProvider {
    /// Resolve a catalog snapshot, or fail when no source is usable.
    fn resolve(&self) -> DeckResult<Catalog>;
}

/// Outcome of an add-by-id attempt.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AddCardResult {
    /// The catalog card the id resolved to.
    pub card: Card,
    /// The affected deck row; `None` when the add was rejected before any
    /// row was touched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<CardEntry>,
    pub added: bool,
    /// Copies of this card name across all sets; reflects the post-add
    /// total only when the add succeeded.
    pub total_copies: u32,
    /// Copies held of this exact printing after the call.
    pub set_copies: u32,
}

/// Aggregate battle statistics, computed fresh on every call.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Stats {
    pub total_battles: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_percentage: f64,
    /// Losses grouped by the exact opponent string (case-sensitive).
    pub loss_by_opponent: BTreeMap<String, u32>,
}

/// One player's deck: held cards, battle log, and the catalog snapshot it
/// was built against.
#[derive(Clone, Debug)]
pub struct Deck {
    pub name: String,
    /// Storage key; the deck is persisted here on an explicit save.
    pub file_path: PathBuf,
    /// Held printings, in first-added order.
    pub cards: Vec<CardEntry>,
    /// Recorded battles, in chronological order.
    pub battle_history: Vec<BattleRecord>,
    /// Catalog snapshot taken at construction time; not persisted.
    pub catalog: Catalog,
    pub load_status: DeckLoadStatus,
}

impl Deck {
    /// Create an empty deck against a catalog snapshot.
    pub fn new(name: impl Into<String>, file_path: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            cards: Vec::new(),
            battle_history: Vec::new(),
            catalog,
            load_status: DeckLoadStatus::New,
        }
    }

    /// Every card in the resolved catalog, in catalog order.
    pub fn available_cards(&self) -> &[Card] {
        &self.catalog.cards
    }

    /// Case-insensitive substring search against catalog card names and
    /// set labels. A blank term matches nothing.
    pub fn search_cards(&self, term: &str) -> Vec<Card> {
        let needle = term.trim();
        if needle.is_empty() {
            return Vec::new();
        }
        self.catalog
            .cards
            .iter()
            .filter(|card| contains_fold(&card.name, needle) || contains_fold(&card.set, needle))
            .cloned()
            .collect()
    }

    /// Case-insensitive exact id lookup. A blank id never matches.
    pub fn find_card_by_id(&self, card_id: &str) -> Option<Card> {
        let needle = card_id.trim();
        if needle.is_empty() {
            return None;
        }
        self.catalog
            .cards
            .iter()
            .find(|card| eq_fold(&card.id, needle))
            .cloned()
    }

    /// Add one copy of a card by catalog id, enforcing both copy caps: at
    /// most [`MAX_COPIES`] of a named card across all sets, and at most
    /// [`MAX_COPIES`] of any single printing.
    ///
    /// A capped add is not an error; the result carries `added: false` and
    /// the counts that blocked it.
    pub fn add_card_by_id(&mut self, card_id: &str) -> DeckResult<AddCardResult> {
        let card = self
            .find_card_by_id(card_id)
            .ok_or_else(|| DeckError::CardNotFound(card_id.trim().to_string()))?;

        let card_name = card.name.trim().to_string();
        let card_set = card.set.trim().to_string();

        let total_copies = self.total_copies(&card_name);
        if total_copies >= MAX_COPIES {
            let set_copies = self.set_copies(&card_name, &card_set);
            return Ok(AddCardResult {
                card,
                entry: None,
                added: false,
                total_copies,
                set_copies,
            });
        }

        if let Some(entry) = self
            .cards
            .iter_mut()
            .find(|entry| eq_fold(&entry.name, &card_name) && eq_fold(&entry.set, &card_set))
        {
            if entry.count >= MAX_COPIES {
                let set_copies = entry.count;
                return Ok(AddCardResult {
                    card,
                    entry: Some(entry.clone()),
                    added: false,
                    total_copies,
                    set_copies,
                });
            }
            entry.count += 1;
            let set_copies = entry.count;
            return Ok(AddCardResult {
                card,
                entry: Some(entry.clone()),
                added: true,
                total_copies: total_copies + 1,
                set_copies,
            });
        }

        let entry = CardEntry {
            name: card_name,
            set: card_set,
            count: 1,
        };
        self.cards.push(entry.clone());
        Ok(AddCardResult {
            card,
            entry: Some(entry),
            added: true,
            total_copies: total_copies + 1,
            set_copies: 1,
        })
    }

    /// Remove one copy of the printing at `index`. A row holding more than
    /// one copy is decremented and returned with its new count; a row at
    /// one copy is deleted and returned as it was.
    pub fn remove_card(&mut self, index: usize) -> DeckResult<CardEntry> {
        if index >= self.cards.len() {
            return Err(DeckError::OutOfRange {
                index,
                len: self.cards.len(),
            });
        }
        if self.cards[index].count > 1 {
            self.cards[index].count -= 1;
            return Ok(self.cards[index].clone());
        }
        Ok(self.cards.remove(index))
    }

    /// Append a battle record. The result must trim and uppercase to
    /// exactly `"W"` or `"L"`; the opponent defaults to `"Unknown"` when
    /// blank.
    pub fn record_battle(
        &mut self,
        result: &str,
        opponent: &str,
        now: DateTime<Local>,
    ) -> DeckResult<()> {
        let outcome = result.trim().to_uppercase();
        if outcome != "W" && outcome != "L" {
            return Err(DeckError::InvalidResult(result.to_string()));
        }

        let opponent = opponent.trim();
        let opponent = if opponent.is_empty() { "Unknown" } else { opponent };

        self.battle_history.push(BattleRecord {
            date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            result: outcome,
            opponent: opponent.to_string(),
        });
        Ok(())
    }

    /// Aggregate statistics over the battle history. Every record that is
    /// not a win counts as a loss, but only `"L"` records are attributed
    /// to an opponent.
    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            total_battles: self.battle_history.len(),
            ..Stats::default()
        };
        if stats.total_battles == 0 {
            return stats;
        }

        for battle in &self.battle_history {
            if eq_fold(&battle.result, "W") {
                stats.wins += 1;
            } else if eq_fold(&battle.result, "L") {
                *stats
                    .loss_by_opponent
                    .entry(battle.opponent.clone())
                    .or_insert(0) += 1;
            }
        }
        stats.losses = stats.total_battles - stats.wins;
        stats.win_percentage = (stats.wins as f64 / stats.total_battles as f64) * 100.0;
        stats
    }

    fn total_copies(&self, card_name: &str) -> u32 {
        self.cards
            .iter()
            .filter(|entry| eq_fold(&entry.name, card_name))
            .map(|entry| entry.count)
            .sum()
    }

    fn set_copies(&self, card_name: &str, card_set: &str) -> u32 {
        self.cards
            .iter()
            .find(|entry| eq_fold(&entry.name, card_name) && eq_fold(&entry.set, card_set))
            .map_or(0, |entry| entry.count)
    }
}
