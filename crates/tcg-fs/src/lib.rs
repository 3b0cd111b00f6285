//! Filesystem persistence for decks: the record format and the deck
//! manager.
//!
//! One JSON file per deck, named `<deck-name>.json` inside a decks
//! directory. Decoding is tolerant: a record that does not parse resets
//! the in-memory deck to empty (status `Reset`) instead of failing the
//! load; callers are expected to surface that as a warning.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tcg_core::{
    BattleRecord, CardEntry, CatalogProvider, Deck, DeckError, DeckLoadStatus, DeckResult,
};

/// File extension of persisted deck records.
pub const DECK_FILE_EXTENSION: &str = "json";

/// On-disk shape of a deck record. The `battle_history` key spelling is
/// part of the format and kept for compatibility.
#[derive(Debug, Default, Deserialize, Serialize)]
struct DeckRecord {
    #[serde(default)]
    cards: Vec<CardEntry>,
    #[serde(default)]
    battle_history: Vec<BattleRecord>,
}

/// Resolve the default decks directory: the `TCGDECK_DECKS_DIR`
/// environment variable when set, otherwise `tcgdeck/decks` under the
/// platform data directory.
pub fn default_decks_dir() -> DeckResult<PathBuf> {
    if let Ok(value) = std::env::var("TCGDECK_DECKS_DIR") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join("tcgdeck").join("decks"));
    }
    Err(DeckError::Storage(
        "unable to determine a default decks directory".into(),
    ))
}

/// Creates, loads, lists, and saves decks stored under a single
/// directory, delegating catalog resolution to the given provider.
#[derive(Debug, Clone)]
pub struct DeckManager<P> {
    decks_dir: PathBuf,
    catalog: P,
}

impl<P: CatalogProvider> DeckManager<P> {
    /// Create a manager rooted at `decks_dir`, creating the directory
    /// when missing.
    pub fn new(decks_dir: impl Into<PathBuf>, catalog: P) -> DeckResult<Self> {
        let decks_dir = decks_dir.into();
        fs::create_dir_all(&decks_dir).map_err(|err| DeckError::Storage(err.to_string()))?;
        Ok(Self { decks_dir, catalog })
    }

    /// The directory holding deck records.
    pub fn decks_dir(&self) -> &Path {
        &self.decks_dir
    }

    /// The record file backing a deck name.
    pub fn deck_path(&self, name: &str) -> PathBuf {
        self.decks_dir
            .join(format!("{name}.{DECK_FILE_EXTENSION}"))
    }

    /// Names of decks with a persisted record, alphabetically sorted.
    pub fn list_existing_decks(&self) -> DeckResult<Vec<String>> {
        let entries =
            fs::read_dir(&self.decks_dir).map_err(|err| DeckError::Storage(err.to_string()))?;

        let mut decks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| DeckError::Storage(err.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(DECK_FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                decks.push(stem.to_string());
            }
        }
        decks.sort();
        Ok(decks)
    }

    /// Create a new deck. Fails with [`DeckError::AlreadyExists`] when a
    /// record for the name is present; the existence check runs before
    /// catalog resolution, so creation never overwrites.
    pub fn create_deck(&self, name: &str) -> DeckResult<Deck> {
        let path = self.deck_path(name);
        if path.exists() {
            return Err(DeckError::AlreadyExists(name.to_string()));
        }
        self.build_deck(name, path)
    }

    /// Load a deck, degrading to an empty one (status `New`) when no
    /// record exists. Fails only on catalog hard failure or I/O errors.
    pub fn load_deck(&self, name: &str) -> DeckResult<Deck> {
        let path = self.deck_path(name);
        self.build_deck(name, path)
    }

    /// Persist a deck record, unconditionally overwriting any previous
    /// contents. Last writer wins.
    pub fn save_deck(&self, deck: &Deck) -> DeckResult<()> {
        save_deck(deck)
    }

    fn build_deck(&self, name: &str, path: PathBuf) -> DeckResult<Deck> {
        let catalog = self.catalog.resolve()?;
        let mut deck = Deck::new(name, path, catalog);

        let (status, record) = read_record(&deck.file_path)?;
        if let Some(record) = record {
            deck.cards = record.cards;
            deck.battle_history = record.battle_history;
        }
        deck.load_status = status;
        Ok(deck)
    }
}

/// Write a deck's cards and battle history to its file path as pretty
/// JSON, creating parent directories as needed.
pub fn save_deck(deck: &Deck) -> DeckResult<()> {
    let record = DeckRecord {
        cards: deck.cards.clone(),
        battle_history: deck.battle_history.clone(),
    };

    if let Some(parent) = deck.file_path.parent() {
        fs::create_dir_all(parent).map_err(|err| DeckError::Storage(err.to_string()))?;
    }

    let mut contents =
        serde_json::to_string_pretty(&record).map_err(|err| DeckError::Storage(err.to_string()))?;
    contents.push('\n');
    fs::write(&deck.file_path, contents).map_err(|err| DeckError::Storage(err.to_string()))
}

fn read_record(path: &Path) -> DeckResult<(DeckLoadStatus, Option<DeckRecord>)> {
    match fs::metadata(path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok((DeckLoadStatus::New, None));
        }
        Err(err) => return Err(DeckError::Storage(err.to_string())),
        Ok(_) => {}
    }
    let contents = fs::read_to_string(path).map_err(|err| DeckError::Storage(err.to_string()))?;
    match serde_json::from_str::<DeckRecord>(&contents) {
        Ok(record) => Ok((DeckLoadStatus::Loaded, Some(record))),
        // An unreadable record resets the deck rather than failing the
        // load; the caller surfaces the status to the user.
        Err(_) => Ok((DeckLoadStatus::Reset, None)),
    }
}
