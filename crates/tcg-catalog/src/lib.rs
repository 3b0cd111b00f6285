//! Card catalog resolution: a remote card database first, with a
//! local-file fallback.
//!
//! The remote attempt fetches two JSON documents (cards and sets) and is
//! all-or-nothing; any network, status, or decode failure falls back to a
//! cached file of already-shaped cards. Only failure of both sources is
//! fatal, surfaced through [`tcg_core::CatalogProvider`].

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use tcg_core::{Card, Catalog, CatalogProvider, CardsSource, DeckError, DeckResult};

const CARDS_URL: &str =
    "https://raw.githubusercontent.com/flibustier/pokemon-tcg-pocket-database/main/dist/cards.json";
const SETS_URL: &str =
    "https://raw.githubusercontent.com/flibustier/pokemon-tcg-pocket-database/main/dist/sets.json";

/// Default path of the local cache used when the remote database is
/// unreachable.
pub const LOCAL_CARDS_FILE: &str = "valid_cards.json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors produced while resolving the card catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The HTTP request failed or its body did not decode.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The remote endpoint answered with a non-OK status.
    #[error("unexpected status code {0}")]
    Status(reqwest::StatusCode),
    /// Reading the local cache failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The local cache did not decode as a card array.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// Both the remote and local sources failed.
    #[error("remote error: {remote}; local error: {local}")]
    Unavailable {
        remote: Box<CatalogError>,
        local: Box<CatalogError>,
    },
}

/// Raw card element of the remote cards document. The printed number
/// arrives as either a JSON number or a string.
#[derive(Debug, Deserialize)]
struct RemoteCard {
    #[serde(default)]
    set: String,
    #[serde(default)]
    number: serde_json::Value,
    #[serde(default)]
    label: HashMap<String, String>,
}

/// Raw set element of the remote sets document.
#[derive(Debug, Deserialize)]
struct RemoteSet {
    #[serde(default)]
    code: String,
    #[serde(default)]
    label: HashMap<String, String>,
}

/// Two-tier catalog resolver.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    cards_url: String,
    sets_url: String,
    local_path: PathBuf,
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient {
    /// Create a client against the fixed production endpoints and the
    /// default local cache path.
    pub fn new() -> Self {
        Self {
            cards_url: CARDS_URL.into(),
            sets_url: SETS_URL.into(),
            local_path: PathBuf::from(LOCAL_CARDS_FILE),
        }
    }

    /// Override the remote endpoints, for tests or mirrors.
    pub fn with_endpoints(cards_url: impl Into<String>, sets_url: impl Into<String>) -> Self {
        Self {
            cards_url: cards_url.into(),
            sets_url: sets_url.into(),
            local_path: PathBuf::from(LOCAL_CARDS_FILE),
        }
    }

    /// Override the local cache location.
    #[must_use]
    pub fn local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = path.into();
        self
    }

    fn try_resolve(&self) -> Result<Catalog, CatalogError> {
        let remote_err = match self.fetch_remote() {
            Ok(cards) => {
                return Ok(Catalog {
                    cards,
                    source: CardsSource::Remote,
                    warning: None,
                })
            }
            Err(err) => err,
        };

        match self.load_local() {
            Ok(cards) => Ok(Catalog {
                cards,
                source: CardsSource::Local,
                warning: Some(remote_err.to_string()),
            }),
            Err(local_err) => Err(CatalogError::Unavailable {
                remote: Box::new(remote_err),
                local: Box::new(local_err),
            }),
        }
    }

    fn fetch_remote(&self) -> Result<Vec<Card>, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let raw_cards: Vec<RemoteCard> = fetch_json(&client, &self.cards_url)?;
        let raw_sets: Vec<RemoteSet> = fetch_json(&client, &self.sets_url)?;

        Ok(build_cards(&raw_cards, &set_names(&raw_sets)))
    }

    fn load_local(&self) -> Result<Vec<Card>, CatalogError> {
        let contents = fs::read_to_string(&self.local_path)?;
        let mut cards: Vec<Card> = serde_json::from_str(&contents)?;
        for card in &mut cards {
            card.name = card.name.trim().to_string();
            card.set = card.set.trim().to_string();
            card.id = card.id.trim().to_string();
        }
        Ok(cards)
    }
}

impl CatalogProvider for CatalogClient {
    fn resolve(&self) -> DeckResult<Catalog> {
        self.try_resolve()
            .map_err(|err| DeckError::Catalog(err.to_string()))
    }
}

fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<T, CatalogError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(CatalogError::Status(response.status()));
    }
    Ok(response.json()?)
}

/// Build the lowercase set-code to display-name mapping, skipping entries
/// without a code.
fn set_names(raw_sets: &[RemoteSet]) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for set in raw_sets {
        if set.code.is_empty() {
            continue;
        }
        names.insert(set.code.to_lowercase(), pick_label(&set.label, &set.code));
    }
    names
}

/// Pick an English label, preferring `eng` then `en`, falling back to the
/// given default.
fn pick_label(label: &HashMap<String, String>, fallback: &str) -> String {
    for key in ["eng", "en"] {
        if let Some(value) = label.get(key) {
            if !value.trim().is_empty() {
                return value.clone();
            }
        }
    }
    fallback.to_string()
}

/// Shape raw remote cards into catalog cards. Records with a blank set
/// code, an unparseable number, or no usable English name are skipped,
/// never fatal.
fn build_cards(raw_cards: &[RemoteCard], set_names: &HashMap<String, String>) -> Vec<Card> {
    let mut cards = Vec::new();
    for raw in raw_cards {
        let set_code = raw.set.trim();
        if set_code.is_empty() {
            continue;
        }
        let Some(number) = parse_card_number(&raw.number) else {
            continue;
        };
        let name = pick_label(&raw.label, "").trim().to_string();
        if name.is_empty() {
            continue;
        }

        let set_name = set_names
            .get(&set_code.to_lowercase())
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| set_code.to_string());

        cards.push(Card {
            name,
            set: format!("{set_name} ({set_code})"),
            id: format!("{}-{number:03}", set_code.to_lowercase()),
        });
    }
    cards
}

/// Reduce the ad-hoc numeric-or-string card number to a non-negative
/// integer, or `None` when it cannot be.
fn parse_card_number(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(number) => {
            number.as_u64().and_then(|number| u32::try_from(number).ok())
        }
        serde_json::Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn pick_label_prefers_eng_then_en() {
        let both = labels(&[("eng", "Genetic Apex"), ("en", "Other"), ("fr", "Apex")]);
        assert_eq!(pick_label(&both, "A1"), "Genetic Apex");

        let en_only = labels(&[("en", "Genetic Apex")]);
        assert_eq!(pick_label(&en_only, "A1"), "Genetic Apex");

        let blank_eng = labels(&[("eng", "   "), ("en", "Genetic Apex")]);
        assert_eq!(pick_label(&blank_eng, "A1"), "Genetic Apex");

        assert_eq!(pick_label(&labels(&[("fr", "Apex")]), "A1"), "A1");
    }

    #[test]
    fn parse_card_number_accepts_numeric_and_string_forms() {
        assert_eq!(parse_card_number(&json!(45)), Some(45));
        assert_eq!(parse_card_number(&json!("45")), Some(45));
        assert_eq!(parse_card_number(&json!(" 7 ")), Some(7));
        assert_eq!(parse_card_number(&json!(0)), Some(0));
        assert_eq!(parse_card_number(&json!(-3)), None);
        assert_eq!(parse_card_number(&json!("-3")), None);
        assert_eq!(parse_card_number(&json!("abc")), None);
        assert_eq!(parse_card_number(&json!("")), None);
        assert_eq!(parse_card_number(&json!(null)), None);
        assert_eq!(parse_card_number(&json!(4.5)), None);
    }

    #[test]
    fn build_cards_formats_set_and_id() {
        let raw = vec![RemoteCard {
            set: "A1".into(),
            number: json!(45),
            label: labels(&[("eng", "Charmander")]),
        }];
        let names = HashMap::from([("a1".to_string(), "Genetic Apex".to_string())]);

        let cards = build_cards(&raw, &names);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "Charmander");
        assert_eq!(cards[0].set, "Genetic Apex (A1)");
        assert_eq!(cards[0].id, "a1-045");
    }

    #[test]
    fn build_cards_falls_back_to_raw_set_code() {
        let raw = vec![RemoteCard {
            set: "P-A".into(),
            number: json!("7"),
            label: labels(&[("en", "Potion")]),
        }];

        let cards = build_cards(&raw, &HashMap::new());
        assert_eq!(cards[0].set, "P-A (P-A)");
        assert_eq!(cards[0].id, "p-a-007");
    }

    #[test]
    fn build_cards_skips_unusable_records() {
        let raw = vec![
            RemoteCard {
                set: "  ".into(),
                number: json!(1),
                label: labels(&[("eng", "Blank Set")]),
            },
            RemoteCard {
                set: "A1".into(),
                number: json!("x"),
                label: labels(&[("eng", "Bad Number")]),
            },
            RemoteCard {
                set: "A1".into(),
                number: json!(2),
                label: labels(&[("fr", "Pas de nom")]),
            },
            RemoteCard {
                set: "A1".into(),
                number: json!(3),
                label: labels(&[("eng", "Kept")]),
            },
        ];

        let cards = build_cards(&raw, &HashMap::new());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "a1-003");
    }

    #[test]
    fn local_cache_is_trimmed_on_load() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("valid_cards.json");
        fs::write(
            &path,
            r#"[{"name": " Pikachu ", "set": " Genetic Apex (A1) ", "id": " a1-001 "}]"#,
        )
        .expect("write cache");

        let client = CatalogClient::new().local_path(&path);
        let cards = client.load_local().expect("load cache");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "Pikachu");
        assert_eq!(cards[0].set, "Genetic Apex (A1)");
        assert_eq!(cards[0].id, "a1-001");
    }

    #[test]
    fn resolve_falls_back_to_local_cache_with_warning() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("valid_cards.json");
        fs::write(
            &path,
            r#"[{"name": "Pikachu", "set": "Genetic Apex (A1)", "id": "a1-001"}]"#,
        )
        .expect("write cache");

        // A closed local port makes the remote attempt fail fast.
        let client = CatalogClient::with_endpoints(
            "http://127.0.0.1:9/cards.json",
            "http://127.0.0.1:9/sets.json",
        )
        .local_path(&path);

        let catalog = client.try_resolve().expect("fallback");
        assert_eq!(catalog.source, CardsSource::Local);
        assert!(catalog.warning.is_some());
        assert_eq!(catalog.cards.len(), 1);
    }

    #[test]
    fn resolve_fails_when_both_sources_fail() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let client = CatalogClient::with_endpoints(
            "http://127.0.0.1:9/cards.json",
            "http://127.0.0.1:9/sets.json",
        )
        .local_path(dir.path().join("missing.json"));

        let err = client.try_resolve().unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable { .. }));

        let deck_err = CatalogProvider::resolve(&client).unwrap_err();
        assert!(matches!(deck_err, DeckError::Catalog(_)));
    }
}
