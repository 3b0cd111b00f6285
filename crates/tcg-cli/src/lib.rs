use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use tcg_catalog::CatalogClient;
use tcg_core::{CardsSource, Deck, DeckLoadStatus};
use tcg_fs::{default_decks_dir, DeckManager};

#[derive(Parser)]
#[command(name = "tcgdeck", version, about = "TCG deck tracker CLI")]
struct Cli {
    /// Directory holding deck records.
    #[arg(long, global = true)]
    decks_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List decks with a saved record.
    Decks,
    /// Create a new deck.
    Create { name: String },
    /// Show a deck's cards and battle log summary.
    Show { deck: String },
    /// List every card in the resolved catalog.
    Cards { deck: String },
    /// Search the catalog by card name or set.
    Search { deck: String, term: String },
    /// Add one copy of a card to a deck by catalog id.
    Add { deck: String, card_id: String },
    /// Remove one copy of the card at a deck index.
    Remove { deck: String, index: usize },
    /// Record a battle outcome (W or L).
    Battle {
        deck: String,
        result: String,
        /// Opponent name.
        #[arg(long, default_value = "")]
        opponent: String,
    },
    /// Show aggregate battle statistics for a deck.
    Stats { deck: String },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let decks_dir = match cli.decks_dir {
        Some(dir) => dir,
        None => default_decks_dir()?,
    };
    let manager = DeckManager::new(decks_dir, CatalogClient::new())
        .context("failed to initialize deck manager")?;

    match cli.command {
        Command::Decks => list_decks(&manager),
        Command::Create { name } => create_deck(&manager, &name),
        Command::Show { deck } => show_deck(&manager, &deck),
        Command::Cards { deck } => list_cards(&manager, &deck),
        Command::Search { deck, term } => search_cards(&manager, &deck, &term),
        Command::Add { deck, card_id } => add_card(&manager, &deck, &card_id),
        Command::Remove { deck, index } => remove_card(&manager, &deck, index),
        Command::Battle {
            deck,
            result,
            opponent,
        } => record_battle(&manager, &deck, &result, &opponent),
        Command::Stats { deck } => show_stats(&manager, &deck),
    }
}

type Manager = DeckManager<CatalogClient>;

fn list_decks(manager: &Manager) -> Result<()> {
    let decks = manager
        .list_existing_decks()
        .context("failed to list decks")?;
    if decks.is_empty() {
        println!("No saved decks in {}", manager.decks_dir().display());
        return Ok(());
    }
    for deck in decks {
        println!("{deck}");
    }
    Ok(())
}

fn create_deck(manager: &Manager, name: &str) -> Result<()> {
    let deck = manager.create_deck(name).context("failed to create deck")?;
    report_notices(&deck);
    // Persist the empty record immediately so the deck shows up in
    // listings and cannot be created twice.
    manager.save_deck(&deck).context("failed to save deck")?;
    println!("Created deck {} at {}", deck.name, deck.file_path.display());
    Ok(())
}

fn show_deck(manager: &Manager, name: &str) -> Result<()> {
    let deck = load(manager, name)?;
    println!(
        "Deck {} ({} status, cards from {})",
        deck.name,
        deck.load_status.as_str(),
        deck.catalog.source.as_str()
    );
    if deck.cards.is_empty() {
        println!("No cards in the deck.");
    } else {
        for (index, entry) in deck.cards.iter().enumerate() {
            println!("{index}: {} [{}] x{}", entry.name, entry.set, entry.count);
        }
    }
    println!("{} battles recorded", deck.battle_history.len());
    Ok(())
}

fn list_cards(manager: &Manager, name: &str) -> Result<()> {
    let deck = load(manager, name)?;
    for card in deck.available_cards() {
        println!("{}  {} [{}]", card.id, card.name, card.set);
    }
    Ok(())
}

fn search_cards(manager: &Manager, name: &str, term: &str) -> Result<()> {
    let deck = load(manager, name)?;
    let matches = deck.search_cards(term);
    if matches.is_empty() {
        println!("No cards matched \"{}\"", term.trim());
        return Ok(());
    }
    for card in matches {
        println!("{}  {} [{}]", card.id, card.name, card.set);
    }
    Ok(())
}

fn add_card(manager: &Manager, name: &str, card_id: &str) -> Result<()> {
    let mut deck = load(manager, name)?;
    let result = deck.add_card_by_id(card_id)?;

    if !result.added {
        if result.entry.is_some() {
            println!(
                "Not added: {} [{}] is already at {} copies for that printing.",
                result.card.name, result.card.set, result.set_copies
            );
        } else {
            println!(
                "Not added: {} is already at {} copies across all sets.",
                result.card.name, result.total_copies
            );
        }
        return Ok(());
    }

    manager.save_deck(&deck).context("failed to save deck")?;
    println!(
        "Added {} [{}] ({} in this set, {} total)",
        result.card.name, result.card.set, result.set_copies, result.total_copies
    );
    Ok(())
}

fn remove_card(manager: &Manager, name: &str, index: usize) -> Result<()> {
    let mut deck = load(manager, name)?;
    let entry = deck.remove_card(index)?;
    manager.save_deck(&deck).context("failed to save deck")?;
    println!("Removed one {} [{}]", entry.name, entry.set);
    Ok(())
}

fn record_battle(manager: &Manager, name: &str, result: &str, opponent: &str) -> Result<()> {
    let mut deck = load(manager, name)?;
    deck.record_battle(result, opponent, Local::now())?;
    manager.save_deck(&deck).context("failed to save deck")?;
    if let Some(record) = deck.battle_history.last() {
        println!(
            "Recorded {} vs {} at {}",
            record.result, record.opponent, record.date
        );
    }
    Ok(())
}

fn show_stats(manager: &Manager, name: &str) -> Result<()> {
    let deck = load(manager, name)?;
    let stats = deck.stats();

    println!("Total battles: {}", stats.total_battles);
    if stats.total_battles == 0 {
        return Ok(());
    }
    println!("Wins: {}", stats.wins);
    println!("Losses: {}", stats.losses);
    println!("Win percentage: {:.2}%", stats.win_percentage);
    if !stats.loss_by_opponent.is_empty() {
        println!("Losses by opponent:");
        for (opponent, count) in &stats.loss_by_opponent {
            println!("  {opponent}: {count}");
        }
    }
    Ok(())
}

fn load(manager: &Manager, name: &str) -> Result<Deck> {
    let deck = manager.load_deck(name).context("failed to load deck")?;
    report_notices(&deck);
    Ok(deck)
}

fn report_notices(deck: &Deck) {
    if let Some(warning) = &deck.catalog.warning {
        eprintln!("warning: {warning}");
    }
    if deck.catalog.source == CardsSource::Local {
        eprintln!("warning: using the local card cache; the catalog may be stale");
    }
    if deck.load_status == DeckLoadStatus::Reset {
        eprintln!(
            "warning: the record for {} could not be read; starting with an empty deck",
            deck.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn battle_opponent_defaults_to_blank() {
        let cli = Cli::try_parse_from(["tcgdeck", "battle", "main", "W"]).expect("parse");
        match cli.command {
            Command::Battle {
                deck,
                result,
                opponent,
            } => {
                assert_eq!(deck, "main");
                assert_eq!(result, "W");
                assert_eq!(opponent, "");
            }
            _ => panic!("expected battle command"),
        }
    }

    #[test]
    fn decks_dir_flag_is_global() {
        let cli = Cli::try_parse_from(["tcgdeck", "decks", "--decks-dir", "/tmp/decks"])
            .expect("parse");
        assert_eq!(cli.decks_dir, Some(PathBuf::from("/tmp/decks")));
    }
}
