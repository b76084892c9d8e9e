//! # Deck from JSON
//!
//! Loads a deck description and presents it.
//!
//! Run with: `cargo run --example deck_from_json --release -- demos/decks/sample.json`

use choreo::prelude::*;

fn main() -> Result<(), EngineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/decks/sample.json".to_string());
    let deck = Deck::from_path(&path)?;
    println!("Loaded {} slides from {} (variant {})", deck.len(), path, deck.variant.name);

    let options = EngineOptions::new().with_run_id(7);
    if let DeckExit::Unavailable(err) = run_deck(deck, options)? {
        eprintln!("rendering unavailable: {}", err);
    }
    Ok(())
}
