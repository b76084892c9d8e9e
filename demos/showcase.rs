//! # Showcase
//!
//! Every behavior, one slide each, with the chosen variant.
//!
//! Run with: `cargo run --example showcase --release -- [aurora|noir|minimal]`
//!
//! Keys: arrows / space to navigate, `R` restart, `H` toggle the HUD,
//! `Esc` to exit. Set `CHOREO_TIER` or `CHOREO_REDUCED_MOTION=1` to try the
//! other quality paths.

use choreo::prelude::*;

fn main() -> Result<(), EngineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let variant = match std::env::args().nth(1).as_deref() {
        Some("noir") => VariantConfig::noir(),
        Some("minimal") => VariantConfig::minimal(),
        _ => VariantConfig::aurora(),
    };

    let mut deck = Deck::showcase();
    deck.variant = variant;

    match run_deck(deck, EngineOptions::new())? {
        DeckExit::Unavailable(err) => {
            eprintln!("rendering unavailable: {}", err);
            std::process::exit(2);
        }
        exit => log::info!("deck finished: {:?}", exit),
    }
    Ok(())
}
