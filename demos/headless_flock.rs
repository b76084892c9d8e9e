//! # Headless flock
//!
//! Runs the engine without a window and prints how the flock spreads out.
//! Useful for profiling the CPU frame on machines without a GPU.
//!
//! Run with: `cargo run --example headless_flock --release -- [low|medium|high|ultra]`

use std::sync::Arc;

use choreo::prelude::*;

fn main() -> Result<(), DeckError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let tier = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<QualityTier>().ok())
        .unwrap_or(QualityTier::High);

    let deck = Deck::new(
        vec![Slide::new(Behavior::Flock, "Flock").with_subtitle("headless")],
        VariantConfig::minimal(),
    )?;
    let mut engine = Engine::create(Arc::new(deck), tier, EngineOptions::new())?;

    println!("=== Headless flock ({} particles) ===", engine.state().count());
    let mut clock = FrameClock::new();
    for second in 1..=10 {
        for _ in 0..60 {
            engine.tick(1.0 / 60.0);
        }
        let state = engine.state();
        let n = state.len().max(1) as f32;
        let (mut spread, mut speed) = (0.0, 0.0);
        for i in 0..state.len() {
            spread += state.position(i).length();
            speed += state.velocity(i).length();
        }
        println!(
            "t={:>2}s  mean radius {:.3}  mean speed {:.3}  wall {:.1} ms/s",
            second,
            spread / n,
            speed / n,
            clock.tick() * 1000.0
        );
    }
    engine.destroy();
    Ok(())
}
