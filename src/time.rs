//! Frame clock.
//!
//! Measures wall-clock time between frames. The raw delta feeds the
//! performance monitor; the engine clamps it separately before it reaches
//! the integrator.
//!
//! # Example
//!
//! ```ignore
//! use choreo::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//!
//! // once per redraw:
//! let dt = clock.tick();
//! engine.tick(dt);
//! ```

use std::time::{Duration, Instant};

/// Wall-clock frame timing.
#[derive(Debug)]
pub struct FrameClock {
    origin: Instant,
    previous: Instant,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            origin: now,
            previous: now,
            frames: 0,
        }
    }

    /// Mark a frame. Returns the seconds since the previous one.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Mark a frame at `now`. An instant earlier than the previous mark
    /// yields zero.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.previous).as_secs_f32();
        self.previous = now;
        self.frames += 1;
        dt
    }

    /// Frames marked since creation or the last reset.
    pub fn frame(&self) -> u64 {
        self.frames
    }

    /// Span from the origin to the latest mark.
    pub fn elapsed(&self) -> Duration {
        self.previous.saturating_duration_since(self.origin)
    }

    /// Restart from now without reporting the gap as a frame delta.
    ///
    /// Called once rendering is up so setup time never shows up as the
    /// first frame.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_clock_is_empty() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_tick_at() {
        let mut clock = FrameClock::new();
        let t0 = clock.previous;
        let dt = clock.tick_at(t0 + Duration::from_millis(20));
        assert!((dt - 0.02).abs() < 1e-4);
        assert_eq!(clock.frame(), 1);
        assert_eq!(clock.elapsed(), Duration::from_millis(20));
    }

    #[test]
    fn test_backwards_instant_is_zero() {
        let mut clock = FrameClock::new();
        let t0 = clock.previous;
        clock.tick_at(t0 + Duration::from_millis(50));
        assert_eq!(clock.tick_at(t0), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut clock = FrameClock::new();
        let t0 = clock.previous;
        clock.tick_at(t0 + Duration::from_millis(30));
        clock.reset();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
