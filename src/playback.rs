//! Slide navigation state machine.
//!
//! The controller only tracks *which* slide is current, the restart counter
//! and the HUD flag. The engine watches those values and reacts to changes;
//! it never receives a "restart happened" event, so two restarts in a row
//! are two distinct counter values.

/// A discrete navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckCommand {
    Next,
    Previous,
    First,
    Last,
    /// Zero-based slide index.
    Jump(usize),
    Restart,
    ToggleHud,
    Exit,
}

/// Something the embedding host has to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    /// Leave the deck and return to the host.
    Exit,
}

#[derive(Debug, Clone)]
pub struct PlaybackController {
    index: usize,
    len: usize,
    restart: u64,
    hud_visible: bool,
}

impl PlaybackController {
    /// Start at slide 0 of a deck with `len` slides.
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len,
            restart: 0,
            hud_visible: true,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Monotonic restart counter.
    #[inline]
    pub fn restart_counter(&self) -> u64 {
        self.restart
    }

    #[inline]
    pub fn hud_visible(&self) -> bool {
        self.hud_visible
    }

    /// Advance one slide. No-op on the last slide.
    pub fn next(&mut self) -> bool {
        self.jump(self.index + 1)
    }

    /// Go back one slide. No-op on the first slide.
    pub fn previous(&mut self) -> bool {
        match self.index.checked_sub(1) {
            Some(i) => self.jump(i),
            None => false,
        }
    }

    /// Move to `index`; out-of-range requests are ignored.
    pub fn jump(&mut self, index: usize) -> bool {
        if index >= self.len || index == self.index {
            return false;
        }
        self.index = index;
        true
    }

    pub fn first(&mut self) -> bool {
        self.jump(0)
    }

    pub fn last(&mut self) -> bool {
        match self.len.checked_sub(1) {
            Some(i) => self.jump(i),
            None => false,
        }
    }

    /// Bump the restart counter. The index does not change.
    pub fn restart(&mut self) {
        self.restart = self.restart.wrapping_add(1);
    }

    pub fn toggle_hud(&mut self) {
        self.hud_visible = !self.hud_visible;
    }

    /// Apply one command.
    pub fn apply(&mut self, command: DeckCommand) -> Option<HostRequest> {
        match command {
            DeckCommand::Next => {
                self.next();
            }
            DeckCommand::Previous => {
                self.previous();
            }
            DeckCommand::First => {
                self.first();
            }
            DeckCommand::Last => {
                self.last();
            }
            DeckCommand::Jump(i) => {
                self.jump(i);
            }
            DeckCommand::Restart => self.restart(),
            DeckCommand::ToggleHud => self.toggle_hud(),
            DeckCommand::Exit => return Some(HostRequest::Exit),
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_clamps() {
        let mut p = PlaybackController::new(3);
        assert!(!p.previous());
        assert_eq!(p.index(), 0);
        assert!(p.next());
        assert!(p.next());
        assert!(!p.next());
        assert_eq!(p.index(), 2);
    }

    #[test]
    fn test_jump_first_last() {
        let mut p = PlaybackController::new(5);
        assert!(p.last());
        assert_eq!(p.index(), 4);
        assert!(!p.jump(5));
        assert_eq!(p.index(), 4);
        assert!(p.first());
        assert_eq!(p.index(), 0);
        assert!(p.jump(3));
        assert_eq!(p.index(), 3);
    }

    #[test]
    fn test_restart_counter_keeps_index() {
        let mut p = PlaybackController::new(4);
        p.jump(2);
        p.restart();
        p.restart();
        assert_eq!(p.restart_counter(), 2);
        assert_eq!(p.index(), 2);
    }

    #[test]
    fn test_apply() {
        let mut p = PlaybackController::new(2);
        assert_eq!(p.apply(DeckCommand::Next), None);
        assert_eq!(p.index(), 1);
        assert_eq!(p.apply(DeckCommand::ToggleHud), None);
        assert!(!p.hud_visible());
        assert_eq!(p.apply(DeckCommand::Exit), Some(HostRequest::Exit));
    }

    #[test]
    fn test_empty_deck() {
        let mut p = PlaybackController::new(0);
        assert!(!p.next());
        assert!(!p.last());
        assert!(p.is_empty());
    }
}
