//! Keyboard and pointer handling.
//!
//! Raw window events become [`DeckCommand`]s. Navigation is edge-triggered:
//! a key fires once when it goes down and not again until it has been
//! released, so auto-repeat never skips slides.
//!
//! | Keys | Command |
//! |---|---|
//! | `→` `↓` `Space` `PageDown`, left click | next |
//! | `←` `↑` `PageUp` `Backspace`, right click | previous |
//! | `Home` / `End` | first / last |
//! | `1`..`9` | jump |
//! | `R` | restart |
//! | `H` | toggle HUD |
//! | `Esc` | exit |

use std::collections::HashSet;

use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::playback::DeckCommand;

/// Command bound to a key, if any.
pub fn command_for_key(key: KeyCode) -> Option<DeckCommand> {
    let command = match key {
        KeyCode::ArrowRight | KeyCode::ArrowDown | KeyCode::Space | KeyCode::PageDown => {
            DeckCommand::Next
        }
        KeyCode::ArrowLeft | KeyCode::ArrowUp | KeyCode::PageUp | KeyCode::Backspace => {
            DeckCommand::Previous
        }
        KeyCode::Home => DeckCommand::First,
        KeyCode::End => DeckCommand::Last,
        KeyCode::Digit1 => DeckCommand::Jump(0),
        KeyCode::Digit2 => DeckCommand::Jump(1),
        KeyCode::Digit3 => DeckCommand::Jump(2),
        KeyCode::Digit4 => DeckCommand::Jump(3),
        KeyCode::Digit5 => DeckCommand::Jump(4),
        KeyCode::Digit6 => DeckCommand::Jump(5),
        KeyCode::Digit7 => DeckCommand::Jump(6),
        KeyCode::Digit8 => DeckCommand::Jump(7),
        KeyCode::Digit9 => DeckCommand::Jump(8),
        KeyCode::KeyR => DeckCommand::Restart,
        KeyCode::KeyH => DeckCommand::ToggleHud,
        KeyCode::Escape => DeckCommand::Exit,
        _ => return None,
    };
    Some(command)
}

/// Command bound to a mouse button, if any.
pub fn command_for_button(button: MouseButton) -> Option<DeckCommand> {
    match button {
        MouseButton::Left => Some(DeckCommand::Next),
        MouseButton::Right => Some(DeckCommand::Previous),
        _ => None,
    }
}

/// Edge detector over held keys.
#[derive(Debug, Default)]
pub struct DeckInput {
    keys_held: HashSet<KeyCode>,
}

impl DeckInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key went down. Returns a command only on the first press.
    pub fn press(&mut self, key: KeyCode) -> Option<DeckCommand> {
        if self.keys_held.insert(key) {
            command_for_key(key)
        } else {
            None
        }
    }

    pub fn release(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }

    /// Forget held keys, e.g. after focus loss when releases are not seen.
    pub fn clear(&mut self) {
        self.keys_held.clear();
    }

    /// Translate one winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<DeckCommand> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return None;
                };
                match event.state {
                    ElementState::Pressed if !event.repeat => self.press(key),
                    ElementState::Pressed => None,
                    ElementState::Released => {
                        self.release(key);
                        None
                    }
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => command_for_button(*button),
            WindowEvent::Focused(false) => {
                self.clear();
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_map() {
        for key in [KeyCode::ArrowRight, KeyCode::ArrowDown, KeyCode::Space, KeyCode::PageDown] {
            assert_eq!(command_for_key(key), Some(DeckCommand::Next));
        }
        for key in [KeyCode::ArrowLeft, KeyCode::ArrowUp, KeyCode::PageUp, KeyCode::Backspace] {
            assert_eq!(command_for_key(key), Some(DeckCommand::Previous));
        }
        assert_eq!(command_for_key(KeyCode::Digit1), Some(DeckCommand::Jump(0)));
        assert_eq!(command_for_key(KeyCode::Digit9), Some(DeckCommand::Jump(8)));
        assert_eq!(command_for_key(KeyCode::Escape), Some(DeckCommand::Exit));
        assert_eq!(command_for_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn test_held_key_fires_once() {
        let mut input = DeckInput::new();
        assert_eq!(input.press(KeyCode::ArrowRight), Some(DeckCommand::Next));
        assert_eq!(input.press(KeyCode::ArrowRight), None);
        input.release(KeyCode::ArrowRight);
        assert_eq!(input.press(KeyCode::ArrowRight), Some(DeckCommand::Next));
    }

    #[test]
    fn test_clear_forgets_held() {
        let mut input = DeckInput::new();
        input.press(KeyCode::KeyR);
        input.clear();
        assert_eq!(input.press(KeyCode::KeyR), Some(DeckCommand::Restart));
    }

    #[test]
    fn test_pointer() {
        assert_eq!(command_for_button(MouseButton::Left), Some(DeckCommand::Next));
        assert_eq!(command_for_button(MouseButton::Right), Some(DeckCommand::Previous));
        assert_eq!(command_for_button(MouseButton::Middle), None);
    }
}
