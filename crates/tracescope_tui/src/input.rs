//! Key bindings for the player.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::io;
use std::time::Duration;

/// Player action decoded from a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Start or pause playback
    TogglePlay,
    /// Back one step
    StepBack,
    /// Forward one step
    StepForward,
    /// Jump to step 0
    SeekStart,
    /// Jump to the last step
    SeekEnd,
    /// Faster playback
    SpeedUp,
    /// Slower playback
    SpeedDown,
    /// Back to step 0, keep play state
    Reset,
    /// Select the next frame tab
    NextFrame,
    /// Select the previous frame tab
    PrevFrame,
    /// Pin or unpin the selected frame
    TogglePin,
    /// Show or hide help
    Help,
    /// Leave the player
    Quit,
    /// Unbound key
    Unknown,
}

/// Key to action table
#[derive(Debug, Clone)]
pub struct KeyBinding {
    bindings: HashMap<KeyCombo, InputEvent>,
}

/// Key code plus modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    /// The key code
    pub code: KeyCode,
    /// Modifiers (ctrl, alt, shift)
    pub modifiers: KeyModifiers,
}

impl KeyCombo {
    /// Create a new key combination
    #[must_use]
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// A plain key without modifiers
    #[must_use]
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::empty())
    }

    /// Ctrl+key
    #[must_use]
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }
}

impl KeyBinding {
    /// Bind a key, replacing any previous action for it
    pub fn bind(&mut self, combo: KeyCombo, event: InputEvent) {
        self.bindings.insert(combo, event);
    }

    /// Action for a key
    #[must_use]
    pub fn lookup(&self, combo: &KeyCombo) -> InputEvent {
        if let Some(event) = self.bindings.get(combo) {
            return *event;
        }
        // Terminals disagree on whether uppercase letters carry SHIFT.
        if let KeyCode::Char(_) = combo.code {
            if combo.modifiers == KeyModifiers::SHIFT {
                return self
                    .bindings
                    .get(&KeyCombo::key(combo.code))
                    .copied()
                    .unwrap_or(InputEvent::Unknown);
            }
        }
        InputEvent::Unknown
    }
}

impl Default for KeyBinding {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        // Playback
        bindings.insert(KeyCombo::key(KeyCode::Char(' ')), InputEvent::TogglePlay);
        bindings.insert(KeyCombo::key(KeyCode::Char('p')), InputEvent::TogglePlay);
        bindings.insert(KeyCombo::key(KeyCode::Char('r')), InputEvent::Reset);
        bindings.insert(KeyCombo::key(KeyCode::Char('+')), InputEvent::SpeedUp);
        bindings.insert(KeyCombo::key(KeyCode::Char('=')), InputEvent::SpeedUp);
        bindings.insert(KeyCombo::key(KeyCode::Char('-')), InputEvent::SpeedDown);

        // Stepping
        bindings.insert(KeyCombo::key(KeyCode::Left), InputEvent::StepBack);
        bindings.insert(KeyCombo::key(KeyCode::Char('h')), InputEvent::StepBack);
        bindings.insert(KeyCombo::key(KeyCode::Right), InputEvent::StepForward);
        bindings.insert(KeyCombo::key(KeyCode::Char('l')), InputEvent::StepForward);
        bindings.insert(KeyCombo::key(KeyCode::Home), InputEvent::SeekStart);
        bindings.insert(KeyCombo::key(KeyCode::Char('g')), InputEvent::SeekStart);
        bindings.insert(KeyCombo::key(KeyCode::End), InputEvent::SeekEnd);
        bindings.insert(KeyCombo::key(KeyCode::Char('G')), InputEvent::SeekEnd);

        // Frames
        bindings.insert(KeyCombo::key(KeyCode::Down), InputEvent::NextFrame);
        bindings.insert(KeyCombo::key(KeyCode::Char('j')), InputEvent::NextFrame);
        bindings.insert(KeyCombo::key(KeyCode::Tab), InputEvent::NextFrame);
        bindings.insert(KeyCombo::key(KeyCode::Up), InputEvent::PrevFrame);
        bindings.insert(KeyCombo::key(KeyCode::Char('k')), InputEvent::PrevFrame);
        bindings.insert(KeyCombo::key(KeyCode::BackTab), InputEvent::PrevFrame);
        bindings.insert(
            KeyCombo::new(KeyCode::BackTab, KeyModifiers::SHIFT),
            InputEvent::PrevFrame,
        );
        bindings.insert(KeyCombo::key(KeyCode::Char('f')), InputEvent::TogglePin);

        bindings.insert(KeyCombo::key(KeyCode::Char('?')), InputEvent::Help);

        // Quit
        bindings.insert(KeyCombo::key(KeyCode::Char('q')), InputEvent::Quit);
        bindings.insert(KeyCombo::key(KeyCode::Esc), InputEvent::Quit);
        bindings.insert(KeyCombo::ctrl(KeyCode::Char('c')), InputEvent::Quit);

        Self { bindings }
    }
}

/// Reads terminal events and maps them to actions
pub struct InputHandler {
    bindings: KeyBinding,
}

impl InputHandler {
    /// Handler with the default bindings
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: KeyBinding::default(),
        }
    }

    /// Handler with custom bindings
    #[must_use]
    pub fn with_bindings(bindings: KeyBinding) -> Self {
        Self { bindings }
    }

    /// Wait up to `timeout` for a key press
    ///
    /// Key releases and non-key events yield `None`.
    ///
    /// # Errors
    ///
    /// Returns error if reading from the terminal fails
    pub fn next_event(&self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind != KeyEventKind::Release {
                    return Ok(Some(self.map_key(key)));
                }
            }
        }
        Ok(None)
    }

    /// Map a key press to an action
    #[must_use]
    pub fn map_key(&self, key: KeyEvent) -> InputEvent {
        self.bindings.lookup(&KeyCombo::new(key.code, key.modifiers))
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Input-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl From<io::Error> for InputError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[test]
    fn test_key_combo_constructors() {
        assert!(KeyCombo::key(KeyCode::Char('j')).modifiers.is_empty());
        assert_eq!(
            KeyCombo::ctrl(KeyCode::Char('c')).modifiers,
            KeyModifiers::CONTROL
        );
    }

    #[test]
    fn test_playback_keys() {
        let handler = InputHandler::new();
        assert_eq!(handler.map_key(press(KeyCode::Char(' '))), InputEvent::TogglePlay);
        assert_eq!(handler.map_key(press(KeyCode::Left)), InputEvent::StepBack);
        assert_eq!(handler.map_key(press(KeyCode::Char('l'))), InputEvent::StepForward);
        assert_eq!(handler.map_key(press(KeyCode::End)), InputEvent::SeekEnd);
        assert_eq!(handler.map_key(press(KeyCode::Char('+'))), InputEvent::SpeedUp);
        assert_eq!(handler.map_key(press(KeyCode::Char('-'))), InputEvent::SpeedDown);
    }

    #[test]
    fn test_shifted_letter_falls_back() {
        let handler = InputHandler::new();
        let shifted = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(handler.map_key(shifted), InputEvent::SeekEnd);
    }

    #[test]
    fn test_frame_keys() {
        let handler = InputHandler::new();
        assert_eq!(handler.map_key(press(KeyCode::Tab)), InputEvent::NextFrame);
        assert_eq!(handler.map_key(press(KeyCode::BackTab)), InputEvent::PrevFrame);
        let shift_tab = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(handler.map_key(shift_tab), InputEvent::PrevFrame);
    }

    #[test]
    fn test_quit_keys() {
        let handler = InputHandler::new();
        assert_eq!(handler.map_key(press(KeyCode::Char('q'))), InputEvent::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handler.map_key(ctrl_c), InputEvent::Quit);
        assert_eq!(handler.map_key(press(KeyCode::Char('c'))), InputEvent::Unknown);
    }

    #[test]
    fn test_custom_binding() {
        let mut bindings = KeyBinding::default();
        bindings.bind(KeyCombo::key(KeyCode::Char('n')), InputEvent::StepForward);
        let handler = InputHandler::with_bindings(bindings);
        assert_eq!(handler.map_key(press(KeyCode::Char('n'))), InputEvent::StepForward);
    }

    #[test]
    fn test_input_error_from_io() {
        let err: InputError = io::Error::new(io::ErrorKind::Other, "tty gone").into();
        assert!(err.to_string().contains("tty gone"));
    }
}
