//! Keyboard handling and interactive view state.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Interactive state shared with the renderer.
#[derive(Debug, Default, Clone)]
pub struct InteractiveState {
    /// Selected row in the visible line list.
    pub cursor_index: usize,
    /// Whether the filter input is capturing keystrokes.
    pub filter_mode: bool,
    /// The filter pattern as typed.
    pub filter_pattern: String,
}

/// What a keypress means, given whether the filter input is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Move the cursor up (clamped).
    CursorUp,
    /// Move the cursor down (clamped).
    CursorDown,
    /// Open the selected entry with the OS handler.
    Open,
    /// Enter filter mode with an empty pattern.
    EnterFilter,
    /// Leave filter mode and clear the pattern.
    ClearFilter,
    /// Append a character to the filter pattern.
    FilterInput(char),
    /// Delete one character from the filter pattern.
    FilterBackspace,
    /// Exit cleanly.
    Quit,
    /// Unknown key; do nothing.
    Noop,
}

/// Map a key event to an action. `j`/`k` navigate only while the filter
/// input is inactive; in filter mode printable characters edit the pattern.
pub fn action_for(key: KeyEvent, filter_mode: bool) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => KeyAction::Quit,
            _ => KeyAction::Noop,
        };
    }

    match key.code {
        KeyCode::Up => KeyAction::CursorUp,
        KeyCode::Down => KeyAction::CursorDown,
        KeyCode::Enter => KeyAction::Open,
        KeyCode::Esc => KeyAction::ClearFilter,
        KeyCode::Backspace if filter_mode => KeyAction::FilterBackspace,
        KeyCode::Char('/') if !filter_mode => KeyAction::EnterFilter,
        KeyCode::Char('k') if !filter_mode => KeyAction::CursorUp,
        KeyCode::Char('j') if !filter_mode => KeyAction::CursorDown,
        KeyCode::Char(c) if filter_mode => KeyAction::FilterInput(c),
        _ => KeyAction::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_navigate_in_both_modes() {
        assert_eq!(action_for(key(KeyCode::Up), false), KeyAction::CursorUp);
        assert_eq!(action_for(key(KeyCode::Up), true), KeyAction::CursorUp);
        assert_eq!(action_for(key(KeyCode::Down), true), KeyAction::CursorDown);
    }

    #[test]
    fn vim_keys_are_suppressed_while_filtering() {
        assert_eq!(action_for(key(KeyCode::Char('k')), false), KeyAction::CursorUp);
        assert_eq!(action_for(key(KeyCode::Char('j')), false), KeyAction::CursorDown);
        assert_eq!(
            action_for(key(KeyCode::Char('k')), true),
            KeyAction::FilterInput('k')
        );
        assert_eq!(
            action_for(key(KeyCode::Char('j')), true),
            KeyAction::FilterInput('j')
        );
    }

    #[test]
    fn slash_enters_filter_mode_once() {
        assert_eq!(action_for(key(KeyCode::Char('/')), false), KeyAction::EnterFilter);
        // A second slash is pattern input.
        assert_eq!(
            action_for(key(KeyCode::Char('/')), true),
            KeyAction::FilterInput('/')
        );
    }

    #[test]
    fn ctrl_c_always_quits() {
        let quit = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for(quit, false), KeyAction::Quit);
        assert_eq!(action_for(quit, true), KeyAction::Quit);
    }

    #[test]
    fn backspace_edits_only_in_filter_mode() {
        assert_eq!(
            action_for(key(KeyCode::Backspace), true),
            KeyAction::FilterBackspace
        );
        assert_eq!(action_for(key(KeyCode::Backspace), false), KeyAction::Noop);
    }

    #[test]
    fn unknown_keys_are_noops() {
        assert_eq!(action_for(key(KeyCode::F(5)), false), KeyAction::Noop);
        assert_eq!(action_for(key(KeyCode::Char('x')), false), KeyAction::Noop);
    }
}
