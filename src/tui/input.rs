// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::editor::{EditorKey, EditorState};

/// Waits up to the timeout for a key press and maps it for the given editor state.
pub fn poll_key(timeout: Duration, state: EditorState) -> io::Result<Option<EditorKey>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }

    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(map_key(key, state)),
        _ => Ok(None),
    }
}

/// Maps a terminal key to an editor key. The same key means different things while
/// browsing and while typing a rate.
pub fn map_key(key: KeyEvent, state: EditorState) -> Option<EditorKey> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(EditorKey::Quit),
            _ => None,
        };
    }

    match state {
        EditorState::Browsing => match key.code {
            KeyCode::Char('q') => Some(EditorKey::Quit),
            KeyCode::Esc => Some(EditorKey::ToggleFocus),
            KeyCode::Enter => Some(EditorKey::Confirm),
            KeyCode::Char('h') | KeyCode::Left => Some(EditorKey::Decrement),
            KeyCode::Char('l') | KeyCode::Right => Some(EditorKey::Increment),
            KeyCode::Char('j') | KeyCode::Down => Some(EditorKey::Down),
            KeyCode::Char('k') | KeyCode::Up => Some(EditorKey::Up),
            _ => None,
        },
        EditorState::EditingRate(_) => match key.code {
            KeyCode::Enter => Some(EditorKey::Confirm),
            KeyCode::Esc => Some(EditorKey::Quit),
            KeyCode::Backspace => Some(EditorKey::Backspace),
            KeyCode::Char(c) => Some(EditorKey::Input(c)),
            _ => None,
        },
        EditorState::Exiting => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_browsing_keys() {
        let state = EditorState::Browsing;
        assert_eq!(Some(EditorKey::Quit), map_key(key(KeyCode::Char('q')), state));
        assert_eq!(Some(EditorKey::Quit), map_key(ctrl('c'), state));
        assert_eq!(Some(EditorKey::ToggleFocus), map_key(key(KeyCode::Esc), state));
        assert_eq!(Some(EditorKey::Confirm), map_key(key(KeyCode::Enter), state));
        for code in [KeyCode::Char('h'), KeyCode::Left] {
            assert_eq!(Some(EditorKey::Decrement), map_key(key(code), state));
        }
        for code in [KeyCode::Char('l'), KeyCode::Right] {
            assert_eq!(Some(EditorKey::Increment), map_key(key(code), state));
        }
        for code in [KeyCode::Char('j'), KeyCode::Down] {
            assert_eq!(Some(EditorKey::Down), map_key(key(code), state));
        }
        for code in [KeyCode::Char('k'), KeyCode::Up] {
            assert_eq!(Some(EditorKey::Up), map_key(key(code), state));
        }
        assert_eq!(None, map_key(key(KeyCode::Char('7')), state));
    }

    #[test]
    fn test_editing_keys() {
        let state = EditorState::EditingRate(1);
        assert_eq!(Some(EditorKey::Confirm), map_key(key(KeyCode::Enter), state));
        assert_eq!(Some(EditorKey::Quit), map_key(key(KeyCode::Esc), state));
        assert_eq!(Some(EditorKey::Quit), map_key(ctrl('c'), state));
        assert_eq!(Some(EditorKey::Backspace), map_key(key(KeyCode::Backspace), state));
        // Letters are input while editing, even the ones that mean something when browsing.
        assert_eq!(
            Some(EditorKey::Input('q')),
            map_key(key(KeyCode::Char('q')), state)
        );
        assert_eq!(
            Some(EditorKey::Input('4')),
            map_key(key(KeyCode::Char('4')), state)
        );
        assert_eq!(None, map_key(key(KeyCode::Up), state));
    }

    #[test]
    fn test_exiting_ignores_keys() {
        assert_eq!(None, map_key(key(KeyCode::Enter), EditorState::Exiting));
    }
}
