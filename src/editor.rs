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
use tracing::{debug, info};

use crate::rows::{Row, RowStore};

/// Where the editor is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorState {
    /// The table is showing. Navigation and volume stepping are live.
    Browsing,
    /// A new rate is being typed for the row with this id.
    EditingRate(usize),
    /// The user asked to quit. Terminal.
    Exiting,
}

/// Editor actions, independent of how the terminal reports keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorKey {
    Up,
    Down,
    Confirm,
    Quit,
    ToggleFocus,
    Increment,
    Decrement,
    Input(char),
    Backspace,
}

/// The editor's state machine. Edits go straight to the row store, so the scheduler
/// picks them up on its next tick.
pub struct EditorSession {
    store: RowStore,
    state: EditorState,
    /// Index of the highlighted table row.
    cursor: Option<usize>,
    /// Whether the table captures navigation keys.
    focused: bool,
    /// The rate being typed.
    input: String,
    /// The edited row's rate when editing started.
    placeholder: String,
    volume_step: i32,
}

impl EditorSession {
    /// Creates a session browsing the first row.
    pub fn new(store: RowStore, volume_step: i32) -> EditorSession {
        let cursor = if store.is_empty() { None } else { Some(0) };
        EditorSession {
            store,
            state: EditorState::Browsing,
            cursor,
            focused: true,
            input: String::new(),
            placeholder: String::new(),
            volume_step,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn is_exiting(&self) -> bool {
        self.state == EditorState::Exiting
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    /// The highlighted row with its current values.
    pub fn selected_row(&self) -> Option<Row> {
        self.store.selected(self.cursor)
    }

    /// Applies one key and returns the resulting state.
    pub fn handle(&mut self, key: EditorKey) -> EditorState {
        self.state = match self.state {
            EditorState::Browsing => self.handle_browsing(key),
            EditorState::EditingRate(id) => self.handle_editing(id, key),
            EditorState::Exiting => EditorState::Exiting,
        };
        self.state
    }

    fn handle_browsing(&mut self, key: EditorKey) -> EditorState {
        match key {
            EditorKey::Quit => return EditorState::Exiting,
            EditorKey::ToggleFocus => self.focused = !self.focused,
            EditorKey::Up if self.focused => {
                self.cursor = self.cursor.map(|index| index.saturating_sub(1));
            }
            EditorKey::Down if self.focused => {
                let last = self.store.len().saturating_sub(1);
                self.cursor = self.cursor.map(|index| (index + 1).min(last));
            }
            EditorKey::Confirm => {
                if let Some(row) = self.selected_row() {
                    self.placeholder = row.rate.to_string();
                    self.input.clear();
                    debug!(id = row.id, "Editing rate");
                    return EditorState::EditingRate(row.id);
                }
            }
            EditorKey::Increment => self.step_volume(self.volume_step),
            EditorKey::Decrement => self.step_volume(-self.volume_step),
            _ => {}
        }
        EditorState::Browsing
    }

    fn handle_editing(&mut self, id: usize, key: EditorKey) -> EditorState {
        match key {
            EditorKey::Quit => return EditorState::Exiting,
            EditorKey::Confirm => {
                // Anything that isn't a non-negative integer quietly cancels the edit.
                match self.input.trim().parse::<u32>() {
                    Ok(rate) => {
                        self.store.mutate(id, |row| row.rate = rate);
                        info!(id, rate, "Rate updated");
                    }
                    Err(_) => debug!(id, input = self.input, "Discarding rate edit"),
                }
                self.input.clear();
                return EditorState::Browsing;
            }
            EditorKey::Input(c) => self.input.push(c),
            EditorKey::Backspace => {
                self.input.pop();
            }
            _ => {}
        }
        EditorState::EditingRate(id)
    }

    fn step_volume(&self, amount: i32) {
        if let Some(row) = self.selected_row() {
            self.store.mutate(row.id, |row| row.volume = row.volume.saturating_add(amount));
        }
    }
}
