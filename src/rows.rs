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

//! The shared row table.
//!
//! Every sound clip gets exactly one [`Row`] at startup. The editor mutates rows in place
//! while the trigger scheduler reads them from another thread, so all access goes through
//! [`RowStore`], which serializes reads and writes behind a single lock.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

/// The rate a freshly discovered clip starts with. Zero never plays.
pub const DEFAULT_RATE: u32 = 0;

/// The volume a freshly discovered clip starts with. This is unity gain.
pub const DEFAULT_VOLUME: i32 = 100;

/// One sound clip's editable record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// 1-based position assigned at load time.
    pub id: usize,
    /// The asset's file name, relative to the sounds directory.
    pub filename: String,
    /// Expected number of triggers per hour.
    pub rate: u32,
    /// Playback volume. 100 is unity gain.
    pub volume: i32,
}

impl Row {
    /// Creates a row with the default rate and volume.
    pub fn new(id: usize, filename: &str) -> Row {
        Row {
            id,
            filename: filename.to_string(),
            rate: DEFAULT_RATE,
            volume: DEFAULT_VOLUME,
        }
    }

    /// Renders the row as the display strings the table widget holds.
    pub fn to_table_row(&self) -> TableRow {
        TableRow {
            id: self.id.to_string(),
            name: self.filename.clone(),
            rate: self.rate.to_string(),
            volume: self.volume.to_string(),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}/hr, volume {})",
            self.id, self.filename, self.rate, self.volume
        )
    }
}

/// The display-string form of a row, one string per table column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    pub id: String,
    pub name: String,
    pub rate: String,
    pub volume: String,
}

/// The lowest volume any limit may go down to.
pub const VOLUME_FLOOR: i32 = -1000;

/// The highest volume any limit may go up to. Gain doubles every 50 steps, so this keeps
/// it well inside f32 range.
pub const VOLUME_CEILING: i32 = 1000;

/// Hard bounds applied to every stored volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeLimits {
    pub min: i32,
    pub max: i32,
}

impl VolumeLimits {
    /// Creates new limits. The bounds are swapped if given in the wrong order, and both
    /// are held within [VOLUME_FLOOR, VOLUME_CEILING].
    pub fn new(min: i32, max: i32) -> VolumeLimits {
        let min = min.clamp(VOLUME_FLOOR, VOLUME_CEILING);
        let max = max.clamp(VOLUME_FLOOR, VOLUME_CEILING);
        if min <= max {
            VolumeLimits { min, max }
        } else {
            VolumeLimits { min: max, max: min }
        }
    }

    /// Clamps the given volume into the limits.
    pub fn clamp(&self, volume: i32) -> i32 {
        volume.clamp(self.min, self.max)
    }
}

impl Default for VolumeLimits {
    fn default() -> Self {
        VolumeLimits { min: 0, max: 200 }
    }
}

/// Reasons a batch replacement is rejected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("expected {expected} rows, got {actual}")]
    RowCount { expected: usize, actual: usize },

    #[error("row at position {position} has id {id:?}, expected {expected}")]
    IdMismatch {
        position: usize,
        id: String,
        expected: usize,
    },

    #[error("row {id} has filename {actual:?}, expected {expected:?}")]
    FilenameChanged {
        id: usize,
        expected: String,
        actual: String,
    },

    #[error("row {id} has an invalid volume {value:?}")]
    InvalidVolume { id: usize, value: String },
}

/// The ordered, shared collection of rows. Clones share the same table.
#[derive(Clone)]
pub struct RowStore {
    rows: Arc<RwLock<Vec<Row>>>,
    limits: VolumeLimits,
}

impl RowStore {
    /// Builds a store with one row per file name, in listing order. Duplicate names are
    /// dropped so that every file name is unique within the store.
    pub fn from_filenames<S: AsRef<str>>(filenames: &[S], limits: VolumeLimits) -> RowStore {
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(filenames.len());
        for filename in filenames {
            let filename = filename.as_ref();
            if !seen.insert(filename.to_string()) {
                warn!(filename, "Skipping duplicate sound file name");
                continue;
            }
            rows.push(Row::new(rows.len() + 1, filename));
        }
        debug!(rows = rows.len(), "Row store created");

        RowStore {
            rows: Arc::new(RwLock::new(rows)),
            limits,
        }
    }

    /// Returns a copy of every row. Later edits never show up in a snapshot that's
    /// already been taken.
    pub fn snapshot(&self) -> Vec<Row> {
        self.rows.read().clone()
    }

    /// Returns a copy of the row with the given id.
    #[allow(dead_code)]
    pub fn get(&self, id: usize) -> Option<Row> {
        self.rows.read().iter().find(|row| row.id == id).cloned()
    }

    /// Resolves a table cursor position against the current rows.
    pub fn selected(&self, cursor: Option<usize>) -> Option<Row> {
        cursor.and_then(|index| self.rows.read().get(index).cloned())
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Applies the change to exactly one row. Returns false if no row has the given id.
    /// The id and file name can't be changed this way.
    pub fn mutate<F>(&self, id: usize, f: F) -> bool
    where
        F: FnOnce(&mut Row),
    {
        let mut rows = self.rows.write();
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            debug!(id, "Ignoring mutation of unknown row");
            return false;
        };

        let mut edited = row.clone();
        f(&mut edited);
        row.rate = edited.rate;
        row.volume = self.limits.clamp(edited.volume);
        true
    }

    /// Replaces the whole table with the given display rows. Every row is validated
    /// before anything is written, so a rejected batch leaves the table untouched.
    /// A rate that isn't a non-negative integer keeps that row's current rate.
    #[allow(dead_code)]
    pub fn replace_all(&self, table: &[TableRow]) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if table.len() != rows.len() {
            return Err(StoreError::RowCount {
                expected: rows.len(),
                actual: table.len(),
            });
        }

        let mut replacement = Vec::with_capacity(rows.len());
        for (position, (current, new)) in rows.iter().zip(table).enumerate() {
            if new.id.trim().parse::<usize>().ok() != Some(current.id) {
                return Err(StoreError::IdMismatch {
                    position,
                    id: new.id.clone(),
                    expected: current.id,
                });
            }
            if new.name != current.filename {
                return Err(StoreError::FilenameChanged {
                    id: current.id,
                    expected: current.filename.clone(),
                    actual: new.name.clone(),
                });
            }
            let volume =
                new.volume
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| StoreError::InvalidVolume {
                        id: current.id,
                        value: new.volume.clone(),
                    })?;
            let rate = new.rate.trim().parse::<u32>().unwrap_or(current.rate);

            replacement.push(Row {
                id: current.id,
                filename: current.filename.clone(),
                rate,
                volume: self.limits.clamp(volume),
            });
        }

        *rows = replacement;
        Ok(())
    }
}

impl fmt::Debug for RowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStore")
            .field("rows", &self.len())
            .field("limits", &self.limits)
            .finish()
    }
}
