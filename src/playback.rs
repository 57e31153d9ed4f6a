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
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, span, Level};

use crate::audio::{ClipLoader, Output, PlaybackError};
use crate::rows::Row;

/// Converts a row volume to a linear amplitude multiplier. 100 is unity, and every 50
/// steps doubles or halves the amplitude.
pub fn gain_for_volume(volume: i32) -> f32 {
    ((volume as f32 - 100.0) / 50.0).exp2()
}

/// Plays triggered rows.
pub trait Player: Send + Sync {
    /// Starts playing the row's clip and returns the gain it was played at. Returns as
    /// soon as the clip is queued.
    fn play(&self, row: &Row) -> Result<f32, PlaybackError>;
}

/// Resolves a row's file in the sounds directory, decodes it and hands it to the output.
pub struct PlaybackInvoker {
    sounds_dir: PathBuf,
    output: Arc<dyn Output>,
    loader: Mutex<ClipLoader>,
}

impl PlaybackInvoker {
    /// Creates a new invoker that plays files from the given directory.
    pub fn new(sounds_dir: &Path, output: Arc<dyn Output>) -> PlaybackInvoker {
        PlaybackInvoker {
            sounds_dir: sounds_dir.to_path_buf(),
            output,
            loader: Mutex::new(ClipLoader::new()),
        }
    }
}

impl Player for PlaybackInvoker {
    fn play(&self, row: &Row) -> Result<f32, PlaybackError> {
        let span = span!(Level::INFO, "play", id = row.id, filename = row.filename);
        let _enter = span.enter();

        let path = self.sounds_dir.join(&row.filename);
        let gain = gain_for_volume(row.volume);
        let format = self.output.format()?;
        let clip = self.loader.lock().load(&path, format)?;
        debug!(frames = clip.frames(), gain, output = %self.output, "Queueing clip");
        self.output.play(clip, gain)?;
        Ok(gain)
    }
}

/// The outcome of one triggered row.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackReport {
    Played {
        id: usize,
        filename: String,
        gain: f32,
    },
    Failed {
        id: usize,
        filename: String,
        error: String,
    },
}

impl PlaybackReport {
    /// The id of the row this report is about.
    #[cfg(test)]
    pub fn id(&self) -> usize {
        match self {
            PlaybackReport::Played { id, .. } | PlaybackReport::Failed { id, .. } => *id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PlaybackReport::Failed { .. })
    }
}

impl fmt::Display for PlaybackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackReport::Played { id, filename, gain } => {
                write!(f, "Played {} ({}) at gain {:.2}", filename, id, gain)
            }
            PlaybackReport::Failed {
                id,
                filename,
                error,
            } => write!(f, "Unable to play {} ({}): {}", filename, id, error),
        }
    }
}
