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
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::info;

use super::error::PlaybackError;
use super::loader::LoadedClip;
use super::{OutputFormat, Output as AudioOutput};

/// A clip handed to the mock output.
#[derive(Clone, Debug)]
#[allow(dead_code)]
pub struct MockPlay {
    /// Number of frames in the clip.
    pub frames: usize,
    /// Gain it was played at.
    pub gain: f32,
}

/// A mock output. Doesn't actually play anything, it records what it was asked to play.
pub struct Output {
    name: String,
    format: OutputFormat,
    plays: Mutex<Vec<MockPlay>>,
    fail_open: AtomicBool,
}

impl Output {
    /// Gets the given mock output.
    pub fn get(name: &str) -> Output {
        Output {
            name: name.to_string(),
            format: OutputFormat::default(),
            plays: Mutex::new(Vec::new()),
            fail_open: AtomicBool::new(false),
        }
    }

    /// Makes every following open attempt fail like a missing device would.
    #[cfg(test)]
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::Relaxed);
    }

    /// Returns everything played so far.
    #[cfg(test)]
    pub fn plays(&self) -> Vec<MockPlay> {
        self.plays.lock().clone()
    }
}

impl AudioOutput for Output {
    fn format(&self) -> Result<OutputFormat, PlaybackError> {
        if self.fail_open.load(Ordering::Relaxed) {
            return Err(PlaybackError::DeviceUnavailable(self.name.clone()));
        }
        Ok(self.format)
    }

    fn play(&self, clip: LoadedClip, gain: f32) -> Result<(), PlaybackError> {
        info!(
            output = self.name,
            frames = clip.frames(),
            gain,
            "Playing clip (mock)."
        );
        self.plays.lock().push(MockPlay {
            frames: clip.frames(),
            gain,
        });
        Ok(())
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
