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
use std::{error::Error, fmt, sync::Arc, time::Duration};

pub mod cpal;
pub mod decode;
pub mod error;
pub mod format;
pub mod loader;
pub mod mixer;
pub mod mock;

pub use error::PlaybackError;
pub use format::OutputFormat;
pub use loader::{ClipLoader, LoadedClip};

/// The device name that selects the host's default output.
pub const DEFAULT_DEVICE: &str = "default";

/// Something clips can be played through. Plays are fire-and-forget: `play` returns as
/// soon as the clip is queued and overlapping clips mix together.
pub trait Output: fmt::Display + Send + Sync {
    /// The format clips need to be converted to before playing. Opens the output if it
    /// isn't open yet.
    fn format(&self) -> Result<OutputFormat, PlaybackError>;

    /// Starts playing the clip at the given linear gain.
    fn play(&self, clip: LoadedClip, gain: f32) -> Result<(), PlaybackError>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::list()
}

/// Gets the output with the given name. Names starting with "mock" get a mock output.
/// Real devices aren't opened until the first clip plays.
pub fn get_output(device: &str, latency: Duration, max_voices: usize) -> Arc<dyn Output> {
    if device.starts_with("mock") {
        return Arc::new(mock::Output::get(device));
    }

    Arc::new(cpal::Output::new(device, latency, max_voices))
}
