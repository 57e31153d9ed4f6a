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
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::decode::{decode_file, DecodedAudio};
use super::error::PlaybackError;
use super::OutputFormat;

/// A clip decoded and converted to the output format, ready to hand to the mixer.
/// The sample data is stored in an Arc so overlapping plays share it.
#[derive(Clone, Debug)]
pub struct LoadedClip {
    /// Interleaved samples in the output's channel layout.
    data: Arc<Vec<f32>>,
    /// The format the samples were converted to.
    format: OutputFormat,
}

impl LoadedClip {
    /// Creates a clip from samples that are already in the given format.
    pub fn new(data: Vec<f32>, format: OutputFormat) -> LoadedClip {
        LoadedClip {
            data: Arc::new(data),
            format,
        }
    }

    /// The interleaved samples.
    pub fn data(&self) -> &Arc<Vec<f32>> {
        &self.data
    }

    /// The format the samples are in.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Number of frames in the clip.
    pub fn frames(&self) -> usize {
        self.data.len() / self.format.channels.max(1) as usize
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Loads clips from disk and caches them by path, so a clip is only decoded the first
/// time it's triggered.
pub struct ClipLoader {
    cache: HashMap<PathBuf, LoadedClip>,
}

impl ClipLoader {
    /// Creates a new, empty loader.
    pub fn new() -> ClipLoader {
        ClipLoader {
            cache: HashMap::new(),
        }
    }

    /// Loads the clip at the given path converted to the given format. Returns the
    /// cached copy if it's already been loaded for that format.
    pub fn load(&mut self, path: &Path, format: OutputFormat) -> Result<LoadedClip, PlaybackError> {
        if let Some(clip) = self.cache.get(path) {
            if clip.format() == format {
                debug!(path = ?path, "Using cached clip");
                return Ok(clip.clone());
            }
        }

        info!(path = ?path, "Loading clip into memory");
        let decoded = decode_file(path)?;
        let source_channels = decoded.channels;
        let source_rate = decoded.sample_rate;
        let clip = convert(decoded, format);

        info!(
            path = ?path,
            source_channels,
            source_rate,
            channels = format.channels,
            sample_rate = format.sample_rate,
            memory_kb = clip.memory_size() / 1024,
            "Clip loaded"
        );

        self.cache.insert(path.to_path_buf(), clip.clone());
        Ok(clip)
    }

    /// Returns the total memory used by cached clips.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(LoadedClip::memory_size).sum()
    }
}

impl Default for ClipLoader {
    fn default() -> Self {
        ClipLoader::new()
    }
}

impl std::fmt::Debug for ClipLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipLoader")
            .field("cached_clips", &self.cache.len())
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Converts decoded audio to the output's channel layout and sample rate.
pub fn convert(decoded: DecodedAudio, format: OutputFormat) -> LoadedClip {
    let samples = remap_channels(&decoded.samples, decoded.channels, format.channels);
    let samples = if decoded.sample_rate != format.sample_rate {
        transcode(
            &samples,
            format.channels,
            decoded.sample_rate,
            format.sample_rate,
        )
    } else {
        samples
    };
    LoadedClip::new(samples, format)
}

/// Maps interleaved samples from one channel count to another. Mono is spread to every
/// output channel, anything wider is averaged down to mono, and extra output channels
/// past the source's are left silent.
fn remap_channels(samples: &[f32], source_channels: u16, target_channels: u16) -> Vec<f32> {
    let source = source_channels.max(1) as usize;
    let target = target_channels.max(1) as usize;
    if source == target {
        return samples.to_vec();
    }

    let frames = samples.len() / source;
    let mut output = Vec::with_capacity(frames * target);
    for frame in samples.chunks_exact(source) {
        if source == 1 {
            output.extend(std::iter::repeat(frame[0]).take(target));
        } else if target == 1 {
            output.push(frame.iter().sum::<f32>() / source as f32);
        } else {
            for channel in 0..target {
                output.push(frame.get(channel).copied().unwrap_or(0.0));
            }
        }
    }
    output
}

/// Resamples interleaved audio by interpolating linearly between neighbouring frames.
/// The final frame is held for any output that lands past it.
fn transcode(samples: &[f32], channels: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == 0 || target_rate == 0 {
        return samples.to_vec();
    }
    let frames: Vec<&[f32]> = samples.chunks_exact(channels.max(1) as usize).collect();
    let Some(last) = frames.last() else {
        return Vec::new();
    };

    let step = source_rate as f64 / target_rate as f64;
    let length = (frames.len() as f64 / step).ceil() as usize;
    let mut output = Vec::with_capacity(length * last.len());
    for position in (0..length).map(|n| n as f64 * step) {
        let current = frames.get(position as usize).unwrap_or(last);
        let next = frames.get(position as usize + 1).unwrap_or(current);
        let weight = position.fract() as f32;
        output.extend(
            current
                .iter()
                .zip(next.iter())
                .map(|(from, to)| from + (to - from) * weight),
        );
    }
    output
}
