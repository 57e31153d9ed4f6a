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
use std::time::Duration;

/// The format an output plays, and so the format clips are converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl OutputFormat {
    /// Creates a new output format.
    pub fn new(sample_rate: u32, channels: u16) -> OutputFormat {
        OutputFormat {
            sample_rate,
            channels,
        }
    }

    /// The number of frames that covers the given latency at this sample rate.
    pub fn frames_for(&self, latency: Duration) -> u32 {
        let frames = (self.sample_rate as f64 * latency.as_secs_f64()).round();
        (frames as u32).max(1)
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::new(44100, 2)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz, {} channels", self.sample_rate, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_for_latency() {
        assert_eq!(8820, OutputFormat::new(44100, 2).frames_for(Duration::from_millis(200)));
        assert_eq!(9600, OutputFormat::new(48000, 2).frames_for(Duration::from_millis(200)));
        assert_eq!(1, OutputFormat::new(48000, 2).frames_for(Duration::ZERO));
    }
}
