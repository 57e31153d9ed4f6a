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
// Sums every playing clip into the output buffer. Kept independent of cpal so the
// mixing can be tested without an audio device.
//
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::loader::LoadedClip;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// One clip that's currently playing.
struct Voice {
    /// Unique ID for this voice, increasing with start order.
    id: u64,
    /// The clip's interleaved samples.
    data: Arc<Vec<f32>>,
    /// Linear amplitude multiplier.
    gain: f32,
    /// Next sample index to read.
    position: usize,
}

/// Mixes any number of clips, up to a voice limit, into interleaved output.
pub struct ClipMixer {
    voices: Vec<Voice>,
    channels: u16,
    max_voices: usize,
}

impl ClipMixer {
    /// Creates a new mixer for the given channel count.
    pub fn new(channels: u16, max_voices: usize) -> ClipMixer {
        ClipMixer {
            voices: Vec::new(),
            channels: channels.max(1),
            max_voices: max_voices.max(1),
        }
    }

    /// Starts playing the clip at the given gain. If the voice limit is reached, the
    /// oldest voice is stopped to make room.
    pub fn add(&mut self, clip: &LoadedClip, gain: f32) -> u64 {
        if self.voices.len() >= self.max_voices {
            if let Some(oldest) = self.voices.iter().map(|v| v.id).min() {
                self.voices.retain(|v| v.id != oldest);
                warn!(
                    max_voices = self.max_voices,
                    "Voice limit reached, stealing oldest"
                );
            }
        }

        let id = NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed);
        self.voices.push(Voice {
            id,
            data: clip.data().clone(),
            gain,
            position: 0,
        });
        id
    }

    /// Number of voices still playing.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Fills the interleaved output buffer, overwriting whatever was there. Finished
    /// voices are dropped.
    pub fn mix_into(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let usable = output.len() - output.len() % self.channels as usize;

        self.voices.retain_mut(|voice| {
            let remaining = voice.data.len().saturating_sub(voice.position);
            let count = remaining.min(usable);
            let source = &voice.data[voice.position..voice.position + count];
            for (out, sample) in output[..count].iter_mut().zip(source) {
                *out += sample * voice.gain;
            }
            voice.position += count;
            voice.position < voice.data.len()
        });

        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OutputFormat;

    fn clip(samples: Vec<f32>) -> LoadedClip {
        LoadedClip::new(samples, OutputFormat::new(44100, 2))
    }

    #[test]
    fn test_mix_applies_gain() {
        let mut mixer = ClipMixer::new(2, 8);
        mixer.add(&clip(vec![0.25, -0.25, 0.1, 0.2]), 2.0);

        let mut output = vec![9.0; 6];
        mixer.mix_into(&mut output);
        assert_eq!(vec![0.5, -0.5, 0.2, 0.4, 0.0, 0.0], output);
        assert_eq!(0, mixer.active_voices());
    }

    #[test]
    fn test_mix_sums_and_clamps() {
        let mut mixer = ClipMixer::new(2, 8);
        mixer.add(&clip(vec![0.5, 0.3]), 1.0);
        mixer.add(&clip(vec![0.25, 0.9]), 1.0);

        let mut output = vec![0.0; 2];
        mixer.mix_into(&mut output);
        assert_eq!(vec![0.75, 1.0], output);
    }

    #[test]
    fn test_voice_spans_buffers() {
        let mut mixer = ClipMixer::new(2, 8);
        mixer.add(&clip(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]), 1.0);

        let mut output = vec![0.0; 4];
        mixer.mix_into(&mut output);
        assert_eq!(vec![0.1, 0.2, 0.3, 0.4], output);
        assert_eq!(1, mixer.active_voices());

        mixer.mix_into(&mut output);
        assert_eq!(vec![0.5, 0.6, 0.0, 0.0], output);
        assert_eq!(0, mixer.active_voices());
    }

    #[test]
    fn test_voice_limit_steals_oldest() {
        let mut mixer = ClipMixer::new(2, 2);
        mixer.add(&clip(vec![0.1, 0.1]), 1.0);
        mixer.add(&clip(vec![0.2, 0.2]), 1.0);
        mixer.add(&clip(vec![0.4, 0.4]), 1.0);
        assert_eq!(2, mixer.active_voices());

        let mut output = vec![0.0; 2];
        mixer.mix_into(&mut output);
        assert!((output[0] - 0.6).abs() < 1e-6);
    }
}
