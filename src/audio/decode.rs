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
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::error::PlaybackError;

/// A fully decoded audio file.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples scaled to [-1, 1].
    pub samples: Vec<f32>,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate of the file.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playback length of the decoded audio.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Decodes the whole file into memory. Supports every format symphonia is built with
/// (WAV, MP3, FLAC, Ogg/Vorbis, ...).
pub fn decode_file(path: &Path) -> Result<DecodedAudio, PlaybackError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| PlaybackError::Open {
        path: display.clone(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Give the probe a hint from the extension, the file contents decide the rest.
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let decode_err = |source: SymphoniaError| PlaybackError::Decode {
        path: display.clone(),
        source,
    };
    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_err)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::NoAudioTrack(display.clone()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_err)?;

    let mut samples = Vec::new();
    let mut buffer: Option<SampleBuffer<f32>> = None;
    while let Some(packet) = next_packet(format_reader.as_mut()).map_err(decode_err)? {
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            // A corrupt packet isn't worth failing the whole clip over.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = %path.display(), err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_err(e)),
        };

        // Some containers don't report the layout up front, so trust the decoded buffers.
        let spec = *decoded.spec();
        channels = spec.channels.count() as u16;
        sample_rate.get_or_insert(spec.rate);

        if decoded.frames() == 0 {
            continue;
        }
        let needed = decoded.capacity() * channels as usize;
        if buffer.as_ref().map_or(true, |buffer| buffer.capacity() < needed) {
            buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buffer) = buffer.as_mut() {
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }
    }

    let sample_rate = sample_rate.ok_or_else(|| PlaybackError::UnknownSampleRate(display.clone()))?;
    if samples.is_empty() || channels == 0 {
        return Err(PlaybackError::Empty(display));
    }

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

/// Reads the next packet, treating an unexpected EOF as the normal end of the stream.
fn next_packet(
    format_reader: &mut dyn FormatReader,
) -> Result<Option<symphonia::core::formats::Packet>, SymphoniaError> {
    match format_reader.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use tempfile::tempdir;

    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_decode_wav() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("tone.wav");
        write_wav(&path, vec![vec![0.5f32, -0.25, 0.125, 0.0]], 22050)?;

        let decoded = decode_file(&path)?;
        assert_eq!(1, decoded.channels);
        assert_eq!(22050, decoded.sample_rate);
        assert_eq!(vec![0.5, -0.25, 0.125, 0.0], decoded.samples);
        assert_eq!(4, decoded.frames());
        Ok(())
    }

    #[test]
    fn test_decode_stereo_is_interleaved() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("stereo.wav");
        write_wav(
            &path,
            vec![vec![0.1f32, 0.2, 0.3], vec![-0.1f32, -0.2, -0.3]],
            44100,
        )?;

        let decoded = decode_file(&path)?;
        assert_eq!(2, decoded.channels);
        assert_eq!(vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3], decoded.samples);
        Ok(())
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempdir().unwrap();
        let err = decode_file(&dir.path().join("missing.mp3")).unwrap_err();
        assert!(matches!(err, PlaybackError::Open { .. }));
        assert!(err.to_string().contains("missing.mp3"));
    }

    #[test]
    fn test_decode_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.clip");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(decode_file(&path).is_err());
    }
}
