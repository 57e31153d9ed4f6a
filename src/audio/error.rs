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
/// Error types for decoding and playing a clip. None of these are fatal: the scheduler
/// reports them and moves on to the next row.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("{path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Decode {
        path: String,
        source: symphonia::core::errors::Error,
    },

    #[error("{0}: no audio track found")]
    NoAudioTrack(String),

    #[error("{0}: sample rate not specified")]
    UnknownSampleRate(String),

    #[error("{0}: no samples decoded")]
    Empty(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Unsupported output sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Unable to read output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Unable to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Unable to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}
