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
use std::{error::Error, fmt, sync::Arc, thread, time::Duration};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{debug, error, info, span, Level};

use super::error::PlaybackError;
use super::loader::LoadedClip;
use super::mixer::ClipMixer;
use super::{Output as AudioOutput, OutputFormat, DEFAULT_DEVICE};

/// An output backed by a cpal device. The device isn't touched until the first clip
/// needs to play, and a failed open is retried on the next play.
pub struct Output {
    /// The device name, or "default" for the host's default output.
    name: String,
    /// Target output latency, used to size the stream buffer.
    latency: Duration,
    /// Maximum number of clips playing at once.
    max_voices: usize,
    /// The open stream, if any.
    stream: Mutex<Option<OpenStream>>,
}

/// A running output stream. The cpal stream itself lives on its own thread, since it
/// can't be moved between threads on every platform.
struct OpenStream {
    format: OutputFormat,
    mixer: Arc<Mutex<ClipMixer>>,
    /// Dropping this tells the stream thread to shut down.
    shutdown_tx: Option<crossbeam_channel::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        drop(self.shutdown_tx.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Output {
    /// Creates an output for the named device. Nothing is opened yet.
    pub fn new(name: &str, latency: Duration, max_voices: usize) -> Output {
        Output {
            name: name.to_string(),
            latency,
            max_voices,
            stream: Mutex::new(None),
        }
    }

    /// Opens the device and starts the stream thread. Returns once the stream is
    /// playing or has failed to start.
    fn open(&self) -> Result<OpenStream, PlaybackError> {
        let span = span!(Level::INFO, "open output");
        let _enter = span.enter();

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let name = self.name.clone();
        let latency = self.latency;
        let max_voices = self.max_voices;

        let thread = thread::Builder::new()
            .name("soundscape-output".to_string())
            .spawn(move || {
                let started = start_stream(&name, latency, max_voices);
                match started {
                    Ok((stream, format, mixer)) => {
                        if ready_tx.send(Ok((format, mixer))).is_err() {
                            return;
                        }
                        // Keep the stream alive until the output is dropped.
                        let _ = shutdown_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok((format, mixer))) => {
                info!(device = self.name, %format, "Output stream started");
                Ok(OpenStream {
                    format,
                    mixer,
                    shutdown_tx: Some(shutdown_tx),
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(PlaybackError::DeviceUnavailable(
                    "output thread exited before the stream started".to_string(),
                ))
            }
        }
    }

    /// Runs the given function against the open stream, opening it first if needed.
    fn with_stream<T>(&self, f: impl FnOnce(&OpenStream) -> T) -> Result<T, PlaybackError> {
        let mut stream = self.stream.lock();
        if stream.is_none() {
            *stream = Some(self.open()?);
        }
        match stream.as_ref() {
            Some(open) => Ok(f(open)),
            None => Err(PlaybackError::DeviceUnavailable(self.name.clone())),
        }
    }
}

impl AudioOutput for Output {
    fn format(&self) -> Result<OutputFormat, PlaybackError> {
        self.with_stream(|stream| stream.format)
    }

    fn play(&self, clip: LoadedClip, gain: f32) -> Result<(), PlaybackError> {
        self.with_stream(|stream| {
            let mut mixer = stream.mixer.lock();
            mixer.add(&clip, gain);
            debug!(voices = mixer.active_voices(), gain, "Clip queued");
        })
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (latency {:?})", self.name, self.latency)
    }
}

/// Finds the named output device on the default host.
fn find_device(name: &str) -> Result<cpal::Device, PlaybackError> {
    let host = cpal::default_host();
    if name == DEFAULT_DEVICE {
        return host.default_output_device().ok_or_else(|| {
            PlaybackError::DeviceUnavailable("no default output device".to_string())
        });
    }

    host.output_devices()
        .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?
        .find(|device| device.name().is_ok_and(|n| n.trim() == name))
        .ok_or_else(|| PlaybackError::DeviceUnavailable(format!("no output device named {name}")))
}

/// Opens the device and starts a stream that plays whatever the returned mixer holds.
fn start_stream(
    name: &str,
    latency: Duration,
    max_voices: usize,
) -> Result<(cpal::Stream, OutputFormat, Arc<Mutex<ClipMixer>>), PlaybackError> {
    let device = find_device(name)?;
    let supported = device.default_output_config()?;
    let format = OutputFormat::new(supported.sample_rate(), supported.channels());

    // Aim for the configured latency, within whatever the device allows.
    let frames = format.frames_for(latency);
    let frames = match supported.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => frames.max(*min).min(*max),
        cpal::SupportedBufferSize::Unknown => frames,
    };
    let mut config = supported.config();
    config.buffer_size = cpal::BufferSize::Fixed(frames);
    info!(device = name, %format, buffer_frames = frames, "Opening output device");

    let mixer = Arc::new(Mutex::new(ClipMixer::new(format.channels, max_voices)));
    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer.clone())?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer.clone())?,
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, mixer.clone())?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer.clone())?,
        other => return Err(PlaybackError::UnsupportedSampleFormat(other.to_string())),
    };
    stream.play()?;

    Ok((stream, format, mixer))
}

/// Builds an output stream that mixes into f32 and converts to the device's sample type.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<Mutex<ClipMixer>>,
) -> Result<cpal::Stream, PlaybackError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            mixer.lock().mix_into(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!(err = err.to_string(), "Output stream error"),
        None,
    )?;
    Ok(stream)
}

/// Lists every output device the available hosts know about.
pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout()?;
    let _shh_stderr = shh::stderr()?;

    let mut devices: Vec<String> = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(name) = device.name() else {
                continue;
            };
            let description = match device.default_output_config() {
                Ok(supported) => format!(
                    "{} ({}) ({})",
                    name.trim(),
                    OutputFormat::new(supported.sample_rate(), supported.channels()),
                    host_id.name()
                ),
                Err(_) => continue,
            };
            devices.push(description);
        }
    }

    devices.sort();
    Ok(devices)
}
