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
mod assets;
mod audio;
mod config;
mod editor;
mod playback;
mod playsync;
mod rows;
mod scheduler;
#[cfg(test)]
mod test;
#[cfg(test)]
mod testutil;
mod tui;

use std::error::Error;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{crate_version, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, Settings};
use crate::editor::EditorSession;
use crate::playback::{PlaybackInvoker, Player};
use crate::playsync::CancelHandle;
use crate::rows::RowStore;
use crate::scheduler::TriggerScheduler;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An ambient soundscape player."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays the sounds in the given directory and opens the editor.
    Play {
        /// The directory holding the sound clips.
        sounds_dir: PathBuf,
        /// The path to a settings file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// How often every sound gets a chance to play, e.g. 1s.
        #[arg(short, long)]
        tick: Option<String>,
        /// How much one volume key press changes a sound's volume.
        #[arg(long)]
        volume_step: Option<i32>,
        /// The audio device to play through.
        #[arg(short, long)]
        device: Option<String>,
        /// Seeds the trigger random source.
        #[arg(long)]
        seed: Option<u64>,
        /// Writes logs to this file while the editor owns the terminal.
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Lists and verifies all sounds in the given directory.
    Sounds {
        /// The directory holding the sound clips.
        sounds_dir: PathBuf,
    },
    /// Lists the available audio output devices.
    Devices {},
}

/// The default log filter when RUST_LOG isn't set.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            sounds_dir,
            config,
            tick,
            volume_step,
            device,
            seed,
            log_file,
        } => {
            // The editor owns the terminal, so logs go to a file or nowhere.
            match log_file {
                Some(log_file) => tracing_subscriber::fmt()
                    .with_env_filter(env_filter())
                    .with_ansi(false)
                    .with_writer(Mutex::new(File::create(log_file)?))
                    .init(),
                None => tracing_subscriber::fmt()
                    .with_env_filter(env_filter())
                    .with_writer(io::sink)
                    .init(),
            }

            let overrides = Overrides {
                tick,
                volume_step,
                device,
                seed,
            };
            play(&sounds_dir, config.as_deref(), &overrides)?;
        }
        Commands::Sounds { sounds_dir } => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(io::stderr)
                .init();

            let sounds = assets::discover(&sounds_dir)?;
            if sounds.is_empty() {
                println!("No sounds found in {}.", sounds_dir.display());
                return Ok(());
            }

            println!("Sounds (count: {}):", sounds.len());
            let mut failures = 0;
            for sound in sounds.iter() {
                match audio::decode::decode_file(&sounds_dir.join(sound)) {
                    Ok(decoded) => println!(
                        "- {} ({} channels, {}Hz, {:.1}s)",
                        sound,
                        decoded.channels,
                        decoded.sample_rate,
                        decoded.duration().as_secs_f64()
                    ),
                    Err(e) => {
                        failures += 1;
                        println!("- {} (unplayable: {})", sound, e);
                    }
                }
            }

            if failures > 0 {
                return Err(format!("{} of {} sounds can't be played", failures, sounds.len()).into());
            }
        }
        Commands::Devices {} => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(io::stderr)
                .init();

            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}

/// Starts the scheduler in the background and runs the editor until the user quits.
fn play(sounds_dir: &Path, config: Option<&Path>, overrides: &Overrides) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load(config, overrides)?;
    let filenames = assets::discover(sounds_dir)?;
    if filenames.is_empty() {
        warn!(dir = ?sounds_dir, "No sounds found");
    }

    let store = RowStore::from_filenames(&filenames, settings.volume_limits());
    let output = audio::get_output(settings.device(), settings.latency()?, settings.max_voices());
    info!(output = %output, "Using audio output");
    let player: Arc<dyn Player> = Arc::new(PlaybackInvoker::new(sounds_dir, output));

    let (reports_tx, reports_rx) = crossbeam_channel::unbounded();
    let scheduler = TriggerScheduler::new(store.clone(), settings.tick()?)?.with_reports(reports_tx);
    let rng = match settings.seed() {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let cancel_handle = CancelHandle::new();
    let scheduler_handle = scheduler.spawn(player, rng, cancel_handle.clone())?;

    let mut session = EditorSession::new(store, settings.volume_step());
    let result = tui::run(&mut session, &reports_rx, settings.table_height());

    cancel_handle.cancel();
    if scheduler_handle.join().is_err() {
        error!("Scheduler thread panicked");
    }

    Ok(result?)
}
