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
use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::debug;

use crate::audio::DEFAULT_DEVICE;
use crate::rows::{VolumeLimits, VOLUME_CEILING, VOLUME_FLOOR};

mod error;

pub use error::ConfigError;

const DEFAULT_TICK: Duration = Duration::from_secs(1);
const DEFAULT_VOLUME_STEP: i32 = 5;
const DEFAULT_MIN_VOLUME: i32 = 0;
const DEFAULT_MAX_VOLUME: i32 = 200;
const DEFAULT_LATENCY: Duration = Duration::from_millis(200);
const DEFAULT_MAX_VOICES: usize = 32;
const DEFAULT_TABLE_HEIGHT: u16 = 7;

/// Environment variables with this prefix override the settings file.
const ENV_PREFIX: &str = "SOUNDSCAPE";

/// Values given on the command line. These win over the file and the environment.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub tick: Option<String>,
    pub volume_step: Option<i32>,
    pub device: Option<String>,
    pub seed: Option<u64>,
}

/// Player settings. Every key is optional and falls back to a default.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Settings {
    /// How often the scheduler rolls for every row, e.g. "1s".
    tick: Option<String>,

    /// How much one volume key press changes a row's volume.
    volume_step: Option<i32>,

    min_volume: Option<i32>,
    max_volume: Option<i32>,

    /// Output device name, "default" for the host default, or "mock..." for no audio.
    device: Option<String>,

    /// Target output latency, e.g. "200ms".
    latency: Option<String>,

    /// Maximum number of clips playing at once.
    max_voices: Option<usize>,

    /// Seeds the trigger random source, making a session's triggers repeatable.
    seed: Option<u64>,

    /// Number of table rows shown at once.
    table_height: Option<u16>,
}

impl Settings {
    /// Loads settings from the optional file and the environment, then applies the
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = ?path, "Loading settings file");
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("tick", overrides.tick.clone())?
            .set_override_option("volume_step", overrides.volume_step.map(i64::from))?
            .set_override_option("device", overrides.device.clone())?
            .set_override_option("seed", overrides.seed)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks every value, so bad settings fail at startup instead of mid-session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tick = self.tick()?;
        if tick.is_zero() {
            return Err(invalid("tick", "must be greater than zero"));
        }
        self.latency()?;
        let (min, max) = (self.min_volume(), self.max_volume());
        for (key, volume) in [("min_volume", min), ("max_volume", max)] {
            if !(VOLUME_FLOOR..=VOLUME_CEILING).contains(&volume) {
                return Err(invalid(
                    key,
                    &format!("{volume} is outside {VOLUME_FLOOR}..={VOLUME_CEILING}"),
                ));
            }
        }
        if min > max {
            return Err(invalid(
                "min_volume",
                &format!("{min} is greater than max_volume {max}"),
            ));
        }
        let range = max
            .checked_sub(min)
            .ok_or_else(|| invalid("max_volume", "volume range is too large"))?;
        let step = self.volume_step();
        if step <= 0 {
            return Err(invalid("volume_step", "must be greater than zero"));
        }
        if step > range.max(1) {
            return Err(invalid(
                "volume_step",
                &format!("{step} is larger than the volume range {min}..={max}"),
            ));
        }
        if self.max_voices() == 0 {
            return Err(invalid("max_voices", "must be at least 1"));
        }
        if self.table_height() == 0 {
            return Err(invalid("table_height", "must be at least 1"));
        }
        Ok(())
    }

    /// Returns the scheduler tick period.
    pub fn tick(&self) -> Result<Duration, ConfigError> {
        parse_duration("tick", self.tick.as_deref(), DEFAULT_TICK)
    }

    pub fn volume_step(&self) -> i32 {
        self.volume_step.unwrap_or(DEFAULT_VOLUME_STEP)
    }

    pub fn min_volume(&self) -> i32 {
        self.min_volume.unwrap_or(DEFAULT_MIN_VOLUME)
    }

    pub fn max_volume(&self) -> i32 {
        self.max_volume.unwrap_or(DEFAULT_MAX_VOLUME)
    }

    /// The bounds every row volume is clamped to.
    pub fn volume_limits(&self) -> VolumeLimits {
        VolumeLimits::new(self.min_volume(), self.max_volume())
    }

    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the target output latency.
    pub fn latency(&self) -> Result<Duration, ConfigError> {
        parse_duration("latency", self.latency.as_deref(), DEFAULT_LATENCY)
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES)
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn table_height(&self) -> u16 {
        self.table_height.unwrap_or(DEFAULT_TABLE_HEIGHT)
    }
}

fn parse_duration(
    key: &'static str,
    value: Option<&str>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.to_string())
            .map_err(|e| ConfigError::InvalidDuration {
                key,
                value: value.to_string(),
                reason: e.to_string(),
            })?
            .into()),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.to_string(),
    }
}
