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

//! The trigger scheduler.
//!
//! Once per tick, every row gets an independent Bernoulli trial with success probability
//! `min(rate / H, 1)`, where `H` is the number of ticks in an hour. Over an hour a row
//! plays `rate` times on average, but the gaps between plays are random.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, span, warn, Level};

use crate::playback::{PlaybackReport, Player};
use crate::playsync::CancelHandle;
use crate::rows::{Row, RowStore};

const HOUR: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("tick period {0:?} must be greater than zero and no longer than an hour")]
    InvalidPeriod(Duration),

    #[error("tick period {0:?} is too short")]
    PeriodTooShort(Duration),
}

/// Returns the number of ticks of the given period in one hour.
pub fn ticks_per_hour(period: Duration) -> Result<u32, SchedulerError> {
    if period.is_zero() || period > HOUR {
        return Err(SchedulerError::InvalidPeriod(period));
    }

    let ticks = (HOUR.as_secs_f64() / period.as_secs_f64()).round();
    if ticks > u32::MAX as f64 {
        return Err(SchedulerError::PeriodTooShort(period));
    }
    Ok((ticks as u32).max(1))
}

/// Decides whether a row with the given hourly rate fires this tick. Draws x uniformly
/// from [0, ticks_per_hour) and fires if x < rate.
pub fn should_fire<R: Rng + ?Sized>(rng: &mut R, rate: u32, ticks_per_hour: u32) -> bool {
    rate > 0 && rng.gen_range(0..ticks_per_hour.max(1)) < rate
}

/// Decides which rows play on each tick and plays them.
pub struct TriggerScheduler {
    store: RowStore,
    period: Duration,
    ticks_per_hour: u32,
    reports: Option<Sender<PlaybackReport>>,
}

impl TriggerScheduler {
    /// Creates a scheduler that ticks at the given period.
    pub fn new(store: RowStore, period: Duration) -> Result<TriggerScheduler, SchedulerError> {
        Ok(TriggerScheduler {
            store,
            period,
            ticks_per_hour: ticks_per_hour(period)?,
            reports: None,
        })
    }

    /// Forwards every playback report to the given channel.
    pub fn with_reports(mut self, reports: Sender<PlaybackReport>) -> TriggerScheduler {
        self.reports = Some(reports);
        self
    }

    pub fn ticks_per_hour(&self) -> u32 {
        self.ticks_per_hour
    }

    /// Returns the rows that fire this tick. All rows are judged against a single
    /// snapshot, so edits made during the tick show up on the next one.
    pub fn evaluate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Row> {
        self.store
            .snapshot()
            .into_iter()
            .filter(|row| should_fire(rng, row.rate, self.ticks_per_hour))
            .collect()
    }

    /// Runs one tick: evaluates every row and plays the ones that fire. A row that fails
    /// to play is reported and skipped, it doesn't stop the others.
    pub fn run_tick<R: Rng + ?Sized>(&self, rng: &mut R, player: &dyn Player) -> Vec<PlaybackReport> {
        let fired = self.evaluate(rng);
        let mut reports = Vec::with_capacity(fired.len());

        for row in fired {
            let report = match player.play(&row) {
                Ok(gain) => {
                    debug!(id = row.id, filename = row.filename, gain, "Triggered row");
                    PlaybackReport::Played {
                        id: row.id,
                        filename: row.filename,
                        gain,
                    }
                }
                Err(e) => {
                    warn!(
                        id = row.id,
                        filename = row.filename,
                        err = e.to_string(),
                        "Unable to play triggered row"
                    );
                    PlaybackReport::Failed {
                        id: row.id,
                        filename: row.filename,
                        error: e.to_string(),
                    }
                }
            };

            if let Some(reports_tx) = &self.reports {
                // The UI may already be gone during shutdown.
                let _ = reports_tx.send(report.clone());
            }
            reports.push(report);
        }

        reports
    }

    /// Runs the scheduler on a background thread until the cancel handle is cancelled.
    /// Ticks are scheduled against fixed deadlines so slow plays don't cause drift.
    pub fn spawn(
        self,
        player: Arc<dyn Player>,
        mut rng: StdRng,
        cancel_handle: CancelHandle,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("trigger-scheduler".to_string())
            .spawn(move || {
                let span = span!(Level::INFO, "trigger scheduler");
                let _enter = span.enter();

                info!(
                    period = ?self.period,
                    ticks_per_hour = self.ticks_per_hour,
                    rows = self.store.len(),
                    "Scheduler started"
                );

                let mut deadline = Instant::now() + self.period;
                loop {
                    if cancel_handle.wait_until(deadline) {
                        break;
                    }

                    let reports = self.run_tick(&mut rng, player.as_ref());
                    if !reports.is_empty() {
                        let failures = reports.iter().filter(|r| r.is_failure()).count();
                        debug!(failures, fired = reports.len(), "Tick finished");
                    }

                    deadline += self.period;
                    let now = Instant::now();
                    if deadline < now {
                        warn!(behind = ?(now - deadline), "Scheduler fell behind, skipping ticks");
                        deadline = now + self.period;
                    }
                }

                info!("Scheduler stopped");
            })
    }
}
