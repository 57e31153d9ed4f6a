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
use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use crate::assets;
use crate::audio::{mock, PlaybackError};
use crate::editor::{EditorKey, EditorSession, EditorState};
use crate::playback::{PlaybackInvoker, PlaybackReport, Player};
use crate::playsync::CancelHandle;
use crate::rows::{Row, RowStore, VolumeLimits};
use crate::scheduler::TriggerScheduler;
use crate::testutil::{eventually, write_wav};

/// Remembers which rows were played without touching any audio.
#[derive(Default)]
struct CountingPlayer {
    played: Mutex<Vec<usize>>,
}

impl Player for CountingPlayer {
    fn play(&self, row: &Row) -> Result<f32, PlaybackError> {
        self.played.lock().push(row.id);
        Ok(1.0)
    }
}

fn type_text(session: &mut EditorSession, text: &str) {
    for c in text.chars() {
        session.handle(EditorKey::Input(c));
    }
}

#[test]
fn test_discovered_rows_trigger_by_rate() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("b.clip"), b"")?;
    fs::write(dir.path().join("a.clip"), b"")?;

    let store = RowStore::from_filenames(&assets::discover(dir.path())?, VolumeLimits::default());
    let rows = store.snapshot();
    assert_eq!(2, rows.len());
    assert_eq!((1, "a.clip", 0, 100), (rows[0].id, rows[0].filename.as_str(), rows[0].rate, rows[0].volume));
    assert_eq!((2, "b.clip", 0, 100), (rows[1].id, rows[1].filename.as_str(), rows[1].rate, rows[1].volume));

    // Set row 1's rate through the editor, the way a user would.
    let mut session = EditorSession::new(store.clone(), 5);
    session.handle(EditorKey::Confirm);
    type_text(&mut session, "3600");
    assert_eq!(EditorState::Browsing, session.handle(EditorKey::Confirm));

    let scheduler = TriggerScheduler::new(store, Duration::from_secs(1))?;
    assert_eq!(3600, scheduler.ticks_per_hour());

    let player = CountingPlayer::default();
    let mut rng = StdRng::seed_from_u64(0xa11);
    for _ in 0..1000 {
        scheduler.run_tick(&mut rng, &player);
    }

    let played = player.played.lock();
    assert_eq!(1000, played.len());
    assert!(played.iter().all(|id| *id == 1));
    Ok(())
}

#[test]
fn test_bad_clip_does_not_stop_others() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("broken.wav"), b"not a wav file")?;
    write_wav(&dir.path().join("rain.wav"), vec![vec![0.2f32; 64]], 44100)?;

    let store = RowStore::from_filenames(&assets::discover(dir.path())?, VolumeLimits::default());
    store.mutate(1, |row| row.rate = 3600);
    store.mutate(2, |row| row.rate = 3600);

    let output = Arc::new(mock::Output::get("mock-output"));
    let player = PlaybackInvoker::new(dir.path(), output.clone());
    let scheduler = TriggerScheduler::new(store, Duration::from_secs(1))?;

    let reports = scheduler.run_tick(&mut StdRng::seed_from_u64(1), &player);
    assert_eq!(2, reports.len());
    assert!(reports[0].is_failure());
    assert_eq!(
        PlaybackReport::Played {
            id: 2,
            filename: "rain.wav".to_string(),
            gain: 1.0,
        },
        reports[1]
    );
    assert_eq!(1, output.plays().len());
    Ok(())
}

#[test]
fn test_live_edits_reach_background_playback() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    write_wav(&dir.path().join("chimes.wav"), vec![vec![0.1f32; 32], vec![0.1f32; 32]], 48000)?;
    write_wav(&dir.path().join("crickets.wav"), vec![vec![0.1f32; 32]], 22050)?;

    let store = RowStore::from_filenames(&assets::discover(dir.path())?, VolumeLimits::default());
    let output = Arc::new(mock::Output::get("mock-output"));
    let player: Arc<dyn Player> = Arc::new(PlaybackInvoker::new(dir.path(), output.clone()));

    let period = Duration::from_millis(10);
    let (reports_tx, reports_rx) = crossbeam_channel::unbounded();
    let scheduler = TriggerScheduler::new(store.clone(), period)?.with_reports(reports_tx);
    let ticks_per_hour = scheduler.ticks_per_hour();

    let cancel_handle = CancelHandle::new();
    let join = scheduler.spawn(player, StdRng::seed_from_u64(2), cancel_handle.clone())?;

    // Nothing plays until a rate is set.
    std::thread::sleep(period * 5);
    assert!(output.plays().is_empty());

    // Turn the second row up and make it play every tick.
    let mut session = EditorSession::new(store, 5);
    session.handle(EditorKey::Down);
    for _ in 0..10 {
        session.handle(EditorKey::Increment);
    }
    session.handle(EditorKey::Confirm);
    type_text(&mut session, &ticks_per_hour.to_string());
    session.handle(EditorKey::Confirm);

    eventually(|| output.plays().len() >= 3, "Edited row never played");
    session.handle(EditorKey::Quit);
    assert!(session.is_exiting());
    cancel_handle.cancel();
    join.join().map_err(|_| "scheduler thread panicked")?;

    // The 22.05kHz mono clip is converted to the mock's 44.1kHz stereo output.
    let plays = output.plays();
    assert!(plays.iter().all(|play| play.gain == 2.0));
    assert!(plays.iter().all(|play| play.frames == 64));

    let reports: Vec<PlaybackReport> = reports_rx.try_iter().collect();
    assert_eq!(plays.len(), reports.len());
    assert!(reports.iter().all(|report| report.id() == 2));
    Ok(())
}
