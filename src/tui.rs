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
use std::io;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossterm::{cursor, execute, terminal};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, info};

use crate::editor::EditorSession;
use crate::playback::PlaybackReport;

mod input;
mod view;

use view::TableLayout;

/// How long to wait for a key before redrawing, so the status line stays current.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Puts the terminal in raw mode on the alternate screen, and restores it when dropped.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<TerminalGuard> {
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), terminal::EnterAlternateScreen) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            terminal::LeaveAlternateScreen,
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Runs the editor until the user quits. Playback reports arriving on the channel are
/// shown on the status line.
pub fn run(
    session: &mut EditorSession,
    reports: &Receiver<PlaybackReport>,
    table_height: u16,
) -> io::Result<()> {
    let layout = TableLayout::new(&session.store().snapshot(), table_height);
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;
    info!(rows = session.store().len(), "Editor started");

    let mut status: Option<String> = None;
    while !session.is_exiting() {
        if let Some(report) = reports.try_iter().last() {
            status = Some(report.to_string());
        }

        terminal.draw(|frame| view::render(frame, session, &layout, status.as_deref()))?;

        if let Some(key) = input::poll_key(POLL_INTERVAL, session.state())? {
            let state = session.handle(key);
            debug!(?key, ?state, "Key handled");
        }
    }

    info!("Editor exiting");
    Ok(())
}
