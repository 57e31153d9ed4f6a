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
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row as TableLine, Table, TableState};
use ratatui::Frame;

use crate::editor::{EditorSession, EditorState};
use crate::rows::Row;

const BORDER_COLOR: Color = Color::Indexed(240);
const SELECTED_FG: Color = Color::Indexed(229);
const SELECTED_BG: Color = Color::Indexed(57);

const RATE_PROMPT: &str = "What's the new frequency?";
const BROWSE_HELP: &str = "j/k: move  h/l: volume  enter: set frequency  esc: focus  q: quit";
const EDIT_HELP: &str = "enter: save  esc: quit";

/// Column widths for the sounds table, fixed for the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLayout {
    widths: [u16; 4],
    height: u16,
}

impl TableLayout {
    const HEADERS: [&'static str; 4] = ["Id", "Name", "Frequency(/hr)", "Volume"];

    /// Sizes the columns for the given rows. The name column fits the longest file name.
    pub fn new(rows: &[Row], height: u16) -> TableLayout {
        let widest = |values: Vec<usize>, header: &str| -> u16 {
            let width = values.into_iter().max().unwrap_or(0).max(header.len());
            u16::try_from(width).unwrap_or(u16::MAX)
        };

        TableLayout {
            widths: [
                widest(rows.iter().map(|r| r.id.to_string().len()).collect(), Self::HEADERS[0]),
                widest(rows.iter().map(|r| r.filename.chars().count()).collect(), Self::HEADERS[1]),
                widest(Vec::new(), Self::HEADERS[2]),
                widest(Vec::new(), Self::HEADERS[3]),
            ],
            height: height.max(1),
        }
    }

    pub fn widths(&self) -> [u16; 4] {
        self.widths
    }

    /// Total height of the table, including its header and borders.
    fn outer_height(&self) -> u16 {
        self.height.saturating_add(4)
    }
}

/// Draws the whole screen for the current session.
pub fn render(frame: &mut Frame, session: &EditorSession, layout: &TableLayout, status: Option<&str>) {
    match session.state() {
        EditorState::EditingRate(_) => render_prompt(frame, frame.area(), session),
        _ => render_table(frame, frame.area(), session, layout, status),
    }
}

fn render_table(
    frame: &mut Frame,
    area: Rect,
    session: &EditorSession,
    layout: &TableLayout,
    status: Option<&str>,
) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(layout.outer_height()),
            Constraint::Length(1), // help
            Constraint::Length(1), // status
            Constraint::Min(0),
        ])
        .split(area);

    let lines: Vec<TableLine> = session
        .store()
        .snapshot()
        .iter()
        .map(|row| {
            let table_row = row.to_table_row();
            TableLine::new([
                Cell::from(table_row.id),
                Cell::from(table_row.name),
                Cell::from(table_row.rate),
                Cell::from(table_row.volume),
            ])
        })
        .collect();

    let header = TableLine::new(TableLayout::HEADERS.map(Cell::from))
        .style(Style::new().fg(BORDER_COLOR))
        .bottom_margin(1);

    let highlight = if session.is_focused() {
        Style::new().fg(SELECTED_FG).bg(SELECTED_BG)
    } else {
        Style::new()
    };

    let table = Table::new(lines, layout.widths().map(Constraint::Length))
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::new().fg(BORDER_COLOR)),
        )
        .row_highlight_style(highlight);

    let mut state = TableState::default().with_selected(session.cursor());
    frame.render_stateful_widget(table, sections[0], &mut state);

    frame.render_widget(
        Paragraph::new(BROWSE_HELP).style(Style::new().fg(BORDER_COLOR)),
        sections[1],
    );
    if let Some(status) = status {
        frame.render_widget(Paragraph::new(status), sections[2]);
    }
}

fn render_prompt(frame: &mut Frame, area: Rect, session: &EditorSession) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    // The placeholder shows until the user starts typing.
    let input = if session.input().is_empty() {
        Paragraph::new(format!("> {}", session.placeholder()))
            .style(Style::new().fg(BORDER_COLOR))
    } else {
        Paragraph::new(format!("> {}", session.input()))
    };

    frame.render_widget(Paragraph::new(RATE_PROMPT), sections[0]);
    frame.render_widget(input, sections[1]);
    frame.render_widget(
        Paragraph::new(EDIT_HELP).style(Style::new().fg(BORDER_COLOR)),
        sections[2],
    );
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::editor::EditorKey;
    use crate::rows::{RowStore, VolumeLimits};

    fn screen(session: &EditorSession, status: Option<&str>) -> Result<String, Box<dyn Error>> {
        let rows = session.store().snapshot();
        let layout = TableLayout::new(&rows, 7);
        let mut terminal = Terminal::new(TestBackend::new(80, 16))?;
        terminal.draw(|frame| render(frame, session, &layout, status))?;

        let buffer = terminal.backend().buffer();
        Ok(buffer.content.iter().map(|cell| cell.symbol()).collect())
    }

    fn session() -> EditorSession {
        let store = RowStore::from_filenames(
            &["birds.wav", "thunderstorm.ogg"],
            VolumeLimits::default(),
        );
        EditorSession::new(store, 5)
    }

    #[test]
    fn test_layout_fits_longest_name() {
        let store = RowStore::from_filenames(
            &["a.wav", "distant-thunder.ogg"],
            VolumeLimits::default(),
        );
        let layout = TableLayout::new(&store.snapshot(), 7);
        assert_eq!([2, 19, 14, 6], layout.widths());

        let empty = TableLayout::new(&[], 7);
        assert_eq!([2, 4, 14, 6], empty.widths());
    }

    #[test]
    fn test_renders_table() -> Result<(), Box<dyn Error>> {
        let session = session();
        session.store().mutate(2, |row| row.rate = 45);

        let text = screen(&session, Some("Played birds.wav (1) at gain 1.00"))?;
        assert!(text.contains("Frequency(/hr)"));
        assert!(text.contains("birds.wav"));
        assert!(text.contains("thunderstorm.ogg"));
        assert!(text.contains("45"));
        assert!(text.contains("Played birds.wav (1) at gain 1.00"));
        Ok(())
    }

    #[test]
    fn test_renders_prompt_with_placeholder() -> Result<(), Box<dyn Error>> {
        let mut session = session();
        session.store().mutate(1, |row| row.rate = 360);
        session.handle(EditorKey::Confirm);

        let text = screen(&session, None)?;
        assert!(text.contains(RATE_PROMPT));
        assert!(text.contains("> 360"));

        session.handle(EditorKey::Input('9'));
        let text = screen(&session, None)?;
        assert!(text.contains("> 9"));
        assert!(!text.contains("> 360"));
        Ok(())
    }
}
