use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{Application, Status};
use crate::store::{KeyValue, RecordStore};

struct BoardState {
    apps: Vec<Application>,
    column: usize,
    row: usize,
}

impl BoardState {
    fn new(apps: Vec<Application>) -> Self {
        Self {
            apps,
            column: 0,
            row: 0,
        }
    }

    fn column_status(&self) -> Status {
        Status::ALL[self.column]
    }

    fn column_apps(&self, status: Status) -> Vec<&Application> {
        self.apps.iter().filter(|a| a.status == status).collect()
    }

    fn selected(&self) -> Option<&Application> {
        self.column_apps(self.column_status())
            .get(self.row)
            .copied()
    }

    fn clamp_row(&mut self) {
        let len = self.column_apps(self.column_status()).len();
        self.row = if len == 0 { 0 } else { self.row.min(len - 1) };
    }

    fn next_column(&mut self) {
        if self.column + 1 < Status::ALL.len() {
            self.column += 1;
            self.clamp_row();
        }
    }

    fn prev_column(&mut self) {
        if self.column > 0 {
            self.column -= 1;
            self.clamp_row();
        }
    }

    fn next_row(&mut self) {
        let len = self.column_apps(self.column_status()).len();
        if len > 0 && self.row < len - 1 {
            self.row += 1;
        }
    }

    fn prev_row(&mut self) {
        if self.row > 0 {
            self.row -= 1;
        }
    }
}

/// Interactive kanban board: one column per status, single-key moves
/// between them. The keyboard stand-in for dragging a card.
pub fn run_board<S: KeyValue>(store: &mut RecordStore<S>) -> Result<()> {
    if store.applications().is_empty() {
        println!("No applications yet. Add one with 'apptrack add'.");
        return Ok(());
    }

    let mut state = BoardState::new(store.applications().to_vec());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<S: KeyValue>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    store: &mut RecordStore<S>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Right | KeyCode::Char('l') => state.next_column(),
                KeyCode::Left | KeyCode::Char('h') => state.prev_column(),
                KeyCode::Down | KeyCode::Char('j') => state.next_row(),
                KeyCode::Up | KeyCode::Char('k') => state.prev_row(),
                KeyCode::Char('a') => move_selected(state, store, Status::Applied)?,
                KeyCode::Char('i') => move_selected(state, store, Status::Interviewing)?,
                KeyCode::Char('o') => move_selected(state, store, Status::Offer)?,
                KeyCode::Char('x') => move_selected(state, store, Status::Rejected)?,
                _ => {}
            }
        }
    }
    Ok(())
}

fn move_selected<S: KeyValue>(
    state: &mut BoardState,
    store: &mut RecordStore<S>,
    status: Status,
) -> Result<()> {
    let Some(app) = state.selected() else {
        return Ok(());
    };
    if app.status == status {
        return Ok(());
    }
    let id = app.id.clone();
    store.update_status(&id, status)?;
    state.apps = store.applications().to_vec();
    state.clamp_row();
    Ok(())
}

fn draw(frame: &mut Frame, state: &BoardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(rows[0]);

    for (i, status) in Status::ALL.iter().enumerate() {
        let apps = state.column_apps(*status);
        let items: Vec<ListItem> = apps
            .iter()
            .map(|app| {
                let line = format!("{} | {}", truncate(&app.position, 18), app.company);
                ListItem::new(line)
            })
            .collect();

        let active = i == state.column;
        let border_style = if active {
            Style::default().fg(status_color(*status))
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {} ({}) ", status, apps.len())),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        if active {
            let mut list_state = ListState::default();
            if !apps.is_empty() {
                list_state.select(Some(state.row));
            }
            frame.render_stateful_widget(list, columns[i], &mut list_state);
        } else {
            frame.render_widget(list, columns[i]);
        }
    }

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, rows[1]);

    let help = Paragraph::new(
        " h/l:column  j/k:card  a:applied i:interviewing o:offer x:rejected  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn build_detail(state: &BoardState) -> Text<'static> {
    let Some(app) = state.selected() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!("{} at {}", app.position, app.company),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("Applied: {}", app.applied_date)));
    if let Some(source) = &app.source {
        lines.push(Line::from(format!("Source: {source}")));
    }
    if let Some(link) = &app.job_link {
        lines.push(Line::from(format!("Link: {link}")));
    }
    if let Some(reminder) = app.reminder_date {
        let note = app
            .reminder_note
            .as_deref()
            .map(|n| format!(" ({n})"))
            .unwrap_or_default();
        lines.push(Line::from(format!("Reminder: {reminder}{note}")));
    }
    if let Some(notes) = &app.notes {
        for line in textwrap::fill(notes, 100).lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    Text::from(lines)
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Applied => Color::Cyan,
        Status::Interviewing => Color::Yellow,
        Status::Offer => Color::Green,
        Status::Rejected => Color::Red,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn app(id: &str, status: Status) -> Application {
        Application {
            id: id.to_string(),
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            applied_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status,
            source: None,
            job_link: None,
            notes: None,
            reminder_date: None,
            reminder_note: None,
        }
    }

    #[test]
    fn test_navigation_clamps_to_column_contents() {
        let mut state = BoardState::new(vec![
            app("1", Status::Applied),
            app("2", Status::Applied),
            app("3", Status::Offer),
        ]);
        state.next_row();
        assert_eq!(state.row, 1);
        state.next_row(); // already at the bottom
        assert_eq!(state.row, 1);

        state.next_column(); // Interviewing is empty
        assert_eq!(state.row, 0);
        assert!(state.selected().is_none());

        state.next_column(); // Offer has one card
        assert_eq!(state.selected().unwrap().id, "3");
    }

    #[test]
    fn test_move_selected_persists_status() {
        let mut store = RecordStore::load(MemoryStore::default()).unwrap();
        store.add(app("1", Status::Applied)).unwrap();
        let mut state = BoardState::new(store.applications().to_vec());

        move_selected(&mut state, &mut store, Status::Interviewing).unwrap();
        assert_eq!(store.find("1").unwrap().status, Status::Interviewing);
        assert_eq!(state.apps[0].status, Status::Interviewing);
        assert!(state.selected().is_none()); // card left the Applied column
    }
}
