use anyhow::Result;
use chrono::NaiveDate;
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
use uuid::Uuid;

use jobtrack::models::{JobApplication, Status, Tone};
use jobtrack::tracker::{Snapshot, Tracker};
use jobtrack::views::{follow_up_urgency, kanban_columns, Urgency};

struct BoardState {
    snapshot: Snapshot,
    column: usize,
    rows: [usize; Status::ALL.len()],
    scroll_offset: u16,
    message: Option<String>,
    today: NaiveDate,
}

impl BoardState {
    fn new(snapshot: Snapshot, today: NaiveDate) -> Self {
        Self {
            snapshot,
            column: 0,
            rows: [0; Status::ALL.len()],
            scroll_offset: 0,
            message: None,
            today,
        }
    }

    fn cards(&self, column: usize) -> Vec<&JobApplication> {
        let status = Status::ALL[column];
        self.snapshot
            .applications()
            .iter()
            .filter(|a| a.status == status)
            .collect()
    }

    fn current(&self) -> Option<&JobApplication> {
        self.cards(self.column).get(self.rows[self.column]).copied()
    }

    fn left(&mut self) {
        self.column = self.column.saturating_sub(1);
        self.scroll_offset = 0;
    }

    fn right(&mut self) {
        if self.column + 1 < Status::ALL.len() {
            self.column += 1;
            self.scroll_offset = 0;
        }
    }

    fn next(&mut self) {
        let len = self.cards(self.column).len();
        let row = &mut self.rows[self.column];
        if len > 0 && *row < len - 1 {
            *row += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        let row = &mut self.rows[self.column];
        if *row > 0 {
            *row -= 1;
            self.scroll_offset = 0;
        }
    }

    /// Take a new snapshot and keep `follow` selected if it is still there.
    fn refresh(&mut self, snapshot: Snapshot, follow: Option<Uuid>) {
        self.snapshot = snapshot;
        let followed = follow.and_then(|id| {
            self.snapshot
                .applications()
                .iter()
                .find(|a| a.id == id)
                .map(|a| (id, a.status))
        });
        if let Some((id, status)) = followed {
            self.column = Status::ALL.iter().position(|s| *s == status).unwrap_or(0);
            let row = self
                .cards(self.column)
                .iter()
                .position(|a| a.id == id)
                .unwrap_or(0);
            self.rows[self.column] = row;
        }
        for column in 0..Status::ALL.len() {
            let len = self.cards(column).len();
            self.rows[column] = self.rows[column].min(len.saturating_sub(1));
        }
    }
}

pub fn run_board(tracker: &mut Tracker, today: NaiveDate) -> Result<()> {
    let mut state = BoardState::new(tracker.snapshot(), today);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, tracker);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BoardState,
    tracker: &mut Tracker,
) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Left | KeyCode::Char('h') => state.left(),
                KeyCode::Right | KeyCode::Char('l') => state.right(),
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => {
                    state.scroll_offset = state.scroll_offset.saturating_add(3)
                }
                KeyCode::Char('K') | KeyCode::PageUp => {
                    state.scroll_offset = state.scroll_offset.saturating_sub(3)
                }
                KeyCode::Char('H') => move_card(state, tracker, -1),
                KeyCode::Char('L') => move_card(state, tracker, 1),
                KeyCode::Char('r') => {
                    tracker.load();
                    let follow = state.current().map(|a| a.id);
                    state.refresh(tracker.snapshot(), follow);
                    state.message = Some("Reloaded".to_string());
                }
                _ => {}
            }
            if let Some(notice) = tracker.take_notices().pop() {
                state.message = Some(notice.to_string());
            }
        }
    }
    Ok(())
}

fn move_card(state: &mut BoardState, tracker: &mut Tracker, step: isize) {
    let Some(app) = state.current() else { return };
    let id = app.id;
    let target = state.column as isize + step;
    if target < 0 || target as usize >= Status::ALL.len() {
        return;
    }
    let status = Status::ALL[target as usize];
    if tracker.set_status(id, status) {
        state.message = Some(format!("Moved to {}", status.label()));
        state.refresh(tracker.snapshot(), Some(id));
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Neutral => Color::Gray,
        Tone::Info => Color::Blue,
        Tone::Progress => Color::Magenta,
        Tone::Success => Color::Green,
        Tone::Danger => Color::Red,
        Tone::Muted => Color::DarkGray,
    }
}

fn draw(frame: &mut Frame, state: &BoardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, Status::ALL.len() as u32); Status::ALL.len()])
        .split(rows[0]);

    for (i, column) in kanban_columns(state.snapshot.applications()).into_iter().enumerate() {
        let items: Vec<ListItem> = column
            .applications
            .iter()
            .map(|app| {
                let style = match app.follow_up_due_date.map(|d| follow_up_urgency(d, state.today)) {
                    Some(Urgency::Overdue) => Style::default().fg(Color::Red),
                    Some(Urgency::DueSoon) => Style::default().fg(Color::Yellow),
                    _ => Style::default(),
                };
                ListItem::new(vec![
                    Line::from(Span::styled(app.job_title.clone(), style.add_modifier(Modifier::BOLD))),
                    Line::from(Span::styled(app.company.clone(), Style::default().fg(Color::DarkGray))),
                ])
            })
            .collect();

        let focused = i == state.column;
        let border = if focused {
            Style::default().fg(tone_color(column.status.tone()))
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {} ({}) ", column.status.label(), column.applications.len())),
            )
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">");

        let mut list_state = ListState::default();
        if focused && !column.applications.is_empty() {
            list_state.select(Some(state.rows[i]));
        }
        frame.render_stateful_widget(list, columns[i], &mut list_state);
    }

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, rows[1]);

    let footer = match &state.message {
        Some(message) => format!(" {}", message),
        None => " h/l:column  j/k:card  H/L:move card  J/K:scroll  r:reload  q:quit".to_string(),
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn build_detail(state: &BoardState) -> Text<'_> {
    let Some(app) = state.current() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{} at {}", app.job_title, app.company),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status.label()),
        Style::default().fg(tone_color(app.status.tone())),
    )));
    lines.push(Line::from(format!(
        "{} | {} | {} | applied {}",
        app.platform.label(),
        app.employment_type.label(),
        if app.location.is_empty() { "-" } else { &app.location },
        app.date_applied.format("%b %-d")
    )));

    if let Some(due) = app.follow_up_due_date {
        let (label, style) = match follow_up_urgency(due, state.today) {
            Urgency::Overdue => ("overdue", Style::default().fg(Color::Red)),
            Urgency::DueSoon => ("due soon", Style::default().fg(Color::Yellow)),
            Urgency::Upcoming => ("", Style::default()),
        };
        lines.push(Line::from(Span::styled(
            format!("Follow-up: {} {}", due.format("%b %-d"), label),
            style,
        )));
    }
    if let Some(action) = &app.next_action {
        lines.push(Line::from(format!("Next: {}", action)));
    }
    if let Some(url) = &app.job_url {
        lines.push(Line::from(format!("URL: {}", url)));
    }
    if let Some(name) = &app.contact_name {
        let email = app.contact_email.as_deref().unwrap_or("");
        lines.push(Line::from(format!("Contact: {} {}", name, email)));
    }
    if let Some(salary) = &app.salary_range {
        lines.push(Line::from(format!("Salary: {}", salary)));
    }

    if let Some(notes) = &app.notes {
        lines.push(Line::from(""));
        for line in textwrap::fill(notes, 70).lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    Text::from(lines)
}
