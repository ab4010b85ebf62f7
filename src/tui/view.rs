use crate::model::{Priority, StatusFilter};
use crate::theme::Theme;
use crate::tui::state::{AppState, AuthKind, InputMode};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
};

struct Palette {
    bg: Color,
    fg: Color,
    muted: Color,
    accent: Color,
    highlight: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            bg: Color::Reset,
            fg: Color::White,
            muted: Color::DarkGray,
            accent: Color::Cyan,
            highlight: Color::DarkGray,
        },
        Theme::Light => Palette {
            bg: Color::White,
            fg: Color::Black,
            muted: Color::Gray,
            accent: Color::Blue,
            highlight: Color::LightBlue,
        },
    }
}

fn priority_color(priority: Priority, p: &Palette) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => p.fg,
    }
}

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let p = palette(state.theme);
    f.render_widget(
        Block::default().style(Style::default().bg(p.bg).fg(p.fg)),
        f.area(),
    );

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    if state.logged_in() {
        draw_header(f, state, &p, v_chunks[0]);
        draw_tasks(f, state, &p, v_chunks[1]);
    } else {
        draw_welcome(f, state, &p, v_chunks[0].union(v_chunks[1]));
    }
    draw_footer(f, state, &p, v_chunks[2]);
}

fn draw_header(f: &mut Frame, state: &AppState, p: &Palette, area: Rect) {
    let h_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let user = state.username.as_deref().unwrap_or_default();
    let counts = format!(
        " {} | {} total, {} done, {} pending ",
        user, state.stats.total, state.stats.completed, state.stats.pending
    );
    let header = Paragraph::new(counts)
        .style(Style::default().fg(p.accent))
        .block(Block::default().borders(Borders::ALL).title(" Taskboard "));
    f.render_widget(header, h_chunks[0]);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Progress "))
        .gauge_style(Style::default().fg(Color::Green).bg(p.highlight))
        .percent(u16::from(state.stats.percentage));
    f.render_widget(gauge, h_chunks[1]);
}

fn draw_tasks(f: &mut Frame, state: &mut AppState, p: &Palette, area: Rect) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let task_items: Vec<ListItem> = state
        .view
        .iter()
        .map(|t| {
            let mut style = Style::default().fg(priority_color(t.priority, p));
            if t.is_completed() {
                style = style.fg(p.muted).add_modifier(Modifier::CROSSED_OUT);
            }
            let checkbox = if t.is_completed() { "[x]" } else { "[ ]" };
            let summary = format!("{} {} ({})", checkbox, t.title, t.priority);
            ListItem::new(Line::from(vec![
                Span::styled(summary, style),
                Span::styled(
                    format!("  {}", t.created.format("%d/%m %H:%M")),
                    Style::default().fg(p.muted),
                ),
            ]))
        })
        .collect();

    let mut title = match state.filter.status {
        StatusFilter::All => format!(" Tasks ({}) ", state.view.len()),
        status => format!(" {} tasks ({}) ", status, state.view.len()),
    };
    if !state.filter.query.is_empty() {
        title = format!("{}[/{}] ", title, state.filter.query);
    }
    if state.loading {
        title = format!("{}Loading... ", title);
    }

    let empty = state.view.is_empty();
    let task_list = List::new(task_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(p.accent)),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(p.highlight),
        );
    f.render_stateful_widget(task_list, main_chunks[0], &mut state.list_state);

    let details_text = if empty {
        "No tasks here. Press 'a' to add one.".to_string()
    } else if let Some(task) = state.selected_task() {
        match task.description.as_deref() {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => "No description.".to_string(),
        }
    } else {
        String::new()
    };
    let details = Paragraph::new(details_text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Details "));
    f.render_widget(details, main_chunks[1]);
}

fn draw_welcome(f: &mut Frame, state: &AppState, p: &Palette, area: Rect) {
    let heading = match (state.mode, state.auth_kind()) {
        (InputMode::Normal, _) => "Not signed in",
        (_, AuthKind::Login) => "Sign in",
        (_, AuthKind::Register) => "Create an account",
    };
    let lines = vec![
        Line::from(Span::styled(
            heading,
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "l: Login | r: Register | t: Theme | q: Quit",
            Style::default().fg(p.muted),
        )),
    ];
    let welcome = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Taskboard "));
    f.render_widget(welcome, area);
}

fn draw_footer(f: &mut Frame, state: &AppState, p: &Palette, footer_area: Rect) {
    if state.mode != InputMode::Normal {
        let (title, prefix, color) = match state.mode {
            InputMode::Searching => (" Search ", "/ ", Color::Green),
            InputMode::EditingTitle => (" Edit Title ", "> ", Color::Magenta),
            InputMode::EditingDescription => (" Edit Description ", "> ", Color::Blue),
            InputMode::AuthUsername => (" Username ", "> ", p.accent),
            InputMode::AuthEmail => (" Email ", "> ", p.accent),
            InputMode::AuthPassword => (" Password ", "> ", p.accent),
            _ => (" Create Task ", "> ", Color::Yellow),
        };
        let shown = if state.mode == InputMode::AuthPassword {
            "*".repeat(state.input_buffer.chars().count())
        } else {
            state.input_buffer.clone()
        };
        let input = Paragraph::new(format!("{}{}", prefix, shown))
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, footer_area);
        let cursor_x =
            footer_area.x + 1 + prefix.chars().count() as u16 + state.cursor_position as u16;
        let cursor_y = footer_area.y + 1;
        f.set_cursor_position((cursor_x, cursor_y));
        return;
    }

    let f_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(footer_area);
    let status = Paragraph::new(state.message.clone())
        .style(Style::default().fg(p.accent))
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::TOP | Borders::BOTTOM)
                .title(" Status "),
        );
    let help_text = if state.logged_in() {
        "Tab:View | /:Find | a:Add | e:Title | E:Desc | d:Del | L:Logout"
    } else {
        "l:Login | r:Register"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(p.muted))
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::TOP | Borders::BOTTOM)
                .title(" Actions "),
        );
    f.render_widget(status, f_chunks[0]);
    f.render_widget(help, f_chunks[1]);
}
