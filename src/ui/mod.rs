mod popup;
mod section;
mod sidebar;

use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Tabs};
use ratatui::Frame;

use crate::app::{App, Mode};
use crate::config::ViewKind;
use crate::host::SEARCH_SECTION_ID;
use crate::task::TaskState;
use crate::types::MergeMethod;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

const VIEWS: [ViewKind; 4] = [
    ViewKind::Notifications,
    ViewKind::Prs,
    ViewKind::Issues,
    ViewKind::Branches,
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_views(frame, app, chunks[0]);
    render_section_tabs(frame, app, chunks[1]);

    if app.sidebar_open {
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[2]);
        section::render(frame, app, main[0]);
        sidebar::render(frame, app, main[1]);
    } else {
        section::render(frame, app, chunks[2]);
    }

    render_footer(frame, app, chunks[3]);

    match &app.mode {
        Mode::Confirm(request) => {
            let task = request.task();
            popup::render_confirm(frame, "Confirm", &format!("{}?", task.start_text));
        }
        Mode::SelectMerge { selected } => {
            let items: Vec<String> = MergeMethod::ALL.iter().map(|m| m.to_string()).collect();
            popup::render_select(frame, "Merge method", &items, *selected);
        }
        Mode::Prompt(prompt) => {
            popup::render_input(frame, prompt.title(), &app.input, &app.prompt_candidates());
        }
        Mode::Search | Mode::Normal => {}
    }
}

fn render_views(frame: &mut Frame, app: &App, area: Rect) {
    let selected = VIEWS.iter().position(|v| *v == app.host.view()).unwrap_or(0);
    let tabs = Tabs::new(VIEWS.iter().map(|v| v.label()).collect::<Vec<_>>())
        .select(selected)
        .style(Style::default().fg(Color::Gray).bg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_section_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = app
        .host
        .sections()
        .iter()
        .map(|section| {
            let mut title = if section.id() == SEARCH_SECTION_ID {
                "Search".to_string()
            } else {
                section.title().to_string()
            };
            if section.is_loading() {
                title.push_str(&format!(" {}", SPINNER[(app.ticks % 4) as usize]));
            } else if section.num_rows() > 0 {
                title.push_str(&format!(" ({})", section.total_count()));
            }
            Line::from(title)
        })
        .collect();

    let selected = app
        .host
        .sections()
        .iter()
        .position(|s| s.id() == app.host.focused_section_id())
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(40)])
        .split(area);

    let status = if app.mode == Mode::Search {
        Line::from(vec![
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(app.input.as_str()),
            Span::styled("_", Style::default().fg(Color::Gray)),
        ])
    } else if let Some(error) = &app.banner {
        Line::from(vec![Span::styled(
            format!("Error: {} (esc to dismiss)", error),
            Style::default().fg(Color::Red),
        )])
    } else if let Some(status) = app.tasks.current_status() {
        let (prefix, color) = match status.state {
            TaskState::Start => (SPINNER[(app.ticks % 4) as usize], Color::Yellow),
            TaskState::Finished => ("✓", Color::Green),
            TaskState::Error => ("✗", Color::Red),
        };
        let mut spans = vec![Span::styled(
            format!("{} {}", prefix, status.text),
            Style::default().fg(color),
        )];
        let others = app.tasks.running_count().saturating_sub(1);
        if others > 0 {
            spans.push(Span::styled(
                format!(" (+{} running)", others),
                Style::default().fg(Color::Gray),
            ));
        }
        Line::from(spans)
    } else {
        Line::from(vec![Span::styled(
            "j/k/g/G: nav | tab/0-9: sections | s: view | /: search | r/R: refresh | o/y: open/copy | p: preview | q: quit",
            Style::default().fg(Color::Gray),
        )])
    };
    frame.render_widget(
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray)),
        chunks[0],
    );

    let pager = app
        .host
        .current_section()
        .map(|section| match section.last_updated() {
            Some(at) => format!("{} | updated {}", section.pager_text(), format_age(at)),
            None => section.pager_text(),
        })
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(pager)
            .alignment(ratatui::layout::Alignment::Right)
            .style(Style::default().fg(Color::Gray).bg(Color::DarkGray)),
        chunks[1],
    );
}

pub(crate) fn format_age(dt: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{}d ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Cuts `text` to `width` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn ages() {
        assert_eq!(format_age(Utc::now() - Duration::days(3)), "3d ago");
        assert_eq!(format_age(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(Utc::now()), "just now");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 8), "a lon...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }
}
