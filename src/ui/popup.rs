use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

/// Candidates listed under an input prompt.
const MAX_CANDIDATES: usize = 8;

fn titled_block(title: &str) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {} ", title),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Centered y/n question.
pub fn render_confirm(frame: &mut Frame, title: &str, message: &str) {
    let area = centered_rect(60, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::raw(message.to_string())),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y]", Style::default().fg(Color::Green)),
            Span::raw("es  "),
            Span::styled("[n]", Style::default().fg(Color::Red)),
            Span::raw("o"),
        ]),
    ];

    let popup = Paragraph::new(lines)
        .block(titled_block(title))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(popup, area);
}

/// Centered list with one highlighted entry.
pub fn render_select(frame: &mut Frame, title: &str, items: &[String], selected: usize) {
    let height = (items.len() + 2).min(12) as u16;
    let area = centered_rect(40, height, frame.area());
    frame.render_widget(Clear, area);

    let list_items: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (prefix, style) = if i == selected {
                (
                    "> ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default())
            };
            ListItem::new(Line::from(Span::styled(format!("{}{}", prefix, item), style)))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(List::new(list_items).block(titled_block(title)), area, &mut state);
}

/// Single-line text input, with known names for the row's repository
/// listed underneath.
pub fn render_input(frame: &mut Frame, title: &str, input: &str, candidates: &[String]) {
    let shown = candidates.len().min(MAX_CANDIDATES);
    let height = 3 + if shown > 0 { shown as u16 + 1 } else { 0 };
    let area = centered_rect(60, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from(vec![
        Span::raw(input.to_string()),
        Span::styled("_", Style::default().fg(Color::Gray)),
    ])];
    if shown > 0 {
        lines.push(Line::from(""));
        let mut names: Vec<Span> = candidates[..shown]
            .iter()
            .map(|c| Span::styled(format!("{}  ", c), Style::default().fg(Color::Cyan)))
            .collect();
        if candidates.len() > shown {
            names.push(Span::styled(
                format!("+{} more", candidates.len() - shown),
                Style::default().fg(Color::Gray),
            ));
        }
        lines.push(Line::from(names));
    }

    let popup = Paragraph::new(lines)
        .block(titled_block(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(popup, area);
}

/// A `width` x `height` rect centered in `outer`, clipped to it.
fn centered_rect(width: u16, height: u16, outer: Rect) -> Rect {
    let popup_width = width.min(outer.width);
    let popup_height = height.min(outer.height);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((outer.height.saturating_sub(popup_height)) / 2),
            Constraint::Length(popup_height),
            Constraint::Min(0),
        ])
        .split(outer);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((outer.width.saturating_sub(popup_width)) / 2),
            Constraint::Length(popup_width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}
