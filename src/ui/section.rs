use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{
    Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
};
use ratatui::Frame;

use crate::app::App;
use crate::section::{AnySection, FetchState};
use crate::types::{IssueState, PrState, RowRef, SectionKind};

use super::{format_age, truncate};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(section) = app.host.current_section() else {
        return;
    };

    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {} ", section.filters()),
        Style::default().fg(Color::Cyan),
    ));

    if section.num_rows() == 0 {
        let text = match section.state() {
            FetchState::Loading => "Loading...".to_string(),
            FetchState::Error => format!("Failed: {}", section.last_error().unwrap_or("unknown error")),
            _ if section.filters().is_empty() && section.kind() != SectionKind::Branch => {
                "Press / to search".to_string()
            }
            _ => format!("No {} found", section.kind().plural()),
        };
        let empty = Paragraph::new(text)
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let title_width = area.width.saturating_sub(2 + fixed_width(section.kind())) as usize;
    let viewport = section.viewport();
    let item_height = viewport.item_height() as u16;
    let rows: Vec<Row> = viewport
        .visible_range()
        .filter_map(|i| section.row(i).map(|row| (i, row)))
        .map(|(i, row)| {
            let row = build_row(row, title_width.max(10)).height(item_height);
            if i == viewport.current() {
                row.style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(rows, widths(section))
        .header(
            Row::new(headers(section.kind()))
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        )
        .block(block);
    frame.render_widget(table, area);

    if viewport.num_items() > viewport.page_size() {
        let mut state = ScrollbarState::new(viewport.num_items() * viewport.item_height())
            .viewport_content_length(viewport.page_size() * viewport.item_height())
            .position(viewport.scroll_offset());
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn headers(kind: SectionKind) -> Vec<&'static str> {
    match kind {
        SectionKind::Pr => vec!["#", "State", "Title", "Repo", "Author", "Diff", "Updated"],
        SectionKind::Issue => vec!["#", "State", "Title", "Repo", "Author", "Comments", "Updated"],
        SectionKind::Notification => vec!["", "Type", "Title", "Repo", "Reason", "Updated"],
        SectionKind::Branch => vec!["", "Branch", "Subject", "Upstream", "PR", "Updated"],
    }
}

/// Width of every column but the title.
fn fixed_width(kind: SectionKind) -> u16 {
    widths_for(kind).iter().sum()
}

fn widths_for(kind: SectionKind) -> Vec<u16> {
    match kind {
        SectionKind::Pr => vec![7, 7, 24, 16, 14, 10],
        SectionKind::Issue => vec![7, 7, 24, 16, 9, 10],
        SectionKind::Notification => vec![2, 12, 24, 10, 10],
        SectionKind::Branch => vec![2, 24, 18, 7, 10],
    }
}

fn widths(section: &AnySection) -> Vec<Constraint> {
    let fixed = widths_for(section.kind());
    let mut constraints: Vec<Constraint> = fixed.iter().map(|w| Constraint::Length(*w)).collect();
    // Title (or subject) flexes
    constraints.insert(2, Constraint::Min(10));
    constraints
}

fn build_row(row: RowRef<'_>, title_width: usize) -> Row<'static> {
    match row {
        RowRef::Pr(pr) => {
            let (state, color) = match pr.state {
                PrState::Open if pr.is_draft => ("draft", Color::Gray),
                PrState::Open => ("open", Color::Green),
                PrState::Closed => ("closed", Color::Red),
                PrState::Merged => ("merged", Color::Magenta),
            };
            Row::new(vec![
                Cell::from(format!("#{}", pr.number)),
                Cell::from(Span::styled(state, Style::default().fg(color))),
                Cell::from(truncate(&pr.title, title_width)),
                Cell::from(truncate(&pr.repo, 23)),
                Cell::from(truncate(&pr.author, 15)),
                Cell::from(format!("+{} -{}", pr.additions, pr.deletions)),
                Cell::from(format_age(pr.updated_at)),
            ])
        }
        RowRef::Issue(issue) => {
            let (state, color) = match issue.state {
                IssueState::Open => ("open", Color::Green),
                IssueState::Closed => ("closed", Color::Red),
            };
            Row::new(vec![
                Cell::from(format!("#{}", issue.number)),
                Cell::from(Span::styled(state, Style::default().fg(color))),
                Cell::from(truncate(&issue.title, title_width)),
                Cell::from(truncate(&issue.repo, 23)),
                Cell::from(truncate(&issue.author, 15)),
                Cell::from(issue.comment_count.to_string()),
                Cell::from(format_age(issue.updated_at)),
            ])
        }
        RowRef::Notification(n) => {
            let marker = if n.unread { "●" } else { " " };
            let row = Row::new(vec![
                Cell::from(Span::styled(marker, Style::default().fg(Color::Cyan))),
                Cell::from(truncate(&n.subject_type, 11)),
                Cell::from(truncate(&n.title, title_width)),
                Cell::from(truncate(&n.repo, 23)),
                Cell::from(n.reason.clone()),
                Cell::from(format_age(n.updated_at)),
            ]);
            if n.done {
                row.style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT))
            } else {
                row
            }
        }
        RowRef::Branch(b) => Row::new(vec![
            Cell::from(if b.is_current { "*" } else { " " }),
            Cell::from(truncate(&b.name, 23)),
            Cell::from(truncate(&b.subject, title_width)),
            Cell::from(b.upstream.clone().unwrap_or_else(|| "-".to_string())),
            Cell::from(b.pr_number.map(|n| format!("#{}", n)).unwrap_or_default()),
            Cell::from(format_age(b.last_commit_at)),
        ]),
    }
}
