use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::App;
use crate::types::{Comment, Label, RowData, RowRef};

use super::format_age;

/// Comments shown at the bottom of the preview.
const RECENT_COMMENTS: usize = 3;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title("Preview");

    let Some(row) = app.host.current_row() else {
        let empty = Paragraph::new("Nothing selected")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            row.title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(row.url(), Style::default().fg(Color::Cyan))),
        Line::from(""),
    ];

    match row {
        RowRef::Pr(pr) => {
            lines.push(Line::from(vec![
                Span::styled(format!("@{}", pr.author), Style::default().fg(Color::Yellow)),
                Span::raw(" wants to merge "),
                Span::styled(pr.head_branch.clone(), Style::default().fg(Color::Cyan)),
                Span::raw(" into "),
                Span::styled(pr.base_branch.clone(), Style::default().fg(Color::Cyan)),
            ]));
            lines.push(Line::from(vec![
                Span::raw(format!("{}", pr.state)),
                Span::raw(" | "),
                Span::styled(format!("+{}", pr.additions), Style::default().fg(Color::Green)),
                Span::raw(" "),
                Span::styled(format!("-{}", pr.deletions), Style::default().fg(Color::Red)),
                Span::raw(" | "),
                Span::raw(pr.review_decision.clone().unwrap_or_else(|| "no review".to_string())),
            ]));
            lines.extend(people_and_labels(&pr.assignees, &pr.labels));
            lines.extend(body(pr.body.as_deref()));
            lines.extend(comments(&pr.comments, pr.comment_count));
        }
        RowRef::Issue(issue) => {
            lines.push(Line::from(vec![
                Span::styled(format!("@{}", issue.author), Style::default().fg(Color::Yellow)),
                Span::raw(format!(" | {} | {} reactions", issue.state, issue.reactions)),
            ]));
            lines.extend(people_and_labels(&issue.assignees, &issue.labels));
            lines.extend(body(issue.body.as_deref()));
            lines.extend(comments(&issue.comments, issue.comment_count));
        }
        RowRef::Notification(n) => {
            lines.push(Line::from(format!("{} in {}", n.subject_type, n.repo)));
            lines.push(Line::from(format!("Reason: {}", n.reason)));
            let status = if n.done {
                "done"
            } else if n.unread {
                "unread"
            } else {
                "read"
            };
            lines.push(Line::from(format!("Status: {}", status)));
        }
        RowRef::Branch(b) => {
            lines.push(Line::from(b.subject.clone()));
            lines.push(Line::from(format!(
                "Upstream: {}",
                b.upstream.as_deref().unwrap_or("not pushed")
            )));
            if let Some(number) = b.pr_number {
                lines.push(Line::from(format!("Pull request: #{}", number)));
            }
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "Created {} | updated {}",
            format_age(row.created_at()),
            format_age(row.updated_at())
        ),
        Style::default().fg(Color::Gray),
    )));

    let preview = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(preview, area);
}

fn people_and_labels(assignees: &[String], labels: &[Label]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if !assignees.is_empty() {
        lines.push(Line::from(format!("Assignees: {}", assignees.join(", "))));
    }
    if !labels.is_empty() {
        let mut spans = vec![Span::raw("Labels: ")];
        for label in labels {
            spans.push(Span::styled(
                format!(" {} ", label.name),
                Style::default().fg(Color::Black).bg(label_color(&label.color)),
            ));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn body(text: Option<&str>) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    match text.filter(|t| !t.trim().is_empty()) {
        Some(text) => lines.extend(text.lines().map(|l| Line::from(l.replace('\t', "    ")))),
        None => lines.push(Line::from(Span::styled(
            "No description provided.",
            Style::default().fg(Color::Gray),
        ))),
    }
    lines
}

fn comments(comments: &[Comment], count: u32) -> Vec<Line<'static>> {
    if count == 0 {
        return Vec::new();
    }
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("{} comments", count),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    let skip = comments.len().saturating_sub(RECENT_COMMENTS);
    for comment in &comments[skip..] {
        lines.push(Line::from(vec![
            Span::styled(format!("@{}", comment.author), Style::default().fg(Color::Yellow)),
            Span::styled(
                format!(" {}", format_age(comment.created_at)),
                Style::default().fg(Color::Gray),
            ),
        ]));
        lines.extend(comment.body.lines().map(|l| Line::from(format!("  {}", l))));
    }
    lines
}

/// Parses a GitHub label color (`d73a4a`), falling back to gray.
fn label_color(hex: &str) -> Color {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return Color::Gray;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_colors() {
        assert_eq!(label_color("d73a4a"), Color::Rgb(0xd7, 0x3a, 0x4a));
        assert_eq!(label_color("#000000"), Color::Rgb(0, 0, 0));
        assert_eq!(label_color(""), Color::Gray);
        assert_eq!(label_color("zzzzzz"), Color::Gray);
    }

    #[test]
    fn only_recent_comments_are_shown() {
        let comment = |body: &str| Comment {
            author: "a".to_string(),
            body: body.to_string(),
            created_at: chrono::Utc::now(),
        };
        let all: Vec<Comment> = (0..5).map(|i| comment(&format!("c{}", i))).collect();
        let lines = comments(&all, 5);
        // blank + header + 3 * (author line + body line)
        assert_eq!(lines.len(), 2 + 2 * RECENT_COMMENTS);
        assert_eq!(lines.last().unwrap().to_string(), "  c4");
    }

    #[test]
    fn no_comments_no_lines() {
        assert!(comments(&[], 0).is_empty());
    }
}
