use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::discussion::{CharCountState, MAX_RESPONSE_LEN};
use crate::ui::windows::centered_popup_area;

/// One response row, pre-rendered by the reader so this window only
/// lays text out.
pub struct ResponseRow {
    pub initials: String,
    pub author: String,
    pub when: String,
    pub text: String,
    pub own: bool,
}

pub struct DiscussionPanel;

impl DiscussionPanel {
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        chapter_title: &str,
        count_label: &str,
        rows: &[ResponseRow],
        draft: &str,
        editing: bool,
        char_state: CharCountState,
    ) {
        let popup_area = centered_popup_area(area, 70, 80);
        frame.render_widget(Clear, popup_area);

        let title = format!("Discussion: {} ({})", chapter_title, count_label);
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let [list_area, input_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(4)]).areas(inner);

        let mut lines: Vec<Line> = Vec::new();
        if rows.is_empty() {
            lines.push(Line::from(Span::styled(
                "No responses yet. Be the first!",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for row in rows {
            let mut header = vec![
                Span::styled(
                    format!("[{}] ", row.initials),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    row.author.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {}", row.when),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if row.own {
                header.push(Span::styled(
                    "  (you)",
                    Style::default().fg(Color::DarkGray),
                ));
            }
            lines.push(Line::from(header));
            lines.push(Line::from(row.text.clone()));
            lines.push(Line::from(""));
        }

        let list = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(list, list_area);

        let counter_style = match char_state {
            CharCountState::Ok => Style::default().fg(Color::DarkGray),
            CharCountState::Warning => Style::default().fg(Color::Yellow),
            CharCountState::Error => Style::default().fg(Color::Red),
        };
        let counter = format!("{}/{}", draft.chars().count(), MAX_RESPONSE_LEN);
        let input_title = if editing {
            format!("Your response (Enter to post, Esc to cancel)  {counter}")
        } else {
            format!("Press c to write a response  {counter}")
        };

        let input = Paragraph::new(draft)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(Span::styled(input_title, counter_style))
                    .borders(Borders::ALL),
            );
        frame.render_widget(input, input_area);
    }
}
