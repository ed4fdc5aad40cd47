use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use crate::navigation::NavEntry;
use crate::ui::windows::centered_popup_area;

/// Chapter list popup. Entries jump straight to a chapter's start page.
pub struct ChapterSidebar {
    pub visible: bool,
    pub entries: Vec<NavEntry>,
    pub selected_index: usize,
}

impl ChapterSidebar {
    pub fn new() -> Self {
        Self {
            visible: false,
            entries: Vec::new(),
            selected_index: 0,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn set_entries(&mut self, entries: Vec<NavEntry>) {
        self.entries = entries;
        self.selected_index = self.selected_index.min(self.entries.len().saturating_sub(1));
    }

    pub fn next_entry(&mut self) {
        if !self.entries.is_empty() {
            self.selected_index = (self.selected_index + 1).min(self.entries.len() - 1);
        }
    }

    pub fn previous_entry(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn get_selected_entry(&self) -> Option<&NavEntry> {
        self.entries.get(self.selected_index)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, active_chapter_id: Option<&str>) {
        if !self.visible {
            return;
        }

        let popup_area = centered_popup_area(area, 50, 80);

        frame.render_widget(Clear, popup_area);

        if self.entries.is_empty() {
            let empty_text = vec![
                Line::from("No chapters available"),
                Line::from(""),
                Line::from(Span::styled(
                    "Press any key to close",
                    Style::default().add_modifier(Modifier::ITALIC),
                )),
            ];

            let paragraph = Paragraph::new(empty_text)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title("Chapters").borders(Borders::ALL));

            frame.render_widget(paragraph, popup_area);
            return;
        }

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let style = if i == self.selected_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else if active_chapter_id == Some(entry.chapter_id.as_str()) {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                let content = format!("{} (page {})", entry.title, entry.start_page - 1);

                ListItem::new(Line::from(content)).style(style)
            })
            .collect();

        let list =
            List::new(items).block(Block::default().title("Chapters").borders(Borders::ALL));

        frame.render_widget(list, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: usize) -> Vec<NavEntry> {
        (0..n)
            .map(|i| NavEntry {
                id: format!("chapter-{i}"),
                chapter_id: format!("{i}"),
                title: format!("Chapter {i}"),
                start_page: 3 + i * 2,
            })
            .collect()
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut sidebar = ChapterSidebar::new();
        sidebar.set_entries(entries(3));

        sidebar.previous_entry();
        assert_eq!(sidebar.selected_index, 0);

        sidebar.next_entry();
        sidebar.next_entry();
        sidebar.next_entry();
        assert_eq!(sidebar.selected_index, 2);
        assert_eq!(
            sidebar.get_selected_entry().map(|e| e.id.as_str()),
            Some("chapter-2")
        );
    }

    #[test]
    fn shrinking_entries_clamps_the_selection() {
        let mut sidebar = ChapterSidebar::new();
        sidebar.set_entries(entries(5));
        sidebar.selected_index = 4;

        sidebar.set_entries(entries(2));
        assert_eq!(sidebar.selected_index, 1);
    }

    #[test]
    fn empty_sidebar_has_no_selection() {
        let mut sidebar = ChapterSidebar::new();
        assert!(sidebar.get_selected_entry().is_none());
        sidebar.next_entry();
        assert_eq!(sidebar.selected_index, 0);
    }
}
