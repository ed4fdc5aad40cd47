use crate::models::Chapter;
use std::time::{Duration, Instant};

/// Resolve which chapter a raw page belongs to. Both halves of the open
/// spread are checked (the flipbook may report the left page while the
/// chapter opens on the right), and when they land in different
/// chapters the one with the higher start page wins.
pub fn resolve_chapter<'a>(
    raw_page: usize,
    starts: &[(String, usize)],
    chapters: &'a [Chapter],
) -> Option<&'a Chapter> {
    let mut best: Option<(&str, usize)> = None;

    for candidate in [raw_page, raw_page + 1] {
        for (i, (id, start)) in starts.iter().enumerate() {
            let end = starts
                .get(i + 1)
                .map(|(_, next)| *next)
                .unwrap_or(usize::MAX);
            if candidate >= *start && candidate < end {
                match best {
                    Some((_, s)) if s >= *start => {}
                    _ => best = Some((id.as_str(), *start)),
                }
            }
        }
    }

    let (id, _) = best?;
    chapters.iter().find(|c| c.id == id)
}

/// One table-of-contents entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NavEntry {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    /// Raw page the entry jumps to. One past the recorded start, so the
    /// chapter's first page lands on the right half of the spread.
    pub start_page: usize,
}

pub fn build_chapter_nav(chapters: &[Chapter], starts: &[(String, usize)]) -> Vec<NavEntry> {
    chapters
        .iter()
        .filter_map(|chapter| {
            let start = starts
                .iter()
                .find(|(id, _)| *id == chapter.id)
                .map(|(_, s)| *s)?;
            Some(NavEntry {
                id: chapter.id.clone(),
                chapter_id: chapter.chapter_id.clone(),
                title: chapter.title.clone(),
                start_page: start + 1,
            })
        })
        .collect()
}

/// Tracks the chapter the reader is in and reports transitions exactly
/// once. Turning pages within a chapter stays silent.
#[derive(Debug, Default)]
pub struct ChapterTracker {
    notified: Option<String>,
}

impl ChapterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after every page turn. Returns the chapter only when it
    /// differs from the last one reported.
    pub fn on_page_turned<'a>(
        &mut self,
        raw_page: usize,
        starts: &[(String, usize)],
        chapters: &'a [Chapter],
    ) -> Option<&'a Chapter> {
        let chapter = resolve_chapter(raw_page, starts, chapters)?;
        if self.notified.as_deref() == Some(chapter.chapter_id.as_str()) {
            return None;
        }
        self.notified = Some(chapter.chapter_id.clone());
        Some(chapter)
    }

    /// Record a transition made outside the normal turn path, e.g. a
    /// direct jump from the chapter list.
    pub fn force(&mut self, chapter_id: &str) {
        self.notified = Some(chapter_id.to_string());
    }

    pub fn current(&self) -> Option<&str> {
        self.notified.as_deref()
    }
}

/// Debounces reflow after resize events. Every resize pushes the
/// deadline out by the full settle interval; the reflow runs once the
/// stream has been quiet that long.
#[derive(Debug)]
pub struct ReflowScheduler {
    settle: Duration,
    deadline: Option<Instant>,
}

impl ReflowScheduler {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.settle);
    }

    /// Returns true exactly once per settled burst.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// How long the event loop may block before the deadline needs a
    /// look. None when nothing is scheduled.
    pub fn poll_timeout(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
