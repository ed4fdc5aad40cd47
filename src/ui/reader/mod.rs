use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::api::{BookApi, HttpApi};
use crate::auth::AuthManager;
use crate::config::Config;
use crate::content::{CoverArt, ItemRenderer};
use crate::discussion::{self, DiscussionManager};
use crate::flipbook::{Flipbook, TurnEngine, START_PAGE};
use crate::logging;
use crate::measure::{self, Measure, TextMeasurer};
use crate::models::{BookContent, Chapter, MessageKind, Page};
use crate::navigation::{build_chapter_nav, ChapterTracker, ReflowScheduler};
use crate::paginate::{self, Pagination};
use crate::rating::{RatingBoard, RatingOutcome, RatingService};
use crate::storage::Storage;
use crate::ui::windows::{discussion::DiscussionPanel, discussion::ResponseRow, toc::ChapterSidebar};

const MESSAGE_EXPIRY: Duration = Duration::from_secs(3);

/// Everything one frame needs, computed before the draw call so the
/// terminal borrow never overlaps reader state.
struct FrameModel {
    header_left: String,
    header_right: String,
    left_text: String,
    right_text: Option<String>,
    page_label: String,
    nav_hint: String,
    active_chapter_id: Option<String>,
    panel_open: bool,
    panel_title: String,
    panel_count: String,
    panel_rows: Vec<ResponseRow>,
    draft: String,
    editing: bool,
    message: Option<(String, MessageKind)>,
}

pub struct Reader {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
    api: HttpApi,
    storage: Storage,
    auth: AuthManager,
    discussion: DiscussionManager,
    rating: RatingService,
    board: RatingBoard,
    book: BookContent,
    pagination: Pagination,
    flipbook: Flipbook<TurnEngine>,
    tracker: ChapterTracker,
    reflow: ReflowScheduler,
    sidebar: ChapterSidebar,
    draft: String,
    editing: bool,
    message: Option<(String, MessageKind, Instant)>,
    should_quit: bool,
}

impl Reader {
    pub fn new(config: Config, book: BookContent) -> eyre::Result<Self> {
        let api = HttpApi::new(&config.settings.backend_url, config.request_timeout())?;
        let storage = Storage::new()?;
        let settle = config.settle_interval();
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

        Ok(Self {
            terminal,
            config,
            api,
            storage,
            auth: AuthManager::new(),
            discussion: DiscussionManager::new(),
            rating: RatingService::new(),
            board: RatingBoard::new(),
            book,
            pagination: Pagination::default(),
            flipbook: Flipbook::new(TurnEngine::new()),
            tracker: ChapterTracker::new(),
            reflow: ReflowScheduler::new(settle),
            sidebar: ChapterSidebar::new(),
            draft: String::new(),
            editing: false,
            message: None,
            should_quit: false,
        })
    }

    /// Run the main application loop
    pub fn run(&mut self) -> eyre::Result<()> {
        // The whole reading surface is gated behind a live session.
        if !self.auth.init(&self.api)? {
            eprintln!("Login required. Please sign in through the website and try again.");
            return Ok(());
        }

        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        self.terminal.clear()?;
        self.terminal.hide_cursor()?;

        self.rebuild_book()?;
        self.after_turn();
        let chapter_ids: Vec<String> =
            self.book.chapters.iter().map(|c| c.chapter_id.clone()).collect();
        self.board.refresh(&self.api, &chapter_ids);

        if !self.storage.welcome_shown()? {
            let name = self
                .auth
                .user()
                .map(|u| u.display_name().to_string())
                .unwrap_or_default();
            self.set_message(format!("Welcome, {name}! Happy reading."), MessageKind::Info);
            self.storage.mark_welcome_shown()?;
        }

        // Main event loop
        loop {
            if self.should_quit {
                break;
            }

            if let Some((_, _, at)) = &self.message {
                if at.elapsed() >= MESSAGE_EXPIRY {
                    self.message = None;
                }
            }

            let model = self.frame_model();
            let sidebar = &self.sidebar;
            self.terminal.draw(|f| Self::render_static(f, &model, sidebar))?;

            let poll_timeout = self.poll_timeout();
            if crossterm::event::poll(poll_timeout)? {
                if let Ok(event) = crossterm::event::read() {
                    match event {
                        Event::Key(key) => {
                            if key.kind == KeyEventKind::Press {
                                self.handle_key_event(key)?;
                            }
                        }
                        Event::Resize(_, _) => {
                            self.reflow.schedule(Instant::now());
                        }
                        _ => {}
                    }
                }
            }

            if self.reflow.fire(Instant::now()) {
                self.reflow_now()?;
            }
        }

        // Cleanup terminal
        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;

        Ok(())
    }

    fn poll_timeout(&self) -> Duration {
        let mut timeout = Duration::from_millis(250);
        if let Some((_, _, at)) = &self.message {
            let remaining = MESSAGE_EXPIRY.saturating_sub(at.elapsed());
            timeout = timeout.min(remaining.max(Duration::from_millis(50)));
        }
        if let Some(remaining) = self.reflow.poll_timeout(Instant::now()) {
            timeout = timeout.min(remaining.max(Duration::from_millis(10)));
        }
        timeout
    }

    /// Paginate the book for the current terminal size and (re)build the
    /// flipbook over the result.
    fn rebuild_book(&mut self) -> eyre::Result<()> {
        let size = self.terminal.size()?;
        let measurer = TextMeasurer::for_viewport(size.width);
        let max_height = measure::max_page_height_px(size.height);
        let ratings = self.auth.ratings_map();
        let renderer = ItemRenderer::new(&ratings);
        let covers = CoverArt {
            front_src: self.config.settings.cover_image_url.clone(),
            inner_src: self.config.settings.cover_back_image_url.clone(),
        };

        self.pagination = paginate::paginate(
            &self.book.chapters,
            max_height,
            &measurer as &dyn Measure,
            &renderer,
            &covers,
        );

        self.flipbook.build(
            &self.pagination.pages,
            measure::viewport_width_px(size.width),
            self.config.settings.mobile_breakpoint_px,
        );

        self.sidebar
            .set_entries(build_chapter_nav(&self.book.chapters, &self.pagination.chapter_starts));
        Ok(())
    }

    /// Reflow after a settled resize burst: the reader stays as close as
    /// possible to the page they were on in the old layout.
    fn reflow_now(&mut self) -> eyre::Result<()> {
        let previous = self.flipbook.is_built().then(|| self.flipbook.current_page());
        self.rebuild_book()?;
        if let Some(previous) = previous {
            if previous > START_PAGE {
                self.flipbook.go_to(previous.min(self.flipbook.total_pages()));
            }
        }
        self.after_turn();
        logging::info(format!(
            "Reflowed to {} pages",
            self.pagination.raw_page_count()
        ));
        Ok(())
    }

    /// Shared post-turn path: when the visible spread crosses into a new
    /// chapter, the discussion panel follows it.
    fn after_turn(&mut self) {
        let page = self.flipbook.current_page();
        let crossed = self
            .tracker
            .on_page_turned(page, &self.pagination.chapter_starts, &self.book.chapters)
            .map(|chapter| (chapter.chapter_id.clone(), chapter.title.clone()));
        if let Some((chapter_id, title)) = crossed {
            self.discussion.load_for_chapter(&self.api, &chapter_id, &title);
            // safe to repeat; a failed fetch keeps the previous numbers
            self.board.refresh(&self.api, std::slice::from_ref(&chapter_id));
        }
    }

    fn set_message(&mut self, message: String, kind: MessageKind) {
        self.message = Some((message, kind, Instant::now()));
    }

    fn active_chapter(&self) -> Option<&Chapter> {
        let chapter_id = self.tracker.current()?;
        self.book.chapters.iter().find(|c| c.chapter_id == chapter_id)
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> eyre::Result<()> {
        if self.editing {
            self.handle_draft_key(key);
            return Ok(());
        }

        if self.sidebar.visible {
            match key.code {
                KeyCode::Down | KeyCode::Char('j') => self.sidebar.next_entry(),
                KeyCode::Up | KeyCode::Char('k') => self.sidebar.previous_entry(),
                KeyCode::Enter => self.jump_to_selected_chapter(),
                _ => self.sidebar.visible = false,
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Left | KeyCode::Char('h') => {
                // never page back into the cover spread
                if self.flipbook.current_page() > START_PAGE + 1 && self.flipbook.previous().is_some() {
                    self.after_turn();
                }
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
                if self.flipbook.next().is_some() {
                    self.after_turn();
                }
            }
            KeyCode::Char('t') => self.sidebar.toggle(),
            KeyCode::Char('d') => self.discussion.toggle(),
            KeyCode::Char('c') => {
                self.discussion.open();
                self.editing = true;
            }
            KeyCode::Char('x') => self.delete_own_latest_response(),
            KeyCode::Char(c @ '1'..='5') => {
                let stars = c as u8 - b'0';
                self.rate_active_chapter(stars);
            }
            KeyCode::Char('n') => self.notify_chapter(),
            KeyCode::Esc => self.discussion.close(),
            _ => {}
        }
        Ok(())
    }

    fn handle_draft_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.editing = false;
            }
            KeyCode::Enter => {
                let draft = self.draft.clone();
                match self.discussion.submit(&self.api, &self.auth, &draft) {
                    Ok(()) => {
                        // the draft is only dropped once the post landed
                        self.draft.clear();
                        self.editing = false;
                        self.set_message("Response posted".to_string(), MessageKind::Success);
                    }
                    Err(message) => self.set_message(message, MessageKind::Error),
                }
            }
            KeyCode::Backspace => {
                self.draft.pop();
            }
            KeyCode::Char(c) => {
                if self.draft.chars().count() < discussion::MAX_RESPONSE_LEN {
                    self.draft.push(c);
                }
            }
            _ => {}
        }
    }

    fn jump_to_selected_chapter(&mut self) {
        let Some(entry) = self.sidebar.get_selected_entry() else {
            return;
        };
        let (target, chapter_id, title) =
            (entry.start_page, entry.chapter_id.clone(), entry.title.clone());
        self.sidebar.visible = false;
        self.flipbook.go_to(target);
        self.tracker.force(&chapter_id);
        self.discussion.load_for_chapter(&self.api, &chapter_id, &title);
    }

    fn rate_active_chapter(&mut self, stars: u8) {
        let Some(chapter) = self.active_chapter() else {
            self.set_message(
                "Turn to a chapter before rating".to_string(),
                MessageKind::Info,
            );
            return;
        };
        let chapter_id = chapter.chapter_id.clone();

        let outcome = self
            .rating
            .submit(&self.api, &mut self.auth, &chapter_id, stars);
        match outcome {
            RatingOutcome::Saved { rating, stats } => {
                if let Some(stats) = stats {
                    self.board.record(&chapter_id, stats);
                }
                self.set_message(
                    format!("Thanks! You rated this chapter {rating} stars."),
                    MessageKind::Success,
                );
                // rated widgets render locked, so the pages are stale
                if self.reflow_after_rating().is_err() {
                    logging::warn("Could not refresh pages after rating");
                }
            }
            RatingOutcome::AlreadyRated { rating, stats } => {
                if let Some(stats) = stats {
                    self.board.record(&chapter_id, stats);
                }
                self.set_message(
                    format!("You already rated this chapter {rating} stars!"),
                    MessageKind::Info,
                );
                if self.reflow_after_rating().is_err() {
                    logging::warn("Could not refresh pages after rating");
                }
            }
            RatingOutcome::RejectedLocal(message) => self.set_message(message, MessageKind::Info),
            RatingOutcome::Failed(message) => self.set_message(message, MessageKind::Error),
        }
    }

    fn reflow_after_rating(&mut self) -> eyre::Result<()> {
        let page = self.flipbook.current_page();
        self.rebuild_book()?;
        self.flipbook.go_to(page.min(self.flipbook.total_pages()));
        Ok(())
    }

    fn delete_own_latest_response(&mut self) {
        let Some(user_id) = self.auth.user().map(|u| u.id.clone()) else {
            return;
        };
        let Some(response_id) = self
            .discussion
            .responses()
            .iter()
            .rev()
            .find(|r| r.user_id == user_id)
            .map(|r| r.id.clone())
        else {
            self.set_message("No response of yours to delete".to_string(), MessageKind::Info);
            return;
        };
        match self.discussion.delete(&self.api, &response_id) {
            Ok(()) => self.set_message("Response deleted".to_string(), MessageKind::Success),
            Err(message) => self.set_message(message, MessageKind::Error),
        }
    }

    fn notify_chapter(&mut self) {
        if !self.auth.is_admin(self.config.admin_email()) {
            return;
        }
        let Some(chapter) = self.active_chapter() else {
            return;
        };
        let chapter_id = chapter.chapter_id.clone();
        match self.api.send_chapter_notification(&chapter_id) {
            Ok(response) if response.success => {
                self.set_message("Notification sent".to_string(), MessageKind::Success)
            }
            Ok(response) => self.set_message(
                response
                    .message
                    .unwrap_or_else(|| "Notification failed".to_string()),
                MessageKind::Error,
            ),
            Err(err) => {
                logging::error(format!("Notification failed: {err}"));
                self.set_message("Notification failed".to_string(), MessageKind::Error);
            }
        }
    }

    fn page_text(&self, raw_page: usize) -> String {
        self.pagination
            .pages
            .get(raw_page.saturating_sub(1))
            .map(|page: &Page| measure::markup_to_text(&page.html))
            .unwrap_or_default()
    }

    fn frame_model(&self) -> FrameModel {
        let (left, right) = self.flipbook.visible_pages();
        let right_text = right.map(|p| self.page_text(p));

        let active_chapter_id = self.tracker.current().map(str::to_string);
        let rating_summary = active_chapter_id
            .as_deref()
            .map(|id| self.board.summary_label(id))
            .unwrap_or_default();

        let user_id = self.auth.user().map(|u| u.id.clone()).unwrap_or_default();
        let now = chrono::Utc::now();
        let panel_rows = self
            .discussion
            .responses()
            .iter()
            .map(|response| ResponseRow {
                initials: discussion::get_initials(&response.user_name),
                author: response.user_name.clone(),
                when: discussion::time_ago(response.timestamp.as_deref(), now),
                text: response.comment.clone(),
                own: response.user_id == user_id,
            })
            .collect();

        let header_right = match self.auth.user() {
            Some(user) => format!("[{}] {}", self.auth.initials(), user.display_name()),
            None => String::new(),
        };

        FrameModel {
            header_left: self
                .active_chapter()
                .map(|c| c.title.clone())
                .unwrap_or_else(|| "Cover".to_string()),
            header_right,
            left_text: self.page_text(left),
            right_text,
            page_label: format!("{}  {}", self.flipbook.page_label(), rating_summary),
            nav_hint: nav_hint(self.flipbook.can_previous(), self.flipbook.can_next()),
            active_chapter_id,
            panel_open: self.discussion.is_open() || self.editing,
            panel_title: self.discussion.chapter_title().to_string(),
            panel_count: self.discussion.count_label(),
            panel_rows,
            draft: self.draft.clone(),
            editing: self.editing,
            message: self
                .message
                .as_ref()
                .map(|(text, kind, _)| (text.clone(), *kind)),
        }
    }

    fn render_static(frame: &mut Frame, model: &FrameModel, sidebar: &ChapterSidebar) {
        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let header = Line::from(vec![
            Span::styled(
                model.header_left.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                model.header_right.clone(),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        frame.render_widget(Paragraph::new(header), header_area);

        match &model.right_text {
            Some(right_text) => {
                let [left_area, right_area] =
                    Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                        .areas(body_area);
                Self::render_page(frame, left_area, &model.left_text);
                Self::render_page(frame, right_area, right_text);
            }
            None => Self::render_page(frame, body_area, &model.left_text),
        }

        let footer = Line::from(vec![
            Span::raw(model.page_label.clone()),
            Span::raw("  "),
            Span::styled(model.nav_hint.clone(), Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(footer), footer_area);

        sidebar.render(frame, frame.area(), model.active_chapter_id.as_deref());

        if model.panel_open {
            DiscussionPanel::render(
                frame,
                frame.area(),
                &model.panel_title,
                &model.panel_count,
                &model.panel_rows,
                &model.draft,
                model.editing,
                discussion::char_count_state(model.draft.chars().count()),
            );
        }

        if let Some((message, kind)) = &model.message {
            Self::render_message_static(frame, message, *kind);
        }
    }

    fn render_page(frame: &mut Frame, area: Rect, text: &str) {
        let paragraph = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_message_static(frame: &mut Frame, message: &str, kind: MessageKind) {
        let color = match kind {
            MessageKind::Success => Color::Green,
            MessageKind::Error => Color::Red,
            MessageKind::Info => Color::Blue,
        };

        let area = frame.area();
        let width = (message.chars().count() as u16 + 4).min(area.width);
        let rect = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + area.height.saturating_sub(4),
            width,
            3,
        );

        frame.render_widget(Clear, rect);
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, rect);
    }
}

fn nav_hint(can_previous: bool, can_next: bool) -> String {
    match (can_previous, can_next) {
        (true, true) => "< prev | next >".to_string(),
        (false, true) => "  next >".to_string(),
        (true, false) => "< prev".to_string(),
        (false, false) => String::new(),
    }
}
