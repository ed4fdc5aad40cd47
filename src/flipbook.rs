use crate::logging;
use crate::models::Page;

/// Raw page the book opens on: past the blank page and the front cover,
/// onto the inside-cover spread.
pub const START_PAGE: usize = 2;

/// Book opens flat below this width and shows one page at a time.
pub const MOBILE_BREAKPOINT_PX: f64 = 768.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Single,
    Double,
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode::Double
    }
}

/// The page-turn engine behind the flipbook. Raw pages are 1-based; the
/// engine owns the current position and clamps every move to the book.
pub trait PageTurner {
    fn load(&mut self, pages: &[Page], mode: DisplayMode, start: usize);
    fn page(&self) -> usize;
    fn pages(&self) -> usize;
    /// Returns true when the position actually changed.
    fn turn_to(&mut self, page: usize) -> bool;
    fn next(&mut self) -> bool;
    fn previous(&mut self) -> bool;
    fn set_display(&mut self, mode: DisplayMode);
    fn destroy(&mut self);
}

/// Default turn engine. Double mode steps a spread (two raw pages) at a
/// time; single mode steps one.
#[derive(Debug, Default)]
pub struct TurnEngine {
    page: usize,
    pages: usize,
    mode: DisplayMode,
    loaded: bool,
}

impl TurnEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn clamp(&self, page: usize) -> usize {
        page.clamp(1, self.pages.max(1))
    }

    fn step(&self) -> usize {
        match self.mode {
            DisplayMode::Single => 1,
            DisplayMode::Double => 2,
        }
    }
}

impl PageTurner for TurnEngine {
    fn load(&mut self, pages: &[Page], mode: DisplayMode, start: usize) {
        self.pages = pages.len();
        self.mode = mode;
        self.page = start.clamp(1, self.pages.max(1));
        self.loaded = true;
    }

    fn page(&self) -> usize {
        self.page
    }

    fn pages(&self) -> usize {
        self.pages
    }

    fn turn_to(&mut self, page: usize) -> bool {
        if !self.loaded {
            return false;
        }
        let target = self.clamp(page);
        if target == self.page {
            return false;
        }
        self.page = target;
        true
    }

    fn next(&mut self) -> bool {
        self.turn_to(self.page.saturating_add(self.step()))
    }

    fn previous(&mut self) -> bool {
        self.turn_to(self.page.saturating_sub(self.step()))
    }

    fn set_display(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    fn destroy(&mut self) {
        self.loaded = false;
        self.page = 0;
        self.pages = 0;
    }
}

/// Presentation wrapper over the turn engine. Keeps the off-by-one
/// between raw pages (blank page is raw page 1) and displayed numbers
/// (cover is "page 1") in one place.
pub struct Flipbook<T: PageTurner> {
    engine: T,
    mode: DisplayMode,
    built: bool,
}

impl<T: PageTurner> Flipbook<T> {
    pub fn new(engine: T) -> Self {
        Self {
            engine,
            mode: DisplayMode::Double,
            built: false,
        }
    }

    /// (Re)build the book over a fresh page list. Any previous instance
    /// is torn down first so rebuilds never stack.
    pub fn build(&mut self, pages: &[Page], viewport_width_px: f64, breakpoint_px: f64) {
        if self.built {
            self.engine.destroy();
        }
        self.mode = if viewport_width_px <= breakpoint_px {
            DisplayMode::Single
        } else {
            DisplayMode::Double
        };
        self.engine.load(pages, self.mode, START_PAGE);
        self.built = true;
        logging::debug(format!(
            "Flipbook built: {} raw pages, {:?} display",
            pages.len(),
            self.mode
        ));
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn current_page(&self) -> usize {
        self.engine.page()
    }

    pub fn total_pages(&self) -> usize {
        self.engine.pages()
    }

    /// The leading blank page is invisible to the reader, so displayed
    /// numbers run one behind the raw ones.
    pub fn page_label(&self) -> String {
        format!(
            "Page {} of {}",
            self.engine.page().saturating_sub(1),
            self.engine.pages().saturating_sub(1)
        )
    }

    pub fn can_previous(&self) -> bool {
        self.engine.page() > START_PAGE
    }

    pub fn can_next(&self) -> bool {
        self.engine.page() < self.engine.pages()
    }

    pub fn next(&mut self) -> Option<usize> {
        self.engine.next().then(|| self.engine.page())
    }

    pub fn previous(&mut self) -> Option<usize> {
        self.engine.previous().then(|| self.engine.page())
    }

    pub fn go_to(&mut self, raw_page: usize) -> Option<usize> {
        self.engine.turn_to(raw_page).then(|| self.engine.page())
    }

    /// Raw pages currently on screen: the current page, plus its right
    /// neighbor in double display when one exists.
    pub fn visible_pages(&self) -> (usize, Option<usize>) {
        let page = self.engine.page();
        let right = match self.mode {
            DisplayMode::Double if page + 1 <= self.engine.pages() => Some(page + 1),
            _ => None,
        };
        (page, right)
    }
}
