use crate::content::{self, CoverArt, ItemRenderer};
use crate::logging;
use crate::measure::Measure;
use crate::models::{Chapter, Page, PageKind};

/// Items are moved to a new page slightly before they would exactly
/// overflow the budget.
pub const PAGE_SAFETY_MARGIN: f64 = 10.0;

/// The complete result of one pagination run. Replaced wholesale on
/// every rebuild; readers see either the old snapshot or the new one.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub pages: Vec<Page>,
    /// Chapter `id` -> page count at the moment the chapter's first page
    /// was about to be appended. Monotonic in chapter order.
    pub chapter_starts: Vec<(String, usize)>,
}

impl Pagination {
    pub fn start_of(&self, chapter_id: &str) -> Option<usize> {
        self.chapter_starts
            .iter()
            .find(|(id, _)| id == chapter_id)
            .map(|(_, start)| *start)
    }

    /// Raw page count as the turn engine sees it (1-based pages).
    pub fn raw_page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

struct PageAccumulator {
    elements: Vec<String>,
    height: f64,
}

impl PageAccumulator {
    fn new() -> Self {
        Self {
            elements: Vec::new(),
            height: 0.0,
        }
    }

    fn push(&mut self, markup: String, height: f64) {
        self.elements.push(markup);
        self.height += height;
    }

    fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn flush(&mut self, chapter_id: &str) -> Page {
        let html = std::mem::take(&mut self.elements).concat();
        self.height = 0.0;
        Page::content(html, chapter_id.to_string())
    }
}

/// Greedy single-pass packer: fixed leading pages, then each chapter's
/// title and items in order, then the back cover. An item is never split
/// across pages; one that alone exceeds the budget is placed alone and
/// allowed to overflow rather than being dropped.
pub fn paginate(
    chapters: &[Chapter],
    max_page_height: f64,
    measure: &dyn Measure,
    renderer: &ItemRenderer,
    covers: &CoverArt,
) -> Pagination {
    let mut pages = vec![
        Page::fixed(PageKind::Blank, content::blank_page_markup()),
        Page::fixed(PageKind::Cover, content::cover_markup(&covers.front_src)),
        Page::fixed(
            PageKind::CoverBack,
            content::cover_markup(&covers.inner_src),
        ),
    ];
    let mut chapter_starts = Vec::with_capacity(chapters.len());
    let budget = max_page_height - PAGE_SAFETY_MARGIN;

    for chapter in chapters {
        logging::debug(format!("Paginating {}", chapter.title));
        chapter_starts.push((chapter.id.clone(), pages.len()));

        let mut current = PageAccumulator::new();

        // The title opens every chapter page run and never triggers a
        // break by itself, even when it alone exceeds the budget.
        let title_html = content::title_markup(&chapter.title);
        let title_height = measure.measure(&title_html);
        current.push(title_html, title_height);

        for item in &chapter.content {
            let element_html = renderer.render(item);
            if element_html.is_empty() {
                continue;
            }
            let element_height = measure.measure(&element_html);

            if current.height + element_height > budget {
                pages.push(current.flush(&chapter.chapter_id));
            }
            current.push(element_html, element_height);
        }

        if !current.is_empty() {
            pages.push(current.flush(&chapter.chapter_id));
        }
    }

    pages.push(Page::fixed(PageKind::BackCover, content::back_cover_markup()));

    logging::info(format!(
        "Pagination complete: {} pages across {} chapters",
        pages.len(),
        chapters.len()
    ));

    Pagination {
        pages,
        chapter_starts,
    }
}
