use std::collections::HashMap;

/// Layout geometry in CSS-pixel units, mapped onto terminal cells at a
/// fixed cell size. Keeping the budget math in pixels means the page
/// margin and breakpoint constants carry over from the site unchanged.
pub const COL_WIDTH_PX: f64 = 8.0;
pub const ROW_HEIGHT_PX: f64 = 18.0;

/// Total vertical padding/margin reserved on every page.
pub const PAGE_VERTICAL_MARGIN_PX: f64 = 90.0;
/// Horizontal padding of the live page (both sides combined).
pub const PAGE_HORIZONTAL_PADDING_PX: f64 = 90.0;

/// Placeholder block heights for images, which have no text to lay out.
const IMAGE_ROWS: f64 = 12.0;
const LANDSCAPE_IMAGE_ROWS: f64 = 16.0;

pub fn viewport_width_px(cols: u16) -> f64 {
    cols as f64 * COL_WIDTH_PX
}

pub fn max_page_height_px(rows: u16) -> f64 {
    (rows as f64 * ROW_HEIGHT_PX - PAGE_VERTICAL_MARGIN_PX).max(ROW_HEIGHT_PX)
}

/// Width, in columns, of the text area of a single page. Pages are
/// displayed as left/right halves of the book, so the probe width is
/// half the book width minus the page padding.
pub fn content_cols(viewport_cols: u16) -> usize {
    let page_px = viewport_width_px(viewport_cols) / 2.0;
    let text_px = (page_px - PAGE_HORIZONTAL_PADDING_PX).max(COL_WIDTH_PX * 10.0);
    (text_px / COL_WIDTH_PX) as usize
}

/// Measures one item's rendered markup and reports its height in pixel
/// units. Implementations must be deterministic for a fixed width: the
/// paginator measures each item exactly once and never re-measures.
pub trait Measure {
    fn measure(&self, markup: &str) -> f64;
}

/// Production measurer: lays the markup out at the content width a live
/// page uses and counts wrapped lines. The probe buffer is scoped to the
/// call — built, read, and dropped — so a failed layout can never leak
/// state into the next measurement.
pub struct TextMeasurer {
    content_cols: usize,
}

impl TextMeasurer {
    pub fn new(content_cols: usize) -> Self {
        Self { content_cols }
    }

    pub fn for_viewport(viewport_cols: u16) -> Self {
        Self::new(content_cols(viewport_cols))
    }

    pub fn content_cols(&self) -> usize {
        self.content_cols
    }
}

impl Measure for TextMeasurer {
    fn measure(&self, markup: &str) -> f64 {
        if markup.is_empty() {
            return 0.0;
        }

        if markup.contains("<img") {
            let rows = if markup.contains("width: 100%") {
                LANDSCAPE_IMAGE_ROWS
            } else {
                IMAGE_ROWS
            };
            return rows * ROW_HEIGHT_PX;
        }

        let blocks = markup_to_blocks(markup);
        let mut rows = 0usize;
        for block in &blocks {
            for line in block.lines() {
                if line.trim().is_empty() {
                    rows += 1;
                } else {
                    rows += textwrap::wrap(line, self.content_cols).len();
                }
            }
            // one spacing row between blocks, like block-level margins
            rows += 1;
        }
        rows as f64 * ROW_HEIGHT_PX
    }
}

/// Strip tags from item markup, emitting one text block per block-level
/// element. Inline tags vanish; literal newlines (lyrics `<pre>`) are
/// preserved inside a block.
pub fn markup_to_blocks(markup: &str) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = markup.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '<' {
            let mut tag = String::new();
            for t in chars.by_ref() {
                if t == '>' {
                    break;
                }
                tag.push(t);
            }
            let name: String = tag
                .trim_start_matches('/')
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            if is_block_tag(&name) && !current.trim().is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() {
        blocks.push(current);
    }

    blocks
        .into_iter()
        .map(|b| decode_entities(&b))
        .filter(|b| !b.trim().is_empty())
        .collect()
}

/// Flatten page markup into display text for the terminal.
pub fn markup_to_text(markup: &str) -> String {
    markup_to_blocks(markup)
        .iter()
        .map(|b| b.trim_matches('\n').to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "h1" | "h2" | "h3" | "h4" | "pre" | "br" | "center"
    )
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Test measurer returning scripted heights, keyed on a markup
/// substring; everything else gets the default height.
pub struct FixedMeasurer {
    heights: HashMap<String, f64>,
    default: f64,
    calls: std::cell::Cell<usize>,
}

impl FixedMeasurer {
    pub fn new(default: f64) -> Self {
        Self {
            heights: HashMap::new(),
            default,
            calls: std::cell::Cell::new(0),
        }
    }

    pub fn with(mut self, needle: &str, height: f64) -> Self {
        self.heights.insert(needle.to_string(), height);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Measure for FixedMeasurer {
    fn measure(&self, markup: &str) -> f64 {
        self.calls.set(self.calls.get() + 1);
        for (needle, height) in &self.heights {
            if markup.contains(needle.as_str()) {
                return *height;
            }
        }
        self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_budget() {
        // 40 rows * 18px = 720px, minus the 90px margin
        assert_eq!(max_page_height_px(40), 630.0);
        // never collapses below one row
        assert_eq!(max_page_height_px(0), ROW_HEIGHT_PX);
    }

    #[test]
    fn content_width_is_half_book_minus_padding() {
        // 120 cols -> 960px book -> 480px page -> 390px text -> 48 cols
        assert_eq!(content_cols(120), 48);
    }

    #[test]
    fn measurement_is_deterministic() {
        let measurer = TextMeasurer::for_viewport(120);
        let markup = "<p>Some paragraph of reasonable length that wraps over a couple of lines when laid out at the page width.</p>";
        let first = measurer.measure(markup);
        let second = measurer.measure(markup);
        assert_eq!(first, second);
        assert!(first > 0.0);
    }

    #[test]
    fn narrower_width_measures_taller() {
        let wide = TextMeasurer::new(60);
        let narrow = TextMeasurer::new(20);
        let markup = "<p>A paragraph that is long enough to wrap differently at different widths, several times over.</p>";
        assert!(narrow.measure(markup) > wide.measure(markup));
    }

    #[test]
    fn empty_markup_measures_zero() {
        let measurer = TextMeasurer::new(40);
        assert_eq!(measurer.measure(""), 0.0);
    }

    #[test]
    fn image_markup_uses_placeholder_block() {
        let measurer = TextMeasurer::new(40);
        let portrait = measurer.measure("<img src=\"a.png\" alt=\"Chapter illustration\">");
        let landscape = measurer.measure(
            "<img src=\"a.png\" alt=\"Chapter illustration\" style=\"width: 100%; height: auto; max-height: none; object-fit: contain;\">",
        );
        assert_eq!(portrait, IMAGE_ROWS * ROW_HEIGHT_PX);
        assert_eq!(landscape, LANDSCAPE_IMAGE_ROWS * ROW_HEIGHT_PX);
    }

    #[test]
    fn lyrics_preserve_literal_newlines() {
        let measurer = TextMeasurer::new(40);
        let one = measurer.measure("<div><center><i><pre>one line</pre></i></center></div>");
        let three =
            measurer.measure("<div><center><i><pre>one\ntwo\nthree</pre></i></center></div>");
        assert!(three > one);
    }

    #[test]
    fn markup_to_blocks_strips_tags_and_entities() {
        let blocks = markup_to_blocks("<p>Tom &amp; Jerry</p><h2>Next</h2>");
        assert_eq!(blocks, vec!["Tom & Jerry".to_string(), "Next".to_string()]);
    }

    #[test]
    fn markup_to_text_joins_blocks() {
        let text = markup_to_text("<h2>Title</h2><p>Body</p>");
        assert_eq!(text, "Title\n\nBody");
    }

    #[test]
    fn fixed_measurer_scripted_heights() {
        let measurer = FixedMeasurer::new(10.0).with("tall", 500.0);
        assert_eq!(measurer.measure("<p>short</p>"), 10.0);
        assert_eq!(measurer.measure("<p>tall item</p>"), 500.0);
        assert_eq!(measurer.calls(), 2);
    }
}
