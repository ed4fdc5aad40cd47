use crate::models::{BookContent, ContentItem};
use crate::rating;
use eyre::{Result, WrapErr};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Cover artwork the fixed leading/trailing pages embed.
#[derive(Debug, Clone, Default)]
pub struct CoverArt {
    pub front_src: String,
    pub inner_src: String,
}

pub fn load_book_content(path: &Path) -> Result<BookContent> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Could not read book content from {}", path.display()))?;
    let book: BookContent = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Invalid book content in {}", path.display()))?;
    Ok(book)
}

/// Renders content items to their page markup. Rating placeholders are
/// resolved against the caller's rating map at render time, so the
/// renderer is rebuilt (cheaply) whenever pagination runs.
pub struct ItemRenderer<'a> {
    user_ratings: &'a HashMap<String, u8>,
}

impl<'a> ItemRenderer<'a> {
    pub fn new(user_ratings: &'a HashMap<String, u8>) -> Self {
        Self { user_ratings }
    }

    pub fn render(&self, item: &ContentItem) -> String {
        match item {
            ContentItem::Paragraph { text } => format!("<p>{}</p>", text),
            ContentItem::Image {
                src,
                style,
                class_name,
            } => render_image(src, style.as_deref(), class_name.as_deref()),
            ContentItem::Lyrics { text } => format!(
                "<div class=\"song-lyrics\"><center><i><pre>{}</pre></i></center></div>",
                text
            ),
            ContentItem::Metadata { date, author } => format!(
                "<div class=\"post-date\"><span class=\"date\">{}</span><span class=\"author\">{}</span></div>",
                date, author
            ),
            ContentItem::Rating { chapter_id } => {
                rating::widget_markup(chapter_id, self.user_ratings.get(chapter_id).copied())
            }
            ContentItem::Unknown => String::new(),
        }
    }
}

/// A landscape/wide image is laid out full-width with an unconstrained
/// height; everything else keeps its explicit inline style, if any.
fn render_image(src: &str, style: Option<&str>, class_name: Option<&str>) -> String {
    let is_landscape = class_name == Some("landscape-image")
        || style.is_some_and(|s| s.contains("aspect-ratio"));

    let style_attr = if is_landscape {
        " style=\"width: 100%; height: auto; max-height: none; object-fit: contain;\"".to_string()
    } else {
        match style {
            Some(s) => format!(" style=\"{}\"", s),
            None => String::new(),
        }
    };

    format!(
        "<img src=\"{}\" alt=\"Chapter illustration\"{}>",
        src, style_attr
    )
}

pub fn title_markup(title: &str) -> String {
    format!("<h2>{}</h2>", title)
}

pub fn blank_page_markup() -> String {
    "<div class=\"hard\"><div class=\"cover-content\"></div></div>".to_string()
}

pub fn cover_markup(src: &str) -> String {
    format!(
        "<div class=\"hard\"><div class=\"cover-content\"><img src=\"{}\"></div></div>",
        src
    )
}

pub fn back_cover_markup() -> String {
    "<div class=\"hard\"><div class=\"cover-content back-cover\"><h2>Be sure to leave ratings!!</h2></div></div>"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer_with(ratings: &HashMap<String, u8>) -> ItemRenderer<'_> {
        ItemRenderer::new(ratings)
    }

    #[test]
    fn paragraph_markup() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        let html = renderer.render(&ContentItem::Paragraph {
            text: "Once upon a time".to_string(),
        });
        assert_eq!(html, "<p>Once upon a time</p>");
    }

    #[test]
    fn landscape_class_forces_full_width_style() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        let html = renderer.render(&ContentItem::Image {
            src: "wide.png".to_string(),
            style: None,
            class_name: Some("landscape-image".to_string()),
        });
        assert!(html.contains("width: 100%"));
        assert!(html.contains("max-height: none"));
    }

    #[test]
    fn aspect_ratio_marker_in_style_selects_landscape() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        let html = renderer.render(&ContentItem::Image {
            src: "wide.png".to_string(),
            style: Some("aspect-ratio: 16/9;".to_string()),
            class_name: None,
        });
        assert!(html.contains("width: 100%"));
    }

    #[test]
    fn explicit_inline_style_is_kept_for_portrait_images() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        let html = renderer.render(&ContentItem::Image {
            src: "tall.png".to_string(),
            style: Some("max-width: 60%;".to_string()),
            class_name: None,
        });
        assert!(html.contains("style=\"max-width: 60%;\""));
        assert!(!html.contains("width: 100%"));
    }

    #[test]
    fn image_without_style_has_no_style_attr() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        let html = renderer.render(&ContentItem::Image {
            src: "plain.png".to_string(),
            style: None,
            class_name: None,
        });
        assert_eq!(
            html,
            "<img src=\"plain.png\" alt=\"Chapter illustration\">"
        );
    }

    #[test]
    fn lyrics_block_preserves_whitespace_wrapper() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        let html = renderer.render(&ContentItem::Lyrics {
            text: "la la\n  la".to_string(),
        });
        assert!(html.starts_with("<div class=\"song-lyrics\">"));
        assert!(html.contains("<pre>la la\n  la</pre>"));
    }

    #[test]
    fn metadata_markup() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        let html = renderer.render(&ContentItem::Metadata {
            date: "2025-11-01".to_string(),
            author: "A. Writer".to_string(),
        });
        assert!(html.contains("<span class=\"date\">2025-11-01</span>"));
        assert!(html.contains("<span class=\"author\">A. Writer</span>"));
    }

    #[test]
    fn rating_placeholder_resolves_against_user_ratings() {
        let mut ratings = HashMap::new();
        ratings.insert("ch2".to_string(), 4u8);
        let renderer = renderer_with(&ratings);

        let rated = renderer.render(&ContentItem::Rating {
            chapter_id: "ch2".to_string(),
        });
        assert!(rated.contains("You rated 4 stars"));

        let unrated = renderer.render(&ContentItem::Rating {
            chapter_id: "ch9".to_string(),
        });
        assert!(unrated.contains("Rate this chapter"));
    }

    #[test]
    fn unknown_item_renders_nothing() {
        let ratings = HashMap::new();
        let renderer = renderer_with(&ratings);
        assert_eq!(renderer.render(&ContentItem::Unknown), "");
    }

    #[test]
    fn load_book_content_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        std::fs::write(
            &path,
            r#"{"chapters":[{"id":"chapter-1","chapterId":"1","title":"One","content":[{"type":"paragraph","text":"hi"}]}]}"#,
        )
        .unwrap();
        let book = load_book_content(&path).unwrap();
        assert_eq!(book.chapters.len(), 1);
        assert_eq!(book.chapters[0].chapter_id, "1");
    }

    #[test]
    fn load_book_content_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_book_content(&path).is_err());
    }
}
