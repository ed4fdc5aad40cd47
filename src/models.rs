use serde::Deserialize;

/// One atomic renderable unit within a chapter. The tag names match the
/// JSON content tree the backend serves; anything unrecognized collapses
/// into `Unknown` and contributes no markup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Paragraph {
        text: String,
    },
    Image {
        src: String,
        #[serde(default)]
        style: Option<String>,
        #[serde(default, rename = "className")]
        class_name: Option<String>,
    },
    Lyrics {
        text: String,
    },
    Metadata {
        date: String,
        author: String,
    },
    Rating {
        #[serde(rename = "chapterId")]
        chapter_id: String,
    },
    #[serde(other)]
    Unknown,
}

/// A chapter carries two identifiers: `id` keys the page-start map and
/// navigation links, `chapter_id` keys every backend call. Both denote
/// the same chapter and both travel through every derived structure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chapter {
    pub id: String,
    #[serde(rename = "chapterId")]
    pub chapter_id: String,
    pub title: String,
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

/// The pre-loaded content tree. Deserialized once at startup and
/// immutable afterwards; pagination reads it, never writes it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookContent {
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Blank,
    Cover,
    CoverBack,
    Content,
    BackCover,
}

/// One generated flipbook page. `html` is the fully assembled inner
/// markup; `chapter_id` is the owning chapter for content pages and
/// `None` for the cover-type pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub kind: PageKind,
    pub html: String,
    pub chapter_id: Option<String>,
}

impl Page {
    pub fn content(html: String, chapter_id: String) -> Self {
        Self {
            kind: PageKind::Content,
            html,
            chapter_id: Some(chapter_id),
        }
    }

    pub fn fixed(kind: PageKind, html: String) -> Self {
        Self {
            kind,
            html,
            chapter_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl UserProfile {
    /// Display name falls back to the email address, like the original
    /// sidebar header.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// A rating the current user already placed on a chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRating {
    pub rating: u8,
    pub timestamp: Option<String>,
}

/// One discussion entry as consumed from `/getComments`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub comment: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
    Info,
}
