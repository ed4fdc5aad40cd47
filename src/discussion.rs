use crate::api::{BookApi, RawComment};
use crate::auth::AuthManager;
use crate::logging;
use crate::models::Comment;
use chrono::{DateTime, Utc};

/// Hard cap on one discussion response.
pub const MAX_RESPONSE_LEN: usize = 1000;
/// Character counter turns amber past this point.
pub const RESPONSE_WARNING_LEN: usize = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharCountState {
    Ok,
    Warning,
    Error,
}

pub fn char_count_state(len: usize) -> CharCountState {
    if len >= MAX_RESPONSE_LEN {
        CharCountState::Error
    } else if len > RESPONSE_WARNING_LEN {
        CharCountState::Warning
    } else {
        CharCountState::Ok
    }
}

pub fn validate_draft(draft: &str) -> Result<&str, String> {
    let trimmed = draft.trim();
    if trimmed.is_empty() {
        return Err("Please write a response before submitting".to_string());
    }
    if trimmed.chars().count() > MAX_RESPONSE_LEN {
        return Err(format!(
            "Response is too long (max {MAX_RESPONSE_LEN} characters)"
        ));
    }
    Ok(trimmed)
}

/// The discussion panel's state: which chapter it shows and its loaded
/// responses. Reloaded whenever the reader crosses into a new chapter.
#[derive(Debug, Default)]
pub struct DiscussionManager {
    current_chapter_id: Option<String>,
    current_chapter_title: String,
    responses: Vec<Comment>,
    panel_open: bool,
}

impl DiscussionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the panel at a chapter and fetch its responses. A failed
    /// fetch leaves an empty list rather than stale entries from the
    /// previous chapter.
    pub fn load_for_chapter(&mut self, api: &dyn BookApi, chapter_id: &str, title: &str) {
        self.current_chapter_id = Some(chapter_id.to_string());
        self.current_chapter_title = title.to_string();
        self.responses = match api.comments(chapter_id) {
            Ok(response) if response.success => response
                .comments
                .into_iter()
                .map(RawComment::into_comment)
                .collect(),
            Ok(response) => {
                logging::warn(format!(
                    "Could not load responses for chapter {chapter_id}: {}",
                    response.message.unwrap_or_else(|| "no reason given".to_string())
                ));
                Vec::new()
            }
            Err(err) => {
                logging::warn(format!(
                    "Could not load responses for chapter {chapter_id}: {err}"
                ));
                Vec::new()
            }
        };
    }

    /// Post the draft to the current chapter. On success the list is
    /// reloaded from the backend; on failure the caller keeps the draft
    /// so nothing typed is lost.
    pub fn submit(
        &mut self,
        api: &dyn BookApi,
        auth: &AuthManager,
        draft: &str,
    ) -> Result<(), String> {
        if !auth.is_logged_in() {
            return Err("Please login to join the discussion".to_string());
        }
        let Some(chapter_id) = self.current_chapter_id.clone() else {
            return Err("No chapter selected".to_string());
        };
        let text = validate_draft(draft)?;

        match api.add_comment(&chapter_id, text) {
            Ok(response) if response.success => {
                let title = self.current_chapter_title.clone();
                self.load_for_chapter(api, &chapter_id, &title);
                Ok(())
            }
            Ok(response) => Err(response
                .message
                .unwrap_or_else(|| "Failed to post response".to_string())),
            Err(err) => {
                logging::error(format!("Posting response failed: {err}"));
                Err("Failed to post response. Please try again.".to_string())
            }
        }
    }

    pub fn delete(&mut self, api: &dyn BookApi, response_id: &str) -> Result<(), String> {
        let Some(chapter_id) = self.current_chapter_id.clone() else {
            return Err("No chapter selected".to_string());
        };
        match api.delete_comment(response_id) {
            Ok(response) if response.success => {
                let title = self.current_chapter_title.clone();
                self.load_for_chapter(api, &chapter_id, &title);
                Ok(())
            }
            Ok(response) => Err(response
                .message
                .unwrap_or_else(|| "Failed to delete response".to_string())),
            Err(err) => {
                logging::error(format!("Deleting response failed: {err}"));
                Err("Failed to delete response. Please try again.".to_string())
            }
        }
    }

    pub fn chapter_id(&self) -> Option<&str> {
        self.current_chapter_id.as_deref()
    }

    pub fn chapter_title(&self) -> &str {
        &self.current_chapter_title
    }

    pub fn responses(&self) -> &[Comment] {
        &self.responses
    }

    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    pub fn count_label(&self) -> String {
        match self.responses.len() {
            1 => "1 response".to_string(),
            n => format!("{n} responses"),
        }
    }

    pub fn is_open(&self) -> bool {
        self.panel_open
    }

    pub fn open(&mut self) {
        self.panel_open = true;
    }

    pub fn close(&mut self) {
        self.panel_open = false;
    }

    pub fn toggle(&mut self) {
        self.panel_open = !self.panel_open;
    }
}

/// Avatar initials for a response author: first letter of the first and
/// last words of the name.
pub fn get_initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => "?".to_string(),
        [only] => only.chars().take(1).collect::<String>().to_uppercase(),
        [first, .., last] => {
            let mut out = String::new();
            out.extend(first.chars().next());
            out.extend(last.chars().next());
            out.to_uppercase()
        }
    }
}

/// Relative timestamp label. Unparseable or missing timestamps read as
/// freshly posted.
pub fn time_ago(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = timestamp else {
        return "Just now".to_string();
    };
    let Ok(parsed) = DateTime::parse_from_rfc3339(raw) else {
        return "Just now".to_string();
    };
    let seconds = (now - parsed.with_timezone(&Utc)).num_seconds().max(0);

    if seconds < 60 {
        "Just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3600)
    } else if seconds < 7 * 86_400 {
        format!("{}d ago", seconds / 86_400)
    } else if seconds < 28 * 86_400 {
        format!("{}w ago", seconds / (7 * 86_400))
    } else if seconds < 365 * 86_400 {
        format!("{}mo ago", seconds / (30 * 86_400))
    } else {
        format!("{}y ago", seconds / (365 * 86_400))
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        AckResponse, AddRatingResponse, AuthCheckResponse, BookApi, ChapterRatingResponse,
        CommentsResponse, UserRatingsResponse,
    };
    use chrono::TimeZone;
    use eyre::Result;
    use std::cell::RefCell;

    struct MockApi {
        comments: RefCell<Vec<String>>,
        fail_add: bool,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                comments: RefCell::new(vec!["First!".to_string()]),
                fail_add: false,
            }
        }

        fn failing() -> Self {
            Self {
                comments: RefCell::new(Vec::new()),
                fail_add: true,
            }
        }
    }

    impl BookApi for MockApi {
        fn auth_check(&self) -> Result<AuthCheckResponse> {
            Ok(serde_json::from_str(
                r#"{"success":true,"authenticated":true,"user":{"id":1,"name":"Ada","email":"ada@example.com"}}"#,
            )?)
        }

        fn user_ratings(&self) -> Result<UserRatingsResponse> {
            Ok(serde_json::from_str(r#"{"success":true,"ratings":[]}"#)?)
        }

        fn comments(&self, _: &str) -> Result<CommentsResponse> {
            let comments: Vec<serde_json::Value> = self
                .comments
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    serde_json::json!({
                        "id": i + 1,
                        "userId": "1",
                        "userName": "Ada",
                        "comment": text,
                        "timestamp": "2026-08-01T12:00:00Z"
                    })
                })
                .collect();
            Ok(serde_json::from_value(
                serde_json::json!({ "success": true, "comments": comments }),
            )?)
        }

        fn add_comment(&self, _: &str, comment: &str) -> Result<AckResponse> {
            if self.fail_add {
                return Ok(serde_json::from_str(
                    r#"{"success":false,"message":"backend said no"}"#,
                )?);
            }
            self.comments.borrow_mut().push(comment.to_string());
            Ok(serde_json::from_str(r#"{"success":true}"#)?)
        }

        fn delete_comment(&self, comment_id: &str) -> Result<AckResponse> {
            let index: usize = comment_id.parse::<usize>().unwrap() - 1;
            self.comments.borrow_mut().remove(index);
            Ok(serde_json::from_str(r#"{"success":true}"#)?)
        }

        fn chapter_rating(&self, _: &str) -> Result<ChapterRatingResponse> {
            unimplemented!()
        }

        fn add_rating(&self, _: &str, _: u8) -> Result<AddRatingResponse> {
            unimplemented!()
        }

        fn send_chapter_notification(&self, _: &str) -> Result<AckResponse> {
            unimplemented!()
        }
    }

    fn logged_in_auth(api: &MockApi) -> AuthManager {
        let mut auth = AuthManager::new();
        auth.init(api).unwrap();
        auth
    }

    #[test]
    fn load_points_the_panel_at_a_chapter() {
        let api = MockApi::new();
        let mut panel = DiscussionManager::new();
        panel.load_for_chapter(&api, "3", "Gamma");
        assert_eq!(panel.chapter_id(), Some("3"));
        assert_eq!(panel.chapter_title(), "Gamma");
        assert_eq!(panel.response_count(), 1);
        assert_eq!(panel.responses()[0].comment, "First!");
    }

    #[test]
    fn submit_posts_and_reloads() {
        let api = MockApi::new();
        let auth = logged_in_auth(&api);
        let mut panel = DiscussionManager::new();
        panel.load_for_chapter(&api, "3", "Gamma");

        panel.submit(&api, &auth, "  What a chapter  ").unwrap();
        assert_eq!(panel.response_count(), 2);
        assert_eq!(panel.responses()[1].comment, "What a chapter");
    }

    #[test]
    fn submit_requires_login() {
        let api = MockApi::new();
        let auth = AuthManager::new();
        let mut panel = DiscussionManager::new();
        panel.load_for_chapter(&api, "3", "Gamma");

        let err = panel.submit(&api, &auth, "hi").unwrap_err();
        assert!(err.contains("login"));
        assert_eq!(panel.response_count(), 1);
    }

    #[test]
    fn failed_submit_keeps_existing_responses() {
        let api = MockApi::failing();
        let auth = logged_in_auth(&api);
        let mut panel = DiscussionManager::new();
        panel.load_for_chapter(&api, "3", "Gamma");

        let err = panel.submit(&api, &auth, "hello").unwrap_err();
        assert_eq!(err, "backend said no");
    }

    #[test]
    fn delete_reloads_the_list() {
        let api = MockApi::new();
        let mut panel = DiscussionManager::new();
        panel.load_for_chapter(&api, "3", "Gamma");
        panel.delete(&api, "1").unwrap();
        assert_eq!(panel.response_count(), 0);
    }

    #[test]
    fn draft_validation() {
        assert!(validate_draft("   ").is_err());
        assert_eq!(validate_draft(" ok "), Ok("ok"));
        let long = "x".repeat(MAX_RESPONSE_LEN + 1);
        assert!(validate_draft(&long).is_err());
        let exactly = "x".repeat(MAX_RESPONSE_LEN);
        assert!(validate_draft(&exactly).is_ok());
    }

    #[test]
    fn char_counter_thresholds() {
        assert_eq!(char_count_state(0), CharCountState::Ok);
        assert_eq!(char_count_state(900), CharCountState::Ok);
        assert_eq!(char_count_state(901), CharCountState::Warning);
        assert_eq!(char_count_state(999), CharCountState::Warning);
        assert_eq!(char_count_state(1000), CharCountState::Error);
    }

    #[test]
    fn count_label_pluralizes() {
        let api = MockApi::new();
        let mut panel = DiscussionManager::new();
        panel.load_for_chapter(&api, "3", "Gamma");
        assert_eq!(panel.count_label(), "1 response");

        let empty = DiscussionManager::new();
        assert_eq!(empty.count_label(), "0 responses");
    }

    #[test]
    fn initials_take_first_and_last_words() {
        assert_eq!(get_initials("Ada Augusta Lovelace"), "AL");
        assert_eq!(get_initials("plato"), "P");
        assert_eq!(get_initials(""), "?");
    }

    #[test]
    fn time_ago_ladder() {
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap();
        let at = |s: &str| time_ago(Some(s), now);

        assert_eq!(at("2026-08-23T11:59:30Z"), "Just now");
        assert_eq!(at("2026-08-23T11:45:00Z"), "15m ago");
        assert_eq!(at("2026-08-23T09:00:00Z"), "3h ago");
        assert_eq!(at("2026-08-21T12:00:00Z"), "2d ago");
        assert_eq!(at("2026-08-09T12:00:00Z"), "2w ago");
        assert_eq!(at("2026-06-23T12:00:00Z"), "2mo ago");
        assert_eq!(at("2024-08-23T12:00:00Z"), "2y ago");

        assert_eq!(time_ago(None, now), "Just now");
        assert_eq!(time_ago(Some("garbage"), now), "Just now");
    }

    #[test]
    fn escape_html_covers_the_usual_suspects() {
        assert_eq!(
            escape_html(r#"<b>"a" & 'b'</b>"#),
            "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;"
        );
    }
}
