use crate::models::{Comment, UserProfile, UserRating};
use eyre::{Result, WrapErr};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// The backend surface the reader talks to. Every call is a JSON
/// endpoint; the session rides on cookies the client jar carries.
pub trait BookApi {
    fn auth_check(&self) -> Result<AuthCheckResponse>;
    fn user_ratings(&self) -> Result<UserRatingsResponse>;
    fn comments(&self, chapter_id: &str) -> Result<CommentsResponse>;
    fn add_comment(&self, chapter_id: &str, comment: &str) -> Result<AckResponse>;
    fn delete_comment(&self, comment_id: &str) -> Result<AckResponse>;
    fn chapter_rating(&self, chapter_id: &str) -> Result<ChapterRatingResponse>;
    fn add_rating(&self, chapter_id: &str, rating: u8) -> Result<AddRatingResponse>;
    fn send_chapter_notification(&self, chapter_number: &str) -> Result<AckResponse>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthCheckResponse {
    pub success: bool,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// User record as the backend serializes it. Identifiers arrive as
/// numbers or strings depending on the store behind the endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl RawUser {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            id: value_to_string(&self.id),
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRatingsResponse {
    pub success: bool,
    #[serde(default)]
    pub ratings: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UserRatingsResponse {
    /// The ratings payload has shipped in two shapes: a list of
    /// `{chapterId, rating, ...}` records and a map keyed by chapter id.
    /// Zero ratings are placeholders and are dropped either way.
    pub fn entries(&self) -> Vec<(String, UserRating)> {
        let mut out = Vec::new();
        match &self.ratings {
            Some(Value::Array(records)) => {
                for record in records {
                    let Some(chapter_id) = record.get("chapterId").map(value_to_string) else {
                        continue;
                    };
                    let rating = record
                        .get("rating")
                        .and_then(Value::as_u64)
                        .unwrap_or(0) as u8;
                    if rating == 0 {
                        continue;
                    }
                    let timestamp = record
                        .get("timestamp")
                        .or_else(|| record.get("CREATEDTIME"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    out.push((chapter_id, UserRating { rating, timestamp }));
                }
            }
            Some(Value::Object(map)) => {
                for (chapter_id, record) in map {
                    let rating = record
                        .get("rating")
                        .and_then(Value::as_u64)
                        .or_else(|| record.as_u64())
                        .unwrap_or(0) as u8;
                    if rating == 0 {
                        continue;
                    }
                    let timestamp = record
                        .get("timestamp")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    out.push((chapter_id.clone(), UserRating { rating, timestamp }));
                }
            }
            _ => {}
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentsResponse {
    pub success: bool,
    #[serde(default)]
    pub comments: Vec<RawComment>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: Value,
    #[serde(default, rename = "userId")]
    pub user_id: Value,
    #[serde(default, rename = "userName")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RawComment {
    pub fn into_comment(self) -> Comment {
        Comment {
            id: value_to_string(&self.id),
            user_id: value_to_string(&self.user_id),
            user_name: self.user_name.unwrap_or_else(|| "Anonymous".to_string()),
            comment: self.comment,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterRatingResponse {
    pub success: bool,
    #[serde(default, rename = "avgRating")]
    pub avg_rating: Option<f64>,
    #[serde(default, rename = "totalRatings")]
    pub total_ratings: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddRatingResponse {
    pub success: bool,
    #[serde(default, rename = "alreadyRated")]
    pub already_rated: bool,
    #[serde(default, rename = "existingRating")]
    pub existing_rating: Option<u8>,
    #[serde(default, rename = "averageRating")]
    pub average_rating: Option<f64>,
    #[serde(default, rename = "totalRatings")]
    pub total_ratings: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Blocking HTTP client over the book backend. The cookie store keeps
/// the login session alive across calls.
pub struct HttpApi {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("folio")
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .wrap_err("Could not build the HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .wrap_err_with(|| format!("Request to /{} failed", endpoint))
    }

    fn post_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T> {
        self.client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .wrap_err_with(|| format!("Request to /{} failed", endpoint))
    }
}

impl BookApi for HttpApi {
    fn auth_check(&self) -> Result<AuthCheckResponse> {
        self.get_json("auth/check", &[])
    }

    fn user_ratings(&self) -> Result<UserRatingsResponse> {
        self.get_json("getUserRatings", &[])
    }

    fn comments(&self, chapter_id: &str) -> Result<CommentsResponse> {
        self.get_json("getComments", &[("chapterId", chapter_id)])
    }

    fn add_comment(&self, chapter_id: &str, comment: &str) -> Result<AckResponse> {
        self.post_json(
            "addComment",
            json!({ "chapterId": chapter_id, "comment": comment }),
        )
    }

    fn delete_comment(&self, comment_id: &str) -> Result<AckResponse> {
        self.client
            .delete(self.url("deleteComment"))
            .json(&json!({ "commentId": comment_id }))
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .wrap_err("Request to /deleteComment failed")
    }

    fn chapter_rating(&self, chapter_id: &str) -> Result<ChapterRatingResponse> {
        self.get_json("getRatings", &[("chapterId", chapter_id)])
    }

    fn add_rating(&self, chapter_id: &str, rating: u8) -> Result<AddRatingResponse> {
        self.post_json(
            "addRating",
            json!({ "chapterId": chapter_id, "rating": rating }),
        )
    }

    fn send_chapter_notification(&self, chapter_number: &str) -> Result<AckResponse> {
        self.post_json(
            "sendCliqNotification",
            json!({ "chapterNumber": chapter_number }),
        )
    }
}
