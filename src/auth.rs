use crate::api::BookApi;
use crate::logging;
use crate::models::{UserProfile, UserRating};
use crate::storage::Storage;
use eyre::Result;
use std::collections::HashMap;

/// Session state: who is logged in and which chapters they have rated.
/// Everything gated behind login consults this, never the network.
#[derive(Debug, Default)]
pub struct AuthManager {
    user: Option<UserProfile>,
    authenticated: bool,
    user_ratings: HashMap<String, UserRating>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the session and, if it holds, pull the user's ratings so
    /// rating widgets render in their final state from the first paint.
    /// A failed check is an unauthenticated session, not an error.
    pub fn init(&mut self, api: &dyn BookApi) -> Result<bool> {
        match api.auth_check() {
            Ok(response) if response.success && response.authenticated => {
                self.user = response.user.map(|u| u.into_profile());
                self.authenticated = true;
                self.load_user_ratings(api);
                Ok(true)
            }
            Ok(_) => {
                self.authenticated = false;
                Ok(false)
            }
            Err(err) => {
                logging::error(format!("Auth check failed: {err}"));
                self.authenticated = false;
                Ok(false)
            }
        }
    }

    fn load_user_ratings(&mut self, api: &dyn BookApi) {
        match api.user_ratings() {
            Ok(response) if response.success => {
                self.user_ratings = response.entries().into_iter().collect();
                logging::info(format!(
                    "Loaded {} existing user ratings",
                    self.user_ratings.len()
                ));
            }
            Ok(response) => {
                logging::warn(format!(
                    "Could not load user ratings: {}",
                    response.message.unwrap_or_else(|| "no reason given".to_string())
                ));
            }
            Err(err) => logging::warn(format!("Could not load user ratings: {err}")),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_chapter_rated(&self, chapter_id: &str) -> bool {
        self.user_rating(chapter_id).is_some()
    }

    pub fn user_rating(&self, chapter_id: &str) -> Option<u8> {
        self.user_ratings
            .get(chapter_id)
            .map(|r| r.rating)
            .filter(|r| *r > 0)
    }

    /// Record a rating locally so repeated submissions are refused
    /// without a round trip.
    pub fn mark_chapter_rated(&mut self, chapter_id: &str, rating: u8) {
        self.user_ratings.insert(
            chapter_id.to_string(),
            UserRating {
                rating,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            },
        );
    }

    /// Plain chapter-id -> stars view for the item renderer.
    pub fn ratings_map(&self) -> HashMap<String, u8> {
        self.user_ratings
            .iter()
            .map(|(id, r)| (id.clone(), r.rating))
            .collect()
    }

    /// Avatar initials: first letter of the first and second words of
    /// the display name, or the first two characters of a single word.
    pub fn initials(&self) -> String {
        let Some(user) = &self.user else {
            return String::new();
        };
        let name = user.display_name();
        let words: Vec<&str> = name.split_whitespace().collect();
        match words.as_slice() {
            [] => String::new(),
            [only] => only.chars().take(2).collect::<String>().to_uppercase(),
            [first, second, ..] => {
                let mut out = String::new();
                out.extend(first.chars().next());
                out.extend(second.chars().next());
                out.to_uppercase()
            }
        }
    }

    pub fn is_admin(&self, admin_email: Option<&str>) -> bool {
        match (self.user.as_ref(), admin_email) {
            (Some(user), Some(admin)) => !admin.is_empty() && user.email == admin,
            _ => false,
        }
    }

    /// Drop the session and clear everything persisted locally, so the
    /// next login starts from a clean slate (welcome flag included).
    pub fn logout(&mut self, store: &Storage) -> Result<()> {
        self.user = None;
        self.authenticated = false;
        self.user_ratings.clear();
        store.clear()
    }
}
