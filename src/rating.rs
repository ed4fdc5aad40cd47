use crate::api::BookApi;
use crate::auth::AuthManager;
use crate::logging;
use std::collections::{HashMap, HashSet};

/// Markup for one inline rating widget. Rated widgets render locked
/// with the user's stars filled; unrated ones render five live stars.
pub fn widget_markup(chapter_id: &str, user_rating: Option<u8>) -> String {
    let rated = user_rating.is_some();
    let stars: String = (1..=5)
        .map(|star| {
            let filled = user_rating.is_some_and(|r| star <= r);
            match (filled, rated) {
                (true, _) => format!(
                    "<span class=\"star filled disabled\" data-value=\"{star}\">★</span>"
                ),
                (false, true) => {
                    format!("<span class=\"star disabled\" data-value=\"{star}\">★</span>")
                }
                (false, false) => format!("<span class=\"star\" data-value=\"{star}\">★</span>"),
            }
        })
        .collect();

    let label = match user_rating {
        Some(r) => format!("✓ You rated {r} stars"),
        None => "Rate this chapter".to_string(),
    };

    format!(
        "<div class=\"rating-container{}\" data-chapter=\"{chapter_id}\">\
<div class=\"rating-label\">{label}</div>\
<div class=\"rating-stars\">{stars}</div>\
<div class=\"rating-summary\"><span class=\"avg-rating\"></span><span class=\"total-ratings\"></span></div>\
</div>",
        if rated { " rated" } else { "" }
    )
}

/// Aggregate rating for one chapter, shown under the stars.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingStats {
    pub average: f64,
    pub total: u64,
}

/// What a submission attempt came to.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingOutcome {
    Saved {
        rating: u8,
        stats: Option<RatingStats>,
    },
    /// The backend already held a rating; local state is reconciled to
    /// the stars it reports.
    AlreadyRated {
        rating: u8,
        stats: Option<RatingStats>,
    },
    /// Refused before any network traffic.
    RejectedLocal(String),
    Failed(String),
}

/// Serializes rating submissions. A chapter with a submission in flight
/// refuses further attempts until that one settles, so double-taps
/// cannot produce double votes.
#[derive(Debug, Default)]
pub struct RatingService {
    in_flight: HashSet<String>,
}

impl RatingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(
        &mut self,
        api: &dyn BookApi,
        auth: &mut AuthManager,
        chapter_id: &str,
        rating: u8,
    ) -> RatingOutcome {
        if !auth.is_logged_in() {
            return RatingOutcome::RejectedLocal("Please login to rate chapters".to_string());
        }
        if let Some(existing) = auth.user_rating(chapter_id) {
            return RatingOutcome::RejectedLocal(format!(
                "You already rated this chapter {existing} stars!"
            ));
        }
        if !self.in_flight.insert(chapter_id.to_string()) {
            return RatingOutcome::RejectedLocal(
                "Please wait, submitting rating...".to_string(),
            );
        }

        let outcome = Self::submit_inner(api, auth, chapter_id, rating);
        // the guard is released no matter how the request ended
        self.in_flight.remove(chapter_id);
        outcome
    }

    fn submit_inner(
        api: &dyn BookApi,
        auth: &mut AuthManager,
        chapter_id: &str,
        rating: u8,
    ) -> RatingOutcome {
        match api.add_rating(chapter_id, rating) {
            Ok(response) if response.success => {
                auth.mark_chapter_rated(chapter_id, rating);
                RatingOutcome::Saved {
                    rating,
                    stats: zip_stats(response.average_rating, response.total_ratings),
                }
            }
            Ok(response) if response.already_rated => {
                let existing = response.existing_rating.unwrap_or(rating);
                auth.mark_chapter_rated(chapter_id, existing);
                RatingOutcome::AlreadyRated {
                    rating: existing,
                    stats: zip_stats(response.average_rating, response.total_ratings),
                }
            }
            Ok(response) => RatingOutcome::Failed(
                response
                    .message
                    .unwrap_or_else(|| "Failed to submit rating".to_string()),
            ),
            Err(err) => {
                logging::error(format!("Rating submission failed: {err}"));
                RatingOutcome::Failed("Failed to submit rating. Please try again.".to_string())
            }
        }
    }

    pub fn is_submitting(&self, chapter_id: &str) -> bool {
        self.in_flight.contains(chapter_id)
    }
}

fn zip_stats(average: Option<f64>, total: Option<u64>) -> Option<RatingStats> {
    match (average, total) {
        (Some(average), Some(total)) => Some(RatingStats { average, total }),
        _ => None,
    }
}

/// Aggregate stats for every rating widget on screen, refreshed as a
/// batch. A widget whose fetch fails just keeps its previous numbers.
#[derive(Debug, Default)]
pub struct RatingBoard {
    stats: HashMap<String, RatingStats>,
}

impl RatingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, api: &dyn BookApi, chapter_ids: &[String]) {
        for chapter_id in chapter_ids {
            match api.chapter_rating(chapter_id) {
                Ok(response) if response.success => {
                    self.stats.insert(
                        chapter_id.clone(),
                        RatingStats {
                            average: response.avg_rating.unwrap_or(0.0),
                            total: response.total_ratings.unwrap_or(0),
                        },
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    logging::debug(format!("Rating fetch for {chapter_id} failed: {err}"))
                }
            }
        }
    }

    pub fn record(&mut self, chapter_id: &str, stats: RatingStats) {
        self.stats.insert(chapter_id.to_string(), stats);
    }

    pub fn stats(&self, chapter_id: &str) -> Option<RatingStats> {
        self.stats.get(chapter_id).copied()
    }

    pub fn summary_label(&self, chapter_id: &str) -> String {
        match self.stats(chapter_id) {
            Some(stats) if stats.total > 0 => {
                format!("{:.1} ({} ratings)", stats.average, stats.total)
            }
            _ => "No ratings yet".to_string(),
        }
    }
}
