use serde::{Deserialize, Serialize};
use vicinity_domain::{Rating, RatingSummary, ID};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingDTO {
    pub id: ID,
    pub event_id: ID,
    pub user_id: ID,
    pub score: i64,
    pub comment: Option<String>,
    pub created: i64,
    pub updated: i64,
}

impl RatingDTO {
    pub fn new(rating: Rating) -> Self {
        Self {
            id: rating.id.clone(),
            event_id: rating.event_id.clone(),
            user_id: rating.user_id.clone(),
            score: rating.score,
            comment: rating.comment,
            created: rating.created,
            updated: rating.updated,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummaryDTO {
    pub average: f64,
    pub count: usize,
}

impl RatingSummaryDTO {
    pub fn new(summary: RatingSummary) -> Self {
        Self {
            average: summary.average,
            count: summary.count,
        }
    }
}
