use crate::dtos::{RatingDTO, RatingSummaryDTO};
use serde::{Deserialize, Serialize};
use vicinity_domain::{Rating, RatingSummary, ID};

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub rating: RatingDTO,
}

impl RatingResponse {
    pub fn new(rating: Rating) -> Self {
        Self {
            rating: RatingDTO::new(rating),
        }
    }
}

pub mod rate_event {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_id: ID,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub user_id: ID,
        pub score: i64,
        #[serde(default)]
        pub comment: Option<String>,
    }

    pub type APIResponse = RatingResponse;
}

pub mod get_event_ratings {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_id: ID,
    }

    #[derive(Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub ratings: Vec<RatingDTO>,
        pub summary: RatingSummaryDTO,
    }

    impl APIResponse {
        pub fn new(ratings: Vec<Rating>, summary: RatingSummary) -> Self {
            Self {
                ratings: ratings.into_iter().map(RatingDTO::new).collect(),
                summary: RatingSummaryDTO::new(summary),
            }
        }
    }
}
