use crate::shared::entity::{Entity, ID};

/// A user's score for an `Event`, one per `(event, user)` pair. Submitting
/// again replaces the previous score.
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub id: ID,
    pub account_id: ID,
    pub event_id: ID,
    pub user_id: ID,
    pub score: i64,
    pub comment: Option<String>,
    pub created: i64,
    pub updated: i64,
}

impl Entity for Rating {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
}

impl RatingSummary {
    pub fn new(scores: &[i64]) -> Self {
        if scores.is_empty() {
            return Self {
                average: 0.0,
                count: 0,
            };
        }
        let sum: i64 = scores.iter().sum();
        Self {
            average: sum as f64 / scores.len() as f64,
            count: scores.len(),
        }
    }
}
