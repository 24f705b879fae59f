use super::IRatingRepo;
use crate::repos::shared::inmemory_repo;
use crate::repos::shared::repo::DeleteResult;
use std::sync::Mutex;
use vicinity_domain::{Rating, ID};

pub struct InMemoryRatingRepo {
    ratings: Mutex<Vec<Rating>>,
}

impl InMemoryRatingRepo {
    pub fn new() -> Self {
        Self {
            ratings: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IRatingRepo for InMemoryRatingRepo {
    async fn upsert(&self, rating: &Rating) -> anyhow::Result<Rating> {
        let mut ratings = self.ratings.lock().unwrap();
        for existing in ratings.iter_mut() {
            if existing.event_id == rating.event_id && existing.user_id == rating.user_id {
                existing.score = rating.score;
                existing.comment = rating.comment.clone();
                existing.updated = rating.updated;
                return Ok(existing.clone());
            }
        }
        ratings.push(rating.clone());
        Ok(rating.clone())
    }

    async fn find_by_event(&self, event_id: &ID) -> anyhow::Result<Vec<Rating>> {
        let ratings =
            inmemory_repo::find_by(&self.ratings, |rating| rating.event_id == *event_id);
        Ok(ratings)
    }

    async fn delete_by_event(&self, event_id: &ID) -> anyhow::Result<DeleteResult> {
        let res = inmemory_repo::delete_by(&self.ratings, |rating| rating.event_id == *event_id);
        Ok(res)
    }
}
