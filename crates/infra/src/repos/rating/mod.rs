mod inmemory;
mod postgres;

use crate::repos::shared::repo::DeleteResult;
pub use inmemory::InMemoryRatingRepo;
pub use postgres::PostgresRatingRepo;
use vicinity_domain::{Rating, ID};

#[async_trait::async_trait]
pub trait IRatingRepo: Send + Sync {
    /// Inserts the rating, or replaces score, comment and updated timestamp
    /// when the `(event, user)` pair already has one. Returns the stored
    /// rating, which keeps its original id and created timestamp.
    async fn upsert(&self, rating: &Rating) -> anyhow::Result<Rating>;
    async fn find_by_event(&self, event_id: &ID) -> anyhow::Result<Vec<Rating>>;
    async fn delete_by_event(&self, event_id: &ID) -> anyhow::Result<DeleteResult>;
}

#[cfg(test)]
mod tests {
    use crate::VicinityContext;
    use vicinity_domain::{Rating, ID};

    fn rating(event_id: &ID, user_id: &ID, score: i64) -> Rating {
        Rating {
            id: Default::default(),
            account_id: Default::default(),
            event_id: event_id.clone(),
            user_id: user_id.clone(),
            score,
            comment: None,
            created: 10,
            updated: 10,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_previous_score() {
        let ctx = VicinityContext::create_inmemory();
        let event_id = ID::default();
        let user_id = ID::default();

        let first = ctx
            .repos
            .ratings
            .upsert(&rating(&event_id, &user_id, 2))
            .await
            .unwrap();
        assert_eq!(first.score, 2);

        let mut second = rating(&event_id, &user_id, 5);
        second.comment = Some("Better than expected".into());
        second.updated = 20;
        let stored = ctx.repos.ratings.upsert(&second).await.unwrap();

        // Same row, new score
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.created, first.created);
        assert_eq!(stored.score, 5);
        assert_eq!(stored.comment, Some("Better than expected".into()));
        assert_eq!(stored.updated, 20);

        let ratings = ctx.repos.ratings.find_by_event(&event_id).await.unwrap();
        assert_eq!(ratings.len(), 1);
    }

    #[tokio::test]
    async fn deletes_by_event() {
        let ctx = VicinityContext::create_inmemory();
        let event_id = ID::default();
        let other_event_id = ID::default();

        ctx.repos
            .ratings
            .upsert(&rating(&event_id, &ID::default(), 4))
            .await
            .unwrap();
        ctx.repos
            .ratings
            .upsert(&rating(&event_id, &ID::default(), 3))
            .await
            .unwrap();
        ctx.repos
            .ratings
            .upsert(&rating(&other_event_id, &ID::default(), 5))
            .await
            .unwrap();

        let res = ctx.repos.ratings.delete_by_event(&event_id).await.unwrap();
        assert_eq!(res.deleted_count, 2);
        assert!(ctx
            .repos
            .ratings
            .find_by_event(&event_id)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            ctx.repos
                .ratings
                .find_by_event(&other_event_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
