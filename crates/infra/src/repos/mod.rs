mod account;
mod event;
mod plan;
mod rating;
mod shared;
mod user;

use account::{IAccountRepo, InMemoryAccountRepo, PostgresAccountRepo};
use event::{IEventRepo, InMemoryEventRepo, PostgresEventRepo};
use plan::{IPlanEntryRepo, InMemoryPlanEntryRepo, PostgresPlanEntryRepo};
use rating::{IRatingRepo, InMemoryRatingRepo, PostgresRatingRepo};
use sqlx::PgPool;
use std::sync::Arc;
use user::{IUserRepo, InMemoryUserRepo, PostgresUserRepo};

pub use shared::query_structs::*;
pub use shared::repo::DeleteResult;

#[derive(Clone)]
pub struct Repos {
    pub accounts: Arc<dyn IAccountRepo>,
    pub users: Arc<dyn IUserRepo>,
    pub events: Arc<dyn IEventRepo>,
    pub plans: Arc<dyn IPlanEntryRepo>,
    pub ratings: Arc<dyn IRatingRepo>,
}

impl Repos {
    pub fn create_postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PostgresAccountRepo::new(pool.clone())),
            users: Arc::new(PostgresUserRepo::new(pool.clone())),
            events: Arc::new(PostgresEventRepo::new(pool.clone())),
            plans: Arc::new(PostgresPlanEntryRepo::new(pool.clone())),
            ratings: Arc::new(PostgresRatingRepo::new(pool)),
        }
    }

    pub fn create_inmemory() -> Self {
        Self {
            accounts: Arc::new(InMemoryAccountRepo::new()),
            users: Arc::new(InMemoryUserRepo::new()),
            events: Arc::new(InMemoryEventRepo::new()),
            plans: Arc::new(InMemoryPlanEntryRepo::new()),
            ratings: Arc::new(InMemoryRatingRepo::new()),
        }
    }
}
