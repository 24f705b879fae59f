use super::IUserRepo;
use crate::repos::shared::inmemory_repo;
use std::sync::Mutex;
use vicinity_domain::{User, ID};

pub struct InMemoryUserRepo {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IUserRepo for InMemoryUserRepo {
    async fn insert(&self, user: &User) -> anyhow::Result<()> {
        inmemory_repo::insert(user, &self.users);
        Ok(())
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        inmemory_repo::save(user, &self.users);
        Ok(())
    }

    async fn delete(&self, user_id: &ID) -> Option<User> {
        inmemory_repo::delete(user_id, &self.users)
    }

    async fn find(&self, user_id: &ID) -> Option<User> {
        inmemory_repo::find(user_id, &self.users)
    }

    async fn find_by_account_id(&self, user_id: &ID, account_id: &ID) -> Option<User> {
        let users = inmemory_repo::find_by(&self.users, |user| {
            user.id == *user_id && user.account_id == *account_id
        });
        users.into_iter().next()
    }

    async fn find_many(&self, user_ids: &[ID]) -> anyhow::Result<Vec<User>> {
        let users = inmemory_repo::find_by(&self.users, |user| user_ids.contains(&user.id));
        Ok(users)
    }
}
