use super::IAccountRepo;
use crate::repos::shared::inmemory_repo;
use std::sync::Mutex;
use vicinity_domain::{Account, ID};

pub struct InMemoryAccountRepo {
    accounts: Mutex<Vec<Account>>,
}

impl InMemoryAccountRepo {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IAccountRepo for InMemoryAccountRepo {
    async fn insert(&self, account: &Account) -> anyhow::Result<()> {
        inmemory_repo::insert(account, &self.accounts);
        Ok(())
    }

    async fn save(&self, account: &Account) -> anyhow::Result<()> {
        inmemory_repo::save(account, &self.accounts);
        Ok(())
    }

    async fn find(&self, account_id: &ID) -> Option<Account> {
        inmemory_repo::find(account_id, &self.accounts)
    }

    async fn find_many(&self, account_ids: &[ID]) -> anyhow::Result<Vec<Account>> {
        let accounts = inmemory_repo::find_by(&self.accounts, |account| {
            account_ids.contains(&account.id)
        });
        Ok(accounts)
    }

    async fn delete(&self, account_id: &ID) -> Option<Account> {
        inmemory_repo::delete(account_id, &self.accounts)
    }

    async fn find_by_apikey(&self, api_key: &str) -> Option<Account> {
        let accounts = inmemory_repo::find_by(&self.accounts, |account| {
            account.secret_api_key == api_key
        });
        accounts.into_iter().next()
    }
}
