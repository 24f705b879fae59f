mod inmemory;
mod postgres;

pub use inmemory::InMemoryAccountRepo;
pub use postgres::PostgresAccountRepo;
use vicinity_domain::{Account, ID};

#[async_trait::async_trait]
pub trait IAccountRepo: Send + Sync {
    async fn insert(&self, account: &Account) -> anyhow::Result<()>;
    async fn save(&self, account: &Account) -> anyhow::Result<()>;
    async fn find(&self, account_id: &ID) -> Option<Account>;
    async fn find_many(&self, account_ids: &[ID]) -> anyhow::Result<Vec<Account>>;
    async fn delete(&self, account_id: &ID) -> Option<Account>;
    async fn find_by_apikey(&self, api_key: &str) -> Option<Account>;
}

#[cfg(test)]
mod tests {
    use crate::VicinityContext;
    use vicinity_domain::Entity;

    #[tokio::test]
    async fn create_and_delete() {
        let ctx = VicinityContext::create_inmemory();
        let account = Default::default();

        // Insert
        assert!(ctx.repos.accounts.insert(&account).await.is_ok());

        // Different find methods
        let res = ctx.repos.accounts.find(account.id()).await.unwrap();
        assert_eq!(res.id, account.id);
        let res = ctx
            .repos
            .accounts
            .find_many(&[account.id.clone()])
            .await
            .unwrap();
        assert_eq!(res[0].id, account.id);
        let res = ctx
            .repos
            .accounts
            .find_by_apikey(&account.secret_api_key)
            .await
            .unwrap();
        assert_eq!(res.id, account.id);

        // Delete
        let res = ctx.repos.accounts.delete(&account.id).await;
        assert!(res.is_some());
        assert_eq!(res.unwrap().id, account.id);

        // Find
        assert!(ctx.repos.accounts.find(&account.id).await.is_none());
    }

    #[tokio::test]
    async fn update() {
        let ctx = VicinityContext::create_inmemory();
        let mut account = vicinity_domain::Account::new();

        // Insert
        assert!(ctx.repos.accounts.insert(&account).await.is_ok());

        assert!(account
            .settings
            .set_webhook_url(Some("https://example.com/hook".into())));

        // Save
        assert!(ctx.repos.accounts.save(&account).await.is_ok());

        // Find
        let res = ctx.repos.accounts.find(&account.id).await.unwrap();
        assert_eq!(
            res.settings.webhook.unwrap().url,
            "https://example.com/hook"
        );
    }
}
