mod inmemory;
mod postgres;

pub use inmemory::InMemoryUserRepo;
pub use postgres::PostgresUserRepo;
use vicinity_domain::{User, ID};

#[async_trait::async_trait]
pub trait IUserRepo: Send + Sync {
    async fn insert(&self, user: &User) -> anyhow::Result<()>;
    async fn save(&self, user: &User) -> anyhow::Result<()>;
    async fn delete(&self, user_id: &ID) -> Option<User>;
    async fn find(&self, user_id: &ID) -> Option<User>;
    async fn find_by_account_id(&self, user_id: &ID, account_id: &ID) -> Option<User>;
    async fn find_many(&self, user_ids: &[ID]) -> anyhow::Result<Vec<User>>;
}

#[cfg(test)]
mod tests {
    use crate::VicinityContext;
    use vicinity_domain::{Account, DeliveryChannel, User};

    #[tokio::test]
    async fn create_and_delete() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::default();
        ctx.repos
            .accounts
            .insert(&account)
            .await
            .expect("To insert account");
        let user = User::new(account.id.clone(), "joe@vicinity.dev".into());

        // Insert
        assert!(ctx.repos.users.insert(&user).await.is_ok());

        // Get by id
        let mut user = ctx
            .repos
            .users
            .find(&user.id)
            .await
            .expect("To find user");
        assert_eq!(user.email, "joe@vicinity.dev");
        assert_eq!(user.channel, DeliveryChannel::Email);

        user.phone = Some("+4799887766".into());
        user.channel = DeliveryChannel::Sms;

        // Save
        assert!(ctx.repos.users.save(&user).await.is_ok());

        let updated_user = ctx
            .repos
            .users
            .find_by_account_id(&user.id, &account.id)
            .await
            .expect("To find user by account");
        assert_eq!(updated_user.phone, Some("+4799887766".into()));
        assert_eq!(updated_user.channel, DeliveryChannel::Sms);

        // Delete
        let deleted_user = ctx.repos.users.delete(&user.id).await;
        assert!(deleted_user.is_some());

        // Find
        assert!(ctx.repos.users.find(&user.id).await.is_none());
    }

    #[tokio::test]
    async fn find_many() {
        let ctx = VicinityContext::create_inmemory();
        let account = Account::default();
        ctx.repos
            .accounts
            .insert(&account)
            .await
            .expect("To insert account");

        let user1 = User::new(account.id.clone(), "first@vicinity.dev".into());
        let user2 = User::new(account.id.clone(), "second@vicinity.dev".into());
        ctx.repos.users.insert(&user1).await.unwrap();
        ctx.repos.users.insert(&user2).await.unwrap();

        let users = ctx
            .repos
            .users
            .find_many(&[user1.id.clone(), user2.id.clone()])
            .await
            .expect("To find users");
        assert_eq!(users.len(), 2);
    }
}
