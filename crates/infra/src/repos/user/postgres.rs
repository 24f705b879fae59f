use super::IUserRepo;
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;
use vicinity_domain::{User, ID};

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRaw {
    user_uid: Uuid,
    account_uid: Uuid,
    email: String,
    phone: Option<String>,
    channel: String,
    address: Option<String>,
}

impl From<UserRaw> for User {
    fn from(e: UserRaw) -> Self {
        Self {
            id: e.user_uid.into(),
            account_id: e.account_uid.into(),
            email: e.email,
            phone: e.phone,
            channel: e.channel.parse().unwrap(),
            address: e.address,
        }
    }
}

#[async_trait::async_trait]
impl IUserRepo for PostgresUserRepo {
    async fn insert(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users(user_uid, account_uid, email, phone, channel, address)
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.inner_ref())
        .bind(user.account_id.inner_ref())
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.channel.to_string())
        .bind(&user.address)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert user: {:?}. DB returned error: {:?}",
                user, e
            );
            e
        })?;
        Ok(())
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $2,
            phone = $3,
            channel = $4,
            address = $5
            WHERE user_uid = $1
            "#,
        )
        .bind(user.id.inner_ref())
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.channel.to_string())
        .bind(&user.address)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to save user: {:?}. DB returned error: {:?}",
                user, e
            );
            e
        })?;
        Ok(())
    }

    async fn delete(&self, user_id: &ID) -> Option<User> {
        let res: Option<UserRaw> = sqlx::query_as(
            r#"
            DELETE FROM users
            WHERE user_uid = $1
            RETURNING *
            "#,
        )
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Delete user with id: {:?} failed. DB returned error: {:?}",
                user_id, e
            );
            e
        })
        .ok()?;
        res.map(|u| u.into())
    }

    async fn find(&self, user_id: &ID) -> Option<User> {
        let res: Option<UserRaw> = sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE user_uid = $1
            "#,
        )
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find user with id: {:?} failed. DB returned error: {:?}",
                user_id, e
            );
            e
        })
        .ok()?;
        res.map(|u| u.into())
    }

    async fn find_by_account_id(&self, user_id: &ID, account_id: &ID) -> Option<User> {
        let res: Option<UserRaw> = sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE user_uid = $1 AND
            account_uid = $2
            "#,
        )
        .bind(user_id.inner_ref())
        .bind(account_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find user with id: {:?} and account id: {:?} failed. DB returned error: {:?}",
                user_id, account_id, e
            );
            e
        })
        .ok()?;
        res.map(|u| u.into())
    }

    async fn find_many(&self, user_ids: &[ID]) -> anyhow::Result<Vec<User>> {
        let ids = user_ids.iter().map(|id| *id.inner_ref()).collect::<Vec<_>>();
        let users_raw: Vec<UserRaw> = sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE user_uid = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find users with ids: {:?} failed. DB returned error: {:?}",
                user_ids, e
            );
            e
        })?;

        Ok(users_raw.into_iter().map(|u| u.into()).collect())
    }
}
