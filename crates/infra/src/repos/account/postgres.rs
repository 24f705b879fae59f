use super::IAccountRepo;
use serde_json::Value;
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use tracing::error;
use vicinity_domain::{Account, ID};

pub struct PostgresAccountRepo {
    pool: PgPool,
}

impl PostgresAccountRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
pub struct AccountRaw {
    account_uid: Uuid,
    secret_api_key: String,
    settings: Value,
}

impl From<AccountRaw> for Account {
    fn from(e: AccountRaw) -> Self {
        Self {
            id: e.account_uid.into(),
            secret_api_key: e.secret_api_key,
            settings: serde_json::from_value(e.settings).unwrap(),
        }
    }
}

#[async_trait::async_trait]
impl IAccountRepo for PostgresAccountRepo {
    async fn insert(&self, account: &Account) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts(account_uid, secret_api_key, settings)
            VALUES($1, $2, $3)
            "#,
        )
        .bind(account.id.inner_ref())
        .bind(&account.secret_api_key)
        .bind(Json(&account.settings))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert account: {:?}. DB returned error: {:?}",
                account, e
            );
            e
        })?;
        Ok(())
    }

    async fn save(&self, account: &Account) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET secret_api_key = $2,
            settings = $3
            WHERE account_uid = $1
            "#,
        )
        .bind(account.id.inner_ref())
        .bind(&account.secret_api_key)
        .bind(Json(&account.settings))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to save account: {:?}. DB returned error: {:?}",
                account, e
            );
            e
        })?;
        Ok(())
    }

    async fn find(&self, account_id: &ID) -> Option<Account> {
        let res: Option<AccountRaw> = sqlx::query_as(
            r#"
            SELECT * FROM accounts
            WHERE account_uid = $1
            "#,
        )
        .bind(account_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find account with id: {:?} failed. DB returned error: {:?}",
                account_id, e
            );
            e
        })
        .ok()?;
        res.map(|account| account.into())
    }

    async fn find_many(&self, account_ids: &[ID]) -> anyhow::Result<Vec<Account>> {
        let ids = account_ids
            .iter()
            .map(|id| *id.inner_ref())
            .collect::<Vec<_>>();
        let accounts_raw: Vec<AccountRaw> = sqlx::query_as(
            "
            SELECT * FROM accounts
            WHERE account_uid = ANY($1)
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find accounts with ids: {:?} failed. DB returned error: {:?}",
                account_ids, e
            );
            e
        })?;

        Ok(accounts_raw.into_iter().map(|acc| acc.into()).collect())
    }

    async fn delete(&self, account_id: &ID) -> Option<Account> {
        let res: Option<AccountRaw> = sqlx::query_as(
            "
            DELETE FROM accounts
            WHERE account_uid = $1
            RETURNING *
            ",
        )
        .bind(account_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Delete account with id: {:?} failed. DB returned error: {:?}",
                account_id, e
            );
            e
        })
        .ok()?;
        res.map(|acc| acc.into())
    }

    async fn find_by_apikey(&self, api_key: &str) -> Option<Account> {
        let res: Option<AccountRaw> = sqlx::query_as(
            "
            SELECT * FROM accounts
            WHERE secret_api_key = $1
            ",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Find account with api_key: {:?} failed. DB returned error: {:?}",
                api_key, e
            );
            e
        })
        .ok()?;

        res.map(|acc| acc.into())
    }
}
