use std::{error::Error, str::FromStr};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use teloxide::types::UserId;

use super::user::{RegistryEntry, EXPIRY_DATE_FORMAT};

const MAX_CONNECTIONS: u32 = 5;

pub struct Connection {
    pool: SqlitePool,
}

impl Connection {
    pub async fn connect(connection_string: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(connection_string)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        tracing::debug!("Running registry migrations");
        sqlx::migrate!().run(&self.pool).await
    }
}

pub type RegistryResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[async_trait]
pub trait RetrieveUser: Send + Sync {
    async fn retrieve_user(&self, id: UserId) -> RegistryResult<Option<RegistryEntry>>;

    async fn retrieve_all_users(&self) -> RegistryResult<Vec<RegistryEntry>>;
}

#[async_trait]
pub trait UpsertUser: Send + Sync {
    async fn upsert_user(&self, id: UserId, expires: NaiveDate) -> RegistryResult<()>;
}

#[async_trait]
pub trait DeleteUser: Send + Sync {
    /// Returns whether an entry was actually removed.
    async fn delete_user(&self, id: UserId) -> RegistryResult<bool>;
}

fn to_row_id(id: UserId) -> RegistryResult<i64> {
    Ok(i64::try_from(id.0)?)
}

fn from_row((user_id, exp_date): (i64, String)) -> RegistryResult<RegistryEntry> {
    Ok(RegistryEntry::new(UserId(u64::try_from(user_id)?), exp_date))
}

#[async_trait]
impl RetrieveUser for Connection {
    async fn retrieve_user(&self, id: UserId) -> RegistryResult<Option<RegistryEntry>> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT user_id, exp_date FROM users WHERE user_id = ?",
        )
        .bind(to_row_id(id)?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(from_row).transpose()
    }

    async fn retrieve_all_users(&self) -> RegistryResult<Vec<RegistryEntry>> {
        let rows =
            sqlx::query_as::<_, (i64, String)>("SELECT user_id, exp_date FROM users ORDER BY user_id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(from_row).collect()
    }
}

#[async_trait]
impl UpsertUser for Connection {
    async fn upsert_user(&self, id: UserId, expires: NaiveDate) -> RegistryResult<()> {
        sqlx::query("REPLACE INTO users (user_id, exp_date) VALUES (?, ?)")
            .bind(to_row_id(id)?)
            .bind(expires.format(EXPIRY_DATE_FORMAT).to_string())
            .execute(&self.pool)
            .await?;

        tracing::info!(user = id.0, %expires, "Registry entry saved");
        Ok(())
    }
}

#[async_trait]
impl DeleteUser for Connection {
    async fn delete_user(&self, id: UserId) -> RegistryResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
            .bind(to_row_id(id)?)
            .execute(&self.pool)
            .await?;

        tracing::info!(user = id.0, removed = result.rows_affected(), "Registry entry removed");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn in_memory() -> Connection {
        // A single long-lived connection keeps the in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let connection = Connection::from_pool(pool);
        connection.run_migrations().await.unwrap();
        connection
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn upsert_then_retrieve() {
        let connection = in_memory().await;

        connection.upsert_user(UserId(7), date(2030, 5, 1)).await.unwrap();
        let entry = connection.retrieve_user(UserId(7)).await.unwrap().unwrap();

        assert_eq!(entry.user_id(), UserId(7));
        assert_eq!(entry.exp_date(), "2030-05-01");
        assert!(connection.retrieve_user(UserId(8)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_entry() {
        let connection = in_memory().await;

        connection.upsert_user(UserId(7), date(2030, 5, 1)).await.unwrap();
        connection.upsert_user(UserId(7), date(2031, 1, 1)).await.unwrap();

        let all = connection.retrieve_all_users().await.unwrap();
        assert_eq!(all, vec![RegistryEntry::new(UserId(7), "2031-01-01")]);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let connection = in_memory().await;
        connection.upsert_user(UserId(1), date(2030, 1, 1)).await.unwrap();
        connection.upsert_user(UserId(2), date(2030, 1, 1)).await.unwrap();

        assert!(connection.delete_user(UserId(1)).await.unwrap());
        assert!(!connection.delete_user(UserId(1)).await.unwrap());

        let remaining: Vec<UserId> = connection
            .retrieve_all_users()
            .await
            .unwrap()
            .iter()
            .map(RegistryEntry::user_id)
            .collect();
        assert_eq!(remaining, vec![UserId(2)]);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let connection = in_memory().await;

        connection.run_migrations().await.unwrap();
        assert!(connection.retrieve_all_users().await.unwrap().is_empty());
    }
}
