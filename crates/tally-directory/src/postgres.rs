//! Postgres-backed directory.
//!
//! All operations run against the `user_ledgers` table created by the
//! embedded migrations. The compare-and-swap is a single conditional
//! `UPDATE`; the row is only re-read when that update matches nothing, to
//! tell a missing user from a lost race.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tally_core::{ContentHash, Username};

use crate::directory::{DirectoryEntry, UserDirectory};
use crate::error::{describe, DirectoryError};

/// [`UserDirectory`] over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Connect to `url` and apply pending migrations.
    pub async fn connect(url: &str) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(url)
            .await?;
        tracing::info!("connected to PostgreSQL");
        let dir = Self::from_pool(pool);
        dir.migrate().await?;
        Ok(dir)
    }

    /// Wrap an existing pool. Migrations are not run.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), DirectoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("directory migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn find(&self, username: &Username) -> Result<Option<DirectoryEntry>, DirectoryError> {
        let row = sqlx::query_as::<_, DirectoryRow>(
            "SELECT username, ledger_hash, updated_at FROM user_ledgers WHERE username = $1",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DirectoryRow::into_entry).transpose()
    }

    async fn update(
        &self,
        username: &Username,
        expected: Option<&ContentHash>,
        new: &ContentHash,
    ) -> Result<(), DirectoryError> {
        let result = sqlx::query(
            "UPDATE user_ledgers SET ledger_hash = $1, updated_at = now()
             WHERE username = $2 AND ledger_hash IS NOT DISTINCT FROM $3",
        )
        .bind(new.as_str())
        .bind(username.as_str())
        .bind(expected.map(ContentHash::as_str))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.find(username).await? {
            None => Err(DirectoryError::NotRegistered {
                username: username.to_string(),
            }),
            Some(entry) => Err(DirectoryError::Conflict {
                username: username.to_string(),
                expected: describe(expected),
                found: describe(entry.ledger.as_ref()),
            }),
        }
    }

    async fn register(&self, username: &Username) -> Result<DirectoryEntry, DirectoryError> {
        let inserted = sqlx::query(
            "INSERT INTO user_ledgers (username, ledger_hash) VALUES ($1, NULL)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(username.as_str())
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() > 0 {
            tracing::info!(user = %username, "user registered");
        }

        self.find(username)
            .await?
            .ok_or_else(|| DirectoryError::NotRegistered {
                username: username.to_string(),
            })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DirectoryRow {
    username: String,
    ledger_hash: Option<String>,
    updated_at: DateTime<Utc>,
}

impl DirectoryRow {
    fn into_entry(self) -> Result<DirectoryEntry, DirectoryError> {
        let username = Username::new(&self.username).map_err(|e| DirectoryError::Corrupt {
            reason: e.to_string(),
        })?;
        let ledger = self
            .ledger_hash
            .map(ContentHash::new)
            .transpose()
            .map_err(|e| {
                tracing::error!(user = %username, error = %e, "invalid ledger hash in user_ledgers");
                DirectoryError::Corrupt {
                    reason: e.to_string(),
                }
            })?;
        Ok(DirectoryEntry {
            username,
            ledger,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_without_ledger_is_new_user() {
        let row = DirectoryRow {
            username: "alice".into(),
            ledger_hash: None,
            updated_at: Utc::now(),
        };
        let entry = row.into_entry().unwrap();
        assert_eq!(entry.username.as_str(), "alice");
        assert!(entry.ledger.is_none());
    }

    #[test]
    fn row_with_blank_hash_is_corrupt() {
        let row = DirectoryRow {
            username: "alice".into(),
            ledger_hash: Some("   ".into()),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            row.into_entry(),
            Err(DirectoryError::Corrupt { .. })
        ));
    }
}
