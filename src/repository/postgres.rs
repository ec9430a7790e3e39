//! PostgreSQL store.
//!
//! Transactions run at READ COMMITTED. Cross-row invariants are kept by
//! conditional updates, the `loans_one_open_per_pair` partial unique index and
//! `FOR UPDATE` row locks, so a waiting writer re-checks the current row
//! instead of failing with a serialization error.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, Pool, Postgres, Transaction};

use super::{Store, StoreTx};
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};

pub(crate) const BOOKS_ISBN_KEY: &str = "books_isbn_key";
pub(crate) const MEMBERS_EMAIL_KEY: &str = "members_email_key";
pub(crate) const LOANS_ONE_OPEN_PER_PAIR: &str = "loans_one_open_per_pair";

/// Name of the constraint a database error tripped, if any
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
    lock_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Connect a pool sized by configuration
    pub async fn connect(config: &DatabaseConfig, lock_timeout: Duration) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool, lock_timeout))
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {}", e)))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        Ok(Box::new(PgTx { tx: Some(tx) }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// An open PostgreSQL transaction; rolled back by sqlx when dropped uncommitted
pub struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    pub(crate) fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("transaction already committed".to_string()))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(&mut self) -> AppResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::Internal("transaction already committed".to_string()))?;
        tx.commit().await?;
        Ok(())
    }
}

/// Translate a violation of `constraint` into a domain error, pass anything else through
pub(crate) fn map_constraint(
    err: sqlx::Error,
    constraint: &str,
    to: impl FnOnce() -> AppError,
) -> AppError {
    if violated_constraint(&err) == Some(constraint) {
        to()
    } else {
        err.into()
    }
}
