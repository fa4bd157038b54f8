use super::util::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

// LIMIT 2 is enough to tell "one" from "more than one".
const SELECT_BY_USERNAME: &str = r#"
SELECT user_id, username, authority, email, is_activated, sidebar_tutorial_dismissed, registered_date
FROM user
WHERE username = ? AND authority = ?
LIMIT 2
"#;

const SELECT_BY_EMAIL: &str = r#"
SELECT user_id, username, authority, email, is_activated, sidebar_tutorial_dismissed, registered_date
FROM user
WHERE LOWER(email) = ? AND authority = ?
LIMIT 2
"#;

pub struct MySqlSessionFactory {
    pool: MySqlPool,
}

impl MySqlSessionFactory {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSessionFactory { pool }
    }

    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = MySqlPool::connect(dsn).await.map_err(store_err)?;
        info!("connected to mysql");
        Ok(Self::new(pool))
    }
}

impl SessionFactory for MySqlSessionFactory {
    fn open(&self) -> Arc<dyn DbSession> {
        Arc::new(MySqlDbSession::new(self.pool.clone()))
    }
}

/// Session holding at most one open transaction, begun by the first
/// statement after the previous one ended.
pub struct MySqlDbSession {
    pool: MySqlPool,
    tx: Mutex<Option<Transaction<'static, MySql>>>,
    hooks: TxEndHooks,
}

impl MySqlDbSession {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlDbSession {
            pool,
            tx: Mutex::new(None),
            hooks: TxEndHooks::default(),
        }
    }

    async fn begin_if_needed<'g>(
        &self,
        slot: &'g mut Option<Transaction<'static, MySql>>,
    ) -> Result<&'g mut Transaction<'static, MySql>, StoreError> {
        if slot.is_none() {
            *slot = Some(self.pool.begin().await.map_err(store_err)?);
            debug!("mysql transaction begun");
        }
        slot.as_mut()
            .ok_or_else(|| StoreError::Database("transaction slot empty".to_string()))
    }

    async fn end(&self, end: TxEnd) -> Result<(), StoreError> {
        let tx = self.tx.lock().await.take();
        let result = match (tx, end) {
            (None, _) => Ok(()),
            (Some(tx), TxEnd::Commit) => tx.commit().await.map_err(store_err),
            (Some(tx), TxEnd::Rollback | TxEnd::Close) => tx.rollback().await.map_err(store_err),
        };
        debug!(?end, ok = result.is_ok(), "mysql transaction ended");
        self.hooks.fire(end);
        result
    }
}

#[async_trait::async_trait]
impl DbSession for MySqlDbSession {
    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        let mut slot = self.tx.lock().await;
        let tx = self.begin_if_needed(&mut slot).await?;

        let rows: Vec<MySqlRow> = match lookup {
            UserLookup::Username {
                username,
                authority,
            } => {
                sqlx::query(SELECT_BY_USERNAME)
                    .bind(username)
                    .bind(authority)
                    .fetch_all(tx.as_mut())
                    .await
            }
            UserLookup::EmailIgnoreCase { email, authority } => {
                sqlx::query(SELECT_BY_EMAIL)
                    .bind(email.to_lowercase())
                    .bind(authority)
                    .fetch_all(tx.as_mut())
                    .await
            }
        }
        .map_err(store_err)?;

        if rows.len() > 1 {
            return Err(StoreError::MultipleRows(lookup.to_string()));
        }
        rows.into_iter().next().map(row_to_user).transpose()
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut slot = self.tx.lock().await;
        let tx = self.begin_if_needed(&mut slot).await?;

        sqlx::query(
            r#"
UPDATE user
SET email = ?, is_activated = ?, sidebar_tutorial_dismissed = ?
WHERE user_id = ?
"#,
        )
        .bind(user.email.as_deref())
        .bind(user.is_activated)
        .bind(user.sidebar_tutorial_dismissed)
        .bind(uid_as_bytes(&user.user_id))
        .execute(tx.as_mut())
        .await
        .map_err(store_err)?;

        Ok(())
    }

    fn on_transaction_end(&self, hook: TxEndHook) {
        self.hooks.register(hook);
    }

    async fn commit(&self) -> Result<(), StoreError> {
        self.end(TxEnd::Commit).await
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        self.end(TxEnd::Rollback).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.end(TxEnd::Close).await
    }
}
