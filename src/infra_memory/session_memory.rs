use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A committed row as seen through a staged write. Only the columns
/// `save_user` may change are taken from the staged copy.
fn overlay(row: &User, staged: Option<&User>) -> User {
    let mut seen = row.clone();
    if let Some(update) = staged {
        seen.email = update.email.clone();
        seen.is_activated = update.is_activated;
        seen.sidebar_tutorial_dismissed = update.sidebar_tutorial_dismissed;
    }
    seen
}

/// Committed user rows, shared by every session opened on it.
#[derive(Clone, Default)]
pub struct MemoryUserTable {
    rows: Arc<Mutex<Vec<User>>>,
}

impl MemoryUserTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);
        if rows
            .iter()
            .any(|u| u.username == user.username && u.authority == user.authority)
        {
            return Err(StoreError::Duplicate(user.userid()));
        }
        rows.push(user);
        Ok(())
    }

    pub fn get(&self, user_id: UserId) -> Option<User> {
        lock(&self.rows).iter().find(|u| u.user_id == user_id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.rows).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply(&self, staged: HashMap<UserId, User>) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);
        if let Some(missing) = staged
            .values()
            .find(|s| !rows.iter().any(|u| u.user_id == s.user_id))
        {
            return Err(StoreError::Missing(missing.userid()));
        }
        for row in rows.iter_mut() {
            if let Some(update) = staged.get(&row.user_id) {
                *row = overlay(row, Some(update));
            }
        }
        Ok(())
    }
}

pub struct MemorySessionFactory {
    table: MemoryUserTable,
}

impl MemorySessionFactory {
    pub fn new(table: MemoryUserTable) -> Self {
        MemorySessionFactory { table }
    }
}

impl SessionFactory for MemorySessionFactory {
    fn open(&self) -> Arc<dyn DbSession> {
        Arc::new(MemoryDbSession::new(self.table.clone()))
    }
}

/// Session over a `MemoryUserTable`. Writes are staged per session and only
/// reach the table on commit.
pub struct MemoryDbSession {
    table: MemoryUserTable,
    staged: Mutex<HashMap<UserId, User>>,
    queries: AtomicUsize,
    hooks: TxEndHooks,
}

impl MemoryDbSession {
    pub fn new(table: MemoryUserTable) -> Self {
        MemoryDbSession {
            table,
            staged: Mutex::new(HashMap::new()),
            queries: AtomicUsize::new(0),
            hooks: TxEndHooks::default(),
        }
    }

    /// Number of `find_user` calls issued on this session.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of transaction-end hooks still registered.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    fn end(&self, end: TxEnd) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut *lock(&self.staged));
        let result = match end {
            TxEnd::Commit => self.table.apply(staged),
            TxEnd::Rollback | TxEnd::Close => Ok(()),
        };
        debug!(?end, "memory transaction ended");
        self.hooks.fire(end);
        result
    }
}

#[async_trait::async_trait]
impl DbSession for MemoryDbSession {
    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let staged = lock(&self.staged);
        let rows = lock(&self.table.rows);
        let mut matches = rows
            .iter()
            .map(|row| overlay(row, staged.get(&row.user_id)))
            .filter(|row| lookup.matches(row));

        let first = matches.next();
        if matches.next().is_some() {
            return Err(StoreError::MultipleRows(lookup.to_string()));
        }
        Ok(first)
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        lock(&self.staged).insert(user.user_id, user.clone());
        Ok(())
    }

    fn on_transaction_end(&self, hook: TxEndHook) {
        self.hooks.register(hook);
    }

    async fn commit(&self) -> Result<(), StoreError> {
        self.end(TxEnd::Commit)
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        self.end(TxEnd::Rollback)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.end(TxEnd::Close)
    }
}
