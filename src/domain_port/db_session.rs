use crate::domain_model::User;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("multiple users matched {0}")]
    MultipleRows(String),
    #[error("user {0} already exists")]
    Duplicate(String),
    #[error("user {0} does not exist")]
    Missing(String),
    #[error("database error: {0}")]
    Database(String),
}

/// Single-row user lookups, always scoped to one authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    /// Exact match on username.
    Username { username: String, authority: String },
    /// Case-insensitive match on email.
    EmailIgnoreCase { email: String, authority: String },
}

impl UserLookup {
    pub fn authority(&self) -> &str {
        match self {
            UserLookup::Username { authority, .. } => authority,
            UserLookup::EmailIgnoreCase { authority, .. } => authority,
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        if user.authority != self.authority() {
            return false;
        }
        match self {
            UserLookup::Username { username, .. } => &user.username == username,
            UserLookup::EmailIgnoreCase { email, .. } => user
                .email
                .as_deref()
                .is_some_and(|e| e.to_lowercase() == email.to_lowercase()),
        }
    }
}

impl std::fmt::Display for UserLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserLookup::Username {
                username,
                authority,
            } => write!(f, "username={username} authority={authority}"),
            UserLookup::EmailIgnoreCase { email, authority } => {
                write!(f, "email~={email} authority={authority}")
            }
        }
    }
}

/// How a unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEnd {
    Commit,
    Rollback,
    Close,
}

/// What a hook wants after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRetention {
    Keep,
    Remove,
}

pub type TxEndHook = Box<dyn Fn(TxEnd) -> HookRetention + Send + Sync>;

type SharedHook = Arc<dyn Fn(TxEnd) -> HookRetention + Send + Sync>;

/// Registry of transaction-end callbacks shared by session implementations.
///
/// Hooks run outside the registry lock, so a hook may register further hooks.
#[derive(Default)]
pub struct TxEndHooks {
    hooks: Mutex<Vec<SharedHook>>,
}

impl TxEndHooks {
    fn hooks(&self) -> MutexGuard<'_, Vec<SharedHook>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, hook: TxEndHook) {
        self.hooks().push(Arc::from(hook));
    }

    pub fn fire(&self, end: TxEnd) {
        let snapshot: Vec<SharedHook> = self.hooks().clone();
        let finished: Vec<SharedHook> = snapshot
            .into_iter()
            .filter(|hook| (**hook)(end) == HookRetention::Remove)
            .collect();

        if !finished.is_empty() {
            self.hooks()
                .retain(|hook| !finished.iter().any(|done| Arc::ptr_eq(hook, done)));
        }
    }

    pub fn len(&self) -> usize {
        self.hooks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A request-scoped database session. A transaction is begun lazily by the
/// first statement and ends on `commit`, `rollback` or `close`; every
/// registered hook fires once per ending, even if ending it failed.
#[async_trait::async_trait]
pub trait DbSession: Send + Sync {
    /// Zero or one matching row. Two or more is `StoreError::MultipleRows`.
    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError>;

    /// Write the mutable columns of `user` into the current unit of work.
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;

    fn on_transaction_end(&self, hook: TxEndHook);

    async fn commit(&self) -> Result<(), StoreError>;
    async fn rollback(&self) -> Result<(), StoreError>;
    async fn close(&self) -> Result<(), StoreError>;
}

pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Arc<dyn DbSession>;
}
