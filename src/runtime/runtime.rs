use crate::application_port::RequestScope;
use crate::domain_model::User;
use crate::domain_port::SessionFactory;
use crate::infra_memory::{MemorySessionFactory, MemoryUserTable};
use crate::infra_mysql::MySqlSessionFactory;
use crate::settings::{SeedUser, Settings};
use std::sync::Arc;
use tracing::info;

/// Process-wide wiring: one session factory, one default authority.
pub struct Runtime {
    default_authority: String,
    sessions: Arc<dyn SessionFactory>,
}

impl Runtime {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let sessions: Arc<dyn SessionFactory> = match settings.database.backend.as_str() {
            "memory" => {
                let table = seed_table(&settings.database.seed)?;
                info!(users = table.len(), "memory backend seeded");
                Arc::new(MemorySessionFactory::new(table))
            }
            "mysql" => {
                let dsn = settings
                    .database
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("database.dsn is required for mysql"))?;
                Arc::new(MySqlSessionFactory::connect(dsn).await?)
            }
            other => return Err(anyhow::anyhow!("Unknown database backend: {}", other)),
        };

        Ok(Runtime {
            default_authority: settings.user.default_authority.clone(),
            sessions,
        })
    }

    pub fn new(default_authority: impl Into<String>, sessions: Arc<dyn SessionFactory>) -> Self {
        Runtime {
            default_authority: default_authority.into(),
            sessions,
        }
    }

    /// A fresh scope for one request, with its own session.
    pub fn open_request(&self) -> RequestScope {
        RequestScope::new(self.default_authority.clone(), self.sessions.open())
    }
}

fn seed_table(seed: &[SeedUser]) -> anyhow::Result<MemoryUserTable> {
    let table = MemoryUserTable::new();
    for row in seed {
        let mut user = User::new(&row.username, &row.authority);
        user.email = row.email.clone();
        user.is_activated = row.is_activated;
        table.insert(user)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::user_service_factory;
    use crate::application_port::{RequestContext, UserService};
    use crate::settings::parse_settings;

    #[tokio::test]
    async fn dev_settings_build_a_working_runtime() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        let runtime = Runtime::try_new(&settings).await.unwrap();

        let scope = runtime.open_request();
        assert_eq!(scope.authority(), "localhost");

        let service = user_service_factory(&scope);
        let alice = service.fetch_for_login("alice@example.com").await.unwrap();
        assert_eq!(alice.map(|u| u.username), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn requests_share_committed_state() {
        let table = MemoryUserTable::new();
        table.insert(User::new("foo", "example.com")).unwrap();
        let runtime = Runtime::new("example.com", Arc::new(MemorySessionFactory::new(table)));

        let first = runtime.open_request();
        let service = user_service_factory(&first);
        let mut foo = service.fetch("acct:foo@example.com").await.unwrap().unwrap();
        foo.sidebar_tutorial_dismissed = true;
        first.db.save_user(&foo).await.unwrap();
        first.db.commit().await.unwrap();

        let second = runtime.open_request();
        let seen = user_service_factory(&second)
            .fetch("acct:foo@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(seen.sidebar_tutorial_dismissed);
    }

    #[test]
    fn duplicate_seed_rows_are_rejected() {
        let row = SeedUser {
            username: "foo".into(),
            authority: "example.com".into(),
            email: None,
            is_activated: true,
        };
        assert!(seed_table(&[row.clone(), row]).is_err());
    }
}
