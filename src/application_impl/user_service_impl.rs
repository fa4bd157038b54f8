use super::UserCache;
use crate::application_port::{RequestContext, UserService, UserServiceError};
use crate::domain_model::*;
use crate::domain_port::{DbSession, HookRetention, UserLookup};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RealUserService {
    default_authority: String,
    session: Arc<dyn DbSession>,
    cache: Arc<UserCache>,
}

impl RealUserService {
    pub fn new(
        default_authority: impl Into<String>,
        session: Arc<dyn DbSession>,
    ) -> RealUserService {
        let cache = Arc::new(UserCache::default());

        // Cached users must not leak into the next transaction.
        let hook_cache = Arc::downgrade(&cache);
        session.on_transaction_end(Box::new(move |end| {
            let Some(cache) = hook_cache.upgrade() else {
                return HookRetention::Remove;
            };
            cache.flush();
            debug!(?end, "user cache flushed");
            HookRetention::Keep
        }));

        RealUserService {
            default_authority: default_authority.into(),
            session,
            cache,
        }
    }

    async fn resolve(&self, key: IdentityKey) -> Result<Option<User>, UserServiceError> {
        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, found = cached.is_some(), "user cache hit");
            return Ok(cached);
        }

        let epoch = self.cache.epoch();
        let lookup = UserLookup::Username {
            username: key.username.clone(),
            authority: key.authority.clone(),
        };
        let user = self.session.find_user(&lookup).await?;
        debug!(%key, found = user.is_some(), "user cache miss");

        if !self.cache.insert_at(epoch, key, user.clone()) {
            debug!("transaction ended during lookup, result not cached");
        }
        Ok(user)
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    fn default_authority(&self) -> &str {
        &self.default_authority
    }

    async fn fetch(&self, userid: &str) -> Result<Option<User>, UserServiceError> {
        let parts = split_user(userid)?;
        self.resolve(IdentityKey::new(parts.username, parts.domain)).await
    }

    async fn fetch_by_username(
        &self,
        username: &str,
        authority: &str,
    ) -> Result<Option<User>, UserServiceError> {
        self.resolve(IdentityKey::new(username, authority)).await
    }

    async fn fetch_for_login(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        let authority = self.default_authority.clone();
        let lookup = if username_or_email.contains('@') {
            UserLookup::EmailIgnoreCase {
                email: username_or_email.to_lowercase(),
                authority,
            }
        } else {
            UserLookup::Username {
                username: username_or_email.to_string(),
                authority,
            }
        };

        let Some(user) = self.session.find_user(&lookup).await? else {
            return Ok(None);
        };

        if !user.is_activated {
            warn!(userid = %user.userid(), "login attempt on unactivated account");
            return Err(UserServiceError::NotActivated);
        }

        Ok(Some(user))
    }

    fn update_preferences(
        &self,
        user: &mut User,
        options: &PreferenceOptions,
    ) -> Result<(), UserServiceError> {
        let update = PreferencesUpdate::from_options(options).inspect_err(|e| {
            warn!(userid = %user.userid(), error = %e, "preference update rejected");
        })?;
        update.apply(user);
        if self.cache.refresh(user) {
            debug!(userid = %user.userid(), "cached user refreshed");
        }
        Ok(())
    }
}

/// Build the user service for one request.
pub fn user_service_factory<C: RequestContext + ?Sized>(context: &C) -> RealUserService {
    RealUserService::new(context.authority(), context.db())
}
