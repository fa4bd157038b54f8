use crate::domain_model::{PreferenceOptions, PreferencesError, User, UseridError};
use crate::domain_port::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// The login matched an account that has not been activated yet.
    #[error("user account is not activated")]
    NotActivated,
    /// Unknown preference keys, sorted.
    #[error("settings with keys {} are not allowed", .0.join(", "))]
    DisallowedPreferences(Vec<String>),
    #[error("setting {key} must be a boolean")]
    InvalidPreferenceValue { key: String },
    #[error(transparent)]
    InvalidUserid(#[from] UseridError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<PreferencesError> for UserServiceError {
    fn from(err: PreferencesError) -> Self {
        match err {
            PreferencesError::Disallowed(keys) => UserServiceError::DisallowedPreferences(keys),
            PreferencesError::InvalidValue { key } => {
                UserServiceError::InvalidPreferenceValue { key }
            }
        }
    }
}

/// Lookups return `Ok(None)` when no user matches.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    fn default_authority(&self) -> &str;

    /// Fetch by combined userid, e.g. `acct:foo@example.com`.
    async fn fetch(&self, userid: &str) -> Result<Option<User>, UserServiceError>;

    async fn fetch_by_username(
        &self,
        username: &str,
        authority: &str,
    ) -> Result<Option<User>, UserServiceError>;

    /// Fetch by the value typed into a login form: an email if it contains
    /// `@`, a username otherwise. Fails with `NotActivated` for accounts
    /// pending activation.
    async fn fetch_for_login(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError>;

    /// Validate and apply preference options to `user`. Nothing is changed
    /// unless every option is valid. Later fetches in the same transaction
    /// return the updated user; persisting is left to the session.
    fn update_preferences(
        &self,
        user: &mut User,
        options: &PreferenceOptions,
    ) -> Result<(), UserServiceError>;
}
