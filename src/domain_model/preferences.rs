use crate::domain_model::User;
use serde_json::{Map, Value};

pub const SHOW_SIDEBAR_TUTORIAL: &str = "show_sidebar_tutorial";

/// Keys a caller may pass to a preference update.
pub const UPDATE_PREFS_ALLOWED_KEYS: &[&str] = &[SHOW_SIDEBAR_TUTORIAL];

/// Raw preference options as they arrive from a caller, e.g. a JSON body.
pub type PreferenceOptions = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferencesError {
    #[error("settings with keys {} are not allowed", .0.join(", "))]
    Disallowed(Vec<String>),
    #[error("setting {key} must be a boolean")]
    InvalidValue { key: String },
}

/// A validated preference update. Every field is optional; absent fields are
/// left untouched on the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub show_sidebar_tutorial: Option<bool>,
}

impl PreferencesUpdate {
    /// Validate raw options against the allow-list. Unknown keys are reported
    /// together, sorted.
    pub fn from_options(options: &PreferenceOptions) -> Result<Self, PreferencesError> {
        let mut disallowed: Vec<String> = options
            .keys()
            .filter(|key| !UPDATE_PREFS_ALLOWED_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !disallowed.is_empty() {
            disallowed.sort();
            return Err(PreferencesError::Disallowed(disallowed));
        }

        let show_sidebar_tutorial = match options.get(SHOW_SIDEBAR_TUTORIAL) {
            None => None,
            Some(Value::Bool(show)) => Some(*show),
            Some(_) => {
                return Err(PreferencesError::InvalidValue {
                    key: SHOW_SIDEBAR_TUTORIAL.to_string(),
                });
            }
        };

        Ok(PreferencesUpdate {
            show_sidebar_tutorial,
        })
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(show) = self.show_sidebar_tutorial {
            user.sidebar_tutorial_dismissed = !show;
        }
    }
}
