//! Combined user identifiers of the form `acct:{username}@{authority}`.

const USERID_PREFIX: &str = "acct:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseridParts {
    pub username: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UseridError {
    #[error("{0} isn't a valid userid")]
    Invalid(String),
}

/// Split a userid into its username and domain.
///
/// The username must be non-empty and contain no `@`; everything after the
/// first `@` is the domain.
pub fn split_user(userid: &str) -> Result<UseridParts, UseridError> {
    let invalid = || UseridError::Invalid(userid.to_string());

    let rest = userid.strip_prefix(USERID_PREFIX).ok_or_else(invalid)?;
    let (username, domain) = rest.split_once('@').ok_or_else(invalid)?;
    if username.is_empty() {
        return Err(invalid());
    }

    Ok(UseridParts {
        username: username.to_string(),
        domain: domain.to_string(),
    })
}

pub fn format_userid(username: &str, authority: &str) -> String {
    format!("{USERID_PREFIX}{username}@{authority}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_username_and_domain() {
        let parts = split_user("acct:foo@example.com").unwrap();
        assert_eq!(parts.username, "foo");
        assert_eq!(parts.domain, "example.com");
    }

    #[test]
    fn domain_keeps_everything_after_first_at() {
        let parts = split_user("acct:foo@bar@example.com").unwrap();
        assert_eq!(parts.username, "foo");
        assert_eq!(parts.domain, "bar@example.com");
    }

    #[test]
    fn rejects_malformed_userids() {
        for bad in ["foo@example.com", "acct:foo", "acct:@example.com", ""] {
            let err = split_user(bad).unwrap_err();
            assert_eq!(err, UseridError::Invalid(bad.to_string()));
        }
        assert_eq!(
            split_user("foo").unwrap_err().to_string(),
            "foo isn't a valid userid"
        );
    }

    #[test]
    fn format_is_inverse_of_split() {
        let userid = format_userid("foo", "example.com");
        let parts = split_user(&userid).unwrap();
        assert_eq!((parts.username.as_str(), parts.domain.as_str()), ("foo", "example.com"));
    }
}
