use crate::domain_port::DbSession;
use std::sync::Arc;

/// What a per-request service needs from the request it serves.
pub trait RequestContext {
    fn authority(&self) -> &str;
    fn db(&self) -> Arc<dyn DbSession>;
}

pub struct RequestScope {
    pub authority: String,
    pub db: Arc<dyn DbSession>,
}

impl RequestScope {
    pub fn new(authority: impl Into<String>, db: Arc<dyn DbSession>) -> Self {
        RequestScope {
            authority: authority.into(),
            db,
        }
    }
}

impl RequestContext for RequestScope {
    fn authority(&self) -> &str {
        &self.authority
    }

    fn db(&self) -> Arc<dyn DbSession> {
        self.db.clone()
    }
}
